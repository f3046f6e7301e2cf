use std::cell::RefCell;

use serde_json::Value;

/// Named mutation entry points of the shared style store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreMutation {
    UpdateInlineRules(Value),
    UpdateRegularRules(Value),
    UpdateUserAgentRules(Value),
    UpdateStyleSheets(Value),
    UpdateInheritedRules(Value),
    UpdateKeyframeRules(Value),
    /// One step of [`DerivedRecompute`]. `DerivedStep` values are only
    /// minted there, always in dependency order.
    Derived(DerivedStep),
}

impl StoreMutation {
    pub fn name(&self) -> &'static str {
        match self {
            StoreMutation::UpdateInlineRules(_) => "update-inline-rules",
            StoreMutation::UpdateRegularRules(_) => "update-regular-rules",
            StoreMutation::UpdateUserAgentRules(_) => "update-user-agent-rules",
            StoreMutation::UpdateStyleSheets(_) => "update-style-sheets",
            StoreMutation::UpdateInheritedRules(_) => "update-inherited-rules",
            StoreMutation::UpdateKeyframeRules(_) => "update-keyframe-rules",
            StoreMutation::Derived(step) => step.kind().name(),
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            StoreMutation::UpdateInlineRules(value)
            | StoreMutation::UpdateRegularRules(value)
            | StoreMutation::UpdateUserAgentRules(value)
            | StoreMutation::UpdateStyleSheets(value)
            | StoreMutation::UpdateInheritedRules(value)
            | StoreMutation::UpdateKeyframeRules(value) => Some(value),
            StoreMutation::Derived(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedKind {
    ShortLongMaps,
    IsActiveFlag,
    ActiveStyles,
}

impl DerivedKind {
    pub fn name(self) -> &'static str {
        match self {
            DerivedKind::ShortLongMaps => "update-short-long-maps",
            DerivedKind::IsActiveFlag => "set-is-active-flag",
            DerivedKind::ActiveStyles => "find-active-styles",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedStep(DerivedKind);

impl DerivedStep {
    pub fn kind(self) -> DerivedKind {
        self.0
    }
}

/// Recomputes derived style state once all raw rule categories for a click
/// are installed. The property-name maps feed the active flags, which feed
/// the active style set.
pub struct DerivedRecompute;

impl DerivedRecompute {
    const STEPS: [DerivedKind; 3] = [
        DerivedKind::ShortLongMaps,
        DerivedKind::IsActiveFlag,
        DerivedKind::ActiveStyles,
    ];

    pub fn apply(store: &dyn StyleStore) {
        for kind in Self::STEPS {
            store.dispatch(StoreMutation::Derived(DerivedStep(kind)));
        }
    }
}

/// Shared state container the bridge publishes into.
pub trait StyleStore {
    fn dispatch(&self, mutation: StoreMutation);
}

/// Store that records every mutation it receives, in order.
#[derive(Debug, Default)]
pub struct MutationLog {
    entries: RefCell<Vec<StoreMutation>>,
}

impl MutationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<StoreMutation> {
        self.entries.borrow().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.borrow().iter().map(StoreMutation::name).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Payload of the most recent mutation called `name`.
    pub fn latest(&self, name: &str) -> Option<Value> {
        self.entries
            .borrow()
            .iter()
            .rev()
            .find(|mutation| mutation.name() == name)
            .and_then(|mutation| mutation.payload().cloned())
    }
}

impl StyleStore for MutationLog {
    fn dispatch(&self, mutation: StoreMutation) {
        tracing::trace!(target = "store", mutation = mutation.name(), "dispatch");
        self.entries.borrow_mut().push(mutation);
    }
}
