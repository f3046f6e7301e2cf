use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dom::ElementSnapshot;
use crate::store::StoreMutation;

/// Minimal structural descriptor of a clicked element, sent to the style
/// service in place of the element's full content.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ElementFingerprint {
    pub id: String,
    #[serde(rename = "nodeName")]
    pub node_name: String,
    #[serde(rename = "className")]
    pub class_name: String,
    #[serde(rename = "proxy")]
    pub use_proxy: bool,
}

impl ElementFingerprint {
    pub fn from_target(target: &ElementSnapshot, use_proxy: bool) -> Self {
        Self {
            id: target.id.clone(),
            node_name: target.node_name.clone(),
            class_name: target.class_name.clone(),
            use_proxy,
        }
    }
}

/// Style rules returned for one fingerprint. Every payload is opaque to the
/// bridge and is handed to the store untouched.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleSyncResult {
    pub inline_rules: Option<Value>,
    pub regular_rules: Option<Value>,
    pub user_agent_rules: Option<Value>,
    pub style_sheets: Option<Value>,
    pub inherited_rules: Option<Value>,
    pub keyframe_rules: Option<Value>,
}

impl StyleSyncResult {
    /// Split the result into raw rule mutations in store order.
    ///
    /// Inherited and keyframe rules are reserved by the service contract and
    /// are only forwarded when `forward_reserved` is set.
    pub fn into_mutations(self, forward_reserved: bool) -> Vec<StoreMutation> {
        let Self {
            inline_rules,
            regular_rules,
            user_agent_rules,
            style_sheets,
            inherited_rules,
            keyframe_rules,
        } = self;

        let mut mutations = Vec::with_capacity(6);
        mutations.extend(inline_rules.map(StoreMutation::UpdateInlineRules));
        mutations.extend(regular_rules.map(StoreMutation::UpdateRegularRules));
        mutations.extend(user_agent_rules.map(StoreMutation::UpdateUserAgentRules));
        mutations.extend(style_sheets.map(StoreMutation::UpdateStyleSheets));
        if forward_reserved {
            mutations.extend(inherited_rules.map(StoreMutation::UpdateInheritedRules));
            mutations.extend(keyframe_rules.map(StoreMutation::UpdateKeyframeRules));
        }
        mutations
    }
}
