//! Host environment seams the bridge is wired through.
//!
//! A host page owns one or more embedding surfaces. Each surface exposes a
//! load signal and, once loaded, an embedded document that delivers click
//! events. Listeners are reference counted so that removal can match the
//! exact listener registered at attach time.

pub mod memory;

use std::rc::Rc;

use thiserror::Error;

pub type LoadListener = Rc<dyn Fn()>;
pub type ClickListener = Rc<dyn Fn(&ClickEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SurfaceAccessError {
    #[error("embedded document is cross-origin")]
    CrossOrigin,
    #[error("embedded document is not ready")]
    NotReady,
    #[error("embedding surface was destroyed")]
    Destroyed,
}

/// Structural view of an element at the moment an event reached it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementSnapshot {
    pub id: String,
    pub node_name: String,
    pub class_name: String,
}

#[derive(Debug, Clone)]
pub struct ClickEvent {
    /// Innermost element the click landed on.
    pub target: ElementSnapshot,
}

pub trait HostDocument {
    /// Find the embedding surface carrying `class_name`.
    fn query_surface(&self, class_name: &str) -> Option<Rc<dyn EmbeddingSurface>>;
}

pub trait EmbeddingSurface {
    fn add_load_listener(&self, listener: LoadListener);
    /// Returns `false` when `listener` was not registered.
    fn remove_load_listener(&self, listener: &LoadListener) -> bool;
    fn content_document(&self) -> Result<Rc<dyn EmbeddedDocument>, SurfaceAccessError>;
}

pub trait EmbeddedDocument {
    fn add_click_listener(&self, listener: ClickListener);
    /// Returns `false` when `listener` was not registered.
    fn remove_click_listener(&self, listener: &ClickListener) -> bool;
}

pub trait HostWindow {
    /// Move keyboard focus back to the top-level host window.
    fn focus(&self);
}
