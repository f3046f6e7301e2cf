//! In-memory host page used by the demo binary and the test suite.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{
    ClickEvent, ClickListener, ElementSnapshot, EmbeddedDocument, EmbeddingSurface, HostDocument,
    HostWindow, LoadListener, SurfaceAccessError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOwner {
    Host,
    Embedded,
}

/// Top-level window of the host page. Tracks who owns keyboard focus.
#[derive(Debug)]
pub struct MemoryWindow {
    owner: Cell<FocusOwner>,
    focus_calls: Cell<usize>,
}

impl Default for MemoryWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryWindow {
    pub fn new() -> Self {
        Self {
            owner: Cell::new(FocusOwner::Host),
            focus_calls: Cell::new(0),
        }
    }

    pub fn focus_owner(&self) -> FocusOwner {
        self.owner.get()
    }

    pub fn focus_calls(&self) -> usize {
        self.focus_calls.get()
    }

    fn give_focus_to_embedded(&self) {
        self.owner.set(FocusOwner::Embedded);
    }
}

impl HostWindow for MemoryWindow {
    fn focus(&self) {
        self.owner.set(FocusOwner::Host);
        self.focus_calls.set(self.focus_calls.get() + 1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

struct Node {
    parent: Option<NodeId>,
    element: ElementSnapshot,
}

/// Document loaded inside an embedding surface.
pub struct MemoryDocument {
    nodes: RefCell<Vec<Node>>,
    listeners: RefCell<Vec<ClickListener>>,
    window: Option<Rc<MemoryWindow>>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self {
            nodes: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
            window: None,
        }
    }

    /// Clicks inside this document take focus away from `window`.
    pub fn with_window(window: Rc<MemoryWindow>) -> Self {
        Self {
            window: Some(window),
            ..Self::new()
        }
    }

    /// Append an element. Node names are upper-cased the way HTML documents
    /// report them.
    pub fn append_element(
        &self,
        parent: Option<NodeId>,
        node_name: &str,
        id: &str,
        class_name: &str,
    ) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let node_id = NodeId(nodes.len());
        nodes.push(Node {
            parent,
            element: ElementSnapshot {
                id: id.to_string(),
                node_name: node_name.to_ascii_uppercase(),
                class_name: class_name.to_string(),
            },
        });
        node_id
    }

    pub fn set_class_name(&self, node: NodeId, class_name: &str) {
        if let Some(entry) = self.nodes.borrow_mut().get_mut(node.0) {
            entry.element.class_name = class_name.to_string();
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.borrow().get(node.0).and_then(|entry| entry.parent)
    }

    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        if id.is_empty() {
            return None;
        }
        self.nodes
            .borrow()
            .iter()
            .position(|node| node.element.id == id)
            .map(NodeId)
    }

    pub fn click_listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Dispatch a click on `node`. The event bubbles to the document, where
    /// every registered click listener observes it. Returns the number of
    /// listeners invoked.
    pub fn click(&self, node: NodeId) -> usize {
        let Some(event) = self.event_for(node) else {
            return 0;
        };

        if let Some(window) = &self.window {
            window.give_focus_to_embedded();
        }

        // Listeners may detach themselves while running.
        let listeners: Vec<ClickListener> = self.listeners.borrow().clone();
        for listener in &listeners {
            listener(&event);
        }
        listeners.len()
    }

    fn event_for(&self, node: NodeId) -> Option<ClickEvent> {
        let target = self.nodes.borrow().get(node.0)?.element.clone();
        Some(ClickEvent { target })
    }
}

impl EmbeddedDocument for MemoryDocument {
    fn add_click_listener(&self, listener: ClickListener) {
        self.listeners.borrow_mut().push(listener);
    }

    fn remove_click_listener(&self, listener: &ClickListener) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        match listeners.iter().position(|l| Rc::ptr_eq(l, listener)) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }
}

enum SurfaceState {
    Loading,
    Loaded(Rc<MemoryDocument>),
    CrossOrigin,
    Destroyed,
}

/// Embedding surface (an iframe) placed in the host page.
pub struct MemorySurface {
    class_name: String,
    listeners: RefCell<Vec<LoadListener>>,
    state: RefCell<SurfaceState>,
}

impl MemorySurface {
    pub fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            listeners: RefCell::new(Vec::new()),
            state: RefCell::new(SurfaceState::Loading),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn load_listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Finish loading `document` and fire the load event.
    pub fn finish_load(&self, document: Rc<MemoryDocument>) {
        *self.state.borrow_mut() = SurfaceState::Loaded(document);
        self.fire_load();
    }

    /// Finish loading a document the host is not allowed to read.
    pub fn finish_cross_origin_load(&self) {
        *self.state.borrow_mut() = SurfaceState::CrossOrigin;
        self.fire_load();
    }

    pub fn destroy(&self) {
        *self.state.borrow_mut() = SurfaceState::Destroyed;
    }

    fn fire_load(&self) {
        let listeners: Vec<LoadListener> = self.listeners.borrow().clone();
        for listener in &listeners {
            listener();
        }
    }
}

impl EmbeddingSurface for MemorySurface {
    fn add_load_listener(&self, listener: LoadListener) {
        self.listeners.borrow_mut().push(listener);
    }

    fn remove_load_listener(&self, listener: &LoadListener) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        match listeners.iter().position(|l| Rc::ptr_eq(l, listener)) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    fn content_document(&self) -> Result<Rc<dyn EmbeddedDocument>, SurfaceAccessError> {
        match &*self.state.borrow() {
            SurfaceState::Loaded(document) => {
                let document: Rc<dyn EmbeddedDocument> = Rc::clone(document) as _;
                Ok(document)
            }
            SurfaceState::Loading => Err(SurfaceAccessError::NotReady),
            SurfaceState::CrossOrigin => Err(SurfaceAccessError::CrossOrigin),
            SurfaceState::Destroyed => Err(SurfaceAccessError::Destroyed),
        }
    }
}

/// Host page holding embedding surfaces.
#[derive(Default)]
pub struct MemoryHostDocument {
    surfaces: RefCell<Vec<Rc<MemorySurface>>>,
}

impl MemoryHostDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_surface(&self, class_name: &str) -> Rc<MemorySurface> {
        let surface = Rc::new(MemorySurface::new(class_name));
        self.surfaces.borrow_mut().push(Rc::clone(&surface));
        surface
    }
}

impl HostDocument for MemoryHostDocument {
    fn query_surface(&self, class_name: &str) -> Option<Rc<dyn EmbeddingSurface>> {
        self.surfaces
            .borrow()
            .iter()
            .find(|surface| {
                surface
                    .class_name
                    .split_ascii_whitespace()
                    .any(|class| class == class_name)
            })
            .map(|surface| Rc::clone(surface) as Rc<dyn EmbeddingSurface>)
    }
}
