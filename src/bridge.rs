//! Wiring between an embedding surface, the clicks inside its document and
//! the style publisher.
//!
//! Mounting installs a load gate on the surface. When the surface reports it
//! has loaded, a single delegated click listener is attached to the embedded
//! document. Each click is fingerprinted, handed to the [`SyncPublisher`],
//! and focus is returned to the host window. Everything registered is owned
//! by the returned [`BridgeHandle`] and removed when the handle is released
//! or dropped.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, error, info};

use crate::descriptor::EmbeddingDescriptor;
use crate::dom::{
    ClickEvent, ClickListener, EmbeddedDocument, EmbeddingSurface, HostDocument, HostWindow,
    LoadListener,
};
use crate::protocol::ElementFingerprint;
use crate::publisher::SyncPublisher;

/// Bridges clicks in one embedded document to the style store.
pub struct EmbeddedDocumentBridge {
    descriptor: EmbeddingDescriptor,
    publisher: SyncPublisher,
    host: Rc<dyn HostWindow>,
}

impl EmbeddedDocumentBridge {
    pub fn new(
        descriptor: EmbeddingDescriptor,
        publisher: SyncPublisher,
        host: Rc<dyn HostWindow>,
    ) -> Self {
        Self {
            descriptor,
            publisher,
            host,
        }
    }

    pub fn descriptor(&self) -> &EmbeddingDescriptor {
        &self.descriptor
    }

    /// Install the load gate on `surface`. A missing surface yields an inert
    /// handle; nothing is retried.
    pub fn mount(self, surface: Option<Rc<dyn EmbeddingSurface>>) -> BridgeHandle {
        let wiring = Rc::new(Wiring {
            descriptor: self.descriptor,
            publisher: self.publisher,
            host: self.host,
            live: Cell::new(true),
            click: RefCell::new(None),
        });
        let load = surface.map(|surface| install_load_gate(&wiring, surface));
        if load.is_none() {
            debug!(
                target = "bridge",
                class = wiring.descriptor.surface_class(),
                "no embedding surface to bridge"
            );
        }
        BridgeHandle { wiring, load }
    }

    /// Locate the surface by the descriptor's class name and mount on it.
    pub fn mount_by_class(self, document: &dyn HostDocument) -> BridgeHandle {
        let surface = document.query_surface(self.descriptor.surface_class());
        self.mount(surface)
    }
}

struct AttachedLoad {
    surface: Rc<dyn EmbeddingSurface>,
    listener: LoadListener,
}

struct AttachedClick {
    document: Rc<dyn EmbeddedDocument>,
    listener: ClickListener,
}

struct Wiring {
    descriptor: EmbeddingDescriptor,
    publisher: SyncPublisher,
    host: Rc<dyn HostWindow>,
    live: Cell<bool>,
    click: RefCell<Option<AttachedClick>>,
}

impl Wiring {
    fn on_ready(self: &Rc<Self>, surface: &dyn EmbeddingSurface) {
        if !self.live.get() {
            return;
        }

        // A reload replaces the document; never keep two click listeners.
        self.detach_click();

        let document = match surface.content_document() {
            Ok(document) => document,
            Err(err) => {
                error!(
                    target = "bridge",
                    class = self.descriptor.surface_class(),
                    error = %err,
                    "can't access embedded document"
                );
                return;
            }
        };

        let weak = Rc::downgrade(self);
        let listener: ClickListener = Rc::new(move |event: &ClickEvent| {
            if let Some(wiring) = weak.upgrade() {
                wiring.intercept(event);
            }
        });
        document.add_click_listener(Rc::clone(&listener));
        *self.click.borrow_mut() = Some(AttachedClick { document, listener });

        info!(
            target = "bridge",
            class = self.descriptor.surface_class(),
            location = %self.descriptor.content_location(),
            "click bridge attached"
        );
    }

    fn intercept(&self, event: &ClickEvent) {
        if !self.live.get() {
            return;
        }

        let fingerprint = ElementFingerprint::from_target(&event.target, self.descriptor.use_proxy());
        // The sync completes on its own; focus goes back immediately.
        drop(self.publisher.publish(fingerprint));
        self.host.focus();
    }

    fn detach_click(&self) {
        if let Some(AttachedClick { document, listener }) = self.click.borrow_mut().take() {
            if !document.remove_click_listener(&listener) {
                debug!(target = "bridge", "click listener was already gone");
            }
        }
    }

    fn has_click_listener(&self) -> bool {
        self.click.borrow().is_some()
    }
}

fn install_load_gate(wiring: &Rc<Wiring>, surface: Rc<dyn EmbeddingSurface>) -> AttachedLoad {
    let weak_wiring: Weak<Wiring> = Rc::downgrade(wiring);
    let weak_surface: Weak<dyn EmbeddingSurface> = Rc::downgrade(&surface);
    let listener: LoadListener = Rc::new(move || {
        if let (Some(wiring), Some(surface)) = (weak_wiring.upgrade(), weak_surface.upgrade()) {
            wiring.on_ready(surface.as_ref());
        }
    });
    surface.add_load_listener(Rc::clone(&listener));
    AttachedLoad { surface, listener }
}

/// Owns the listeners installed for one mounted embedding.
///
/// Dropping the handle releases everything, the same as [`BridgeHandle::release`].
pub struct BridgeHandle {
    wiring: Rc<Wiring>,
    load: Option<AttachedLoad>,
}

impl BridgeHandle {
    /// Whether the load gate is installed on a surface.
    pub fn is_gated(&self) -> bool {
        self.load.is_some()
    }

    /// Whether a click listener is attached to an embedded document.
    pub fn is_attached(&self) -> bool {
        self.wiring.has_click_listener()
    }

    pub fn publisher(&self) -> &SyncPublisher {
        &self.wiring.publisher
    }

    /// Move the bridge to a different surface. Listeners on the old surface
    /// and its document are removed and in-flight responses are dropped.
    pub fn retarget(&mut self, surface: Option<Rc<dyn EmbeddingSurface>>) {
        self.detach();
        self.wiring.publisher.detach();
        self.load = surface.map(|surface| install_load_gate(&self.wiring, surface));
    }

    pub fn release(mut self) {
        self.teardown();
    }

    fn detach(&mut self) {
        if let Some(AttachedLoad { surface, listener }) = self.load.take() {
            surface.remove_load_listener(&listener);
        }
        self.wiring.detach_click();
    }

    fn teardown(&mut self) {
        if !self.wiring.live.replace(false) {
            return;
        }
        self.detach();
        self.wiring.publisher.shutdown();
        debug!(
            target = "bridge",
            class = self.wiring.descriptor.surface_class(),
            "bridge released"
        );
    }
}

impl Drop for BridgeHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}
