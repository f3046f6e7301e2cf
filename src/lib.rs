// Library exports for the bridge binary and integration tests

pub mod bridge;
pub mod config;
pub mod descriptor;
pub mod dom;
pub mod protocol;
pub mod publisher;
pub mod service;
pub mod store;

pub use bridge::{BridgeHandle, EmbeddedDocumentBridge};
pub use config::{BridgeConfig, ResponseOrdering};
pub use descriptor::EmbeddingDescriptor;
pub use protocol::{ElementFingerprint, StyleSyncResult};
pub use publisher::{PublisherOptions, SyncOutcome, SyncPublisher};
pub use service::{HttpStyleService, StyleService, SyncError};
pub use store::{MutationLog, StoreMutation, StyleStore};
