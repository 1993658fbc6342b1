//! Artist and vendor registries: directory listing, verification toggles, bulk removal.

pub mod backend;
pub mod directory;
pub mod domain;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use backend::RegistryBackend;
pub use directory::{filter_entities, EntityFilter, VerificationFilter};
pub use domain::{EntityId, EntityKind, FlagField, VerifiableEntity, VerificationFlag};
pub use router::registry_router;
pub use service::{
    BulkDeleteReport, FailedDelete, PendingChange, RegistryError, VerificationRegistry,
};
