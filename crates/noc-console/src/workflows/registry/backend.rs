use async_trait::async_trait;
use serde_json::Value;

use super::domain::{EntityId, EntityKind};
use crate::workflows::noc::backend::BackendError;

/// Backend calls behind the artist and vendor registries.
#[async_trait]
pub trait RegistryBackend: Send + Sync {
    /// Every user record; callers filter by role.
    async fn list_users(&self) -> Result<Vec<Value>, BackendError>;

    async fn verify(&self, kind: EntityKind, id: &EntityId) -> Result<(), BackendError>;

    async fn unverify(&self, kind: EntityKind, id: &EntityId) -> Result<(), BackendError>;

    async fn delete(&self, kind: EntityKind, id: &EntityId) -> Result<(), BackendError>;
}
