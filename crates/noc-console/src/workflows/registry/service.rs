use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::backend::RegistryBackend;
use super::directory::{filter_entities, EntityFilter};
use super::domain::{EntityId, EntityKind, VerifiableEntity, VerificationFlag};
use crate::workflows::noc::backend::BackendError;

pub const VERIFY_FAILED: &str = "Failed to update verification status.";
pub const DELETE_FAILED: &str = "Failed to delete the selected records.";
pub const DIRECTORY_FAILED: &str = "Failed to load the directory.";

#[derive(Debug, Default)]
struct RegistryState {
    entities: BTreeMap<EntityKind, Vec<VerifiableEntity>>,
    detail: Option<VerifiableEntity>,
}

impl RegistryState {
    fn entity_mut(&mut self, kind: EntityKind, id: &EntityId) -> Option<&mut VerifiableEntity> {
        self.entities
            .get_mut(&kind)
            .and_then(|entities| entities.iter_mut().find(|entity| &entity.id == id))
    }

    fn detail_mut(&mut self, kind: EntityKind, id: &EntityId) -> Option<&mut VerifiableEntity> {
        self.detail
            .as_mut()
            .filter(|detail| detail.kind == kind && &detail.id == id)
    }
}

/// Optimistic verification change awaiting backend confirmation.
///
/// Holds the exact pre-call flag so a failed call restores the cache and any
/// open detail view without consulting other state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange {
    pub kind: EntityKind,
    pub entity_id: EntityId,
    pub previous: VerificationFlag,
    pub desired: VerificationFlag,
}

impl PendingChange {
    pub fn new(entity: &VerifiableEntity, desired: bool) -> Self {
        Self {
            kind: entity.kind,
            entity_id: entity.id.clone(),
            previous: entity.verification().clone(),
            desired: entity.verification().with_value(desired),
        }
    }

    fn targets(&self, entity: &VerifiableEntity) -> bool {
        entity.kind == self.kind && entity.id == self.entity_id
    }

    /// Write the optimistic value.
    pub fn apply(&self, entity: &mut VerifiableEntity) {
        if self.targets(entity) {
            entity.set_verification(self.desired.clone());
        }
    }

    /// Restore the pre-call value.
    pub fn rollback(&self, entity: &mut VerifiableEntity) {
        if self.targets(entity) {
            entity.set_verification(self.previous.clone());
        }
    }
}

/// Artist / vendor registry cache with optimistic verification toggles.
pub struct VerificationRegistry<B: ?Sized> {
    backend: Arc<B>,
    state: Mutex<RegistryState>,
}

impl<B> VerificationRegistry<B>
where
    B: RegistryBackend + ?Sized,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            state: Mutex::new(RegistryState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refetch the directory and replace the cached listing for `kind`.
    pub async fn refresh(&self, kind: EntityKind) -> Result<Vec<VerifiableEntity>, RegistryError> {
        let users = self.backend.list_users().await.map_err(|error| {
            warn!(%kind, %error, "directory refresh failed");
            RegistryError::from(error)
        })?;

        let entities: Vec<VerifiableEntity> = users
            .into_iter()
            .filter(|user| has_role(user, kind))
            .filter_map(|user| match VerifiableEntity::from_wire(kind, user) {
                Ok(entity) => Some(entity),
                Err(error) => {
                    warn!(%kind, %error, "skipping unreadable directory record");
                    None
                }
            })
            .collect();

        let mut state = self.state();
        if let Some(detail) = state.detail.as_ref().filter(|detail| detail.kind == kind) {
            let open = detail.id.clone();
            state.detail = entities.iter().find(|entity| entity.id == open).cloned();
        }
        state.entities.insert(kind, entities.clone());

        Ok(entities)
    }

    pub fn entities(&self, kind: EntityKind) -> Vec<VerifiableEntity> {
        self.state()
            .entities
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    pub fn entity(&self, kind: EntityKind, id: &EntityId) -> Option<VerifiableEntity> {
        self.state()
            .entities
            .get(&kind)
            .and_then(|entities| entities.iter().find(|entity| &entity.id == id))
            .cloned()
    }

    pub fn directory(&self, kind: EntityKind, filter: &EntityFilter) -> Vec<VerifiableEntity> {
        let state = self.state();
        let entities = state.entities.get(&kind).map(Vec::as_slice).unwrap_or(&[]);
        filter_entities(entities, filter).into_iter().cloned().collect()
    }

    pub fn open_detail(
        &self,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<VerifiableEntity, RegistryError> {
        let entity = self
            .entity(kind, id)
            .ok_or_else(|| RegistryError::UnknownEntity {
                kind,
                id: id.clone(),
            })?;
        self.state().detail = Some(entity.clone());
        Ok(entity)
    }

    pub fn close_detail(&self) {
        self.state().detail = None;
    }

    pub fn detail(&self) -> Option<VerifiableEntity> {
        self.state().detail.clone()
    }

    /// Flip verification: cache first, then the backend, rolling back on failure.
    pub async fn set_verified(
        &self,
        id: &EntityId,
        kind: EntityKind,
        desired: bool,
    ) -> Result<(), RegistryError> {
        let pending = {
            let mut state = self.state();
            let entity = state
                .entity_mut(kind, id)
                .ok_or_else(|| RegistryError::UnknownEntity {
                    kind,
                    id: id.clone(),
                })?;
            let pending = PendingChange::new(entity, desired);
            pending.apply(entity);
            if let Some(detail) = state.detail_mut(kind, id) {
                pending.apply(detail);
            }
            pending
        };

        let result = if desired {
            self.backend.verify(kind, id).await
        } else {
            self.backend.unverify(kind, id).await
        };

        match result {
            Ok(()) => {
                info!(%kind, entity = %id, verified = desired, "verification updated");
                Ok(())
            }
            Err(error) => {
                let mut state = self.state();
                if let Some(entity) = state.entity_mut(kind, id) {
                    pending.rollback(entity);
                }
                if let Some(detail) = state.detail_mut(kind, id) {
                    pending.rollback(detail);
                }
                warn!(%kind, entity = %id, verified = desired, %error, "verification rolled back");
                Err(error.into())
            }
        }
    }

    /// Delete several records concurrently, then resynchronize from the backend.
    pub async fn bulk_delete(
        &self,
        kind: EntityKind,
        ids: &[EntityId],
    ) -> Result<BulkDeleteReport, RegistryError> {
        if ids.is_empty() {
            return Err(RegistryError::NothingSelected { kind });
        }

        let calls = ids.iter().map(|id| async move {
            let outcome = self.backend.delete(kind, id).await;
            (id.clone(), outcome)
        });
        let outcomes = join_all(calls).await;

        let mut report = BulkDeleteReport {
            kind,
            requested: ids.len(),
            deleted: Vec::new(),
            failed: Vec::new(),
            resynchronized: false,
        };
        for (id, outcome) in outcomes {
            match outcome {
                Ok(()) => report.deleted.push(id),
                Err(error) => report.failed.push(FailedDelete {
                    message: error.operator_message(DELETE_FAILED),
                    id,
                }),
            }
        }

        match self.refresh(kind).await {
            Ok(_) => report.resynchronized = true,
            Err(error) => {
                // Confirmed deletions are still dropped locally.
                warn!(%kind, %error, "resync after bulk delete failed");
                let mut state = self.state();
                if let Some(entities) = state.entities.get_mut(&kind) {
                    entities.retain(|entity| !report.deleted.contains(&entity.id));
                }
                if state
                    .detail
                    .as_ref()
                    .is_some_and(|detail| detail.kind == kind && report.deleted.contains(&detail.id))
                {
                    state.detail = None;
                }
            }
        }

        if report.failed.is_empty() {
            info!(%kind, deleted = report.deleted.len(), "bulk delete completed");
            Ok(report)
        } else {
            warn!(
                %kind,
                deleted = report.deleted.len(),
                failed = report.failed.len(),
                "bulk delete partially failed"
            );
            Err(RegistryError::PartialFailure(report))
        }
    }
}

fn has_role(user: &Value, kind: EntityKind) -> bool {
    user.get("role")
        .and_then(Value::as_str)
        .is_some_and(|role| role.trim().eq_ignore_ascii_case(kind.role()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDelete {
    pub id: EntityId,
    pub message: String,
}

/// Outcome of a concurrent batch of deletions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkDeleteReport {
    pub kind: EntityKind,
    pub requested: usize,
    pub deleted: Vec<EntityId>,
    pub failed: Vec<FailedDelete>,
    pub resynchronized: bool,
}

impl BulkDeleteReport {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Deleted {} of {} {}s.",
            self.deleted.len(),
            self.requested,
            self.kind
        );
        if self.is_partial() {
            let failed: Vec<String> = self
                .failed
                .iter()
                .map(|failure| format!("{} ({})", failure.id, failure.message))
                .collect();
            summary.push_str(&format!(" Could not delete: {}.", failed.join(", ")));
        }
        if self.resynchronized {
            summary.push_str(" The list was reloaded from the server.");
        } else {
            summary.push_str(" The list could not be reloaded; refresh before continuing.");
        }
        summary
    }
}

impl fmt::Display for BulkDeleteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Error raised by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("{kind} {id} is not in the loaded directory")]
    UnknownEntity { kind: EntityKind, id: EntityId },
    #[error("select at least one {kind} to delete")]
    NothingSelected { kind: EntityKind },
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("batch only partially succeeded: {0}")]
    PartialFailure(BulkDeleteReport),
}

impl RegistryError {
    pub fn operator_message(&self, generic: &str) -> String {
        match self {
            Self::Backend(error) => error.operator_message(generic),
            Self::PartialFailure(report) => report.summary(),
            other => other.to_string(),
        }
    }
}
