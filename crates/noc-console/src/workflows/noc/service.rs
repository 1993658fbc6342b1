use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::backend::{BackendError, NocBackend};
use super::catalog::RecipientCatalog;
use super::domain::{Application, ApplicationId};
use super::feed::{ActivityFeed, FeedFilter};
use super::forwarding::{ForwardingCoordinator, TransitionOutcome};
use super::lifecycle::{ApplicationStateMachine, Transition, TransitionRecord};
use super::recipients::RecipientSet;
use super::validation::{require_remarks, ValidationError};

pub const FORWARD_FAILED: &str = "Failed to forward the application.";
pub const REJECT_FAILED: &str = "Failed to reject the application.";
pub const LOAD_FAILED: &str = "Failed to load applications.";

#[derive(Debug, Default)]
struct ReviewState {
    applications: Vec<Application>,
    detail: Option<Application>,
    history: Vec<TransitionRecord>,
}

impl ReviewState {
    fn find(&self, id: &ApplicationId) -> Option<&Application> {
        self.applications.iter().find(|application| &application.id == id)
    }

    fn upsert(&mut self, application: Application) {
        match self
            .applications
            .iter_mut()
            .find(|cached| cached.id == application.id)
        {
            Some(cached) => *cached = application,
            None => self.applications.push(application),
        }
    }
}

/// Operator session over the NOC review workflow.
///
/// Owns the cached application list, the single open detail view, and the
/// review history. Only the operations below write to that state, and only
/// after the backend has confirmed a transition.
pub struct NocReviewService<B: ?Sized> {
    backend: Arc<B>,
    catalog: Arc<RecipientCatalog>,
    coordinator: ForwardingCoordinator<B>,
    state: Mutex<ReviewState>,
}

impl<B> NocReviewService<B>
where
    B: NocBackend + ?Sized,
{
    pub fn new(backend: Arc<B>, catalog: Arc<RecipientCatalog>) -> Self {
        let coordinator = ForwardingCoordinator::new(backend.clone());
        Self {
            backend,
            catalog,
            coordinator,
            state: Mutex::new(ReviewState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ReviewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn catalog(&self) -> &Arc<RecipientCatalog> {
        &self.catalog
    }

    /// Empty recipient set bound to this session's catalog.
    pub fn recipient_set(&self) -> RecipientSet {
        RecipientSet::new(self.catalog.clone())
    }

    /// Replace the cache with the backend's list.
    pub async fn refresh(&self) -> Result<Vec<Application>, WorkflowError> {
        let remote = self.backend.list_applications().await.map_err(|error| {
            warn!(%error, "application list refresh failed");
            WorkflowError::from(error)
        })?;

        let mut state = self.state();
        for application in &remote {
            if let Some(cached) = state.find(&application.id) {
                if !ApplicationStateMachine::accepts_remote(cached.status, application.status) {
                    warn!(
                        application = %application.id,
                        cached = %cached.status,
                        remote = %application.status,
                        "backend reported a status regression; keeping backend value"
                    );
                }
            }
        }

        if let Some(open) = state.detail.as_ref().map(|detail| detail.id.clone()) {
            state.detail = remote
                .iter()
                .find(|application| application.id == open)
                .cloned();
        }
        state.applications = remote.clone();
        debug!(count = remote.len(), "application cache refreshed");

        Ok(remote)
    }

    pub fn applications(&self) -> Vec<Application> {
        self.state().applications.clone()
    }

    pub fn application(&self, id: &ApplicationId) -> Option<Application> {
        self.state().find(id).cloned()
    }

    /// Filtered view of the cached applications.
    pub fn feed(&self, filter: &FeedFilter) -> Vec<Application> {
        let state = self.state();
        ActivityFeed::new(filter)
            .apply(&state.applications)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Load the full record and make it the open detail view.
    pub async fn open_detail(&self, id: &ApplicationId) -> Result<Application, WorkflowError> {
        let application = self.backend.application_details(id).await?;

        let mut state = self.state();
        state.upsert(application.clone());
        state.detail = Some(application.clone());
        Ok(application)
    }

    pub fn close_detail(&self) {
        self.state().detail = None;
    }

    pub fn detail(&self) -> Option<Application> {
        self.state().detail.clone()
    }

    pub fn history(&self) -> Vec<TransitionRecord> {
        self.state().history.clone()
    }

    /// Forward an application to the departments and districts in `recipients`.
    pub async fn forward(
        &self,
        id: &ApplicationId,
        recipients: &RecipientSet,
    ) -> Result<Application, WorkflowError> {
        if recipients.is_empty() {
            return Err(ValidationError::EmptyRecipients.into());
        }

        let current = self.current(id).await?;
        let TransitionOutcome {
            application,
            record,
        } = self.coordinator.execute(&current, recipients).await?;

        let mut state = self.state();
        state.upsert(application.clone());
        if state.detail.as_ref().map(|detail| &detail.id) == Some(id) {
            state.detail = None;
        }
        state.history.push(record);

        Ok(application)
    }

    /// Reject an application with the operator's reason.
    pub async fn reject(
        &self,
        id: &ApplicationId,
        remarks: &str,
    ) -> Result<Application, WorkflowError> {
        let remarks = require_remarks(remarks)?;

        let current = self.current(id).await?;
        ApplicationStateMachine::check(&current, Transition::Reject)?;

        let confirmed = match self.backend.reject(id, &remarks).await {
            Ok(confirmed) => confirmed,
            Err(error) => {
                warn!(application = %id, %error, "rejection rejected by backend");
                return Err(error.into());
            }
        };

        let mut updated = current.clone();
        updated.confirm(confirmed, Transition::Reject.target());
        if updated.remarks.is_none() {
            updated.remarks = Some(remarks);
        }
        let record = TransitionRecord::rejected(&current, &updated, Utc::now());

        info!(
            application = %updated.id,
            number = %updated.application_number,
            status = %updated.status,
            "application rejected"
        );

        let mut state = self.state();
        state.upsert(updated.clone());
        if state.detail.as_ref().map(|detail| &detail.id) == Some(id) {
            state.detail = Some(updated.clone());
        }
        state.history.push(record);

        Ok(updated)
    }

    async fn current(&self, id: &ApplicationId) -> Result<Application, WorkflowError> {
        if let Some(cached) = self.application(id) {
            return Ok(cached);
        }

        let fetched = self.backend.application_details(id).await?;
        self.state().upsert(fetched.clone());
        Ok(fetched)
    }
}

/// Error raised by the review workflow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl WorkflowError {
    pub fn operator_message(&self, generic: &str) -> String {
        match self {
            Self::Validation(error) => error.to_string(),
            Self::Backend(error) => error.operator_message(generic),
        }
    }
}
