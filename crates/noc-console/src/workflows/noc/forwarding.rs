use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::backend::NocBackend;
use super::domain::Application;
use super::lifecycle::{ApplicationStateMachine, Transition, TransitionRecord};
use super::recipients::RecipientSet;
use super::service::WorkflowError;
use super::validation::ValidationError;

/// Confirmed result of a transition: the updated application and its history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub application: Application,
    pub record: TransitionRecord,
}

/// Drives the forward transition: validate, package the fan-out, call the backend once.
pub struct ForwardingCoordinator<B: ?Sized> {
    backend: Arc<B>,
}

impl<B> ForwardingCoordinator<B>
where
    B: NocBackend + ?Sized,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Forward `application` to every entry of `recipients`.
    ///
    /// The input is never modified; callers replace their copy with the
    /// returned application only after this succeeds. Repeated calls forward to
    /// the union of all recipient sets used.
    pub async fn execute(
        &self,
        application: &Application,
        recipients: &RecipientSet,
    ) -> Result<TransitionOutcome, WorkflowError> {
        if recipients.is_empty() {
            return Err(ValidationError::EmptyRecipients.into());
        }
        ApplicationStateMachine::check(application, Transition::Forward)?;

        let payload = recipients.to_payload();

        let confirmed = match self.backend.forward(&application.id, &payload).await {
            Ok(confirmed) => confirmed,
            Err(error) => {
                warn!(
                    application = %application.id,
                    departments = payload.departments.len(),
                    districts = payload.districts.len(),
                    %error,
                    "forwarding rejected"
                );
                return Err(error.into());
            }
        };

        let mut updated = application.clone();
        updated.confirm(confirmed, Transition::Forward.target());
        let record = TransitionRecord::forwarded(application, &updated, &payload, Utc::now());

        info!(
            application = %updated.id,
            number = %updated.application_number,
            recipients = record.recipient_count(),
            status = %updated.status,
            "application forwarded"
        );

        Ok(TransitionOutcome {
            application: updated,
            record,
        })
    }
}
