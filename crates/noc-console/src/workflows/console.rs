//! Operator console: one entry point that runs queued commands and reports
//! the outcome as a [`Notice`].

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Router};
use tracing::debug;

use super::noc::service::{FORWARD_FAILED, REJECT_FAILED};
use super::noc::{
    application_router, ApplicationId, NocBackend, NocReviewService, RecipientCatalog,
    WorkflowError,
};
use super::notice::{ConsoleCommand, Notice};
use super::registry::service::{DELETE_FAILED, VERIFY_FAILED};
use super::registry::{registry_router, RegistryBackend, VerificationRegistry};

/// The review workflow and both registries, sharing one backend.
pub struct Console<B: ?Sized> {
    reviews: Arc<NocReviewService<B>>,
    registry: Arc<VerificationRegistry<B>>,
}

impl<B> Console<B>
where
    B: NocBackend + RegistryBackend + ?Sized,
{
    pub fn new(backend: Arc<B>, catalog: Arc<RecipientCatalog>) -> Self {
        Self {
            reviews: Arc::new(NocReviewService::new(backend.clone(), catalog)),
            registry: Arc::new(VerificationRegistry::new(backend)),
        }
    }

    pub fn reviews(&self) -> &Arc<NocReviewService<B>> {
        &self.reviews
    }

    pub fn registry(&self) -> &Arc<VerificationRegistry<B>> {
        &self.registry
    }

    /// Confirmation the operator must accept before `command` runs.
    pub fn confirmation(&self, command: ConsoleCommand) -> Notice {
        let (title, message) = match &command {
            ConsoleCommand::ForwardApplication { application_id, .. } => (
                "Forward application",
                format!(
                    "Forward application {} to {} recipient(s)?",
                    self.application_label(application_id),
                    command.recipients().len()
                ),
            ),
            ConsoleCommand::RejectApplication { application_id, .. } => (
                "Reject application",
                format!(
                    "Reject application {}? This cannot be undone.",
                    self.application_label(application_id)
                ),
            ),
            ConsoleCommand::SetVerified {
                kind,
                entity_id,
                verified,
            } => (
                "Change verification",
                format!(
                    "Mark {kind} {entity_id} as {}?",
                    if *verified { "verified" } else { "unverified" }
                ),
            ),
            ConsoleCommand::DeleteEntities { kind, ids } => (
                "Delete records",
                format!("Delete {} {kind}(s)? This cannot be undone.", ids.len()),
            ),
        };

        Notice::confirm(title, message, command)
    }

    /// Run `command` and describe the outcome for the operator.
    pub async fn dispatch(&self, command: ConsoleCommand) -> Notice {
        debug!(?command, "dispatching console command");
        match command {
            ConsoleCommand::ForwardApplication {
                ref application_id, ..
            } => {
                let mut recipients = self.reviews.recipient_set();
                for (kind, id) in command.recipients() {
                    if let Err(error) = recipients.add_by_id(kind, id) {
                        return Notice::from_workflow_error(
                            &WorkflowError::from(error),
                            FORWARD_FAILED,
                        );
                    }
                }

                match self.reviews.forward(application_id, &recipients).await {
                    Ok(application) => Notice::success(
                        "Forwarded",
                        format!(
                            "Application {} forwarded to {} recipient(s).",
                            application.application_number,
                            recipients.len()
                        ),
                    ),
                    Err(error) => Notice::from_workflow_error(&error, FORWARD_FAILED),
                }
            }
            ConsoleCommand::RejectApplication {
                application_id,
                remarks,
            } => match self.reviews.reject(&application_id, &remarks).await {
                Ok(application) => Notice::success(
                    "Rejected",
                    format!("Application {} rejected.", application.application_number),
                ),
                Err(error) => Notice::from_workflow_error(&error, REJECT_FAILED),
            },
            ConsoleCommand::SetVerified {
                kind,
                entity_id,
                verified,
            } => match self.registry.set_verified(&entity_id, kind, verified).await {
                Ok(()) => Notice::success(
                    "Updated",
                    format!(
                        "{kind} {entity_id} is now {}.",
                        if verified { "verified" } else { "unverified" }
                    ),
                ),
                Err(error) => Notice::from_registry_error(&error, VERIFY_FAILED),
            },
            ConsoleCommand::DeleteEntities { kind, ids } => {
                match self.registry.bulk_delete(kind, &ids).await {
                    Ok(report) => Notice::success("Deleted", report.summary()),
                    Err(error) => Notice::from_registry_error(&error, DELETE_FAILED),
                }
            }
        }
    }

    fn application_label(&self, id: &ApplicationId) -> String {
        self.reviews
            .application(id)
            .map(|application| application.application_number)
            .unwrap_or_else(|| id.to_string())
    }
}

/// Every console endpoint: review workflow, registries and command dispatch.
pub fn console_router<B>(console: Arc<Console<B>>) -> Router
where
    B: NocBackend + RegistryBackend + ?Sized + 'static,
{
    let reviews = application_router(console.reviews.clone());
    let registry = registry_router(console.registry.clone());

    Router::new()
        .route("/api/v1/console/commands", post(dispatch_handler::<B>))
        .route(
            "/api/v1/console/confirmations",
            post(confirmation_handler::<B>),
        )
        .with_state(console)
        .merge(reviews)
        .merge(registry)
}

pub(crate) async fn dispatch_handler<B>(
    State(console): State<Arc<Console<B>>>,
    axum::Json(command): axum::Json<ConsoleCommand>,
) -> (StatusCode, axum::Json<Notice>)
where
    B: NocBackend + RegistryBackend + ?Sized + 'static,
{
    (StatusCode::OK, axum::Json(console.dispatch(command).await))
}

pub(crate) async fn confirmation_handler<B>(
    State(console): State<Arc<Console<B>>>,
    axum::Json(command): axum::Json<ConsoleCommand>,
) -> (StatusCode, axum::Json<Notice>)
where
    B: NocBackend + RegistryBackend + ?Sized + 'static,
{
    (StatusCode::OK, axum::Json(console.confirmation(command)))
}
