use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::backend::{BackendError, NocBackend};
use super::catalog::RecipientKind;
use super::domain::ApplicationId;
use super::feed::FeedFilter;
use super::service::{NocReviewService, WorkflowError, FORWARD_FAILED, LOAD_FAILED, REJECT_FAILED};
use super::validation::ValidationError;
use crate::workflows::notice::Notice;

/// Router builder exposing the review workflow to the console front end.
pub fn application_router<B>(service: Arc<NocReviewService<B>>) -> Router
where
    B: NocBackend + ?Sized + 'static,
{
    Router::new()
        .route("/api/v1/noc/applications", get(list_handler::<B>))
        .route(
            "/api/v1/noc/applications/:application_id",
            get(detail_handler::<B>),
        )
        .route(
            "/api/v1/noc/applications/:application_id/forward",
            post(forward_handler::<B>),
        )
        .route(
            "/api/v1/noc/applications/:application_id/reject",
            post(reject_handler::<B>),
        )
        .route(
            "/api/v1/noc/detail",
            get(open_detail_handler::<B>).delete(close_detail_handler::<B>),
        )
        .route("/api/v1/noc/history", get(history_handler::<B>))
        .route("/api/v1/noc/catalog", get(catalog_handler::<B>))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListOptions {
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ForwardRequest {
    #[serde(default)]
    pub departments: Vec<u32>,
    #[serde(default)]
    pub districts: Vec<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RejectRequest {
    #[serde(default)]
    pub remarks: String,
}

pub(crate) async fn list_handler<B>(
    State(service): State<Arc<NocReviewService<B>>>,
    Query(filter): Query<FeedFilter>,
    Query(options): Query<ListOptions>,
) -> Response
where
    B: NocBackend + ?Sized + 'static,
{
    if options.refresh {
        if let Err(error) = service.refresh().await {
            return workflow_error_response(error, LOAD_FAILED);
        }
    }

    let applications = service.feed(&filter);
    let payload = json!({
        "total": applications.len(),
        "filter": filter,
        "applications": applications,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn detail_handler<B>(
    State(service): State<Arc<NocReviewService<B>>>,
    Path(application_id): Path<String>,
) -> Response
where
    B: NocBackend + ?Sized + 'static,
{
    let id = ApplicationId(application_id);
    match service.open_detail(&id).await {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(error) => workflow_error_response(error, LOAD_FAILED),
    }
}

pub(crate) async fn open_detail_handler<B>(
    State(service): State<Arc<NocReviewService<B>>>,
) -> Response
where
    B: NocBackend + ?Sized + 'static,
{
    match service.detail() {
        Some(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

pub(crate) async fn close_detail_handler<B>(
    State(service): State<Arc<NocReviewService<B>>>,
) -> StatusCode
where
    B: NocBackend + ?Sized + 'static,
{
    service.close_detail();
    StatusCode::NO_CONTENT
}

pub(crate) async fn forward_handler<B>(
    State(service): State<Arc<NocReviewService<B>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<ForwardRequest>,
) -> Response
where
    B: NocBackend + ?Sized + 'static,
{
    let id = ApplicationId(application_id);

    let mut recipients = service.recipient_set();
    let selected = request
        .departments
        .iter()
        .map(|id| (RecipientKind::Department, *id))
        .chain(request.districts.iter().map(|id| (RecipientKind::District, *id)));
    for (kind, recipient) in selected {
        if let Err(error) = recipients.add_by_id(kind, recipient) {
            return workflow_error_response(error.into(), FORWARD_FAILED);
        }
    }

    match service.forward(&id, &recipients).await {
        Ok(application) => {
            let notice = Notice::success(
                "Forwarded",
                format!(
                    "Application {} forwarded to {} recipient(s).",
                    application.application_number,
                    recipients.len()
                ),
            );
            let payload = json!({ "application": application, "notice": notice });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => workflow_error_response(error, FORWARD_FAILED),
    }
}

pub(crate) async fn reject_handler<B>(
    State(service): State<Arc<NocReviewService<B>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<RejectRequest>,
) -> Response
where
    B: NocBackend + ?Sized + 'static,
{
    let id = ApplicationId(application_id);
    match service.reject(&id, &request.remarks).await {
        Ok(application) => {
            let notice = Notice::success(
                "Rejected",
                format!("Application {} rejected.", application.application_number),
            );
            let payload = json!({ "application": application, "notice": notice });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => workflow_error_response(error, REJECT_FAILED),
    }
}

pub(crate) async fn history_handler<B>(
    State(service): State<Arc<NocReviewService<B>>>,
) -> Response
where
    B: NocBackend + ?Sized + 'static,
{
    (StatusCode::OK, axum::Json(service.history())).into_response()
}

pub(crate) async fn catalog_handler<B>(
    State(service): State<Arc<NocReviewService<B>>>,
) -> Response
where
    B: NocBackend + ?Sized + 'static,
{
    (StatusCode::OK, axum::Json(service.catalog().as_ref())).into_response()
}

/// HTTP status reported to the console for a backend failure.
pub(crate) fn backend_status(error: &BackendError) -> StatusCode {
    match error {
        BackendError::Rejected { status, .. } if (400..500).contains(status) => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        BackendError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
        BackendError::InvalidId { .. } => StatusCode::BAD_REQUEST,
        BackendError::Rejected { .. }
        | BackendError::Malformed(_)
        | BackendError::MissingRoute { .. } => StatusCode::BAD_GATEWAY,
    }
}

/// HTTP status and error kind reported for a review workflow failure.
pub(crate) fn workflow_status(error: &WorkflowError) -> (StatusCode, &'static str) {
    match error {
        WorkflowError::Validation(ValidationError::TerminalState { .. }) => {
            (StatusCode::CONFLICT, "validation")
        }
        WorkflowError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
        WorkflowError::Backend(backend) => (backend_status(backend), "backend"),
    }
}

fn workflow_error_response(error: WorkflowError, generic: &str) -> Response {
    let (status, kind) = workflow_status(&error);

    let payload = json!({
        "error": error.to_string(),
        "kind": kind,
        "notice": Notice::from_workflow_error(&error, generic),
    });
    (status, axum::Json(payload)).into_response()
}
