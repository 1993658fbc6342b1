use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::backend::RegistryBackend;
use super::directory::EntityFilter;
use super::domain::{EntityId, EntityKind};
use super::service::{
    RegistryError, VerificationRegistry, DELETE_FAILED, DIRECTORY_FAILED, VERIFY_FAILED,
};
use crate::workflows::noc::router::backend_status;
use crate::workflows::notice::Notice;

/// Router builder for the artist and vendor registries.
///
/// `DELETE /api/v1/registry/:kind` removes the ids listed in the body.
pub fn registry_router<B>(registry: Arc<VerificationRegistry<B>>) -> Router
where
    B: RegistryBackend + ?Sized + 'static,
{
    Router::new()
        .route(
            "/api/v1/registry/:kind",
            get(directory_handler::<B>).delete(bulk_delete_handler::<B>),
        )
        .route("/api/v1/registry/:kind/:entity_id", get(entity_handler::<B>))
        .route(
            "/api/v1/registry/:kind/:entity_id/verification",
            put(verification_handler::<B>),
        )
        .with_state(registry)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DirectoryOptions {
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VerificationRequest {
    pub verified: bool,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BulkDeleteRequest {
    #[serde(default)]
    pub ids: Vec<EntityId>,
}

pub(crate) async fn directory_handler<B>(
    State(registry): State<Arc<VerificationRegistry<B>>>,
    Path(kind): Path<String>,
    Query(filter): Query<EntityFilter>,
    Query(options): Query<DirectoryOptions>,
) -> Response
where
    B: RegistryBackend + ?Sized + 'static,
{
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    if options.refresh {
        if let Err(error) = registry.refresh(kind).await {
            return registry_error_response(error, DIRECTORY_FAILED);
        }
    }

    let entities = registry.directory(kind, &filter);
    let payload = json!({
        "kind": kind,
        "total": entities.len(),
        "entities": entities,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn entity_handler<B>(
    State(registry): State<Arc<VerificationRegistry<B>>>,
    Path((kind, entity_id)): Path<(String, String)>,
) -> Response
where
    B: RegistryBackend + ?Sized + 'static,
{
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    match registry.open_detail(kind, &EntityId(entity_id)) {
        Ok(entity) => (StatusCode::OK, axum::Json(entity)).into_response(),
        Err(error) => registry_error_response(error, DIRECTORY_FAILED),
    }
}

pub(crate) async fn verification_handler<B>(
    State(registry): State<Arc<VerificationRegistry<B>>>,
    Path((kind, entity_id)): Path<(String, String)>,
    axum::Json(request): axum::Json<VerificationRequest>,
) -> Response
where
    B: RegistryBackend + ?Sized + 'static,
{
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    let id = EntityId(entity_id);

    match registry.set_verified(&id, kind, request.verified).await {
        Ok(()) => {
            let verb = if request.verified { "verified" } else { "unverified" };
            let payload = json!({
                "entity": registry.entity(kind, &id),
                "notice": Notice::success("Updated", format!("The {kind} is now {verb}.")),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => registry_error_response(error, VERIFY_FAILED),
    }
}

pub(crate) async fn bulk_delete_handler<B>(
    State(registry): State<Arc<VerificationRegistry<B>>>,
    Path(kind): Path<String>,
    axum::Json(request): axum::Json<BulkDeleteRequest>,
) -> Response
where
    B: RegistryBackend + ?Sized + 'static,
{
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    match registry.bulk_delete(kind, &request.ids).await {
        Ok(report) => {
            let payload = json!({
                "notice": Notice::success("Deleted", report.summary()),
                "report": report,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(RegistryError::PartialFailure(report)) => {
            let error = RegistryError::PartialFailure(report.clone());
            let payload = json!({
                "error": error.to_string(),
                "kind": "partial_failure",
                "notice": Notice::from_registry_error(&error, DELETE_FAILED),
                "report": report,
            });
            (StatusCode::MULTI_STATUS, axum::Json(payload)).into_response()
        }
        Err(error) => registry_error_response(error, DELETE_FAILED),
    }
}

fn parse_kind(raw: &str) -> Result<EntityKind, Response> {
    raw.parse::<EntityKind>().map_err(|error| {
        let payload = json!({ "error": error, "kind": "unknown_registry" });
        (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
    })
}

/// HTTP status and error kind reported for a registry failure.
pub(crate) fn registry_status(error: &RegistryError) -> (StatusCode, &'static str) {
    match error {
        RegistryError::UnknownEntity { .. } => (StatusCode::NOT_FOUND, "unknown_entity"),
        RegistryError::NothingSelected { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
        RegistryError::PartialFailure(_) => (StatusCode::MULTI_STATUS, "partial_failure"),
        RegistryError::Backend(backend) => (backend_status(backend), "backend"),
    }
}

fn registry_error_response(error: RegistryError, generic: &str) -> Response {
    let (status, kind) = registry_status(&error);

    let payload = json!({
        "error": error.to_string(),
        "kind": kind,
        "notice": Notice::from_registry_error(&error, generic),
    });
    (status, axum::Json(payload)).into_response()
}
