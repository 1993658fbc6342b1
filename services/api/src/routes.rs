use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use noc_console::workflows::console::{console_router, Console};
use noc_console::workflows::noc::NocBackend;
use noc_console::workflows::registry::RegistryBackend;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_console_routes<B>(console: Arc<Console<B>>) -> axum::Router
where
    B: NocBackend + RegistryBackend + ?Sized + 'static,
{
    console_router(console)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::DemoBackend;
    use axum::body::Body;
    use axum::http::Request;
    use noc_console::workflows::noc::RecipientCatalog;
    use tower::ServiceExt;

    fn console() -> Arc<Console<DemoBackend>> {
        Arc::new(Console::new(
            Arc::new(DemoBackend::seeded()),
            Arc::new(RecipientCatalog::standard()),
        ))
    }

    #[tokio::test]
    async fn health_route_is_served_next_to_the_console_api() {
        let response = with_console_routes(console())
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn feed_route_serves_demo_applications() {
        let response = with_console_routes(console())
            .oneshot(
                Request::builder()
                    .uri("/api/v1/noc/applications?refresh=true&status=pending")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("json payload");
        assert_eq!(payload["total"], 2);
    }
}
