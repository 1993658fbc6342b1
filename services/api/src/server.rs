use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_console_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use noc_console::config::{AppConfig, BackendConfig};
use noc_console::error::AppError;
use noc_console::http::HttpBackend;
use noc_console::telemetry;
use noc_console::workflows::console::Console;
use noc_console::workflows::noc::RecipientCatalog;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(url) = args.backend_url.take() {
        config.backend = BackendConfig::new(url, config.backend.request_timeout)?;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    let catalog = Arc::new(RecipientCatalog::standard());
    info!(
        backend = backend.base_url(),
        catalog = catalog.version(),
        "review console configured"
    );
    let console = Arc::new(Console::new(backend, catalog));

    let app = with_console_routes(console)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "noc review console ready");

    axum::serve(listener, app).await?;
    Ok(())
}
