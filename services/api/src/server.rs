use crate::cli::ServeArgs;
use crate::infra::{AppState, TracingAuditSink};
use crate::routes::with_matching_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use mentor_match::config::AppConfig;
use mentor_match::error::AppError;
use mentor_match::matching::{MatchingService, MemoryMatchingStore};
use mentor_match::telemetry;
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

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(MemoryMatchingStore::new());
    let audit = Arc::new(TracingAuditSink);
    let matching_service = Arc::new(MatchingService::new(
        store,
        audit,
        config.matching.clone(),
    ));

    let app = with_matching_routes(matching_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        default_capacity = config.matching.default_capacity,
        max_retries = config.matching.max_retries,
        "mentor matching service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
