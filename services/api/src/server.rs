use crate::cli::ServeArgs;
use crate::infra::{postgres_store, AppState};
use crate::routes::with_service_routes;
use axum_prometheus::PrometheusMetricLayer;
use englesoft::config::AppConfig;
use englesoft::error::{AppError, ErrorPolicy};
use englesoft::telemetry;
use englesoft::tracking::{
    tracking_router, LevelTable, MemoryStore, SessionIssuer, Store, TrackingState,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    if args.in_memory {
        warn!("serving from the in-memory store; data is lost on shutdown");
        serve(config, Arc::new(MemoryStore::new()), Arc::new(LevelTable::mcer())).await
    } else {
        let (store, levels) = postgres_store(&config).await?;
        serve(config, store, levels).await
    }
}

async fn serve<S: Store>(
    config: AppConfig,
    store: Arc<S>,
    levels: Arc<LevelTable>,
) -> Result<(), AppError> {
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let tracking = TrackingState::new(
        store,
        levels,
        SessionIssuer::from_config(&config.session),
        config.tracking.linkage,
        ErrorPolicy::new(config.environment.exposes_error_details()),
    );

    let app = with_service_routes(
        tracking_router(tracking),
        app_state,
        &config.server.public_dir,
        config.environment,
    )
    .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        environment = config.environment.label(),
        %addr,
        public_dir = %config.server.public_dir.display(),
        "englesoft tracker ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
