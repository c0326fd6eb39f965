use crate::infra::AppState;
use axum::handler::HandlerWithoutStateExt;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::Utc;
use englesoft::config::AppEnvironment;
use englesoft::error::ApiError;
use serde_json::json;
use std::any::Any;
use std::path::Path;
use std::sync::atomic::Ordering;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

const SERVICE_BANNER: &str = "Servidor EnglesSoft funcionando correctamente";

/// Wraps the tracking API with the operational endpoints, the static frontend and the
/// request middleware. Anything no route or file matches gets the JSON 404 envelope.
pub(crate) fn with_service_routes(
    tracking: Router,
    state: AppState,
    public_dir: &Path,
    environment: AppEnvironment,
) -> Router {
    let frontend = ServeDir::new(public_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(route_not_found.into_service());

    tracking
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/test", get(service_banner))
        .fallback_service(frontend)
        .layer(Extension(state))
        .layer(CatchPanicLayer::custom(panic_responder(
            environment.exposes_error_details(),
        )))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
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

async fn service_banner() -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "message": SERVICE_BANNER,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn route_not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": "Ruta no encontrada",
            "path": uri.path(),
        })),
    )
}

fn panic_responder(
    expose_details: bool,
) -> impl Fn(Box<dyn Any + Send + 'static>) -> Response + Clone + Send + Sync + 'static {
    move |payload| {
        let detail = payload
            .downcast_ref::<String>()
            .cloned()
            .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
            .unwrap_or_else(|| "panic without message".to_string());
        error!(%detail, "request handler panicked");

        let rejection = ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Error interno del servidor");
        let rejection = if expose_details {
            rejection.with_details(detail)
        } else {
            rejection
        };
        rejection.into_response()
    }
}
