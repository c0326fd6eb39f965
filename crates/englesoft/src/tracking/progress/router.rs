use axum::{
    extract::{Path, State},
    response::Response,
    routing::get,
    Router,
};
use serde_json::json;

use crate::error::ApiError;
use crate::tracking::http::{ok, TrackingState};
use crate::tracking::store::Store;

pub fn progress_routes<S: Store>() -> Router<TrackingState<S>> {
    Router::new()
        .route("/api/progreso", get(summary_handler::<S>))
        .route(
            "/api/progreso/estadisticas/general",
            get(general_stats_handler::<S>),
        )
        .route(
            "/api/progreso/comparar/:documento",
            get(comparison_handler::<S>),
        )
        .route("/api/progreso/:documento", get(student_handler::<S>))
}

pub(crate) async fn student_handler<S: Store>(
    State(state): State<TrackingState<S>>,
    Path(document): Path<String>,
) -> Result<Response, ApiError> {
    let progress = state
        .reports
        .student_progress(&document)
        .await
        .map_err(|err| state.errors.reject("Error al obtener progreso", err))?;

    Ok(ok(json!({ "success": true, "progreso": progress })))
}

pub(crate) async fn summary_handler<S: Store>(
    State(state): State<TrackingState<S>>,
) -> Result<Response, ApiError> {
    let rows = state
        .reports
        .progress_summary()
        .await
        .map_err(|err| state.errors.reject("Error al obtener progresos", err))?;

    Ok(ok(json!({
        "success": true,
        "count": rows.len(),
        "progresos": rows,
    })))
}

pub(crate) async fn general_stats_handler<S: Store>(
    State(state): State<TrackingState<S>>,
) -> Result<Response, ApiError> {
    let stats = state
        .reports
        .general_stats()
        .await
        .map_err(|err| state.errors.reject("Error al obtener estadísticas", err))?;

    Ok(ok(json!({ "success": true, "estadisticas": stats })))
}

pub(crate) async fn comparison_handler<S: Store>(
    State(state): State<TrackingState<S>>,
    Path(document): Path<String>,
) -> Result<Response, ApiError> {
    let comparison = state
        .reports
        .comparison(&document)
        .await
        .map_err(|err| state.errors.reject("Error al comparar evaluaciones", err))?;

    Ok(ok(json!({ "success": true, "comparacion": comparison })))
}
