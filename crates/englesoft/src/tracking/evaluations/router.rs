use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use super::domain::EvaluationRequest;
use crate::error::ApiError;
use crate::tracking::http::{ok, parse_evaluation_id, ApiJson, TrackingState};
use crate::tracking::store::Store;

pub fn evaluation_routes<S: Store>() -> Router<TrackingState<S>> {
    Router::new()
        .route(
            "/api/evaluaciones",
            get(list_handler::<S>).post(record_handler::<S>),
        )
        .route("/api/evaluaciones/niveles", get(levels_handler::<S>))
        .route("/api/evaluaciones/estadisticas", get(stats_handler::<S>))
        .route(
            "/api/evaluaciones/estadisticas/estudiante/:documento",
            get(student_stats_handler::<S>),
        )
        .route(
            "/api/evaluaciones/estudiante/:documento",
            get(by_student_handler::<S>),
        )
        .route(
            "/api/evaluaciones/:id",
            get(get_handler::<S>).delete(delete_handler::<S>),
        )
}

pub(crate) async fn record_handler<S: Store>(
    State(state): State<TrackingState<S>>,
    ApiJson(request): ApiJson<EvaluationRequest>,
) -> Result<Response, ApiError> {
    let recorded = state
        .recorder
        .record(&request)
        .await
        .map_err(|err| state.errors.reject("Error al crear evaluación", err))?;

    let evaluation = &recorded.evaluation;
    let payload = json!({
        "success": true,
        "id_evaluacion": evaluation.id,
        "nivel_alcanzado": evaluation.level,
        "puntaje_total": evaluation.total_score,
        "message": "Evaluación creada exitosamente",
        "progreso": recorded.progress,
    });
    Ok((StatusCode::CREATED, Json(payload)).into_response())
}

pub(crate) async fn by_student_handler<S: Store>(
    State(state): State<TrackingState<S>>,
    Path(document): Path<String>,
) -> Result<Response, ApiError> {
    let evaluations = state
        .reports
        .evaluations_for(&document)
        .await
        .map_err(|err| state.errors.reject("Error al obtener evaluaciones", err))?;

    Ok(ok(json!({
        "success": true,
        "count": evaluations.len(),
        "evaluaciones": evaluations,
    })))
}

pub(crate) async fn get_handler<S: Store>(
    State(state): State<TrackingState<S>>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_evaluation_id(&raw_id)?;
    let evaluation = state
        .reports
        .evaluation(id)
        .await
        .map_err(|err| state.errors.reject("Error al obtener evaluación", err))?;

    Ok(ok(json!({ "success": true, "evaluacion": evaluation })))
}

pub(crate) async fn list_handler<S: Store>(
    State(state): State<TrackingState<S>>,
) -> Result<Response, ApiError> {
    let evaluations = state
        .reports
        .evaluations()
        .await
        .map_err(|err| state.errors.reject("Error al obtener evaluaciones", err))?;

    Ok(ok(json!({
        "success": true,
        "count": evaluations.len(),
        "evaluaciones": evaluations,
    })))
}

pub(crate) async fn levels_handler<S: Store>(State(state): State<TrackingState<S>>) -> Response {
    ok(json!({ "success": true, "niveles": state.reports.levels() }))
}

pub(crate) async fn stats_handler<S: Store>(
    State(state): State<TrackingState<S>>,
) -> Result<Response, ApiError> {
    let stats = state
        .reports
        .evaluation_stats()
        .await
        .map_err(|err| state.errors.reject("Error al obtener estadísticas", err))?;

    Ok(ok(json!({ "success": true, "estadisticas": stats })))
}

pub(crate) async fn student_stats_handler<S: Store>(
    State(state): State<TrackingState<S>>,
    Path(document): Path<String>,
) -> Result<Response, ApiError> {
    let stats = state
        .reports
        .student_stats(&document)
        .await
        .map_err(|err| state.errors.reject("Error al obtener estadísticas", err))?;

    Ok(ok(json!({ "success": true, "estadisticas": stats })))
}

pub(crate) async fn delete_handler<S: Store>(
    State(state): State<TrackingState<S>>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_evaluation_id(&raw_id)?;
    let removed = state
        .recorder
        .delete(id)
        .await
        .map_err(|err| state.errors.reject("Error al eliminar evaluación", err))?;

    let message = if removed {
        "Evaluación eliminada exitosamente"
    } else {
        "La evaluación no existía"
    };
    Ok(ok(json!({
        "success": true,
        "eliminada": removed,
        "message": message,
    })))
}
