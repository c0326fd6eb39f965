use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::domain::{LoginRequest, ProfileUpdate, RegistrationRequest};
use crate::error::ApiError;
use crate::tracking::http::{ok, ApiJson, TrackingState};
use crate::tracking::store::Store;

pub fn student_routes<S: Store>() -> Router<TrackingState<S>> {
    Router::new()
        .route("/api/usuarios", get(list_handler::<S>))
        .route("/api/usuarios/registro", post(register_handler::<S>))
        .route("/api/usuarios/login", post(login_handler::<S>))
        .route(
            "/api/usuarios/:documento",
            get(get_handler::<S>)
                .put(update_handler::<S>)
                .delete(delete_handler::<S>),
        )
}

pub(crate) async fn register_handler<S: Store>(
    State(state): State<TrackingState<S>>,
    ApiJson(request): ApiJson<RegistrationRequest>,
) -> Result<Response, ApiError> {
    let student = state
        .students
        .register(request)
        .await
        .map_err(|err| state.errors.reject("Error al registrar estudiante", err))?;

    let payload = json!({
        "success": true,
        "message": "Estudiante registrado exitosamente",
        "documento": student.document,
    });
    Ok((StatusCode::CREATED, Json(payload)).into_response())
}

pub(crate) async fn login_handler<S: Store>(
    State(state): State<TrackingState<S>>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Response, ApiError> {
    let session = state
        .students
        .login(request)
        .await
        .map_err(|err| state.errors.reject("Error en el inicio de sesión", err))?;

    Ok(ok(json!({
        "success": true,
        "message": "Inicio de sesión exitoso",
        "token": session.token,
        "expira": session.expires_at,
        "estudiante": session.student,
    })))
}

pub(crate) async fn get_handler<S: Store>(
    State(state): State<TrackingState<S>>,
    Path(document): Path<String>,
) -> Result<Response, ApiError> {
    let student = state
        .students
        .get(&document)
        .await
        .map_err(|err| state.errors.reject("Error al obtener estudiante", err))?;

    Ok(ok(json!({ "success": true, "estudiante": student })))
}

pub(crate) async fn list_handler<S: Store>(
    State(state): State<TrackingState<S>>,
) -> Result<Response, ApiError> {
    let students = state
        .students
        .list()
        .await
        .map_err(|err| state.errors.reject("Error al obtener estudiantes", err))?;

    Ok(ok(json!({
        "success": true,
        "count": students.len(),
        "estudiantes": students,
    })))
}

pub(crate) async fn update_handler<S: Store>(
    State(state): State<TrackingState<S>>,
    Path(document): Path<String>,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<Response, ApiError> {
    let student = state
        .students
        .update(&document, update)
        .await
        .map_err(|err| state.errors.reject("Error al actualizar estudiante", err))?;

    Ok(ok(json!({
        "success": true,
        "message": "Estudiante actualizado exitosamente",
        "estudiante": student,
    })))
}

pub(crate) async fn delete_handler<S: Store>(
    State(state): State<TrackingState<S>>,
    Path(document): Path<String>,
) -> Result<Response, ApiError> {
    let removed = state
        .students
        .delete(&document)
        .await
        .map_err(|err| state.errors.reject("Error al eliminar estudiante", err))?;

    let message = if removed {
        "Estudiante eliminado exitosamente"
    } else {
        "El estudiante no existía"
    };
    Ok(ok(json!({
        "success": true,
        "eliminado": removed,
        "message": message,
    })))
}
