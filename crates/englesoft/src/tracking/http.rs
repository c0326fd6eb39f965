//! Shared HTTP plumbing for the tracking routers.

use std::sync::Arc;

use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::evaluations::{evaluation_routes, EvaluationId, EvaluationRecorder, LinkagePolicy};
use super::levels::LevelTable;
use super::progress::progress_routes;
use super::reports::ReportService;
use super::store::Store;
use super::students::{student_routes, SessionIssuer, StudentService};
use crate::error::{ApiError, ErrorPolicy};

/// Services and settings shared by every tracking handler.
pub struct TrackingState<S> {
    pub students: Arc<StudentService<S>>,
    pub recorder: Arc<EvaluationRecorder<S>>,
    pub reports: Arc<ReportService<S>>,
    pub errors: ErrorPolicy,
}

impl<S: Store> TrackingState<S> {
    pub fn new(
        store: Arc<S>,
        levels: Arc<LevelTable>,
        sessions: SessionIssuer,
        linkage: LinkagePolicy,
        errors: ErrorPolicy,
    ) -> Self {
        Self {
            students: Arc::new(StudentService::new(store.clone(), sessions)),
            recorder: Arc::new(EvaluationRecorder::new(
                store.clone(),
                levels.clone(),
                linkage,
            )),
            reports: Arc::new(ReportService::new(store, levels)),
            errors,
        }
    }
}

impl<S> Clone for TrackingState<S> {
    fn clone(&self) -> Self {
        Self {
            students: self.students.clone(),
            recorder: self.recorder.clone(),
            reports: self.reports.clone(),
            errors: self.errors,
        }
    }
}

/// Every `/api/usuarios`, `/api/evaluaciones` and `/api/progreso` route.
pub fn tracking_router<S: Store>(state: TrackingState<S>) -> Router {
    Router::new()
        .merge(student_routes::<S>())
        .merge(evaluation_routes::<S>())
        .merge(progress_routes::<S>())
        .with_state(state)
}

/// `Json` extractor whose rejection uses the API error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<T, St> FromRequest<St> for ApiJson<T>
where
    T: DeserializeOwned,
    St: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &St) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::bad_request("Cuerpo JSON inválido")
                .with_details(rejection.body_text())),
        }
    }
}

/// 200 with `body`.
pub(crate) fn ok<T: Serialize>(body: T) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

pub(crate) fn parse_evaluation_id(raw: &str) -> Result<EvaluationId, ApiError> {
    raw.trim()
        .parse::<i64>()
        .map(EvaluationId)
        .map_err(|_| ApiError::bad_request("ID de evaluación inválido"))
}
