use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::tracking::levels::LevelTableError;
use crate::tracking::reports::ReportError;
use crate::tracking::store::RepositoryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};
use std::fmt;

/// Process-level failures surfaced by the binary (startup, CLI commands).
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Database(sqlx::Error),
    Migration(sqlx::migrate::MigrateError),
    Levels(LevelTableError),
    Repository(RepositoryError),
    Report(ReportError),
    Export(csv::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Database(err) => write!(f, "database error: {}", err),
            AppError::Migration(err) => write!(f, "migration error: {}", err),
            AppError::Levels(err) => write!(f, "level table error: {}", err),
            AppError::Repository(err) => write!(f, "repository error: {}", err),
            AppError::Report(err) => write!(f, "report error: {}", err),
            AppError::Export(err) => write!(f, "export error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Database(err) => Some(err),
            AppError::Migration(err) => Some(err),
            AppError::Levels(err) => Some(err),
            AppError::Repository(err) => Some(err),
            AppError::Report(err) => Some(err),
            AppError::Export(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        Self::Database(value)
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(value: sqlx::migrate::MigrateError) -> Self {
        Self::Migration(value)
    }
}

impl From<LevelTableError> for AppError {
    fn from(value: LevelTableError) -> Self {
        Self::Levels(value)
    }
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Repository(value)
    }
}

impl From<ReportError> for AppError {
    fn from(value: ReportError) -> Self {
        Self::Report(value)
    }
}

impl From<csv::Error> for AppError {
    fn from(value: csv::Error) -> Self {
        Self::Export(value)
    }
}

/// How a service error should be reported over HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    Validation {
        message: String,
        required_fields: Option<&'static [&'static str]>,
    },
    NotFound(String),
    Unauthorized(String),
    BusinessRule(String),
    Infrastructure(String),
}

/// Implemented by every service error so handlers can translate it uniformly.
pub trait IntoFailure {
    fn into_failure(self) -> Failure;
}

impl IntoFailure for Failure {
    fn into_failure(self) -> Failure {
        self
    }
}

impl IntoFailure for RepositoryError {
    fn into_failure(self) -> Failure {
        Failure::Infrastructure(self.to_string())
    }
}

/// Decides how much of a failure reaches the client.
#[derive(Debug, Clone, Copy)]
pub struct ErrorPolicy {
    expose_details: bool,
}

impl ErrorPolicy {
    pub fn new(expose_details: bool) -> Self {
        Self { expose_details }
    }

    pub fn expose_details(&self) -> bool {
        self.expose_details
    }

    /// Wraps `err` in the JSON envelope; `context` names the failed operation for 5xx
    /// responses.
    pub fn reject<E: IntoFailure>(&self, context: &str, err: E) -> ApiError {
        match err.into_failure() {
            Failure::Validation {
                message,
                required_fields,
            } => ApiError {
                status: StatusCode::BAD_REQUEST,
                error: message,
                details: None,
                required_fields,
            },
            Failure::NotFound(message) => ApiError::new(StatusCode::NOT_FOUND, message),
            Failure::Unauthorized(message) => ApiError::new(StatusCode::UNAUTHORIZED, message),
            Failure::BusinessRule(message) => {
                tracing::warn!(%message, "{context}");
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    error: context.to_string(),
                    details: Some(message),
                    required_fields: None,
                }
            }
            Failure::Infrastructure(detail) => {
                tracing::error!(%detail, "{context}");
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    error: context.to_string(),
                    details: self.expose_details.then_some(detail),
                    required_fields: None,
                }
            }
        }
    }
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self::new(true)
    }
}

/// JSON error envelope: `{ "success": false, "error": ..., "details"?: ... }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
    required_fields: Option<&'static [&'static str]>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details: None,
            required_fields: None,
        }
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.error
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("success".to_string(), Value::Bool(false));
        body.insert("error".to_string(), Value::String(self.error.clone()));
        if let Some(details) = &self.details {
            body.insert("details".to_string(), Value::String(details.clone()));
        }
        if let Some(fields) = self.required_fields {
            body.insert("camposRequeridos".to_string(), json!(fields));
        }
        Value::Object(body)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error, self.status)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}
