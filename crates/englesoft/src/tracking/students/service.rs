use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::credentials::{hash_password, verify_password, CredentialError};
use super::domain::{
    filled, LoginRequest, ProfileUpdate, RegistrationRequest, Student, StudentChanges,
};
use super::session::{Session, SessionError, SessionIssuer};
use crate::error::{Failure, IntoFailure};
use crate::tracking::store::{RepositoryError, StudentRepository};

pub const REQUIRED_REGISTRATION_FIELDS: &[&str] = &["documento", "nombres", "correo", "contrasena"];
pub const REQUIRED_LOGIN_FIELDS: &[&str] = &["documento", "contrasena"];

/// Registration, authentication and profile maintenance.
pub struct StudentService<R> {
    repository: Arc<R>,
    sessions: SessionIssuer,
}

impl<R> StudentService<R>
where
    R: StudentRepository + 'static,
{
    pub fn new(repository: Arc<R>, sessions: SessionIssuer) -> Self {
        Self {
            repository,
            sessions,
        }
    }

    pub async fn register(
        &self,
        request: RegistrationRequest,
    ) -> Result<Student, StudentServiceError> {
        let (Some(document), Some(name), Some(email), Some(password)) = (
            filled(&request.document),
            filled(&request.name),
            filled(&request.email),
            filled(&request.password),
        ) else {
            return Err(StudentServiceError::MissingRegistrationFields);
        };

        let student = Student {
            document: document.to_string(),
            name: name.to_string(),
            phone: filled(&request.phone).unwrap_or_default().to_string(),
            email: email.to_string(),
            credential: hash_password(password)?,
            registered_at: Utc::now(),
        };

        let stored = self
            .repository
            .insert_student(student)
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict => {
                    StudentServiceError::DuplicateDocument(document.to_string())
                }
                other => other.into(),
            })?;
        info!(document = %stored.document, "student registered");
        Ok(stored)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<Session, StudentServiceError> {
        let (Some(document), Some(password)) =
            (filled(&request.document), filled(&request.password))
        else {
            return Err(StudentServiceError::MissingCredentials);
        };

        let student = self
            .repository
            .fetch_student(document)
            .await?
            .filter(|student| verify_password(password, &student.credential))
            .ok_or_else(|| {
                debug!(document, "rejected login attempt");
                StudentServiceError::InvalidCredentials
            })?;

        Ok(self.sessions.issue(student)?)
    }

    pub async fn get(&self, document: &str) -> Result<Student, StudentServiceError> {
        self.repository
            .fetch_student(document)
            .await?
            .ok_or(StudentServiceError::NotFound)
    }

    pub async fn list(&self) -> Result<Vec<Student>, StudentServiceError> {
        Ok(self.repository.list_students().await?)
    }

    /// Applies the provided fields; blank names, emails and passwords are ignored.
    pub async fn update(
        &self,
        document: &str,
        update: ProfileUpdate,
    ) -> Result<Student, StudentServiceError> {
        let changes = StudentChanges {
            name: filled(&update.name).map(str::to_string),
            phone: update.phone.as_deref().map(|phone| phone.trim().to_string()),
            email: filled(&update.email).map(str::to_string),
            credential: filled(&update.password).map(hash_password).transpose()?,
        };

        if changes.is_empty() {
            return self.get(document).await;
        }

        self.repository
            .update_student(document, &changes)
            .await?
            .ok_or(StudentServiceError::NotFound)
    }

    /// Returns whether a student was removed.
    pub async fn delete(&self, document: &str) -> Result<bool, StudentServiceError> {
        let removed = self.repository.delete_student(document).await?;
        if removed {
            info!(document, "student deleted with their evaluations and progress");
        }
        Ok(removed)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StudentServiceError {
    #[error("Faltan campos requeridos")]
    MissingRegistrationFields,
    #[error("Documento y contraseña son requeridos")]
    MissingCredentials,
    #[error("Credenciales inválidas")]
    InvalidCredentials,
    #[error("Estudiante no encontrado")]
    NotFound,
    #[error("Ya existe un estudiante con el documento {0}")]
    DuplicateDocument(String),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl IntoFailure for StudentServiceError {
    fn into_failure(self) -> Failure {
        match self {
            Self::MissingRegistrationFields => Failure::Validation {
                message: self.to_string(),
                required_fields: Some(REQUIRED_REGISTRATION_FIELDS),
            },
            Self::MissingCredentials => Failure::Validation {
                message: self.to_string(),
                required_fields: Some(REQUIRED_LOGIN_FIELDS),
            },
            Self::InvalidCredentials => Failure::Unauthorized(self.to_string()),
            Self::NotFound => Failure::NotFound(self.to_string()),
            Self::DuplicateDocument(_) => Failure::BusinessRule(self.to_string()),
            Self::Credential(_) | Self::Session(_) => Failure::Infrastructure(self.to_string()),
            Self::Repository(err) => err.into_failure(),
        }
    }
}
