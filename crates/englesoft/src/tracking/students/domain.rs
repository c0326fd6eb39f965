use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered learner. The credential hash never leaves the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Student {
    #[serde(rename = "documento")]
    pub document: String,
    #[serde(rename = "nombres")]
    pub name: String,
    #[serde(rename = "telefono")]
    pub phone: String,
    #[serde(rename = "correo")]
    pub email: String,
    #[serde(skip_serializing)]
    pub credential: String,
    #[serde(rename = "fecha_registro")]
    pub registered_at: DateTime<Utc>,
}

/// Body of `POST /api/usuarios/registro`. Every field is optional on the wire so missing
/// values surface as a validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    #[serde(rename = "documento", default)]
    pub document: Option<String>,
    #[serde(rename = "nombres", default)]
    pub name: Option<String>,
    #[serde(rename = "telefono", default)]
    pub phone: Option<String>,
    #[serde(rename = "correo", default)]
    pub email: Option<String>,
    #[serde(rename = "contrasena", default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(rename = "documento", default)]
    pub document: Option<String>,
    #[serde(rename = "contrasena", default)]
    pub password: Option<String>,
}

/// Body of `PUT /api/usuarios/:documento`; absent fields stay untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(rename = "nombres", default)]
    pub name: Option<String>,
    #[serde(rename = "telefono", default)]
    pub phone: Option<String>,
    #[serde(rename = "correo", default)]
    pub email: Option<String>,
    #[serde(rename = "contrasena", default)]
    pub password: Option<String>,
}

/// Column-level changes handed to the repository once the password has been hashed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentChanges {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub credential: Option<String>,
}

impl StudentChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.email.is_none() && self.credential.is_none()
    }

    pub fn apply_to(&self, student: &mut Student) {
        if let Some(name) = &self.name {
            student.name = name.clone();
        }
        if let Some(phone) = &self.phone {
            student.phone = phone.clone();
        }
        if let Some(email) = &self.email {
            student.email = email.clone();
        }
        if let Some(credential) = &self.credential {
            student.credential = credential.clone();
        }
    }
}

/// Returns the trimmed value when present and non-blank.
pub(crate) fn filled(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
