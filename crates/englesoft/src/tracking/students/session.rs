use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::domain::Student;
use crate::config::{SessionConfig, MAX_SESSION_TTL_MINUTES};

/// Claims carried by a login token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub nombre: String,
    pub iat: i64,
    pub exp: i64,
}

/// Successful login payload.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    #[serde(rename = "expira")]
    pub expires_at: DateTime<Utc>,
    #[serde(rename = "estudiante")]
    pub student: Student,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("session expiry is out of range")]
    ExpiryOutOfRange,
}

/// Signs HS256 session tokens for authenticated students.
#[derive(Clone)]
pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionIssuer {
    /// `ttl_minutes` is clamped to `1..=MAX_SESSION_TTL_MINUTES`.
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes.clamp(1, MAX_SESSION_TTL_MINUTES)),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(&config.secret, config.ttl_minutes)
    }

    pub fn issue(&self, student: Student) -> Result<Session, SessionError> {
        let issued_at = Utc::now();
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or(SessionError::ExpiryOutOfRange)?;
        let claims = SessionClaims {
            sub: student.document.clone(),
            nombre: student.name.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(Session {
            token,
            expires_at,
            student,
        })
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let validation = Validation::new(Algorithm::HS256);
        Ok(decode::<SessionClaims>(token, &self.decoding, &validation)?.claims)
    }
}

impl fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("keys", &"<redacted>")
            .field("ttl_minutes", &self.ttl.num_minutes())
            .finish()
    }
}
