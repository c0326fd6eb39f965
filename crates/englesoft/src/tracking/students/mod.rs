//! Student registry: registration, login sessions and profile maintenance.

pub(crate) mod credentials;
pub mod domain;
pub mod router;
pub mod service;
pub mod session;

pub use domain::{LoginRequest, ProfileUpdate, RegistrationRequest, Student, StudentChanges};
pub use router::student_routes;
pub use service::{StudentService, StudentServiceError, REQUIRED_REGISTRATION_FIELDS};
pub use session::{Session, SessionClaims, SessionIssuer};
