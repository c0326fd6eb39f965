use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

#[derive(Debug, thiserror::Error)]
#[error("could not hash password: {0}")]
pub struct CredentialError(argon2::password_hash::Error);

/// Hashes `password` with Argon2id under a fresh random salt, returning the PHC string
/// (`$argon2id$v=19$...`).
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(CredentialError)?;
    Ok(hash.to_string())
}

/// Checks `password` against a stored PHC string. Malformed credentials never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_passwords_verify() {
        let stored = hash_password("s3creta").expect("hash");
        assert!(stored.starts_with("$argon2id$"));
        assert!(verify_password("s3creta", &stored));
        assert!(!verify_password("S3creta", &stored));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let first = hash_password("clave").expect("hash");
        let second = hash_password("clave").expect("hash");
        assert_ne!(first, second);
        assert!(verify_password("clave", &first));
        assert!(verify_password("clave", &second));
    }

    #[test]
    fn malformed_credentials_never_verify() {
        assert!(!verify_password("clave", "clave"));
        assert!(!verify_password("clave", "$argon2id$v=19$garbage"));
        assert!(!verify_password("clave", "hmac-sha256$salt$abcd"));
    }
}
