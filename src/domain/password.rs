//! Password value object: Argon2 hashing and verification.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::config::MIN_PASSWORD_LENGTH;
use crate::errors::{AppError, AppResult};

/// Upper bound on accepted passwords; hashing cost grows with input size.
const MAX_PASSWORD_LENGTH: usize = 128;

/// A well-formed Argon2id hash that no password verifies against. Used to
/// keep login timing identical for unknown accounts.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$1nB6QE4d6tq2B2qW8V0C0m0o0G7Hq8tqkqHk0tYt1aQ";

/// Hashed password. Never holds plain text.
#[derive(Clone)]
pub struct Password {
    hash: String,
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("hash", &"[REDACTED]")
            .finish()
    }
}

impl Password {
    /// Hash a plain text password after checking its length bounds.
    pub fn new(plain_text: &str) -> AppResult<Self> {
        let length = plain_text.chars().count();
        if length < MIN_PASSWORD_LENGTH as usize {
            return Err(AppError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        if length > MAX_PASSWORD_LENGTH {
            return Err(AppError::validation(format!(
                "Password must be at most {} characters",
                MAX_PASSWORD_LENGTH
            )));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain_text.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Password hash failed: {}", e)))?
            .to_string();
        Ok(Self { hash })
    }

    /// Wrap a hash loaded from the database.
    pub fn from_hash(hash: String) -> Self {
        Self { hash }
    }

    /// Stand-in used when the account does not exist.
    pub fn dummy() -> Self {
        Self::from_hash(DUMMY_HASH.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }

    pub fn into_string(self) -> String {
        self.hash
    }

    /// Verify a plain text password. Malformed hashes never verify.
    pub fn verify(&self, plain_text: &str) -> bool {
        match PasswordHash::new(&self.hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(plain_text.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!("Stored password hash is malformed: {}", e);
                false
            }
        }
    }
}

impl From<Password> for String {
    fn from(password: Password) -> Self {
        password.hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_and_verify() {
        let password = Password::new("SecurePassword123!").unwrap();
        assert!(password.verify("SecurePassword123!"));
        assert!(!password.verify("WrongPassword123"));
    }

    #[test]
    fn test_password_from_hash() {
        let hash = Password::new("TestPassword123").unwrap().into_string();
        assert!(Password::from_hash(hash).verify("TestPassword123"));
    }

    #[test]
    fn test_same_password_different_salts() {
        let pass1 = Password::new("SamePassword123").unwrap();
        let pass2 = Password::new("SamePassword123").unwrap();
        assert_ne!(pass1.as_str(), pass2.as_str());
    }

    #[test]
    fn test_length_bounds() {
        assert!(Password::new("short").is_err());
        assert!(Password::new("12345678").is_ok());
        assert!(Password::new(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_dummy_never_verifies() {
        assert!(!Password::dummy().verify("anything"));
        assert!(!Password::dummy().verify(""));
    }

    #[test]
    fn test_debug_is_redacted() {
        let password = Password::new("SecurePassword123!").unwrap();
        assert!(!format!("{:?}", password).contains("argon2"));
    }
}
