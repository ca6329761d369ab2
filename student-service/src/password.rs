//! Password hashing

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use error::AppError;

/// Hashes and checks account passwords.
pub trait PasswordEncoder: Send + Sync {
    /// Hash a raw password into a self-describing string.
    fn encode(&self, raw: &str) -> Result<String, AppError>;

    /// Check a raw password against a stored hash. Unparseable hashes never match.
    fn matches(&self, raw: &str, encoded: &str) -> bool;
}

/// Argon2id with the crate's default parameters.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2PasswordEncoder;

impl Argon2PasswordEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl PasswordEncoder for Argon2PasswordEncoder {
    fn encode(&self, raw: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(raw.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                tracing::error!("Failed to hash password: {}", e);
                AppError::Internal("password hashing failed".to_string())
            })
    }

    fn matches(&self, raw: &str, encoded: &str) -> bool {
        match PasswordHash::new(encoded) {
            Ok(parsed) => Argon2::default().verify_password(raw.as_bytes(), &parsed).is_ok(),
            Err(e) => {
                tracing::warn!("Stored password hash is unreadable: {}", e);
                false
            }
        }
    }
}
