//! Password hashing.
//!
//! Hashing is CPU-bound, so the Argon2 implementation runs on the blocking pool.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use rand::rngs::OsRng;

use crate::error::AuthError;

/// One-way password hashing.
#[async_trait]
pub trait HashingService: Send + Sync {
    /// Hashes `plain` with a fresh random salt.
    async fn hash(&self, plain: &str) -> Result<String, AuthError>;

    /// Checks `plain` against a stored hash.
    ///
    /// Returns `Ok(false)` on mismatch and an error only if `hash` is not a
    /// valid hash string.
    async fn compare(&self, plain: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Argon2id hashing with default parameters, producing PHC strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Hashing;

impl Argon2Hashing {
    fn hash_sync(plain: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Internal(format!("failed to hash password: {e}")))
    }

    fn compare_sync(plain: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AuthError::Internal(format!("invalid password hash: {e}")))?;

        Ok(Argon2::default()
            .verify_password(plain.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

#[async_trait]
impl HashingService for Argon2Hashing {
    async fn hash(&self, plain: &str) -> Result<String, AuthError> {
        let plain = plain.to_string();
        tokio::task::spawn_blocking(move || Self::hash_sync(&plain))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {e}")))?
    }

    async fn compare(&self, plain: &str, hash: &str) -> Result<bool, AuthError> {
        let plain = plain.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || Self::compare_sync(&plain, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {e}")))?
    }
}
