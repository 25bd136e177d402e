use std::fmt;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::error;

use crate::error::AppError;

pub fn hash_password(plain: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            AppError::Hashing(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// `Ok(false)` on mismatch; `Err` only when `hash` is not a PHC string.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        AppError::Hashing(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

lazy_static! {
    static ref DUMMY_HASH: Option<String> = hash_password("liftlog-dummy-password").ok();
}

/// Argon2 hash of a user's password, owned by exactly one `User`.
///
/// The plaintext is never kept. `Debug` is redacted and there is no
/// `Serialize` impl, so the hash cannot leak through logs or JSON.
#[derive(Clone, PartialEq, Eq, sqlx::Type)]
#[sqlx(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn hash(plain: &str) -> Result<Self, AppError> {
        hash_password(plain).map(Self)
    }

    pub fn verify(&self, plain: &str) -> Result<bool, AppError> {
        verify_password(plain, &self.0)
    }

    /// Burns the same work as a real verification and always fails.
    /// Used when the user does not exist, so the two cases cost the same.
    pub fn verify_against_dummy(plain: &str) -> bool {
        if let Some(hash) = DUMMY_HASH.as_deref() {
            let _ = verify_password(plain, hash);
        }
        false
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}
