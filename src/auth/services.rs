use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::{error, warn};

use crate::auth::password::Credential;
use crate::error::{AppError, AppResult};
use crate::users::repo_types::User;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Argon2 off the async workers.
pub async fn hash_blocking(plain: String) -> AppResult<Credential> {
    tokio::task::spawn_blocking(move || Credential::hash(&plain))
        .await
        .map_err(|e| AppError::Hashing(format!("hashing task failed: {e}")))?
}

/// Check a username/password pair.
///
/// Unknown user, wrong password and an unreadable stored hash all come back
/// as `Authentication`, and an unknown user still pays for one verification.
pub async fn authenticate(db: &PgPool, username: &str, password: String) -> AppResult<User> {
    let user = User::find_by_username(db, username).await?;

    let outcome = tokio::task::spawn_blocking(move || match user {
        Some(user) => user.credential.verify(&password).map(|ok| ok.then_some(user)),
        None => {
            Credential::verify_against_dummy(&password);
            Ok(None)
        }
    })
    .await
    .map_err(|e| AppError::Hashing(format!("verify task failed: {e}")))?;

    match outcome {
        Ok(Some(user)) => Ok(user),
        Ok(None) => {
            warn!(username, "login rejected");
            Err(AppError::Authentication)
        }
        Err(e) => {
            error!(error = %e, username, "stored credential unreadable");
            Err(AppError::Authentication)
        }
    }
}
