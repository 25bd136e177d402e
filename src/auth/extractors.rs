use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::{debug, warn};

use super::{repo, tokens::TokenScope};
use crate::{error::AppError, state::AppState, users::repo_types::User};

/// Who is calling. No header means `Anonymous`; it is never a database row.
#[derive(Debug, Clone)]
pub enum Identity {
    Anonymous,
    Authenticated(User),
}

impl Identity {
    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Authenticated(user) => Some(user),
            Identity::Anonymous => None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    pub fn require_user(self) -> Result<User, AppError> {
        match self {
            Identity::Authenticated(user) => Ok(user),
            Identity::Anonymous => Err(AppError::Authentication),
        }
    }
}

/// `Ok(None)` without an `Authorization` header, `Ok(Some(secret))` for
/// `Bearer <secret>`, and `Err` for anything else.
pub fn bearer_secret(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AppError::Authentication)?;
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(secret), None) if !secret.is_empty() => Ok(Some(secret)),
        _ => Err(AppError::Authentication),
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let secret = match bearer_secret(&parts.headers) {
            Ok(Some(secret)) => secret,
            Ok(None) => return Ok(Identity::Anonymous),
            Err(e) => {
                warn!("malformed authorization header");
                return Err(e);
            }
        };

        match repo::resolve(&state.db, secret, TokenScope::Authentication).await? {
            Some(user) => {
                debug!(user_id = user.id, "token resolved");
                Ok(Identity::Authenticated(user))
            }
            None => {
                warn!("invalid or expired token");
                Err(AppError::Authentication)
            }
        }
    }
}

/// Like `Identity`, but rejects anonymous callers.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let identity = Identity::from_request_parts(parts, state).await?;
        identity.require_user().map(CurrentUser)
    }
}
