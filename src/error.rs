//! Error kinds shared by the stores, the auth layer and the HTTP handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Message used for every authentication failure, whatever the cause.
pub const INVALID_CREDENTIALS: &str = "invalid authentication credentials";

/// Postgres SQLSTATE for a statement cancelled by `statement_timeout`.
const QUERY_CANCELED: &str = "57014";

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input; the caller's fault.
    #[error("{0}")]
    Validation(String),

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// Uniqueness violation.
    #[error("{0}")]
    Conflict(String),

    /// Authenticated but not allowed to touch the resource.
    #[error("you are not allowed to modify this resource")]
    Forbidden,

    /// Missing, malformed, unknown or expired credential or token.
    #[error("{}", INVALID_CREDENTIALS)]
    Authentication,

    /// I/O or transaction failure; safe for the caller to retry.
    #[error("store error while {context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// Pool acquisition or statement timed out; the transaction was rolled back.
    #[error("store unavailable while {context}")]
    Unavailable { context: &'static str },

    /// Password hashing primitive failed.
    #[error("hashing error: {0}")]
    Hashing(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Classify a sqlx error raised while performing `context`.
    pub fn from_sqlx(context: &'static str, err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Self::Conflict(format!("{context}: duplicate value"))
            }
            sqlx::Error::Database(ref db) if db.is_check_violation() => {
                Self::Validation(format!("{context}: constraint violated"))
            }
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some(QUERY_CANCELED) => {
                Self::Unavailable { context }
            }
            sqlx::Error::PoolTimedOut => Self::Unavailable { context },
            source => Self::Store { context, source },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store { .. } | Self::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// `map_err` adaptor that attaches the operation name to a sqlx error.
pub fn store_err(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::from_sqlx(context, e)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Store { .. } | Self::Hashing(_) => {
                error!(error = %self, "request failed");
                "internal server error".to_string()
            }
            Self::Unavailable { .. } => {
                error!(error = %self, "request failed");
                "service temporarily unavailable".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
