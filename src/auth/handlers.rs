use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest},
        extractors::CurrentUser,
        repo,
        services::authenticate,
        tokens::TokenScope,
    },
    error::AppError,
    state::AppState,
};

pub fn token_routes() -> Router<AppState> {
    Router::new().route(
        "/tokens/authentication",
        post(create_token).delete(revoke_tokens),
    )
}

#[instrument(skip(state, payload))]
pub async fn create_token(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let username = payload.username.trim().to_string();
    if username.is_empty() || payload.password.is_empty() {
        return Err(AppError::Authentication);
    }

    let user = authenticate(&state.db, &username, payload.password).await?;
    let token = repo::create_token(
        &state.db,
        user.id,
        TokenScope::Authentication,
        state.config.token_ttl(),
    )
    .await?;

    match repo::purge_expired(&state.db, OffsetDateTime::now_utc()).await {
        Ok(0) => {}
        Ok(purged) => info!(purged, "expired tokens reaped"),
        Err(e) => warn!(error = %e, "token reaping failed; continuing"),
    }

    info!(user_id = user.id, expiry = %token.expiry, "token issued");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            auth_token: token.into(),
        }),
    ))
}

/// Log out everywhere: drop every authentication token of the caller.
#[instrument(skip_all, fields(user_id = user.id))]
pub async fn revoke_tokens(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, AppError> {
    repo::revoke_all(&state.db, user.id, TokenScope::Authentication).await?;
    info!("authentication tokens revoked");
    Ok(StatusCode::NO_CONTENT)
}
