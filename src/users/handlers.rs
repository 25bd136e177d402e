use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{extractors::CurrentUser, services::hash_blocking},
    error::AppError,
    state::AppState,
};

use super::{
    dto::{RegisterRequest, UpdateMeRequest},
    repo_types::{NewUser, User, UserPatch},
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/me", get(me).patch(update_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let req = payload.validate().map_err(|e| {
        warn!(error = %e, "invalid registration");
        e
    })?;

    let credential = hash_blocking(req.password).await?;
    let user = User::create(
        &state.db,
        NewUser {
            username: req.username,
            email: req.email,
            bio: req.bio,
            credential,
        },
    )
    .await?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdateMeRequest>,
) -> Result<Json<User>, AppError> {
    let req = payload.validate()?;

    // hash before taking the row lock
    let credential = match req.password {
        Some(password) => Some(hash_blocking(password).await?),
        None => None,
    };
    let patch = UserPatch {
        email: req.email,
        bio: req.bio,
        credential,
    };
    User::update_profile(&state.db, user.id, patch).await?;

    let user = User::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;
    Ok(Json(user))
}
