use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::extractors::{CurrentUser, Identity},
    error::AppError,
    state::AppState,
};

use super::{
    dto::{CreateWorkoutRequest, UpdateWorkoutRequest},
    repo,
    repo_types::Workout,
};

pub fn workout_routes() -> Router<AppState> {
    Router::new()
        .route("/workouts", post(create_workout))
        .route(
            "/workouts/:id",
            get(get_workout).put(update_workout).delete(delete_workout),
        )
}

#[instrument(skip_all, fields(user_id = user.id, workout_id = id))]
pub async fn get_workout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Workout>, AppError> {
    let workout = repo::get_by_id(&state.db, id).await?;
    Ok(Json(workout))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn create_workout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateWorkoutRequest>,
) -> Result<(StatusCode, HeaderMap, Json<Workout>), AppError> {
    let new = payload.validate().map_err(|e| {
        warn!(error = %e, "invalid workout");
        e
    })?;
    let workout = repo::create(&state.db, user.id, &new).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/v1/workouts/{}", workout.id)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(workout)))
}

#[instrument(skip(state, identity, payload))]
pub async fn update_workout(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateWorkoutRequest>,
) -> Result<Json<Workout>, AppError> {
    if identity.is_anonymous() {
        return Err(AppError::Authentication);
    }
    let patch = payload.validate().map_err(|e| {
        warn!(error = %e, workout_id = id, "invalid workout update");
        e
    })?;
    let workout = repo::update(&state.db, &identity, id, &patch)
        .await
        .map_err(|e| {
            if matches!(e, AppError::Forbidden) {
                warn!(workout_id = id, "update by non-owner rejected");
            }
            e
        })?;
    Ok(Json(workout))
}

#[instrument(skip(state, identity))]
pub async fn delete_workout(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if identity.is_anonymous() {
        return Err(AppError::Authentication);
    }
    repo::delete(&state.db, &identity, id).await.map_err(|e| {
        if matches!(e, AppError::Forbidden) {
            warn!(workout_id = id, "delete by non-owner rejected");
        }
        e
    })?;
    Ok(StatusCode::NO_CONTENT)
}
