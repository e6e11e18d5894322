use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use axum_valid::Valid;

use crate::{
    dto::session::SavePreferencesRequest,
    error::{AppError, ServiceError},
    state::{SharedState, session::Settings},
};

/// Routes persisting a host's default settings between sessions.
pub fn router() -> Router<SharedState> {
    Router::new().route(
        "/preferences/{user_id}",
        get(get_preferences).put(save_preferences),
    )
}

/// Read a user's stored default settings.
#[utoipa::path(
    get,
    path = "/preferences/{user_id}",
    tag = "preferences",
    params(("user_id" = String, Path, description = "Provider-assigned user id")),
    responses(
        (status = 200, description = "Stored defaults", body = Settings),
        (status = 404, description = "No stored preferences for this user")
    )
)]
pub async fn get_preferences(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Result<Json<Settings>, AppError> {
    let settings = state
        .preferences()
        .load(&user_id)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| AppError::NotFound(format!("no preferences stored for `{user_id}`")))?;
    Ok(Json(settings))
}

/// Store a user's default settings, overwriting any previous blob.
#[utoipa::path(
    put,
    path = "/preferences/{user_id}",
    tag = "preferences",
    params(("user_id" = String, Path, description = "Provider-assigned user id")),
    request_body = SavePreferencesRequest,
    responses(
        (status = 200, description = "Preferences stored", body = Settings)
    )
)]
pub async fn save_preferences(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    Valid(Json(payload)): Valid<Json<SavePreferencesRequest>>,
) -> Result<Json<Settings>, AppError> {
    state
        .preferences()
        .save(&user_id, &payload.settings)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(payload.settings))
}
