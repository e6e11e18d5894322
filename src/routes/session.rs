use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::session::{
        CreateSessionRequest, JoinSessionRequest, SessionSummary, UpdateSettingsRequest,
    },
    error::AppError,
    routes::check_session_code,
    services::{projection::DisplayState, session_service},
    state::SharedState,
};

/// Routes handling the session lifecycle: creation, joining, reads, settings.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{code}", get(get_session))
        .route("/sessions/{code}/join", post(join_session))
        .route("/sessions/{code}/settings", put(update_settings))
        .route("/sessions/{code}/view/{player_id}", get(player_view))
}

/// Open a new session with the caller as host.
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "session",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session created", body = SessionSummary),
        (status = 401, description = "Credential expired or invalid")
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateSessionRequest>>,
) -> Result<Json<SessionSummary>, AppError> {
    let summary = session_service::create_session(&state, payload).await?;
    Ok(Json(summary))
}

/// Read the current session document.
#[utoipa::path(
    get,
    path = "/sessions/{code}",
    tag = "session",
    params(("code" = String, Path, description = "Session code")),
    responses(
        (status = 200, description = "Current session document", body = SessionSummary),
        (status = 404, description = "Unknown session code")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<SessionSummary>, AppError> {
    check_session_code(&code)?;
    let summary = session_service::get_session(&state, &code).await?;
    Ok(Json(summary))
}

/// Join an existing session.
#[utoipa::path(
    post,
    path = "/sessions/{code}/join",
    tag = "session",
    params(("code" = String, Path, description = "Session code")),
    request_body = JoinSessionRequest,
    responses(
        (status = 200, description = "Joined (idempotent for returning players)", body = SessionSummary),
        (status = 404, description = "Unknown session code"),
        (status = 409, description = "Session already ended")
    )
)]
pub async fn join_session(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<JoinSessionRequest>>,
) -> Result<Json<SessionSummary>, AppError> {
    check_session_code(&code)?;
    let summary = session_service::join_session(&state, &code, payload).await?;
    Ok(Json(summary))
}

/// Replace the settings block; host-only while waiting.
#[utoipa::path(
    put,
    path = "/sessions/{code}/settings",
    tag = "session",
    params(("code" = String, Path, description = "Session code")),
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Settings updated", body = SessionSummary),
        (status = 403, description = "Issuer is not the host"),
        (status = 409, description = "Settings are frozen once the game started")
    )
)]
pub async fn update_settings(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<UpdateSettingsRequest>>,
) -> Result<Json<SessionSummary>, AppError> {
    check_session_code(&code)?;
    let summary = session_service::update_settings(&state, &code, payload).await?;
    Ok(Json(summary))
}

/// Derive the per-player view for the latest snapshot.
#[utoipa::path(
    get,
    path = "/sessions/{code}/view/{player_id}",
    tag = "session",
    params(
        ("code" = String, Path, description = "Session code"),
        ("player_id" = String, Path, description = "Player whose view to derive")
    ),
    responses(
        (status = 200, description = "What this player should render", body = DisplayState),
        (status = 404, description = "Unknown session or player")
    )
)]
pub async fn player_view(
    State(state): State<SharedState>,
    Path((code, player_id)): Path<(String, String)>,
) -> Result<Json<DisplayState>, AppError> {
    check_session_code(&code)?;
    let view = session_service::player_view(&state, &code, &player_id).await?;
    Ok(Json(view))
}
