use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use axum_valid::Valid;
use serde::Deserialize;

use crate::{
    dto::session::{
        ConfirmScoresRequest, GuessRequest, IntentRequest, PlaybackOutcome, PlaybackRequest,
        ScoringView, SelectionRequest, SessionSummary,
    },
    error::AppError,
    routes::check_session_code,
    services::round_service,
    state::SharedState,
};

/// Routes driving the round lifecycle: start, selection, guesses, scoring,
/// advance, and playback relay.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions/{code}/start", post(start_game))
        .route("/sessions/{code}/selection", post(submit_selection))
        .route("/sessions/{code}/guesses", put(submit_guess))
        .route("/sessions/{code}/finish", post(finish_round))
        .route("/sessions/{code}/scoring", get(scoring_view))
        .route("/sessions/{code}/scores", post(confirm_scores))
        .route("/sessions/{code}/advance", post(advance_round))
        .route("/sessions/{code}/playback", post(control_playback))
}

/// Host opens the first selection from the lobby.
#[utoipa::path(
    post,
    path = "/sessions/{code}/start",
    tag = "round",
    params(("code" = String, Path, description = "Session code")),
    request_body = IntentRequest,
    responses(
        (status = 200, description = "Session is now selecting", body = SessionSummary),
        (status = 403, description = "Issuer is not the host"),
        (status = 409, description = "Not startable from the current phase")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<IntentRequest>>,
) -> Result<Json<SessionSummary>, AppError> {
    check_session_code(&code)?;
    let summary = round_service::start_game(&state, &code, payload).await?;
    Ok(Json(summary))
}

/// Selector submits the secret theme and the five items.
#[utoipa::path(
    post,
    path = "/sessions/{code}/selection",
    tag = "round",
    params(("code" = String, Path, description = "Session code")),
    request_body = SelectionRequest,
    responses(
        (status = 200, description = "Round created, session is playing", body = SessionSummary),
        (status = 400, description = "Wrong item count, duplicate items, or short theme"),
        (status = 403, description = "Issuer is not the designated selector")
    )
)]
pub async fn submit_selection(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<SelectionRequest>>,
) -> Result<Json<SessionSummary>, AppError> {
    check_session_code(&code)?;
    let summary = round_service::submit_selection(&state, &code, payload).await?;
    Ok(Json(summary))
}

/// Submit or overwrite the issuer's guesses for the active round.
#[utoipa::path(
    put,
    path = "/sessions/{code}/guesses",
    tag = "round",
    params(("code" = String, Path, description = "Session code")),
    request_body = GuessRequest,
    responses(
        (status = 200, description = "Guess recorded", body = SessionSummary),
        (status = 403, description = "The selector cannot guess"),
        (status = 409, description = "Guessing closed or answers locked")
    )
)]
pub async fn submit_guess(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<GuessRequest>>,
) -> Result<Json<SessionSummary>, AppError> {
    check_session_code(&code)?;
    let summary = round_service::submit_guess(&state, &code, payload).await?;
    Ok(Json(summary))
}

/// Selector (or host) closes the guessing window.
#[utoipa::path(
    post,
    path = "/sessions/{code}/finish",
    tag = "round",
    params(("code" = String, Path, description = "Session code")),
    request_body = IntentRequest,
    responses(
        (status = 200, description = "Session is now scoring", body = SessionSummary),
        (status = 403, description = "Issuer may not close the round")
    )
)]
pub async fn finish_round(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<IntentRequest>>,
) -> Result<Json<SessionSummary>, AppError> {
    check_session_code(&code)?;
    let summary = round_service::finish_round(&state, &code, payload).await?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
/// Identifies the scorer requesting the review sheet.
pub struct ScorerQuery {
    /// Issuing player; must be the selector or the host.
    pub player_id: String,
}

/// Fetch the round truths, raw guesses, and the advisory pre-filled sheet.
#[utoipa::path(
    get,
    path = "/sessions/{code}/scoring",
    tag = "round",
    params(
        ("code" = String, Path, description = "Session code"),
        ("player_id" = String, Query, description = "Issuing player; must be the scorer")
    ),
    responses(
        (status = 200, description = "Scoring sheet", body = ScoringView),
        (status = 403, description = "Issuer may not score this round")
    )
)]
pub async fn scoring_view(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Query(query): Query<ScorerQuery>,
) -> Result<Json<ScoringView>, AppError> {
    check_session_code(&code)?;
    let view = round_service::scoring_view(&state, &code, &query.player_id).await?;
    Ok(Json(view))
}

/// Scorer commits the graded sheet.
#[utoipa::path(
    post,
    path = "/sessions/{code}/scores",
    tag = "round",
    params(("code" = String, Path, description = "Session code")),
    request_body = ConfirmScoresRequest,
    responses(
        (status = 200, description = "Scores applied, session shows results", body = SessionSummary),
        (status = 400, description = "Sheet references unknown players or items"),
        (status = 403, description = "Issuer may not score this round")
    )
)]
pub async fn confirm_scores(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<ConfirmScoresRequest>>,
) -> Result<Json<SessionSummary>, AppError> {
    check_session_code(&code)?;
    let summary = round_service::confirm_scores(&state, &code, payload).await?;
    Ok(Json(summary))
}

/// Host rotates into the next round or ends the game.
#[utoipa::path(
    post,
    path = "/sessions/{code}/advance",
    tag = "round",
    params(("code" = String, Path, description = "Session code")),
    request_body = IntentRequest,
    responses(
        (status = 200, description = "Next selection opened or game over", body = SessionSummary),
        (status = 403, description = "Issuer is not the host")
    )
)]
pub async fn advance_round(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<IntentRequest>>,
) -> Result<Json<SessionSummary>, AppError> {
    check_session_code(&code)?;
    let summary = round_service::advance_round(&state, &code, payload).await?;
    Ok(Json(summary))
}

/// Relay a play/pause command; failures never affect the game state.
#[utoipa::path(
    post,
    path = "/sessions/{code}/playback",
    tag = "round",
    params(("code" = String, Path, description = "Session code")),
    request_body = PlaybackRequest,
    responses(
        (status = 200, description = "Command outcome (failures are non-fatal)", body = PlaybackOutcome)
    )
)]
pub async fn control_playback(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<PlaybackRequest>>,
) -> Result<Json<PlaybackOutcome>, AppError> {
    check_session_code(&code)?;
    let outcome = round_service::control_playback(&state, &code, payload).await?;
    Ok(Json(outcome))
}
