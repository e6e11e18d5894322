//! Round coordinator: selection intake, guess intake, scoring confirmation,
//! and round advance with host rotation.
//!
//! Every mutating intent follows the same shape: take the session's
//! transition gate, re-read the document, re-validate phase and authority
//! against that fresh snapshot, then commit one atomic patch. A rejected
//! intent commits nothing.

use std::collections::HashSet;
use std::time::{Duration, SystemTime};

use tracing::{info, warn};

use crate::{
    dto::session::{
        ConfirmScoresRequest, GuessRequest, IntentRequest, PlaybackAction, PlaybackOutcome,
        PlaybackRequest, ScoringView, SelectionRequest, SessionSummary,
    },
    error::ServiceError,
    services::{
        authority, scoring,
        session_service::{commit, read_required},
    },
    state::{
        SharedState,
        session::{
            DocumentPatch, FieldWrite, Guess, MIN_THEME_CHARS, Player, ROUND_ITEM_COUNT, Round,
            SessionDocument,
        },
        state_machine::{Intent, SessionPhase, TransitionRejection, compute_transition},
    },
};

/// Host opens the first selection from the lobby.
pub async fn start_game(
    state: &SharedState,
    code: &str,
    request: IntentRequest,
) -> Result<SessionSummary, ServiceError> {
    let store = state.require_session_store().await?;

    state
        .run_intent(code, || async {
            let document = read_required(&store, code).await?;
            authority::ensure_open(&document)?;
            if document.players.is_empty() {
                return Err(TransitionRejection::NoPlayers.into());
            }
            authority::require_host(&document, &request.player_id, "start the game")?;
            let next = compute_transition(document.phase, Intent::Start, document.is_final_round())
                .map_err(TransitionRejection::from)?;

            let updated = commit(&store, code, DocumentPatch::new().with(FieldWrite::Phase(next)))
                .await?;
            info!(code, "game started");
            Ok(updated.into())
        })
        .await
}

/// Selector submits the theme and the five items, opening the round.
///
/// The round and the move to playing land in one patch; a snapshot with
/// `phase = playing` but no active round is unrepresentable.
pub async fn submit_selection(
    state: &SharedState,
    code: &str,
    request: SelectionRequest,
) -> Result<SessionSummary, ServiceError> {
    let store = state.require_session_store().await?;

    state
        .run_intent(code, || async {
            let document = read_required(&store, code).await?;
            authority::ensure_open(&document)?;
            let next = compute_transition(
                document.phase,
                Intent::SubmitSelection,
                document.is_final_round(),
            )
            .map_err(TransitionRejection::from)?;
            let selector =
                authority::require_designated_selector(&document, &request.player_id)?;

            let theme = request.theme.trim().to_owned();
            if theme.chars().count() < MIN_THEME_CHARS {
                return Err(TransitionRejection::ThemeTooShort {
                    min: MIN_THEME_CHARS,
                }
                .into());
            }
            if request.items.len() != ROUND_ITEM_COUNT {
                return Err(TransitionRejection::WrongItemCount {
                    got: request.items.len(),
                }
                .into());
            }
            let mut seen = HashSet::new();
            if !request.items.iter().all(|item| seen.insert(&item.id)) {
                return Err(TransitionRejection::DuplicateItems.into());
            }

            let round = Round::new(
                selector.id.clone(),
                theme,
                request.items.clone(),
                SystemTime::now(),
            );
            let patch = DocumentPatch::new()
                .with(FieldWrite::ActiveRound(Some(round)))
                .with(FieldWrite::Phase(next));
            let updated = commit(&store, code, patch).await?;
            info!(code, selector = %selector.id, "selection submitted");
            Ok(updated.into())
        })
        .await
}

/// A guessing player submits (or resubmits) its answers.
///
/// The write is scoped to the issuer's own guess key, so concurrent
/// submissions from different players commute.
pub async fn submit_guess(
    state: &SharedState,
    code: &str,
    request: GuessRequest,
) -> Result<SessionSummary, ServiceError> {
    let store = state.require_session_store().await?;

    state
        .run_intent(code, || async {
            let document = read_required(&store, code).await?;
            authority::ensure_open(&document)?;
            if document.phase != SessionPhase::Playing {
                return Err(TransitionRejection::GuessingClosed {
                    phase: document.phase,
                }
                .into());
            }
            let round = active_round(&document)?;
            let member = authority::require_member(&document, &request.player_id)?;
            if member.id == round.selector_id {
                return Err(TransitionRejection::SelectorCannotGuess.into());
            }
            for item_id in request.item_guesses.keys() {
                if round.item(item_id).is_none() {
                    return Err(TransitionRejection::UnknownItem(item_id.clone()).into());
                }
            }

            // First submissions always land; the lock only refuses overwrites
            // once the think timer has elapsed.
            let resubmission = round.guesses.contains_key(&member.id);
            if resubmission
                && document.settings.lock_answers_at_timeout
                && think_timer_elapsed(round, &document)
            {
                return Err(TransitionRejection::AnswersLocked.into());
            }

            let player_id = member.id.clone();
            let patch = DocumentPatch::new().with(FieldWrite::PlayerGuess {
                player_id,
                guess: Guess::from(request),
            });
            let updated = commit(&store, code, patch).await?;
            Ok(updated.into())
        })
        .await
}

fn think_timer_elapsed(round: &Round, document: &SessionDocument) -> bool {
    let elapsed = SystemTime::now()
        .duration_since(round.started_at)
        .unwrap_or_default();
    elapsed >= Duration::from_secs(u64::from(document.settings.think_duration_secs))
}

/// Selector (or host) closes the guessing window.
pub async fn finish_round(
    state: &SharedState,
    code: &str,
    request: IntentRequest,
) -> Result<SessionSummary, ServiceError> {
    let store = state.require_session_store().await?;

    state
        .run_intent(code, || async {
            let document = read_required(&store, code).await?;
            authority::ensure_open(&document)?;
            let next = compute_transition(
                document.phase,
                Intent::SelectorFinish,
                document.is_final_round(),
            )
            .map_err(TransitionRejection::from)?;
            let round = active_round(&document)?;
            authority::require_selector_or_host(&document, round, &request.player_id)?;

            let updated = commit(&store, code, DocumentPatch::new().with(FieldWrite::Phase(next)))
                .await?;
            Ok(updated.into())
        })
        .await
}

/// The scorer fetches the round truths, raw guesses, and the advisory sheet.
pub async fn scoring_view(
    state: &SharedState,
    code: &str,
    player_id: &str,
) -> Result<ScoringView, ServiceError> {
    let store = state.require_session_store().await?;
    let document = read_required(&store, code).await?;
    if document.phase != SessionPhase::Scoring {
        return Err(ServiceError::InvalidState(
            "scores can only be reviewed during the scoring phase".into(),
        ));
    }
    let round = active_round(&document)?;
    authority::require_selector_or_host(&document, round, player_id)?;

    Ok(ScoringView {
        sheet: scoring::prefill(round),
        round: round.clone().into(),
    })
}

/// The scorer commits the graded sheet.
///
/// New cumulative scores, awarded points, and the results phase land in one
/// patch; the selector's score is carried through untouched.
pub async fn confirm_scores(
    state: &SharedState,
    code: &str,
    request: ConfirmScoresRequest,
) -> Result<SessionSummary, ServiceError> {
    let store = state.require_session_store().await?;

    state
        .run_intent(code, || async {
            let document = read_required(&store, code).await?;
            authority::ensure_open(&document)?;
            compute_transition(
                document.phase,
                Intent::ConfirmScores,
                document.is_final_round(),
            )
            .map_err(TransitionRejection::from)?;
            let round = active_round(&document)?;
            authority::require_selector_or_host(&document, round, &request.player_id)?;
            scoring::validate_sheet(&document, round, &request.sheet)?;

            let patch = scoring::confirm_patch(&document, &request.sheet);
            let updated = commit(&store, code, patch).await?;
            info!(code, scorer = %request.player_id, "scores confirmed");
            Ok(updated.into())
        })
        .await
}

/// Host advances past the results: rotate and open the next selection, or
/// end the game when the configured rounds are played out.
pub async fn advance_round(
    state: &SharedState,
    code: &str,
    request: IntentRequest,
) -> Result<SessionSummary, ServiceError> {
    let store = state.require_session_store().await?;

    let summary: SessionSummary = state
        .run_intent(code, || async {
            let document = read_required(&store, code).await?;
            authority::ensure_open(&document)?;
            authority::require_host(&document, &request.player_id, "advance the round")?;
            let next =
                compute_transition(document.phase, Intent::Advance, document.is_final_round())
                    .map_err(TransitionRejection::from)?;

            let patch = if next == SessionPhase::GameOver {
                // The game ends as it stands: no rotation, no counter bump.
                DocumentPatch::new()
                    .with(FieldWrite::ActiveRound(None))
                    .with(FieldWrite::Phase(SessionPhase::GameOver))
            } else {
                DocumentPatch::new()
                    .with(FieldWrite::Players(rotated_players(&document.players)))
                    .with(FieldWrite::ActiveRound(None))
                    .with(FieldWrite::CurrentRound(document.current_round + 1))
                    .with(FieldWrite::Phase(SessionPhase::Selecting))
            };
            let updated = commit(&store, code, patch).await?;
            info!(code, phase = ?updated.phase, "round advanced");
            Ok(SessionSummary::from(updated))
        })
        .await?;

    if summary.phase == SessionPhase::GameOver {
        state.drop_gate(code);
    }
    Ok(summary)
}

/// Relay a play/pause command for the issuing player's device.
///
/// Failures are reported in the outcome and never touch the session
/// document; a broken player must not be able to stall the game.
pub async fn control_playback(
    state: &SharedState,
    code: &str,
    request: PlaybackRequest,
) -> Result<PlaybackOutcome, ServiceError> {
    let store = state.require_session_store().await?;
    let document = read_required(&store, code).await?;
    authority::require_member(&document, &request.player_id)?;

    let command = match request.action {
        PlaybackAction::Pause => {
            state
                .playback()
                .pause(&request.credential, &request.device_ref)
                .await
        }
        PlaybackAction::Play => {
            let item_id = request
                .item_id
                .as_deref()
                .ok_or_else(|| ServiceError::InvalidInput("play requires an item id".into()))?;
            let round = active_round(&document)?;
            let item = round
                .item(item_id)
                .ok_or_else(|| TransitionRejection::UnknownItem(item_id.to_owned()))?;
            let Some(playable_ref) = item.playable_ref.as_deref() else {
                return Ok(PlaybackOutcome {
                    ok: false,
                    message: Some("item has no playable reference".into()),
                });
            };
            state
                .playback()
                .play(&request.credential, &request.device_ref, playable_ref)
                .await
        }
    };

    match command {
        Ok(()) => Ok(PlaybackOutcome {
            ok: true,
            message: None,
        }),
        Err(err) => {
            warn!(code, error = %err, "playback command failed");
            Ok(PlaybackOutcome {
                ok: false,
                message: Some(err.to_string()),
            })
        }
    }
}

fn active_round(document: &SessionDocument) -> Result<&Round, ServiceError> {
    document.active_round.as_ref().ok_or_else(|| {
        // Unreachable when every write goes through the coordinator; a
        // snapshot in a round phase always carries its round.
        ServiceError::InvalidState(format!(
            "session is {:?} but has no active round",
            document.phase
        ))
    })
}

fn rotated_players(players: &[Player]) -> Vec<Player> {
    let next = (authority::host_index(players) + 1) % players.len();
    players
        .iter()
        .cloned()
        .enumerate()
        .map(|(index, mut player)| {
            player.is_host = index == next;
            player
        })
        .collect()
}
