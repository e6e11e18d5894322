//! Finite state machine over the session lifecycle phases.
//!
//! The engine is deliberately pure: it looks at a phase and an intent and
//! either names the next phase or returns a typed rejection. Authority and
//! payload guards layer on top of it (see `services::authority` and the
//! round coordinator) and re-use the same rejection taxonomy, so a guard
//! failure is always observable as a value, never a silent no-op.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::state::session::{ItemId, PlayerId, ROUND_ITEM_COUNT};

/// Coarse-grained lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Lobby: players join, the host tunes settings.
    Waiting,
    /// The designated selector is picking a theme and five tracks.
    Selecting,
    /// Tracks are playing and guesses are coming in.
    Playing,
    /// The scorer is grading the submitted guesses.
    Scoring,
    /// Round standings are on display before the next round.
    Results,
    /// Terminal: the session accepts no further writes.
    GameOver,
}

/// Phase-changing intents a client can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Host opens the first round from the lobby.
    Start,
    /// Selector submits the theme and items, creating the round.
    SubmitSelection,
    /// Selector (or host) closes the guessing window.
    SelectorFinish,
    /// Scorer commits the graded sheet.
    ConfirmScores,
    /// Host moves on to the next round or ends the game.
    Advance,
}

/// Error returned when an intent cannot be applied from the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {intent:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the session was in when the intent was received.
    pub from: SessionPhase,
    /// The intent that cannot be applied from this phase.
    pub intent: Intent,
}

/// Compute the phase an intent leads to, if it is legal at all.
///
/// `final_round` decides the fork at the end of the results phase: once the
/// round counter has reached the configured total, `Advance` ends the game
/// instead of opening another selection.
pub fn compute_transition(
    from: SessionPhase,
    intent: Intent,
    final_round: bool,
) -> Result<SessionPhase, InvalidTransition> {
    let next = match (from, intent) {
        (SessionPhase::Waiting, Intent::Start) => SessionPhase::Selecting,
        (SessionPhase::Selecting, Intent::SubmitSelection) => SessionPhase::Playing,
        (SessionPhase::Playing, Intent::SelectorFinish) => SessionPhase::Scoring,
        (SessionPhase::Scoring, Intent::ConfirmScores) => SessionPhase::Results,
        (SessionPhase::Results, Intent::Advance) if final_round => SessionPhase::GameOver,
        (SessionPhase::Results, Intent::Advance) => SessionPhase::Selecting,
        (from, intent) => return Err(InvalidTransition { from, intent }),
    };

    Ok(next)
}

/// Typed rejection raised by any guard along an intent's path.
///
/// A rejected intent never mutates the session document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionRejection {
    /// The intent is not legal from the current phase.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// A host-only intent came from somebody else.
    #[error("only the host may {action}")]
    NotHost {
        /// What the issuer tried to do.
        action: &'static str,
    },
    /// A selection came from a player other than the designated selector.
    #[error("only the designated selector may submit the selection")]
    NotSelector,
    /// A scoring intent came from neither the selector nor the host.
    #[error("only the selector (or the host) may score this round")]
    NotScorer,
    /// Start was issued against a session without players.
    #[error("the session has no players")]
    NoPlayers,
    /// A selection arrived with the wrong number of items.
    #[error("a selection needs exactly {ROUND_ITEM_COUNT} items (got {got})")]
    WrongItemCount {
        /// Number of items actually submitted.
        got: usize,
    },
    /// A selection contained the same item twice.
    #[error("selection items must be distinct")]
    DuplicateItems,
    /// The secret theme is below the minimum length.
    #[error("the theme must be at least {min} characters")]
    ThemeTooShort {
        /// Required minimum, after trimming.
        min: usize,
    },
    /// The selector tried to submit a guess for its own round.
    #[error("the selector does not submit guesses")]
    SelectorCannotGuess,
    /// The issuer is not part of this session.
    #[error("player `{0}` is not part of this session")]
    UnknownPlayer(PlayerId),
    /// A guess was issued outside the playing phase.
    #[error("guesses are only accepted while playing (currently {phase:?})")]
    GuessingClosed {
        /// Phase the session was actually in.
        phase: SessionPhase,
    },
    /// A resubmission arrived after the think timer with the lock enabled.
    #[error("answers are locked for this round")]
    AnswersLocked,
    /// A settings write arrived outside the lobby.
    #[error("settings can only be changed while waiting for the game to start")]
    SettingsFrozen,
    /// Any write against a finished session.
    #[error("the session has ended")]
    SessionClosed,
    /// A guess or score referenced an item outside the active round.
    #[error("item `{0}` is not part of the active round")]
    UnknownItem(ItemId),
    /// A score-sheet entry targeted a player without a submitted guess.
    #[error("player `{0}` did not submit a guess this round")]
    NotAGuesser(PlayerId),
}
