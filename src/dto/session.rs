use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::{format_system_time, validation::validate_settings},
    services::scoring::ScoreSheet,
    state::{
        session::{ContentItem, Guess, ItemGuess, ItemId, Player, PlayerId, Round, SessionDocument, Settings},
        state_machine::SessionPhase,
    },
};

/// Payload used to open a brand-new session.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateSessionRequest {
    /// Bearer credential for the identity provider.
    #[validate(length(min = 1))]
    pub credential: String,
    /// Settings override; when absent, the host's stored preferences (or the
    /// built-in defaults) seed the session.
    #[serde(default)]
    #[validate(custom(function = validate_settings))]
    pub settings: Option<Settings>,
}

/// Payload used to join an existing session.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinSessionRequest {
    /// Bearer credential for the identity provider.
    #[validate(length(min = 1))]
    pub credential: String,
}

/// Host-issued settings update while the session is waiting.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateSettingsRequest {
    /// Issuing player.
    #[validate(length(min = 1))]
    pub player_id: PlayerId,
    /// Replacement settings block.
    #[validate(custom(function = validate_settings))]
    pub settings: Settings,
}

/// Bare intent carrying only its issuer (start, finish, advance).
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct IntentRequest {
    /// Issuing player.
    #[validate(length(min = 1))]
    pub player_id: PlayerId,
}

/// The selector's round submission: secret theme plus exactly five items.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SelectionRequest {
    /// Issuing player; must be the designated selector.
    #[validate(length(min = 1))]
    pub player_id: PlayerId,
    /// Secret theme hidden in the selection.
    pub theme: String,
    /// The five chosen items.
    pub items: Vec<ContentItem>,
}

/// One player's guesses for the active round.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct GuessRequest {
    /// Issuing player; writes only its own guess key.
    #[validate(length(min = 1))]
    pub player_id: PlayerId,
    /// Guess at the secret theme.
    #[serde(default)]
    pub theme_guess: Option<String>,
    /// Per-item answers; items may be skipped.
    #[serde(default)]
    pub item_guesses: IndexMap<ItemId, ItemGuess>,
}

impl From<GuessRequest> for Guess {
    fn from(request: GuessRequest) -> Self {
        Self {
            theme_guess: request
                .theme_guess
                .map(|theme| theme.trim().to_owned())
                .filter(|theme| !theme.is_empty()),
            item_guesses: request.item_guesses,
            awarded_points: None,
        }
    }
}

/// The scorer's confirmed sheet.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ConfirmScoresRequest {
    /// Issuing player; must be the selector or the host.
    #[validate(length(min = 1))]
    pub player_id: PlayerId,
    /// Final grades per guessing player.
    pub sheet: ScoreSheet,
}

/// Playback command kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackAction {
    /// Start playing an item of the active round.
    Play,
    /// Pause the device.
    Pause,
}

/// Remote-control request for the issuing player's device.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PlaybackRequest {
    /// Issuing player.
    #[validate(length(min = 1))]
    pub player_id: PlayerId,
    /// Bearer credential for the playback controller.
    #[validate(length(min = 1))]
    pub credential: String,
    /// Target device reference.
    #[validate(length(min = 1))]
    pub device_ref: String,
    /// What to do.
    pub action: PlaybackAction,
    /// Item to play; required for [`PlaybackAction::Play`].
    #[serde(default)]
    pub item_id: Option<ItemId>,
}

/// Result of a playback command; failures are non-fatal by design.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlaybackOutcome {
    /// Whether the command reached the device.
    pub ok: bool,
    /// Failure detail for the dismissible client notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Public projection of the active round.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundSummary {
    /// Player who picked this round's content.
    pub selector_id: PlayerId,
    /// The secret theme (visible here; the per-player view redacts it).
    pub theme: String,
    /// The five chosen items.
    pub items: Vec<ContentItem>,
    /// Submitted guesses keyed by player.
    pub guesses: IndexMap<PlayerId, Guess>,
    /// When the round entered the playing phase (RFC 3339).
    pub started_at: String,
}

impl From<Round> for RoundSummary {
    fn from(round: Round) -> Self {
        Self {
            selector_id: round.selector_id,
            theme: round.theme,
            items: round.items,
            guesses: round.guesses,
            started_at: format_system_time(round.started_at),
        }
    }
}

/// Whole-session projection returned by most intent routes.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionSummary {
    /// Shareable session code.
    pub code: String,
    /// Current lifecycle phase.
    pub phase: SessionPhase,
    /// 1-based round counter.
    pub current_round: u32,
    /// Total rounds to play.
    pub total_rounds: u32,
    /// Participants in join order.
    pub players: Vec<Player>,
    /// Current settings block.
    pub settings: Settings,
    /// Active round, when one exists.
    pub active_round: Option<RoundSummary>,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Last update timestamp (RFC 3339).
    pub updated_at: String,
    /// Store revision of this snapshot.
    pub revision: u64,
}

impl From<SessionDocument> for SessionSummary {
    fn from(document: SessionDocument) -> Self {
        Self {
            code: document.code,
            phase: document.phase,
            current_round: document.current_round,
            total_rounds: document.total_rounds,
            players: document.players,
            settings: document.settings,
            active_round: document.active_round.map(Into::into),
            created_at: format_system_time(document.created_at),
            updated_at: format_system_time(document.updated_at),
            revision: document.revision,
        }
    }
}

/// Everything the scorer needs: the round's truths, the raw guesses, and the
/// advisory pre-filled sheet.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScoringView {
    /// The round under review.
    pub round: RoundSummary,
    /// Pre-filled sheet the scorer starts from.
    pub sheet: ScoreSheet,
}

/// Payload storing a user's default settings.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SavePreferencesRequest {
    /// Settings to use as the seed for future sessions.
    #[validate(custom(function = validate_settings))]
    pub settings: Settings,
}
