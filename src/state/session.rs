//! Canonical schema of the shared session document and the atomic
//! multi-field patches that mutate it.

use std::time::SystemTime;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::state::state_machine::SessionPhase;

/// Stable player identifier, assigned by the identity provider.
pub type PlayerId = String;
/// Stable content-item identifier, assigned by the catalog provider.
pub type ItemId = String;

/// Number of characters in a shareable session code.
pub const SESSION_CODE_LEN: usize = 6;
/// A round always carries exactly this many content items.
pub const ROUND_ITEM_COUNT: usize = 5;
/// Minimum length of a round's secret theme.
pub const MIN_THEME_CHARS: usize = 3;

/// One connected participant as recorded in the session document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Player {
    /// Provider-assigned identifier, stable across sessions.
    pub id: PlayerId,
    /// Name shown to the other players.
    pub display_name: String,
    /// Optional avatar image reference.
    pub avatar_url: Option<String>,
    /// Whether this player currently holds the host role.
    pub is_host: bool,
    /// Cumulative score, only ever increased by confirm-scores.
    pub score: u32,
}

/// Difficulty tier chosen by the host; drives content curation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Well-known tracks.
    Easy,
    /// Mixed selection.
    Medium,
    /// Deep cuts.
    Hard,
}

/// Overall pacing preset for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Standard rules.
    Classic,
    /// Shorter playback, quicker rounds.
    Fast,
    /// No artist hints.
    Hardcore,
}

/// Host-tunable session settings, frozen once the first round starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Settings {
    /// Number of rounds the session will play.
    pub round_count: u32,
    /// Difficulty tier.
    pub difficulty: Difficulty,
    /// Seconds a track is played before moving on.
    pub play_duration_secs: u16,
    /// Seconds the guessers have before answers lock.
    pub think_duration_secs: u16,
    /// Pacing preset.
    pub mode: GameMode,
    /// When set, guess resubmissions are refused after the think timer.
    pub lock_answers_at_timeout: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            round_count: 3,
            difficulty: Difficulty::Medium,
            play_duration_secs: 30,
            think_duration_secs: 90,
            mode: GameMode::Classic,
            lock_answers_at_timeout: true,
        }
    }
}

/// One track of a round's selection, immutable once the round is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContentItem {
    /// Catalog identifier.
    pub id: ItemId,
    /// Track title (part of the selector's secret while guessing).
    pub title: String,
    /// Track artist (part of the selector's secret while guessing).
    pub artist: String,
    /// Cover art reference, safe to show to guessers.
    pub cover_url: String,
    /// Opaque reference handed to the playback controller.
    pub playable_ref: Option<String>,
}

/// A player's answer for a single content item; both halves are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ItemGuess {
    /// Guessed title, if any.
    pub title_guess: Option<String>,
    /// Guessed artist, if any.
    pub artist_guess: Option<String>,
}

/// Everything one player submitted for the active round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Guess {
    /// Guess at the round's secret theme.
    pub theme_guess: Option<String>,
    /// Per-item answers; items may be skipped.
    pub item_guesses: IndexMap<ItemId, ItemGuess>,
    /// Points this guess earned, set only by confirm-scores.
    pub awarded_points: Option<u32>,
}

/// One round of selection, guessing, and scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Player who picked the items and the secret theme.
    pub selector_id: PlayerId,
    /// The selector's secret theme.
    pub theme: String,
    /// Exactly [`ROUND_ITEM_COUNT`] items with distinct ids.
    pub items: Vec<ContentItem>,
    /// Guesses keyed by the submitting player; the selector never appears.
    pub guesses: IndexMap<PlayerId, Guess>,
    /// When the round entered the playing phase; anchors the answers lock.
    pub started_at: SystemTime,
}

impl Round {
    /// Build a fresh round with an empty guess map.
    pub fn new(
        selector_id: PlayerId,
        theme: String,
        items: Vec<ContentItem>,
        started_at: SystemTime,
    ) -> Self {
        Self {
            selector_id,
            theme,
            items,
            guesses: IndexMap::new(),
            started_at,
        }
    }

    /// Look up an item of this round by id.
    pub fn item(&self, id: &str) -> Option<&ContentItem> {
        self.items.iter().find(|item| item.id == id)
    }
}

/// The whole shared state of one game, as held by the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDocument {
    /// Shareable session code, immutable after creation.
    pub code: String,
    /// Participants in join order; the order is the rotation tie-break.
    pub players: Vec<Player>,
    /// 1-based round counter, monotonically non-decreasing.
    pub current_round: u32,
    /// Total rounds to play, synced from the settings while waiting.
    pub total_rounds: u32,
    /// Coarse-grained lifecycle phase.
    pub phase: SessionPhase,
    /// Host-tunable settings.
    pub settings: Settings,
    /// Present only during selecting/playing/scoring/results.
    pub active_round: Option<Round>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time any patch was applied.
    pub updated_at: SystemTime,
    /// Bumped once per applied patch; subscribers see it advance monotonically.
    pub revision: u64,
}

impl SessionDocument {
    /// Build a brand-new session in the waiting phase with its host.
    pub fn new(code: String, host: Player, settings: Settings) -> Self {
        let now = SystemTime::now();
        let host = Player {
            is_host: true,
            ..host
        };
        Self {
            code,
            total_rounds: settings.round_count,
            players: vec![host],
            current_round: 1,
            phase: SessionPhase::Waiting,
            settings,
            active_round: None,
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    /// Look up a player by id.
    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }

    /// Whether the session is currently playing its last round.
    pub fn is_final_round(&self) -> bool {
        self.current_round >= self.total_rounds
    }

    /// Apply a patch to this document, indivisibly.
    ///
    /// Writes are staged against a scratch copy first; when any write cannot
    /// land (e.g. a guess without an active round) the document is left
    /// byte-for-byte unchanged. On success the revision is bumped exactly
    /// once, however many fields the patch touched.
    pub fn apply(&mut self, patch: DocumentPatch) -> Result<(), PatchError> {
        let mut staged = self.clone();
        for write in patch.writes {
            staged.apply_write(write)?;
        }
        staged.revision = self.revision + 1;
        staged.updated_at = SystemTime::now();
        *self = staged;
        Ok(())
    }

    fn apply_write(&mut self, write: FieldWrite) -> Result<(), PatchError> {
        match write {
            FieldWrite::Phase(phase) => self.phase = phase,
            FieldWrite::Players(players) => self.players = players,
            FieldWrite::Settings(settings) => self.settings = settings,
            FieldWrite::TotalRounds(total) => self.total_rounds = total,
            FieldWrite::CurrentRound(round) => self.current_round = round,
            FieldWrite::ActiveRound(round) => self.active_round = round,
            FieldWrite::PlayerGuess { player_id, guess } => {
                let round = self
                    .active_round
                    .as_mut()
                    .ok_or(PatchError::NoActiveRound { write: "guess" })?;
                round.guesses.insert(player_id, guess);
            }
            FieldWrite::AwardedPoints { player_id, points } => {
                let round = self.active_round.as_mut().ok_or(PatchError::NoActiveRound {
                    write: "awarded points",
                })?;
                let guess = round
                    .guesses
                    .get_mut(&player_id)
                    .ok_or(PatchError::NoSuchGuess { player_id })?;
                guess.awarded_points = Some(points);
            }
        }
        Ok(())
    }
}

/// One field write inside a [`DocumentPatch`].
///
/// Guess-scoped writes are deliberately keyed by player id so that concurrent
/// submissions from different players commute instead of racing over the
/// whole guess map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldWrite {
    /// Replace the lifecycle phase.
    Phase(SessionPhase),
    /// Replace the full player list.
    Players(Vec<Player>),
    /// Replace the settings block.
    Settings(Settings),
    /// Replace the total round count.
    TotalRounds(u32),
    /// Replace the current round counter.
    CurrentRound(u32),
    /// Set or clear the active round.
    ActiveRound(Option<Round>),
    /// Upsert one player's guess under its own key.
    PlayerGuess {
        /// Owner of the guess entry.
        player_id: PlayerId,
        /// The submitted guess.
        guess: Guess,
    },
    /// Record the points a player's guess earned.
    AwardedPoints {
        /// Owner of the guess entry.
        player_id: PlayerId,
        /// Round total awarded by the scorer.
        points: u32,
    },
}

/// An atomic multi-field update; other observers never see it half applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentPatch {
    writes: Vec<FieldWrite>,
}

impl DocumentPatch {
    /// Start an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field write, builder-style.
    pub fn with(mut self, write: FieldWrite) -> Self {
        self.writes.push(write);
        self
    }

    /// Number of field writes in this patch.
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Whether the patch carries no writes at all.
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Raised when a patch does not fit the document it is applied to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// A round-scoped write arrived while no round is active.
    #[error("cannot write {write}: no active round")]
    NoActiveRound {
        /// Human-readable name of the offending write.
        write: &'static str,
    },
    /// An award targeted a player that never submitted a guess.
    #[error("player `{player_id}` has no guess entry to award points to")]
    NoSuchGuess {
        /// The missing guess key.
        player_id: PlayerId,
    },
}
