//! Per-player view derivation.
//!
//! One pure function turns a document snapshot plus a local identity into
//! the state a client should render. All asymmetry lives here: the same
//! snapshot shows the selector its submission tracker and a guesser its
//! redacted guessing sheet, and nobody but the selector sees the secret
//! theme or the hidden titles before the results phase.

use std::time::{Duration, SystemTime};

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    services::authority,
    state::{
        session::{ContentItem, ItemId, Player, PlayerId, Round, SessionDocument, Settings},
        state_machine::SessionPhase,
    },
};

/// What one player should render for the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum DisplayState {
    /// Waiting phase: the lobby.
    Lobby {
        /// Shareable code to hand to friends.
        code: String,
        /// Everybody in the room, join order.
        players: Vec<Player>,
        /// Current settings block.
        settings: Settings,
        /// Whether this player may edit settings and start the game.
        is_host: bool,
        /// Whether starting is currently possible.
        can_start: bool,
    },
    /// Selecting phase, seen by the designated selector.
    ChoosingTracks {
        /// Round about to be played.
        round_number: u32,
        /// Total rounds in the session.
        total_rounds: u32,
        /// How many items the selection needs.
        item_count: usize,
    },
    /// Selecting phase, seen by everybody else.
    AwaitingSelection {
        /// Display name of the player picking tracks.
        selector_name: String,
        /// Round about to be played.
        round_number: u32,
        /// Total rounds in the session.
        total_rounds: u32,
    },
    /// Playing phase, seen by a guessing player.
    Guessing {
        /// Round in play.
        round_number: u32,
        /// Total rounds in the session.
        total_rounds: u32,
        /// Display name of the selector.
        selector_name: String,
        /// The five items with their secrets stripped.
        items: Vec<HiddenItem>,
        /// Seconds left on the think timer, when it is still running.
        seconds_remaining: Option<u64>,
        /// Whether resubmissions are refused from here on.
        answers_locked: bool,
        /// Whether this player already submitted a guess.
        submitted: bool,
    },
    /// Playing phase, seen by the selector.
    TrackingSubmissions {
        /// Players whose guesses have arrived, submission order.
        submitted_players: Vec<PlayerId>,
    },
    /// Scoring phase, seen by the authorized scorer.
    ReviewingGuesses {
        /// Number of guess sheets waiting for grades.
        submissions: usize,
    },
    /// Scoring phase, seen by everybody else.
    AwaitingScores {
        /// Display name of whoever is grading.
        scorer_name: String,
    },
    /// Results phase: answers revealed, standings on display.
    RoundResults {
        /// Round just played.
        round_number: u32,
        /// Total rounds in the session.
        total_rounds: u32,
        /// The revealed theme and items.
        answers: RevealedRound,
        /// Players ranked by cumulative score.
        standings: Vec<StandingEntry>,
        /// Whether this player holds the advance affordance.
        is_host: bool,
        /// Whether the next advance ends the game.
        final_round: bool,
        /// Points this player's guess earned, when it submitted one.
        my_awarded_points: Option<u32>,
    },
    /// Terminal phase: the podium.
    FinalStandings {
        /// Players ranked by cumulative score.
        standings: Vec<StandingEntry>,
        /// Display names sharing the top score.
        winners: Vec<String>,
    },
}

/// A content item as shown to guessers: identity and artwork only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct HiddenItem {
    /// Catalog identifier (needed to key the guess form).
    pub id: ItemId,
    /// Cover art, safe to show.
    pub cover_url: String,
}

impl From<&ContentItem> for HiddenItem {
    fn from(item: &ContentItem) -> Self {
        Self {
            id: item.id.clone(),
            cover_url: item.cover_url.clone(),
        }
    }
}

/// The selector's secrets, revealed from the results phase on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RevealedRound {
    /// The secret theme.
    pub theme: String,
    /// The full items including titles and artists.
    pub items: Vec<ContentItem>,
}

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StandingEntry {
    /// 1-based rank after sorting by score.
    pub rank: usize,
    /// The ranked player.
    pub player: Player,
}

/// Derive the view a player should render from a document snapshot.
///
/// Pure: `now` is passed in rather than read from a clock, so the same
/// inputs always produce the same view. Returns `None` when the player is
/// not part of the session.
pub fn project(
    document: &SessionDocument,
    player_id: &str,
    now: SystemTime,
) -> Option<DisplayState> {
    let me = document.player(player_id)?;
    let is_host = authority::current_host(&document.players)
        .is_some_and(|host| host.id == me.id);

    let state = match document.phase {
        SessionPhase::Waiting => DisplayState::Lobby {
            code: document.code.clone(),
            players: document.players.clone(),
            settings: document.settings.clone(),
            is_host,
            can_start: is_host && !document.players.is_empty(),
        },
        SessionPhase::Selecting => {
            if is_host {
                DisplayState::ChoosingTracks {
                    round_number: document.current_round,
                    total_rounds: document.total_rounds,
                    item_count: crate::state::session::ROUND_ITEM_COUNT,
                }
            } else {
                DisplayState::AwaitingSelection {
                    selector_name: authority::current_host(&document.players)
                        .map(|host| host.display_name.clone())
                        .unwrap_or_default(),
                    round_number: document.current_round,
                    total_rounds: document.total_rounds,
                }
            }
        }
        SessionPhase::Playing => {
            let round = document.active_round.as_ref()?;
            if me.id == round.selector_id {
                DisplayState::TrackingSubmissions {
                    submitted_players: round.guesses.keys().cloned().collect(),
                }
            } else {
                let remaining = think_seconds_remaining(round, document, now);
                DisplayState::Guessing {
                    round_number: document.current_round,
                    total_rounds: document.total_rounds,
                    selector_name: selector_name(document, round),
                    items: round.items.iter().map(Into::into).collect(),
                    answers_locked: document.settings.lock_answers_at_timeout
                        && remaining.is_none(),
                    seconds_remaining: remaining,
                    submitted: round.guesses.contains_key(&me.id),
                }
            }
        }
        SessionPhase::Scoring => {
            let round = document.active_round.as_ref()?;
            if me.id == round.selector_id || is_host {
                DisplayState::ReviewingGuesses {
                    submissions: round.guesses.len(),
                }
            } else {
                DisplayState::AwaitingScores {
                    scorer_name: selector_name(document, round),
                }
            }
        }
        SessionPhase::Results => {
            let round = document.active_round.as_ref()?;
            DisplayState::RoundResults {
                round_number: document.current_round,
                total_rounds: document.total_rounds,
                answers: RevealedRound {
                    theme: round.theme.clone(),
                    items: round.items.clone(),
                },
                standings: standings(&document.players),
                is_host,
                final_round: document.is_final_round(),
                my_awarded_points: round
                    .guesses
                    .get(&me.id)
                    .and_then(|guess| guess.awarded_points),
            }
        }
        SessionPhase::GameOver => {
            let standings = standings(&document.players);
            let top_score = standings.first().map(|entry| entry.player.score);
            DisplayState::FinalStandings {
                winners: standings
                    .iter()
                    .filter(|entry| Some(entry.player.score) == top_score)
                    .map(|entry| entry.player.display_name.clone())
                    .collect(),
                standings,
            }
        }
    };

    Some(state)
}

fn selector_name(document: &SessionDocument, round: &Round) -> String {
    document
        .player(&round.selector_id)
        .map(|player| player.display_name.clone())
        .unwrap_or_default()
}

/// Seconds left on the think timer, or `None` once it elapsed.
fn think_seconds_remaining(
    round: &Round,
    document: &SessionDocument,
    now: SystemTime,
) -> Option<u64> {
    let budget = Duration::from_secs(u64::from(document.settings.think_duration_secs));
    let elapsed = now.duration_since(round.started_at).unwrap_or_default();
    budget.checked_sub(elapsed).map(|left| left.as_secs())
}

/// Rank players by score, ties broken by join order.
fn standings(players: &[Player]) -> Vec<StandingEntry> {
    let mut sorted: Vec<Player> = players.to_vec();
    sorted.sort_by_key(|player| std::cmp::Reverse(player.score));
    sorted
        .into_iter()
        .enumerate()
        .map(|(index, player)| StandingEntry {
            rank: index + 1,
            player,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::session::Settings;

    fn player(id: &str, is_host: bool, score: u32) -> Player {
        Player {
            id: id.into(),
            display_name: id.to_uppercase(),
            avatar_url: None,
            is_host,
            score,
        }
    }

    fn item(id: &str) -> ContentItem {
        ContentItem {
            id: id.into(),
            title: format!("Secret Title {id}"),
            artist: format!("Secret Artist {id}"),
            cover_url: format!("https://covers.example/{id}"),
            playable_ref: None,
        }
    }

    fn document(phase: SessionPhase) -> SessionDocument {
        let mut doc =
            SessionDocument::new("CODE01".into(), player("a", true, 0), Settings::default());
        doc.players.push(player("b", false, 0));
        doc.players.push(player("c", false, 0));
        doc.phase = phase;
        doc
    }

    fn with_round(mut doc: SessionDocument) -> SessionDocument {
        doc.active_round = Some(Round::new(
            "a".into(),
            "colors".into(),
            (1..=5).map(|i| item(&i.to_string())).collect(),
            SystemTime::now(),
        ));
        doc
    }

    #[test]
    fn unknown_player_gets_no_view() {
        let doc = document(SessionPhase::Waiting);
        assert!(project(&doc, "ghost", SystemTime::now()).is_none());
    }

    #[test]
    fn lobby_gives_only_the_host_the_start_affordance() {
        let doc = document(SessionPhase::Waiting);
        match project(&doc, "a", SystemTime::now()).unwrap() {
            DisplayState::Lobby {
                is_host, can_start, ..
            } => {
                assert!(is_host);
                assert!(can_start);
            }
            other => panic!("expected lobby, got {other:?}"),
        }
        match project(&doc, "b", SystemTime::now()).unwrap() {
            DisplayState::Lobby {
                is_host, can_start, ..
            } => {
                assert!(!is_host);
                assert!(!can_start);
            }
            other => panic!("expected lobby, got {other:?}"),
        }
    }

    #[test]
    fn selecting_splits_selector_from_waiters() {
        let doc = document(SessionPhase::Selecting);
        assert!(matches!(
            project(&doc, "a", SystemTime::now()).unwrap(),
            DisplayState::ChoosingTracks { .. }
        ));
        match project(&doc, "b", SystemTime::now()).unwrap() {
            DisplayState::AwaitingSelection { selector_name, .. } => {
                assert_eq!(selector_name, "A");
            }
            other => panic!("expected awaiting selection, got {other:?}"),
        }
    }

    #[test]
    fn guessers_never_see_the_secrets() {
        let doc = with_round(document(SessionPhase::Playing));
        let view = project(&doc, "b", SystemTime::now()).unwrap();
        let serialized = serde_json::to_string(&view).unwrap();
        assert!(!serialized.contains("colors"));
        assert!(!serialized.contains("Secret Title"));
        assert!(!serialized.contains("Secret Artist"));

        match view {
            DisplayState::Guessing {
                items, submitted, ..
            } => {
                assert_eq!(items.len(), 5);
                assert!(!submitted);
            }
            other => panic!("expected guessing, got {other:?}"),
        }
    }

    #[test]
    fn selector_tracks_submissions_in_order() {
        let mut doc = with_round(document(SessionPhase::Playing));
        let round = doc.active_round.as_mut().unwrap();
        round.guesses.insert("c".into(), Default::default());
        round.guesses.insert("b".into(), Default::default());

        match project(&doc, "a", SystemTime::now()).unwrap() {
            DisplayState::TrackingSubmissions { submitted_players } => {
                assert_eq!(submitted_players, vec!["c".to_string(), "b".to_string()]);
            }
            other => panic!("expected submission tracker, got {other:?}"),
        }
    }

    #[test]
    fn think_timer_counts_down_and_locks() {
        let doc = with_round(document(SessionPhase::Playing));
        let started = doc.active_round.as_ref().unwrap().started_at;

        match project(&doc, "b", started + Duration::from_secs(30)).unwrap() {
            DisplayState::Guessing {
                seconds_remaining,
                answers_locked,
                ..
            } => {
                assert_eq!(seconds_remaining, Some(60));
                assert!(!answers_locked);
            }
            other => panic!("expected guessing, got {other:?}"),
        }

        match project(&doc, "b", started + Duration::from_secs(600)).unwrap() {
            DisplayState::Guessing {
                seconds_remaining,
                answers_locked,
                ..
            } => {
                assert_eq!(seconds_remaining, None);
                assert!(answers_locked);
            }
            other => panic!("expected guessing, got {other:?}"),
        }
    }

    #[test]
    fn results_reveal_answers_and_rank_by_score() {
        let mut doc = with_round(document(SessionPhase::Results));
        doc.players[1].score = 4;
        doc.players[2].score = 2;

        match project(&doc, "c", SystemTime::now()).unwrap() {
            DisplayState::RoundResults {
                answers,
                standings,
                is_host,
                ..
            } => {
                assert_eq!(answers.theme, "colors");
                assert_eq!(answers.items.len(), 5);
                assert!(!is_host);
                let order: Vec<_> = standings
                    .iter()
                    .map(|entry| entry.player.id.as_str())
                    .collect();
                assert_eq!(order, vec!["b", "c", "a"]);
                assert_eq!(standings[0].rank, 1);
            }
            other => panic!("expected round results, got {other:?}"),
        }
    }

    #[test]
    fn game_over_names_all_tied_winners() {
        let mut doc = document(SessionPhase::GameOver);
        doc.players[0].score = 5;
        doc.players[1].score = 5;
        doc.players[2].score = 1;

        match project(&doc, "c", SystemTime::now()).unwrap() {
            DisplayState::FinalStandings { winners, standings } => {
                assert_eq!(winners, vec!["A".to_string(), "B".to_string()]);
                assert_eq!(standings.len(), 3);
            }
            other => panic!("expected final standings, got {other:?}"),
        }
    }
}
