//! Scoring engine: advisory pre-fill, tri-state overrides, and the atomic
//! confirm patch.
//!
//! Everything here is pure; the round coordinator feeds it freshly read
//! documents and commits whatever patch it produces.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::{
    session::{DocumentPatch, FieldWrite, ItemId, PlayerId, Round, SessionDocument},
    state_machine::{SessionPhase, TransitionRejection},
};

/// Points granted for a correct theme guess.
///
/// Intentionally independent of the difficulty tier: difficulty steers
/// content curation, not point values.
pub const THEME_BONUS_POINTS: u32 = 3;

/// Per-item grade: title and artist each contribute one point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemScore {
    /// Neither half matched: 0 points.
    #[default]
    Miss,
    /// One half matched: 1 point.
    Partial,
    /// Both halves matched: 2 points.
    Full,
}

impl ItemScore {
    /// Points this grade is worth.
    pub fn points(self) -> u32 {
        match self {
            ItemScore::Miss => 0,
            ItemScore::Partial => 1,
            ItemScore::Full => 2,
        }
    }

    /// The next grade in the scorer's manual override cycle.
    pub fn cycled(self) -> Self {
        match self {
            ItemScore::Miss => ItemScore::Partial,
            ItemScore::Partial => ItemScore::Full,
            ItemScore::Full => ItemScore::Miss,
        }
    }

    fn from_hits(title_hit: bool, artist_hit: bool) -> Self {
        match (title_hit, artist_hit) {
            (false, false) => ItemScore::Miss,
            (true, true) => ItemScore::Full,
            _ => ItemScore::Partial,
        }
    }
}

/// One player's grades for the round, as edited by the scorer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PlayerSheet {
    /// Grade per content item; absent items count as [`ItemScore::Miss`].
    pub item_scores: IndexMap<ItemId, ItemScore>,
    /// Whether the theme bonus is granted.
    pub theme_awarded: bool,
}

impl PlayerSheet {
    /// Total points this sheet awards for the round.
    pub fn round_total(&self) -> u32 {
        let items: u32 = self.item_scores.values().map(|score| score.points()).sum();
        let theme = if self.theme_awarded {
            THEME_BONUS_POINTS
        } else {
            0
        };
        items + theme
    }
}

/// Grades for every player who submitted a guess, keyed by player id.
pub type ScoreSheet = IndexMap<PlayerId, PlayerSheet>;

/// Case-insensitive containment, the matching rule of the pre-fill heuristic.
fn matches_answer(truth: &str, guess: Option<&str>) -> bool {
    let Some(guess) = guess else {
        return false;
    };
    let guess = guess.trim();
    if guess.is_empty() {
        return false;
    }
    truth.to_lowercase().contains(&guess.to_lowercase())
}

/// Build the advisory sheet the scorer starts from.
///
/// Only players present in the round's guess map get an entry; the scorer
/// overrides freely before confirming, so this is a default, not a verdict.
pub fn prefill(round: &Round) -> ScoreSheet {
    round
        .guesses
        .iter()
        .map(|(player_id, guess)| {
            let item_scores = round
                .items
                .iter()
                .map(|item| {
                    let answer = guess.item_guesses.get(&item.id);
                    let title_hit = answer
                        .is_some_and(|a| matches_answer(&item.title, a.title_guess.as_deref()));
                    let artist_hit = answer
                        .is_some_and(|a| matches_answer(&item.artist, a.artist_guess.as_deref()));
                    (item.id.clone(), ItemScore::from_hits(title_hit, artist_hit))
                })
                .collect();

            let theme_awarded = matches_answer(&round.theme, guess.theme_guess.as_deref());

            (
                player_id.clone(),
                PlayerSheet {
                    item_scores,
                    theme_awarded,
                },
            )
        })
        .collect()
}

/// Check a scorer-edited sheet against the round before committing it.
pub fn validate_sheet(
    document: &SessionDocument,
    round: &Round,
    sheet: &ScoreSheet,
) -> Result<(), TransitionRejection> {
    for (player_id, player_sheet) in sheet {
        if document.player(player_id).is_none() {
            return Err(TransitionRejection::UnknownPlayer(player_id.clone()));
        }
        if !round.guesses.contains_key(player_id) {
            return Err(TransitionRejection::NotAGuesser(player_id.clone()));
        }
        for item_id in player_sheet.item_scores.keys() {
            if round.item(item_id).is_none() {
                return Err(TransitionRejection::UnknownItem(item_id.clone()));
            }
        }
    }
    Ok(())
}

/// Build the single patch that commits a confirmed sheet.
///
/// New cumulative scores, per-guess awarded points, and the move to the
/// results phase land together; the selector's score is carried through
/// unchanged.
pub fn confirm_patch(document: &SessionDocument, sheet: &ScoreSheet) -> DocumentPatch {
    let players = document
        .players
        .iter()
        .cloned()
        .map(|mut player| {
            if let Some(player_sheet) = sheet.get(&player.id) {
                player.score += player_sheet.round_total();
            }
            player
        })
        .collect();

    let mut patch = DocumentPatch::new().with(FieldWrite::Players(players));
    for (player_id, player_sheet) in sheet {
        patch = patch.with(FieldWrite::AwardedPoints {
            player_id: player_id.clone(),
            points: player_sheet.round_total(),
        });
    }
    patch.with(FieldWrite::Phase(SessionPhase::Results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::session::{ContentItem, Guess, ItemGuess};
    use std::time::SystemTime;

    fn item(id: &str, title: &str, artist: &str) -> ContentItem {
        ContentItem {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            cover_url: String::new(),
            playable_ref: None,
        }
    }

    fn round_with_guess(guess: Guess) -> Round {
        let mut round = Round::new(
            "selector".into(),
            "Colors in the title".into(),
            vec![
                item("t1", "Yellow Submarine", "The Beatles"),
                item("t2", "Back in Black", "AC/DC"),
            ],
            SystemTime::now(),
        );
        round.guesses.insert("guesser".into(), guess);
        round
    }

    fn item_guess(title: &str, artist: &str) -> ItemGuess {
        ItemGuess {
            title_guess: (!title.is_empty()).then(|| title.to_owned()),
            artist_guess: (!artist.is_empty()).then(|| artist.to_owned()),
        }
    }

    #[test]
    fn cycle_walks_miss_partial_full_and_wraps() {
        assert_eq!(ItemScore::Miss.cycled(), ItemScore::Partial);
        assert_eq!(ItemScore::Partial.cycled(), ItemScore::Full);
        assert_eq!(ItemScore::Full.cycled(), ItemScore::Miss);
    }

    #[test]
    fn prefill_matches_case_insensitive_substrings() {
        let mut guess = Guess::default();
        guess
            .item_guesses
            .insert("t1".into(), item_guess("yellow sub", "beatles"));
        guess
            .item_guesses
            .insert("t2".into(), item_guess("Back in Black", ""));
        let round = round_with_guess(guess);

        let sheet = prefill(&round);
        let player_sheet = &sheet["guesser"];
        assert_eq!(player_sheet.item_scores["t1"], ItemScore::Full);
        assert_eq!(player_sheet.item_scores["t2"], ItemScore::Partial);
        assert!(!player_sheet.theme_awarded);
    }

    #[test]
    fn prefill_awards_theme_on_containment() {
        let guess = Guess {
            theme_guess: Some("colors".into()),
            ..Guess::default()
        };
        let sheet = prefill(&round_with_guess(guess));
        assert!(sheet["guesser"].theme_awarded);
        assert_eq!(sheet["guesser"].round_total(), THEME_BONUS_POINTS);
    }

    #[test]
    fn prefill_ignores_blank_and_over_long_guesses() {
        let mut guess = Guess {
            theme_guess: Some("   ".into()),
            ..Guess::default()
        };
        // A guess longer than the truth is not contained within it.
        guess
            .item_guesses
            .insert("t1".into(), item_guess("Yellow Submarine (Live 1966)", ""));
        let sheet = prefill(&round_with_guess(guess));
        assert_eq!(sheet["guesser"].item_scores["t1"], ItemScore::Miss);
        assert!(!sheet["guesser"].theme_awarded);
        assert_eq!(sheet["guesser"].round_total(), 0);
    }

    #[test]
    fn prefill_only_covers_submitting_players() {
        let round = round_with_guess(Guess::default());
        let sheet = prefill(&round);
        assert_eq!(sheet.len(), 1);
        assert!(sheet.contains_key("guesser"));
    }

    #[test]
    fn round_total_sums_items_and_theme() {
        let mut sheet = PlayerSheet {
            theme_awarded: true,
            ..PlayerSheet::default()
        };
        sheet.item_scores.insert("t1".into(), ItemScore::Full);
        sheet.item_scores.insert("t2".into(), ItemScore::Partial);
        assert_eq!(sheet.round_total(), 2 + 1 + THEME_BONUS_POINTS);
    }

    #[test]
    fn sheet_for_non_guesser_is_rejected() {
        let round = round_with_guess(Guess::default());
        let mut doc = SessionDocument::new(
            "CODE01".into(),
            crate::state::session::Player {
                id: "selector".into(),
                display_name: "S".into(),
                avatar_url: None,
                is_host: true,
                score: 0,
            },
            crate::state::session::Settings::default(),
        );
        doc.players.push(crate::state::session::Player {
            id: "guesser".into(),
            display_name: "G".into(),
            avatar_url: None,
            is_host: false,
            score: 0,
        });

        let mut sheet = ScoreSheet::new();
        sheet.insert("selector".into(), PlayerSheet::default());
        assert_eq!(
            validate_sheet(&doc, &round, &sheet).unwrap_err(),
            TransitionRejection::NotAGuesser("selector".into())
        );

        let mut sheet = ScoreSheet::new();
        sheet.insert(
            "guesser".into(),
            PlayerSheet {
                item_scores: IndexMap::from([("bogus".into(), ItemScore::Full)]),
                theme_awarded: false,
            },
        );
        assert_eq!(
            validate_sheet(&doc, &round, &sheet).unwrap_err(),
            TransitionRejection::UnknownItem("bogus".into())
        );
    }
}
