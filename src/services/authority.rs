//! Capability checks for session intents.
//!
//! Every guard here is evaluated against a freshly read document while the
//! session's transition gate is held, immediately before the write. There is
//! no trusted client-side cache of `is_host`/`selector_id` anywhere in the
//! write path, which is what keeps stale-authority writes unrepresentable.

use crate::state::{
    session::{Player, Round, SessionDocument},
    state_machine::{SessionPhase, TransitionRejection},
};

/// The player currently holding the host role.
///
/// Documents are written with exactly one host flag set, but reads stay
/// deterministic even for a malformed document: the lowest join order wins.
pub fn current_host(players: &[Player]) -> Option<&Player> {
    players.iter().find(|player| player.is_host)
}

/// Index of the current host in join order, defaulting to the first seat.
pub fn host_index(players: &[Player]) -> usize {
    players
        .iter()
        .position(|player| player.is_host)
        .unwrap_or(0)
}

/// Refuse any intent against a finished session.
pub fn ensure_open(document: &SessionDocument) -> Result<(), TransitionRejection> {
    if document.phase == SessionPhase::GameOver {
        return Err(TransitionRejection::SessionClosed);
    }
    Ok(())
}

/// Resolve the issuer to a member of the session.
pub fn require_member<'doc>(
    document: &'doc SessionDocument,
    issuer: &str,
) -> Result<&'doc Player, TransitionRejection> {
    document
        .player(issuer)
        .ok_or_else(|| TransitionRejection::UnknownPlayer(issuer.to_owned()))
}

/// Require the issuer to hold the host role right now.
pub fn require_host<'doc>(
    document: &'doc SessionDocument,
    issuer: &str,
    action: &'static str,
) -> Result<&'doc Player, TransitionRejection> {
    let member = require_member(document, issuer)?;
    match current_host(&document.players) {
        Some(host) if host.id == member.id => Ok(member),
        _ => Err(TransitionRejection::NotHost { action }),
    }
}

/// Require the issuer to be the designated selector for the upcoming round.
///
/// While the session is selecting there is no round yet; the designation
/// follows the host role, which is rotated exactly when a new selection
/// opens.
pub fn require_designated_selector<'doc>(
    document: &'doc SessionDocument,
    issuer: &str,
) -> Result<&'doc Player, TransitionRejection> {
    let member = require_member(document, issuer)?;
    match current_host(&document.players) {
        Some(host) if host.id == member.id => Ok(member),
        _ => Err(TransitionRejection::NotSelector),
    }
}

/// Require the issuer to be the round's selector or the current host.
pub fn require_selector_or_host<'doc>(
    document: &'doc SessionDocument,
    round: &Round,
    issuer: &str,
) -> Result<&'doc Player, TransitionRejection> {
    let member = require_member(document, issuer)?;
    if member.id == round.selector_id {
        return Ok(member);
    }
    match current_host(&document.players) {
        Some(host) if host.id == member.id => Ok(member),
        _ => Err(TransitionRejection::NotScorer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::session::Settings;
    use std::time::SystemTime;

    fn player(id: &str, is_host: bool) -> Player {
        Player {
            id: id.into(),
            display_name: id.to_uppercase(),
            avatar_url: None,
            is_host,
            score: 0,
        }
    }

    fn document(players: Vec<Player>) -> SessionDocument {
        let mut doc = SessionDocument::new("CODE01".into(), player("seed", true), Settings::default());
        doc.players = players;
        doc
    }

    #[test]
    fn lowest_join_order_wins_the_host_tie_break() {
        let players = vec![player("a", false), player("b", true), player("c", true)];
        assert_eq!(current_host(&players).unwrap().id, "b");
        assert_eq!(host_index(&players), 1);
    }

    #[test]
    fn host_index_defaults_to_first_seat() {
        let players = vec![player("a", false), player("b", false)];
        assert!(current_host(&players).is_none());
        assert_eq!(host_index(&players), 0);
    }

    #[test]
    fn non_host_is_refused_with_typed_rejection() {
        let doc = document(vec![player("a", true), player("b", false)]);
        let err = require_host(&doc, "b", "advance the round").unwrap_err();
        assert_eq!(
            err,
            TransitionRejection::NotHost {
                action: "advance the round"
            }
        );
        assert!(require_host(&doc, "a", "advance the round").is_ok());
    }

    #[test]
    fn unknown_issuer_is_surfaced_before_authority() {
        let doc = document(vec![player("a", true)]);
        let err = require_host(&doc, "ghost", "start").unwrap_err();
        assert_eq!(err, TransitionRejection::UnknownPlayer("ghost".into()));
    }

    #[test]
    fn scorer_may_be_selector_or_host() {
        let doc = document(vec![player("a", true), player("b", false), player("c", false)]);
        let round = Round::new("b".into(), "colors".into(), Vec::new(), SystemTime::now());
        assert!(require_selector_or_host(&doc, &round, "b").is_ok());
        assert!(require_selector_or_host(&doc, &round, "a").is_ok());
        assert_eq!(
            require_selector_or_host(&doc, &round, "c").unwrap_err(),
            TransitionRejection::NotScorer
        );
    }

    #[test]
    fn closed_session_rejects_everything() {
        let mut doc = document(vec![player("a", true)]);
        doc.phase = SessionPhase::GameOver;
        assert_eq!(
            ensure_open(&doc).unwrap_err(),
            TransitionRejection::SessionClosed
        );
    }
}
