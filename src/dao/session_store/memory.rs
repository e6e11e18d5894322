//! In-process session store backed by a concurrent map and watch channels.
//!
//! This is the default backend: the deployment environment is assumed to
//! provide a replicated document store, and this implementation models its
//! contract faithfully enough to develop and test against. Each session
//! lives in its own map entry; a patch is applied while holding that entry's
//! write guard, so updates to one session are serialized and indivisible
//! while distinct sessions never contend.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use tokio::sync::watch;

use crate::{
    dao::{
        session_store::{CreateOutcome, SessionStore},
        storage::{StorageError, StorageResult},
    },
    state::session::{DocumentPatch, SessionDocument},
};

struct SessionSlot {
    document: SessionDocument,
    snapshots: watch::Sender<SessionDocument>,
}

/// Session store holding every document in process memory.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<DashMap<String, SessionSlot>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self, document: SessionDocument) -> BoxFuture<'static, StorageResult<CreateOutcome>> {
        let sessions = self.sessions.clone();
        Box::pin(async move {
            match sessions.entry(document.code.clone()) {
                Entry::Occupied(_) => Ok(CreateOutcome::CodeTaken),
                Entry::Vacant(slot) => {
                    let (snapshots, _) = watch::channel(document.clone());
                    slot.insert(SessionSlot {
                        document,
                        snapshots,
                    });
                    Ok(CreateOutcome::Created)
                }
            }
        })
    }

    fn read(&self, code: &str) -> BoxFuture<'static, StorageResult<Option<SessionDocument>>> {
        let sessions = self.sessions.clone();
        let code = code.to_owned();
        Box::pin(async move { Ok(sessions.get(&code).map(|slot| slot.document.clone())) })
    }

    fn update(
        &self,
        code: &str,
        patch: DocumentPatch,
    ) -> BoxFuture<'static, StorageResult<Option<SessionDocument>>> {
        let sessions = self.sessions.clone();
        let code = code.to_owned();
        Box::pin(async move {
            let Some(mut slot) = sessions.get_mut(&code) else {
                return Ok(None);
            };

            slot.document
                .apply(patch)
                .map_err(|err| StorageError::PatchConflict {
                    message: err.to_string(),
                })?;

            let updated = slot.document.clone();
            slot.snapshots.send_replace(updated.clone());
            Ok(Some(updated))
        })
    }

    fn subscribe(
        &self,
        code: &str,
    ) -> BoxFuture<'static, StorageResult<Option<watch::Receiver<SessionDocument>>>> {
        let sessions = self.sessions.clone();
        let code = code.to_owned();
        Box::pin(async move { Ok(sessions.get(&code).map(|slot| slot.snapshots.subscribe())) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        session::{ContentItem, FieldWrite, Guess, Player, Round, Settings},
        state_machine::SessionPhase,
    };
    use std::time::SystemTime;

    fn player(id: &str) -> Player {
        Player {
            id: id.into(),
            display_name: format!("player {id}"),
            avatar_url: None,
            is_host: false,
            score: 0,
        }
    }

    fn document_with_round(code: &str) -> SessionDocument {
        let mut doc = SessionDocument::new(code.into(), player("host"), Settings::default());
        doc.players.push(player("a"));
        doc.players.push(player("b"));
        let items = (1..=5)
            .map(|i| ContentItem {
                id: format!("t{i}"),
                title: format!("Track {i}"),
                artist: format!("Artist {i}"),
                cover_url: String::new(),
                playable_ref: None,
            })
            .collect();
        doc.active_round = Some(Round::new(
            "host".into(),
            "colors".into(),
            items,
            SystemTime::now(),
        ));
        doc.phase = SessionPhase::Playing;
        doc
    }

    fn guess_patch(player_id: &str) -> DocumentPatch {
        DocumentPatch::new().with(FieldWrite::PlayerGuess {
            player_id: player_id.into(),
            guess: Guess {
                theme_guess: Some(format!("theme by {player_id}")),
                ..Guess::default()
            },
        })
    }

    #[tokio::test]
    async fn create_then_read_roundtrips() {
        let store = MemorySessionStore::new();
        let doc = document_with_round("AAAAAA");
        assert_eq!(
            store.create(doc.clone()).await.unwrap(),
            CreateOutcome::Created
        );
        assert_eq!(store.read("AAAAAA").await.unwrap(), Some(doc));
    }

    #[tokio::test]
    async fn duplicate_code_is_refused_without_overwriting() {
        let store = MemorySessionStore::new();
        let first = document_with_round("SAME01");
        store.create(first.clone()).await.unwrap();

        let mut second = document_with_round("SAME01");
        second.players.clear();
        assert_eq!(
            store.create(second).await.unwrap(),
            CreateOutcome::CodeTaken
        );
        assert_eq!(store.read("SAME01").await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn guess_writes_commute() {
        let store_ab = MemorySessionStore::new();
        let store_ba = MemorySessionStore::new();
        for store in [&store_ab, &store_ba] {
            store.create(document_with_round("ROUND1")).await.unwrap();
        }

        store_ab.update("ROUND1", guess_patch("a")).await.unwrap();
        store_ab.update("ROUND1", guess_patch("b")).await.unwrap();
        store_ba.update("ROUND1", guess_patch("b")).await.unwrap();
        store_ba.update("ROUND1", guess_patch("a")).await.unwrap();

        let ab = store_ab.read("ROUND1").await.unwrap().unwrap();
        let ba = store_ba.read("ROUND1").await.unwrap().unwrap();
        let guesses_ab = &ab.active_round.as_ref().unwrap().guesses;
        let guesses_ba = &ba.active_round.as_ref().unwrap().guesses;
        assert_eq!(guesses_ab.get("a"), guesses_ba.get("a"));
        assert_eq!(guesses_ab.get("b"), guesses_ba.get("b"));
        assert_eq!(guesses_ab.len(), guesses_ba.len());
    }

    #[tokio::test]
    async fn rejected_patch_leaves_store_and_subscribers_silent() {
        let store = MemorySessionStore::new();
        let mut doc = document_with_round("LOCKED");
        doc.active_round = None;
        doc.phase = SessionPhase::Waiting;
        store.create(doc.clone()).await.unwrap();

        let mut snapshots = store.subscribe("LOCKED").await.unwrap().unwrap();
        let err = store
            .update("LOCKED", guess_patch("a"))
            .await
            .expect_err("patch must conflict");
        assert!(matches!(err, StorageError::PatchConflict { .. }));
        assert_eq!(store.read("LOCKED").await.unwrap(), Some(doc));
        assert!(!snapshots.has_changed().unwrap());
    }

    #[tokio::test]
    async fn subscribers_observe_monotonic_snapshots() {
        let store = MemorySessionStore::new();
        store.create(document_with_round("WATCH1")).await.unwrap();
        let mut snapshots = store.subscribe("WATCH1").await.unwrap().unwrap();
        assert_eq!(snapshots.borrow().revision, 0);

        store.update("WATCH1", guess_patch("a")).await.unwrap();
        store.update("WATCH1", guess_patch("b")).await.unwrap();

        snapshots.changed().await.unwrap();
        let latest = snapshots.borrow_and_update().clone();
        assert_eq!(latest.revision, 2);
        assert_eq!(latest.active_round.unwrap().guesses.len(), 2);
    }
}
