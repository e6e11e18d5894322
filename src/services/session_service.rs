//! Session lifecycle operations: create, join, read, and settings updates.

use std::sync::Arc;

use rand::Rng;
use tracing::{info, warn};

use crate::{
    dao::session_store::{CreateOutcome, SessionStore},
    dto::session::{CreateSessionRequest, JoinSessionRequest, SessionSummary, UpdateSettingsRequest},
    error::ServiceError,
    services::authority,
    state::{
        SharedState,
        session::{DocumentPatch, FieldWrite, Player, SESSION_CODE_LEN, SessionDocument, Settings},
        state_machine::{SessionPhase, TransitionRejection},
    },
};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_ALLOCATION_ATTEMPTS: usize = 16;

/// Produce a fresh shareable session code.
fn generate_session_code() -> String {
    let mut rng = rand::rng();
    (0..SESSION_CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Read a session document or fail with a not-found error.
pub(crate) async fn read_required(
    store: &Arc<dyn SessionStore>,
    code: &str,
) -> Result<SessionDocument, ServiceError> {
    store
        .read(code)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("session `{code}` not found")))
}

/// Apply a patch or fail with a not-found error when the session vanished.
pub(crate) async fn commit(
    store: &Arc<dyn SessionStore>,
    code: &str,
    patch: DocumentPatch,
) -> Result<SessionDocument, ServiceError> {
    let updated = store
        .update(code, patch)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("session `{code}` not found")))?;
    Ok(updated)
}

/// Bootstrap a new session with the issuer as host.
///
/// Settings come from, in order: the request override, the host's stored
/// preferences, the configured defaults. A preference-store failure only
/// costs the seed, never the session.
pub async fn create_session(
    state: &SharedState,
    request: CreateSessionRequest,
) -> Result<SessionSummary, ServiceError> {
    let store = state.require_session_store().await?;
    let profile = state.identity().profile(&request.credential).await?;

    let settings = match request.settings {
        Some(settings) => settings,
        None => seed_settings(state, &profile.provider_id).await,
    };

    let host = Player {
        id: profile.provider_id,
        display_name: profile.display_name,
        avatar_url: profile.avatar_url,
        is_host: true,
        score: 0,
    };

    for _ in 0..CODE_ALLOCATION_ATTEMPTS {
        let code = generate_session_code();
        let document = SessionDocument::new(code.clone(), host.clone(), settings.clone());
        match store.create(document.clone()).await? {
            CreateOutcome::Created => {
                info!(%code, host = %host.id, "session created");
                return Ok(document.into());
            }
            CreateOutcome::CodeTaken => continue,
        }
    }

    Err(ServiceError::InvalidState(
        "could not allocate a unique session code".into(),
    ))
}

async fn seed_settings(state: &SharedState, provider_id: &str) -> Settings {
    match state.preferences().load(provider_id).await {
        Ok(Some(settings)) => settings,
        Ok(None) => state.config().default_settings.clone(),
        Err(err) => {
            warn!(user = provider_id, error = %err, "preference seed unavailable; using defaults");
            state.config().default_settings.clone()
        }
    }
}

/// Join an existing session, idempotently for a returning player.
pub async fn join_session(
    state: &SharedState,
    code: &str,
    request: JoinSessionRequest,
) -> Result<SessionSummary, ServiceError> {
    let store = state.require_session_store().await?;
    let profile = state.identity().profile(&request.credential).await?;

    state
        .run_intent(code, || async {
            let document = read_required(&store, code).await?;
            authority::ensure_open(&document)?;

            if document.player(&profile.provider_id).is_some() {
                // Rejoin after a reload: the seat is already there.
                return Ok(document.into());
            }

            let mut players = document.players.clone();
            players.push(Player {
                id: profile.provider_id.clone(),
                display_name: profile.display_name.clone(),
                avatar_url: profile.avatar_url.clone(),
                is_host: players.is_empty(),
                score: 0,
            });

            let updated = commit(
                &store,
                code,
                DocumentPatch::new().with(FieldWrite::Players(players)),
            )
            .await?;
            Ok(updated.into())
        })
        .await
}

/// Read the current session document.
pub async fn get_session(state: &SharedState, code: &str) -> Result<SessionSummary, ServiceError> {
    let store = state.require_session_store().await?;
    Ok(read_required(&store, code).await?.into())
}

/// Derive the view one player should render for the latest snapshot.
pub async fn player_view(
    state: &SharedState,
    code: &str,
    player_id: &str,
) -> Result<crate::services::projection::DisplayState, ServiceError> {
    let store = state.require_session_store().await?;
    let document = read_required(&store, code).await?;
    crate::services::projection::project(&document, player_id, std::time::SystemTime::now())
        .ok_or_else(|| {
            ServiceError::NotFound(format!("player `{player_id}` is not part of session `{code}`"))
        })
}

/// Replace the settings block; host-only, lobby-only.
///
/// `total_rounds` is kept in sync in the same patch so subscribers never see
/// the two disagree.
pub async fn update_settings(
    state: &SharedState,
    code: &str,
    request: UpdateSettingsRequest,
) -> Result<SessionSummary, ServiceError> {
    let store = state.require_session_store().await?;

    state
        .run_intent(code, || async {
            let document = read_required(&store, code).await?;
            authority::ensure_open(&document)?;
            authority::require_host(&document, &request.player_id, "change the settings")?;
            if document.phase != SessionPhase::Waiting {
                return Err(TransitionRejection::SettingsFrozen.into());
            }

            let patch = DocumentPatch::new()
                .with(FieldWrite::TotalRounds(request.settings.round_count))
                .with(FieldWrite::Settings(request.settings.clone()));
            let updated = commit(&store, code, patch).await?;
            Ok(updated.into())
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::session_store::memory::MemorySessionStore,
        services::{
            catalog::DemoCatalog,
            identity::{DemoIdentity, IdentityProvider},
            playback::NoopPlayback,
        },
        state::AppState,
        state::session::Difficulty,
    };

    async fn test_state() -> SharedState {
        let config = AppConfig {
            preferences_dir: std::env::temp_dir()
                .join("mixtape-back-tests")
                .join(uuid::Uuid::new_v4().simple().to_string()),
            ..AppConfig::default()
        };
        let state = AppState::new(
            config,
            Arc::new(DemoIdentity::new()),
            Arc::new(DemoCatalog::new()),
            Arc::new(NoopPlayback),
        );
        state
            .install_session_store(Arc::new(MemorySessionStore::new()))
            .await;
        state
    }

    fn create_request(settings: Option<Settings>) -> CreateSessionRequest {
        CreateSessionRequest {
            credential: "demo:host".into(),
            settings,
        }
    }

    #[tokio::test]
    async fn create_opens_a_waiting_session_with_host() {
        let state = test_state().await;
        let summary = create_session(&state, create_request(None)).await.unwrap();

        assert_eq!(summary.phase, SessionPhase::Waiting);
        assert_eq!(summary.current_round, 1);
        assert_eq!(summary.total_rounds, 3);
        assert_eq!(summary.code.chars().count(), SESSION_CODE_LEN);
        assert!(
            summary
                .code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
        assert_eq!(summary.players.len(), 1);
        assert!(summary.players[0].is_host);
        assert_eq!(summary.players[0].score, 0);
    }

    #[tokio::test]
    async fn create_honours_the_settings_override() {
        let state = test_state().await;
        let settings = Settings {
            round_count: 1,
            difficulty: Difficulty::Hard,
            ..Settings::default()
        };
        let summary = create_session(&state, create_request(Some(settings)))
            .await
            .unwrap();
        assert_eq!(summary.total_rounds, 1);
        assert_eq!(summary.settings.difficulty, Difficulty::Hard);
    }

    #[tokio::test]
    async fn create_seeds_from_stored_preferences() {
        let state = test_state().await;
        let profile = state.identity().profile("demo:host").await.unwrap();
        let preferred = Settings {
            round_count: 7,
            ..Settings::default()
        };
        state
            .preferences()
            .save(&profile.provider_id, &preferred)
            .await
            .unwrap();

        let summary = create_session(&state, create_request(None)).await.unwrap();
        assert_eq!(summary.total_rounds, 7);
    }

    #[tokio::test]
    async fn join_appends_in_join_order_and_is_idempotent() {
        let state = test_state().await;
        let code = create_session(&state, create_request(None))
            .await
            .unwrap()
            .code;

        for credential in ["demo:bob", "demo:carol", "demo:bob"] {
            join_session(
                &state,
                &code,
                JoinSessionRequest {
                    credential: credential.into(),
                },
            )
            .await
            .unwrap();
        }

        let summary = get_session(&state, &code).await.unwrap();
        assert_eq!(summary.players.len(), 3);
        assert!(summary.players[0].is_host);
        assert!(!summary.players[1].is_host);
        assert!(!summary.players[2].is_host);
    }

    #[tokio::test]
    async fn join_unknown_code_is_not_found() {
        let state = test_state().await;
        let err = join_session(
            &state,
            "NOPE00",
            JoinSessionRequest {
                credential: "demo:bob".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn settings_updates_are_host_only_and_sync_total_rounds() {
        let state = test_state().await;
        let summary = create_session(&state, create_request(None)).await.unwrap();
        let code = summary.code;
        let host_id = summary.players[0].id.clone();
        join_session(
            &state,
            &code,
            JoinSessionRequest {
                credential: "demo:bob".into(),
            },
        )
        .await
        .unwrap();
        let guest_id = get_session(&state, &code).await.unwrap().players[1].id.clone();

        let new_settings = Settings {
            round_count: 5,
            ..Settings::default()
        };
        let err = update_settings(
            &state,
            &code,
            UpdateSettingsRequest {
                player_id: guest_id,
                settings: new_settings.clone(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Rejected(TransitionRejection::NotHost { .. })
        ));

        let updated = update_settings(
            &state,
            &code,
            UpdateSettingsRequest {
                player_id: host_id,
                settings: new_settings,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.total_rounds, 5);
        assert_eq!(updated.settings.round_count, 5);
    }
}
