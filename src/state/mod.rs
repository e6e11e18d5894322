pub mod session;
pub mod state_machine;

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::timeout;

use crate::{
    config::AppConfig,
    dao::session_store::SessionStore,
    error::ServiceError,
    services::{
        catalog::CatalogProvider, identity::IdentityProvider, playback::PlaybackController,
        preferences::PreferenceStore,
    },
};

/// Cheaply clonable handle to the shared application state.
pub type SharedState = Arc<AppState>;

/// Upper bound on how long a single intent may hold a session's gate.
pub const DEFAULT_INTENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Central application state: store handle, per-session gates, and the
/// external collaborator handles.
pub struct AppState {
    config: AppConfig,
    session_store: RwLock<Option<Arc<dyn SessionStore>>>,
    degraded: watch::Sender<bool>,
    gates: DashMap<String, Arc<Mutex<()>>>,
    identity: Arc<dyn IdentityProvider>,
    catalog: Arc<dyn CatalogProvider>,
    playback: Arc<dyn PlaybackController>,
    preferences: PreferenceStore,
    intent_timeout: Option<Duration>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a session store is
    /// installed by the storage supervisor.
    pub fn new(
        config: AppConfig,
        identity: Arc<dyn IdentityProvider>,
        catalog: Arc<dyn CatalogProvider>,
        playback: Arc<dyn PlaybackController>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let preferences = PreferenceStore::new(config.preferences_dir.clone());
        Arc::new(Self {
            config,
            session_store: RwLock::new(None),
            degraded: degraded_tx,
            gates: DashMap::new(),
            identity,
            catalog,
            playback,
            preferences,
            intent_timeout: Some(DEFAULT_INTENT_TIMEOUT),
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the identity provider.
    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }

    /// Handle to the catalog/search provider.
    pub fn catalog(&self) -> &Arc<dyn CatalogProvider> {
        &self.catalog
    }

    /// Handle to the playback controller.
    pub fn playback(&self) -> &Arc<dyn PlaybackController> {
        &self.playback
    }

    /// Handle to the host preference store.
    pub fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    /// Obtain a handle to the current session store, if one is installed.
    pub async fn session_store(&self) -> Option<Arc<dyn SessionStore>> {
        let guard = self.session_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the session store or fail with the degraded-mode error.
    pub async fn require_session_store(&self) -> Result<Arc<dyn SessionStore>, ServiceError> {
        self.session_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new session store implementation and leave degraded mode.
    pub async fn install_session_store(&self, store: Arc<dyn SessionStore>) {
        {
            let mut guard = self.session_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current session store and enter degraded mode.
    pub async fn clear_session_store(&self) {
        {
            let mut guard = self.session_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.session_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            let changed = *current != value;
            *current = value;
            changed
        });
    }

    /// Run an intent while holding the session's transition gate.
    ///
    /// The gate serializes every mutating intent against one session, so the
    /// read-validate-write sequence inside `work` observes no interleaving
    /// writers. Sessions are independent; their gates never contend with each
    /// other. Work exceeding the intent timeout is dropped and surfaced as
    /// [`ServiceError::Timeout`].
    pub async fn run_intent<F, Fut, T>(&self, code: &str, work: F) -> Result<T, ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ServiceError>>,
    {
        let gate = self
            .gates
            .entry(code.to_owned())
            .or_default()
            .clone();
        let _guard = gate.lock().await;

        let work_future = work();
        match self.intent_timeout {
            Some(limit) => match timeout(limit, work_future).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ServiceError::Timeout),
            },
            None => work_future.await,
        }
    }

    /// Forget the gate of a finished session.
    pub fn drop_gate(&self, code: &str) {
        self.gates.remove(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::session_store::memory::MemorySessionStore,
        services::{catalog::DemoCatalog, identity::DemoIdentity, playback::NoopPlayback},
    };

    fn state() -> SharedState {
        AppState::new(
            AppConfig::default(),
            Arc::new(DemoIdentity::new()),
            Arc::new(DemoCatalog::new()),
            Arc::new(NoopPlayback),
        )
    }

    #[tokio::test]
    async fn starts_degraded_until_store_installed() {
        let state = state();
        assert!(state.is_degraded().await);
        assert!(matches!(
            state.require_session_store().await,
            Err(ServiceError::Degraded)
        ));

        state
            .install_session_store(Arc::new(MemorySessionStore::new()))
            .await;
        assert!(!state.is_degraded().await);
        assert!(state.require_session_store().await.is_ok());
    }

    #[tokio::test]
    async fn degraded_watcher_sees_store_removal() {
        let state = state();
        let mut watcher = state.degraded_watcher();
        state
            .install_session_store(Arc::new(MemorySessionStore::new()))
            .await;
        watcher.changed().await.unwrap();
        assert!(!*watcher.borrow_and_update());

        state.clear_session_store().await;
        watcher.changed().await.unwrap();
        assert!(*watcher.borrow_and_update());
    }

    #[tokio::test]
    async fn run_intent_serializes_per_session() {
        let state = state();
        let value = Arc::new(tokio::sync::Mutex::new(0u32));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let state = state.clone();
            let value = value.clone();
            handles.push(tokio::spawn(async move {
                state
                    .run_intent("GATE01", || async {
                        // Read, yield, write: without the gate this loses
                        // updates to interleaved tasks.
                        let read = *value.lock().await;
                        tokio::task::yield_now().await;
                        *value.lock().await = read + 1;
                        Ok::<_, ServiceError>(())
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(*value.lock().await, 8);
    }
}
