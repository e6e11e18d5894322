//! Persisted host preferences: one JSON blob of default [`Settings`] per
//! user, read as the seed when that user creates a session.

use std::path::PathBuf;

use thiserror::Error;
use tokio::fs;
use tracing::warn;

use crate::state::session::Settings;

const MAX_USER_ID_CHARS: usize = 64;

/// Errors raised by the preference store.
#[derive(Debug, Error)]
pub enum PreferenceError {
    /// The user id cannot be used as a storage key.
    #[error("invalid preference key `{0}`")]
    InvalidUserId(String),
    /// Filesystem failure underneath the store.
    #[error("preference store io failure: {0}")]
    Io(String),
}

/// Key→JSON blob store for per-user default settings.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    dir: PathBuf,
}

impl PreferenceStore {
    /// Create a store rooted at the given directory.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Load a user's stored defaults, if any.
    ///
    /// A corrupt blob is treated like an absent one (with a warning) so a
    /// bad write can never lock a host out of creating sessions.
    pub async fn load(&self, user_id: &str) -> Result<Option<Settings>, PreferenceError> {
        let path = self.path_for(user_id)?;
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(PreferenceError::Io(err.to_string())),
        };

        match serde_json::from_str(&contents) {
            Ok(settings) => Ok(Some(settings)),
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "ignoring unparsable preference blob"
                );
                Ok(None)
            }
        }
    }

    /// Store a user's defaults, overwriting any previous blob.
    pub async fn save(&self, user_id: &str, settings: &Settings) -> Result<(), PreferenceError> {
        let path = self.path_for(user_id)?;
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| PreferenceError::Io(err.to_string()))?;
        let contents = serde_json::to_string_pretty(settings)
            .map_err(|err| PreferenceError::Io(err.to_string()))?;
        fs::write(&path, contents)
            .await
            .map_err(|err| PreferenceError::Io(err.to_string()))
    }

    fn path_for(&self, user_id: &str) -> Result<PathBuf, PreferenceError> {
        let valid = !user_id.is_empty()
            && user_id.chars().count() <= MAX_USER_ID_CHARS
            && user_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
        if !valid {
            return Err(PreferenceError::InvalidUserId(user_id.to_owned()));
        }
        Ok(self.dir.join(format!("{user_id}.json")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::session::Difficulty;
    use uuid::Uuid;

    fn scratch_store() -> PreferenceStore {
        let dir = std::env::temp_dir()
            .join("mixtape-back-tests")
            .join(Uuid::new_v4().simple().to_string());
        PreferenceStore::new(dir)
    }

    #[tokio::test]
    async fn missing_blob_reads_as_none() {
        let store = scratch_store();
        assert_eq!(store.load("demo-user").await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let store = scratch_store();
        let settings = Settings {
            round_count: 5,
            difficulty: Difficulty::Hard,
            ..Settings::default()
        };
        store.save("demo-user", &settings).await.unwrap();
        assert_eq!(store.load("demo-user").await.unwrap(), Some(settings));
    }

    #[tokio::test]
    async fn path_traversal_keys_are_refused() {
        let store = scratch_store();
        for key in ["../escape", "a/b", "", "x".repeat(65).as_str()] {
            assert!(matches!(
                store.load(key).await,
                Err(PreferenceError::InvalidUserId(_))
            ));
        }
    }
}
