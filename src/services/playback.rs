//! Playback controller abstraction.
//!
//! Playback is a convenience for the room, not part of the game state: a
//! failed play command is reported to the caller and never blocks a phase
//! transition or touches the session document.

use futures::future::BoxFuture;
use thiserror::Error;
use tracing::debug;

/// Error raised when a playback command cannot be delivered.
#[derive(Debug, Error)]
#[error("playback command failed: {0}")]
pub struct PlaybackError(pub String);

/// Remote control over the player device of the issuing client.
pub trait PlaybackController: Send + Sync {
    /// Start playing a playable reference on a device.
    fn play(
        &self,
        credential: &str,
        device_ref: &str,
        playable_ref: &str,
    ) -> BoxFuture<'static, Result<(), PlaybackError>>;
    /// Pause whatever the device is playing.
    fn pause(
        &self,
        credential: &str,
        device_ref: &str,
    ) -> BoxFuture<'static, Result<(), PlaybackError>>;
}

/// Controller that only logs, used for demo play and when no player exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPlayback;

impl PlaybackController for NoopPlayback {
    fn play(
        &self,
        _credential: &str,
        device_ref: &str,
        playable_ref: &str,
    ) -> BoxFuture<'static, Result<(), PlaybackError>> {
        debug!(device_ref, playable_ref, "simulating playback start");
        Box::pin(async { Ok(()) })
    }

    fn pause(
        &self,
        _credential: &str,
        device_ref: &str,
    ) -> BoxFuture<'static, Result<(), PlaybackError>> {
        debug!(device_ref, "simulating playback pause");
        Box::pin(async { Ok(()) })
    }
}

#[cfg(feature = "http-providers")]
pub use self::http::HttpPlayback;

#[cfg(feature = "http-providers")]
mod http {
    use std::sync::Arc;

    use futures::future::BoxFuture;
    use reqwest::Client;
    use serde_json::json;

    use super::{PlaybackController, PlaybackError};

    /// Playback controller driving the streaming service's connect API.
    #[derive(Clone)]
    pub struct HttpPlayback {
        client: Client,
        base_url: Arc<str>,
    }

    impl HttpPlayback {
        /// Build a client against the given API base URL.
        pub fn new(base_url: &str) -> Result<Self, PlaybackError> {
            let client = Client::builder()
                .build()
                .map_err(|err| PlaybackError(err.to_string()))?;
            Ok(Self {
                client,
                base_url: Arc::from(base_url.trim_end_matches('/')),
            })
        }
    }

    impl PlaybackController for HttpPlayback {
        fn play(
            &self,
            credential: &str,
            device_ref: &str,
            playable_ref: &str,
        ) -> BoxFuture<'static, Result<(), PlaybackError>> {
            let client = self.client.clone();
            let url = format!("{}/v1/me/player/play", self.base_url);
            let credential = credential.to_owned();
            let device_ref = device_ref.to_owned();
            let body = json!({ "uris": [playable_ref] });

            Box::pin(async move {
                let response = client
                    .put(url)
                    .query(&[("device_id", device_ref.as_str())])
                    .bearer_auth(credential)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|err| PlaybackError(err.to_string()))?;
                if response.status().is_success() {
                    Ok(())
                } else {
                    Err(PlaybackError(format!(
                        "player endpoint returned {}",
                        response.status()
                    )))
                }
            })
        }

        fn pause(
            &self,
            credential: &str,
            device_ref: &str,
        ) -> BoxFuture<'static, Result<(), PlaybackError>> {
            let client = self.client.clone();
            let url = format!("{}/v1/me/player/pause", self.base_url);
            let credential = credential.to_owned();
            let device_ref = device_ref.to_owned();

            Box::pin(async move {
                let response = client
                    .put(url)
                    .query(&[("device_id", device_ref.as_str())])
                    .bearer_auth(credential)
                    .send()
                    .await
                    .map_err(|err| PlaybackError(err.to_string()))?;
                if response.status().is_success() {
                    Ok(())
                } else {
                    Err(PlaybackError(format!(
                        "player endpoint returned {}",
                        response.status()
                    )))
                }
            })
        }
    }
}
