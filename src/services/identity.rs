//! Identity/profile provider abstraction.
//!
//! Sessions never store credentials; they store the provider-assigned
//! profile. Any provider failure funnels into [`IdentityError`] and forces a
//! fresh login on the client, never a silent retry.

use std::hash::{DefaultHasher, Hash, Hasher};

use futures::future::BoxFuture;
use thiserror::Error;

/// Profile returned by the identity provider for a bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Provider-assigned stable identifier.
    pub provider_id: String,
    /// Display name to show to other players.
    pub display_name: String,
    /// Avatar image URL, when the provider has one.
    pub avatar_url: Option<String>,
}

/// Errors raised by identity lookups.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The provider rejected the credential.
    #[error("credential rejected by identity provider")]
    CredentialRejected,
    /// The provider could not be reached.
    #[error("identity provider unreachable: {0}")]
    Unreachable(String),
}

/// Resolves a bearer credential to a player profile.
pub trait IdentityProvider: Send + Sync {
    /// Fetch the profile behind a credential.
    fn profile(&self, credential: &str) -> BoxFuture<'static, Result<Profile, IdentityError>>;
}

const DEMO_NAMES: &[&str] = &[
    "Nova", "Echo", "Vinyl", "Tempo", "Jukebox", "Falsetto", "Reverb", "Chorus",
];

/// Deterministic offline identity used for demo play and tests.
///
/// The same credential always resolves to the same profile, so a demo player
/// can leave and rejoin a session without losing their seat.
#[derive(Debug, Default, Clone)]
pub struct DemoIdentity;

impl DemoIdentity {
    /// Create the demo provider.
    pub fn new() -> Self {
        Self
    }
}

impl IdentityProvider for DemoIdentity {
    fn profile(&self, credential: &str) -> BoxFuture<'static, Result<Profile, IdentityError>> {
        let credential = credential.trim().to_owned();
        Box::pin(async move {
            if credential.is_empty() {
                return Err(IdentityError::CredentialRejected);
            }

            let mut hasher = DefaultHasher::new();
            credential.hash(&mut hasher);
            let digest = hasher.finish();

            let name = DEMO_NAMES[(digest % DEMO_NAMES.len() as u64) as usize];
            let provider_id = format!("demo-{digest:016x}");
            Ok(Profile {
                avatar_url: Some(format!(
                    "https://api.dicebear.com/7.x/avataaars/svg?seed={provider_id}"
                )),
                display_name: name.to_owned(),
                provider_id,
            })
        })
    }
}

#[cfg(feature = "http-providers")]
pub use self::http::HttpIdentity;

#[cfg(feature = "http-providers")]
mod http {
    use std::sync::Arc;

    use futures::future::BoxFuture;
    use reqwest::{Client, StatusCode};
    use serde::Deserialize;

    use super::{IdentityError, IdentityProvider, Profile};

    /// Identity provider backed by the streaming service's Web API.
    #[derive(Clone)]
    pub struct HttpIdentity {
        client: Client,
        base_url: Arc<str>,
    }

    impl HttpIdentity {
        /// Build a client against the given API base URL.
        pub fn new(base_url: &str) -> Result<Self, IdentityError> {
            let client = Client::builder()
                .build()
                .map_err(|err| IdentityError::Unreachable(err.to_string()))?;
            Ok(Self {
                client,
                base_url: Arc::from(base_url.trim_end_matches('/')),
            })
        }
    }

    #[derive(Debug, Deserialize)]
    struct RawProfile {
        id: String,
        display_name: Option<String>,
        #[serde(default)]
        images: Vec<RawImage>,
    }

    #[derive(Debug, Deserialize)]
    struct RawImage {
        url: String,
    }

    impl IdentityProvider for HttpIdentity {
        fn profile(&self, credential: &str) -> BoxFuture<'static, Result<Profile, IdentityError>> {
            let client = self.client.clone();
            let url = format!("{}/v1/me", self.base_url);
            let credential = credential.to_owned();

            Box::pin(async move {
                let response = client
                    .get(url)
                    .bearer_auth(credential)
                    .send()
                    .await
                    .map_err(|err| IdentityError::Unreachable(err.to_string()))?;

                match response.status() {
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                        Err(IdentityError::CredentialRejected)
                    }
                    status if !status.is_success() => Err(IdentityError::Unreachable(format!(
                        "identity endpoint returned {status}"
                    ))),
                    _ => {
                        let raw: RawProfile = response
                            .json()
                            .await
                            .map_err(|err| IdentityError::Unreachable(err.to_string()))?;
                        Ok(Profile {
                            display_name: raw.display_name.unwrap_or_else(|| raw.id.clone()),
                            avatar_url: raw.images.into_iter().next().map(|image| image.url),
                            provider_id: raw.id,
                        })
                    }
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_profiles_are_deterministic() {
        let provider = DemoIdentity::new();
        let first = provider.profile("demo:alice").await.unwrap();
        let second = provider.profile("demo:alice").await.unwrap();
        assert_eq!(first, second);
        assert!(first.provider_id.starts_with("demo-"));
    }

    #[tokio::test]
    async fn distinct_credentials_get_distinct_ids() {
        let provider = DemoIdentity::new();
        let alice = provider.profile("demo:alice").await.unwrap();
        let bob = provider.profile("demo:bob").await.unwrap();
        assert_ne!(alice.provider_id, bob.provider_id);
    }

    #[tokio::test]
    async fn blank_credential_is_rejected() {
        let provider = DemoIdentity::new();
        assert!(matches!(
            provider.profile("   ").await,
            Err(IdentityError::CredentialRejected)
        ));
    }
}
