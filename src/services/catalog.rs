//! Catalog/search provider abstraction used by the selector.

use futures::future::BoxFuture;
use thiserror::Error;

use crate::state::session::ContentItem;

/// Queries shorter than this return nothing instead of hitting the provider.
pub const MIN_QUERY_CHARS: usize = 2;

/// Errors raised by catalog searches.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The provider rejected the credential.
    #[error("credential rejected by catalog provider")]
    CredentialRejected,
    /// The provider is unreachable; the search can simply be retried.
    #[error("catalog provider unavailable: {0}")]
    Unavailable(String),
}

/// Free-text track search against the content catalog.
pub trait CatalogProvider: Send + Sync {
    /// Return candidate items for a query; an empty query yields nothing.
    fn search(
        &self,
        query: &str,
        credential: &str,
    ) -> BoxFuture<'static, Result<Vec<ContentItem>, CatalogError>>;
}

/// Offline catalog with a handful of well-known tracks, for demo play and
/// tests.
#[derive(Debug, Clone)]
pub struct DemoCatalog {
    tracks: Vec<ContentItem>,
}

impl Default for DemoCatalog {
    fn default() -> Self {
        let seed = [
            ("demo-1", "Bohemian Rhapsody", "Queen"),
            ("demo-2", "Blinding Lights", "The Weeknd"),
            ("demo-3", "As It Was", "Harry Styles"),
            ("demo-4", "Roller Coaster", "Danny Vera"),
            ("demo-5", "Shape of You", "Ed Sheeran"),
            ("demo-6", "Bad Guy", "Billie Eilish"),
        ];
        Self {
            tracks: seed
                .into_iter()
                .map(|(id, title, artist)| ContentItem {
                    id: id.into(),
                    title: title.into(),
                    artist: artist.into(),
                    cover_url: format!("https://picsum.photos/seed/{id}/64/64"),
                    playable_ref: None,
                })
                .collect(),
        }
    }
}

impl DemoCatalog {
    /// Create the demo catalog.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CatalogProvider for DemoCatalog {
    fn search(
        &self,
        query: &str,
        _credential: &str,
    ) -> BoxFuture<'static, Result<Vec<ContentItem>, CatalogError>> {
        let query = query.trim().to_lowercase();
        let tracks = self.tracks.clone();
        Box::pin(async move {
            if query.chars().count() < MIN_QUERY_CHARS {
                return Ok(Vec::new());
            }
            Ok(tracks
                .into_iter()
                .filter(|track| {
                    track.title.to_lowercase().contains(&query)
                        || track.artist.to_lowercase().contains(&query)
                })
                .collect())
        })
    }
}

#[cfg(feature = "http-providers")]
pub use self::http::HttpCatalog;

#[cfg(feature = "http-providers")]
mod http {
    use std::sync::Arc;

    use futures::future::BoxFuture;
    use reqwest::{Client, StatusCode};
    use serde::Deserialize;

    use super::{CatalogError, CatalogProvider, MIN_QUERY_CHARS};
    use crate::state::session::ContentItem;

    const SEARCH_LIMIT: u8 = 20;

    /// Catalog provider backed by the streaming service's Web API.
    #[derive(Clone)]
    pub struct HttpCatalog {
        client: Client,
        base_url: Arc<str>,
    }

    impl HttpCatalog {
        /// Build a client against the given API base URL.
        pub fn new(base_url: &str) -> Result<Self, CatalogError> {
            let client = Client::builder()
                .build()
                .map_err(|err| CatalogError::Unavailable(err.to_string()))?;
            Ok(Self {
                client,
                base_url: Arc::from(base_url.trim_end_matches('/')),
            })
        }
    }

    #[derive(Debug, Deserialize)]
    struct SearchResponse {
        tracks: TrackPage,
    }

    #[derive(Debug, Deserialize)]
    struct TrackPage {
        #[serde(default)]
        items: Vec<RawTrack>,
    }

    #[derive(Debug, Deserialize)]
    struct RawTrack {
        id: String,
        name: String,
        #[serde(default)]
        artists: Vec<RawArtist>,
        album: RawAlbum,
        uri: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    struct RawArtist {
        name: String,
    }

    #[derive(Debug, Deserialize)]
    struct RawAlbum {
        #[serde(default)]
        images: Vec<RawImage>,
    }

    #[derive(Debug, Deserialize)]
    struct RawImage {
        url: String,
    }

    impl From<RawTrack> for ContentItem {
        fn from(track: RawTrack) -> Self {
            Self {
                title: track.name,
                artist: track
                    .artists
                    .into_iter()
                    .map(|artist| artist.name)
                    .collect::<Vec<_>>()
                    .join(", "),
                cover_url: track
                    .album
                    .images
                    .into_iter()
                    .next()
                    .map(|image| image.url)
                    .unwrap_or_default(),
                playable_ref: track.uri,
                id: track.id,
            }
        }
    }

    impl CatalogProvider for HttpCatalog {
        fn search(
            &self,
            query: &str,
            credential: &str,
        ) -> BoxFuture<'static, Result<Vec<ContentItem>, CatalogError>> {
            let client = self.client.clone();
            let url = format!("{}/v1/search", self.base_url);
            let query = query.trim().to_owned();
            let credential = credential.to_owned();

            Box::pin(async move {
                if query.chars().count() < MIN_QUERY_CHARS {
                    return Ok(Vec::new());
                }

                let limit = SEARCH_LIMIT.to_string();
                let response = client
                    .get(url)
                    .query(&[
                        ("q", query.as_str()),
                        ("type", "track"),
                        ("limit", limit.as_str()),
                    ])
                    .bearer_auth(credential)
                    .send()
                    .await
                    .map_err(|err| CatalogError::Unavailable(err.to_string()))?;

                match response.status() {
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                        Err(CatalogError::CredentialRejected)
                    }
                    status if !status.is_success() => Err(CatalogError::Unavailable(format!(
                        "search endpoint returned {status}"
                    ))),
                    _ => {
                        let parsed: SearchResponse = response
                            .json()
                            .await
                            .map_err(|err| CatalogError::Unavailable(err.to_string()))?;
                        Ok(parsed.tracks.items.into_iter().map(Into::into).collect())
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
    async fn empty_query_yields_empty_sequence() {
        let catalog = DemoCatalog::new();
        assert!(catalog.search("", "demo").await.unwrap().is_empty());
        assert!(catalog.search("q", "demo").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_matches_title_and_artist() {
        let catalog = DemoCatalog::new();
        let by_title = catalog.search("rhapsody", "demo").await.unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].artist, "Queen");

        let by_artist = catalog.search("weeknd", "demo").await.unwrap();
        assert_eq!(by_artist.len(), 1);
        assert_eq!(by_artist[0].title, "Blinding Lights");
    }
}
