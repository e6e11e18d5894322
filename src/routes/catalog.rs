use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;

use crate::{error::AppError, state::SharedState, state::session::ContentItem};

/// Routes proxying the catalog/search provider for the selector.
pub fn router() -> Router<SharedState> {
    Router::new().route("/catalog/search", get(search))
}

#[derive(Debug, Deserialize)]
/// Free-text catalog query.
pub struct SearchQuery {
    /// Search terms; an empty query yields an empty result.
    #[serde(default)]
    pub q: String,
    /// Bearer credential for the catalog provider.
    pub credential: String,
}

/// Search the catalog for candidate items.
#[utoipa::path(
    get,
    path = "/catalog/search",
    tag = "catalog",
    params(
        ("q" = String, Query, description = "Search terms"),
        ("credential" = String, Query, description = "Bearer credential for the provider")
    ),
    responses(
        (status = 200, description = "Candidate items", body = [ContentItem]),
        (status = 401, description = "Credential expired or invalid"),
        (status = 503, description = "Provider unavailable; retry later")
    )
)]
pub async fn search(
    State(state): State<SharedState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ContentItem>>, AppError> {
    let items = state
        .catalog()
        .search(&query.q, &query.credential)
        .await
        .map_err(crate::error::ServiceError::from)?;
    Ok(Json(items))
}
