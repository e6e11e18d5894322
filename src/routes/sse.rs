use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;
use uuid::Uuid;

use crate::{error::AppError, routes::check_session_code, services::sse_service, state::SharedState};

/// Stream whole-document snapshots for one session.
#[utoipa::path(
    get,
    path = "/sessions/{code}/events",
    tag = "sse",
    params(("code" = String, Path, description = "Session code")),
    responses(
        (status = 200, description = "Session snapshot stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown session code")
    )
)]
pub async fn session_stream(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    check_session_code(&code)?;
    let receiver = sse_service::subscribe_session(&state, &code).await?;
    let connection = Uuid::new_v4().simple().to_string();
    info!(%code, connection, "new session SSE connection");
    Ok(sse_service::to_sse_stream(receiver))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sessions/{code}/events", get(session_stream))
}
