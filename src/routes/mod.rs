use axum::Router;

use crate::state::SharedState;

pub mod catalog;
pub mod docs;
pub mod health;
pub mod preferences;
pub mod round;
pub mod session;
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(session::router())
        .merge(round::router())
        .merge(catalog::router())
        .merge(preferences::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}

/// Reject malformed session codes before they reach the services.
pub(crate) fn check_session_code(code: &str) -> Result<(), crate::error::AppError> {
    crate::dto::validation::validate_session_code(code)
        .map_err(|err| crate::error::AppError::BadRequest(err.to_string()))
}
