use tracing::warn;

use crate::{dao::session_store::SessionStore, dto::health::HealthResponse, state::SharedState};

/// Respond with a health payload while logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_session_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "session store health check failed");
            }
        }
        Err(_) => warn!("session store unavailable (degraded mode)"),
    }

    if state.is_degraded().await {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}
