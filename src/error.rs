use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    services::{catalog::CatalogError, identity::IdentityError, preferences::PreferenceError},
    state::state_machine::TransitionRejection,
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// An intent guard failed; the session document is untouched.
    #[error(transparent)]
    Rejected(#[from] TransitionRejection),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Session store backend is unavailable.
    #[error("store unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without a session store.
    #[error("store unavailable (degraded mode)")]
    Degraded,
    /// Identity provider rejected the credential; a fresh login is required.
    #[error("credential expired or invalid")]
    CredentialExpired,
    /// Catalog provider is unreachable; the search can be retried.
    #[error("catalog search unavailable: {0}")]
    SearchUnavailable(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Stored state does not match what the operation requires.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Local preference store failed.
    #[error("preference store failure: {0}")]
    Preferences(String),
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable { .. } => ServiceError::Unavailable(err),
            StorageError::PatchConflict { ref message } => {
                let message = message.clone();
                ServiceError::InvalidState(message)
            }
        }
    }
}

impl From<IdentityError> for ServiceError {
    fn from(err: IdentityError) -> Self {
        // Every identity failure forces re-authentication; a transport error
        // is indistinguishable from a stale token as far as the client's
        // recovery path is concerned.
        match err {
            IdentityError::CredentialRejected | IdentityError::Unreachable(_) => {
                ServiceError::CredentialExpired
            }
        }
    }
}

impl From<CatalogError> for ServiceError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::CredentialRejected => ServiceError::CredentialExpired,
            CatalogError::Unavailable(message) => ServiceError::SearchUnavailable(message),
        }
    }
}

impl From<PreferenceError> for ServiceError {
    fn from(err: PreferenceError) -> Self {
        match err {
            PreferenceError::InvalidUserId(id) => {
                ServiceError::InvalidInput(format!("invalid preference key `{id}`"))
            }
            PreferenceError::Io(message) => ServiceError::Preferences(message),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Missing or expired credential.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The issuer lacks the authority for this intent.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Rejected(rejection) => rejection.into(),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::CredentialExpired => {
                AppError::Unauthorized("credential expired or invalid; sign in again".into())
            }
            ServiceError::SearchUnavailable(message) => AppError::ServiceUnavailable(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::Preferences(message) => AppError::Internal(message),
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
        }
    }
}

impl From<TransitionRejection> for AppError {
    fn from(rejection: TransitionRejection) -> Self {
        use TransitionRejection::*;
        match rejection {
            // Authority failures: the intent itself is fine, the issuer is not.
            NotHost { .. } | NotSelector | NotScorer | SelectorCannotGuess => {
                AppError::Forbidden(rejection.to_string())
            }
            // Phase and timing conflicts: legal later or earlier, not now.
            InvalidTransition(_) | GuessingClosed { .. } | AnswersLocked | SettingsFrozen
            | SessionClosed => AppError::Conflict(rejection.to_string()),
            // Structural problems with the payload.
            NoPlayers | WrongItemCount { .. } | DuplicateItems | ThemeTooShort { .. }
            | UnknownPlayer(_) | UnknownItem(_) | NotAGuesser(_) => {
                AppError::BadRequest(rejection.to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::state_machine::{Intent, InvalidTransition, SessionPhase};

    #[test]
    fn authority_rejections_map_to_forbidden() {
        let err: AppError = TransitionRejection::NotHost { action: "advance" }.into();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn phase_rejections_map_to_conflict() {
        let err: AppError = TransitionRejection::InvalidTransition(InvalidTransition {
            from: SessionPhase::Waiting,
            intent: Intent::Advance,
        })
        .into();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn identity_failures_force_reauthentication() {
        let err: ServiceError = IdentityError::Unreachable("timeout".into()).into();
        assert!(matches!(err, ServiceError::CredentialExpired));
    }
}
