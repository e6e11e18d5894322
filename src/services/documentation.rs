use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Mixtape Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::session_stream,
        crate::routes::session::create_session,
        crate::routes::session::get_session,
        crate::routes::session::join_session,
        crate::routes::session::update_settings,
        crate::routes::session::player_view,
        crate::routes::round::start_game,
        crate::routes::round::submit_selection,
        crate::routes::round::submit_guess,
        crate::routes::round::finish_round,
        crate::routes::round::scoring_view,
        crate::routes::round::confirm_scores,
        crate::routes::round::advance_round,
        crate::routes::round::control_playback,
        crate::routes::catalog::search,
        crate::routes::preferences::get_preferences,
        crate::routes::preferences::save_preferences,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::session::CreateSessionRequest,
            crate::dto::session::JoinSessionRequest,
            crate::dto::session::UpdateSettingsRequest,
            crate::dto::session::IntentRequest,
            crate::dto::session::SelectionRequest,
            crate::dto::session::GuessRequest,
            crate::dto::session::ConfirmScoresRequest,
            crate::dto::session::PlaybackRequest,
            crate::dto::session::PlaybackOutcome,
            crate::dto::session::SessionSummary,
            crate::dto::session::RoundSummary,
            crate::dto::session::ScoringView,
            crate::dto::session::SavePreferencesRequest,
            crate::services::projection::DisplayState,
            crate::services::scoring::ItemScore,
            crate::services::scoring::PlayerSheet,
            crate::state::session::ContentItem,
            crate::state::session::Guess,
            crate::state::session::ItemGuess,
            crate::state::session::Player,
            crate::state::session::Settings,
            crate::state::state_machine::SessionPhase,
        )
    ),
    tags(
        (name = "session", description = "Session lifecycle: create, join, settings"),
        (name = "round", description = "Round lifecycle: selection, guesses, scoring, advance"),
        (name = "catalog", description = "Catalog search proxy"),
        (name = "preferences", description = "Host default settings"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "health", description = "Health check endpoints"),
    )
)]
pub struct ApiDoc;
