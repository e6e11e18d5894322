//! Mixtape Back binary entrypoint wiring REST, SSE, and the session store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dao;
mod dto;
mod error;
mod routes;
mod services;
mod state;

use config::AppConfig;
use dao::session_store::{SessionStore, memory::MemorySessionStore};
use dao::storage::StorageError;
use services::{
    catalog::CatalogProvider, identity::IdentityProvider, playback::PlaybackController,
    storage_supervisor,
};
use state::{AppState, SharedState};

/// Environment variable pointing at the streaming service's Web API.
const MUSIC_API_ENV: &str = "MIXTAPE_BACK_MUSIC_API";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(config.port);

    let (identity, catalog, playback) = build_providers();
    let app_state = AppState::new(config, identity, catalog, playback);

    // The deployment environment is expected to provide the replicated
    // session store; the in-memory backend stands in for it here. The
    // supervisor keeps degraded mode meaningful for any backend.
    let store = MemorySessionStore::new();
    tokio::spawn(storage_supervisor::run(app_state.clone(), move || {
        let store = store.clone();
        async move { Ok::<Arc<dyn SessionStore>, StorageError>(Arc::new(store)) }
    }));

    let app = build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Wire the external collaborators: HTTP-backed providers when the feature
/// and the API base URL are present, the built-in demo set otherwise.
fn build_providers() -> (
    Arc<dyn IdentityProvider>,
    Arc<dyn CatalogProvider>,
    Arc<dyn PlaybackController>,
) {
    #[cfg(feature = "http-providers")]
    if let Ok(base_url) = env::var(MUSIC_API_ENV) {
        use services::{catalog::HttpCatalog, identity::HttpIdentity, playback::HttpPlayback};

        match (
            HttpIdentity::new(&base_url),
            HttpCatalog::new(&base_url),
            HttpPlayback::new(&base_url),
        ) {
            (Ok(identity), Ok(catalog), Ok(playback)) => {
                info!(%base_url, "using HTTP providers");
                return (Arc::new(identity), Arc::new(catalog), Arc::new(playback));
            }
            _ => {
                tracing::warn!(%base_url, "failed to build HTTP providers; using demo set");
            }
        }
    }

    info!(env = MUSIC_API_ENV, "no provider endpoint configured; using demo set");
    (
        Arc::new(services::identity::DemoIdentity::new()),
        Arc::new(services::catalog::DemoCatalog::new()),
        Arc::new(services::playback::NoopPlayback),
    )
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
