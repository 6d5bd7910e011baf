//! filestage - A single-user, Discord-authenticated staging page
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Server-rendered page                                     │
//! │  - Discord OAuth redirect / callback / logout               │
//! │  - Staging form targets                                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Session & Staging Layer                     │
//! │  - SessionManager (implicit grant, cached profile)          │
//! │  - StagingArea (in-memory files and links)                  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Local Store                             │
//! │  - One JSON file per key (or in-memory)                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers for the page and staging forms
//! - `auth`: Discord OAuth and session management
//! - `staging`: Staged files, links and the sample download list
//! - `storage`: Local key/value store backing the session cache
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod staging;
pub mod storage;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Cloned for each request; the session and staging lists are shared.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// The one session manager for this process
    pub session: Arc<auth::SessionManager>,

    /// Staged files and links
    pub staging: Arc<staging::StagingArea>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Open the local store
    /// 2. Build the HTTP client and Discord profile client
    /// 3. Create the session manager
    /// 4. Rehydrate the session from the local store
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Open the local store
        let store = storage::build_local_store(&config.storage);

        // 2. Initialize HTTP client
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("filestage/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;
        let profiles = Arc::new(auth::DiscordClient::new(
            http_client,
            config.discord.api_base_url.clone(),
        ));

        Ok(Self::with_parts(config, store, profiles).await)
    }

    /// Build state from explicit parts and rehydrate the session
    pub async fn with_parts(
        config: config::AppConfig,
        store: Arc<dyn storage::LocalStore>,
        profiles: Arc<dyn auth::ProfileSource>,
    ) -> Self {
        // 3. Create the session manager
        let session = auth::SessionManager::new(
            config.discord.clone(),
            config.server.base_url(),
            store,
            config.storage.session_key.clone(),
            profiles,
        );

        // 4. Rehydrate
        let session_state = session.rehydrate().await;
        tracing::info!(state = ?session_state, "Session initialized");

        Self {
            config: Arc::new(config),
            session: Arc::new(session),
            staging: Arc::new(staging::StagingArea::new()),
        }
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, middleware, routing::get};
    use tower::ServiceBuilder;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    Router::new()
        .route("/", get(api::index))
        .route("/health", get(health_check))
        .merge(auth::auth_router())
        .merge(api::staging_router(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(middleware::from_fn(api::track_requests)),
        )
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
