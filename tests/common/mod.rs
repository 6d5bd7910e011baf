//! Common test utilities for E2E tests

#![allow(dead_code)]

use filestage::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;
use wiremock::MockServer;

pub const SESSION_KEY: &str = "discord_user";

/// Test server instance
///
/// Runs the real router on a random port, with Discord replaced by a
/// wiremock server and the local store rooted in a temp directory.
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub discord: MockServer,
    pub temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server with an empty local store
    pub async fn new() -> Self {
        Self::start(None).await
    }

    /// Create a test server whose local store already holds `cached`
    /// under the session key
    pub async fn with_cached_session(cached: &str) -> Self {
        Self::start(Some(cached)).await
    }

    async fn start(cached: Option<&str>) -> Self {
        let discord = MockServer::start().await;
        let temp_dir = TempDir::new().unwrap();
        let store_dir = temp_dir.path().join("store");

        if let Some(cached) = cached {
            std::fs::create_dir_all(&store_dir).unwrap();
            std::fs::write(store_dir.join(format!("{SESSION_KEY}.json")), cached).unwrap();
        }

        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                domain: "localhost:8080".to_string(),
                protocol: "http".to_string(),
            },
            discord: config::DiscordConfig {
                client_id: "test-client-id".to_string(),
                authorize_url: "https://discord.com/api/oauth2/authorize".to_string(),
                api_base_url: discord.uri(),
                cdn_base_url: "https://cdn.discordapp.com".to_string(),
            },
            storage: config::StorageConfig {
                backend: config::StorageBackend::File,
                path: store_dir,
                session_key: SESSION_KEY.to_string(),
            },
            staging: config::StagingConfig {
                max_upload_bytes: 1024 * 1024,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };
        config.validate().unwrap();

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Redirects are asserted on, not followed
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = filestage::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            discord,
            temp_dir,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Raw contents of the cached session entry, if any
    pub fn cached_session(&self) -> Option<String> {
        let path = self
            .state
            .config
            .storage
            .path
            .join(format!("{SESSION_KEY}.json"));
        std::fs::read_to_string(path).ok()
    }

    /// Requests received by the mock Discord API
    pub async fn discord_requests(&self) -> Vec<wiremock::Request> {
        self.discord.received_requests().await.unwrap_or_default()
    }
}

/// Location header of a redirect response
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}
