//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub discord: DiscordConfig,
    pub storage: StorageConfig,
    pub staging: StagingConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public host the browser sees, including a non-default port
    /// (e.g., "localhost:8080")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the page origin
    ///
    /// # Returns
    /// Full origin like "http://localhost:8080", with no trailing slash.
    /// Used verbatim as the OAuth `redirect_uri`.
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Discord OAuth2 configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    /// Application client ID
    pub client_id: String,
    /// Authorization endpoint
    pub authorize_url: String,
    /// REST API base (profile lives at `{api_base_url}/users/@me`)
    pub api_base_url: String,
    /// CDN base for avatar images
    pub cdn_base_url: String,
}

/// Local store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Which store backs the session cache
    #[serde(default)]
    pub backend: StorageBackend,
    /// Directory holding one file per key (file backend only)
    pub path: PathBuf,
    /// Key under which the signed-in profile is cached
    pub session_key: String,
}

/// Store backend selector
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Memory,
}

/// Staging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StagingConfig {
    /// Maximum request body size for file uploads, in bytes
    pub max_upload_bytes: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    pub fn default_filter(&self) -> String {
        format!(
            "filestage={},tower_http=debug",
            self.level.to_ascii_lowercase()
        )
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

pub const DEFAULT_DISCORD_CLIENT_ID: &str = "1345779547013906452";
pub const DEFAULT_SESSION_KEY: &str = "discord_user";

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (FILESTAGE__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.domain", "localhost:8080")?
            .set_default("server.protocol", "http")?
            .set_default("discord.client_id", DEFAULT_DISCORD_CLIENT_ID)?
            .set_default(
                "discord.authorize_url",
                "https://discord.com/api/oauth2/authorize",
            )?
            .set_default("discord.api_base_url", "https://discord.com/api")?
            .set_default("discord.cdn_base_url", "https://cdn.discordapp.com")?
            .set_default("storage.backend", "file")?
            .set_default("storage.path", "data")?
            .set_default("storage.session_key", DEFAULT_SESSION_KEY)?
            .set_default("staging.max_upload_bytes", 256 * 1024 * 1024)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (FILESTAGE__*)
            .add_source(
                Environment::with_prefix("FILESTAGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), crate::error::AppError> {
        use crate::error::AppError;

        if self.discord.client_id.trim().is_empty() {
            return Err(AppError::Config(
                "discord.client_id must not be empty".to_string(),
            ));
        }

        if !matches!(
            self.server.protocol.to_ascii_lowercase().as_str(),
            "http" | "https"
        ) {
            return Err(AppError::Config(format!(
                "server.protocol must be http or https, got {}",
                self.server.protocol
            )));
        }

        if self.server.domain.trim().is_empty() {
            return Err(AppError::Config(
                "server.domain must not be empty".to_string(),
            ));
        }

        if !crate::storage::is_valid_key(&self.storage.session_key) {
            return Err(AppError::Config(format!(
                "storage.session_key may only contain [A-Za-z0-9_-], got {:?}",
                self.storage.session_key
            )));
        }

        if !matches!(
            self.logging.level.to_ascii_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(AppError::Config(format!(
                "logging.level must be one of trace, debug, info, warn, error, got {}",
                self.logging.level
            )));
        }

        if !matches!(
            self.logging.format.to_ascii_lowercase().as_str(),
            "pretty" | "json"
        ) {
            return Err(AppError::Config(format!(
                "logging.format must be pretty or json, got {}",
                self.logging.format
            )));
        }

        if self.staging.max_upload_bytes == 0 {
            return Err(AppError::Config(
                "staging.max_upload_bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
