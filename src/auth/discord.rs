//! Discord identity provider
//!
//! Implements the client side of the OAuth 2.0 implicit grant:
//! building the authorize URL and fetching the signed-in user's profile
//! with the bearer token returned in the redirect fragment.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::DiscordConfig;
use crate::error::AppError;

/// Scope requested at authorization; enough to read `/users/@me`
pub const IDENTIFY_SCOPE: &str = "identify";

// =============================================================================
// Profile
// =============================================================================

/// Discord user as returned by `GET /users/@me`
///
/// Only `id`, `username`, `avatar` and `discriminator` are required. The
/// remaining fields pass through untouched when Discord sends them and are
/// omitted from the cache when it does not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    /// Avatar hash; `null` for accounts using a default avatar
    pub avatar: Option<String>,
    pub discriminator: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_flags: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_decoration_data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfa_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium_type: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

impl DiscordUser {
    /// Name to show in the header badge
    pub fn display_name(&self) -> &str {
        self.global_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.username)
    }

    /// Avatar image URL, or the default avatar when the user has none
    ///
    /// The page additionally swaps in the default image if this URL fails
    /// to load.
    pub fn avatar_url(&self, cdn_base_url: &str) -> String {
        let cdn = cdn_base_url.trim_end_matches('/');
        match self.avatar.as_deref().filter(|hash| !hash.is_empty()) {
            Some(hash) => format!("{cdn}/avatars/{}/{hash}.png", self.id),
            None => default_avatar_url(cdn),
        }
    }
}

/// Fallback avatar image
pub fn default_avatar_url(cdn_base_url: &str) -> String {
    format!("{}/embed/avatars/0.png", cdn_base_url.trim_end_matches('/'))
}

// =============================================================================
// Access Token
// =============================================================================

/// Bearer token from a redirect fragment
///
/// Never serialized, and redacted in debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token for the `Authorization` header
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

// =============================================================================
// Authorization URL
// =============================================================================

/// Build the implicit-grant authorization URL
///
/// # Arguments
/// * `config` - Discord client configuration
/// * `redirect_uri` - Page origin the token is sent back to
///
/// # Returns
/// `{authorize_url}?client_id=..&redirect_uri=..&response_type=token&scope=identify`
pub fn authorize_url(config: &DiscordConfig, redirect_uri: &str) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=token&scope={}",
        config.authorize_url,
        urlencoding::encode(&config.client_id),
        urlencoding::encode(redirect_uri),
        IDENTIFY_SCOPE
    )
}

// =============================================================================
// Profile Fetch
// =============================================================================

/// Source of the signed-in user's profile
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Fetch the profile belonging to `token`
    ///
    /// # Errors
    /// Network failure, non-success status, or an unparseable body
    async fn fetch_profile(&self, token: &AccessToken) -> Result<DiscordUser, AppError>;
}

/// Discord REST client for `/users/@me`
pub struct DiscordClient {
    http_client: reqwest::Client,
    api_base_url: String,
}

impl DiscordClient {
    /// Create new Discord client
    ///
    /// # Arguments
    /// * `http_client` - Shared HTTP client
    /// * `api_base_url` - API root, e.g. "https://discord.com/api"
    pub fn new(http_client: reqwest::Client, api_base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn profile_url(&self) -> String {
        format!("{}/users/@me", self.api_base_url)
    }
}

#[async_trait]
impl ProfileSource for DiscordClient {
    async fn fetch_profile(&self, token: &AccessToken) -> Result<DiscordUser, AppError> {
        let response = self
            .http_client
            .get(self.profile_url())
            .bearer_auth(token.secret())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Identity(format!(
                "GET /users/@me returned {status}"
            )));
        }

        let user = response.json::<DiscordUser>().await?;
        tracing::debug!(user_id = %user.id, "Fetched Discord profile");
        Ok(user)
    }
}
