//! Session management
//!
//! Owns "the currently authenticated user" for the lifetime of the process.
//! The session is derived either from a freshly completed implicit-grant
//! redirect or from the profile mirrored in the local store on a previous
//! run.
//!
//! Every change to the in-memory session and its stored mirror happens
//! under the same write guard. Profile fetches run outside it.
//!
//! No operation here surfaces an error: a corrupt cache entry, a failed
//! profile fetch or a store I/O error all degrade to the anonymous state
//! and are only logged.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::discord::{AccessToken, DiscordUser, ProfileSource, authorize_url};
use super::fragment::access_token_from_fragment;
use crate::config::DiscordConfig;
use crate::metrics::{LOGIN_ATTEMPTS_TOTAL, SESSION_CACHE_EVENTS_TOTAL, SESSION_TRANSITIONS_TOTAL};
use crate::storage::LocalStore;

/// Where the current session came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    /// Profile fetched with a token from this process's redirect callback
    Redirect,
    /// Profile read back from the local store at startup
    Cache,
}

/// Authenticated session
#[derive(Debug, Clone)]
pub struct Session {
    /// Signed-in Discord user
    pub user: DiscordUser,
    /// Where the profile came from
    pub source: SessionSource,
    /// When this session was established in this process
    pub established_at: DateTime<Utc>,
    /// Token used for the fetch; absent for rehydrated sessions
    access_token: Option<AccessToken>,
}

impl Session {
    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }
}

/// Session state as seen by the view layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

/// Result of handling a redirect callback
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    /// Fragment carried no token; nothing happened
    NoToken,
    /// Profile fetched and cached
    Authenticated(DiscordUser),
    /// Token present but the fetch failed; session left as it was
    Failed,
}

/// Session manager
///
/// One instance per process, shared through `AppState`.
pub struct SessionManager {
    discord: DiscordConfig,
    /// Page origin, used as the OAuth redirect target
    redirect_uri: String,
    store: Arc<dyn LocalStore>,
    cache_key: String,
    profiles: Arc<dyn ProfileSource>,
    current: RwLock<Option<Session>>,
}

impl SessionManager {
    /// Create a session manager in the anonymous state
    ///
    /// Call [`SessionManager::rehydrate`] once before serving requests.
    pub fn new(
        discord: DiscordConfig,
        redirect_uri: impl Into<String>,
        store: Arc<dyn LocalStore>,
        cache_key: impl Into<String>,
        profiles: Arc<dyn ProfileSource>,
    ) -> Self {
        Self {
            discord,
            redirect_uri: redirect_uri.into(),
            store,
            cache_key: cache_key.into(),
            profiles,
            current: RwLock::new(None),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn state(&self) -> SessionState {
        if self.current.read().await.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state().await == SessionState::Authenticated
    }

    pub async fn current_user(&self) -> Option<DiscordUser> {
        self.current.read().await.as_ref().map(|s| s.user.clone())
    }

    pub async fn session(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Authorization URL the browser should be sent to
    ///
    /// Has no local effect.
    pub fn begin_login(&self) -> String {
        authorize_url(&self.discord, &self.redirect_uri)
    }

    /// Finish an implicit-grant login from the redirect fragment
    ///
    /// Without an `access_token` this is a no-op and no request is made.
    /// With one, exactly one profile fetch is issued; on success the
    /// profile becomes the session and is mirrored into the store, on
    /// failure the session is left untouched.
    pub async fn complete_login_from_redirect(&self, fragment: &str) -> LoginOutcome {
        let Some(token) = access_token_from_fragment(fragment).map(AccessToken::new) else {
            tracing::debug!("Redirect carried no access token");
            return LoginOutcome::NoToken;
        };

        let user = match self.profiles.fetch_profile(&token).await {
            Ok(user) => user,
            Err(error) => {
                tracing::warn!(%error, "Discord profile fetch failed; staying signed out");
                LOGIN_ATTEMPTS_TOTAL.with_label_values(&["failed"]).inc();
                return LoginOutcome::Failed;
            }
        };

        // Memory and store change under one guard so they never disagree
        let mut current = self.current.write().await;
        self.write_cache(&user);
        let previous = current.replace(Session {
            user: user.clone(),
            source: SessionSource::Redirect,
            established_at: Utc::now(),
            access_token: Some(token),
        });
        drop(current);

        if previous.is_none() {
            SESSION_TRANSITIONS_TOTAL
                .with_label_values(&["anonymous_to_authenticated"])
                .inc();
        }
        LOGIN_ATTEMPTS_TOTAL.with_label_values(&["succeeded"]).inc();

        tracing::info!(
            user_id = %user.id,
            username = %user.username,
            "Signed in with Discord"
        );
        LoginOutcome::Authenticated(user)
    }

    /// Restore the session mirrored in the local store
    ///
    /// A corrupt entry is deleted and the session cleared. Never fails.
    pub async fn rehydrate(&self) -> SessionState {
        let mut current = self.current.write().await;

        let raw = match self.store.get(&self.cache_key) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(%error, "Could not read cached session");
                SESSION_CACHE_EVENTS_TOTAL
                    .with_label_values(&["read_error"])
                    .inc();
                None
            }
        };

        let Some(raw) = raw else {
            tracing::debug!("No cached session");
            SESSION_CACHE_EVENTS_TOTAL.with_label_values(&["miss"]).inc();
            return if current.is_some() {
                SessionState::Authenticated
            } else {
                SessionState::Anonymous
            };
        };

        match serde_json::from_str::<DiscordUser>(&raw) {
            Ok(user) => {
                tracing::info!(
                    user_id = %user.id,
                    username = %user.username,
                    "Restored cached session"
                );
                SESSION_CACHE_EVENTS_TOTAL.with_label_values(&["hit"]).inc();

                let previous = current.replace(Session {
                    user,
                    source: SessionSource::Cache,
                    established_at: Utc::now(),
                    access_token: None,
                });
                if previous.is_none() {
                    SESSION_TRANSITIONS_TOTAL
                        .with_label_values(&["anonymous_to_authenticated"])
                        .inc();
                }
                SessionState::Authenticated
            }
            Err(error) => {
                tracing::warn!(%error, "Discarding corrupt cached session");
                SESSION_CACHE_EVENTS_TOTAL
                    .with_label_values(&["corrupt"])
                    .inc();
                self.remove_cache();
                Self::clear(&mut current);
                SessionState::Anonymous
            }
        }
    }

    /// Sign out
    ///
    /// Clears the in-memory session and deletes the cached copy. Idempotent.
    pub async fn logout(&self) {
        let mut current = self.current.write().await;
        self.remove_cache();
        if let Some(session) = Self::clear(&mut current) {
            tracing::info!(
                user_id = %session.user.id,
                source = ?session.source,
                had_token = session.access_token().is_some(),
                "Signed out"
            );
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Drop the in-memory session, returning it if one existed
    fn clear(current: &mut Option<Session>) -> Option<Session> {
        let previous = current.take();
        if previous.is_some() {
            SESSION_TRANSITIONS_TOTAL
                .with_label_values(&["authenticated_to_anonymous"])
                .inc();
        }
        previous
    }

    fn write_cache(&self, user: &DiscordUser) {
        let result = serde_json::to_string(user)
            .map_err(crate::error::AppError::from)
            .and_then(|json| self.store.set(&self.cache_key, &json));

        match result {
            Ok(()) => {
                SESSION_CACHE_EVENTS_TOTAL.with_label_values(&["write"]).inc();
            }
            Err(error) => {
                tracing::warn!(%error, "Could not mirror session into local store");
                SESSION_CACHE_EVENTS_TOTAL
                    .with_label_values(&["write_error"])
                    .inc();
            }
        }
    }

    fn remove_cache(&self) {
        match self.store.remove(&self.cache_key) {
            Ok(()) => {
                SESSION_CACHE_EVENTS_TOTAL.with_label_values(&["remove"]).inc();
            }
            Err(error) => {
                tracing::warn!(%error, "Could not remove cached session");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::discord::MockProfileSource;
    use crate::error::AppError;
    use crate::storage::MemoryStore;

    const KEY: &str = "discord_user";

    fn discord_config() -> DiscordConfig {
        DiscordConfig {
            client_id: "1345779547013906452".to_string(),
            authorize_url: "https://discord.com/api/oauth2/authorize".to_string(),
            api_base_url: "https://discord.com/api".to_string(),
            cdn_base_url: "https://cdn.discordapp.com".to_string(),
        }
    }

    fn manager(store: Arc<MemoryStore>, profiles: MockProfileSource) -> SessionManager {
        SessionManager::new(
            discord_config(),
            "http://localhost:8080",
            store,
            KEY,
            Arc::new(profiles),
        )
    }

    fn alice() -> DiscordUser {
        serde_json::from_str(
            r#"{"id":"42","username":"alice","avatar":"ab12","discriminator":"0001"}"#,
        )
        .unwrap()
    }

    fn never_fetches() -> MockProfileSource {
        let mut profiles = MockProfileSource::new();
        profiles.expect_fetch_profile().never();
        profiles
    }

    #[test]
    fn begin_login_points_at_discord() {
        let manager = manager(Arc::new(MemoryStore::new()), never_fetches());
        let url = manager.begin_login();

        assert!(url.starts_with("https://discord.com/api/oauth2/authorize?"));
        assert!(url.contains("client_id=1345779547013906452"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080"));
        assert!(url.contains("response_type=token"));
        assert!(url.contains("scope=identify"));
    }

    #[tokio::test]
    async fn successful_redirect_authenticates_and_caches() {
        let store = Arc::new(MemoryStore::new());
        let mut profiles = MockProfileSource::new();
        profiles
            .expect_fetch_profile()
            .withf(|token| token.secret() == "T")
            .times(1)
            .returning(|_| Ok(alice()));
        let manager = manager(store.clone(), profiles);

        let outcome = manager
            .complete_login_from_redirect("#token_type=Bearer&access_token=T&scope=identify")
            .await;

        assert_eq!(outcome, LoginOutcome::Authenticated(alice()));
        assert_eq!(manager.state().await, SessionState::Authenticated);
        assert_eq!(manager.current_user().await, Some(alice()));

        let session = manager.session().await.unwrap();
        assert_eq!(session.source, SessionSource::Redirect);
        assert_eq!(session.access_token().map(|t| t.secret()), Some("T"));

        assert_eq!(
            store.get(KEY).unwrap().as_deref(),
            Some(r#"{"id":"42","username":"alice","avatar":"ab12","discriminator":"0001"}"#)
        );
    }

    #[tokio::test]
    async fn fragment_without_token_makes_no_request() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(store.clone(), never_fetches());

        let outcome = manager.complete_login_from_redirect("#foo=bar").await;

        assert_eq!(outcome, LoginOutcome::NoToken);
        assert_eq!(manager.state().await, SessionState::Anonymous);
        assert_eq!(store.get(KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn fragment_without_token_keeps_existing_session() {
        let store = Arc::new(MemoryStore::new());
        store.set(KEY, &serde_json::to_string(&alice()).unwrap()).unwrap();
        let manager = manager(store, never_fetches());
        manager.rehydrate().await;

        manager.complete_login_from_redirect("").await;

        assert_eq!(manager.current_user().await, Some(alice()));
    }

    #[tokio::test]
    async fn failed_fetch_stays_anonymous() {
        let store = Arc::new(MemoryStore::new());
        let mut profiles = MockProfileSource::new();
        profiles
            .expect_fetch_profile()
            .times(1)
            .returning(|_| Err(AppError::Identity("GET /users/@me returned 401".to_string())));
        let manager = manager(store.clone(), profiles);

        let outcome = manager.complete_login_from_redirect("access_token=expired").await;

        assert_eq!(outcome, LoginOutcome::Failed);
        assert_eq!(manager.state().await, SessionState::Anonymous);
        assert_eq!(store.get(KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_cached_session_untouched() {
        let store = Arc::new(MemoryStore::new());
        store.set(KEY, &serde_json::to_string(&alice()).unwrap()).unwrap();
        let mut profiles = MockProfileSource::new();
        profiles
            .expect_fetch_profile()
            .times(1)
            .returning(|_| Err(AppError::Identity("503".to_string())));
        let manager = manager(store.clone(), profiles);
        manager.rehydrate().await;

        manager.complete_login_from_redirect("access_token=T").await;

        assert_eq!(manager.current_user().await, Some(alice()));
        assert!(store.get(KEY).unwrap().is_some());
    }

    #[tokio::test]
    async fn rehydrate_restores_cached_profile_without_network() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(KEY, r#"{"id":"1","username":"u","avatar":"a","discriminator":"0"}"#)
            .unwrap();
        let manager = manager(store, never_fetches());

        assert_eq!(manager.rehydrate().await, SessionState::Authenticated);

        let user = manager.current_user().await.unwrap();
        assert_eq!(user.id, "1");
        assert_eq!(user.username, "u");
        assert_eq!(user.avatar.as_deref(), Some("a"));
        assert_eq!(user.discriminator, "0");

        let session = manager.session().await.unwrap();
        assert_eq!(session.source, SessionSource::Cache);
        assert!(session.access_token().is_none());
    }

    #[tokio::test]
    async fn rehydrate_discards_corrupt_entry() {
        let store = Arc::new(MemoryStore::new());
        store.set(KEY, "not json").unwrap();
        let manager = manager(store.clone(), never_fetches());

        assert_eq!(manager.rehydrate().await, SessionState::Anonymous);
        assert_eq!(manager.current_user().await, None);
        assert_eq!(store.get(KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn rehydrate_discards_json_that_is_not_a_profile() {
        let store = Arc::new(MemoryStore::new());
        store.set(KEY, r#"{"id":"1"}"#).unwrap();
        let manager = manager(store.clone(), never_fetches());

        assert_eq!(manager.rehydrate().await, SessionState::Anonymous);
        assert_eq!(store.get(KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn rehydrate_with_empty_store_is_anonymous() {
        let manager = manager(Arc::new(MemoryStore::new()), never_fetches());
        assert_eq!(manager.rehydrate().await, SessionState::Anonymous);
    }

    #[tokio::test]
    async fn logout_clears_memory_and_cache() {
        let store = Arc::new(MemoryStore::new());
        store.set(KEY, &serde_json::to_string(&alice()).unwrap()).unwrap();
        let manager = manager(store.clone(), never_fetches());
        manager.rehydrate().await;

        manager.logout().await;

        assert_eq!(manager.state().await, SessionState::Anonymous);
        assert_eq!(store.get(KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn logout_is_idempotent_when_anonymous() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(store.clone(), never_fetches());

        manager.logout().await;
        manager.logout().await;

        assert_eq!(manager.state().await, SessionState::Anonymous);
        assert_eq!(store.get(KEY).unwrap(), None);
    }

    /// Store whose first `set` parks after writing until released
    struct ParkingStore {
        inner: MemoryStore,
        parked: std::sync::Mutex<Option<std::sync::mpsc::Sender<()>>>,
        release: std::sync::Mutex<std::sync::mpsc::Receiver<()>>,
    }

    impl LocalStore for ParkingStore {
        fn get(&self, key: &str) -> Result<Option<String>, AppError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
            self.inner.set(key, value)?;
            if let Some(parked) = self.parked.lock().unwrap().take() {
                parked.send(()).unwrap();
                self.release.lock().unwrap().recv().unwrap();
            }
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<(), AppError> {
            self.inner.remove(key)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn logout_during_login_cache_write_keeps_memory_and_cache_in_step() {
        let (parked_tx, parked_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let store = Arc::new(ParkingStore {
            inner: MemoryStore::new(),
            parked: std::sync::Mutex::new(Some(parked_tx)),
            release: std::sync::Mutex::new(release_rx),
        });

        let mut profiles = MockProfileSource::new();
        profiles.expect_fetch_profile().returning(|_| Ok(alice()));
        let manager = Arc::new(SessionManager::new(
            discord_config(),
            "http://localhost:8080",
            store.clone(),
            KEY,
            Arc::new(profiles),
        ));

        let login = tokio::spawn({
            let manager = manager.clone();
            async move { manager.complete_login_from_redirect("access_token=T").await }
        });
        parked_rx.recv().unwrap();

        let logout = tokio::spawn({
            let manager = manager.clone();
            async move { manager.logout().await }
        });
        // Give the logout every chance to run ahead of the parked write
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        release_tx.send(()).unwrap();

        login.await.unwrap();
        logout.await.unwrap();

        assert_eq!(manager.state().await, SessionState::Anonymous);
        assert_eq!(store.get(KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn second_login_replaces_cached_profile() {
        let store = Arc::new(MemoryStore::new());
        let mut profiles = MockProfileSource::new();
        profiles
            .expect_fetch_profile()
            .withf(|token| token.secret() == "A")
            .returning(|_| Ok(alice()));
        profiles
            .expect_fetch_profile()
            .withf(|token| token.secret() == "B")
            .returning(|_| {
                Ok(serde_json::from_str(
                    r#"{"id":"7","username":"bob","avatar":null,"discriminator":"0"}"#,
                )
                .unwrap())
            });
        let manager = manager(store.clone(), profiles);

        manager.complete_login_from_redirect("access_token=A").await;
        manager.complete_login_from_redirect("access_token=B").await;

        let user = manager.current_user().await.unwrap();
        assert_eq!(user.username, "bob");
        let cached: DiscordUser = serde_json::from_str(&store.get(KEY).unwrap().unwrap()).unwrap();
        assert_eq!(cached, user);
    }
}
