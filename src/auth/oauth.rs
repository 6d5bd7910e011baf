//! Discord OAuth flow
//!
//! Implements the OAuth 2.0 implicit grant with Discord. The token comes
//! back in the URL fragment, which browsers never send to the server; the
//! page forwards it to the callback route as a query string.

use axum::{
    Router,
    extract::{RawQuery, State},
    response::{IntoResponse, Redirect},
    routing::{get, post},
};

use super::session::LoginOutcome;
use crate::AppState;

/// Create authentication router
///
/// Routes:
/// - GET /auth/discord - Redirect to Discord
/// - GET /auth/discord/callback - Redirect callback (fragment forwarded as query)
/// - POST /logout - Logout
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/discord", get(discord_redirect))
        .route("/auth/discord/callback", get(discord_callback))
        .route("/logout", post(logout))
}

/// GET /auth/discord
///
/// Redirects the browser to Discord's authorization page.
async fn discord_redirect(State(state): State<AppState>) -> impl IntoResponse {
    Redirect::to(&state.session.begin_login())
}

/// GET /auth/discord/callback
///
/// # Steps
/// 1. Extract `access_token` from the forwarded fragment
/// 2. Fetch the Discord profile with it (at most once)
/// 3. Redirect to `/` so the token does not linger in the address bar
///
/// Failures are absorbed by the session manager; the user simply lands on
/// the page signed out.
async fn discord_callback(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let outcome = state
        .session
        .complete_login_from_redirect(query.as_deref().unwrap_or_default())
        .await;

    if let LoginOutcome::Failed = outcome {
        tracing::debug!("Redirect login did not complete");
    }

    Redirect::to("/")
}

/// POST /logout
///
/// Clears the session and its cached copy, then returns to the page.
async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    state.session.logout().await;
    Redirect::to("/")
}
