//! Redirect fragment parsing
//!
//! An implicit-grant redirect lands as `#access_token=...&token_type=Bearer&...`.
//! The fragment is read like a query string.

/// Key carrying the bearer token in an implicit-grant redirect
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Extract the bearer token from a redirect fragment.
///
/// Accepts the fragment with or without its leading `#`. Returns `None`
/// when the key is missing or empty; with repeated keys the first wins.
pub fn access_token_from_fragment(fragment: &str) -> Option<String> {
    let raw = fragment.strip_prefix('#').unwrap_or(fragment);

    url::form_urlencoded::parse(raw.as_bytes())
        .find(|(key, _)| key == ACCESS_TOKEN_KEY)
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
}
