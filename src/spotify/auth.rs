use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use url::Url;

use super::types::TokenResponse;
use crate::automation::config::SpotifyConfig;

const AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Reading the queue needs playback-state; adding to it needs modify-playback-state.
pub const SCOPES: &str = "user-read-playback-state user-modify-playback-state";

/// Tokens are treated as expired this many seconds early.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Token persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix seconds
    pub expires_at: i64,
}

impl CachedToken {
    /// Builds a cache entry from a token response. Spotify may omit the
    /// refresh token on refresh, in which case the previous one is kept.
    pub fn from_response(resp: TokenResponse, previous_refresh: Option<String>, now: i64) -> Self {
        Self {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token.or(previous_refresh),
            expires_at: now + resp.expires_in as i64,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now + EXPIRY_MARGIN_SECS >= self.expires_at
    }
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn load_cached_token(path: &Path) -> Option<CachedToken> {
    let contents = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(token) => Some(token),
        Err(e) => {
            crate::log(&format!("Ignoring unreadable token cache: {}", e));
            None
        }
    }
}

pub fn save_cached_token(path: &Path, token: &CachedToken) -> Result<()> {
    let json = serde_json::to_string_pretty(token)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Returns a usable token: cached, refreshed, or from a fresh browser authorization.
/// The result is written back to the cache.
pub fn obtain_token(http: &Client, config: &SpotifyConfig, cache_path: &Path) -> Result<CachedToken> {
    let now = now_unix();

    if let Some(cached) = load_cached_token(cache_path) {
        if !cached.is_expired(now) {
            crate::log("Using cached Spotify token");
            return Ok(cached);
        }
        if let Some(refresh_token) = cached.refresh_token.as_deref() {
            match refresh(http, config, refresh_token) {
                Ok(token) => {
                    crate::log("Refreshed cached Spotify token");
                    save_cached_token(cache_path, &token)?;
                    return Ok(token);
                }
                Err(e) => crate::log(&format!("Token refresh failed, re-authorizing: {:#}", e)),
            }
        }
    }

    let token = authorize(http, config)?;
    save_cached_token(cache_path, &token)?;
    Ok(token)
}

/// Run the authorization-code flow.
///
/// 1. Open the browser to the Spotify consent page.
/// 2. Listen on the redirect URI for `?code=...&state=...`.
/// 3. Exchange the code for tokens.
pub fn authorize(http: &Client, config: &SpotifyConfig) -> Result<CachedToken> {
    let state = generate_state();
    let auth_url = build_authorize_url(config, &state)?;
    let redirect = Url::parse(&config.redirect_uri)
        .with_context(|| format!("Invalid redirect_uri: {}", config.redirect_uri))?;

    crate::log("Opening Spotify authorization URL in browser");
    crate::log(&format!("If the browser does not open, visit: {}", auth_url));
    if let Err(e) = open::that(auth_url.as_str()) {
        crate::log(&format!("Failed to open browser: {}", e));
    }

    let code = listen_for_redirect(&redirect, &state)?;
    exchange_code(http, config, &code)
}

/// Trade a refresh token for a new access token.
pub fn refresh(http: &Client, config: &SpotifyConfig, refresh_token: &str) -> Result<CachedToken> {
    let resp = http
        .post(TOKEN_URL)
        .basic_auth(&config.client_id, Some(&config.client_secret))
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .send()?;

    let token = parse_token_response(resp)?;
    Ok(CachedToken::from_response(
        token,
        Some(refresh_token.to_string()),
        now_unix(),
    ))
}

// ── Internals ───────────────────────────────────────────────────

pub fn build_authorize_url(config: &SpotifyConfig, state: &str) -> Result<Url> {
    Url::parse_with_params(
        AUTH_URL,
        &[
            ("response_type", "code"),
            ("client_id", config.client_id.as_str()),
            ("scope", SCOPES),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("state", state),
        ],
    )
    .context("Failed to build authorization URL")
}

/// Generate a random 32-character URL-safe state value.
fn generate_state() -> String {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut out = String::with_capacity(32);
    while out.len() < 32 {
        let mut h = RandomState::new().build_hasher();
        h.write_usize(out.len());
        for byte in h.finish().to_le_bytes() {
            if out.len() < 32 {
                out.push(CHARS[(byte as usize) % CHARS.len()] as char);
            }
        }
    }
    out
}

/// What a single HTTP request to the redirect listener carried.
#[derive(Debug, PartialEq)]
enum RedirectOutcome {
    Code(String),
    /// Not the callback (favicon, preconnect); keep listening
    Ignored,
}

/// Extracts the authorization code from the raw HTTP request the browser sent.
fn parse_redirect_request(request: &str, expected_path: &str, expected_state: &str) -> Result<RedirectOutcome> {
    // "GET /callback?code=...&state=... HTTP/1.1"
    let Some(path) = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
    else {
        return Ok(RedirectOutcome::Ignored);
    };

    let parsed = Url::parse(&format!("http://localhost{}", path))
        .map_err(|e| anyhow!("failed to parse redirect URL: {}", e))?;
    if parsed.path() != expected_path {
        return Ok(RedirectOutcome::Ignored);
    }

    let param = |name: &str| {
        parsed
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.to_string())
    };

    if let Some(error) = param("error") {
        bail!("Spotify authorization was denied: {}", error);
    }
    if param("state").as_deref() != Some(expected_state) {
        bail!("OAuth state mismatch in redirect");
    }
    param("code")
        .map(RedirectOutcome::Code)
        .ok_or_else(|| anyhow!("no 'code' parameter in redirect"))
}

/// Listen on the redirect URI's host and port until the OAuth callback arrives.
fn listen_for_redirect(redirect: &Url, expected_state: &str) -> Result<String> {
    let host = redirect
        .host_str()
        .ok_or_else(|| anyhow!("redirect_uri has no host"))?;
    let port = redirect
        .port_or_known_default()
        .ok_or_else(|| anyhow!("redirect_uri has no port"))?;
    let addr = format!("{}:{}", host, port);

    let listener =
        TcpListener::bind(&addr).with_context(|| format!("failed to bind {}", addr))?;
    crate::log(&format!("Waiting for Spotify OAuth redirect on {}...", addr));

    loop {
        let (mut stream, _) = listener.accept().context("failed to accept connection")?;

        let mut buf = [0u8; 4096];
        let n = stream.read(&mut buf).unwrap_or(0);
        let request = String::from_utf8_lossy(&buf[..n]);

        let outcome = parse_redirect_request(&request, redirect.path(), expected_state);
        let body = match &outcome {
            Ok(RedirectOutcome::Code(_)) => {
                "<h2>Authorization successful!</h2><p>You can close this tab.</p>"
            }
            Ok(RedirectOutcome::Ignored) => "",
            Err(_) => "<h2>Authorization failed.</h2><p>See the log for details.</p>",
        };
        let status = if matches!(outcome, Ok(RedirectOutcome::Ignored)) {
            "404 Not Found"
        } else {
            "200 OK"
        };
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body>{}</body></html>",
            status, body
        );
        let _ = stream.write_all(response.as_bytes());

        match outcome? {
            RedirectOutcome::Code(code) => return Ok(code),
            RedirectOutcome::Ignored => continue,
        }
    }
}

/// Exchange the authorization code for tokens.
fn exchange_code(http: &Client, config: &SpotifyConfig, code: &str) -> Result<CachedToken> {
    let resp = http
        .post(TOKEN_URL)
        .basic_auth(&config.client_id, Some(&config.client_secret))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", config.redirect_uri.as_str()),
        ])
        .send()?;

    let token = parse_token_response(resp)?;
    crate::log("Spotify authorization complete");
    Ok(CachedToken::from_response(token, None, now_unix()))
}

fn parse_token_response(resp: reqwest::blocking::Response) -> Result<TokenResponse> {
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        bail!("Spotify token request failed: HTTP {}: {}", status, body.trim());
    }
    resp.json::<TokenResponse>()
        .context("Failed to parse Spotify token response")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn token_response(refresh: Option<&str>) -> TokenResponse {
        TokenResponse {
            access_token: "access".to_string(),
            expires_in: 3600,
            refresh_token: refresh.map(str::to_string),
        }
    }

    #[test]
    fn test_token_expiry_margin() {
        let token = CachedToken::from_response(token_response(Some("r")), None, 1_000);
        assert_eq!(token.expires_at, 4_600);
        assert!(!token.is_expired(1_000));
        assert!(!token.is_expired(4_539));
        assert!(token.is_expired(4_540));
    }

    #[test]
    fn test_refresh_keeps_previous_refresh_token() {
        let token = CachedToken::from_response(token_response(None), Some("old".to_string()), 0);
        assert_eq!(token.refresh_token.as_deref(), Some("old"));

        let token = CachedToken::from_response(token_response(Some("new")), Some("old".to_string()), 0);
        assert_eq!(token.refresh_token.as_deref(), Some("new"));
    }

    #[test]
    fn test_token_cache_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".spotify_token.json");
        assert_eq!(load_cached_token(&path), None);

        let token = CachedToken {
            access_token: "a".to_string(),
            refresh_token: Some("r".to_string()),
            expires_at: 42,
        };
        save_cached_token(&path, &token).unwrap();
        assert_eq!(load_cached_token(&path), Some(token));

        fs::write(&path, "{ broken").unwrap();
        assert_eq!(load_cached_token(&path), None);
    }

    #[test]
    fn test_authorize_url_params() {
        let config = SpotifyConfig {
            client_id: "my-client".to_string(),
            ..Default::default()
        };
        let url = build_authorize_url(&config, "xyz").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert!(url.as_str().starts_with(AUTH_URL));
        assert!(pairs.contains(&("client_id".to_string(), "my-client".to_string())));
        assert!(pairs.contains(&("scope".to_string(), SCOPES.to_string())));
        assert!(pairs.contains(&("state".to_string(), "xyz".to_string())));
        assert!(pairs.contains(&(
            "redirect_uri".to_string(),
            "http://127.0.0.1:8888/callback".to_string()
        )));
    }

    #[test]
    fn test_generate_state() {
        let state = generate_state();
        assert_eq!(state.len(), 32);
        assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_parse_redirect_with_code() {
        let request = "GET /callback?code=AQD123&state=abc HTTP/1.1\r\nHost: 127.0.0.1:8888\r\n\r\n";
        assert_eq!(
            parse_redirect_request(request, "/callback", "abc").unwrap(),
            RedirectOutcome::Code("AQD123".to_string())
        );
    }

    #[test]
    fn test_parse_redirect_ignores_other_paths() {
        let request = "GET /favicon.ico HTTP/1.1\r\n\r\n";
        assert_eq!(
            parse_redirect_request(request, "/callback", "abc").unwrap(),
            RedirectOutcome::Ignored
        );
        assert_eq!(
            parse_redirect_request("", "/callback", "abc").unwrap(),
            RedirectOutcome::Ignored
        );
    }

    #[test]
    fn test_parse_redirect_rejects_bad_state_and_denial() {
        let request = "GET /callback?code=AQD123&state=evil HTTP/1.1\r\n\r\n";
        assert!(parse_redirect_request(request, "/callback", "abc").is_err());

        let request = "GET /callback?error=access_denied&state=abc HTTP/1.1\r\n\r\n";
        let err = parse_redirect_request(request, "/callback", "abc").unwrap_err();
        assert!(err.to_string().contains("access_denied"));
    }
}
