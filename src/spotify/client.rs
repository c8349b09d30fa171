use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_LENGTH;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Duration;

use super::auth::{self, CachedToken};
use super::types::{QueueResponse, SearchResponse};
use crate::automation::config::SpotifyConfig;
use crate::automation::services::MusicQueueClient;
use crate::automation::state::QueueResult;
use crate::paths;

const API_BASE: &str = "https://api.spotify.com/v1";

/// Authenticated Spotify Web API session.
pub struct SpotifyClient {
    http: Client,
    config: SpotifyConfig,
    token: CachedToken,
    cache_path: PathBuf,
}

impl SpotifyClient {
    /// Loads or obtains a user token. Opens the browser when no usable
    /// cached token exists.
    pub fn authenticate(config: &SpotifyConfig) -> Result<Self> {
        if config.client_id.is_empty() || config.client_secret.is_empty() {
            bail!(
                "Spotify client_id/client_secret are not set. Fill in config.json or set \
                 SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET"
            );
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        let cache_path = paths::get_token_cache_file();
        let token = auth::obtain_token(&http, config, &cache_path)?;

        Ok(Self {
            http,
            config: config.clone(),
            token,
            cache_path,
        })
    }

    /// Current access token, refreshed first if it is about to expire.
    fn access_token(&mut self) -> Result<String> {
        if self.token.is_expired(chrono::Utc::now().timestamp()) {
            let refresh_token = self
                .token
                .refresh_token
                .clone()
                .ok_or_else(|| anyhow!("Spotify token expired and no refresh token is cached"))?;
            self.token = auth::refresh(&self.http, &self.config, &refresh_token)?;
            auth::save_cached_token(&self.cache_path, &self.token)?;
            crate::log("Refreshed Spotify access token");
        }
        Ok(self.token.access_token.clone())
    }

    fn get_json<T: DeserializeOwned>(&mut self, path: &str, query: &[(&str, &str)], what: &str) -> Result<T> {
        let token = self.access_token()?;
        let resp = self
            .http
            .get(format!("{}{}", API_BASE, path))
            .bearer_auth(token)
            .query(query)
            .send()
            .with_context(|| format!("Spotify {} request failed", what))?;

        ensure_success(resp, what)?
            .json::<T>()
            .with_context(|| format!("Failed to parse Spotify {} response", what))
    }
}

/// Turns a non-2xx response into an error carrying status and body.
fn ensure_success(resp: Response, what: &str) -> Result<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().unwrap_or_default();
    Err(anyhow!("Spotify {} failed: HTTP {}: {}", what, status, body.trim()))
}

/// Converts a search response into the loop's view of it.
fn to_queue_result(resp: SearchResponse) -> QueueResult {
    resp.tracks
        .and_then(|paging| paging.items.into_iter().next())
        .and_then(|track| {
            let display_info = track.display_info();
            track.id.map(|id| QueueResult {
                song_id: Some(id),
                display_info,
            })
        })
        .unwrap_or_else(QueueResult::not_found)
}

fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{}", track_id)
}

impl MusicQueueClient for SpotifyClient {
    fn search(&mut self, text: &str) -> Result<QueueResult> {
        let resp: SearchResponse = self.get_json(
            "/search",
            &[("q", text), ("type", "track"), ("limit", "1")],
            "search",
        )?;
        let result = to_queue_result(resp);
        if result.song_id.is_none() {
            crate::log(&format!("No Spotify match for '{}'", text));
        }
        Ok(result)
    }

    fn is_queued(&mut self, track_id: &str) -> Result<bool> {
        let queue: QueueResponse = self.get_json("/me/player/queue", &[], "queue lookup")?;
        Ok(queue.contains(track_id))
    }

    fn enqueue(&mut self, track_id: &str) -> Result<()> {
        let token = self.access_token()?;
        let uri = track_uri(track_id);
        let resp = self
            .http
            .post(format!("{}/me/player/queue", API_BASE))
            .bearer_auth(token)
            .query(&[("uri", uri.as_str())])
            .header(CONTENT_LENGTH, "0")
            .send()
            .context("Spotify add-to-queue request failed")?;

        ensure_success(resp, "add-to-queue")?;
        crate::log(&format!("Queued {}", uri));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_queue_result_match() {
        let resp: SearchResponse = serde_json::from_str(
            r#"{ "tracks": { "items": [{
                "id": "4u7EnebtmKWzUH433cf5Qv",
                "name": "Bohemian Rhapsody",
                "artists": [{ "name": "Queen" }]
            }] } }"#,
        )
        .unwrap();

        let result = to_queue_result(resp);
        assert_eq!(result.song_id.as_deref(), Some("4u7EnebtmKWzUH433cf5Qv"));
        assert_eq!(result.display_info, "Bohemian Rhapsody by Queen");
    }

    #[test]
    fn test_to_queue_result_no_match() {
        let empty: SearchResponse = serde_json::from_str(r#"{ "tracks": { "items": [] } }"#).unwrap();
        assert_eq!(to_queue_result(empty), QueueResult::not_found());

        let missing: SearchResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(to_queue_result(missing), QueueResult::not_found());

        let no_id: SearchResponse = serde_json::from_str(
            r#"{ "tracks": { "items": [{ "id": null, "name": "local.mp3", "artists": [] }] } }"#,
        )
        .unwrap();
        assert_eq!(to_queue_result(no_id), QueueResult::not_found());
    }

    #[test]
    fn test_track_uri() {
        assert_eq!(track_uri("abc123"), "spotify:track:abc123");
    }
}
