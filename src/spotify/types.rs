//! Spotify Web API response shapes (only the fields this tool reads).

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub tracks: Option<Paging<Track>>,
}

#[derive(Debug, Deserialize)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    /// `null` for local files
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artist {
    pub name: String,
}

impl Track {
    /// "Title by Artist, Artist"
    pub fn display_info(&self) -> String {
        if self.artists.is_empty() {
            return self.name.clone();
        }
        let artists = self
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} by {}", self.name, artists)
    }
}

/// `GET /me/player/queue`. Items may be tracks or episodes; only ids are needed.
#[derive(Debug, Deserialize)]
pub struct QueueResponse {
    pub currently_playing: Option<QueueItem>,
    #[serde(default)]
    pub queue: Vec<QueueItem>,
}

#[derive(Debug, Deserialize)]
pub struct QueueItem {
    pub id: Option<String>,
}

impl QueueResponse {
    /// True if the track is playing now or waiting in the queue.
    pub fn contains(&self, track_id: &str) -> bool {
        self.currently_playing
            .iter()
            .chain(self.queue.iter())
            .any(|item| item.id.as_deref() == Some(track_id))
    }
}
