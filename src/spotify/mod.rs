//! Spotify Web API access: OAuth token handling, track search and the
//! playback queue.

pub mod auth;
pub mod client;
pub mod types;

pub use client::SpotifyClient;
