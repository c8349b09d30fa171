//! Configuration types for the song queue loop.
//!
//! Loads settings from config.json at startup. Provides Spotify credentials,
//! the OSC endpoint, capture region fractions, OCR tuning and message templates.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Spotify application credentials and OAuth settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    /// Client ID from the Spotify developer dashboard
    pub client_id: String,
    /// Client secret from the Spotify developer dashboard
    pub client_secret: String,
    /// Redirect URI registered for the app (must be a loopback address)
    pub redirect_uri: String,
    /// Timeout for every Web API request (seconds)
    pub request_timeout_secs: u64,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "http://127.0.0.1:8888/callback".to_string(),
            request_timeout_secs: 15,
        }
    }
}

impl SpotifyConfig {
    /// Applies `SPOTIFY_CLIENT_ID` / `SPOTIFY_CLIENT_SECRET` from the environment when set.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var("SPOTIFY_CLIENT_ID").ok(),
            std::env::var("SPOTIFY_CLIENT_SECRET").ok(),
        )
    }

    /// Replaces credentials with the given values, ignoring blank ones.
    fn with_overrides(mut self, client_id: Option<String>, client_secret: Option<String>) -> Self {
        if let Some(id) = client_id.filter(|v| !v.trim().is_empty()) {
            self.client_id = id.trim().to_string();
        }
        if let Some(secret) = client_secret.filter(|v| !v.trim().is_empty()) {
            self.client_secret = secret.trim().to_string();
        }
        self
    }
}

/// Where chatbox messages are sent.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OscConfig {
    pub host: String,
    pub port: u16,
    /// OSC address of the chatbox input endpoint
    pub address: String,
}

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9000,
            address: "/chatbox/input".to_string(),
        }
    }
}

/// Capture region expressed as fractions of the primary screen.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Top edge as a fraction of screen height (0.0 = top, 1.0 = bottom)
    pub vertical_offset: f64,
    /// Region height as a fraction of screen height
    pub height_scale: f64,
    /// Region width as a fraction of screen width (region is centered horizontally)
    pub width_scale: f64,
    /// Overlay border thickness in pixels
    pub border_width: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            vertical_offset: 0.3,
            height_scale: 0.5,
            width_scale: 0.7,
            border_width: 3,
        }
    }
}

/// OCR tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract language code
    pub language: String,
    /// Brightness threshold (pixels with R, G, B all > threshold are kept as text)
    pub threshold: u8,
    /// Integer upscale factor applied before OCR (1 = none)
    pub scale: u32,
    /// Words below this Tesseract confidence are ignored
    pub min_confidence: f32,
    /// Text must follow this marker on a line to count as a song title.
    /// `null` in config.json means the whole recognized text is used.
    pub trigger_prefix: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            threshold: 190,
            scale: 2,
            min_confidence: 40.0,
            trigger_prefix: Some("@@".to_string()),
        }
    }
}

/// Chatbox message templates. `{song}` is replaced by the track display info.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageTemplates {
    pub song_added: String,
    pub already_queued: String,
    pub status: String,
    pub farewell: String,
    /// Substituted into `status` while nothing has been added yet
    pub nothing_added: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            song_added: "{song} added to queue!".to_string(),
            already_queued: "{song} is already in queue!".to_string(),
            status: "Please help me test this. Type @@ <song name> in front of me. Last Added: {song}"
                .to_string(),
            farewell: "I killed the program with my bare hands, be back in a sec".to_string(),
            nothing_added: "None".to_string(),
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub spotify: SpotifyConfig,
    pub osc: OscConfig,
    pub capture: CaptureConfig,
    pub ocr: OcrConfig,
    pub messages: MessageTemplates,
    /// Pause between poll ticks (milliseconds)
    pub poll_interval_ms: u64,
    /// Side-channel file whose trimmed contents override the status message
    pub message_file: String,
    /// Truncate the message file after a non-empty read
    pub clear_message_file: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            spotify: SpotifyConfig::default(),
            osc: OscConfig::default(),
            capture: CaptureConfig::default(),
            ocr: OcrConfig::default(),
            messages: MessageTemplates::default(),
            poll_interval_ms: 2500,
            message_file: "message.txt".to_string(),
            clear_message_file: false,
        }
    }
}

impl AppConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Loads configuration from the given path, falling back to defaults.
pub fn load_config_from(config_path: &Path) -> AppConfig {
    crate::log(&format!("Looking for config at: {}", config_path.display()));

    if config_path.exists() {
        match fs::read_to_string(config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    crate::log("Config loaded from config.json");
                    return config;
                }
                Err(e) => {
                    crate::log(&format!(
                        "Failed to parse config.json: {}. Using defaults.",
                        e
                    ));
                }
            },
            Err(e) => {
                crate::log(&format!(
                    "Failed to read config.json: {}. Using defaults.",
                    e
                ));
            }
        }
    } else {
        crate::log("config.json not found. Using default config.");
    }

    AppConfig::default()
}

/// Initializes the global configuration from config.json next to the executable.
/// Call once at startup.
pub fn init_config() {
    let mut config = load_config_from(&crate::paths::get_config_file());
    config.spotify = config.spotify.with_env_overrides();
    let _ = CONFIG.set(config);
}

/// Returns a reference to the global configuration.
/// Falls back to defaults if called before init_config().
pub fn get_config() -> &'static AppConfig {
    CONFIG.get_or_init(AppConfig::default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_chatbox_loop() {
        let config = AppConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(2500));
        assert_eq!(config.capture.vertical_offset, 0.3);
        assert_eq!(config.capture.height_scale, 0.5);
        assert_eq!(config.capture.width_scale, 0.7);
        assert_eq!(config.capture.border_width, 3);
        assert_eq!(config.osc.port, 9000);
        assert_eq!(config.message_file, "message.txt");
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "spotify": {{ "client_id": "abc" }}, "osc": {{ "port": 9100 }}, "poll_interval_ms": 1000 }}"#
        )
        .unwrap();

        let config = load_config_from(file.path());
        assert_eq!(config.spotify.client_id, "abc");
        assert_eq!(config.spotify.redirect_uri, "http://127.0.0.1:8888/callback");
        assert_eq!(config.osc.port, 9100);
        assert_eq!(config.osc.host, "127.0.0.1");
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.ocr.trigger_prefix.as_deref(), Some("@@"));
    }

    #[test]
    fn test_null_trigger_prefix_disables_marker() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "ocr": {{ "trigger_prefix": null }} }}"#).unwrap();

        let config = load_config_from(file.path());
        assert!(config.ocr.trigger_prefix.is_none());
        assert_eq!(config.ocr.language, "eng");
    }

    #[test]
    fn test_invalid_json_falls_back_to_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let config = load_config_from(file.path());
        assert_eq!(config.poll_interval_ms, 2500);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.json"));
        assert_eq!(config.osc.address, "/chatbox/input");
    }

    #[test]
    fn test_credential_overrides_ignore_blank_values() {
        let base = SpotifyConfig {
            client_id: "from-file".to_string(),
            client_secret: "secret-file".to_string(),
            ..Default::default()
        };

        let overridden = base
            .clone()
            .with_overrides(Some(" from-env ".to_string()), Some("  ".to_string()));
        assert_eq!(overridden.client_id, "from-env");
        assert_eq!(overridden.client_secret, "secret-file");

        let untouched = base.with_overrides(None, None);
        assert_eq!(untouched.client_id, "from-file");
    }
}
