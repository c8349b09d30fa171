//! Poll loop state: the RUNNING/STOPPED machine, the stop flag and the
//! per-session deduplication record.

use std::sync::atomic::{AtomicBool, Ordering};

/// Global stop flag - set by the Ctrl+C handler.
pub static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Poll loop states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Ticking on the poll interval
    Running,
    /// Interrupted or failed; terminal
    Stopped,
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopState::Running => write!(f, "Running"),
            LoopState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Text read from the capture region in one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedSong {
    pub raw_text: String,
}

impl DetectedSong {
    /// Returns `None` for empty or whitespace-only text.
    pub fn from_text(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self {
                raw_text: trimmed.to_string(),
            })
        }
    }
}

/// Outcome of a music service search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueResult {
    /// Track id, `None` when nothing matched
    pub song_id: Option<String>,
    /// Human readable "title by artist", empty when nothing matched
    pub display_info: String,
}

impl QueueResult {
    pub fn not_found() -> Self {
        Self {
            song_id: None,
            display_info: String::new(),
        }
    }
}

/// What the loop remembers between ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub previous_song_name: Option<String>,
    pub previous_song_info: Option<String>,
}

impl SessionState {
    /// True if `song` differs from the last processed detection.
    pub fn is_new(&self, song: &DetectedSong) -> bool {
        self.previous_song_name.as_deref() != Some(song.raw_text.as_str())
    }

    /// Records a detection once its lookup has been attempted, whether or not it matched.
    pub fn record(&mut self, song: DetectedSong, result: &QueueResult) {
        self.previous_song_name = Some(song.raw_text);
        self.previous_song_info = if result.display_info.is_empty() {
            None
        } else {
            Some(result.display_info.clone())
        };
    }
}

/// Resets the stop flag. Call before starting the loop.
pub fn reset_stop_flag() {
    STOP_REQUESTED.store(false, Ordering::SeqCst);
}

/// Requests the poll loop to stop after the current tick.
pub fn request_stop() {
    STOP_REQUESTED.store(true, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(format!("{}", LoopState::Running), "Running");
        assert_eq!(format!("{}", LoopState::Stopped), "Stopped");
    }

    #[test]
    fn test_detected_song_ignores_blank_text() {
        assert!(DetectedSong::from_text("").is_none());
        assert!(DetectedSong::from_text("  \n\t ").is_none());
        assert_eq!(
            DetectedSong::from_text("  Bohemian Rhapsody \n").unwrap().raw_text,
            "Bohemian Rhapsody"
        );
    }

    #[test]
    fn test_session_dedup() {
        let mut session = SessionState::default();
        let song = DetectedSong::from_text("Bohemian Rhapsody").unwrap();
        assert!(session.is_new(&song));

        let result = QueueResult {
            song_id: Some("id".to_string()),
            display_info: "Bohemian Rhapsody by Queen".to_string(),
        };
        session.record(song.clone(), &result);

        assert!(!session.is_new(&song));
        assert_eq!(
            session.previous_song_info.as_deref(),
            Some("Bohemian Rhapsody by Queen")
        );
        assert!(session.is_new(&DetectedSong::from_text("Under Pressure").unwrap()));
    }

    #[test]
    fn test_failed_lookup_still_advances_name() {
        let mut session = SessionState {
            previous_song_name: Some("Old".to_string()),
            previous_song_info: Some("Old by Someone".to_string()),
        };
        session.record(
            DetectedSong::from_text("asdfgh").unwrap(),
            &QueueResult::not_found(),
        );

        assert_eq!(session.previous_song_name.as_deref(), Some("asdfgh"));
        assert_eq!(session.previous_song_info, None);
    }
}
