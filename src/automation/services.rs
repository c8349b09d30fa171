//! Collaborator interfaces driven by the poll loop.
//!
//! Each trait has one production implementation elsewhere in the crate
//! (GDI capture, Tesseract, Spotify, OSC, Win32 overlay) and small fakes in
//! the runner tests.

use anyhow::Result;
use image::RgbaImage;

use crate::automation::state::QueueResult;
use crate::capture::CaptureRegion;

/// Grabs the pixels of a screen rectangle.
pub trait ScreenCapturer {
    fn capture(&mut self, region: &CaptureRegion) -> Result<RgbaImage>;
}

/// Turns a captured image into song title text. Returns an empty string when
/// nothing usable was recognized.
pub trait TextExtractor {
    fn extract_text(&mut self, image: &RgbaImage) -> Result<String>;
}

/// Remote music service holding an authenticated session.
pub trait MusicQueueClient {
    /// Resolves free text to the best matching track.
    fn search(&mut self, text: &str) -> Result<QueueResult>;
    /// Returns true if the track is playing or waiting in the queue.
    fn is_queued(&mut self, track_id: &str) -> Result<bool>;
    fn enqueue(&mut self, track_id: &str) -> Result<()>;
}

/// Fire-and-forget text notifications to the game client.
pub trait StatusNotifier {
    fn send(&mut self, text: &str) -> Result<()>;
}

/// On-screen indicator of the capture region.
pub trait OverlayWindow {
    /// Repaints and processes pending window events.
    fn refresh(&mut self) -> Result<()>;
    /// Releases the window. Calling it again is a no-op.
    fn destroy(&mut self);
}
