//! Screen capture for the song title region.
//!
//! This module provides:
//! - Capture rectangle geometry (`calculate_bounding_box`)
//! - Primary screen size (`screen_dimensions`)
//! - Region capture (`GdiScreenCapturer`)

pub mod region;
pub mod screen;

pub use region::{calculate_bounding_box, CaptureRegion};
pub use screen::{enable_dpi_awareness, screen_dimensions, GdiScreenCapturer};
