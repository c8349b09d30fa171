//! OCR Song Queue
//!
//! Watches a region of the screen for chat text like `@@ song name`, looks
//! the song up on Spotify, adds it to the playback queue and reports back
//! through the VRChat chatbox over OSC.
//!
//! Runs until Ctrl+C.

mod automation;
mod capture;
mod ocr;
mod osc;
mod overlay;
mod paths;
mod spotify;

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;

use automation::{get_config, init_config, LoopSettings, PollLoop, STOP_REQUESTED};
use capture::{calculate_bounding_box, GdiScreenCapturer};
use ocr::TesseractExtractor;
use osc::OscNotifier;
use overlay::BorderOverlay;
use spotify::SpotifyClient;

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(paths::get_log_file())
    {
        let _ = file.write_all(line.as_bytes());
    }
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();

        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        eprint!("{}", log_msg);
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(paths::get_log_file())
        {
            let _ = file.write_all(log_msg.as_bytes());
        }
    }));
}

fn main() -> Result<()> {
    install_panic_hook();

    paths::ensure_directories().context("Failed to create logs directory")?;
    log("=== OCR Song Queue starting ===");

    init_config();
    let config = get_config();

    capture::enable_dpi_awareness();

    let tesseract = ocr::ensure_tesseract(&config.ocr.language)
        .context("Tesseract is required for text recognition")?;
    log(&format!("Tesseract: {}", tesseract.executable.display()));

    let music = SpotifyClient::authenticate(&config.spotify)?;
    let notifier = OscNotifier::connect(&config.osc)?;

    let (screen_width, screen_height) = capture::screen_dimensions()?;
    let region = calculate_bounding_box(
        screen_width,
        screen_height,
        config.capture.vertical_offset,
        config.capture.height_scale,
        config.capture.width_scale,
    )?;
    log(&format!(
        "Screen {}x{}, capture region {}",
        screen_width, screen_height, region
    ));

    let overlay = BorderOverlay::create(&region, config.capture.border_width)?;

    automation::reset_stop_flag();
    ctrlc::set_handler(automation::request_stop).context("Failed to install Ctrl+C handler")?;

    let mut poll_loop = PollLoop::new(
        region,
        LoopSettings::from_config(config),
        GdiScreenCapturer,
        TesseractExtractor::new(tesseract, config.ocr.clone()),
        music,
        notifier,
        overlay,
    );

    log("Watching for song requests. Press Ctrl+C to stop.");
    poll_loop.run(&STOP_REQUESTED)?;

    log(&format!(
        "Loop {}. Last added: {}",
        poll_loop.state(),
        poll_loop
            .session()
            .previous_song_info
            .as_deref()
            .unwrap_or(&config.messages.nothing_added)
    ));
    Ok(())
}
