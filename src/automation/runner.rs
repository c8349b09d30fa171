//! Poll loop - the main driver of the song queue.
//!
//! Each tick captures the region, reads a song title, queues it on the music
//! service when it changed, refreshes the overlay and posts a status message.
//! Ticks repeat on a fixed interval until a stop is requested.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::automation::config::{AppConfig, MessageTemplates};
use crate::automation::message::{render, resolve_status_message};
use crate::automation::services::{
    MusicQueueClient, OverlayWindow, ScreenCapturer, StatusNotifier, TextExtractor,
};
use crate::automation::state::{DetectedSong, LoopState, SessionState};
use crate::capture::CaptureRegion;

/// Granularity of the interruptible sleep between ticks.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Loop settings that do not change while running.
#[derive(Clone, Debug)]
pub struct LoopSettings {
    pub templates: MessageTemplates,
    pub message_file: PathBuf,
    pub clear_message_file: bool,
    pub poll_interval: Duration,
}

impl LoopSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            templates: config.messages.clone(),
            message_file: PathBuf::from(&config.message_file),
            clear_message_file: config.clear_message_file,
            poll_interval: config.poll_interval(),
        }
    }
}

/// The capture → OCR → queue → notify loop and everything it owns.
pub struct PollLoop<C, T, M, N, O> {
    state: LoopState,
    session: SessionState,
    region: CaptureRegion,
    settings: LoopSettings,
    capturer: C,
    extractor: T,
    music: M,
    notifier: N,
    overlay: O,
}

impl<C, T, M, N, O> PollLoop<C, T, M, N, O>
where
    C: ScreenCapturer,
    T: TextExtractor,
    M: MusicQueueClient,
    N: StatusNotifier,
    O: OverlayWindow,
{
    pub fn new(
        region: CaptureRegion,
        settings: LoopSettings,
        capturer: C,
        extractor: T,
        music: M,
        notifier: N,
        overlay: O,
    ) -> Self {
        Self {
            state: LoopState::Running,
            session: SessionState::default(),
            region,
            settings,
            capturer,
            extractor,
            music,
            notifier,
            overlay,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    #[cfg(test)]
    pub fn music(&self) -> &M {
        &self.music
    }

    #[cfg(test)]
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    #[cfg(test)]
    pub fn overlay(&self) -> &O {
        &self.overlay
    }

    /// Runs ticks until `stop` is set or a tick fails.
    ///
    /// On a stop request the farewell message is sent. The overlay is
    /// destroyed on every exit path. Fatal errors are returned after cleanup.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<()> {
        crate::log(&format!(
            "Poll loop started: region {}, interval {}ms",
            self.region,
            self.settings.poll_interval.as_millis()
        ));
        self.state = LoopState::Running;

        let result = self.run_ticks(stop);
        self.state = LoopState::Stopped;

        match &result {
            Ok(()) => {
                crate::log("Program interrupted.");
                let farewell = self.settings.templates.farewell.clone();
                self.notify(&farewell);
            }
            Err(e) => {
                crate::log(&format!("Poll loop failed: {:#}", e));
            }
        }

        self.overlay.destroy();
        crate::log(&format!("Poll loop {}", self.state));
        result
    }

    fn run_ticks(&mut self, stop: &AtomicBool) -> Result<()> {
        while !stop.load(Ordering::SeqCst) {
            self.tick()?;
            sleep_unless_stopped(self.settings.poll_interval, stop);
        }
        Ok(())
    }

    /// Performs one capture/queue/notify cycle. Only music service failures are returned.
    pub fn tick(&mut self) -> Result<()> {
        if let Some(song) = self.detect_song() {
            if self.session.is_new(&song) {
                self.process_song(song)?;
            }
        }

        if let Err(e) = self.overlay.refresh() {
            crate::log(&format!("Overlay refresh failed: {:#}", e));
        }

        let message = resolve_status_message(
            &self.settings.templates,
            &self.settings.message_file,
            self.settings.clear_message_file,
            self.session.previous_song_info.as_deref(),
        );
        self.notify(&message);

        Ok(())
    }

    /// Captures the region and reads it. Failures count as "nothing detected".
    fn detect_song(&mut self) -> Option<DetectedSong> {
        let image = match self.capturer.capture(&self.region) {
            Ok(image) => image,
            Err(e) => {
                crate::log(&format!("Capture failed: {:#}", e));
                return None;
            }
        };

        match self.extractor.extract_text(&image) {
            Ok(text) => DetectedSong::from_text(&text),
            Err(e) => {
                crate::log(&format!("OCR failed: {:#}", e));
                None
            }
        }
    }

    fn process_song(&mut self, song: DetectedSong) -> Result<()> {
        crate::log(&format!("Song name detected: {}", song.raw_text));
        let result = self.music.search(&song.raw_text)?;

        match &result.song_id {
            Some(song_id) => {
                if self.music.is_queued(song_id)? {
                    crate::log(&format!("{} is already in queue!", result.display_info));
                    let text = render(&self.settings.templates.already_queued, &result.display_info);
                    self.notify(&text);
                } else {
                    crate::log(&format!("Adding {} to queue...", result.display_info));
                    self.music.enqueue(song_id)?;
                    crate::log(&format!("{} added to queue!", result.display_info));
                    let text = render(&self.settings.templates.song_added, &result.display_info);
                    self.notify(&text);
                }
            }
            None => {
                crate::log(&format!("No track found for \"{}\"", song.raw_text));
            }
        }

        self.session.record(song, &result);
        Ok(())
    }

    fn notify(&mut self, text: &str) {
        if let Err(e) = self.notifier.send(text) {
            crate::log(&format!("Failed to send chatbox message: {:#}", e));
        }
    }
}

/// Sleeps for `interval`, returning early once `stop` is set.
fn sleep_unless_stopped(interval: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + interval;
    loop {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        std::thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}
