pub mod engine;
pub mod extract;
pub mod preprocess;
pub mod setup;

pub use engine::recognize_image;
pub use extract::extract_song_title;
pub use preprocess::prepare_for_ocr;
pub use setup::{ensure_tesseract, TesseractPaths};

use anyhow::Result;
use image::RgbaImage;

use crate::automation::config::OcrConfig;
use crate::automation::services::TextExtractor;

/// Song title reader backed by the Tesseract CLI.
pub struct TesseractExtractor {
    paths: TesseractPaths,
    config: OcrConfig,
}

impl TesseractExtractor {
    pub fn new(paths: TesseractPaths, config: OcrConfig) -> Self {
        Self { paths, config }
    }
}

impl TextExtractor for TesseractExtractor {
    /// High-level function: screenshot → song title.
    ///
    /// Upscales and thresholds the capture, runs Tesseract, then picks the
    /// text after the trigger prefix.
    fn extract_text(&mut self, image: &RgbaImage) -> Result<String> {
        let prepared = prepare_for_ocr(image, self.config.threshold, self.config.scale);
        let lines = recognize_image(&prepared, &self.paths, &self.config.language)?;

        for line in &lines {
            crate::log(&format!(
                "OCR line ({:.0}%): {}",
                line.confidence, line.text
            ));
        }

        extract_song_title(
            &lines,
            self.config.trigger_prefix.as_deref(),
            self.config.min_confidence,
        )
    }
}
