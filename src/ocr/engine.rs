use anyhow::{anyhow, Result};
use image::GrayImage;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::TesseractPaths;

/// Represents a line of OCR text with confidence score
#[derive(Debug, Clone)]
pub struct OcrLine {
    pub text: String,
    pub words: Vec<OcrWord>,
    pub confidence: f32,
}

/// Represents a single word from OCR with confidence score
#[derive(Debug, Clone)]
pub struct OcrWord {
    pub text: String,
    pub confidence: f32,
}

/// Runs Tesseract on a preprocessed grayscale image.
/// Returns structured output with lines and confidence scores.
pub fn recognize_image(
    img: &GrayImage,
    tesseract: &TesseractPaths,
    language: &str,
) -> Result<Vec<OcrLine>> {
    // Save image to temporary file
    let temp_input = NamedTempFile::with_suffix(".png")?;
    img.save(temp_input.path())?;

    // Run Tesseract with TSV output on stdout
    let output = Command::new(&tesseract.executable)
        .arg(temp_input.path())
        .arg("stdout")
        .arg("--tessdata-dir")
        .arg(&tesseract.tessdata)
        .arg("-l")
        .arg(language)
        .arg("--psm")
        .arg("6") // Assume single uniform block of text
        .arg("tsv")
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("Tesseract failed: {}", stderr.trim()));
    }

    Ok(parse_tsv_output(&String::from_utf8_lossy(&output.stdout)))
}

/// Parses Tesseract TSV output into structured OcrLine data.
///
/// Words are grouped by (block, paragraph, line) so lines from different
/// chat bubbles never merge.
pub fn parse_tsv_output(tsv: &str) -> Vec<OcrLine> {
    let mut lines: Vec<OcrLine> = Vec::new();
    let mut current_key: Option<(i32, i32, i32)> = None;
    let mut current_words: Vec<OcrWord> = Vec::new();

    for row in tsv.lines().skip(1) {
        // TSV fields: level, page_num, block_num, par_num, line_num, word_num,
        //             left, top, width, height, conf, text
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        // Level 5 = word
        let level: i32 = fields[0].parse().unwrap_or(-1);
        if level != 5 {
            continue;
        }

        let key = (
            fields[2].parse().unwrap_or(-1),
            fields[3].parse().unwrap_or(-1),
            fields[4].parse().unwrap_or(-1),
        );
        let conf: f32 = fields[10].parse().unwrap_or(-1.0);
        let text = fields[11].trim();

        if text.is_empty() || conf < 0.0 {
            continue;
        }

        if current_key.is_some_and(|k| k != key) {
            push_line(&mut lines, std::mem::take(&mut current_words));
        }
        current_key = Some(key);

        current_words.push(OcrWord {
            text: text.to_string(),
            confidence: conf,
        });
    }

    push_line(&mut lines, current_words);
    lines
}

fn push_line(lines: &mut Vec<OcrLine>, words: Vec<OcrWord>) {
    if words.is_empty() {
        return;
    }
    let confidence = words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32;
    let text = words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    lines.push(OcrLine {
        text,
        words,
        confidence,
    });
}
