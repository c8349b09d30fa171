use anyhow::Result;
use regex::Regex;

use super::engine::{OcrLine, OcrWord};

/// Leading noise: anything before the first letter, digit or opening bracket.
const LEADING_NOISE: &str = r"^[^\p{L}\p{N}(\[]+";

/// Trailing noise: bubble borders and separators OCR picks up after the title.
const TRAILING_NOISE: &str = r#"[\s|_~=:;,"'`\-]+$"#;

/// Picks the song title out of recognized lines.
///
/// With a trigger prefix, only words after the prefix on the first line
/// containing it count. Without one, every confident word counts. Words
/// under `min_confidence` are dropped; the prefix itself is matched
/// regardless of confidence since Tesseract scores symbols low.
///
/// Returns an empty string when nothing usable is found.
pub fn extract_song_title(
    lines: &[OcrLine],
    trigger_prefix: Option<&str>,
    min_confidence: f32,
) -> Result<String> {
    let words: Vec<String> = match trigger_prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => lines
            .iter()
            .find_map(|line| words_after_prefix(&line.words, prefix, min_confidence))
            .unwrap_or_default(),
        None => lines
            .iter()
            .flat_map(|line| line.words.iter())
            .filter(|w| w.confidence >= min_confidence)
            .map(|w| w.text.clone())
            .collect(),
    };

    clean_title(&words.join(" "))
}

/// Returns the confident words following `prefix`, or `None` if the line lacks it.
fn words_after_prefix(words: &[OcrWord], prefix: &str, min_confidence: f32) -> Option<Vec<String>> {
    let (index, start) = words
        .iter()
        .enumerate()
        .find_map(|(i, w)| w.text.find(prefix).map(|pos| (i, pos + prefix.len())))?;

    let mut out = Vec::new();
    let glued = &words[index].text[start..];
    if !glued.is_empty() {
        out.push(glued.to_string());
    }
    out.extend(
        words[index + 1..]
            .iter()
            .filter(|w| w.confidence >= min_confidence)
            .map(|w| w.text.clone()),
    );
    Some(out)
}

/// Collapses whitespace and strips border noise around a title.
pub fn clean_title(text: &str) -> Result<String> {
    let leading = Regex::new(LEADING_NOISE)?;
    let trailing = Regex::new(TRAILING_NOISE)?;

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let without_leading = leading.replace(&collapsed, "");
    Ok(trailing.replace(&without_leading, "").into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(words: &[(&str, f32)]) -> OcrLine {
        let words: Vec<OcrWord> = words
            .iter()
            .map(|(t, c)| OcrWord {
                text: t.to_string(),
                confidence: *c,
            })
            .collect();
        OcrLine {
            text: words
                .iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            confidence: 0.0,
            words,
        }
    }

    #[test]
    fn test_prefix_selects_following_words() {
        let lines = vec![
            line(&[("Hi", 90.0), ("there", 90.0)]),
            line(&[("@@", 20.0), ("Bohemian", 88.0), ("Rhapsody", 85.0)]),
        ];
        assert_eq!(
            extract_song_title(&lines, Some("@@"), 40.0).unwrap(),
            "Bohemian Rhapsody"
        );
    }

    #[test]
    fn test_prefix_glued_to_first_word() {
        let lines = vec![line(&[("@@Africa", 70.0), ("Toto", 80.0)])];
        assert_eq!(extract_song_title(&lines, Some("@@"), 40.0).unwrap(), "Africa Toto");
    }

    #[test]
    fn test_missing_prefix_yields_empty() {
        let lines = vec![line(&[("Bohemian", 88.0), ("Rhapsody", 85.0)])];
        assert_eq!(extract_song_title(&lines, Some("@@"), 40.0).unwrap(), "");
    }

    #[test]
    fn test_no_prefix_uses_all_confident_words() {
        let lines = vec![
            line(&[("Mr.", 80.0), ("Brightside", 75.0)]),
            line(&[("~~", 10.0)]),
        ];
        assert_eq!(extract_song_title(&lines, None, 40.0).unwrap(), "Mr. Brightside");
        assert_eq!(extract_song_title(&lines, Some(""), 40.0).unwrap(), "Mr. Brightside");
    }

    #[test]
    fn test_low_confidence_words_dropped() {
        let lines = vec![line(&[("@@", 90.0), ("Take", 80.0), ("xq", 12.0), ("On", 81.0), ("Me", 77.0)])];
        assert_eq!(extract_song_title(&lines, Some("@@"), 40.0).unwrap(), "Take On Me");
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("  | Help!  ~ ").unwrap(), "Help!");
        assert_eq!(clean_title("\"Dancing   Queen\" |").unwrap(), "Dancing Queen");
        assert_eq!(clean_title("(I Can't Get No) Satisfaction").unwrap(), "(I Can't Get No) Satisfaction");
        assert_eq!(clean_title("___").unwrap(), "");
        assert_eq!(clean_title("").unwrap(), "");
    }
}
