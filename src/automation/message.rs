//! Chatbox message selection: the message file side channel and templates.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::automation::config::MessageTemplates;

/// Replaces `{song}` in a template.
pub fn render(template: &str, song: &str) -> String {
    template.replace("{song}", song)
}

/// Reads the trimmed contents of the message file.
///
/// Bytes that are not UTF-8 (files saved in a legacy code page) are replaced
/// rather than rejected, and a leading byte order mark is dropped.
/// Returns `None` if the file is missing, unreadable or blank. When `clear`
/// is set, a non-empty file is truncated after reading.
pub fn read_custom_message(path: &Path, clear: bool) -> Option<String> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            crate::log(&format!(
                "Failed to read message file {}: {}",
                path.display(),
                e
            ));
            return None;
        }
    };

    let contents = String::from_utf8_lossy(&bytes);
    let message = contents.trim_start_matches('\u{feff}').trim();
    if message.is_empty() {
        return None;
    }

    if clear {
        if let Err(e) = fs::write(path, "") {
            crate::log(&format!(
                "Failed to clear message file {}: {}",
                path.display(),
                e
            ));
        }
    }

    Some(message.to_string())
}

/// Picks the outbound status text: the message file if it has content,
/// otherwise the status template with the last added track.
pub fn resolve_status_message(
    templates: &MessageTemplates,
    message_file: &Path,
    clear_message_file: bool,
    last_added: Option<&str>,
) -> String {
    match read_custom_message(message_file, clear_message_file) {
        Some(message) => message,
        None => render(
            &templates.status,
            last_added.unwrap_or(&templates.nothing_added),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_render() {
        assert_eq!(render("{song} added to queue!", "Song by A"), "Song by A added to queue!");
        assert_eq!(render("no placeholder", "x"), "no placeholder");
    }

    #[test]
    fn test_message_file_overrides_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("message.txt");
        fs::write(&path, "  hello \n").unwrap();

        let templates = MessageTemplates::default();
        let message = resolve_status_message(&templates, &path, false, Some("X by Y"));
        assert_eq!(message, "hello");
        // Not cleared by default
        assert_eq!(fs::read_to_string(&path).unwrap(), "  hello \n");
    }

    #[test]
    fn test_missing_file_uses_template() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("message.txt");

        let templates = MessageTemplates::default();
        let message = resolve_status_message(&templates, &path, false, Some("X by Y"));
        assert_eq!(
            message,
            "Please help me test this. Type @@ <song name> in front of me. Last Added: X by Y"
        );

        let message = resolve_status_message(&templates, &path, false, None);
        assert!(message.ends_with("Last Added: None"));
    }

    #[test]
    fn test_blank_file_uses_template() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("message.txt");
        fs::write(&path, " \n\n ").unwrap();

        assert_eq!(read_custom_message(&path, false), None);
    }

    #[test]
    fn test_non_utf8_file_still_overrides_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("message.txt");
        fs::write(&path, b"brb caf\xe9\r\n").unwrap();

        let templates = MessageTemplates::default();
        let message = resolve_status_message(&templates, &path, false, None);
        assert_eq!(message, "brb caf\u{fffd}");
    }

    #[test]
    fn test_byte_order_mark_is_stripped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("message.txt");
        fs::write(&path, "\u{feff}hello\n").unwrap();

        assert_eq!(read_custom_message(&path, false).as_deref(), Some("hello"));

        fs::write(&path, "\u{feff}  ").unwrap();
        assert_eq!(read_custom_message(&path, false), None);
    }

    #[test]
    fn test_clear_after_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("message.txt");
        fs::write(&path, "brb").unwrap();

        assert_eq!(read_custom_message(&path, true).as_deref(), Some("brb"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
        assert_eq!(read_custom_message(&path, true), None);
    }
}
