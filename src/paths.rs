use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the log file path: `<exe_dir>/logs/ocr_song_queue.log`
pub fn get_log_file() -> PathBuf {
    get_logs_dir().join("ocr_song_queue.log")
}

/// Returns the config file path: `<exe_dir>/config.json`
pub fn get_config_file() -> PathBuf {
    get_exe_dir().join("config.json")
}

/// Returns the Spotify token cache path: `<exe_dir>/.spotify_token.json`
pub fn get_token_cache_file() -> PathBuf {
    get_exe_dir().join(".spotify_token.json")
}

/// Returns the local tesseract directory: `<data_local_dir>/ocr-song-queue/tesseract/`
pub fn get_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ocr-song-queue")
        .join("tesseract")
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    Ok(())
}
