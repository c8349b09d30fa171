use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::log;
use crate::paths::get_tesseract_dir;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

#[cfg(windows)]
const TESSERACT_EXE: &str = "tesseract.exe";
#[cfg(not(windows))]
const TESSERACT_EXE: &str = "tesseract";

/// Default install locations of the UB-Mannheim Windows build.
const COMMON_INSTALL_DIRS: [&str; 2] = [
    r"C:\Program Files\Tesseract-OCR",
    r"C:\Program Files (x86)\Tesseract-OCR",
];

/// Resolved Tesseract executable and tessdata directory.
#[derive(Clone, Debug)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Ensures Tesseract and the language data are available.
///
/// The executable must already be installed (local dir, PATH or default install
/// location). Missing `<language>.traineddata` is downloaded into the local dir.
pub fn ensure_tesseract(language: &str) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable()?;
    log(&format!("Tesseract executable: {}", executable.display()));

    let tessdata = match find_tessdata_dir(language) {
        Ok(dir) => dir,
        Err(_) => {
            log(&format!(
                "{}.traineddata not found locally, downloading...",
                language
            ));
            let local = get_tesseract_dir().join("tessdata");
            fs::create_dir_all(&local)
                .with_context(|| format!("Failed to create {}", local.display()))?;
            download_tessdata(&local, language)?;
            local
        }
    };
    log(&format!("Tesseract data: {}", tessdata.display()));

    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Finds the Tesseract executable, checking our local dir first, then PATH,
/// then the default install locations.
pub fn find_tesseract_executable() -> Result<PathBuf> {
    let local_exe = get_tesseract_dir().join(TESSERACT_EXE);
    if local_exe.exists() {
        return Ok(local_exe);
    }

    if let Ok(output) = Command::new("tesseract").arg("--version").output() {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    for dir in &COMMON_INSTALL_DIRS {
        let p = Path::new(dir).join(TESSERACT_EXE);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!(
        "Tesseract not found. Please install Tesseract-OCR:\n\
         1. Download from: https://github.com/UB-Mannheim/tesseract/releases\n\
         2. Run the installer (choose to add to PATH)\n\
         3. Or copy {} and its DLLs to: {}",
        TESSERACT_EXE,
        get_tesseract_dir().display()
    ))
}

/// Finds a tessdata directory containing `<language>.traineddata`.
pub fn find_tessdata_dir(language: &str) -> Result<PathBuf> {
    let file_name = traineddata_name(language);

    let mut candidates = vec![get_tesseract_dir().join("tessdata")];
    candidates.extend(
        COMMON_INSTALL_DIRS
            .iter()
            .map(|dir| Path::new(dir).join("tessdata")),
    );
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }

    candidates
        .into_iter()
        .find(|dir| dir.join(&file_name).exists())
        .ok_or_else(|| anyhow!("tessdata directory with {} not found", file_name))
}

fn traineddata_name(language: &str) -> String {
    format!("{}.traineddata", language)
}

/// Downloads `<language>.traineddata` from the tessdata repository.
fn download_tessdata(tessdata_dir: &Path, language: &str) -> Result<()> {
    let file_name = traineddata_name(language);
    let url = format!("{}/{}", TESSDATA_REPO, file_name);
    let path = tessdata_dir.join(&file_name);

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "ocr-song-queue")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}: HTTP {}",
            file_name,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    fs::write(&path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;

    log(&format!("Downloaded {} ({} bytes)", file_name, bytes.len()));

    Ok(())
}
