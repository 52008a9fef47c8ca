use anyhow::{anyhow, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::logging::Logger;
use crate::process::run_with_timeout;

const SCOPE: &str = "TesseractSetup";
const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    /// `None` lets Tesseract use its built-in data directory
    pub tessdata: Option<PathBuf>,
}

/// Returns the directory for downloaded trained data.
pub fn get_tessdata_dir() -> PathBuf {
    crate::paths::get_data_dir().join("tessdata")
}

/// Ensures Tesseract and English trained data are usable.
/// Downloads `eng.traineddata` if nothing provides it.
pub fn ensure_tesseract(log: &dyn Logger) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable()?;
    log.info(SCOPE, &format!("Using Tesseract: {}", executable.display()));

    if let Some(tessdata) = find_tessdata_dir() {
        log.info(SCOPE, &format!("Using tessdata: {}", tessdata.display()));
        return Ok(TesseractPaths {
            executable,
            tessdata: Some(tessdata),
        });
    }

    if system_has_eng(&executable) {
        log.debug(SCOPE, "Tesseract ships eng data, using its default tessdata");
        return Ok(TesseractPaths {
            executable,
            tessdata: None,
        });
    }

    log.info(SCOPE, "eng.traineddata not found locally, downloading...");
    let tessdata = get_tessdata_dir();
    fs::create_dir_all(&tessdata)?;
    download_tessdata(&tessdata, log)?;

    Ok(TesseractPaths {
        executable,
        tessdata: Some(tessdata),
    })
}

/// Downloads English trained data into `tessdata_dir`.
fn download_tessdata(tessdata_dir: &Path, log: &dyn Logger) -> Result<()> {
    let eng_url = format!("{}/eng.traineddata", TESSDATA_REPO);
    let eng_path = tessdata_dir.join("eng.traineddata");

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&eng_url)
        .header("User-Agent", "adb-compare-bot")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download eng.traineddata: HTTP {}",
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    let mut file = fs::File::create(&eng_path)?;
    file.write_all(&bytes)?;

    log.info(
        SCOPE,
        &format!("Downloaded eng.traineddata ({} bytes)", bytes.len()),
    );

    Ok(())
}

/// Finds the Tesseract executable: `TESSERACT_PATH`, then `PATH`, then
/// common install locations.
pub fn find_tesseract_executable() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("TESSERACT_PATH") {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
    }

    // Check PATH
    if let Ok(output) = run_with_timeout(Command::new("tesseract").arg("--version"), PROBE_TIMEOUT)
    {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    let common_paths = [
        r"C:\Program Files\Tesseract-OCR\tesseract.exe",
        r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
        "/opt/homebrew/bin/tesseract",
        "/usr/local/bin/tesseract",
        "/usr/bin/tesseract",
    ];

    for path in &common_paths {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!(
        "Tesseract not found. Install Tesseract-OCR and add it to PATH, \
         or point TESSERACT_PATH at the executable."
    ))
}

/// Finds a tessdata directory containing `eng.traineddata`.
pub fn find_tessdata_dir() -> Option<PathBuf> {
    // Check TESSDATA_PREFIX environment variable
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let p = PathBuf::from(&prefix);
        if p.join("eng.traineddata").exists() {
            return Some(p);
        }
        let p = p.join("tessdata");
        if p.join("eng.traineddata").exists() {
            return Some(p);
        }
    }

    let local = get_tessdata_dir();
    if local.join("eng.traineddata").exists() {
        return Some(local);
    }

    None
}

/// True if `tesseract --list-langs` reports English.
fn system_has_eng(executable: &Path) -> bool {
    run_with_timeout(Command::new(executable).arg("--list-langs"), PROBE_TIMEOUT)
        .map(|output| {
            // Older releases print the list on stderr
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            lists_eng(&stdout) || lists_eng(&stderr)
        })
        .unwrap_or(false)
}

fn lists_eng(listing: &str) -> bool {
    listing.lines().any(|line| line.trim() == "eng")
}
