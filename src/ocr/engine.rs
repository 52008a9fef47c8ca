use anyhow::{anyhow, Result};
use image::RgbImage;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use tempfile::NamedTempFile;

use super::setup::TesseractPaths;
use crate::process::run_checked;

/// Turns an image region into free-form text.
///
/// Shared across the region worker pool, hence `Send + Sync`.
pub trait TextRecognizer: Send + Sync {
    fn recognize_text(&self, image: &RgbImage) -> Result<String>;
}

/// Runs Tesseract as an external process on each region.
pub struct TesseractRecognizer {
    executable: PathBuf,
    tessdata: Option<PathBuf>,
    timeout: Duration,
}

impl TesseractRecognizer {
    pub fn new(paths: TesseractPaths, timeout: Duration) -> Self {
        Self {
            executable: paths.executable,
            tessdata: paths.tessdata,
            timeout,
        }
    }

    /// Arguments after the input image path.
    fn args(&self) -> Vec<String> {
        let mut args = vec!["stdout".to_string()];
        if let Some(tessdata) = &self.tessdata {
            args.push("--tessdata-dir".to_string());
            args.push(tessdata.to_string_lossy().to_string());
        }
        args.extend(
            [
                "-l",
                "eng",
                "--psm",
                "7", // Single text line
                "-c",
                "tessedit_char_whitelist=0123456789",
            ]
            .map(String::from),
        );
        args
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize_text(&self, image: &RgbImage) -> Result<String> {
        if image.width() == 0 || image.height() == 0 {
            return Err(anyhow!("Empty region image"));
        }

        // Save image to temporary file
        let temp_input = NamedTempFile::with_suffix(".png")?;
        image.save(temp_input.path())?;

        let output = run_checked(
            Command::new(&self.executable)
                .arg(temp_input.path())
                .args(self.args()),
            self.timeout,
        )?;

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_without_tessdata() {
        let recognizer = TesseractRecognizer::new(
            TesseractPaths {
                executable: PathBuf::from("tesseract"),
                tessdata: None,
            },
            Duration::from_secs(5),
        );
        let args = recognizer.args();
        assert_eq!(args[0], "stdout");
        assert!(!args.contains(&"--tessdata-dir".to_string()));
        assert!(args.contains(&"tessedit_char_whitelist=0123456789".to_string()));
    }

    #[test]
    fn test_args_with_tessdata() {
        let recognizer = TesseractRecognizer::new(
            TesseractPaths {
                executable: PathBuf::from("tesseract"),
                tessdata: Some(PathBuf::from("/data/tessdata")),
            },
            Duration::from_secs(5),
        );
        let args = recognizer.args();
        let pos = args.iter().position(|a| a == "--tessdata-dir").unwrap();
        assert_eq!(args[pos + 1], "/data/tessdata");
    }

    #[test]
    fn test_empty_image_is_rejected() {
        let recognizer = TesseractRecognizer::new(
            TesseractPaths {
                executable: PathBuf::from("tesseract"),
                tessdata: None,
            },
            Duration::from_secs(5),
        );
        assert!(recognizer.recognize_text(&RgbImage::new(0, 0)).is_err());
    }
}
