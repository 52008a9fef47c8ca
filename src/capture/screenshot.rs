//! Screenshot capture through `adb shell screencap`.

use anyhow::{Context, Result};
use image::DynamicImage;
use std::ffi::OsStr;
use std::path::Path;
use tempfile::NamedTempFile;

use super::ScreenSource;
use crate::adb::AdbBridge;
use crate::error::BotError;

/// Where the device writes the screenshot before it is pulled.
pub const DEVICE_SCREENSHOT_PATH: &str = "/sdcard/screen.png";

/// Captures the device screen with `screencap -p` and pulls it to the host.
pub struct AdbScreenCapture<'a> {
    bridge: &'a AdbBridge,
}

impl<'a> AdbScreenCapture<'a> {
    pub fn new(bridge: &'a AdbBridge) -> Self {
        Self { bridge }
    }

    /// Captures into `dest` on the host.
    pub fn capture_to(&self, dest: &Path) -> Result<()> {
        self.bridge
            .run(["shell", "screencap", "-p", DEVICE_SCREENSHOT_PATH])
            .context("screencap failed")?;
        self.bridge
            .run([
                OsStr::new("pull"),
                OsStr::new(DEVICE_SCREENSHOT_PATH),
                dest.as_os_str(),
            ])
            .context("pull failed")?;
        Ok(())
    }

    fn capture(&self) -> Result<DynamicImage> {
        // Deleted when `file` drops, after the image is decoded
        let file = NamedTempFile::with_suffix(".png")?;
        self.capture_to(file.path())?;
        let image = image::open(file.path()).context("Failed to decode screenshot")?;
        Ok(image)
    }
}

impl ScreenSource for AdbScreenCapture<'_> {
    fn capture_screen(&self) -> crate::error::Result<DynamicImage> {
        self.capture()
            .map_err(|e| BotError::Capture(format!("{:#}", e)))
    }
}
