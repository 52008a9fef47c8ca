//! Screen capture from the connected device.
//!
//! This module provides:
//! - The `ScreenSource` seam the control loop captures through
//! - An adb `screencap` implementation (`AdbScreenCapture`)

pub mod screenshot;

use image::DynamicImage;

use crate::error::Result;

pub use screenshot::AdbScreenCapture;

/// Anything that can produce a full-resolution screenshot of the device.
pub trait ScreenSource {
    fn capture_screen(&self) -> Result<DynamicImage>;
}
