//! Android Debug Bridge plumbing.
//!
//! This module provides:
//! - adb discovery and platform-tools download (`ensure_adb`)
//! - A device-bound command runner (`AdbBridge`)

pub mod bridge;
pub mod setup;

pub use bridge::AdbBridge;
pub use setup::ensure_adb;
