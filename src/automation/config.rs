//! Configuration types for automation.
//!
//! Loads settings from config.json at startup, writing the defaults to disk
//! when no file exists yet. Provides OCR regions, the drawing area, symbol
//! size and timing parameters.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::automation::gesture::{Point, StrokeSettings};
use crate::error::BotError;
use crate::logging::Logger;

/// A rectangle in device pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// X position of the top-left corner
    pub x: u32,
    /// Y position of the top-left corner
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Geometric center of the rectangle.
    pub fn center(&self) -> Point {
        Point::new(
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// True if the region is non-empty and lies inside a `width` x `height` screen.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}

/// Unscaled symbol size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymbolSize {
    pub width: f64,
    pub height: f64,
}

/// How large to draw symbols.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrawSettings {
    pub base_symbol_size: SymbolSize,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
}

impl DrawSettings {
    /// Full symbol width and height after scaling.
    pub fn scaled_size(&self) -> (f64, f64) {
        (
            self.base_symbol_size.width * self.scale_factor,
            self.base_symbol_size.height * self.scale_factor,
        )
    }
}

impl Default for DrawSettings {
    fn default() -> Self {
        Self {
            base_symbol_size: SymbolSize {
                width: 100.0,
                height: 100.0,
            },
            scale_factor: default_scale_factor(),
        }
    }
}

/// Complete bot configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BotConfig {
    pub screen_width: u32,
    pub screen_height: u32,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    /// Named regions holding the two digits, read in name order
    pub ocr_region: BTreeMap<String, Region>,
    /// Area in which the answer symbol is drawn
    pub input_region: Region,
    #[serde(default = "default_adb_address")]
    pub adb_address: String,
    #[serde(default)]
    pub draw_settings: DrawSettings,
    /// Maximum jitter (pixels) added to each stroke endpoint per axis
    #[serde(default = "default_max_offset")]
    pub max_offset: i32,
    #[serde(default = "default_stroke_duration_ms")]
    pub stroke_duration_ms: u64,
    /// Delay between loop iterations (milliseconds)
    #[serde(default = "default_cycle_delay_ms")]
    pub cycle_delay_ms: u64,
    /// Consecutive recognition/parse failures before the loop halts
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_contrast_factor")]
    pub contrast_factor: f32,
    /// Upper bound on concurrent region recognitions
    #[serde(default = "default_ocr_workers")]
    pub ocr_workers: usize,
    /// Timeout for each adb / tesseract invocation (milliseconds)
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

fn default_scale_factor() -> f64 {
    1.0
}

fn default_dpi() -> u32 {
    320
}

fn default_adb_address() -> String {
    "127.0.0.1:16384".to_string()
}

fn default_max_offset() -> i32 {
    5
}

fn default_stroke_duration_ms() -> u64 {
    100
}

fn default_cycle_delay_ms() -> u64 {
    1000
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_contrast_factor() -> f32 {
    2.0
}

fn default_ocr_workers() -> usize {
    2
}

fn default_command_timeout_ms() -> u64 {
    10_000
}

impl Default for BotConfig {
    fn default() -> Self {
        // 900x1600 @ 320dpi: digits in the upper half, drawing pad below
        let mut ocr_region = BTreeMap::new();
        ocr_region.insert("digit1".to_string(), Region::new(258, 410, 140, 102));
        ocr_region.insert("digit2".to_string(), Region::new(516, 410, 110, 102));

        Self {
            screen_width: 900,
            screen_height: 1600,
            dpi: default_dpi(),
            ocr_region,
            input_region: Region::new(250, 1000, 400, 300),
            adb_address: default_adb_address(),
            draw_settings: DrawSettings {
                scale_factor: 1.5,
                ..DrawSettings::default()
            },
            max_offset: default_max_offset(),
            stroke_duration_ms: default_stroke_duration_ms(),
            cycle_delay_ms: default_cycle_delay_ms(),
            failure_threshold: default_failure_threshold(),
            contrast_factor: default_contrast_factor(),
            ocr_workers: default_ocr_workers(),
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

impl BotConfig {
    /// Checks region bounds and numeric settings.
    pub fn validate(&self) -> crate::error::Result<()> {
        for (name, region) in &self.ocr_region {
            if !region.fits_within(self.screen_width, self.screen_height) {
                return Err(BotError::Config(format!(
                    "OCR region '{}' {:?} is empty or outside the {}x{} screen",
                    name,
                    region,
                    self.screen_width,
                    self.screen_height
                )));
            }
        }
        if !self
            .input_region
            .fits_within(self.screen_width, self.screen_height)
        {
            return Err(BotError::Config(format!(
                "input_region {:?} is empty or outside the {}x{} screen",
                self.input_region,
                self.screen_width,
                self.screen_height
            )));
        }
        if !(self.draw_settings.scale_factor > 0.0) {
            return Err(BotError::Config(format!(
                "draw_settings.scale_factor must be positive, got {}",
                self.draw_settings.scale_factor
            )));
        }
        if self.max_offset < 0 {
            return Err(BotError::Config("max_offset must not be negative".to_string()));
        }
        if self.failure_threshold == 0 {
            return Err(BotError::Config("failure_threshold must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn stroke_settings(&self) -> StrokeSettings {
        StrokeSettings {
            max_offset: self.max_offset,
            duration_ms: self.stroke_duration_ms,
        }
    }

    pub fn cycle_delay(&self) -> Duration {
        Duration::from_millis(self.cycle_delay_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

/// Loads configuration from `path`, creating it with defaults if missing.
///
/// Unlike a missing file, an unreadable or invalid file is an error: running
/// against wrong regions would only burn through the failure threshold.
pub fn load_or_create_config(path: &Path, log: &dyn Logger) -> Result<BotConfig> {
    log.debug(
        "Config",
        &format!("Looking for config at: {}", path.display()),
    );

    let config = if path.exists() {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: BotConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        log.info("Config", &format!("Config loaded from {}", path.display()));
        config
    } else {
        let config = BotConfig::default();
        write_config(path, &config)?;
        log.info(
            "Config",
            &format!("No config found, wrote defaults to {}", path.display()),
        );
        config
    };

    config.validate()?;
    Ok(config)
}

/// Writes `config` as pretty JSON, creating parent directories.
pub fn write_config(path: &Path, config: &BotConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
