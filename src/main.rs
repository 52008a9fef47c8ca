//! ADB Compare Bot
//!
//! Plays a number comparison game on an Android device: captures the screen
//! over adb, reads two numbers with Tesseract and draws `>`, `<` or `=` as
//! human-looking swipes.

mod adb;
mod automation;
mod capture;
mod cli;
mod error;
mod logging;
mod ocr;
mod paths;
mod process;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::Path;

use automation::gesture::path_for_token;
use automation::{AbortSignal, BotConfig, HaltReason};
use capture::{AdbScreenCapture, ScreenSource};
use cli::{Cli, Commands};
use logging::{FileLogger, Level, Logger};
use ocr::{ExtractSettings, TesseractRecognizer};

const SCOPE: &str = "Main";

fn main() -> Result<()> {
    // Set up panic hook to log panics
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        eprintln!("{}", log_msg);
        if let Ok(mut file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(paths::get_log_file())
        {
            use std::io::Write;
            let _ = file.write_all(log_msg.as_bytes());
        }
    }));

    let cli = Cli::parse();

    paths::ensure_directories()?;
    let console_level = if cli.verbose { Level::Debug } else { Level::Info };
    let log = FileLogger::new(paths::get_log_file(), console_level);
    log.debug(SCOPE, &format!("Logging to {}", log.path().display()));

    let config_path = cli.config.clone().unwrap_or_else(paths::get_config_path);

    match cli.subcommand() {
        Commands::InitConfig { force } => init_config(&config_path, force, &log),
        command => {
            let mut config = automation::load_or_create_config(&config_path, &log)?;
            if let Some(address) = cli.adb_address {
                config.adb_address = address;
            }
            match command {
                Commands::TestOcr => test_ocr(&config, &log),
                Commands::Draw { symbol } => draw_once(&config, &symbol, &log),
                _ => run(&config, &log),
            }
        }
    }
}

/// Runs the bot until Ctrl+C or the failure threshold.
fn run(config: &BotConfig, log: &dyn Logger) -> Result<()> {
    let abort = AbortSignal::new();
    let handler_abort = abort.clone();
    ctrlc::set_handler(move || handler_abort.request())
        .context("Failed to install Ctrl+C handler")?;

    match automation::run_bot(config, log, abort)? {
        HaltReason::Interrupted => {
            log.info(SCOPE, "Stopped by user");
            Ok(())
        }
        reason @ HaltReason::FailureThreshold { .. } => {
            Err(anyhow!("Bot halted: {}", reason))
        }
    }
}

/// Captures one screenshot and prints the operands and the chosen symbol.
fn test_ocr(config: &BotConfig, log: &dyn Logger) -> Result<()> {
    let bridge = automation::connect_device(config, log)?;
    let tesseract = ocr::ensure_tesseract(log)?;
    let recognizer = TesseractRecognizer::new(tesseract, config.command_timeout());

    let image = AdbScreenCapture::new(&bridge).capture_screen()?;
    log.info(
        SCOPE,
        &format!("Captured {}x{} screenshot", image.width(), image.height()),
    );

    let settings = ExtractSettings {
        contrast_factor: config.contrast_factor,
        workers: config.ocr_workers,
    };
    let raw = ocr::extract_digits(&image, &config.ocr_region, &recognizer, &settings, log)?;
    let (a, b) = automation::parse_operands(&raw.fragments())?;
    println!("{} {} {}", a, automation::decide(&a, &b), b);
    Ok(())
}

/// Draws a single symbol on the input region.
fn draw_once(config: &BotConfig, symbol: &str, log: &dyn Logger) -> Result<()> {
    let path = path_for_token(symbol, &config.input_region, &config.draw_settings)?;
    let bridge = automation::connect_device(config, log)?;
    let dispatcher = automation::AdbInput::new(&bridge);

    let strokes = automation::draw(
        &path,
        &dispatcher,
        &mut rand::rng(),
        &config.stroke_settings(),
        &AbortSignal::new(),
    )?;
    log.info(
        SCOPE,
        &format!(
            "Drew '{}' with {}/{} strokes",
            symbol.trim(),
            strokes,
            path.stroke_count()
        ),
    );
    Ok(())
}

/// Writes the default config, refusing to overwrite unless `force` is set.
fn init_config(path: &Path, force: bool, log: &dyn Logger) -> Result<()> {
    if path.exists() && !force {
        return Err(anyhow!(
            "{} already exists, pass --force to overwrite",
            path.display()
        ));
    }
    automation::write_config(path, &BotConfig::default())?;
    log.info(SCOPE, &format!("Wrote default config to {}", path.display()));
    Ok(())
}
