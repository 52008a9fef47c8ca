//! Bot runner - main entry point for the control loop.
//!
//! Sets up adb and Tesseract, wires the device collaborators into the
//! state machine, and drives it until it halts.

use anyhow::{Context, Result};
use rand::Rng;
use std::thread;
use std::time::{Duration, Instant};

use crate::adb::{ensure_adb, AdbBridge};
use crate::automation::config::BotConfig;
use crate::automation::input::AdbInput;
use crate::automation::state::{
    AbortSignal, ControlLoop, CycleOutcome, Devices, HaltReason, LoopSettings, Step,
};
use crate::capture::AdbScreenCapture;
use crate::logging::Logger;
use crate::ocr::{ensure_tesseract, TesseractRecognizer};

const SCOPE: &str = "Runner";

/// Granularity of the abort check while waiting between cycles.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Sleeps for `duration`, returning early once `abort` is raised.
///
/// Returns false if the wait was cut short.
pub fn interruptible_sleep(duration: Duration, abort: &AbortSignal) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if abort.is_requested() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}

/// Locates adb and connects to the configured device.
pub fn connect_device(config: &BotConfig, log: &dyn Logger) -> Result<AdbBridge> {
    let adb = ensure_adb(&crate::paths::get_adb_dir(), log)?;
    let bridge = AdbBridge::new(adb, config.adb_address.clone(), config.command_timeout());
    bridge.connect(log);
    Ok(bridge)
}

/// Drives `ctl` until it halts, waiting `cycle_delay` after every cycle.
pub fn run_control_loop<R: Rng>(
    ctl: &mut ControlLoop<'_, R>,
    log: &dyn Logger,
) -> crate::error::Result<HaltReason> {
    let delay = ctl.settings().cycle_delay;
    loop {
        match ctl.step()? {
            Step::Continue => log.debug(SCOPE, &format!("-> {}", ctl.state())),
            Step::CycleComplete(outcome) => {
                if let CycleOutcome::Drawn(symbol) = outcome {
                    log.debug(
                        SCOPE,
                        &format!("Cycle {} drew '{}'", ctl.cycles(), symbol),
                    );
                }
                // An abort during the wait is picked up by the next step
                interruptible_sleep(delay, ctl.abort_signal());
            }
            Step::Halted(reason) => return Ok(reason),
        }
    }
}

/// Runs the bot against the configured device until it halts.
pub fn run_bot(config: &BotConfig, log: &dyn Logger, abort: AbortSignal) -> Result<HaltReason> {
    config.validate()?;

    let bridge = connect_device(config, log)?;
    let tesseract = ensure_tesseract(log).context("Tesseract is required for OCR")?;
    let recognizer = TesseractRecognizer::new(tesseract, config.command_timeout());
    let screen = AdbScreenCapture::new(&bridge);
    let dispatcher = AdbInput::new(&bridge);

    log.info(
        SCOPE,
        &format!(
            "Starting bot on {} ({}x{}, {} OCR regions, Ctrl+C to stop)",
            bridge.address(),
            config.screen_width,
            config.screen_height,
            config.ocr_region.len()
        ),
    );

    let mut ctl = ControlLoop::new(
        LoopSettings::from_config(config),
        Devices {
            screen: &screen,
            recognizer: &recognizer,
            dispatcher: &dispatcher,
        },
        rand::rng(),
        log,
        abort,
    );

    let reason = run_control_loop(&mut ctl, log)?;
    log.info(
        SCOPE,
        &format!(
            "Bot stopped after {} cycles ({} consecutive failures): {}",
            ctl.cycles(),
            ctl.consecutive_failures(),
            reason
        ),
    );
    Ok(reason)
}
