//! Control loop state machine.
//!
//! The loop cycles through: Capturing → Extracting → Deciding → Drawing →
//! Capturing. Each `step()` performs one transition. Capture failures are
//! treated as device noise and never counted; recognition and parse failures
//! are counted and halt the loop once they pile up.

use image::DynamicImage;
use rand::Rng;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::automation::config::{BotConfig, DrawSettings, Region};
use crate::automation::decision::{decide, parse_operands, Symbol};
use crate::automation::gesture::{draw, path_for, GestureDispatcher, StrokeSettings};
use crate::capture::ScreenSource;
use crate::error::{BotError, Result};
use crate::logging::Logger;
use crate::ocr::{extract_digits, ExtractSettings, RawDigits, TextRecognizer};

const SCOPE: &str = "ControlLoop";

/// Shared stop flag, raised from the Ctrl+C handler.
#[derive(Clone, Debug, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why the loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HaltReason {
    /// Stopped by the user
    Interrupted,
    /// Too many consecutive recognition/parse failures
    FailureThreshold { failures: u32 },
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::Interrupted => write!(f, "interrupted"),
            HaltReason::FailureThreshold { failures } => {
                write!(f, "{} consecutive recognition failures", failures)
            }
        }
    }
}

/// Loop states. Each carries the data produced by the previous stage.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    Capturing,
    Extracting(DynamicImage),
    Deciding(RawDigits),
    Drawing(Symbol),
    Halted(HaltReason),
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopState::Capturing => write!(f, "Capturing"),
            LoopState::Extracting(_) => write!(f, "Extracting"),
            LoopState::Deciding(_) => write!(f, "Deciding"),
            LoopState::Drawing(symbol) => write!(f, "Drawing {}", symbol),
            LoopState::Halted(reason) => write!(f, "Halted: {}", reason),
        }
    }
}

/// How a finished cycle went.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    Drawn(Symbol),
    CaptureFailed,
    RecognitionFailed,
    ParseFailed,
    DispatchFailed,
}

/// Result of a single `step()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Moved to the next stage of the current cycle
    Continue,
    /// The cycle ended; the caller applies the inter-cycle delay
    CycleComplete(CycleOutcome),
    Halted(HaltReason),
}

/// Consecutive recognition/parse failures.
#[derive(Debug, Default)]
pub struct FailureCounter {
    count: u32,
}

impl FailureCounter {
    pub fn increment(&mut self) -> u32 {
        self.count = self.count.saturating_add(1);
        self.count
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn get(&self) -> u32 {
        self.count
    }
}

/// Everything the loop needs that does not change between cycles.
#[derive(Clone, Debug)]
pub struct LoopSettings {
    pub ocr_regions: BTreeMap<String, Region>,
    pub input_region: Region,
    pub draw: DrawSettings,
    pub stroke: StrokeSettings,
    pub extract: ExtractSettings,
    pub failure_threshold: u32,
    pub cycle_delay: Duration,
}

impl LoopSettings {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            ocr_regions: config.ocr_region.clone(),
            input_region: config.input_region,
            draw: config.draw_settings,
            stroke: config.stroke_settings(),
            extract: ExtractSettings {
                contrast_factor: config.contrast_factor,
                workers: config.ocr_workers,
            },
            failure_threshold: config.failure_threshold,
            cycle_delay: config.cycle_delay(),
        }
    }
}

/// The device-facing collaborators.
pub struct Devices<'a> {
    pub screen: &'a dyn ScreenSource,
    pub recognizer: &'a dyn TextRecognizer,
    pub dispatcher: &'a dyn GestureDispatcher,
}

/// Control loop context holding state and collaborators.
pub struct ControlLoop<'a, R: Rng> {
    state: LoopState,
    failures: FailureCounter,
    settings: LoopSettings,
    devices: Devices<'a>,
    rng: R,
    log: &'a dyn Logger,
    abort: AbortSignal,
    cycles: u64,
}

impl<'a, R: Rng> ControlLoop<'a, R> {
    pub fn new(
        settings: LoopSettings,
        devices: Devices<'a>,
        rng: R,
        log: &'a dyn Logger,
        abort: AbortSignal,
    ) -> Self {
        Self {
            state: LoopState::Capturing,
            failures: FailureCounter::default(),
            settings,
            devices,
            rng,
            log,
            abort,
            cycles: 0,
        }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures.get()
    }

    /// Number of cycles completed so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    pub fn abort_signal(&self) -> &AbortSignal {
        &self.abort
    }

    /// Advances the state machine by one transition.
    ///
    /// Per-cycle failures are absorbed here. Only errors outside that
    /// taxonomy are returned.
    pub fn step(&mut self) -> Result<Step> {
        if let LoopState::Halted(reason) = self.state {
            return Ok(Step::Halted(reason));
        }
        if self.abort.is_requested() {
            self.log.info(SCOPE, "Stop requested, halting");
            return Ok(self.halt(HaltReason::Interrupted));
        }

        match std::mem::replace(&mut self.state, LoopState::Capturing) {
            LoopState::Capturing => match self.devices.screen.capture_screen() {
                Ok(image) => {
                    self.log.debug(
                        SCOPE,
                        &format!("Captured {}x{} frame", image.width(), image.height()),
                    );
                    self.state = LoopState::Extracting(image);
                    Ok(Step::Continue)
                }
                Err(e) => {
                    self.log
                        .error(SCOPE, &format!("{}, skipping this cycle", e));
                    Ok(self.end_cycle(CycleOutcome::CaptureFailed))
                }
            },

            LoopState::Extracting(image) => {
                match extract_digits(
                    &image,
                    &self.settings.ocr_regions,
                    self.devices.recognizer,
                    &self.settings.extract,
                    self.log,
                ) {
                    Ok(raw) => {
                        self.log
                            .info(SCOPE, &format!("OCR read {}", raw.describe()));
                        self.state = LoopState::Deciding(raw);
                        Ok(Step::Continue)
                    }
                    Err(e) if e.is_escalating() => {
                        Ok(self.record_failure(CycleOutcome::RecognitionFailed, &e))
                    }
                    Err(e) => Err(e),
                }
            }

            LoopState::Deciding(raw) => match parse_operands(&raw.fragments()) {
                Ok((a, b)) => {
                    // A readable screen ends the failure streak even if drawing fails
                    self.failures.reset();
                    let symbol = decide(&a, &b);
                    self.log
                        .debug(SCOPE, &format!("{} {} {}", a, symbol, b));
                    self.state = LoopState::Drawing(symbol);
                    Ok(Step::Continue)
                }
                Err(e) => Ok(self.record_failure(CycleOutcome::ParseFailed, &e)),
            },

            LoopState::Drawing(symbol) => {
                let path = path_for(symbol, &self.settings.input_region, &self.settings.draw);
                match draw(
                    &path,
                    self.devices.dispatcher,
                    &mut self.rng,
                    &self.settings.stroke,
                    &self.abort,
                ) {
                    Ok(strokes) => {
                        self.log.info(
                            SCOPE,
                            &format!("Drew '{}' with {} strokes", symbol, strokes),
                        );
                        Ok(self.end_cycle(CycleOutcome::Drawn(symbol)))
                    }
                    Err(BotError::Interrupted) => {
                        self.log
                            .info(SCOPE, "Stop requested while drawing, remaining strokes skipped");
                        Ok(self.halt(HaltReason::Interrupted))
                    }
                    Err(e @ BotError::Dispatch(_)) => {
                        self.log
                            .error(SCOPE, &format!("Failed to draw '{}': {}", symbol, e));
                        Ok(self.end_cycle(CycleOutcome::DispatchFailed))
                    }
                    Err(e) => Err(e),
                }
            }

            LoopState::Halted(reason) => {
                self.state = LoopState::Halted(reason);
                Ok(Step::Halted(reason))
            }
        }
    }

    fn record_failure(&mut self, outcome: CycleOutcome, error: &BotError) -> Step {
        let failures = self.failures.increment();
        self.log.error(
            SCOPE,
            &format!("{} (consecutive failures: {})", error, failures),
        );

        if failures >= self.settings.failure_threshold {
            self.log.critical(
                SCOPE,
                &format!(
                    "OCR failed {} times in a row, the regions or the recognizer are probably broken",
                    failures
                ),
            );
            return self.halt(HaltReason::FailureThreshold { failures });
        }
        self.end_cycle(outcome)
    }

    fn end_cycle(&mut self, outcome: CycleOutcome) -> Step {
        self.cycles += 1;
        self.state = LoopState::Capturing;
        Step::CycleComplete(outcome)
    }

    fn halt(&mut self, reason: HaltReason) -> Step {
        self.state = LoopState::Halted(reason);
        Step::Halted(reason)
    }
}
