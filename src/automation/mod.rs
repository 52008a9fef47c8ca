//! Perception-decision-action automation for the comparison game.
//!
//! This module provides:
//! - Configuration loading (`config.json`)
//! - Operand parsing and the comparison decision
//! - Symbol path synthesis and jittered stroke dispatch
//! - The control loop state machine and its runner

pub mod config;
pub mod decision;
pub mod gesture;
pub mod input;
pub mod runner;
pub mod state;

pub use config::{load_or_create_config, write_config, BotConfig};
pub use decision::{decide, parse_operands};
pub use gesture::draw;
pub use input::AdbInput;
pub use runner::{connect_device, run_bot};
pub use state::{AbortSignal, HaltReason};
