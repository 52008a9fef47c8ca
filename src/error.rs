//! Error types for the perception-decision-action loop.
//!
//! Per-iteration failures are classified here so the control loop can
//! decide which ones count toward the escalation threshold.

use thiserror::Error;

/// All failures the bot distinguishes between.
#[derive(Debug, Error)]
pub enum BotError {
    /// Screen capture failed (transient, never escalates)
    #[error("Capture failed: {0}")]
    Capture(String),

    /// The text recognizer failed on a region
    #[error("Recognition failed for region '{region}': {reason}")]
    Recognition { region: String, reason: String },

    /// A region's transcription contained no digit run
    #[error("No digits recognized in region '{region}'")]
    RecognitionEmpty { region: String },

    /// Wrong number of OCR regions configured
    #[error("Expected {expected} OCR regions, found {found}")]
    ConfigurationMismatch { expected: usize, found: usize },

    /// Digit fragments could not be parsed into two operands
    #[error("Malformed operand: {0}")]
    MalformedOperand(String),

    /// A symbol outside `>`, `<`, `=` was requested
    #[error("Unknown symbol: {0:?}")]
    UnknownSymbol(String),

    /// A draw path poly-line with fewer than two points
    #[error("Draw path needs at least 2 points, got {0}")]
    PathTooShort(usize),

    /// Input injection failed
    #[error("Gesture dispatch failed: {0}")]
    Dispatch(String),

    /// The abort signal was raised
    #[error("Interrupted")]
    Interrupted,

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// adb could not be located, set up or executed
    #[error("adb error: {0}")]
    Adb(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl BotError {
    /// True for failures that count toward the consecutive-failure threshold.
    pub fn is_escalating(&self) -> bool {
        matches!(
            self,
            BotError::Recognition { .. }
                | BotError::RecognitionEmpty { .. }
                | BotError::ConfigurationMismatch { .. }
                | BotError::MalformedOperand(_)
        )
    }
}

/// Result alias used by the core modules.
pub type Result<T> = std::result::Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognition_empty_message() {
        let err = BotError::RecognitionEmpty {
            region: "digit1".to_string(),
        };
        assert_eq!(err.to_string(), "No digits recognized in region 'digit1'");
    }

    #[test]
    fn test_configuration_mismatch_message() {
        let err = BotError::ConfigurationMismatch {
            expected: 2,
            found: 3,
        };
        assert_eq!(err.to_string(), "Expected 2 OCR regions, found 3");
    }

    #[test]
    fn test_escalating_classification() {
        assert!(BotError::MalformedOperand("3a".to_string()).is_escalating());
        assert!(
            BotError::Recognition {
                region: "digit2".to_string(),
                reason: "timeout".to_string()
            }
            .is_escalating()
        );
        assert!(!BotError::Capture("device offline".to_string()).is_escalating());
        assert!(!BotError::Dispatch("exit status 1".to_string()).is_escalating());
        assert!(!BotError::Interrupted.is_escalating());
    }
}
