//! Touch input injection on the device.
//!
//! Every stroke becomes one `adb shell input swipe x1 y1 x2 y2 duration`.
//! Coordinates are device pixels, rounded from the jittered path points.

use crate::adb::AdbBridge;
use crate::automation::gesture::{GestureDispatcher, Point};
use crate::error::{BotError, Result};

/// Builds the `shell input swipe` arguments for one stroke.
pub fn swipe_args(start: Point, end: Point, duration_ms: u64) -> Vec<String> {
    let (x1, y1) = start.to_pixels();
    let (x2, y2) = end.to_pixels();
    vec![
        "shell".to_string(),
        "input".to_string(),
        "swipe".to_string(),
        x1.to_string(),
        y1.to_string(),
        x2.to_string(),
        y2.to_string(),
        duration_ms.to_string(),
    ]
}

/// Dispatches swipes through adb.
pub struct AdbInput<'a> {
    bridge: &'a AdbBridge,
}

impl<'a> AdbInput<'a> {
    pub fn new(bridge: &'a AdbBridge) -> Self {
        Self { bridge }
    }
}

impl GestureDispatcher for AdbInput<'_> {
    fn dispatch_swipe(&self, start: Point, end: Point, duration_ms: u64) -> Result<()> {
        self.bridge
            .run(swipe_args(start, end, duration_ms))
            .map(|_| ())
            .map_err(|e| BotError::Dispatch(format!("{:#}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swipe_args() {
        let args = swipe_args(Point::new(375.0, 1075.0), Point::new(525.0, 1150.0), 100);
        assert_eq!(
            args,
            vec!["shell", "input", "swipe", "375", "1075", "525", "1150", "100"]
        );
    }

    #[test]
    fn test_swipe_args_round_to_pixels() {
        let args = swipe_args(Point::new(10.4, 10.6), Point::new(-2.5, 0.49), 250);
        assert_eq!(args[3..], ["10", "11", "-3", "0", "250"]);
    }
}
