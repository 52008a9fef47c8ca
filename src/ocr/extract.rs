//! Digit extraction from the configured screen regions.
//!
//! The screenshot is normalized and contrast-enhanced once, then each region
//! is cropped and recognized on a small pool of scoped worker threads. The
//! first run of digits in each transcription is kept.

use image::{DynamicImage, RgbImage};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::mpsc;
use std::sync::Mutex;
use std::thread;

use super::engine::TextRecognizer;
use super::preprocess::{crop_region, enhance_contrast, normalize_rgb};
use crate::automation::config::Region;
use crate::error::{BotError, Result};
use crate::logging::Logger;

const SCOPE: &str = "DigitExtractor";

/// The game shows exactly two numbers.
pub const EXPECTED_REGIONS: usize = 2;

/// A maximal run of ASCII digits.
const DIGIT_PATTERN: &str = r"[0-9]+";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtractSettings {
    pub contrast_factor: f32,
    /// Upper bound on concurrent recognitions
    pub workers: usize,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            contrast_factor: 2.0,
            workers: EXPECTED_REGIONS,
        }
    }
}

/// One digit string per region, in region-name order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawDigits {
    pub digits: Vec<(String, String)>,
}

impl RawDigits {
    pub fn fragments(&self) -> Vec<&str> {
        self.digits.iter().map(|(_, d)| d.as_str()).collect()
    }

    /// `digit1=3, digit2=2`
    pub fn describe(&self) -> String {
        self.digits
            .iter()
            .map(|(name, digits)| format!("{}={}", name, digits))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Returns the first maximal run of digits in `text`.
pub fn first_digit_run<'t>(digit_regex: &Regex, text: &'t str) -> Option<&'t str> {
    digit_regex.find(text).map(|m| m.as_str())
}

/// Reads one digit string per configured region from `image`.
///
/// Fails with `ConfigurationMismatch` unless exactly two regions are
/// configured, `Recognition` if the recognizer errors on a region and
/// `RecognitionEmpty` if a region's text holds no digits.
pub fn extract_digits(
    image: &DynamicImage,
    regions: &BTreeMap<String, Region>,
    recognizer: &dyn TextRecognizer,
    settings: &ExtractSettings,
    log: &dyn Logger,
) -> Result<RawDigits> {
    if regions.len() != EXPECTED_REGIONS {
        return Err(BotError::ConfigurationMismatch {
            expected: EXPECTED_REGIONS,
            found: regions.len(),
        });
    }

    let digit_regex = Regex::new(DIGIT_PATTERN)?;
    let rgb = normalize_rgb(image, log);
    let enhanced = enhance_contrast(&rgb, settings.contrast_factor);
    let texts = recognize_regions(&enhanced, regions, recognizer, settings.workers);

    let mut digits = Vec::with_capacity(texts.len());
    for (name, text) in texts {
        let text = text?;
        log.debug(SCOPE, &format!("Region '{}' raw text: {:?}", name, text));
        match first_digit_run(&digit_regex, &text) {
            Some(run) => digits.push((name, run.to_string())),
            None => return Err(BotError::RecognitionEmpty { region: name }),
        }
    }

    Ok(RawDigits { digits })
}

/// Recognizes every region on at most `workers` threads.
///
/// Regions are queued up front and workers pull from the shared queue until
/// it is empty. All workers are joined before this returns.
fn recognize_regions(
    image: &RgbImage,
    regions: &BTreeMap<String, Region>,
    recognizer: &dyn TextRecognizer,
    workers: usize,
) -> BTreeMap<String, Result<String>> {
    let worker_count = workers.clamp(1, regions.len().max(1));

    let (job_tx, job_rx) = mpsc::channel::<(&String, &Region)>();
    for job in regions {
        // The receiver is alive until the end of this function
        let _ = job_tx.send(job);
    }
    drop(job_tx);
    let job_rx = Mutex::new(job_rx);

    let (result_tx, result_rx) = mpsc::channel();

    thread::scope(|scope| {
        for _ in 0..worker_count {
            let result_tx = result_tx.clone();
            let job_rx = &job_rx;
            scope.spawn(move || {
                loop {
                    let job = match job_rx.lock() {
                        Ok(rx) => rx.recv(),
                        Err(_) => break,
                    };
                    let Ok((name, region)) = job else {
                        break;
                    };

                    let cropped = crop_region(image, region);
                    let result = recognizer
                        .recognize_text(&cropped)
                        .map_err(|e| BotError::Recognition {
                            region: name.clone(),
                            reason: format!("{:#}", e),
                        });
                    if result_tx.send((name.clone(), result)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(result_tx);

    result_rx.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryLogger;
    use anyhow::anyhow;
    use image::{Rgb, Rgba, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers by crop width and tracks peak concurrency.
    struct FakeRecognizer {
        texts: Vec<(u32, anyhow::Result<String>)>,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeRecognizer {
        fn new(texts: Vec<(u32, anyhow::Result<String>)>) -> Self {
            Self {
                texts,
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    impl TextRecognizer for FakeRecognizer {
        fn recognize_text(&self, image: &RgbImage) -> anyhow::Result<String> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            self.active.fetch_sub(1, Ordering::SeqCst);

            match self.texts.iter().find(|(w, _)| *w == image.width()) {
                Some((_, Ok(text))) => Ok(text.clone()),
                Some((_, Err(e))) => Err(anyhow!("{}", e)),
                None => Ok(String::new()),
            }
        }
    }

    fn regions() -> BTreeMap<String, Region> {
        let mut regions = BTreeMap::new();
        regions.insert("digit1".to_string(), Region::new(0, 0, 40, 20));
        regions.insert("digit2".to_string(), Region::new(50, 0, 30, 20));
        regions
    }

    fn screen() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 50, Rgb([200, 200, 200])))
    }

    #[test]
    fn test_first_digit_run() {
        let re = Regex::new(DIGIT_PATTERN).unwrap();
        assert_eq!(first_digit_run(&re, "12"), Some("12"));
        assert_eq!(first_digit_run(&re, "a 34 b 56"), Some("34"));
        assert_eq!(first_digit_run(&re, " 7."), Some("7"));
        assert_eq!(first_digit_run(&re, "no digits"), None);
        assert_eq!(first_digit_run(&re, ""), None);
        // Non-ASCII digits are not operands
        assert_eq!(first_digit_run(&re, "٣"), None);
    }

    #[test]
    fn test_extracts_both_regions_in_name_order() {
        let recognizer = FakeRecognizer::new(vec![
            (40, Ok("3 ".to_string())),
            (30, Ok("x2y".to_string())),
        ]);

        let raw = extract_digits(
            &screen(),
            &regions(),
            &recognizer,
            &ExtractSettings::default(),
            &MemoryLogger::new(),
        )
        .unwrap();

        assert_eq!(raw.fragments(), vec!["3", "2"]);
        assert_eq!(raw.describe(), "digit1=3, digit2=2");
    }

    #[test]
    fn test_accepts_rgba_screenshots() {
        let recognizer = FakeRecognizer::new(vec![
            (40, Ok("8".to_string())),
            (30, Ok("9".to_string())),
        ]);
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 50, Rgba([1, 2, 3, 255])));

        let raw = extract_digits(
            &rgba,
            &regions(),
            &recognizer,
            &ExtractSettings::default(),
            &MemoryLogger::new(),
        )
        .unwrap();

        assert_eq!(raw.fragments(), vec!["8", "9"]);
    }

    #[test]
    fn test_region_without_digits_fails() {
        let recognizer = FakeRecognizer::new(vec![
            (40, Ok("3".to_string())),
            (30, Ok("--".to_string())),
        ]);

        let err = extract_digits(
            &screen(),
            &regions(),
            &recognizer,
            &ExtractSettings::default(),
            &MemoryLogger::new(),
        )
        .unwrap_err();

        assert!(matches!(err, BotError::RecognitionEmpty { region } if region == "digit2"));
    }

    #[test]
    fn test_recognizer_error_is_reported_per_region() {
        let recognizer = FakeRecognizer::new(vec![
            (40, Err(anyhow!("tesseract timed out"))),
            (30, Ok("2".to_string())),
        ]);

        let err = extract_digits(
            &screen(),
            &regions(),
            &recognizer,
            &ExtractSettings::default(),
            &MemoryLogger::new(),
        )
        .unwrap_err();

        match err {
            BotError::Recognition { region, reason } => {
                assert_eq!(region, "digit1");
                assert!(reason.contains("timed out"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_wrong_region_count_fails_before_recognition() {
        let recognizer = FakeRecognizer::new(vec![]);
        let mut three = regions();
        three.insert("digit3".to_string(), Region::new(0, 25, 10, 10));

        let err = extract_digits(
            &screen(),
            &three,
            &recognizer,
            &ExtractSettings::default(),
            &MemoryLogger::new(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            BotError::ConfigurationMismatch {
                expected: 2,
                found: 3
            }
        ));
        assert_eq!(recognizer.peak.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_single_worker_runs_regions_sequentially() {
        let recognizer = FakeRecognizer::new(vec![
            (40, Ok("1".to_string())),
            (30, Ok("2".to_string())),
        ]);
        let settings = ExtractSettings {
            workers: 1,
            ..ExtractSettings::default()
        };

        extract_digits(&screen(), &regions(), &recognizer, &settings, &MemoryLogger::new()).unwrap();

        assert_eq!(recognizer.peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_worker_count_is_capped_by_regions() {
        let recognizer = FakeRecognizer::new(vec![
            (40, Ok("1".to_string())),
            (30, Ok("2".to_string())),
        ]);
        let settings = ExtractSettings {
            workers: 16,
            ..ExtractSettings::default()
        };

        extract_digits(&screen(), &regions(), &recognizer, &settings, &MemoryLogger::new()).unwrap();

        assert!(recognizer.peak.load(Ordering::SeqCst) <= 2);
    }
}
