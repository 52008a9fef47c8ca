//! Hand-drawn symbol synthesis.
//!
//! A symbol becomes one or more poly-lines centred on the input region.
//! Every stroke endpoint is jittered on its own, so two strokes meeting at a
//! vertex usually do not meet exactly. That gap is what makes the input look
//! drawn by a finger.

use rand::Rng;

use crate::automation::config::{DrawSettings, Region};
use crate::automation::decision::Symbol;
use crate::automation::state::AbortSignal;
use crate::error::{BotError, Result};

/// A point in device pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Rounds to whole pixels for input injection.
    pub fn to_pixels(self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

/// The shape of a symbol as independent poly-lines.
///
/// `>` and `<` are a single 3-point chevron. `=` is two 2-point bars that
/// must never be joined into one stroke.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawPath {
    pub polylines: Vec<Vec<Point>>,
}

impl DrawPath {
    /// All points in drawing order.
    #[cfg(test)]
    pub fn points(&self) -> impl Iterator<Item = &Point> {
        self.polylines.iter().flatten()
    }

    /// Number of point-to-point strokes needed to draw the path.
    pub fn stroke_count(&self) -> usize {
        self.polylines
            .iter()
            .map(|line| line.len().saturating_sub(1))
            .sum()
    }
}

/// Jitter and timing applied when strokes are dispatched.
#[derive(Clone, Copy, Debug)]
pub struct StrokeSettings {
    pub max_offset: i32,
    pub duration_ms: u64,
}

/// Input injection on the device.
pub trait GestureDispatcher {
    /// Performs one swipe from `start` to `end` lasting `duration_ms`.
    fn dispatch_swipe(&self, start: Point, end: Point, duration_ms: u64) -> Result<()>;
}

/// Builds the draw path for `symbol` centred on `region`.
pub fn path_for(symbol: Symbol, region: &Region, settings: &DrawSettings) -> DrawPath {
    let center = region.center();
    let (width, height) = settings.scaled_size();
    let (w, h) = (width / 2.0, height / 2.0);
    let (cx, cy) = (center.x, center.y);

    let polylines = match symbol {
        Symbol::Greater => vec![vec![
            Point::new(cx - w, cy - h),
            Point::new(cx + w, cy),
            Point::new(cx - w, cy + h),
        ]],
        Symbol::Less => vec![vec![
            Point::new(cx + w, cy - h),
            Point::new(cx - w, cy),
            Point::new(cx + w, cy + h),
        ]],
        Symbol::Equal => vec![
            vec![Point::new(cx - w, cy - h / 2.0), Point::new(cx + w, cy - h / 2.0)],
            vec![Point::new(cx - w, cy + h / 2.0), Point::new(cx + w, cy + h / 2.0)],
        ],
    };

    DrawPath { polylines }
}

/// Parses a textual symbol and builds its draw path.
pub fn path_for_token(token: &str, region: &Region, settings: &DrawSettings) -> Result<DrawPath> {
    let symbol: Symbol = token.parse()?;
    Ok(path_for(symbol, region, settings))
}

/// Offsets each axis of `point` by an independent integer in
/// `[-max_offset, max_offset]`.
pub fn humanize<R: Rng + ?Sized>(point: Point, max_offset: i32, rng: &mut R) -> Point {
    if max_offset <= 0 {
        return point;
    }
    let dx = rng.random_range(-max_offset..=max_offset);
    let dy = rng.random_range(-max_offset..=max_offset);
    Point::new(point.x + dx as f64, point.y + dy as f64)
}

/// Dispatches every stroke of `path` in order, jittering both endpoints of
/// each stroke independently.
///
/// Stops before the next stroke once `abort` is raised. The first dispatch
/// failure aborts the remaining strokes and is returned as-is.
pub fn draw<R: Rng + ?Sized>(
    path: &DrawPath,
    dispatcher: &dyn GestureDispatcher,
    rng: &mut R,
    settings: &StrokeSettings,
    abort: &AbortSignal,
) -> Result<usize> {
    if path.polylines.is_empty() {
        return Err(BotError::PathTooShort(0));
    }
    if let Some(short) = path.polylines.iter().find(|line| line.len() < 2) {
        return Err(BotError::PathTooShort(short.len()));
    }

    let mut dispatched = 0;
    for line in &path.polylines {
        for pair in line.windows(2) {
            if abort.is_requested() {
                return Err(BotError::Interrupted);
            }
            let start = humanize(pair[0], settings.max_offset, rng);
            let end = humanize(pair[1], settings.max_offset, rng);
            dispatcher.dispatch_swipe(start, end, settings.duration_ms)?;
            dispatched += 1;
        }
    }
    Ok(dispatched)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::RefCell;

    /// Records swipes, optionally failing on the n-th one (0-based).
    #[derive(Default)]
    pub(crate) struct RecordingDispatcher {
        pub swipes: RefCell<Vec<(Point, Point, u64)>>,
        pub fail_at: Option<usize>,
    }

    impl GestureDispatcher for RecordingDispatcher {
        fn dispatch_swipe(&self, start: Point, end: Point, duration_ms: u64) -> Result<()> {
            let mut swipes = self.swipes.borrow_mut();
            if self.fail_at == Some(swipes.len()) {
                return Err(BotError::Dispatch("device unplugged".to_string()));
            }
            swipes.push((start, end, duration_ms));
            Ok(())
        }
    }

    fn region() -> Region {
        Region::new(250, 1000, 400, 300)
    }

    fn settings() -> DrawSettings {
        DrawSettings {
            scale_factor: 1.5,
            ..DrawSettings::default()
        }
    }

    fn no_jitter() -> StrokeSettings {
        StrokeSettings {
            max_offset: 0,
            duration_ms: 100,
        }
    }

    #[test]
    fn test_greater_chevron() {
        let path = path_for(Symbol::Greater, &region(), &settings());
        assert_eq!(
            path.polylines,
            vec![vec![
                Point::new(375.0, 1075.0),
                Point::new(525.0, 1150.0),
                Point::new(375.0, 1225.0),
            ]]
        );
        assert_eq!(path.stroke_count(), 2);
    }

    #[test]
    fn test_less_chevron() {
        let path = path_for(Symbol::Less, &region(), &settings());
        let points: Vec<Point> = path.points().copied().collect();
        assert_eq!(
            points,
            vec![
                Point::new(525.0, 1075.0),
                Point::new(375.0, 1150.0),
                Point::new(525.0, 1225.0),
            ]
        );
    }

    #[test]
    fn test_equal_is_two_disjoint_bars() {
        let path = path_for(Symbol::Equal, &region(), &settings());
        assert_eq!(path.polylines.len(), 2);
        assert_eq!(path.points().count(), 4);
        assert_eq!(path.stroke_count(), 2);

        let upper = &path.polylines[0];
        let lower = &path.polylines[1];
        assert_eq!(upper[0], Point::new(375.0, 1112.5));
        assert_eq!(upper[1], Point::new(525.0, 1112.5));
        assert_eq!(lower[0], Point::new(375.0, 1187.5));
        assert_eq!(lower[1], Point::new(525.0, 1187.5));
    }

    #[test]
    fn test_unknown_token() {
        assert!(matches!(
            path_for_token("?", &region(), &settings()),
            Err(BotError::UnknownSymbol(_))
        ));
        assert!(path_for_token("<", &region(), &settings()).is_ok());
    }

    #[test]
    fn test_humanize_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let p = Point::new(100.0, 200.0);
        for max_offset in [0, 1, 5, 20] {
            for _ in 0..500 {
                let q = humanize(p, max_offset, &mut rng);
                assert!((q.x - p.x).abs() <= max_offset as f64);
                assert!((q.y - p.y).abs() <= max_offset as f64);
                assert_eq!(q.x.fract(), 0.0);
            }
        }
    }

    #[test]
    fn test_humanize_is_deterministic_for_seed() {
        let p = Point::new(10.0, 10.0);
        let a = humanize(p, 5, &mut StdRng::seed_from_u64(42));
        let b = humanize(p, 5, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_draw_chevron_dispatches_two_strokes_in_order() {
        let path = path_for(Symbol::Greater, &region(), &settings());
        let dispatcher = RecordingDispatcher::default();
        let mut rng = StdRng::seed_from_u64(1);

        let count = draw(&path, &dispatcher, &mut rng, &no_jitter(), &AbortSignal::new()).unwrap();

        assert_eq!(count, 2);
        let swipes = dispatcher.swipes.borrow();
        assert_eq!(swipes[0].0, Point::new(375.0, 1075.0));
        assert_eq!(swipes[0].1, Point::new(525.0, 1150.0));
        assert_eq!(swipes[1].0, Point::new(525.0, 1150.0));
        assert_eq!(swipes[1].1, Point::new(375.0, 1225.0));
        assert!(swipes.iter().all(|s| s.2 == 100));
    }

    #[test]
    fn test_draw_equal_never_connects_bars() {
        let path = path_for(Symbol::Equal, &region(), &settings());
        let dispatcher = RecordingDispatcher::default();
        let mut rng = StdRng::seed_from_u64(1);

        draw(&path, &dispatcher, &mut rng, &no_jitter(), &AbortSignal::new()).unwrap();

        let swipes = dispatcher.swipes.borrow();
        assert_eq!(swipes.len(), 2);
        for (start, end, _) in swipes.iter() {
            assert_eq!(start.y, end.y, "bars must be horizontal");
        }
    }

    #[test]
    fn test_draw_jitters_shared_vertex_independently() {
        let path = path_for(Symbol::Greater, &region(), &settings());
        let dispatcher = RecordingDispatcher::default();
        let mut rng = StdRng::seed_from_u64(3);
        let jitter = StrokeSettings {
            max_offset: 5,
            duration_ms: 100,
        };

        draw(&path, &dispatcher, &mut rng, &jitter, &AbortSignal::new()).unwrap();

        let swipes = dispatcher.swipes.borrow();
        let vertex = Point::new(525.0, 1150.0);
        for point in [swipes[0].1, swipes[1].0] {
            assert!((point.x - vertex.x).abs() <= 5.0);
            assert!((point.y - vertex.y).abs() <= 5.0);
        }
    }

    #[test]
    fn test_draw_stops_at_first_dispatch_failure() {
        let path = path_for(Symbol::Greater, &region(), &settings());
        let dispatcher = RecordingDispatcher {
            fail_at: Some(0),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);

        let err = draw(&path, &dispatcher, &mut rng, &no_jitter(), &AbortSignal::new()).unwrap_err();

        assert!(matches!(err, BotError::Dispatch(_)));
        assert!(dispatcher.swipes.borrow().is_empty());
    }

    #[test]
    fn test_draw_respects_abort() {
        let path = path_for(Symbol::Less, &region(), &settings());
        let dispatcher = RecordingDispatcher::default();
        let abort = AbortSignal::new();
        abort.request();

        let err = draw(&path, &dispatcher, &mut StdRng::seed_from_u64(1), &no_jitter(), &abort)
            .unwrap_err();

        assert!(matches!(err, BotError::Interrupted));
        assert!(dispatcher.swipes.borrow().is_empty());
    }

    #[test]
    fn test_draw_rejects_short_path() {
        let path = DrawPath {
            polylines: vec![vec![Point::new(1.0, 1.0)]],
        };
        let dispatcher = RecordingDispatcher::default();
        let err = draw(
            &path,
            &dispatcher,
            &mut StdRng::seed_from_u64(1),
            &no_jitter(),
            &AbortSignal::new(),
        )
        .unwrap_err();
        assert!(matches!(err, BotError::PathTooShort(1)));
    }
}
