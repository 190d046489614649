//! Hysteresis gate and horizontal pitch mapping.
//!
//! A note fires when the centroid has moved more than `threshold` pixels on
//! either axis since the previous frame.  The new centroid's `x` picks the
//! scale degree: the span from the first to the last column is cut into
//! `scale.len()` equal bands, so column 0 is the lowest pitch and the last
//! column is the highest.

use edgar_motion::Centroid;
use edgar_scale::Scale;

/// Scale index for column `x` of a `raster_width`-wide raster.
///
/// Always inside `0..scale_len` (for `scale_len > 0`), even when `x` lies
/// beyond the raster.  A one-column raster maps to index 0.
pub fn scale_index(x: usize, raster_width: usize, scale_len: usize) -> usize {
    if scale_len == 0 || raster_width == 0 {
        return 0;
    }
    let span = raster_width.saturating_sub(1).max(1);
    let band = (x as u128 * scale_len as u128 / span as u128) as usize;
    band.min(scale_len - 1)
}

/// True when `new` is more than `threshold` away from `prev` on either axis.
pub fn moved_beyond(prev: Centroid, new: Centroid, threshold: u32) -> bool {
    let t = threshold as usize;
    prev.x.abs_diff(new.x) > t || prev.y.abs_diff(new.y) > t
}

/// One-shot decision: the pitch to play, if any.
pub fn decide(
    prev:         Centroid,
    new:          Centroid,
    threshold:    u32,
    raster_width: usize,
    scale:        &Scale,
) -> Option<i32> {
    NoteTrigger::new(threshold, raster_width)
        .decide(prev, new, scale)
        .map(|t| t.pitch)
}

/// A fired note: which scale degree and the pitch it resolved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Trigger {
    pub index: usize,
    pub pitch: i32,
}

// ════════════════════════════════════════════════════════════════════════════
// NoteTrigger
// ════════════════════════════════════════════════════════════════════════════

/// Fixed trigger parameters for a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteTrigger {
    pub threshold:    u32,
    pub raster_width: usize,
}

impl NoteTrigger {
    pub fn new(threshold: u32, raster_width: usize) -> Self {
        NoteTrigger { threshold, raster_width }
    }

    pub fn decide(&self, prev: Centroid, new: Centroid, scale: &Scale) -> Option<Trigger> {
        if !moved_beyond(prev, new, self.threshold) {
            return None;
        }
        let index = scale_index(new.x, self.raster_width, scale.len());
        scale.get(index).map(|pitch| Trigger { index, pitch })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// TrackerState
// ════════════════════════════════════════════════════════════════════════════

/// The previous centroid, carried from one frame to the next.
///
/// Starts at `(0, 0)`.  Frames without motion leave it untouched, so the
/// object vanishing from view never fires a note by itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrackerState {
    previous: Centroid,
}

impl TrackerState {
    pub fn new() -> Self { Self::default() }

    pub fn previous(&self) -> Centroid { self.previous }

    /// Decide on `located` against the previous centroid, then remember it.
    pub fn advance(
        &mut self,
        located: Option<Centroid>,
        trigger: &NoteTrigger,
        scale:   &Scale,
    ) -> Option<Trigger> {
        let current = located?;
        let fired = trigger.decide(self.previous, current, scale);
        self.previous = current;
        fired
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use edgar_scale::build;

    fn c(x: usize, y: usize) -> Centroid { Centroid::new(x, y) }

    #[test]
    fn no_movement_never_fires() {
        let scale = build("C4", 3, "major").unwrap();
        for threshold in [1, 10, 500] {
            assert_eq!(decide(c(0, 0), c(0, 0), threshold, 640, &scale), None);
        }
    }

    #[test]
    fn movement_on_x_fires_regardless_of_y() {
        let scale = build("C4", 3, "major").unwrap();
        for threshold in [0, 10, 99] {
            let x = threshold as usize + 1;
            assert!(decide(c(0, 0), c(x, 0), threshold, 640, &scale).is_some());
            assert!(decide(c(0, 0), c(x, 479), threshold, 640, &scale).is_some());
        }
    }

    #[test]
    fn movement_on_y_alone_fires() {
        let scale = build("C4", 1, "major").unwrap();
        assert!(decide(c(100, 0), c(100, 11), 10, 640, &scale).is_some());
    }

    #[test]
    fn movement_equal_to_threshold_does_not_fire() {
        let scale = build("C4", 1, "major").unwrap();
        assert_eq!(decide(c(50, 50), c(60, 40), 10, 640, &scale), None);
    }

    #[test]
    fn leftmost_column_is_lowest_pitch() {
        let scale = build("C4", 1, "major").unwrap();
        assert_eq!(decide(c(300, 0), c(0, 0), 10, 640, &scale), Some(60));
    }

    #[test]
    fn rightmost_column_is_last_index() {
        for width in [2usize, 3, 7, 64, 639, 640, 1920] {
            for len in [1usize, 2, 8, 22, 85] {
                assert_eq!(scale_index(width - 1, width, len), len - 1, "w={} len={}", width, len);
            }
        }
    }

    #[test]
    fn index_is_clamped_past_the_edge() {
        assert_eq!(scale_index(10_000, 640, 22), 21);
        assert_eq!(scale_index(usize::MAX, 640, 22), 21);
        assert_eq!(scale_index(5, 0, 22), 0);
        assert_eq!(scale_index(5, 640, 0), 0);
    }

    #[test]
    fn bands_split_the_width() {
        // 8 degrees over columns 0..=639
        assert_eq!(scale_index(0, 640, 8), 0);
        assert_eq!(scale_index(79, 640, 8), 0);
        assert_eq!(scale_index(80, 640, 8), 1);
        assert_eq!(scale_index(320, 640, 8), 4);
    }

    #[test]
    fn state_advances_and_keeps_last_known() {
        let scale = build("C4", 1, "major").unwrap();
        let trigger = NoteTrigger::new(10, 640);
        let mut state = TrackerState::new();

        let first = state.advance(Some(c(320, 240)), &trigger, &scale);
        assert_eq!(first, Some(Trigger { index: 4, pitch: 67 }));
        assert_eq!(state.previous(), c(320, 240));

        // jitter
        assert_eq!(state.advance(Some(c(325, 245)), &trigger, &scale), None);
        assert_eq!(state.previous(), c(325, 245));

        // object gone: nothing fires, position is kept
        assert_eq!(state.advance(None, &trigger, &scale), None);
        assert_eq!(state.previous(), c(325, 245));
    }
}
