//! # edgar_motion
//!
//! Background-difference motion location on binary rasters.
//!
//! A [`Raster`] is a fixed-size grid of foreground/background pixels.  Given
//! a background raster captured once and the current frame, a
//! [`MotionLocator`] returns the [`Centroid`] of every pixel that differs,
//! or `None` when nothing changed.
//!
//! ```rust
//! use edgar_motion::{locate, Raster, Centroid};
//!
//! let background = Raster::new(16, 12);
//! let mut frame  = background.clone();
//! frame.set(5, 5, true);
//!
//! assert_eq!(locate(&background, &frame).unwrap(), Some(Centroid { x: 5, y: 5 }));
//! assert_eq!(locate(&background, &background).unwrap(), None);
//! ```

use std::cmp::Ordering;

use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

pub type MotionResult<T> = Result<T, MotionError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MotionError {
    /// Background and current frame are not the same size.
    #[error("raster size mismatch: background is {background:?}, frame is {current:?} (width, height)")]
    DimensionMismatch {
        background: (usize, usize),
        current:    (usize, usize),
    },

    /// A pixel buffer does not match the declared raster size.
    #[error("pixel buffer holds {found} values, {width}×{height} raster needs {expected}")]
    PixelCount {
        width:    usize,
        height:   usize,
        expected: usize,
        found:    usize,
    },
}

// ════════════════════════════════════════════════════════════════════════════
// Raster
// ════════════════════════════════════════════════════════════════════════════

/// Row-major grid of binary pixels; `true` is foreground.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    width:  usize,
    height: usize,
    pixels: Vec<bool>,
}

impl Raster {
    /// All-background raster.
    pub fn new(width: usize, height: usize) -> Self {
        Raster { width, height, pixels: vec![false; width * height] }
    }

    /// Wrap an existing row-major buffer.
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<bool>) -> MotionResult<Self> {
        let expected = width * height;
        if pixels.len() != expected {
            return Err(MotionError::PixelCount { width, height, expected, found: pixels.len() });
        }
        Ok(Raster { width, height, pixels })
    }

    /// Build from text rows, `#` for foreground and anything else for
    /// background.  Rows shorter than the first are padded with background.
    pub fn from_ascii(rows: &[&str]) -> Self {
        let width  = rows.first().map(|r| r.chars().count()).unwrap_or(0);
        let height = rows.len();
        let mut raster = Raster::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().take(width).enumerate() {
                raster.set(x, y, c == '#');
            }
        }
        raster
    }

    pub fn width(&self)  -> usize { self.width }
    pub fn height(&self) -> usize { self.height }
    pub fn dims(&self)   -> (usize, usize) { (self.width, self.height) }
    pub fn pixels(&self) -> &[bool] { &self.pixels }

    /// Pixel at `(x, y)`; out-of-bounds reads are background.
    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.pixels[y * self.width + x]
    }

    /// Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = value;
        }
    }

    pub fn foreground_count(&self) -> usize {
        self.pixels.iter().filter(|&&p| p).count()
    }

    /// Number of pixels that differ from `other`.
    pub fn diff_count(&self, other: &Raster) -> MotionResult<usize> {
        check_dims(self, other)?;
        Ok(self.pixels.iter().zip(&other.pixels).filter(|(a, b)| a != b).count())
    }
}

fn check_dims(background: &Raster, current: &Raster) -> MotionResult<()> {
    if background.dims() != current.dims() {
        return Err(MotionError::DimensionMismatch {
            background: background.dims(),
            current:    current.dims(),
        });
    }
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Centroid
// ════════════════════════════════════════════════════════════════════════════

/// Mean position of the differing pixels, in raster coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Centroid {
    pub x: usize,
    pub y: usize,
}

impl Centroid {
    pub fn new(x: usize, y: usize) -> Self { Centroid { x, y } }
}

/// Running coordinate sums for one frame.
#[derive(Default)]
struct Accumulator {
    sum_x: u64,
    sum_y: u64,
    count: u64,
}

impl Accumulator {
    fn add(&mut self, x: usize, y: usize) {
        self.sum_x += x as u64;
        self.sum_y += y as u64;
        self.count += 1;
    }

    /// Rounded mean, or `None` for an empty sum.  Halves round to even.
    fn mean(&self) -> Option<Centroid> {
        if self.count == 0 {
            return None;
        }
        let round = |sum: u64| {
            let (q, r) = (sum / self.count, sum % self.count);
            let up = match (2 * r).cmp(&self.count) {
                Ordering::Greater => true,
                Ordering::Equal   => q % 2 == 1,
                Ordering::Less    => false,
            };
            (q + up as u64) as usize
        };
        Some(Centroid { x: round(self.sum_x), y: round(self.sum_y) })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MotionLocator — pluggable scan strategies
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can find the centroid of change between two rasters.
///
/// Implementations must return `DimensionMismatch` for differently sized
/// inputs and `Ok(None)` when no pixel differs.
pub trait MotionLocator: Send + Sync {
    fn locate(&self, background: &Raster, current: &Raster) -> MotionResult<Option<Centroid>>;

    /// Short label for logs.
    fn name(&self) -> &'static str;
}

/// Visits every pixel.  O(width × height) per frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct FullScan;

impl MotionLocator for FullScan {
    fn locate(&self, background: &Raster, current: &Raster) -> MotionResult<Option<Centroid>> {
        check_dims(background, current)?;

        let mut acc = Accumulator::default();
        let width = current.width;
        for (i, (bg, px)) in background.pixels.iter().zip(&current.pixels).enumerate() {
            if bg != px {
                acc.add(i % width, i / width);
            }
        }
        Ok(acc.mean())
    }

    fn name(&self) -> &'static str { "full-scan" }
}

/// Visits every `step`-th row and column.  An approximation for large
/// rasters; a blob narrower than `step` can be missed.
#[derive(Clone, Copy, Debug)]
pub struct Strided {
    pub step: usize,
}

impl MotionLocator for Strided {
    fn locate(&self, background: &Raster, current: &Raster) -> MotionResult<Option<Centroid>> {
        check_dims(background, current)?;

        let step = self.step.max(1);
        let mut acc = Accumulator::default();
        for y in (0..current.height).step_by(step) {
            let row = y * current.width;
            for x in (0..current.width).step_by(step) {
                if background.pixels[row + x] != current.pixels[row + x] {
                    acc.add(x, y);
                }
            }
        }
        Ok(acc.mean())
    }

    fn name(&self) -> &'static str { "strided" }
}

/// Locate with the [`FullScan`] strategy.
pub fn locate(background: &Raster, current: &Raster) -> MotionResult<Option<Centroid>> {
    FullScan.locate(background, current)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
