//! Frame acquisition.
//!
//! The tracking loop only sees [`FrameSource`]: one background raster before
//! the loop, then one raster per iteration until the source runs dry.  How
//! pixels are captured and binarised stays behind the trait.
//!
//! [`SimFrameSource`] stands in for a camera.  It renders a dark backdrop with
//! a bright disc wherever the pointer in the view window is, then thresholds
//! it like a grey-level camera frame.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, TryRecvError};

use edgar_motion::Raster;
use log::debug;

use crate::error::TrackerResult;

// ════════════════════════════════════════════════════════════════════════════
// FrameSource trait
// ════════════════════════════════════════════════════════════════════════════

pub trait FrameSource {
    /// The reference frame, taken once before tracking starts.
    fn capture_background(&mut self) -> TrackerResult<Raster>;

    /// The next frame, or `None` when the stream has ended.
    fn capture_frame(&mut self) -> TrackerResult<Option<Raster>>;

    /// `(width, height)` of every raster this source produces.
    fn dims(&self) -> (usize, usize);
}

/// Threshold a row-major grey-level buffer: brighter than `threshold` is
/// foreground.
pub fn binarize(luma: &[u8], width: usize, height: usize, threshold: u8) -> TrackerResult<Raster> {
    let pixels = luma.iter().map(|&l| l > threshold).collect();
    Ok(Raster::from_pixels(width, height, pixels)?)
}

// ════════════════════════════════════════════════════════════════════════════
// SimFrameSource
// ════════════════════════════════════════════════════════════════════════════

/// Raw pointer input from the view window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimInput {
    /// Pointer over the raster, in raster coordinates.
    Pointer { x: usize, y: usize },
    /// Pointer left the raster.
    PointerLost,
}

const BACKDROP_LUMA:  u8    = 40;
const OBJECT_LUMA:    u8    = 220;
const OBJECT_RADIUS:  usize = 12;

pub struct SimFrameSource {
    rx:        Receiver<SimInput>,
    width:     usize,
    height:    usize,
    threshold: u8,
    radius:    usize,
    pointer:   Option<(usize, usize)>,
}

impl SimFrameSource {
    pub fn new(rx: Receiver<SimInput>, width: usize, height: usize, threshold: u8) -> Self {
        SimFrameSource { rx, width, height, threshold, radius: OBJECT_RADIUS, pointer: None }
    }

    pub fn with_object_radius(mut self, radius: usize) -> Self {
        self.radius = radius;
        self
    }

    /// Apply pending input.  Returns `false` once the sender is gone.
    fn pump(&mut self) -> bool {
        loop {
            match self.rx.try_recv() {
                Ok(SimInput::Pointer { x, y }) if x < self.width && y < self.height => {
                    self.pointer = Some((x, y));
                }
                Ok(_)                           => self.pointer = None,
                Err(TryRecvError::Empty)        => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    /// Grey-level rendering of the current scene.
    fn render(&self) -> Vec<u8> {
        let mut luma = vec![BACKDROP_LUMA; self.width * self.height];
        if let Some((cx, cy)) = self.pointer {
            let r = self.radius;
            let r2 = r * r;
            for y in cy.saturating_sub(r)..(cy + r + 1).min(self.height) {
                for x in cx.saturating_sub(r)..(cx + r + 1).min(self.width) {
                    let (dx, dy) = (x.abs_diff(cx), y.abs_diff(cy));
                    if dx * dx + dy * dy <= r2 {
                        luma[y * self.width + x] = OBJECT_LUMA;
                    }
                }
            }
        }
        luma
    }

    fn snapshot(&self) -> TrackerResult<Raster> {
        binarize(&self.render(), self.width, self.height, self.threshold)
    }
}

impl FrameSource for SimFrameSource {
    fn capture_background(&mut self) -> TrackerResult<Raster> {
        self.pump();
        debug!("background captured with pointer at {:?}", self.pointer);
        self.snapshot()
    }

    fn capture_frame(&mut self) -> TrackerResult<Option<Raster>> {
        if !self.pump() {
            return Ok(None);
        }
        self.snapshot().map(Some)
    }

    fn dims(&self) -> (usize, usize) { (self.width, self.height) }
}

// ════════════════════════════════════════════════════════════════════════════
// ScriptedFrameSource
// ════════════════════════════════════════════════════════════════════════════

/// Replays a fixed background and frame list.
pub struct ScriptedFrameSource {
    background: Raster,
    frames:     VecDeque<Raster>,
}

impl ScriptedFrameSource {
    pub fn new(background: Raster, frames: Vec<Raster>) -> Self {
        ScriptedFrameSource { background, frames: frames.into() }
    }

    pub fn remaining(&self) -> usize { self.frames.len() }
}

impl FrameSource for ScriptedFrameSource {
    fn capture_background(&mut self) -> TrackerResult<Raster> {
        Ok(self.background.clone())
    }

    fn capture_frame(&mut self) -> TrackerResult<Option<Raster>> {
        Ok(self.frames.pop_front())
    }

    fn dims(&self) -> (usize, usize) { self.background.dims() }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
