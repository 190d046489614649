//! Live view using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │ │   │   │▒▒▒│   │   │   │   │   │   │   │ │  ← scale bands, active one lit
//! │            ██                             │
//! │          ██████   ■                       │  ← foreground pixels, red dot
//! │            ██                             │    at the centroid
//! ├───────────────────────────────────────────┤
//! │ status line                               │
//! │ key legend                                │
//! └───────────────────────────────────────────┘
//! ```
//!
//! The window doubles as the simulated camera's input: the mouse position
//! over the raster is forwarded as [`SimInput`].

use std::sync::mpsc::Sender;
use std::time::Duration;

use edgar_motion::{Centroid, Raster};
use minifb::{Key, KeyRepeat, MouseMode, Window, WindowOptions};

use crate::error::{TrackerError, TrackerResult};
use crate::source::SimInput;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

const STATUS_H:     usize = 24;
const BG_COLOR:     u32   = 0xFF1A1A2E;
const FG_COLOR:     u32   = 0xFFE0E0E0;
const BAND_LINE:    u32   = 0xFF2E3A5C;
const BAND_ACTIVE:  u32   = 0xFF3A2E5C;
const DOT_COLOR:    u32   = 0xFFFF2020;
const TEXT_BG:      u32   = 0xFF0F3460;
const TEXT_COLOR:   u32   = 0xFFEEEEEE;
const LEGEND_COLOR: u32   = 0xFF888888;

/// Band lines are skipped when narrower than this many pixels.
const MIN_BAND_PX:  usize = 4;

/// Columns `[start, end)` that map to scale degree `band`.
///
/// Mirrors [`crate::trigger::scale_index`]: band `b` starts at the first
/// column `x` with `x * bands / (width - 1) >= b`.
pub fn band_bounds(band: usize, bands: usize, width: usize) -> (usize, usize) {
    if bands == 0 || width == 0 {
        return (0, 0);
    }
    let span = width.saturating_sub(1).max(1);
    let start = |b: usize| ((b * span).div_ceil(bands)).min(width);
    let end = if band + 1 >= bands { width } else { start(band + 1) };
    (start(band).min(end), end)
}

// ════════════════════════════════════════════════════════════════════════════
// Canvas
// ════════════════════════════════════════════════════════════════════════════

/// ARGB framebuffer with clipped drawing primitives.
pub struct Canvas {
    buf: Vec<u32>,
    w:   usize,
    h:   usize,
}

impl Canvas {
    pub fn new(w: usize, h: usize) -> Self {
        Canvas { buf: vec![BG_COLOR; w * h], w, h }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.w && y < self.h).then(|| self.buf[y * self.w + x])
    }

    pub fn clear(&mut self) { self.buf.fill(BG_COLOR); }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < self.w && y < self.h {
            self.buf[y * self.w + x] = color;
        }
    }

    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(self.h) {
            for col in x..(x + w).min(self.w) {
                self.buf[row * self.w + col] = color;
            }
        }
    }

    /// Filled square of side `2r + 1` centred on `(cx, cy)`.
    pub fn fill_square(&mut self, cx: usize, cy: usize, r: usize, color: u32) {
        let (x, y) = (cx.saturating_sub(r), cy.saturating_sub(r));
        let w = cx + r + 1 - x;
        let h = cy + r + 1 - y;
        self.fill_rect(x, y, w, h, color);
    }

    /// Foreground pixels of `raster`, drawn at the origin.
    pub fn draw_raster(&mut self, raster: &Raster, color: u32) {
        let width = raster.width();
        for (i, &fg) in raster.pixels().iter().enumerate() {
            if fg {
                self.set_pixel(i % width, i / width, color);
            }
        }
    }

    /// Band separators over the top `height` rows, with `active` filled.
    pub fn draw_bands(&mut self, bands: usize, width: usize, height: usize, active: Option<usize>) {
        if let Some(b) = active.filter(|&b| b < bands) {
            let (x0, x1) = band_bounds(b, bands, width);
            self.fill_rect(x0, 0, x1 - x0, height, BAND_ACTIVE);
        }
        if bands == 0 || width / bands < MIN_BAND_PX {
            return;
        }
        for b in 1..bands {
            let (x, _) = band_bounds(b, bands, width);
            self.fill_rect(x, 0, 1, height, BAND_LINE);
        }
    }

    /// 3×5 bitmap text, one pixel of spacing.
    pub fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            if cx + 3 > self.w { break; }
            let glyph = char_glyph(ch);
            for row in 0..5 {
                for col in 0..3 {
                    if glyph & (1 << (14 - row * 3 - col)) != 0 {
                        self.set_pixel(cx + col, y + row, color);
                    }
                }
            }
            cx += 4;
        }
    }

    pub fn as_slice(&self) -> &[u32] { &self.buf }
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window:     Window,
    canvas:     Canvas,
    width:      usize,
    height:     usize,
    dot_radius: usize,
    sim_tx:     Sender<SimInput>,
    last_input: Option<SimInput>,
}

impl Visualizer {
    /// Open a window for a `(width, height)` raster plus the status bar.
    pub fn new((width, height): (usize, usize), dot_radius: usize, sim_tx: Sender<SimInput>) -> TrackerResult<Self> {
        let (win_w, win_h) = (width, height + STATUS_H);
        let mut window = Window::new(
            "EDGAR Tracker",
            win_w, win_h,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| TrackerError::Window(e.to_string()))?;

        window.limit_update_rate(Some(Duration::from_millis(16)));

        Ok(Visualizer {
            window,
            canvas: Canvas::new(win_w, win_h),
            width,
            height,
            dot_radius,
            sim_tx,
            last_input: None,
        })
    }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Forward the pointer to the frame source.  Returns false when the
    /// user asked to quit.
    pub fn poll_input(&mut self) -> bool {
        if !self.window.is_open() { return false; }

        if self.window.is_key_pressed(Key::Q, KeyRepeat::No)
            || self.window.is_key_pressed(Key::Escape, KeyRepeat::No)
        {
            return false;
        }

        let input = match self.window.get_mouse_pos(MouseMode::Discard) {
            Some((mx, my)) if mx >= 0.0 && my >= 0.0 && (my as usize) < self.height =>
                SimInput::Pointer { x: mx as usize, y: my as usize },
            _ => SimInput::PointerLost,
        };
        if self.last_input != Some(input) {
            self.last_input = Some(input);
            // The source is dropped only after the loop ends.
            let _ = self.sim_tx.send(input);
        }
        true
    }

    /// Render one frame.
    pub fn render(
        &mut self,
        frame:    &Raster,
        centroid: Option<Centroid>,
        bands:    usize,
        active:   Option<usize>,
        status:   &str,
    ) {
        let canvas = &mut self.canvas;
        canvas.clear();

        canvas.draw_bands(bands, self.width, self.height, active);
        canvas.draw_raster(frame, FG_COLOR);
        if let Some(c) = centroid {
            canvas.fill_square(c.x, c.y, self.dot_radius, DOT_COLOR);
        }

        // ── Status bar ────────────────────────────────────────────────────
        canvas.fill_rect(0, self.height, self.width, STATUS_H, TEXT_BG);
        canvas.draw_label(status, 6, self.height + 4, TEXT_COLOR);
        canvas.draw_label("move pointer to play  Q=quit", 6, self.height + 14, LEGEND_COLOR);

        self.window
            .update_with_buffer(canvas.as_slice(), self.width, self.height + STATUS_H)
            .ok();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// 3×5 bitmap font, rows packed top to bottom into 15 bits
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> u16 {
    match c {
        '0'             => 0b111_101_101_101_111,
        '1'             => 0b010_110_010_010_111,
        '2'             => 0b111_001_111_100_111,
        '3'             => 0b111_001_111_001_111,
        '4'             => 0b101_101_111_001_001,
        '5'             => 0b111_100_111_001_111,
        '6'             => 0b111_100_111_101_111,
        '7'             => 0b111_001_001_001_001,
        '8'             => 0b111_101_111_101_111,
        '9'             => 0b111_101_111_001_111,
        'a' | 'A'       => 0b111_101_111_101_101,
        'b' | 'B'       => 0b110_101_110_101_110,
        'c' | 'C'       => 0b111_100_100_100_111,
        'd' | 'D'       => 0b110_101_101_101_110,
        'e' | 'E'       => 0b111_100_111_100_111,
        'f' | 'F'       => 0b111_100_111_100_100,
        'g' | 'G'       => 0b111_100_101_101_111,
        'h' | 'H'       => 0b101_101_111_101_101,
        'i' | 'I'       => 0b111_010_010_010_111,
        'j' | 'J'       => 0b001_001_001_101_111,
        'k' | 'K'       => 0b101_101_110_101_101,
        'l' | 'L'       => 0b100_100_100_100_111,
        'm' | 'M'       => 0b101_111_101_101_101,
        'n' | 'N'       => 0b111_101_101_101_101,
        'o' | 'O'       => 0b111_101_101_101_111,
        'p' | 'P'       => 0b111_101_111_100_100,
        'q' | 'Q'       => 0b111_101_101_111_001,
        'r' | 'R'       => 0b110_101_110_101_101,
        's' | 'S'       => 0b111_100_111_001_111,
        't' | 'T'       => 0b111_010_010_010_010,
        'u' | 'U'       => 0b101_101_101_101_111,
        'v' | 'V'       => 0b101_101_101_010_010,
        'w' | 'W'       => 0b101_101_101_111_101,
        'x' | 'X' | '×' => 0b101_101_010_101_101,
        'y' | 'Y'       => 0b101_101_111_010_010,
        'z' | 'Z'       => 0b111_001_010_100_111,
        '#'             => 0b101_111_101_111_101,
        '('             => 0b010_100_100_100_010,
        ')'             => 0b010_001_001_001_010,
        '/'             => 0b001_001_010_100_100,
        '-' | '–'       => 0b000_000_111_000_000,
        '.'             => 0b000_000_000_000_010,
        ','             => 0b000_000_000_010_100,
        ':'             => 0b000_010_000_010_000,
        '='             => 0b000_111_000_111_000,
        '+'             => 0b000_010_111_010_000,
        ' '             => 0,
        _               => 0b000_000_010_000_000,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::scale_index;

    #[test]
    fn band_bounds_agree_with_scale_index() {
        for width in [2usize, 7, 64, 640] {
            for bands in [1usize, 3, 8, 22] {
                let mut next = 0;
                for b in 0..bands {
                    let (x0, x1) = band_bounds(b, bands, width);
                    assert_eq!(x0, next, "w={} bands={} b={}", width, bands, b);
                    for x in x0..x1 {
                        assert_eq!(scale_index(x, width, bands), b, "w={} bands={} x={}", width, bands, x);
                    }
                    next = x1;
                }
                assert_eq!(next, width);
            }
        }
    }

    #[test]
    fn band_bounds_degenerate() {
        assert_eq!(band_bounds(0, 0, 640), (0, 0));
        assert_eq!(band_bounds(0, 8, 0), (0, 0));
        assert_eq!(band_bounds(0, 8, 1), (0, 1));
        assert_eq!(band_bounds(3, 8, 1), (1, 1));
    }

    #[test]
    fn square_is_clipped_at_corner() {
        let mut c = Canvas::new(10, 10);
        c.fill_square(0, 0, 2, DOT_COLOR);
        assert_eq!(c.pixel(0, 0), Some(DOT_COLOR));
        assert_eq!(c.pixel(2, 2), Some(DOT_COLOR));
        assert_eq!(c.pixel(3, 0), Some(BG_COLOR));
        c.fill_square(9, 9, 3, DOT_COLOR);
        assert_eq!(c.pixel(9, 9), Some(DOT_COLOR));
        assert_eq!(c.pixel(10, 10), None);
    }

    #[test]
    fn raster_pixels_land_in_place() {
        let mut c = Canvas::new(4, 4);
        c.draw_raster(&Raster::from_ascii(&["....", ".#..", "...#"]), FG_COLOR);
        assert_eq!(c.pixel(1, 1), Some(FG_COLOR));
        assert_eq!(c.pixel(3, 2), Some(FG_COLOR));
        assert_eq!(c.pixel(0, 0), Some(BG_COLOR));
    }

    #[test]
    fn active_band_is_filled() {
        let mut c = Canvas::new(64, 4);
        c.draw_bands(8, 64, 4, Some(7));
        assert_eq!(c.pixel(63, 0), Some(BAND_ACTIVE));
        assert_ne!(c.pixel(0, 0), Some(BAND_ACTIVE));
    }

    #[test]
    fn label_draws_sharp_sign() {
        let mut c = Canvas::new(8, 5);
        c.draw_label("#", 0, 0, TEXT_COLOR);
        // middle column of '#' is lit on rows 1 and 3 only
        assert_eq!(c.pixel(1, 0), Some(BG_COLOR));
        assert_eq!(c.pixel(1, 1), Some(TEXT_COLOR));
        assert_eq!(c.pixel(1, 3), Some(TEXT_COLOR));
        assert_eq!(c.pixel(0, 0), Some(TEXT_COLOR));
    }

    #[test]
    fn unknown_glyph_falls_back_to_dot() {
        assert_eq!(char_glyph('♪'), 0b000_000_010_000_000);
        assert_eq!(char_glyph('a'), char_glyph('A'));
    }
}
