//! # edgar_tracker
//!
//! Follows a moving object across a fixed background and plays a note each
//! time it moves far enough.  The horizontal position picks the degree of a
//! scale built once at startup; notes go out over a MIDI output port.
//!
//! ## Frame → note
//!
//! | Stage | Module | Does |
//! |---|---|---|
//! | Acquire | [`source`] | one background raster, then one raster per frame |
//! | Locate | `edgar_motion` | centroid of pixels that differ from the background |
//! | Decide | [`trigger`] | fires when the centroid moved more than the threshold on either axis |
//! | Map | [`trigger`] | column → scale degree, leftmost lowest, rightmost highest |
//! | Play | [`player`] | note-on, wait, note-off on its own thread |
//! | Emit | [`output`] | `midir` port, virtual port, or null sink |
//!
//! [`app::Session`] ties the stages together and [`app::run`] drives it from
//! the simulated camera and the [`visualizer`] window.
//!
//! ## Window controls
//!
//! | Input | Action |
//! |---|---|
//! | Mouse over the view | moves the simulated object |
//! | Mouse off the view | object leaves the scene |
//! | `Q` / `Escape` | Quit |

pub mod config;
pub mod error;
pub mod trigger;
pub mod output;
pub mod player;
pub mod source;
pub mod visualizer;
pub mod app;

pub use config::{Cli, TrackerConfig};
pub use error::{TrackerError, TrackerResult};
