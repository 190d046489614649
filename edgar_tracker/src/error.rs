//! Error type shared by the tracker application.

use edgar_motion::MotionError;
use edgar_scale::ScaleError;
use thiserror::Error;

pub type TrackerResult<T> = Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// Keynote or scale selector could not be turned into a scale.
    #[error("invalid configuration: {0}")]
    Scale(#[from] ScaleError),

    /// A configuration value is outside its accepted range.
    #[error("invalid configuration value for {field}: {message}")]
    InvalidConfig {
        field:   &'static str,
        message: String,
    },

    /// The acquisition side broke its contract (e.g. frame size changed).
    #[error("frame error: {0}")]
    Motion(#[from] MotionError),

    #[error("MIDI initialisation failed: {0}")]
    MidiInit(String),

    #[error("MIDI output port '{name}' not found (available: {available})")]
    PortNotFound {
        name:      String,
        available: String,
    },

    #[error("could not connect to MIDI output: {0}")]
    MidiConnect(String),

    /// Sending on the output channel failed; local to one note.
    #[error("failed to send on MIDI output: {0}")]
    ChannelSend(String),

    #[error("window error: {0}")]
    Window(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
