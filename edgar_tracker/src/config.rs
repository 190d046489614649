//! Session configuration.
//!
//! [`TrackerConfig`] is built once, validated before any window or port is
//! opened, and then passed by reference to everything that needs it.  The
//! command line ([`Cli`]) is one way to fill it in; embedders can construct
//! it directly.

use std::time::Duration;

use clap::Parser;
use edgar_scale::{Scale, ScaleBuilder};

use crate::error::{TrackerError, TrackerResult};
use crate::player::OverlapPolicy;

/// Largest octave count accepted; beyond this no scale fits in MIDI range.
pub const MAX_OCTAVES: u32 = 10;

// ════════════════════════════════════════════════════════════════════════════
// TrackerConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct TrackerConfig {
    /// Camera device index.  Carried for the acquisition side.
    pub camera:         u32,
    /// Grey level above which a pixel counts as foreground.
    pub bw_threshold:   u8,
    /// Radius of the tracking dot in the view.  Display only.
    pub dot_radius:     u32,
    /// Minimum centroid movement (pixels, either axis) that retriggers.
    pub note_threshold: u32,
    pub keynote:        String,
    pub octaves:        u32,
    /// Scale name or literal `T`/`S` pattern.
    pub scale:          String,
    /// Output port to open.  `None` picks a synthesiser or the first port.
    pub port_name:      Option<String>,
    /// Create a virtual port named `port_name` instead of connecting.
    pub virtual_port:   bool,
    /// Discard all MIDI output.
    pub dry_run:        bool,
    pub velocity:       u8,
    pub duration:       Duration,
    pub channel:        u8,
    pub overlap:        OverlapPolicy,
    /// Raster size of the simulated camera.
    pub width:          usize,
    pub height:         usize,
    /// Skip the enter-to-continue prompts.
    pub quick:          bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            camera:         0,
            bw_threshold:   127,
            dot_radius:     5,
            note_threshold: 10,
            keynote:        "C4".to_string(),
            octaves:        3,
            scale:          "superlocrian".to_string(),
            port_name:      None,
            virtual_port:   false,
            dry_run:        false,
            velocity:       60,
            duration:       Duration::from_secs(1),
            channel:        0,
            overlap:        OverlapPolicy::Race,
            width:          640,
            height:         480,
            quick:          false,
        }
    }
}

impl TrackerConfig {
    /// Check every value and build the scale.
    ///
    /// Errors name the offending field so they can be reported before any
    /// hardware is touched.
    pub fn validate(&self) -> TrackerResult<Scale> {
        let invalid = |field, message: String| Err(TrackerError::InvalidConfig { field, message });

        if self.velocity > 127 {
            return invalid("velocity", format!("{} is outside 0–127", self.velocity));
        }
        if self.channel > 15 {
            return invalid("channel", format!("{} is outside 0–15", self.channel));
        }
        if self.duration.is_zero() {
            return invalid("duration", "must be longer than zero".to_string());
        }
        if self.width == 0 || self.height == 0 {
            return invalid("width/height", format!("{}×{} raster is empty", self.width, self.height));
        }
        if self.octaves > MAX_OCTAVES {
            return invalid("octaves", format!("{} is more than {}", self.octaves, MAX_OCTAVES));
        }
        if self.virtual_port && self.port_name.is_none() {
            return invalid("port_name", "a virtual port needs a name".to_string());
        }
        if self.virtual_port && !cfg!(unix) {
            return invalid("virtual_port", "virtual ports are only available on unix".to_string());
        }

        let scale = ScaleBuilder::new()
            .keynote(&self.keynote)
            .octaves(self.octaves)
            .pattern(&self.scale)
            .build()?;

        if !scale.fits_midi() {
            log::warn!("scale {} leaves the MIDI range; outer notes will be clamped", scale);
        }
        Ok(scale)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Cli
// ════════════════════════════════════════════════════════════════════════════

/// EDGAR Tracker: trace the movement of an object to play music.
#[derive(Parser, Debug)]
#[command(name = "edgar_tracker", version, about, long_about = None)]
pub struct Cli {
    /// Device id of the camera to use
    #[arg(short, long, default_value_t = 0)]
    pub camera: u32,

    /// Grey-level threshold used to separate moving pixels (0–255)
    #[arg(short, long, default_value_t = 127)]
    pub bw_threshold: u8,

    /// Size of the dot showing the tracked position
    #[arg(short, long, default_value_t = 5)]
    pub dot_radius: u32,

    /// Name of the MIDI output port (default: first synthesiser found)
    #[arg(short, long)]
    pub port_name: Option<String>,

    /// Movement (pixels) needed to trigger a new note
    #[arg(short, long, default_value_t = 10)]
    pub note_threshold: u32,

    /// Key note the scale is centred on, e.g. C4, F#3, Bb2
    #[arg(short, long, default_value = "C4")]
    pub keynote: String,

    /// Number of octaves to be played
    #[arg(short, long, default_value_t = 3)]
    pub octaves: u32,

    /// Scale name (major, minor, hexatonic, superlocrian, …) or pattern like 'TTSTTTS'
    #[arg(short, long, default_value = "superlocrian")]
    pub scale: String,

    /// Note-on velocity (0–127)
    #[arg(long, default_value_t = 60)]
    pub velocity: u8,

    /// Note length in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub duration_ms: u64,

    /// MIDI channel (0–15)
    #[arg(long, default_value_t = 0)]
    pub channel: u8,

    /// What to do when a pitch is retriggered while still sounding
    #[arg(long, value_enum, default_value_t = OverlapPolicy::Race)]
    pub overlap: OverlapPolicy,

    /// Width of the tracking raster
    #[arg(long, default_value_t = 640)]
    pub width: usize,

    /// Height of the tracking raster
    #[arg(long, default_value_t = 480)]
    pub height: usize,

    /// Create a virtual output port named by --port-name (unix only)
    #[arg(long = "virtual")]
    pub virtual_port: bool,

    /// Do not send any MIDI; log notes instead
    #[arg(long)]
    pub dry_run: bool,

    /// List MIDI output ports and exit
    #[arg(long)]
    pub list_ports: bool,

    /// Skip the enter-to-continue prompts
    #[arg(long)]
    pub quick: bool,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn to_config(&self) -> TrackerConfig {
        TrackerConfig {
            camera:         self.camera,
            bw_threshold:   self.bw_threshold,
            dot_radius:     self.dot_radius,
            note_threshold: self.note_threshold,
            keynote:        self.keynote.clone(),
            octaves:        self.octaves,
            scale:          self.scale.clone(),
            port_name:      self.port_name.clone(),
            virtual_port:   self.virtual_port,
            dry_run:        self.dry_run,
            velocity:       self.velocity,
            duration:       Duration::from_millis(self.duration_ms),
            channel:        self.channel,
            overlap:        self.overlap,
            width:          self.width,
            height:         self.height,
            quick:          self.quick,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["edgar_tracker"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn cli_defaults_match_config_defaults() {
        assert_eq!(parse(&[]).to_config(), TrackerConfig::default());
    }

    #[test]
    fn cli_short_flags() {
        let cfg = parse(&["-c", "2", "-b", "90", "-d", "8", "-p", "in-port 1",
                          "-n", "25", "-k", "A3", "-o", "2", "-s", "major"]).to_config();
        assert_eq!(cfg.camera, 2);
        assert_eq!(cfg.bw_threshold, 90);
        assert_eq!(cfg.dot_radius, 8);
        assert_eq!(cfg.port_name.as_deref(), Some("in-port 1"));
        assert_eq!(cfg.note_threshold, 25);
        assert_eq!(cfg.keynote, "A3");
        assert_eq!(cfg.octaves, 2);
        assert_eq!(cfg.scale, "major");
    }

    #[test]
    fn cli_long_flags() {
        let cfg = parse(&["--duration-ms", "250", "--overlap", "extend", "--virtual",
                          "--port-name", "edgar", "--channel", "9"]).to_config();
        assert_eq!(cfg.duration, Duration::from_millis(250));
        assert_eq!(cfg.overlap, OverlapPolicy::Extend);
        assert!(cfg.virtual_port);
        assert_eq!(cfg.channel, 9);
    }

    #[test]
    fn cli_rejects_out_of_range_threshold() {
        assert!(Cli::try_parse_from(["edgar_tracker", "-b", "300"]).is_err());
    }

    #[test]
    fn default_config_validates() {
        let scale = TrackerConfig::default().validate().unwrap();
        assert_eq!(scale.len(), 22);
    }

    #[test]
    fn bad_keynote_is_reported() {
        let cfg = TrackerConfig { keynote: "Q4".into(), ..TrackerConfig::default() };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("Q4"), "{}", err);
    }

    #[test]
    fn bad_scale_is_reported() {
        let cfg = TrackerConfig { scale: "TTX".into(), ..TrackerConfig::default() };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("TTX"), "{}", err);
    }

    #[test]
    fn range_checks_name_the_field() {
        let cases = [
            TrackerConfig { velocity: 128, ..TrackerConfig::default() },
            TrackerConfig { channel: 16, ..TrackerConfig::default() },
            TrackerConfig { duration: Duration::ZERO, ..TrackerConfig::default() },
            TrackerConfig { width: 0, ..TrackerConfig::default() },
            TrackerConfig { octaves: 11, ..TrackerConfig::default() },
        ];
        for cfg in cases {
            assert!(matches!(cfg.validate(), Err(TrackerError::InvalidConfig { .. })), "{:?}", cfg);
        }
    }

    #[test]
    fn virtual_port_needs_a_name() {
        let cfg = TrackerConfig { virtual_port: true, ..TrackerConfig::default() };
        assert!(matches!(cfg.validate(), Err(TrackerError::InvalidConfig { field: "port_name", .. })));
    }
}
