//! Tracking session and the main loop.
//!
//! [`Session`] owns everything that lives for one run: the scale, the
//! motion locator, the trigger and its state, and the note player.  Each
//! frame goes through [`Session::step`]; [`run`] wires a frame source and
//! the view window around it.

use std::io::{self, Write};
use std::sync::mpsc;
use std::time::Duration;

use edgar_motion::{Centroid, FullScan, MotionLocator, Raster};
use edgar_scale::{note_name, Scale};
use log::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::error::TrackerResult;
use crate::output::{open_output, MidiOut};
use crate::player::{NoteEvent, NoteOutcome, NotePlayer, OverlapPolicy};
use crate::source::{FrameSource, SimFrameSource};
use crate::trigger::{NoteTrigger, TrackerState, Trigger};
use crate::visualizer::Visualizer;

/// Extra time granted to sounding notes on shutdown.
const SETTLE_GRACE: Duration = Duration::from_millis(250);

// ════════════════════════════════════════════════════════════════════════════
// StepOutcome
// ════════════════════════════════════════════════════════════════════════════

/// What one frame did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    /// Centroid of change in this frame, if any pixel differed.
    pub centroid: Option<Centroid>,
    /// Position the tracker holds after this frame.
    pub tracked:  Centroid,
    pub fired:    Option<Trigger>,
    /// A note was started (the overlap policy may turn a trigger away).
    pub played:   bool,
}

// ════════════════════════════════════════════════════════════════════════════
// Session
// ════════════════════════════════════════════════════════════════════════════

pub struct Session {
    // ── immutable for the run ────────────────────────────────────────────
    scale:      Scale,
    background: Raster,
    locator:    Box<dyn MotionLocator>,
    trigger:    NoteTrigger,
    velocity:   u8,
    channel:    u8,
    duration:   Duration,

    // ── per-frame state ──────────────────────────────────────────────────
    state:      TrackerState,
    player:     NotePlayer,
    last:       Option<Trigger>,
    frames:     u64,
    notes:      u64,
    failures:   u64,

    pub status: String,
}

impl Session {
    pub fn new(cfg: &TrackerConfig, scale: Scale, background: Raster, output: Box<dyn MidiOut>) -> Self {
        let trigger = NoteTrigger::new(cfg.note_threshold, background.width());
        let status  = format!("ready  {}", scale);
        Session {
            scale,
            background,
            locator:  Box::new(FullScan),
            trigger,
            velocity: cfg.velocity,
            channel:  cfg.channel,
            duration: cfg.duration,
            state:    TrackerState::new(),
            player:   NotePlayer::new(output, cfg.overlap),
            last:     None,
            frames:   0,
            notes:    0,
            failures: 0,
            status,
        }
    }

    /// Swap the centroid strategy.
    pub fn with_locator(mut self, locator: Box<dyn MotionLocator>) -> Self {
        self.locator = locator;
        self
    }

    /// Process one frame: locate, decide, and start a note if triggered.
    ///
    /// A frame whose size differs from the background is an error and ends
    /// the session.
    pub fn step(&mut self, frame: &Raster) -> TrackerResult<StepOutcome> {
        self.frames += 1;
        let centroid = self.locator.locate(&self.background, frame)?;
        let fired    = self.state.advance(centroid, &self.trigger, &self.scale);

        let mut played = false;
        if let Some(t) = fired {
            let event = NoteEvent::from_pitch(t.pitch, self.velocity, self.channel, self.duration);
            played = self.player.play(event);
            if played {
                self.notes += 1;
            }
            debug!(
                "frame {}: centroid {:?} → degree {} pitch {}{}",
                self.frames, centroid, t.index, t.pitch,
                if played { "" } else { " (skipped)" },
            );
            self.last   = Some(t);
            self.status = format!(
                "note {} ({})  degree {}/{}  at {},{}",
                note_name(t.pitch), t.pitch, t.index + 1, self.scale.len(),
                self.state.previous().x, self.state.previous().y,
            );
        }

        Ok(StepOutcome { centroid, tracked: self.state.previous(), fired, played })
    }

    /// Collect finished notes.  Called once per frame.
    pub fn tick(&mut self) -> Vec<NoteOutcome> {
        let outcomes = self.player.drain_outcomes();
        let failed = outcomes.iter().filter(|o| matches!(o, NoteOutcome::Failed { .. })).count();
        if failed > 0 {
            self.failures += failed as u64;
            self.status = format!("{} note(s) failed to send", self.failures);
        }
        outcomes
    }

    /// Let sounding notes finish, then report totals.
    pub fn shutdown(self) -> Vec<NoteOutcome> {
        let outcomes = self.player.settle(self.duration + SETTLE_GRACE);
        info!(
            "session ended: {} frames, {} notes, {} failed",
            self.frames, self.notes,
            self.failures + outcomes.iter().filter(|o| matches!(o, NoteOutcome::Failed { .. })).count() as u64,
        );
        outcomes
    }

    // ── Accessors for the render loop ─────────────────────────────────────

    pub fn scale(&self)        -> &Scale           { &self.scale }
    pub fn locator_name(&self) -> &'static str     { self.locator.name() }
    pub fn policy(&self)       -> OverlapPolicy    { self.player.policy() }
    pub fn tracked(&self)      -> Centroid         { self.state.previous() }
    pub fn last_trigger(&self) -> Option<Trigger>  { self.last }
    pub fn in_flight(&self)    -> usize            { self.player.in_flight() }
    pub fn notes_played(&self) -> u64              { self.notes }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

fn wait_for_enter(prompt: &str) -> TrackerResult<()> {
    print!("  {} ", prompt);
    io::stdout().flush()?;
    let mut buf = String::new();
    io::stdin().read_line(&mut buf)?;
    Ok(())
}

/// Run a tracking session until the window closes or the source ends.
///
/// `scale` is the one built by [`TrackerConfig::validate`]; the output port
/// is opened only after that has succeeded.
pub fn run(cfg: &TrackerConfig, scale: Scale) -> TrackerResult<()> {
    let output = open_output(cfg)?;

    // ── Frame source ──────────────────────────────────────────────────────
    let (sim_tx, sim_rx) = mpsc::channel();
    let mut source = SimFrameSource::new(sim_rx, cfg.width, cfg.height, cfg.bw_threshold);
    info!(
        "camera {}: simulated {}×{} source, threshold {}",
        cfg.camera, cfg.width, cfg.height, cfg.bw_threshold,
    );

    if !cfg.quick {
        wait_for_enter("Press enter to choose the background")?;
    }
    let background = source.capture_background()?;
    info!("background captured ({} foreground pixels)", background.foreground_count());

    if !cfg.quick {
        wait_for_enter("Press enter to start the tracking")?;
    }

    let mut session = Session::new(cfg, scale, background, output);
    let mut vis = Visualizer::new(source.dims(), cfg.dot_radius as usize, sim_tx)?;
    info!(
        "tracking with {} locator, overlap {:?}; move the pointer in the window, Q to quit",
        session.locator_name(),
        session.policy(),
    );

    // ── Main loop ─────────────────────────────────────────────────────────
    while vis.is_open() {
        if !vis.poll_input() { break; }

        let frame = match source.capture_frame()? {
            Some(f) => f,
            None    => {
                warn!("frame source ended");
                break;
            }
        };

        let step = session.step(&frame)?;
        session.tick();

        vis.render(
            &frame,
            step.centroid,
            session.scale().len(),
            session.last_trigger().map(|t| t.index),
            &format!("{}  sounding {}", session.status, session.in_flight()),
        );
    }

    session.shutdown();
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
