//! Fire-and-forget note playback.
//!
//! Every triggered note runs on its own thread: note-on, sleep for the note
//! length, note-off.  The tracking loop never waits on a note.  Threads share
//! the output port behind a mutex that is held for one send at a time, and
//! report how they ended over a channel the loop drains each frame.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use clap::ValueEnum;
use log::{debug, error, warn};

use crate::error::{TrackerError, TrackerResult};
use crate::output::{MidiMessage, MidiOut};

/// The port, shared by every note thread.
pub type SharedOutput = Arc<Mutex<Box<dyn MidiOut>>>;

// ════════════════════════════════════════════════════════════════════════════
// OverlapPolicy
// ════════════════════════════════════════════════════════════════════════════

/// What happens when a pitch is triggered while an earlier note on the same
/// pitch is still sounding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OverlapPolicy {
    /// Each note sends its own note-off; the earlier one may cut the later
    /// one short.
    #[default]
    Race,
    /// The new trigger is dropped.
    Reject,
    /// The note is struck again and only the last overlapping note sends
    /// the note-off.
    Extend,
}

// ════════════════════════════════════════════════════════════════════════════
// NoteEvent / NoteOutcome
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteEvent {
    pub pitch:    u8,
    pub velocity: u8,
    pub channel:  u8,
    pub duration: Duration,
}

impl NoteEvent {
    /// Clamp a scale pitch into the MIDI note range.
    pub fn from_pitch(pitch: i32, velocity: u8, channel: u8, duration: Duration) -> Self {
        let clamped = pitch.clamp(0, 127);
        if clamped != pitch {
            warn!("pitch {} outside MIDI range, playing {}", pitch, clamped);
        }
        NoteEvent { pitch: clamped as u8, velocity, channel, duration }
    }
}

/// How a note thread finished.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NoteOutcome {
    /// Note-on and note-off were both sent.
    Played(NoteEvent),
    /// Note-on was sent; a later overlapping note owns the note-off.
    Extended(NoteEvent),
    Failed { event: NoteEvent, reason: String },
}

// ════════════════════════════════════════════════════════════════════════════
// NotePlayer
// ════════════════════════════════════════════════════════════════════════════

/// Spawns note threads and collects their outcomes.
pub struct NotePlayer {
    output:  SharedOutput,
    /// Sounding note count per pitch.
    voices:  Arc<Mutex<HashMap<u8, usize>>>,
    /// Threads that have not yet reported an outcome.
    pending: Arc<AtomicUsize>,
    policy:  OverlapPolicy,
    done_tx: Sender<NoteOutcome>,
    done_rx: Receiver<NoteOutcome>,
}

impl NotePlayer {
    pub fn new(output: Box<dyn MidiOut>, policy: OverlapPolicy) -> Self {
        let (done_tx, done_rx) = mpsc::channel();
        NotePlayer {
            output: Arc::new(Mutex::new(output)),
            voices: Arc::new(Mutex::new(HashMap::new())),
            pending: Arc::new(AtomicUsize::new(0)),
            policy,
            done_tx,
            done_rx,
        }
    }

    pub fn policy(&self) -> OverlapPolicy { self.policy }

    /// Start `event` on its own thread.  Returns `false` when the overlap
    /// policy turned it away.
    pub fn play(&self, event: NoteEvent) -> bool {
        if !self.claim(event.pitch) {
            debug!("pitch {} still sounding, trigger dropped", event.pitch);
            return false;
        }

        let output  = Arc::clone(&self.output);
        let voices  = Arc::clone(&self.voices);
        let pending = Arc::clone(&self.pending);
        let done_tx = self.done_tx.clone();
        let policy  = self.policy;

        pending.fetch_add(1, Ordering::SeqCst);
        thread::spawn(move || {
            let outcome = run_note(&output, &voices, policy, event);
            if let NoteOutcome::Failed { reason, .. } = &outcome {
                error!("note {} failed: {}", event.pitch, reason);
            }
            // The player may be gone already; nothing left to tell.
            let _ = done_tx.send(outcome);
            pending.fetch_sub(1, Ordering::SeqCst);
        });
        true
    }

    /// Count a new voice on `pitch` unless the policy forbids it.
    fn claim(&self, pitch: u8) -> bool {
        let mut voices = self.voices.lock().unwrap_or_else(PoisonError::into_inner);
        let sounding = voices.entry(pitch).or_insert(0);
        if self.policy == OverlapPolicy::Reject && *sounding > 0 {
            return false;
        }
        *sounding += 1;
        true
    }

    /// Number of notes currently between note-on and note-off.
    pub fn in_flight(&self) -> usize {
        self.voices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    /// Outcomes reported since the last call (non-blocking).
    pub fn drain_outcomes(&self) -> Vec<NoteOutcome> {
        self.done_rx.try_iter().collect()
    }

    /// Wait up to `timeout` for the next outcome.
    pub fn recv_outcome(&self, timeout: Duration) -> Option<NoteOutcome> {
        self.done_rx.recv_timeout(timeout).ok()
    }

    /// Collect outcomes until every note thread has finished or `timeout`
    /// passes.  Used on shutdown so notes are not left hanging on the
    /// synthesiser.
    pub fn settle(&self, timeout: Duration) -> Vec<NoteOutcome> {
        let deadline = Instant::now() + timeout;
        let mut outcomes = self.drain_outcomes();
        while self.pending.load(Ordering::SeqCst) > 0 {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                warn!("{} notes still sounding at shutdown", self.in_flight());
                break;
            }
            if let Some(o) = self.recv_outcome(left.min(Duration::from_millis(50))) {
                outcomes.push(o);
            }
        }
        outcomes.extend(self.drain_outcomes());
        outcomes
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Note thread body
// ════════════════════════════════════════════════════════════════════════════

fn send(output: &SharedOutput, msg: MidiMessage) -> TrackerResult<()> {
    let mut port = output
        .lock()
        .map_err(|_| TrackerError::ChannelSend("output lock poisoned".to_string()))?;
    port.send(msg)
}

/// Drop one voice on `pitch`; returns how many are still sounding.
fn release(voices: &Mutex<HashMap<u8, usize>>, pitch: u8) -> usize {
    let mut voices = voices.lock().unwrap_or_else(PoisonError::into_inner);
    let remaining = match voices.get_mut(&pitch) {
        Some(n) => {
            *n = n.saturating_sub(1);
            *n
        }
        None => 0,
    };
    if remaining == 0 {
        voices.remove(&pitch);
    }
    remaining
}

fn run_note(
    output: &SharedOutput,
    voices: &Mutex<HashMap<u8, usize>>,
    policy: OverlapPolicy,
    event:  NoteEvent,
) -> NoteOutcome {
    let on = MidiMessage::NoteOn {
        channel:  event.channel,
        note:     event.pitch,
        velocity: event.velocity,
    };
    if let Err(e) = send(output, on) {
        release(voices, event.pitch);
        return NoteOutcome::Failed { event, reason: e.to_string() };
    }

    thread::sleep(event.duration);

    let remaining = release(voices, event.pitch);
    if policy == OverlapPolicy::Extend && remaining > 0 {
        return NoteOutcome::Extended(event);
    }

    match send(output, MidiMessage::NoteOff { channel: event.channel, note: event.pitch }) {
        Ok(())  => NoteOutcome::Played(event),
        Err(e)  => NoteOutcome::Failed { event, reason: e.to_string() },
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::RecordingOut;

    const WAIT: Duration = Duration::from_secs(5);

    fn note(pitch: u8, ms: u64) -> NoteEvent {
        NoteEvent { pitch, velocity: 60, channel: 0, duration: Duration::from_millis(ms) }
    }

    fn messages(log: &Arc<Mutex<Vec<MidiMessage>>>) -> Vec<MidiMessage> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn from_pitch_clamps() {
        let d = Duration::from_millis(1);
        assert_eq!(NoteEvent::from_pitch(-12, 60, 0, d).pitch, 0);
        assert_eq!(NoteEvent::from_pitch(140, 60, 0, d).pitch, 127);
        assert_eq!(NoteEvent::from_pitch(64, 60, 0, d).pitch, 64);
    }

    #[test]
    fn plays_note_on_then_off() {
        let (out, log) = RecordingOut::new();
        let player = NotePlayer::new(Box::new(out), OverlapPolicy::Race);

        assert!(player.play(note(60, 20)));
        let outcomes = player.settle(WAIT);

        assert_eq!(outcomes, vec![NoteOutcome::Played(note(60, 20))]);
        assert_eq!(messages(&log), vec![
            MidiMessage::NoteOn  { channel: 0, note: 60, velocity: 60 },
            MidiMessage::NoteOff { channel: 0, note: 60 },
        ]);
        assert_eq!(player.in_flight(), 0);
    }

    #[test]
    fn play_does_not_block() {
        let (out, _log) = RecordingOut::new();
        let player = NotePlayer::new(Box::new(out), OverlapPolicy::Race);

        let start = Instant::now();
        player.play(note(60, 300));
        assert!(start.elapsed() < Duration::from_millis(250));
        assert_eq!(player.in_flight(), 1);
        player.settle(WAIT);
    }

    #[test]
    fn overlapping_notes_both_sound() {
        let (out, log) = RecordingOut::new();
        let player = NotePlayer::new(Box::new(out), OverlapPolicy::Race);

        player.play(note(60, 60));
        player.play(note(64, 60));
        assert_eq!(player.in_flight(), 2);

        let outcomes = player.settle(WAIT);
        assert_eq!(outcomes.len(), 2);
        let offs = messages(&log).iter().filter(|m| matches!(m, MidiMessage::NoteOff { .. })).count();
        assert_eq!(offs, 2);
    }

    #[test]
    fn race_sends_a_note_off_per_trigger() {
        let (out, log) = RecordingOut::new();
        let player = NotePlayer::new(Box::new(out), OverlapPolicy::Race);

        player.play(note(62, 40));
        player.play(note(62, 40));
        player.settle(WAIT);

        let offs = messages(&log).iter().filter(|m| matches!(m, MidiMessage::NoteOff { .. })).count();
        assert_eq!(offs, 2);
    }

    #[test]
    fn reject_drops_retrigger() {
        let (out, log) = RecordingOut::new();
        let player = NotePlayer::new(Box::new(out), OverlapPolicy::Reject);

        assert!(player.play(note(62, 100)));
        assert!(!player.play(note(62, 100)));
        assert!(player.play(note(64, 100)));
        player.settle(WAIT);

        let ons = messages(&log).iter().filter(|m| matches!(m, MidiMessage::NoteOn { .. })).count();
        assert_eq!(ons, 2);
    }

    #[test]
    fn extend_leaves_note_off_to_the_last_note() {
        let (out, log) = RecordingOut::new();
        let player = NotePlayer::new(Box::new(out), OverlapPolicy::Extend);

        player.play(note(62, 50));
        thread::sleep(Duration::from_millis(10));
        player.play(note(62, 150));
        let outcomes = player.settle(WAIT);

        assert!(outcomes.contains(&NoteOutcome::Extended(note(62, 50))));
        assert!(outcomes.contains(&NoteOutcome::Played(note(62, 150))));
        let log = messages(&log);
        let offs = log.iter().filter(|m| matches!(m, MidiMessage::NoteOff { .. })).count();
        assert_eq!(offs, 1);
        assert!(matches!(log.last(), Some(MidiMessage::NoteOff { note: 62, .. })));
    }

    #[test]
    fn send_failure_stays_local() {
        let player = NotePlayer::new(Box::new(RecordingOut::failing()), OverlapPolicy::Race);

        assert!(player.play(note(60, 10)));
        let outcome = player.recv_outcome(WAIT).unwrap();
        assert!(matches!(outcome, NoteOutcome::Failed { .. }));
        assert_eq!(player.in_flight(), 0);

        // the player keeps accepting notes
        assert!(player.play(note(61, 10)));
        assert!(player.recv_outcome(WAIT).is_some());
    }
}
