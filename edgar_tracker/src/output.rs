//! MIDI output port.
//!
//! [`MidiOut`] abstracts over a real `midir` connection, a null sink for
//! dry runs, and (in tests) an in-memory recorder.  Every send reports failure so a
//! note task can give up on its own without disturbing anything else.

#[cfg(test)]
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::error::{TrackerError, TrackerResult};

const CLIENT_NAME: &str = "edgar_tracker";

// ════════════════════════════════════════════════════════════════════════════
// MidiMessage
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn  { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
}

impl MidiMessage {
    /// Raw 3-byte channel message.
    pub fn to_bytes(self) -> [u8; 3] {
        match self {
            MidiMessage::NoteOn { channel, note, velocity } =>
                [0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::NoteOff { channel, note } =>
                [0x80 | (channel & 0x0F), note & 0x7F, 0],
        }
    }

    pub fn note(self) -> u8 {
        match self {
            MidiMessage::NoteOn { note, .. } | MidiMessage::NoteOff { note, .. } => note,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MidiOut — the output channel
// ════════════════════════════════════════════════════════════════════════════

pub trait MidiOut: Send {
    fn send(&mut self, msg: MidiMessage) -> TrackerResult<()>;

    /// Port name for logs.
    fn name(&self) -> &str;

    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) -> TrackerResult<()> {
        self.send(MidiMessage::NoteOn { channel, note, velocity })
    }

    fn note_off(&mut self, channel: u8, note: u8) -> TrackerResult<()> {
        self.send(MidiMessage::NoteOff { channel, note })
    }
}

// ── midir backend ─────────────────────────────────────────────────────────

struct MidirOut {
    conn: midir::MidiOutputConnection,
    name: String,
}

impl MidiOut for MidirOut {
    fn send(&mut self, msg: MidiMessage) -> TrackerResult<()> {
        self.conn
            .send(&msg.to_bytes())
            .map_err(|e| TrackerError::ChannelSend(format!("{}: {}", self.name, e)))
    }

    fn name(&self) -> &str { &self.name }
}

// ── null backend ──────────────────────────────────────────────────────────

/// Accepts and discards everything.
pub struct NullOut;

impl MidiOut for NullOut {
    fn send(&mut self, msg: MidiMessage) -> TrackerResult<()> {
        debug!("[null] {:?}", msg);
        Ok(())
    }

    fn name(&self) -> &str { "null" }
}

// ── in-memory backend (tests) ─────────────────────────────────────────────

/// Appends every message to a shared log.  With `failing` set, every send
/// is refused instead.
#[cfg(test)]
pub struct RecordingOut {
    log:     Arc<Mutex<Vec<MidiMessage>>>,
    failing: bool,
}

#[cfg(test)]
impl RecordingOut {
    /// The recorder and a handle to read what it received.
    pub fn new() -> (Self, Arc<Mutex<Vec<MidiMessage>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (RecordingOut { log: Arc::clone(&log), failing: false }, log)
    }

    pub fn failing() -> Self {
        RecordingOut { log: Arc::new(Mutex::new(Vec::new())), failing: true }
    }
}

#[cfg(test)]
impl MidiOut for RecordingOut {
    fn send(&mut self, msg: MidiMessage) -> TrackerResult<()> {
        if self.failing {
            return Err(TrackerError::ChannelSend("recording output refuses sends".to_string()));
        }
        self.log
            .lock()
            .map_err(|_| TrackerError::ChannelSend("recording log poisoned".to_string()))?
            .push(msg);
        Ok(())
    }

    fn name(&self) -> &str { "recording" }
}

// ════════════════════════════════════════════════════════════════════════════
// Port discovery
// ════════════════════════════════════════════════════════════════════════════

/// Index of the port called `wanted`: an exact name match first, then the
/// first name containing it (case-insensitive).
pub fn find_port(names: &[String], wanted: &str) -> Option<usize> {
    if let Some(i) = names.iter().position(|n| n == wanted) {
        return Some(i);
    }
    let wanted = wanted.to_lowercase();
    names.iter().position(|n| n.to_lowercase().contains(&wanted))
}

/// Index of the first software synthesiser port, else 0.
pub fn preferred_port(names: &[String]) -> usize {
    names
        .iter()
        .position(|n| {
            let n = n.to_lowercase();
            ["fluid", "timidity", "microsoft", "gm", "synth"].iter().any(|s| n.contains(s))
        })
        .unwrap_or(0)
}

fn midi_output() -> TrackerResult<midir::MidiOutput> {
    midir::MidiOutput::new(CLIENT_NAME).map_err(|e| TrackerError::MidiInit(e.to_string()))
}

fn port_names(midi_out: &midir::MidiOutput, ports: &[midir::MidiOutputPort]) -> Vec<String> {
    ports
        .iter()
        .map(|p| midi_out.port_name(p).unwrap_or_else(|_| "Unknown".to_string()))
        .collect()
}

/// Names of every MIDI output port currently visible.
pub fn list_output_ports() -> TrackerResult<Vec<String>> {
    let midi_out = midi_output()?;
    let ports = midi_out.ports();
    Ok(port_names(&midi_out, &ports))
}

/// Open the output described by `cfg`.
///
/// * `dry_run` → [`NullOut`].
/// * `virtual_port` → a new virtual port named `port_name` (unix).
/// * `port_name` → the matching port, or `PortNotFound`.
/// * neither → a synthesiser if one is visible, the first port otherwise,
///   [`NullOut`] with a warning when there are none.
pub fn open_output(cfg: &TrackerConfig) -> TrackerResult<Box<dyn MidiOut>> {
    if cfg.dry_run {
        info!("dry run: MIDI output disabled");
        return Ok(Box::new(NullOut));
    }

    let midi_out = midi_output()?;

    if cfg.virtual_port {
        let name = cfg.port_name.clone().unwrap_or_else(|| CLIENT_NAME.to_string());
        return open_virtual(midi_out, name);
    }

    let ports = midi_out.ports();
    let names = port_names(&midi_out, &ports);

    let index = match &cfg.port_name {
        Some(wanted) => find_port(&names, wanted).ok_or_else(|| TrackerError::PortNotFound {
            name:      wanted.clone(),
            available: if names.is_empty() { "none".to_string() } else { names.join(", ") },
        })?,
        None if ports.is_empty() => {
            warn!("no MIDI output ports found, notes will be discarded");
            warn!("start a synthesiser (e.g. `fluidsynth` or `timidity -iA`) or pass --virtual");
            return Ok(Box::new(NullOut));
        }
        None => preferred_port(&names),
    };

    let name = names[index].clone();
    let conn = midi_out
        .connect(&ports[index], "edgar-out")
        .map_err(|e| TrackerError::MidiConnect(format!("{}: {}", name, e)))?;
    info!("opened MIDI output port '{}'", name);
    Ok(Box::new(MidirOut { conn, name }))
}

#[cfg(unix)]
fn open_virtual(midi_out: midir::MidiOutput, name: String) -> TrackerResult<Box<dyn MidiOut>> {
    use midir::os::unix::VirtualOutput;

    let conn = midi_out
        .create_virtual(&name)
        .map_err(|e| TrackerError::MidiConnect(format!("virtual port '{}': {}", name, e)))?;
    info!("created virtual MIDI output port '{}'", name);
    Ok(Box::new(MidirOut { conn, name }))
}

#[cfg(not(unix))]
fn open_virtual(_midi_out: midir::MidiOutput, _name: String) -> TrackerResult<Box<dyn MidiOut>> {
    Err(TrackerError::InvalidConfig {
        field:   "virtual_port",
        message: "virtual ports are only available on unix".to_string(),
    })
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn note_on_bytes() {
        let msg = MidiMessage::NoteOn { channel: 0, note: 60, velocity: 60 };
        assert_eq!(msg.to_bytes(), [0x90, 60, 60]);
    }

    #[test]
    fn note_off_bytes_carry_channel() {
        let msg = MidiMessage::NoteOff { channel: 9, note: 36 };
        assert_eq!(msg.to_bytes(), [0x89, 36, 0]);
    }

    #[test]
    fn find_port_prefers_exact_match() {
        let list = names(&["Midi Through Port-0", "in-port 1", "in-port 10"]);
        assert_eq!(find_port(&list, "in-port 1"), Some(1));
        assert_eq!(find_port(&list, "PORT 10"), Some(2));
        assert_eq!(find_port(&list, "loopMIDI"), None);
    }

    #[test]
    fn preferred_port_finds_synth() {
        let list = names(&["Midi Through", "FLUID Synth (1234)"]);
        assert_eq!(preferred_port(&list), 1);
        assert_eq!(preferred_port(&names(&["a", "b"])), 0);
    }

    #[test]
    fn recording_out_keeps_order() {
        let (mut out, log) = RecordingOut::new();
        out.note_on(0, 60, 100).unwrap();
        out.note_off(0, 60).unwrap();
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], MidiMessage::NoteOn { channel: 0, note: 60, velocity: 100 });
        assert_eq!(log[1].note(), 60);
    }

    #[test]
    fn failing_out_reports_send_error() {
        let mut out = RecordingOut::failing();
        assert!(matches!(out.note_on(0, 60, 1), Err(TrackerError::ChannelSend(_))));
    }

    #[test]
    fn dry_run_opens_null_output() {
        let cfg = TrackerConfig { dry_run: true, ..TrackerConfig::default() };
        let out = open_output(&cfg).unwrap();
        assert_eq!(out.name(), "null");
    }
}
