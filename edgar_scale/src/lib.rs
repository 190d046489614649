//! # edgar_scale
//!
//! Build the ordered array of MIDI pitches a tracker session may play.
//!
//! A scale is described by three things:
//!
//! * a **keynote** such as `C4`, `F#3` or `Bb2`, which becomes the pitch the
//!   scale is centred on,
//! * an **octave count**, the number of times the interval pattern is walked,
//! * an **interval pattern** over `T` (whole step, 2 semitones) and `S`
//!   (half step, 1 semitone), either literal (`"TTSTTTS"`) or named
//!   (`"major"`).
//!
//! ## Quick start
//!
//! ```rust
//! use edgar_scale::ScaleBuilder;
//!
//! let scale = ScaleBuilder::new()
//!     .keynote("C4")
//!     .octaves(1)
//!     .pattern("major")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(scale.pitches(), &[60, 62, 64, 65, 67, 69, 71, 72]);
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

/// Result type for scale construction.
pub type ScaleResult<T> = Result<T, ScaleError>;

/// Errors raised while parsing a keynote or an interval pattern.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScaleError {
    /// The keynote string is not `<A-G>[accidental][0-9]`.
    #[error("invalid note name '{name}': {reason}")]
    InvalidNoteName {
        /// The rejected input.
        name: String,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// The selector is neither a known scale name nor a `T`/`S` string.
    #[error("invalid scale pattern '{pattern}': expected one of [{known}] or a string of T and S")]
    InvalidScalePattern {
        /// The rejected input.
        pattern: String,
        /// Comma-separated list of the recognised names.
        known: String,
    },
}

// ════════════════════════════════════════════════════════════════════════════
// Keynote
// ════════════════════════════════════════════════════════════════════════════

/// Semitones per octave.
pub const OCTAVE: i32 = 12;

/// Highest valid MIDI note number.
pub const MIDI_MAX: i32 = 127;

/// Accidental attached to a keynote letter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Accidental {
    Natural,
    Sharp,
    Flat,
}

impl Accidental {
    fn offset(self) -> i32 {
        match self {
            Accidental::Natural => 0,
            Accidental::Sharp   => 1,
            Accidental::Flat    => -1,
        }
    }
}

/// A parsed note name: letter, optional accidental, optional octave digit.
///
/// Without an octave digit the note sits in octave `-1`, i.e. its value is
/// the bare letter offset (`C` = 0 … `B` = 11).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Keynote {
    pub letter:     char,
    pub accidental: Accidental,
    pub octave:     Option<u8>,
}

/// Semitone offset of a natural note letter within its octave.
fn letter_offset(letter: char) -> Option<i32> {
    match letter {
        'C' => Some(0),
        'D' => Some(2),
        'E' => Some(4),
        'F' => Some(5),
        'G' => Some(7),
        'A' => Some(9),
        'B' => Some(11),
        _   => None,
    }
}

impl Keynote {
    /// MIDI semitone number, with octave `n` starting at `(n + 1) * 12`.
    ///
    /// ```rust
    /// use edgar_scale::Keynote;
    ///
    /// assert_eq!("C4".parse::<Keynote>().unwrap().semitone(), 60);
    /// assert_eq!("A4".parse::<Keynote>().unwrap().semitone(), 69);
    /// assert_eq!("Bb3".parse::<Keynote>().unwrap().semitone(), 58);
    /// ```
    pub fn semitone(&self) -> i32 {
        // letter is validated on construction
        let base   = letter_offset(self.letter).unwrap_or(0);
        let octave = self.octave.map(|o| (o as i32 + 1) * OCTAVE).unwrap_or(0);
        base + self.accidental.offset() + octave
    }
}

impl FromStr for Keynote {
    type Err = ScaleError;

    fn from_str(s: &str) -> ScaleResult<Self> {
        let invalid = |reason| ScaleError::InvalidNoteName { name: s.to_string(), reason };
        let chars: Vec<char> = s.trim().chars().collect();

        let (&letter, rest) = chars.split_first().ok_or_else(|| invalid("empty note name"))?;
        if letter_offset(letter).is_none() {
            return Err(invalid("note letter must be one of A–G"));
        }

        let digit = |c: char| {
            c.to_digit(10)
                .map(|d| d as u8)
                .ok_or_else(|| invalid("octave must be a single digit 0–9"))
        };
        // Any marker other than '#' in front of the octave flattens.
        let accidental = |c: char| if c == '#' { Accidental::Sharp } else { Accidental::Flat };

        let (accidental, octave) = match *rest {
            []                          => (Accidental::Natural, None),
            [c] if c == '#' || c == 'b' => (accidental(c), None),
            [c]                         => (Accidental::Natural, Some(digit(c)?)),
            [a, c]                      => (accidental(a), Some(digit(c)?)),
            _ => return Err(invalid("expected <letter>[accidental][octave]")),
        };

        Ok(Keynote { letter, accidental, octave })
    }
}

impl fmt::Display for Keynote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter)?;
        match self.accidental {
            Accidental::Sharp   => write!(f, "#")?,
            Accidental::Flat    => write!(f, "b")?,
            Accidental::Natural => {}
        }
        if let Some(o) = self.octave {
            write!(f, "{}", o)?;
        }
        Ok(())
    }
}

/// Human-readable name of a MIDI semitone number, using sharps (`61` → `C#4`).
pub fn note_name(pitch: i32) -> String {
    const NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    let degree = pitch.rem_euclid(OCTAVE) as usize;
    let octave = pitch.div_euclid(OCTAVE) - 1;
    format!("{}{}", NAMES[degree], octave)
}

// ════════════════════════════════════════════════════════════════════════════
// IntervalPattern
// ════════════════════════════════════════════════════════════════════════════

/// One step of an interval pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// `T`: whole tone, 2 semitones.
    Whole,
    /// `S`: semitone.
    Half,
}

impl Step {
    pub fn semitones(self) -> i32 {
        match self {
            Step::Whole => 2,
            Step::Half  => 1,
        }
    }

    fn symbol(self) -> char {
        match self {
            Step::Whole => 'T',
            Step::Half  => 'S',
        }
    }
}

/// Scale names accepted in place of a literal pattern.
pub const NAMED_PATTERNS: &[(&str, &str)] = &[
    ("major",        "TTSTTTS"),
    ("minor",        "TSTTSTT"),
    ("hexatonic",    "TTTTTT"),
    ("superlocrian", "STSTTTT"),
    ("dorian",       "TSTTTST"),
    ("phrygian",     "STTTSTT"),
    ("lydian",       "TTTSTTS"),
    ("mixolydian",   "TTSTTST"),
    ("locrian",      "STTSTTT"),
    ("chromatic",    "SSSSSSSSSSSS"),
];

/// A cyclic sequence of whole and half steps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntervalPattern {
    /// Name the pattern was selected by, or `"custom"` for a literal.
    pub name:  String,
    pub steps: Vec<Step>,
}

impl IntervalPattern {
    /// Resolve a selector: a name from [`NAMED_PATTERNS`] (case-insensitive)
    /// or a literal, non-empty string of `T` and `S`.
    pub fn resolve(selector: &str) -> ScaleResult<Self> {
        let trimmed = selector.trim();
        let lowered = trimmed.to_ascii_lowercase();

        if let Some((name, literal)) = NAMED_PATTERNS.iter().find(|(n, _)| *n == lowered) {
            return Ok(IntervalPattern { name: name.to_string(), steps: parse_steps(literal) });
        }

        if !trimmed.is_empty() && trimmed.chars().all(|c| c == 'T' || c == 'S') {
            return Ok(IntervalPattern { name: "custom".to_string(), steps: parse_steps(trimmed) });
        }

        Err(ScaleError::InvalidScalePattern {
            pattern: selector.to_string(),
            known:   NAMED_PATTERNS.iter().map(|(n, _)| *n).collect::<Vec<_>>().join(", "),
        })
    }

    /// Number of steps in one cycle.
    pub fn len(&self) -> usize { self.steps.len() }
    pub fn is_empty(&self) -> bool { self.steps.is_empty() }

    /// Semitones covered by one full cycle.
    pub fn span(&self) -> i32 {
        self.steps.iter().map(|s| s.semitones()).sum()
    }

    /// The pattern written back as `T`/`S` symbols.
    pub fn literal(&self) -> String {
        self.steps.iter().map(|s| s.symbol()).collect()
    }
}

/// Caller guarantees `literal` only holds `T` and `S`.
fn parse_steps(literal: &str) -> Vec<Step> {
    literal
        .chars()
        .map(|c| if c == 'T' { Step::Whole } else { Step::Half })
        .collect()
}

impl FromStr for IntervalPattern {
    type Err = ScaleError;
    fn from_str(s: &str) -> ScaleResult<Self> { IntervalPattern::resolve(s) }
}

// ════════════════════════════════════════════════════════════════════════════
// Scale
// ════════════════════════════════════════════════════════════════════════════

/// How far below the keynote the scale starts: `12 * round(octaves / 2)`,
/// rounding halves to even (1 → 0, 3 → 24, 5 → 24, 7 → 48).
pub fn centering_offset(octaves: u32) -> i32 {
    let half = octaves / 2;
    let rounded = if octaves % 2 == 1 && half % 2 == 1 { half + 1 } else { half };
    rounded as i32 * OCTAVE
}

/// Immutable, strictly increasing pitch array.
///
/// Length is always `pattern.len() * octaves + 1`, so a scale is never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scale {
    pitches: Vec<i32>,
    keynote: Keynote,
    octaves: u32,
    pattern: IntervalPattern,
}

impl Scale {
    /// Walk `pattern` `octaves` times starting from the centred keynote.
    pub fn build(keynote: Keynote, octaves: u32, pattern: IntervalPattern) -> Self {
        let steps = pattern.len() * octaves as usize;
        let mut pitches = Vec::with_capacity(steps + 1);

        let mut current = keynote.semitone() - centering_offset(octaves);
        pitches.push(current);
        for step in pattern.steps.iter().cycle().take(steps) {
            current += step.semitones();
            pitches.push(current);
        }

        Scale { pitches, keynote, octaves, pattern }
    }

    pub fn pitches(&self) -> &[i32] { &self.pitches }
    pub fn len(&self) -> usize { self.pitches.len() }
    pub fn is_empty(&self) -> bool { self.pitches.is_empty() }
    pub fn get(&self, index: usize) -> Option<i32> { self.pitches.get(index).copied() }
    pub fn keynote(&self) -> Keynote { self.keynote }
    pub fn octaves(&self) -> u32 { self.octaves }
    pub fn pattern(&self) -> &IntervalPattern { &self.pattern }

    /// Lowest and highest pitch.
    pub fn range(&self) -> (i32, i32) {
        let lo = self.pitches.first().copied().unwrap_or(0);
        let hi = self.pitches.last().copied().unwrap_or(0);
        (lo, hi)
    }

    /// True when every pitch fits in a MIDI data byte.
    pub fn fits_midi(&self) -> bool {
        let (lo, hi) = self.range();
        lo >= 0 && hi <= MIDI_MAX
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (lo, hi) = self.range();
        write!(
            f,
            "{} {} ({}) × {} oct: {}–{} ({} notes)",
            self.keynote,
            self.pattern.name,
            self.pattern.literal(),
            self.octaves,
            note_name(lo),
            note_name(hi),
            self.len(),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ScaleBuilder
// ════════════════════════════════════════════════════════════════════════════

/// Fluent builder taking the raw user-facing strings.
///
/// Defaults: keynote `C4`, 3 octaves, `superlocrian`.
#[derive(Clone, Debug)]
pub struct ScaleBuilder {
    keynote: String,
    octaves: u32,
    pattern: String,
}

impl Default for ScaleBuilder {
    fn default() -> Self {
        ScaleBuilder {
            keynote: "C4".to_string(),
            octaves: 3,
            pattern: "superlocrian".to_string(),
        }
    }
}

impl ScaleBuilder {
    pub fn new() -> Self { Self::default() }

    pub fn keynote(mut self, name: &str) -> Self {
        self.keynote = name.to_string();
        self
    }

    pub fn octaves(mut self, octaves: u32) -> Self {
        self.octaves = octaves;
        self
    }

    /// Scale name or literal `T`/`S` pattern.
    pub fn pattern(mut self, selector: &str) -> Self {
        self.pattern = selector.to_string();
        self
    }

    pub fn build(&self) -> ScaleResult<Scale> {
        build(&self.keynote, self.octaves, &self.pattern)
    }
}

/// Parse both strings and build the scale in one call.
pub fn build(keynote_name: &str, octaves: u32, selector: &str) -> ScaleResult<Scale> {
    let keynote = keynote_name.parse::<Keynote>()?;
    let pattern = IntervalPattern::resolve(selector)?;
    Ok(Scale::build(keynote, octaves, pattern))
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    // ── Keynote ──────────────────────────────────────────────────────────
    #[test]
    fn keynote_letters() {
        let expected = [('C', 0), ('D', 2), ('E', 4), ('F', 5), ('G', 7), ('A', 9), ('B', 11)];
        for (letter, offset) in expected {
            let k: Keynote = letter.to_string().parse().unwrap();
            assert_eq!(k.semitone(), offset, "letter {}", letter);
        }
    }

    #[test]
    fn keynote_octave_digit() {
        assert_eq!("C4".parse::<Keynote>().unwrap().semitone(), 60);
        assert_eq!("C0".parse::<Keynote>().unwrap().semitone(), 12);
        assert_eq!("G9".parse::<Keynote>().unwrap().semitone(), 127);
    }

    #[test]
    fn keynote_accidentals() {
        assert_eq!("C#4".parse::<Keynote>().unwrap().semitone(), 61);
        assert_eq!("Db4".parse::<Keynote>().unwrap().semitone(), 61);
        assert_eq!("Cb4".parse::<Keynote>().unwrap().semitone(), 59);
        assert_eq!("F#".parse::<Keynote>().unwrap().semitone(), 6);
    }

    #[test]
    fn keynote_other_markers_flatten() {
        assert_eq!("Cx4".parse::<Keynote>().unwrap().semitone(), 59);
        assert_eq!("C♭4".parse::<Keynote>().unwrap().semitone(), 59);
        assert_eq!("E-2".parse::<Keynote>().unwrap().accidental, Accidental::Flat);
        // a second digit reads as the marker: C, flattened, octave 0
        assert_eq!("C10".parse::<Keynote>().unwrap().semitone(), 11);
    }

    #[test]
    fn keynote_rejects_bad_letter() {
        let err = "H4".parse::<Keynote>().unwrap_err();
        assert!(matches!(err, ScaleError::InvalidNoteName { .. }));
        assert!("c4".parse::<Keynote>().is_err());
    }

    #[test]
    fn keynote_rejects_bad_digit() {
        assert!("Cx".parse::<Keynote>().is_err());
        assert!("C#x".parse::<Keynote>().is_err());
        assert!("C100".parse::<Keynote>().is_err());
        assert!("".parse::<Keynote>().is_err());
    }

    #[test]
    fn keynote_display_round_trips() {
        for name in ["C4", "F#3", "Bb2", "A"] {
            assert_eq!(name.parse::<Keynote>().unwrap().to_string(), name);
        }
    }

    #[test]
    fn note_names() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(61), "C#4");
        assert_eq!(note_name(0), "C-1");
        assert_eq!(note_name(-1), "B-2");
    }

    // ── IntervalPattern ─────────────────────────────────────────────────
    #[test]
    fn named_patterns_resolve() {
        assert_eq!(IntervalPattern::resolve("major").unwrap().literal(), "TTSTTTS");
        assert_eq!(IntervalPattern::resolve("minor").unwrap().literal(), "TSTTSTT");
        assert_eq!(IntervalPattern::resolve("hexatonic").unwrap().literal(), "TTTTTT");
        assert_eq!(IntervalPattern::resolve("superlocrian").unwrap().literal(), "STSTTTT");
        assert_eq!(IntervalPattern::resolve("Major").unwrap().name, "major");
    }

    #[test]
    fn named_patterns_span_an_octave() {
        for (name, _) in NAMED_PATTERNS {
            assert_eq!(IntervalPattern::resolve(name).unwrap().span(), OCTAVE, "{}", name);
        }
    }

    #[test]
    fn literal_pattern() {
        let p = IntervalPattern::resolve("TST").unwrap();
        assert_eq!(p.name, "custom");
        assert_eq!(p.steps, vec![Step::Whole, Step::Half, Step::Whole]);
    }

    #[test]
    fn invalid_pattern() {
        for bad in ["", "TSX", "blues", "tts"] {
            let err = IntervalPattern::resolve(bad).unwrap_err();
            assert!(matches!(err, ScaleError::InvalidScalePattern { .. }), "{:?}", bad);
        }
    }

    // ── Centering ─────────────────────────────────────────────────────────
    #[test]
    fn centering_rounds_half_to_even() {
        assert_eq!(centering_offset(0), 0);
        assert_eq!(centering_offset(1), 0);
        assert_eq!(centering_offset(2), 12);
        assert_eq!(centering_offset(3), 24);
        assert_eq!(centering_offset(4), 24);
        assert_eq!(centering_offset(5), 24);
        assert_eq!(centering_offset(7), 48);
    }

    // ── Scale ─────────────────────────────────────────────────────────────
    #[test]
    fn c4_major_one_octave() {
        let scale = build("C4", 1, "major").unwrap();
        assert_eq!(scale.pitches(), &[60, 62, 64, 65, 67, 69, 71, 72]);
    }

    #[test]
    fn default_scale_is_centred() {
        let scale = ScaleBuilder::new().build().unwrap();
        // C4 superlocrian, 3 octaves, starts two octaves down
        assert_eq!(scale.len(), 22);
        assert_eq!(scale.get(0), Some(36));
        assert_eq!(scale.get(1), Some(37));
        assert_eq!(scale.range().1, 72);
    }

    #[test]
    fn length_and_monotonicity() {
        let mut literals: Vec<&str> = NAMED_PATTERNS.iter().map(|(_, l)| *l).collect();
        literals.push("TSS");
        for literal in literals {
            for octaves in 0..6u32 {
                let scale = build("E3", octaves, literal).unwrap();
                assert_eq!(scale.len(), literal.len() * octaves as usize + 1);
                for pair in scale.pitches().windows(2) {
                    let diff = pair[1] - pair[0];
                    assert!(diff == 1 || diff == 2, "{} ×{}: {:?}", literal, octaves, pair);
                }
            }
        }
    }

    #[test]
    fn zero_octaves_is_just_the_keynote() {
        let scale = build("A4", 0, "minor").unwrap();
        assert_eq!(scale.pitches(), &[69]);
        assert!(!scale.is_empty());
    }

    #[test]
    fn pattern_cycles_across_octaves() {
        let scale = build("C4", 2, "TTS").unwrap();
        // centred one octave down: 48, then T T S T T S
        assert_eq!(scale.pitches(), &[48, 50, 52, 53, 55, 57, 58]);
    }

    #[test]
    fn build_is_deterministic() {
        let a = build("F#3", 4, "dorian").unwrap();
        let b = ScaleBuilder::new().keynote("F#3").octaves(4).pattern("dorian").build().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn build_reports_which_input_failed() {
        assert!(matches!(build("X4", 3, "major"), Err(ScaleError::InvalidNoteName { .. })));
        assert!(matches!(build("C4", 3, "nope"), Err(ScaleError::InvalidScalePattern { .. })));
    }

    #[test]
    fn fits_midi() {
        assert!(build("C4", 3, "major").unwrap().fits_midi());
        assert!(!build("C0", 5, "major").unwrap().fits_midi());
        assert!(!build("G9", 2, "major").unwrap().fits_midi());
    }
}
