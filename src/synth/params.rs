use serde::{Deserialize, Serialize};

use crate::error::{check_range, EngineError, Result};

/// Convert MIDI note number to frequency in Hz
/// A4 (69) = 440 Hz
pub fn midi_to_freq(note: u8) -> f32 {
    440.0 * 2.0f32.powf((note as f32 - 69.0) / 12.0)
}

const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Note name from MIDI note number (e.g., 60 -> "C4", 61 -> "C#4")
pub fn note_name(note: u8) -> String {
    let octave = (note / 12) as i32 - 1;
    format!("{}{}", NOTE_NAMES[note as usize % 12], octave)
}

/// Lowest and highest playable notes (A0..D7)
pub const LOWEST_NOTE: u8 = 21;
pub const HIGHEST_NOTE: u8 = 98;

/// Parse a pitch class ("C", "F#") and octave into a MIDI note.
pub fn note_to_midi(pitch: &str, octave: i32) -> Result<u8> {
    let class = NOTE_NAMES
        .iter()
        .position(|n| *n == pitch)
        .ok_or_else(|| EngineError::not_found("note", format!("{}{}", pitch, octave)))?;
    let midi = 12 * (octave + 1) + class as i32;
    if midi < LOWEST_NOTE as i32 || midi > HIGHEST_NOTE as i32 {
        return Err(EngineError::not_found("note", format!("{}{}", pitch, octave)));
    }
    Ok(midi as u8)
}

/// Parse a full note name ("C#3") into a MIDI note.
pub fn parse_note(name: &str) -> Result<u8> {
    let split = name
        .find(|c: char| c.is_ascii_digit() || c == '-')
        .ok_or_else(|| EngineError::not_found("note", name))?;
    let (pitch, octave) = name.split_at(split);
    let octave: i32 = octave
        .parse()
        .map_err(|_| EngineError::not_found("note", name))?;
    note_to_midi(pitch, octave)
}

/// Frequency of a named note ("A1" -> 55 Hz)
pub fn note_frequency(name: &str) -> Result<f32> {
    parse_note(name).map(midi_to_freq)
}

/// Bassline grid rows, top to bottom
pub const BASS_ROWS: [(&str, i32); 16] = [
    ("C", 3),
    ("B", 2),
    ("A", 2),
    ("G", 2),
    ("F", 2),
    ("E", 2),
    ("D", 2),
    ("C", 2),
    ("B", 1),
    ("A", 1),
    ("G", 1),
    ("F", 1),
    ("E", 1),
    ("D", 1),
    ("C", 1),
    ("A", 0),
];

/// Octave the bass row table is written in; other octaves transpose it.
pub const BASS_REFERENCE_OCTAVE: u8 = 2;

/// Name of a bassline row ("C3")
pub fn bass_row_name(row: usize) -> Option<String> {
    BASS_ROWS.get(row).map(|(p, o)| format!("{}{}", p, o))
}

/// Row index for a bassline note name
pub fn bass_row_for_note(name: &str) -> Option<usize> {
    BASS_ROWS
        .iter()
        .position(|(p, o)| format!("{}{}", p, o) == name)
}

/// Frequency of a bassline row, transposed by the timbre octave
pub fn bass_row_frequency(row: usize, octave: u8) -> Result<f32> {
    let (pitch, base) = BASS_ROWS
        .get(row)
        .ok_or_else(|| EngineError::not_found("bass row", row))?;
    let base = midi_to_freq(note_to_midi(pitch, *base)?);
    let shift = octave as i32 - BASS_REFERENCE_OCTAVE as i32;
    Ok(base * 2.0f32.powi(shift))
}

/// Bass synthesis algorithm
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BassType {
    #[serde(rename = "sub")]
    Sub,
    #[serde(rename = "808")]
    Eight08,
    #[serde(rename = "reese")]
    Reese,
    #[serde(rename = "acid")]
    Acid,
    #[serde(rename = "pluck")]
    Pluck,
    #[serde(rename = "growl")]
    Growl,
}

impl BassType {
    pub const ALL: [BassType; 6] = [
        BassType::Sub,
        BassType::Eight08,
        BassType::Reese,
        BassType::Acid,
        BassType::Pluck,
        BassType::Growl,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BassType::Sub => "sub",
            BassType::Eight08 => "808",
            BassType::Reese => "reese",
            BassType::Acid => "acid",
            BassType::Pluck => "pluck",
            BassType::Growl => "growl",
        }
    }

    pub fn from_name(name: &str) -> Option<BassType> {
        BassType::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Note length relative to the base bass note duration
    pub fn duration_scale(&self) -> f32 {
        match self {
            BassType::Acid => 0.5,
            BassType::Pluck => 0.4,
            _ => 1.0,
        }
    }
}

/// Shared timbre for every bass trigger. Read as a snapshot at trigger time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BassTimbre {
    pub bass_type: BassType,
    pub octave: u8,        // 1-4, default 2
    pub cutoff_hz: f32,    // 50-5000, default 800
    pub resonance_q: f32,  // 0.1-30, default 5
    pub distortion: f32,   // 0-100 %, default 0
    pub glide_ms: f32,     // 0-500, default 0
}

impl Default for BassTimbre {
    fn default() -> Self {
        Self {
            bass_type: BassType::Sub,
            octave: 2,
            cutoff_hz: 800.0,
            resonance_q: 5.0,
            distortion: 0.0,
            glide_ms: 0.0,
        }
    }
}

impl BassTimbre {
    pub fn glide_seconds(&self) -> f32 {
        self.glide_ms / 1000.0
    }

    /// Waveshaper drive derived from the distortion percentage
    pub fn drive_amount(&self) -> f32 {
        self.distortion / 100.0 * 400.0
    }

    /// Merge a partial update, validating every supplied field first.
    /// Returns true if the distortion changed.
    pub fn apply(&mut self, patch: &BassTimbrePatch) -> Result<bool> {
        let mut next = self.clone();
        if let Some(t) = patch.bass_type {
            next.bass_type = t;
        }
        if let Some(o) = patch.octave {
            next.octave = check_range("octave", o as f32, 1.0, 4.0)? as u8;
        }
        if let Some(c) = patch.cutoff_hz {
            next.cutoff_hz = check_range("cutoff", c, 50.0, 5000.0)?;
        }
        if let Some(q) = patch.resonance_q {
            next.resonance_q = check_range("resonance", q, 0.1, 30.0)?;
        }
        if let Some(d) = patch.distortion {
            next.distortion = check_range("distortion", d, 0.0, 100.0)?;
        }
        if let Some(g) = patch.glide_ms {
            next.glide_ms = check_range("glide", g, 0.0, 500.0)?;
        }
        let distortion_changed = next.distortion != self.distortion;
        *self = next;
        Ok(distortion_changed)
    }
}

/// Partial timbre update; `None` fields are left unchanged
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BassTimbrePatch {
    pub bass_type: Option<BassType>,
    pub octave: Option<u8>,
    pub cutoff_hz: Option<f32>,
    pub resonance_q: Option<f32>,
    pub distortion: Option<f32>,
    pub glide_ms: Option<f32>,
}

/// Keyboard instrument
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    Bass,
    Keys,
    Lead,
}

impl Instrument {
    pub fn name(&self) -> &'static str {
        match self {
            Instrument::Bass => "bass",
            Instrument::Keys => "keys",
            Instrument::Lead => "lead",
        }
    }

    pub fn from_name(name: &str) -> Option<Instrument> {
        match name {
            "bass" => Some(Instrument::Bass),
            "keys" => Some(Instrument::Keys),
            "lead" => Some(Instrument::Lead),
            _ => None,
        }
    }

    /// Note length in seconds
    pub fn duration(&self) -> f32 {
        match self {
            Instrument::Bass => 0.8,
            Instrument::Keys => 0.6,
            Instrument::Lead => 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_note_names() {
        assert_eq!(parse_note("A4").unwrap(), 69);
        assert_eq!(parse_note("C#3").unwrap(), 49);
        assert!((note_frequency("A1").unwrap() - 55.0).abs() < 0.01);
        assert!((note_frequency("C3").unwrap() - 130.81).abs() < 0.01);
        assert!(parse_note("H2").is_err());
        assert!(parse_note("C9").is_err());
        assert!(parse_note("C").is_err());
    }

    #[test]
    fn bass_rows_transpose_with_octave() {
        let c3 = bass_row_frequency(0, 2).unwrap();
        assert!((c3 - 130.81).abs() < 0.01);
        let c2 = bass_row_frequency(0, 1).unwrap();
        assert!((c2 * 2.0 - c3).abs() < 0.01);
        assert_eq!(bass_row_for_note("A0"), Some(15));
        assert_eq!(bass_row_name(9).as_deref(), Some("A1"));
        assert!(bass_row_frequency(16, 2).is_err());
    }

    #[test]
    fn timbre_patch_is_all_or_nothing() {
        let mut t = BassTimbre::default();
        let bad = BassTimbrePatch {
            cutoff_hz: Some(1200.0),
            resonance_q: Some(f32::NAN),
            ..Default::default()
        };
        assert!(t.apply(&bad).is_err());
        assert_eq!(t, BassTimbre::default());

        let good = BassTimbrePatch {
            distortion: Some(40.0),
            cutoff_hz: Some(9000.0),
            ..Default::default()
        };
        assert!(t.apply(&good).unwrap());
        assert_eq!(t.cutoff_hz, 5000.0);
        assert_eq!(t.distortion, 40.0);
    }

    #[test]
    fn bass_type_names() {
        for t in BassType::ALL {
            assert_eq!(BassType::from_name(t.name()), Some(t));
        }
        assert_eq!(serde_json::to_string(&BassType::Eight08).unwrap(), "\"808\"");
    }
}
