pub mod lenient;
pub mod renderer;
pub mod store;

pub use renderer::{export_wav, ExportResult, RenderOptions};
pub use store::{ProjectEntry, ProjectStore};

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::audio::{Engine, MixerState, RecordedHit};
use crate::error::{check_range, EngineError};
use crate::fx::{CompressorState, EffectsState, EqState};
use crate::sequencer::{BassGrid, DrumGrid, STEPS};
use crate::synth::params::bass_row_for_note;
use crate::synth::{
    bass_row_name, BassTimbre, BassTimbrePatch, BassType, DrumKind, Instrument, MAX_OCTAVE,
    MIN_OCTAVE,
};

/// The one snapshot format version this crate reads and writes
pub const SNAPSHOT_VERSION: &str = "1.0";

/// Persisted project state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    #[serde(deserialize_with = "lenient::text")]
    pub version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub drum_sequencer: DrumSequencer,
    #[serde(default)]
    pub bassline: Bassline,
    #[serde(default)]
    pub mixer: Mixer,
    #[serde(default)]
    pub effects: EffectsState,
    #[serde(default)]
    pub eq: EqState,
    #[serde(default)]
    pub compressor: CompressorState,
    #[serde(default)]
    pub recording: Recording,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(deserialize_with = "lenient::f32")]
    pub bpm: f32,
    #[serde(deserialize_with = "lenient::f32")]
    pub master_volume: f32,
    #[serde(deserialize_with = "lenient::f32")]
    pub metronome_volume: f32,
    #[serde(deserialize_with = "lenient::u8")]
    pub current_octave: u8,
    pub current_instrument: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            master_volume: 1.0,
            metronome_volume: 0.5,
            current_octave: 3,
            current_instrument: Instrument::Bass.name().to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrumSequencer {
    pub pattern: Vec<DrumCell>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrumCell {
    pub sound: String,
    #[serde(deserialize_with = "lenient::usize")]
    pub step: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bassline {
    pub pattern: Vec<BassCell>,
    #[serde(rename = "type")]
    pub bass_type: String,
    #[serde(deserialize_with = "lenient::u8")]
    pub octave: u8,
    #[serde(deserialize_with = "lenient::f32")]
    pub cutoff: f32,
    #[serde(deserialize_with = "lenient::f32")]
    pub resonance: f32,
    #[serde(deserialize_with = "lenient::f32")]
    pub distortion: f32,
    #[serde(deserialize_with = "lenient::f32")]
    pub glide: f32,
}

impl Default for Bassline {
    fn default() -> Self {
        Self::from_timbre(&BassTimbre::default(), Vec::new())
    }
}

impl Bassline {
    fn from_timbre(timbre: &BassTimbre, pattern: Vec<BassCell>) -> Self {
        Self {
            pattern,
            bass_type: timbre.bass_type.name().to_string(),
            octave: timbre.octave,
            cutoff: timbre.cutoff_hz,
            resonance: timbre.resonance_q,
            distortion: timbre.distortion,
            glide: timbre.glide_ms,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BassCell {
    pub note: String,
    #[serde(deserialize_with = "lenient::usize")]
    pub step: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mixer {
    pub channels: BTreeMap<String, Channel>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Channel {
    #[serde(deserialize_with = "lenient::f32")]
    pub volume: f32,
    #[serde(deserialize_with = "lenient::f32")]
    pub pan: f32,
    #[serde(deserialize_with = "lenient::bool")]
    pub muted: bool,
    #[serde(deserialize_with = "lenient::bool")]
    pub solo: bool,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            volume: crate::audio::DEFAULT_CHANNEL_VOLUME,
            pan: 0.0,
            muted: false,
            solo: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Recording {
    pub pattern: Vec<RecordedCell>,
    /// Transient flags; written for reference, ignored on apply
    #[serde(deserialize_with = "lenient::bool")]
    pub is_recording: bool,
    #[serde(deserialize_with = "lenient::bool")]
    pub is_looping: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedCell {
    pub sound_key: String,
    /// Milliseconds after recording started
    #[serde(deserialize_with = "lenient::f64")]
    pub timestamp: f64,
}

/// A snapshot that passed validation, ready to be committed to an engine
#[derive(Clone, Debug)]
pub struct ResolvedProject {
    pub bpm: f32,
    pub octave: u8,
    pub instrument: Instrument,
    pub drum_grid: DrumGrid,
    pub bass_grid: BassGrid,
    pub timbre: BassTimbre,
    pub mixer: MixerState,
    pub recording: Vec<RecordedHit>,
}

/// Recorded pads may name their sound or use the pad's key ("k" for kick)
fn recorded_sound(key: &str) -> Option<DrumKind> {
    DrumKind::from_name(key).or_else(|| {
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => DrumKind::from_key(c),
            _ => None,
        }
    })
}

fn check_step(step: usize) -> crate::error::Result<usize> {
    if step < STEPS {
        Ok(step)
    } else {
        Err(EngineError::malformed(format!("step {} out of range", step)))
    }
}

impl ProjectSnapshot {
    /// Capture the engine's persistent state
    pub fn gather(engine: &Engine, name: &str) -> Self {
        let drum_pattern = engine
            .drum_grid()
            .active_cells()
            .filter_map(|(track, step)| {
                DrumKind::from_index(track).map(|kind| DrumCell {
                    sound: kind.name().to_string(),
                    step,
                })
            })
            .collect();

        let bass_pattern = engine
            .bass_grid()
            .active_cells()
            .filter_map(|(row, step)| bass_row_name(row).map(|note| BassCell { note, step }))
            .collect();

        let mixer = engine.mixer();
        let channels = DrumKind::ALL
            .iter()
            .map(|&kind| {
                let strip = mixer.channel(kind);
                let channel = Channel {
                    volume: strip.volume,
                    pan: strip.pan,
                    muted: mixer.is_muted(kind),
                    solo: mixer.is_soloed(kind),
                };
                (kind.name().to_string(), channel)
            })
            .collect();

        let recorder = engine.recorder();
        let recording = Recording {
            pattern: recorder
                .pattern()
                .iter()
                .map(|hit| RecordedCell {
                    sound_key: hit.voice.name().to_string(),
                    timestamp: hit.offset_ms,
                })
                .collect(),
            is_recording: recorder.state() == crate::audio::RecorderState::Recording,
            is_looping: recorder.state() == crate::audio::RecorderState::Looping,
        };

        Self {
            version: SNAPSHOT_VERSION.to_string(),
            name: name.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            settings: Settings {
                bpm: engine.bpm(),
                master_volume: mixer.master_volume(),
                metronome_volume: mixer.metronome_volume(),
                current_octave: engine.octave(),
                current_instrument: engine.instrument().name().to_string(),
            },
            drum_sequencer: DrumSequencer {
                pattern: drum_pattern,
            },
            bassline: Bassline::from_timbre(engine.timbre(), bass_pattern),
            mixer: Mixer { channels },
            effects: mixer.effects.clone(),
            eq: mixer.eq.clone(),
            compressor: mixer.compressor.clone(),
            recording,
        }
    }

    /// Validate every field. Any failure is `MalformedSnapshot`.
    pub fn resolve(&self) -> crate::error::Result<ResolvedProject> {
        self.resolve_fields().map_err(|err| match err {
            EngineError::MalformedSnapshot(_) => err,
            other => EngineError::malformed(other.to_string()),
        })
    }

    fn resolve_fields(&self) -> crate::error::Result<ResolvedProject> {
        if self.version != SNAPSHOT_VERSION {
            return Err(EngineError::malformed(format!(
                "unsupported version {:?}",
                self.version
            )));
        }

        let settings = &self.settings;
        let bpm = check_range("bpm", settings.bpm, 20.0, 300.0)?;
        let octave = check_range(
            "octave",
            settings.current_octave as f32,
            MIN_OCTAVE as f32,
            MAX_OCTAVE as f32,
        )? as u8;
        let instrument = Instrument::from_name(&settings.current_instrument).ok_or_else(|| {
            EngineError::malformed(format!("unknown instrument {:?}", settings.current_instrument))
        })?;

        let mut drum_grid = DrumGrid::new();
        for cell in &self.drum_sequencer.pattern {
            let kind = DrumKind::from_name(&cell.sound)
                .ok_or_else(|| EngineError::malformed(format!("unknown sound {:?}", cell.sound)))?;
            drum_grid.set(kind.index(), check_step(cell.step)?, true)?;
        }

        let bassline = &self.bassline;
        let bass_type = BassType::from_name(&bassline.bass_type).ok_or_else(|| {
            EngineError::malformed(format!("unknown bass type {:?}", bassline.bass_type))
        })?;
        let mut timbre = BassTimbre::default();
        timbre.apply(&BassTimbrePatch {
            bass_type: Some(bass_type),
            octave: Some(bassline.octave),
            cutoff_hz: Some(bassline.cutoff),
            resonance_q: Some(bassline.resonance),
            distortion: Some(bassline.distortion),
            glide_ms: Some(bassline.glide),
        })?;

        let mut bass_grid = BassGrid::new();
        for cell in &bassline.pattern {
            let row = bass_row_for_note(&cell.note)
                .ok_or_else(|| EngineError::malformed(format!("unknown note {:?}", cell.note)))?;
            bass_grid.set(row, check_step(cell.step)?, true)?;
        }

        let master = check_range("master volume", settings.master_volume, 0.0, 1.0)?;
        let metronome = check_range("metronome volume", settings.metronome_volume, 0.0, 1.0)?;
        let mut mixer = MixerState::new(master, metronome);
        for (sound, channel) in &self.mixer.channels {
            let kind = DrumKind::from_name(sound)
                .ok_or_else(|| EngineError::malformed(format!("unknown channel {:?}", sound)))?;
            mixer.set_volume(kind, channel.volume)?;
            mixer.set_pan(kind, channel.pan)?;
            mixer.set_mute(kind, channel.muted);
            mixer.set_solo(kind, channel.solo);
        }
        mixer.set_effects(&self.effects)?;
        mixer.set_eq(&self.eq)?;
        mixer.set_compressor(&self.compressor)?;

        let recording = self
            .recording
            .pattern
            .iter()
            .map(|cell| {
                let voice = recorded_sound(&cell.sound_key).ok_or_else(|| {
                    EngineError::malformed(format!("unknown sound {:?}", cell.sound_key))
                })?;
                if !cell.timestamp.is_finite() || cell.timestamp < 0.0 {
                    return Err(EngineError::malformed(format!(
                        "bad recording timestamp {}",
                        cell.timestamp
                    )));
                }
                Ok(RecordedHit {
                    voice,
                    offset_ms: cell.timestamp,
                })
            })
            .collect::<crate::error::Result<Vec<_>>>()?;

        Ok(ResolvedProject {
            bpm,
            octave,
            instrument,
            drum_grid,
            bass_grid,
            timbre,
            mixer,
            recording,
        })
    }
}

/// Write a snapshot as pretty JSON
pub fn export_project(path: &Path, snapshot: &ProjectSnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot).context("Failed to serialize project")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), name = %snapshot.name, "project exported");
    Ok(())
}

/// Read a snapshot file and check that it would apply cleanly
pub fn import_project(path: &Path) -> Result<ProjectSnapshot> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let snapshot: ProjectSnapshot = serde_json::from_str(&json)
        .map_err(|e| EngineError::malformed(e.to_string()))
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    snapshot
        .resolve()
        .with_context(|| format!("Invalid project {}", path.display()))?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, GridKind};
    use crate::config::EngineConfig;

    fn engine() -> Engine {
        Engine::with_seed(EngineConfig::default(), 7)
    }

    /// Snapshot as written by the browser UI: strings for slider values
    const LEGACY: &str = r#"{
        "version": "1.0",
        "name": "late night",
        "timestamp": "2024-03-01T21:00:00.000Z",
        "settings": {
            "bpm": "96",
            "masterVolume": "0.7",
            "metronomeVolume": 0.4,
            "currentOctave": 4,
            "currentInstrument": "lead"
        },
        "drumSequencer": {
            "pattern": [{"sound": "kick", "step": "0"}, {"sound": "snare", "step": 4}]
        },
        "bassline": {
            "pattern": [{"note": "C3", "step": 0}, {"note": "A0", "step": "15"}],
            "type": "reese",
            "octave": "2",
            "cutoff": "1200",
            "resonance": "3",
            "distortion": "20",
            "glide": "0"
        },
        "mixer": {
            "channels": {
                "kick": {"volume": "0.9", "pan": "0", "muted": false, "solo": false},
                "snare": {"volume": 0.5, "pan": -0.5, "muted": true, "solo": false}
            }
        },
        "effects": {"reverb": "30", "delay": "0", "filter": "50"},
        "eq": {"low": "3", "mid": "0", "high": "-2"},
        "compressor": {"threshold": "-24", "ratio": "4", "attack": "3", "release": "250", "enabled": true},
        "recording": {
            "pattern": [{"soundKey": "kick", "timestamp": 0}, {"soundKey": "h", "timestamp": 250.5}],
            "isRecording": false,
            "isLooping": true
        }
    }"#;

    #[test]
    fn legacy_snapshot_resolves() {
        let snapshot: ProjectSnapshot = serde_json::from_str(LEGACY).unwrap();
        let project = snapshot.resolve().unwrap();
        assert_eq!(project.bpm, 96.0);
        assert_eq!(project.octave, 4);
        assert_eq!(project.instrument, Instrument::Lead);
        assert!(project.drum_grid.get(DrumKind::Snare.index(), 4));
        assert!(project.bass_grid.get(0, 0));
        assert!(project.bass_grid.get(15, 15));
        assert_eq!(project.timbre.bass_type, BassType::Reese);
        assert_eq!(project.timbre.cutoff_hz, 1200.0);
        assert!(project.mixer.is_muted(DrumKind::Snare));
        assert_eq!(project.mixer.channel(DrumKind::Kick).volume, 0.9);
        assert_eq!(project.mixer.eq.high, -2.0);
        assert!(project.mixer.compressor.enabled);
        assert_eq!(project.recording.len(), 2);
        assert_eq!(project.recording[1].voice, DrumKind::HiHat);
    }

    #[test]
    fn invalid_snapshots_are_malformed() {
        let cases = [
            LEGACY.replace(r#""version": "1.0""#, r#""version": "2.0""#),
            LEGACY.replace(r#""sound": "kick""#, r#""sound": "cowbell""#),
            LEGACY.replace(r#""note": "C3""#, r#""note": "C9""#),
            LEGACY.replace(r#""step": 4"#, r#""step": 16"#),
            LEGACY.replace(r#""type": "reese""#, r#""type": "wobble""#),
            LEGACY.replace(r#""bpm": "96""#, r#""bpm": "NaN""#),
            LEGACY.replace(r#""soundKey": "h""#, r#""soundKey": "q""#),
        ];
        for json in &cases {
            let snapshot: ProjectSnapshot = serde_json::from_str(json).unwrap();
            assert!(
                matches!(snapshot.resolve(), Err(EngineError::MalformedSnapshot(_))),
                "{}",
                json
            );
        }
    }

    #[test]
    fn gathered_snapshot_uses_documented_names() {
        let mut engine = engine();
        engine
            .apply(Command::ToggleCell {
                grid: GridKind::Drum,
                track: DrumKind::OpenHat.index(),
                step: 2,
            })
            .unwrap();
        let snapshot = engine.gather_state("demo");
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["drumSequencer"]["pattern"][0]["sound"], "openhat");
        assert_eq!(value["bassline"]["type"], "sub");
        assert!(value["mixer"]["channels"]["tink"]["volume"].is_number());
        assert!(value["settings"]["masterVolume"].is_number());
        assert!(snapshot.timestamp.ends_with('Z'));
    }

    #[test]
    fn export_then_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.json");
        let snapshot: ProjectSnapshot = serde_json::from_str(LEGACY).unwrap();
        export_project(&path, &snapshot).unwrap();
        let back = import_project(&path).unwrap();
        assert_eq!(back.settings.bpm, 96.0);
        assert_eq!(back.bassline.pattern, snapshot.bassline.pattern);

        std::fs::write(&path, "{not json").unwrap();
        let err = import_project(&path).unwrap_err();
        assert!(err.downcast_ref::<EngineError>().is_some());
    }
}
