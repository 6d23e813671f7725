use serde::{Deserialize, Serialize};

use crate::fx::{CompressorState, EffectsState, EqState};
use crate::project::ProjectSnapshot;
use crate::sequencer::ClockKind;
use crate::synth::{BassTimbrePatch, DrumKind, Instrument};

/// Which step grid a cell command addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridKind {
    Drum,
    Bass,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    // Transport
    StartClock(ClockKind),
    StopClock(ClockKind),
    SetBpm(f32),

    // Grids
    ToggleCell { grid: GridKind, track: usize, step: usize },
    ClearGrid(GridKind),

    // Bassline
    SetBassTimbre(BassTimbrePatch),
    LoadPreset(String),
    SelectSlot(usize),
    SaveSlot,
    LoadSlot,
    CopyPattern,
    PastePattern,

    // Mixer
    SetMasterVolume(f32),
    SetMetronomeVolume(f32),
    SetChannelVolume { channel: DrumKind, volume: f32 },
    SetChannelPan { channel: DrumKind, pan: f32 },
    SetMute { channel: DrumKind, muted: bool },
    SetSolo { channel: DrumKind, soloed: bool },
    SetEffects(EffectsState),
    SetEq(EqState),
    SetCompressor(CompressorState),

    // Live playing
    TriggerDrum(DrumKind),
    PlayNote(String),
    SetOctave(u8),
    SetInstrument(Instrument),

    // Recorder
    StartRecording,
    StopRecording,
    StartLoop,
    StopLoop,

    // Project I/O
    #[serde(skip)]
    ApplySnapshot(Box<ProjectSnapshot>),
}

impl Command {
    /// Human-readable description of the command
    pub fn description(&self) -> String {
        match self {
            Command::StartClock(clock) => format!("Start {} clock", clock.name()),
            Command::StopClock(clock) => format!("Stop {} clock", clock.name()),
            Command::SetBpm(bpm) => format!("Set BPM to {}", bpm),
            Command::ToggleCell { grid, track, step } => {
                format!("Toggle {:?} cell {}:{}", grid, track, step)
            }
            Command::ClearGrid(grid) => format!("Clear {:?} grid", grid),
            Command::SetBassTimbre(_) => "Set bass timbre".to_string(),
            Command::LoadPreset(name) => format!("Load preset '{}'", name),
            Command::SelectSlot(slot) => format!("Select pattern slot {}", slot),
            Command::SaveSlot => "Save pattern slot".to_string(),
            Command::LoadSlot => "Load pattern slot".to_string(),
            Command::CopyPattern => "Copy pattern".to_string(),
            Command::PastePattern => "Paste pattern".to_string(),
            Command::SetMasterVolume(v) => format!("Set master volume to {:.2}", v),
            Command::SetMetronomeVolume(v) => format!("Set metronome volume to {:.2}", v),
            Command::SetChannelVolume { channel, volume } => {
                format!("Set {} volume to {:.2}", channel.name(), volume)
            }
            Command::SetChannelPan { channel, pan } => {
                format!("Set {} pan to {:.2}", channel.name(), pan)
            }
            Command::SetMute { channel, muted } => {
                format!("{} {}", if *muted { "Mute" } else { "Unmute" }, channel.name())
            }
            Command::SetSolo { channel, soloed } => {
                format!("{} {}", if *soloed { "Solo" } else { "Unsolo" }, channel.name())
            }
            Command::SetEffects(_) => "Set effects".to_string(),
            Command::SetEq(_) => "Set EQ".to_string(),
            Command::SetCompressor(_) => "Set compressor".to_string(),
            Command::TriggerDrum(kind) => format!("Trigger {}", kind.name()),
            Command::PlayNote(note) => format!("Play note {}", note),
            Command::SetOctave(octave) => format!("Set keyboard octave to {}", octave),
            Command::SetInstrument(i) => format!("Set instrument to {}", i.name()),
            Command::StartRecording => "Start recording".to_string(),
            Command::StopRecording => "Stop recording".to_string(),
            Command::StartLoop => "Start loop".to_string(),
            Command::StopLoop => "Stop loop".to_string(),
            Command::ApplySnapshot(_) => "Apply project snapshot".to_string(),
        }
    }
}
