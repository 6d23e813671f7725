pub mod bass;
pub mod drum;
pub mod keys;
pub mod osc;
pub mod params;
pub mod waveform;

pub use bass::{BassBank, BassNote, BassVoice};
pub use drum::{DrumKind, DrumPatch, DrumVoice, Percussion};
pub use keys::{KeyboardVoice, DEFAULT_OCTAVE, MAX_OCTAVE, MIN_OCTAVE};
pub use params::{
    bass_row_frequency, bass_row_name, midi_to_freq, note_frequency, note_name, BassTimbre,
    BassTimbrePatch, BassType, Instrument,
};
pub use waveform::generate;
