pub mod clock;
pub mod pattern;
pub mod presets;

pub use clock::{ClockKind, StepClock};
pub use pattern::{BassGrid, DrumGrid, Grid, PatternBank, BASS_ROWS, DRUM_TRACKS, NUM_SLOTS, STEPS};
pub use presets::{Preset, PRESETS};
