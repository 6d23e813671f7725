pub mod cache;
pub mod engine;
pub mod mixer;
pub mod output;
pub mod recorder;
pub mod voice;

pub use cache::BufferCache;
pub use engine::{soft_clip, ClockStatus, Engine, EngineState};
pub use mixer::{pan_gains, ChannelStrip, MixerState, DEFAULT_CHANNEL_VOLUME};
pub use output::{AudioOutput, SharedState};
pub use recorder::{RecordedHit, Recorder, RecorderState};
pub use voice::VoicePlayer;
