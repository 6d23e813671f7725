//! Beat machine engine: drum pads, a drum step sequencer, a bassline
//! sequencer over six bass synthesis algorithms, a channel mixer and a
//! pad recorder/looper, rendered sample by sample.

pub mod audio;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod fx;
pub mod project;
pub mod sequencer;
pub mod synth;

pub use audio::{Engine, EngineState};
pub use command::{Command, CommandBus, GridKind};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use project::ProjectSnapshot;
