pub mod log;

pub use log::{EngineEvent, Event, EventLog};
