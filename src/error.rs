use thiserror::Error;

/// Errors surfaced by the engine core.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A numeric parameter was not finite. Finite out-of-range values are clamped instead.
    #[error("invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// A cached resource was missing. Recovered locally by live synthesis.
    #[error("missing resource: {0}")]
    MissingResource(String),

    /// A persisted snapshot could not be parsed or failed validation.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// An operation referenced an unknown slot, channel, note or cell.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Loop playback was requested with nothing recorded.
    #[error("nothing recorded")]
    EmptyRecording,

    /// The underlying scheduling primitive failed.
    #[error("scheduler failure: {0}")]
    Scheduler(String),
}

impl EngineError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        EngineError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        EngineError::MalformedSnapshot(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Reject non-finite input, clamp finite input into `[min, max]`.
pub fn check_range(name: &'static str, value: f32, min: f32, max: f32) -> Result<f32> {
    if !value.is_finite() {
        return Err(EngineError::InvalidParameter {
            name,
            value: value as f64,
        });
    }
    if value < min || value > max {
        tracing::warn!(name, value, min, max, "parameter out of range, clamping");
    }
    Ok(value.clamp(min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_is_rejected() {
        let err = check_range("bpm", f32::NAN, 20.0, 300.0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { name: "bpm", .. }));
    }

    #[test]
    fn out_of_range_is_clamped() {
        assert_eq!(check_range("bpm", 500.0, 20.0, 300.0).unwrap(), 300.0);
        assert_eq!(check_range("bpm", 5.0, 20.0, 300.0).unwrap(), 20.0);
        assert_eq!(check_range("bpm", 90.0, 20.0, 300.0).unwrap(), 90.0);
    }
}
