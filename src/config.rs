use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Construction-time settings for the engine context.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: f32,
    /// Hard cap on concurrently sounding voice instances; oldest is evicted.
    pub max_voices: usize,
    /// How often the looper checks elapsed time (animation-frame rate).
    pub loop_poll_hz: f32,
    pub master_volume: f32,
    pub metronome_volume: f32,
    pub bpm: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            max_voices: 64,
            loop_poll_hz: 60.0,
            master_volume: 1.0,
            metronome_volume: 0.5,
            bpm: 120.0,
        }
    }
}

impl EngineConfig {
    /// Read settings from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        anyhow::ensure!(
            config.sample_rate.is_finite() && config.sample_rate >= 1000.0,
            "sample_rate must be at least 1000 Hz, got {}",
            config.sample_rate
        );
        tracing::debug!(?config, "engine config loaded");
        Ok(config)
    }

    pub fn with_sample_rate(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{"max_voices": 16, "bpm": 90}"#).unwrap();
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.max_voices, 16);
        assert_eq!(config.bpm, 90.0);
        assert_eq!(config.sample_rate, 44100.0);
        assert_eq!(config.loop_poll_hz, 60.0);

        std::fs::write(&path, "max_voices = 16").unwrap();
        assert!(EngineConfig::load(&path).is_err());
    }
}
