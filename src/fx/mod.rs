pub mod distortion;
pub mod filter;

pub use distortion::{distortion_curve, WaveShaper, CURVE_SAMPLES};
pub use filter::{FilterType, SvfFilter, DEFAULT_Q};

use serde::{Deserialize, Serialize};

use crate::error::{check_range, Result};
use crate::project::lenient;

/// Send-effect amounts. Stored and persisted; no signal path is attached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsState {
    #[serde(deserialize_with = "lenient::f32")]
    pub reverb: f32, // 0-100 %
    #[serde(deserialize_with = "lenient::f32")]
    pub delay: f32, // 0-100 %
    #[serde(deserialize_with = "lenient::f32")]
    pub filter: f32, // 0-100 %, log-mapped to 100 Hz..20 kHz
}

impl Default for EffectsState {
    fn default() -> Self {
        Self {
            reverb: 0.0,
            delay: 0.0,
            filter: 50.0,
        }
    }
}

impl EffectsState {
    pub fn validated(&self) -> Result<Self> {
        Ok(Self {
            reverb: check_range("reverb", self.reverb, 0.0, 100.0)?,
            delay: check_range("delay", self.delay, 0.0, 100.0)?,
            filter: check_range("filter", self.filter, 0.0, 100.0)?,
        })
    }
}

/// Three-band EQ gains in dB
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EqState {
    #[serde(deserialize_with = "lenient::f32")]
    pub low: f32,
    #[serde(deserialize_with = "lenient::f32")]
    pub mid: f32,
    #[serde(deserialize_with = "lenient::f32")]
    pub high: f32,
}

impl EqState {
    pub fn validated(&self) -> Result<Self> {
        Ok(Self {
            low: check_range("eq low", self.low, -12.0, 12.0)?,
            mid: check_range("eq mid", self.mid, -12.0, 12.0)?,
            high: check_range("eq high", self.high, -12.0, 12.0)?,
        })
    }
}

/// Master compressor controls
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorState {
    #[serde(deserialize_with = "lenient::f32")]
    pub threshold: f32, // dB
    #[serde(deserialize_with = "lenient::f32")]
    pub ratio: f32, // n:1
    #[serde(deserialize_with = "lenient::f32")]
    pub attack: f32, // ms
    #[serde(deserialize_with = "lenient::f32")]
    pub release: f32, // ms
    #[serde(deserialize_with = "lenient::bool")]
    pub enabled: bool,
}

impl Default for CompressorState {
    fn default() -> Self {
        Self {
            threshold: -20.0,
            ratio: 4.0,
            attack: 10.0,
            release: 100.0,
            enabled: false,
        }
    }
}

impl CompressorState {
    pub fn validated(&self) -> Result<Self> {
        Ok(Self {
            threshold: check_range("threshold", self.threshold, -60.0, 0.0)?,
            ratio: check_range("ratio", self.ratio, 1.0, 20.0)?,
            attack: check_range("attack", self.attack, 0.0, 1000.0)?,
            release: check_range("release", self.release, 0.0, 3000.0)?,
            enabled: self.enabled,
        })
    }
}
