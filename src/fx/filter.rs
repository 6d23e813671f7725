use serde::{Deserialize, Serialize};

/// Filter response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterType {
    LowPass,
    HighPass,
    BandPass,
}

/// Q used when a filter is created without an explicit resonance
pub const DEFAULT_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// State Variable Filter (2-pole SVF, trapezoidal)
///
/// Resonance is expressed as Q; damping is `1/Q`. The cutoff may be moved
/// every sample (sweeps, LFO modulation) without resetting the integrators.
#[derive(Clone, Debug)]
pub struct SvfFilter {
    sample_rate: f32,
    filter_type: FilterType,
    cutoff: f32,
    q: f32,
    // Integrator states
    low: f32,
    band: f32,
    // Precomputed coefficients
    g: f32, // frequency coefficient
    k: f32, // damping coefficient
}

impl SvfFilter {
    pub fn new(sample_rate: f32, filter_type: FilterType, cutoff: f32, q: f32) -> Self {
        let mut f = Self {
            sample_rate,
            filter_type,
            cutoff,
            q,
            low: 0.0,
            band: 0.0,
            g: 0.0,
            k: 0.0,
        };
        f.update_coefficients();
        f
    }

    pub fn low_pass(sample_rate: f32, cutoff: f32, q: f32) -> Self {
        Self::new(sample_rate, FilterType::LowPass, cutoff, q)
    }

    pub fn high_pass(sample_rate: f32, cutoff: f32) -> Self {
        Self::new(sample_rate, FilterType::HighPass, cutoff, DEFAULT_Q)
    }

    pub fn band_pass(sample_rate: f32, cutoff: f32, q: f32) -> Self {
        Self::new(sample_rate, FilterType::BandPass, cutoff, q)
    }

    fn update_coefficients(&mut self) {
        // g = tan(pi * cutoff / sample_rate)
        let freq = self.cutoff.clamp(10.0, self.sample_rate * 0.49);
        self.g = (std::f32::consts::PI * freq / self.sample_rate).tan();
        // Q 0.1..50 -> k 10..0.02
        self.k = 1.0 / self.q.clamp(0.1, 50.0);
    }

    pub fn set_cutoff(&mut self, hz: f32) {
        if hz == self.cutoff {
            return;
        }
        self.cutoff = hz.clamp(10.0, 20000.0);
        self.update_coefficients();
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let a1 = 1.0 / (1.0 + self.g * (self.g + self.k));
        let a2 = self.g * a1;
        let a3 = self.g * a2;

        let v3 = input - self.low;
        let v1 = a1 * self.band + a2 * v3;
        let v2 = self.low + a2 * self.band + a3 * v3;

        self.band = 2.0 * v1 - self.band;
        self.low = 2.0 * v2 - self.low;

        match self.filter_type {
            FilterType::LowPass => v2,
            FilterType::HighPass => input - self.k * v1 - v2,
            // Normalized so the peak gain is unity regardless of Q
            FilterType::BandPass => v1 * self.k,
        }
    }
}
