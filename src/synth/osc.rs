use std::f32::consts::TAU;

/// Oscillator wave shape
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// Phase-accumulating oscillator; frequency is supplied per sample so it can be swept.
#[derive(Clone, Debug)]
pub struct Oscillator {
    waveform: Waveform,
    /// Accumulated phase (0.0 to 1.0)
    phase: f32,
}

impl Oscillator {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            phase: 0.0,
        }
    }

    pub fn next_sample(&mut self, freq: f32, sample_rate: f32) -> f32 {
        let p = self.phase;
        let out = match self.waveform {
            Waveform::Sine => (p * TAU).sin(),
            Waveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => p * 2.0 - 1.0,
            Waveform::Triangle => 1.0 - 4.0 * (p - 0.5).abs(),
        };
        self.phase += freq / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        out
    }
}

/// Exponential ramp from `from` to `to` over `duration` seconds, holding `to` afterwards.
#[derive(Clone, Copy, Debug)]
pub struct ExpRamp {
    pub from: f32,
    pub to: f32,
    pub duration: f32,
}

/// Level that decay envelopes ramp down to
pub const SILENCE: f32 = 0.01;

impl ExpRamp {
    pub fn new(from: f32, to: f32, duration: f32) -> Self {
        Self { from, to, duration }
    }

    /// Peak-to-near-silence decay
    pub fn decay(peak: f32, duration: f32) -> Self {
        Self::new(peak, SILENCE, duration)
    }

    pub fn value_at(&self, t: f32) -> f32 {
        if t <= 0.0 {
            return self.from;
        }
        if t >= self.duration || self.duration <= 0.0 {
            return self.to;
        }
        if self.from <= 0.0 || self.to <= 0.0 {
            // Exponential ramps are undefined through zero; fall back to linear
            return self.from + (self.to - self.from) * t / self.duration;
        }
        self.from * (self.to / self.from).powf(t / self.duration)
    }
}

/// Linear ramp, holding `to` afterwards
#[derive(Clone, Copy, Debug)]
pub struct LinRamp {
    pub from: f32,
    pub to: f32,
    pub duration: f32,
}

impl LinRamp {
    pub fn value_at(&self, t: f32) -> f32 {
        if t >= self.duration || self.duration <= 0.0 {
            return self.to;
        }
        self.from + (self.to - self.from) * (t.max(0.0) / self.duration)
    }
}

/// White noise from a linear congruential generator
#[derive(Clone, Debug)]
pub struct Noise {
    state: u32,
}

impl Noise {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn next_sample(&mut self) -> f32 {
        self.state = self.state.wrapping_mul(1103515245).wrapping_add(12345);
        // Convert to -1.0 to 1.0 range
        (self.state as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}

/// Samples needed to hold `seconds` of audio, rounded up.
///
/// Representation error in the f32 inputs (0.1 s, 0.6 s) is dropped before
/// rounding so `0.1 * 44100` is 4410, not 4411.
pub fn samples_for(seconds: f32, sample_rate: f32) -> usize {
    if seconds.is_nan() || seconds <= 0.0 || sample_rate.is_nan() || sample_rate <= 0.0 {
        return 0;
    }
    let exact = seconds as f64 * sample_rate as f64;
    (exact - exact * 1e-6).ceil() as usize
}

/// Frequency offset by `cents`
pub fn detune(freq: f32, cents: f32) -> f32 {
    freq * 2.0f32.powf(cents / 1200.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exp_ramp_endpoints() {
        let r = ExpRamp::decay(0.8, 0.5);
        assert_eq!(r.value_at(0.0), 0.8);
        assert!((r.value_at(0.5) - SILENCE).abs() < 1e-6);
        assert_eq!(r.value_at(2.0), SILENCE);
        let mid = r.value_at(0.25);
        assert!((mid - (0.8f32 * SILENCE).sqrt()).abs() < 1e-4);
    }

    #[test]
    fn oscillators_stay_in_range() {
        for wf in [Waveform::Sine, Waveform::Square, Waveform::Sawtooth, Waveform::Triangle] {
            let mut osc = Oscillator::new(wf);
            for _ in 0..10_000 {
                let s = osc.next_sample(1234.5, 44100.0);
                assert!((-1.0..=1.0).contains(&s), "{:?} produced {}", wf, s);
            }
        }
    }

    #[test]
    fn noise_is_bounded_and_varies() {
        let mut n = Noise::new(42);
        let samples: Vec<f32> = (0..1000).map(|_| n.next_sample()).collect();
        assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!(samples.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn sample_counts_ignore_float_noise() {
        assert_eq!(samples_for(0.1, 44100.0), 4410);
        assert_eq!(samples_for(0.6, 44100.0), 26460);
        assert_eq!(samples_for(0.0333, 22050.0), 735);
        assert_eq!(samples_for(0.5, 1000.0), 500);
        assert_eq!(samples_for(0.0, 44100.0), 0);
        assert_eq!(samples_for(f32::NAN, 44100.0), 0);
    }

    #[test]
    fn detune_by_octave() {
        assert!((detune(100.0, 1200.0) - 200.0).abs() < 1e-3);
        assert!((detune(100.0, 0.0) - 100.0).abs() < 1e-6);
    }
}
