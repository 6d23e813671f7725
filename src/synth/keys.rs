use super::bass::{BassBank, BassVoice};
use super::osc::{samples_for, ExpRamp, LinRamp, Oscillator, Waveform};
use super::params::Instrument;
use crate::fx::SvfFilter;

/// Keyboard octave range and default
pub const MIN_OCTAVE: u8 = 1;
pub const MAX_OCTAVE: u8 = 6;
pub const DEFAULT_OCTAVE: u8 = 3;

const LEAD_ATTACK: f32 = 0.05;

enum Patch {
    Bass(BassVoice),
    Keys {
        fundamental: Oscillator,
        overtone: Oscillator,
        env: ExpRamp,
        overtone_env: ExpRamp,
    },
    Lead {
        osc: Oscillator,
        lp: SvfFilter,
        sweep: LinRamp,
        attack: LinRamp,
        release: ExpRamp,
    },
}

/// A note played on the melodic keyboard
pub struct KeyboardVoice {
    sample_rate: f32,
    frequency: f32,
    index: usize,
    duration_samples: usize,
    patch: Patch,
}

impl KeyboardVoice {
    pub fn new(instrument: Instrument, frequency: f32, sample_rate: f32) -> Self {
        let d = instrument.duration();
        let patch = match instrument {
            Instrument::Bass => {
                Patch::Bass(BassVoice::new(&BassBank::fixed_sub(frequency, d), sample_rate))
            }
            Instrument::Keys => Patch::Keys {
                fundamental: Oscillator::new(Waveform::Sine),
                overtone: Oscillator::new(Waveform::Triangle),
                env: ExpRamp::decay(0.3, d),
                overtone_env: ExpRamp::decay(0.1, d),
            },
            Instrument::Lead => Patch::Lead {
                osc: Oscillator::new(Waveform::Sawtooth),
                lp: SvfFilter::low_pass(sample_rate, 2000.0, crate::fx::DEFAULT_Q),
                sweep: LinRamp {
                    from: 2000.0,
                    to: frequency * 4.0,
                    duration: 0.1,
                },
                attack: LinRamp {
                    from: 0.3,
                    to: 0.5,
                    duration: LEAD_ATTACK,
                },
                release: ExpRamp::decay(0.5, d - LEAD_ATTACK),
            },
        };
        Self {
            sample_rate,
            frequency,
            index: 0,
            duration_samples: samples_for(d, sample_rate),
            patch,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.duration_samples
    }

    pub fn next_sample(&mut self) -> f32 {
        if self.is_finished() {
            return 0.0;
        }
        let sr = self.sample_rate;
        let f = self.frequency;
        let t = self.index as f32 / sr;
        self.index += 1;

        match &mut self.patch {
            Patch::Bass(voice) => voice.next_sample(),
            Patch::Keys {
                fundamental,
                overtone,
                env,
                overtone_env,
            } => {
                fundamental.next_sample(f, sr) * env.value_at(t)
                    + overtone.next_sample(f * 2.0, sr) * overtone_env.value_at(t)
            }
            Patch::Lead {
                osc,
                lp,
                sweep,
                attack,
                release,
            } => {
                lp.set_cutoff(sweep.value_at(t));
                let gain = if t < LEAD_ATTACK {
                    attack.value_at(t)
                } else {
                    release.value_at(t - LEAD_ATTACK)
                };
                lp.process(osc.next_sample(f, sr)) * gain
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(instrument: Instrument, freq: f32) -> Vec<f32> {
        let mut voice = KeyboardVoice::new(instrument, freq, 44100.0);
        let mut out = Vec::new();
        while !voice.is_finished() {
            out.push(voice.next_sample());
        }
        out
    }

    #[test]
    fn instruments_have_their_lengths() {
        assert_eq!(render(Instrument::Bass, 65.4).len(), 35280);
        assert_eq!(render(Instrument::Keys, 261.6).len(), 26460);
        assert_eq!(render(Instrument::Lead, 440.0).len(), 22050);
    }

    #[test]
    fn lead_swells_then_decays() {
        let buf = render(Instrument::Lead, 440.0);
        let peak = |range: std::ops::Range<usize>| {
            buf[range].iter().fold(0.0f32, |m, s| m.max(s.abs()))
        };
        // attack window vs the last 50 ms
        assert!(peak(1000..2205) > peak(20000..22050));
    }
}
