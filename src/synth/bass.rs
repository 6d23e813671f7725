use std::sync::Arc;

use super::osc::{detune, samples_for, ExpRamp, Oscillator, Waveform};
use super::params::{BassTimbre, BassType};
use crate::fx::{distortion_curve, SvfFilter, WaveShaper, CURVE_SAMPLES};

/// Detune offsets of the reese oscillator stack, in cents
const REESE_DETUNE: [f32; 5] = [-7.0, -3.0, 0.0, 3.0, 7.0];

/// Growl wobble rate
const GROWL_LFO_HZ: f32 = 4.0;

/// Everything a bass trigger captures at schedule time.
///
/// Later timbre changes never reach a note that has already been built.
#[derive(Clone, Debug)]
pub struct BassNote {
    pub bass_type: BassType,
    pub frequency: f32,
    /// Sounding length in seconds
    pub duration: f32,
    pub cutoff: f32,
    pub resonance: f32,
    pub shaper: WaveShaper,
}

enum Graph {
    Sub {
        osc: Oscillator,
        lp: SvfFilter,
        env: ExpRamp,
    },
    Eight08 {
        main: Oscillator,
        sub: Oscillator,
        pitch: ExpRamp,
        shaper: WaveShaper,
        lp: SvfFilter,
        main_env: ExpRamp,
        sub_env: ExpRamp,
    },
    Reese {
        oscs: Vec<(Oscillator, f32)>,
        lp: SvfFilter,
        env: ExpRamp,
    },
    Acid {
        osc: Oscillator,
        lp: SvfFilter,
        sweep: ExpRamp,
        env: ExpRamp,
    },
    Pluck {
        osc: Oscillator,
        lp: SvfFilter,
        sweep: ExpRamp,
        env: ExpRamp,
    },
    Growl {
        saw: Oscillator,
        square: Oscillator,
        lfo: Oscillator,
        lp: SvfFilter,
        env: ExpRamp,
    },
}

/// One sounding bass note
pub struct BassVoice {
    sample_rate: f32,
    frequency: f32,
    cutoff: f32,
    index: usize,
    duration_samples: usize,
    graph: Graph,
}

impl BassVoice {
    pub fn new(note: &BassNote, sample_rate: f32) -> Self {
        let f = note.frequency;
        let d = note.duration;
        let graph = match note.bass_type {
            BassType::Sub => Graph::Sub {
                osc: Oscillator::new(Waveform::Sawtooth),
                lp: SvfFilter::low_pass(sample_rate, note.cutoff, note.resonance),
                env: ExpRamp::decay(0.4, d),
            },
            BassType::Eight08 => Graph::Eight08 {
                main: Oscillator::new(Waveform::Sine),
                sub: Oscillator::new(Waveform::Sine),
                pitch: ExpRamp::new(f * 2.0, f, 0.1),
                shaper: note.shaper.clone(),
                lp: SvfFilter::low_pass(sample_rate, note.cutoff, note.resonance),
                main_env: ExpRamp::decay(0.8, d),
                sub_env: ExpRamp::decay(0.5, d),
            },
            BassType::Reese => Graph::Reese {
                oscs: REESE_DETUNE
                    .iter()
                    .map(|c| (Oscillator::new(Waveform::Sawtooth), detune(f, *c)))
                    .collect(),
                lp: SvfFilter::low_pass(sample_rate, note.cutoff, note.resonance),
                env: ExpRamp::decay(0.2, d),
            },
            BassType::Acid => Graph::Acid {
                osc: Oscillator::new(Waveform::Sawtooth),
                lp: SvfFilter::low_pass(sample_rate, f * 2.0, note.resonance * 2.0),
                sweep: ExpRamp::new(f * 2.0, note.cutoff, 0.1),
                env: ExpRamp::decay(0.4, d),
            },
            BassType::Pluck => Graph::Pluck {
                osc: Oscillator::new(Waveform::Triangle),
                lp: SvfFilter::low_pass(sample_rate, note.cutoff * 3.0, note.resonance),
                sweep: ExpRamp::new(note.cutoff * 3.0, f, d),
                env: ExpRamp::decay(0.6, d),
            },
            BassType::Growl => Graph::Growl {
                saw: Oscillator::new(Waveform::Sawtooth),
                square: Oscillator::new(Waveform::Square),
                lfo: Oscillator::new(Waveform::Sine),
                lp: SvfFilter::low_pass(sample_rate, note.cutoff, note.resonance * 2.0),
                env: ExpRamp::decay(0.5, d),
            },
        };
        Self {
            sample_rate,
            frequency: f,
            cutoff: note.cutoff,
            index: 0,
            duration_samples: samples_for(d, sample_rate),
            graph,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.duration_samples
    }

    pub fn duration_samples(&self) -> usize {
        self.duration_samples
    }

    pub fn next_sample(&mut self) -> f32 {
        if self.is_finished() {
            return 0.0;
        }
        let sr = self.sample_rate;
        let f = self.frequency;
        let t = self.index as f32 / sr;
        self.index += 1;

        match &mut self.graph {
            Graph::Sub { osc, lp, env } => lp.process(osc.next_sample(f, sr)) * env.value_at(t),
            Graph::Eight08 {
                main,
                sub,
                pitch,
                shaper,
                lp,
                main_env,
                sub_env,
            } => {
                let body = main.next_sample(pitch.value_at(t), sr);
                let body = lp.process(shaper.process(body)) * main_env.value_at(t);
                let low = sub.next_sample(f * 0.5, sr) * sub_env.value_at(t);
                body + low
            }
            Graph::Reese { oscs, lp, env } => {
                let gain = env.value_at(t);
                let sum: f32 = oscs
                    .iter_mut()
                    .map(|(osc, freq)| osc.next_sample(*freq, sr) * gain)
                    .sum();
                lp.process(sum)
            }
            Graph::Acid { osc, lp, sweep, env } | Graph::Pluck { osc, lp, sweep, env } => {
                lp.set_cutoff(sweep.value_at(t));
                lp.process(osc.next_sample(f, sr)) * env.value_at(t)
            }
            Graph::Growl {
                saw,
                square,
                lfo,
                lp,
                env,
            } => {
                let wobble = lfo.next_sample(GROWL_LFO_HZ, sr);
                lp.set_cutoff(self.cutoff + wobble * self.cutoff * 0.5);
                let raw = saw.next_sample(f, sr) + square.next_sample(f * 1.5, sr);
                lp.process(raw) * env.value_at(t)
            }
        }
    }
}

/// The six bass algorithms plus the shared waveshaping curve
pub struct BassBank {
    curve: Arc<[f32]>,
    curve_distortion: f32,
}

impl BassBank {
    pub fn new(timbre: &BassTimbre) -> Self {
        Self {
            curve: distortion_curve(timbre.drive_amount(), CURVE_SAMPLES).into(),
            curve_distortion: timbre.distortion,
        }
    }

    /// Rebuild the distortion curve if the timbre's distortion moved.
    /// Notes already playing keep the curve they were built with.
    pub fn refresh_curve(&mut self, timbre: &BassTimbre) -> bool {
        if timbre.distortion == self.curve_distortion {
            return false;
        }
        self.curve = distortion_curve(timbre.drive_amount(), CURVE_SAMPLES).into();
        self.curve_distortion = timbre.distortion;
        tracing::debug!(distortion = timbre.distortion, "rebuilt distortion curve");
        true
    }

    pub fn curve(&self) -> &Arc<[f32]> {
        &self.curve
    }

    /// Length of a bass note at `bpm` for the given algorithm
    pub fn note_duration(bass_type: BassType, bpm: f32) -> f32 {
        60.0 / bpm * 0.9 * bass_type.duration_scale()
    }

    /// Capture the current timbre into a note
    pub fn note(&self, timbre: &BassTimbre, frequency: f32, bpm: f32) -> BassNote {
        BassNote {
            bass_type: timbre.bass_type,
            frequency,
            duration: Self::note_duration(timbre.bass_type, bpm),
            cutoff: timbre.cutoff_hz,
            resonance: timbre.resonance_q,
            shaper: WaveShaper::new(self.curve.clone()),
        }
    }

    /// Plain sub-bass note with fixed tone, used by the keyboard bass
    pub fn fixed_sub(frequency: f32, duration: f32) -> BassNote {
        BassNote {
            bass_type: BassType::Sub,
            frequency,
            duration,
            cutoff: 800.0,
            resonance: 5.0,
            shaper: WaveShaper::new(Arc::from(Vec::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::params::BassTimbrePatch;

    fn render(note: &BassNote) -> Vec<f32> {
        let mut voice = BassVoice::new(note, 44100.0);
        (0..voice.duration_samples()).map(|_| voice.next_sample()).collect()
    }

    #[test]
    fn durations_follow_tempo_and_type() {
        assert!((BassBank::note_duration(BassType::Sub, 120.0) - 0.45).abs() < 1e-6);
        assert!((BassBank::note_duration(BassType::Acid, 120.0) - 0.225).abs() < 1e-6);
        assert!((BassBank::note_duration(BassType::Pluck, 60.0) - 0.36).abs() < 1e-6);
    }

    #[test]
    fn every_type_sounds_and_stays_finite() {
        let bank = BassBank::new(&BassTimbre::default());
        for bass_type in BassType::ALL {
            let timbre = BassTimbre {
                bass_type,
                ..Default::default()
            };
            let buf = render(&bank.note(&timbre, 55.0, 120.0));
            assert!(!buf.is_empty());
            assert!(buf.iter().all(|s| s.is_finite()), "{}", bass_type.name());
            let peak = buf.iter().fold(0.0f32, |m, s| m.max(s.abs()));
            assert!(peak > 0.01, "{} peak {}", bass_type.name(), peak);
        }
    }

    #[test]
    fn types_produce_distinct_graphs() {
        let bank = BassBank::new(&BassTimbre::default());
        let renders: Vec<Vec<f32>> = BassType::ALL
            .iter()
            .map(|t| {
                let timbre = BassTimbre {
                    bass_type: *t,
                    ..Default::default()
                };
                render(&bank.note(&timbre, 65.0, 120.0))
            })
            .collect();
        for i in 0..renders.len() {
            for j in (i + 1)..renders.len() {
                assert_ne!(renders[i], renders[j]);
            }
        }
    }

    #[test]
    fn curve_regenerates_only_on_distortion_change() {
        let mut timbre = BassTimbre::default();
        let mut bank = BassBank::new(&timbre);
        let before = bank.curve().clone();
        let held = bank.note(&timbre, 55.0, 120.0);

        timbre
            .apply(&BassTimbrePatch {
                cutoff_hz: Some(1200.0),
                ..Default::default()
            })
            .unwrap();
        assert!(!bank.refresh_curve(&timbre));
        assert!(Arc::ptr_eq(&before, bank.curve()));

        timbre
            .apply(&BassTimbrePatch {
                distortion: Some(60.0),
                ..Default::default()
            })
            .unwrap();
        assert!(bank.refresh_curve(&timbre));
        assert!(!Arc::ptr_eq(&before, bank.curve()));
        // The earlier note still holds the original curve
        assert_eq!(held.shaper.curve(), &before[..]);
    }
}
