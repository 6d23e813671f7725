use serde::{Deserialize, Serialize};

use super::osc::{samples_for, ExpRamp, Noise, Oscillator, Waveform};
use crate::fx::{FilterType, SvfFilter};

/// Percussive voices, in drum-grid track order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrumKind {
    Kick,
    Snare,
    HiHat,
    OpenHat,
    Clap,
    Tom,
    Ride,
    Tink,
}

impl DrumKind {
    pub const ALL: [DrumKind; 8] = [
        DrumKind::Kick,
        DrumKind::Snare,
        DrumKind::HiHat,
        DrumKind::OpenHat,
        DrumKind::Clap,
        DrumKind::Tom,
        DrumKind::Ride,
        DrumKind::Tink,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DrumKind::Kick => "kick",
            DrumKind::Snare => "snare",
            DrumKind::HiHat => "hihat",
            DrumKind::OpenHat => "openhat",
            DrumKind::Clap => "clap",
            DrumKind::Tom => "tom",
            DrumKind::Ride => "ride",
            DrumKind::Tink => "tink",
        }
    }

    pub fn from_name(name: &str) -> Option<DrumKind> {
        DrumKind::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Drum-grid track index
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<DrumKind> {
        DrumKind::ALL.get(index).copied()
    }

    /// Pad key binding
    pub fn from_key(key: char) -> Option<DrumKind> {
        match key.to_ascii_lowercase() {
            'k' => Some(DrumKind::Kick),
            'n' => Some(DrumKind::Snare),
            'h' => Some(DrumKind::HiHat),
            'p' => Some(DrumKind::OpenHat),
            'l' => Some(DrumKind::Clap),
            'm' => Some(DrumKind::Tom),
            'j' => Some(DrumKind::Ride),
            'i' => Some(DrumKind::Tink),
            _ => None,
        }
    }
}

/// Anything the percussion path can play: a drum pad or the metronome click
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Percussion {
    Drum(DrumKind),
    Click,
}

impl Percussion {
    pub fn all() -> impl Iterator<Item = Percussion> {
        DrumKind::ALL
            .into_iter()
            .map(Percussion::Drum)
            .chain(std::iter::once(Percussion::Click))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Percussion::Drum(kind) => kind.name(),
            Percussion::Click => "metronome",
        }
    }

    pub fn patch(&self) -> DrumPatch {
        match self {
            Percussion::Drum(kind) => DrumPatch::for_kind(*kind),
            Percussion::Click => DrumPatch::click(),
        }
    }
}

/// What a layer draws its raw signal from
#[derive(Clone, Copy, Debug)]
pub enum LayerSource {
    /// Oscillator whose frequency follows a ramp
    Tone { waveform: Waveform, pitch: ExpRamp },
    /// White noise
    Noise,
}

#[derive(Clone, Copy, Debug)]
pub struct FilterSpec {
    pub filter_type: FilterType,
    pub cutoff: f32,
    pub q: f32,
}

/// One source -> filters -> envelope strand of a percussive sound
#[derive(Clone, Debug)]
pub struct Layer {
    pub source: LayerSource,
    pub filters: Vec<FilterSpec>,
    pub envelope: ExpRamp,
    /// Start offset within the sound, seconds
    pub start: f32,
    /// Sounding length, seconds
    pub length: f32,
}

impl Layer {
    fn tone(waveform: Waveform, pitch: ExpRamp, envelope: ExpRamp) -> Self {
        Self {
            source: LayerSource::Tone { waveform, pitch },
            filters: Vec::new(),
            length: envelope.duration,
            envelope,
            start: 0.0,
        }
    }

    fn steady(waveform: Waveform, freq: f32, envelope: ExpRamp) -> Self {
        Self::tone(waveform, ExpRamp::new(freq, freq, 0.0), envelope)
    }

    fn noise(filters: Vec<FilterSpec>, envelope: ExpRamp) -> Self {
        Self {
            source: LayerSource::Noise,
            filters,
            length: envelope.duration,
            envelope,
            start: 0.0,
        }
    }

    fn at(mut self, start: f32) -> Self {
        self.start = start;
        self
    }

    fn end(&self) -> f32 {
        self.start + self.length
    }
}

fn high_pass(cutoff: f32) -> FilterSpec {
    FilterSpec {
        filter_type: FilterType::HighPass,
        cutoff,
        q: crate::fx::DEFAULT_Q,
    }
}

fn band_pass(cutoff: f32, q: f32) -> FilterSpec {
    FilterSpec {
        filter_type: FilterType::BandPass,
        cutoff,
        q,
    }
}

/// Synthesis description of a percussive sound.
///
/// Rendered eagerly into the buffer cache or lazily by a live `DrumVoice`.
#[derive(Clone, Debug)]
pub struct DrumPatch {
    pub layers: Vec<Layer>,
}

impl DrumPatch {
    pub fn for_kind(kind: DrumKind) -> Self {
        let layers = match kind {
            DrumKind::Kick => vec![Layer::tone(
                Waveform::Sine,
                ExpRamp::new(150.0, 40.0, 0.5),
                ExpRamp::decay(1.0, 0.5),
            )],
            DrumKind::Snare => vec![
                Layer::steady(Waveform::Triangle, 100.0, ExpRamp::decay(0.7, 0.2)),
                Layer::noise(vec![high_pass(1000.0)], ExpRamp::decay(1.0, 0.2)),
            ],
            DrumKind::HiHat => vec![Self::hat(0.1)],
            DrumKind::OpenHat => vec![Self::hat(0.5)],
            DrumKind::Clap => (0..3)
                .map(|i| {
                    Layer::noise(vec![band_pass(1500.0, 2.0)], ExpRamp::decay(0.65, 0.04))
                        .at(i as f32 * 0.01)
                })
                .collect(),
            DrumKind::Tom => vec![Layer::tone(
                Waveform::Sine,
                ExpRamp::new(200.0, 80.0, 0.3),
                ExpRamp::decay(1.0, 0.3),
            )],
            DrumKind::Ride => [800.0, 1000.0, 1250.0, 1600.0]
                .into_iter()
                .map(|f| Layer::steady(Waveform::Square, f, ExpRamp::decay(0.2, 0.4)))
                .collect(),
            DrumKind::Tink => vec![Layer::steady(
                Waveform::Square,
                800.0,
                ExpRamp::decay(0.5, 0.2),
            )],
        };
        Self { layers }
    }

    fn hat(length: f32) -> Layer {
        Layer::noise(
            vec![high_pass(7000.0), band_pass(10000.0, 1.0)],
            ExpRamp::decay(1.0, length),
        )
    }

    /// Metronome click
    pub fn click() -> Self {
        Self {
            layers: vec![Layer::steady(
                Waveform::Square,
                1000.0,
                ExpRamp::decay(0.5, 0.05),
            )],
        }
    }

    /// Natural length of the sound in seconds
    pub fn duration(&self) -> f32 {
        self.layers.iter().map(Layer::end).fold(0.0, f32::max)
    }
}

struct LayerState {
    layer: Layer,
    osc: Option<Oscillator>,
    noise: Option<Noise>,
    filters: Vec<SvfFilter>,
}

impl LayerState {
    fn next_sample(&mut self, t: f32, sample_rate: f32) -> f32 {
        let local = t - self.layer.start;
        if local < 0.0 || local >= self.layer.length {
            return 0.0;
        }
        let raw = match (&self.layer.source, &mut self.osc, &mut self.noise) {
            (LayerSource::Tone { pitch, .. }, Some(osc), _) => {
                osc.next_sample(pitch.value_at(local), sample_rate)
            }
            (_, _, Some(noise)) => noise.next_sample(),
            _ => 0.0,
        };
        let filtered = self.filters.iter_mut().fold(raw, |s, f| f.process(s));
        filtered * self.layer.envelope.value_at(local)
    }
}

/// Live, sample-by-sample rendering of a `DrumPatch`
pub struct DrumVoice {
    sample_rate: f32,
    /// Current sample index
    index: usize,
    /// Total duration in samples
    duration_samples: usize,
    layers: Vec<LayerState>,
}

impl DrumVoice {
    pub fn new(patch: &DrumPatch, sample_rate: f32, seed: u32) -> Self {
        let duration_samples = samples_for(patch.duration(), sample_rate);
        let layers = patch
            .layers
            .iter()
            .enumerate()
            .map(|(i, layer)| {
                let (osc, noise) = match layer.source {
                    LayerSource::Tone { waveform, .. } => (Some(Oscillator::new(waveform)), None),
                    LayerSource::Noise => (
                        None,
                        Some(Noise::new(seed.wrapping_add((i as u32).wrapping_mul(0x9E37_79B9)))),
                    ),
                };
                let filters = layer
                    .filters
                    .iter()
                    .map(|f| SvfFilter::new(sample_rate, f.filter_type, f.cutoff, f.q))
                    .collect();
                LayerState {
                    layer: layer.clone(),
                    osc,
                    noise,
                    filters,
                }
            })
            .collect();
        Self {
            sample_rate,
            index: 0,
            duration_samples,
            layers,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.duration_samples
    }

    pub fn duration_samples(&self) -> usize {
        self.duration_samples
    }

    /// Generate the next sample; silence once the sound has run its course
    pub fn next_sample(&mut self) -> f32 {
        if self.is_finished() {
            return 0.0;
        }
        let t = self.index as f32 / self.sample_rate;
        let sr = self.sample_rate;
        let sum: f32 = self.layers.iter_mut().map(|l| l.next_sample(t, sr)).sum();
        self.index += 1;
        if sum.is_finite() {
            sum.clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }
}
