use std::collections::VecDeque;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::cache::BufferCache;
use super::mixer::pan_gains;
use crate::synth::{BassNote, BassVoice, DrumVoice, Instrument, KeyboardVoice, Percussion};

enum Source {
    /// Playback of a pre-rendered cache buffer
    Buffer { data: Arc<[f32]>, position: usize },
    /// Live synthesis when the cache cannot serve
    Drum(DrumVoice),
    Bass(BassVoice),
    Keyboard(KeyboardVoice),
}

impl Source {
    fn next_sample(&mut self) -> f32 {
        match self {
            Source::Buffer { data, position } => {
                let s = data.get(*position).copied().unwrap_or(0.0);
                *position += 1;
                s
            }
            Source::Drum(v) => v.next_sample(),
            Source::Bass(v) => v.next_sample(),
            Source::Keyboard(v) => v.next_sample(),
        }
    }

    fn is_finished(&self) -> bool {
        match self {
            Source::Buffer { data, position } => *position >= data.len(),
            Source::Drum(v) => v.is_finished(),
            Source::Bass(v) => v.is_finished(),
            Source::Keyboard(v) => v.is_finished(),
        }
    }
}

struct ActiveVoice {
    /// Samples left before the voice starts sounding
    delay: usize,
    left: f32,
    right: f32,
    source: Source,
}

/// Polyphonic playback of triggered sounds.
///
/// Every trigger gets its own instance; instances of the same sound overlap
/// freely. When `max_voices` are sounding the oldest one is dropped.
pub struct VoicePlayer {
    sample_rate: f32,
    max_voices: usize,
    voices: VecDeque<ActiveVoice>,
    rng: StdRng,
}

impl VoicePlayer {
    pub fn new(sample_rate: f32, max_voices: usize, seed: u64) -> Self {
        Self {
            sample_rate,
            max_voices: max_voices.max(1),
            voices: VecDeque::with_capacity(max_voices),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn active_count(&self) -> usize {
        self.voices.len()
    }

    fn delay_samples(&self, offset_seconds: f32) -> usize {
        (offset_seconds.max(0.0) * self.sample_rate).round() as usize
    }

    fn push(&mut self, voice: ActiveVoice) {
        while self.voices.len() >= self.max_voices {
            self.voices.pop_front();
            tracing::debug!(max_voices = self.max_voices, "voice limit reached, dropped oldest");
        }
        self.voices.push_back(voice);
    }

    /// Play a drum or click. Served from the cache when it holds the
    /// sound, otherwise synthesized live.
    pub fn trigger_percussion(
        &mut self,
        kind: Percussion,
        cache: &BufferCache,
        gain: f32,
        pan: f32,
        offset_seconds: f32,
    ) {
        if gain <= 0.0 {
            return;
        }
        let source = match cache.get(kind) {
            Ok(data) => Source::Buffer { data, position: 0 },
            Err(err) => {
                tracing::debug!(%err, "falling back to live synthesis");
                Source::Drum(DrumVoice::new(&kind.patch(), self.sample_rate, self.rng.gen()))
            }
        };
        let (l, r) = pan_gains(pan);
        let delay = self.delay_samples(offset_seconds);
        self.push(ActiveVoice {
            delay,
            left: gain * l,
            right: gain * r,
            source,
        });
    }

    pub fn trigger_bass(&mut self, note: &BassNote, gain: f32, offset_seconds: f32) {
        if gain <= 0.0 {
            return;
        }
        let (l, r) = pan_gains(0.0);
        let delay = self.delay_samples(offset_seconds);
        self.push(ActiveVoice {
            delay,
            left: gain * l,
            right: gain * r,
            source: Source::Bass(BassVoice::new(note, self.sample_rate)),
        });
    }

    pub fn trigger_keyboard(&mut self, instrument: Instrument, frequency: f32, gain: f32) {
        if gain <= 0.0 {
            return;
        }
        let (l, r) = pan_gains(0.0);
        self.push(ActiveVoice {
            delay: 0,
            left: gain * l,
            right: gain * r,
            source: Source::Keyboard(KeyboardVoice::new(instrument, frequency, self.sample_rate)),
        });
    }

    /// Mix one stereo frame of every sounding voice
    pub fn next_frame(&mut self) -> (f32, f32) {
        let mut left = 0.0;
        let mut right = 0.0;
        for voice in self.voices.iter_mut() {
            if voice.delay > 0 {
                voice.delay -= 1;
                continue;
            }
            let s = voice.source.next_sample();
            left += s * voice.left;
            right += s * voice.right;
        }
        self.voices
            .retain(|v| v.delay > 0 || !v.source.is_finished());
        (left, right)
    }

    pub fn clear(&mut self) {
        self.voices.clear();
    }
}
