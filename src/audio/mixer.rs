use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{check_range, Result};
use crate::fx::{CompressorState, EffectsState, EqState};
use crate::sequencer::DRUM_TRACKS;
use crate::synth::DrumKind;

pub const DEFAULT_CHANNEL_VOLUME: f32 = 0.8;

/// Per-drum channel fader and pan
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelStrip {
    pub volume: f32, // 0.0-1.0
    pub pan: f32,    // -1.0 (left) to 1.0 (right)
}

impl Default for ChannelStrip {
    fn default() -> Self {
        Self {
            volume: DEFAULT_CHANNEL_VOLUME,
            pan: 0.0,
        }
    }
}

/// Equal-power pan law: -1.0 = full left, 0.0 = center, 1.0 = full right
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * 0.25 * std::f32::consts::PI;
    (angle.cos(), angle.sin())
}

/// Channel faders, mute/solo sets and master levels.
///
/// Gains are computed on demand at trigger time; sounds already playing
/// keep the gain they started with.
#[derive(Clone, Debug, PartialEq)]
pub struct MixerState {
    channels: [ChannelStrip; DRUM_TRACKS],
    muted: BTreeSet<DrumKind>,
    soloed: BTreeSet<DrumKind>,
    master_volume: f32,
    metronome_volume: f32,
    pub effects: EffectsState,
    pub eq: EqState,
    pub compressor: CompressorState,
}

impl MixerState {
    pub fn new(master_volume: f32, metronome_volume: f32) -> Self {
        Self {
            channels: [ChannelStrip::default(); DRUM_TRACKS],
            muted: BTreeSet::new(),
            soloed: BTreeSet::new(),
            master_volume: master_volume.clamp(0.0, 1.0),
            metronome_volume: metronome_volume.clamp(0.0, 1.0),
            effects: EffectsState::default(),
            eq: EqState::default(),
            compressor: CompressorState::default(),
        }
    }

    pub fn channel(&self, channel: DrumKind) -> ChannelStrip {
        self.channels[channel.index()]
    }

    pub fn set_volume(&mut self, channel: DrumKind, volume: f32) -> Result<()> {
        self.channels[channel.index()].volume = check_range("volume", volume, 0.0, 1.0)?;
        Ok(())
    }

    pub fn set_pan(&mut self, channel: DrumKind, pan: f32) -> Result<()> {
        let pan = check_range("pan", pan, -1.0, 1.0)?;
        self.channels[channel.index()].pan = pan;
        tracing::debug!(channel = channel.name(), pan, "pan");
        Ok(())
    }

    pub fn set_mute(&mut self, channel: DrumKind, muted: bool) {
        if muted {
            self.muted.insert(channel);
        } else {
            self.muted.remove(&channel);
        }
    }

    pub fn set_solo(&mut self, channel: DrumKind, soloed: bool) {
        if soloed {
            self.soloed.insert(channel);
        } else {
            self.soloed.remove(&channel);
        }
    }

    pub fn is_muted(&self, channel: DrumKind) -> bool {
        self.muted.contains(&channel)
    }

    pub fn is_soloed(&self, channel: DrumKind) -> bool {
        self.soloed.contains(&channel)
    }

    /// Playback gain for a trigger on `channel`
    pub fn effective_gain(&self, channel: DrumKind) -> f32 {
        if self.is_muted(channel) {
            return 0.0;
        }
        if !self.soloed.is_empty() && !self.is_soloed(channel) {
            return 0.0;
        }
        self.channel(channel).volume * self.master_volume
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn set_master_volume(&mut self, volume: f32) -> Result<()> {
        self.master_volume = check_range("master volume", volume, 0.0, 1.0)?;
        Ok(())
    }

    pub fn metronome_volume(&self) -> f32 {
        self.metronome_volume
    }

    pub fn set_metronome_volume(&mut self, volume: f32) -> Result<()> {
        self.metronome_volume = check_range("metronome volume", volume, 0.0, 1.0)?;
        Ok(())
    }

    pub fn set_effects(&mut self, effects: &EffectsState) -> Result<()> {
        self.effects = effects.validated()?;
        tracing::debug!(effects = ?self.effects, "effects set");
        Ok(())
    }

    pub fn set_eq(&mut self, eq: &EqState) -> Result<()> {
        self.eq = eq.validated()?;
        tracing::debug!(eq = ?self.eq, "eq set");
        Ok(())
    }

    pub fn set_compressor(&mut self, compressor: &CompressorState) -> Result<()> {
        self.compressor = compressor.validated()?;
        tracing::debug!(compressor = ?self.compressor, "compressor set");
        Ok(())
    }
}

impl Default for MixerState {
    fn default() -> Self {
        Self::new(1.0, 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: DrumKind = DrumKind::Kick;
    const B: DrumKind = DrumKind::Snare;
    const C: DrumKind = DrumKind::HiHat;

    #[test]
    fn muted_channel_is_silent() {
        let mut mixer = MixerState::default();
        mixer.set_mute(A, true);
        assert_eq!(mixer.effective_gain(A), 0.0);
        assert!(mixer.effective_gain(B) > 0.0);
    }

    #[test]
    fn solo_silences_everything_else() {
        let mut mixer = MixerState::default();
        mixer.set_solo(B, true);
        assert_eq!(mixer.effective_gain(A), 0.0);
        mixer.set_mute(A, true);
        assert_eq!(mixer.effective_gain(A), 0.0);
        assert!((mixer.effective_gain(B) - DEFAULT_CHANNEL_VOLUME).abs() < 1e-6);
        mixer.set_solo(B, false);
        assert!(mixer.effective_gain(C) > 0.0);
    }

    #[test]
    fn gain_is_volume_times_master() {
        let mut mixer = MixerState::default();
        mixer.set_volume(C, 0.5).unwrap();
        mixer.set_master_volume(0.6).unwrap();
        assert!((mixer.effective_gain(C) - 0.3).abs() < 1e-6);
        assert!(mixer.set_volume(C, f32::NAN).is_err());
        assert_eq!(mixer.channel(C).volume, 0.5);
    }

    #[test]
    fn pan_law_is_equal_power() {
        let (l, r) = pan_gains(0.0);
        assert!((l - r).abs() < 1e-6);
        assert!((l * l + r * r - 1.0).abs() < 1e-5);
        let (l, r) = pan_gains(-1.0);
        assert!((l - 1.0).abs() < 1e-6 && r.abs() < 1e-6);
    }
}
