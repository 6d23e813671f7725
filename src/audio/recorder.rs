use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::synth::DrumKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecorderState {
    Idle,
    Recording,
    Looping,
}

/// A pad hit captured while recording
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedHit {
    pub voice: DrumKind,
    /// Milliseconds after recording started
    pub offset_ms: f64,
}

/// Live pad recorder and loop player.
///
/// Time is engine time in samples. The looper is polled at a fixed rate and
/// fires every hit whose offset has elapsed; after the last hit of a pass a
/// new pass starts at that instant, so the loop period is the last offset.
pub struct Recorder {
    sample_rate: f64,
    state: RecorderState,
    pattern: Vec<RecordedHit>,
    record_start: u64,
    loop_start: u64,
    loop_index: usize,
}

impl Recorder {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate: sample_rate as f64,
            state: RecorderState::Idle,
            pattern: Vec::new(),
            record_start: 0,
            loop_start: 0,
            loop_index: 0,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn pattern(&self) -> &[RecordedHit] {
        &self.pattern
    }

    /// Replace the recorded pattern (snapshot import). Stops looping.
    pub fn set_pattern(&mut self, mut pattern: Vec<RecordedHit>) {
        pattern.sort_by(|a, b| a.offset_ms.total_cmp(&b.offset_ms));
        self.pattern = pattern;
        self.state = RecorderState::Idle;
        self.loop_index = 0;
    }

    fn elapsed_ms(&self, from: u64, now: u64) -> f64 {
        now.saturating_sub(from) as f64 * 1000.0 / self.sample_rate
    }

    /// Clear the pattern and start capturing; stops any loop playback
    pub fn start_recording(&mut self, now: u64) {
        if self.state == RecorderState::Looping {
            tracing::debug!("recording stops the loop");
        }
        self.pattern.clear();
        self.record_start = now;
        self.state = RecorderState::Recording;
    }

    /// Capture a hit if recording
    pub fn record(&mut self, voice: DrumKind, now: u64) {
        if self.state != RecorderState::Recording {
            return;
        }
        let offset_ms = self.elapsed_ms(self.record_start, now);
        self.pattern.push(RecordedHit { voice, offset_ms });
    }

    /// Freeze the pattern. Returns the entry count if recording was active.
    pub fn stop_recording(&mut self) -> Option<usize> {
        if self.state != RecorderState::Recording {
            return None;
        }
        self.state = RecorderState::Idle;
        Some(self.pattern.len())
    }

    pub fn start_looping(&mut self, now: u64) -> Result<()> {
        if self.pattern.is_empty() {
            return Err(EngineError::EmptyRecording);
        }
        self.stop_recording();
        self.state = RecorderState::Looping;
        self.loop_start = now;
        self.loop_index = 0;
        Ok(())
    }

    pub fn stop_looping(&mut self) -> bool {
        if self.state != RecorderState::Looping {
            return false;
        }
        self.state = RecorderState::Idle;
        true
    }

    fn fire_due(&mut self, now: u64, fire: &mut impl FnMut(DrumKind)) {
        let elapsed = self.elapsed_ms(self.loop_start, now);
        while let Some(hit) = self.pattern.get(self.loop_index) {
            if elapsed < hit.offset_ms {
                break;
            }
            fire(hit.voice);
            self.loop_index += 1;
        }
    }

    fn wrap(&mut self, now: u64) {
        self.loop_index = 0;
        self.loop_start = now;
    }

    /// One looper poll. Calls `fire` for every due hit, in order.
    /// Returns true if a new pass started; at most one per poll.
    pub fn poll(&mut self, now: u64, mut fire: impl FnMut(DrumKind)) -> bool {
        if self.state != RecorderState::Looping || self.pattern.is_empty() {
            return false;
        }
        let len = self.pattern.len();
        if self.loop_index >= len {
            self.wrap(now);
            self.fire_due(now, &mut fire);
            return true;
        }
        self.fire_due(now, &mut fire);
        if self.loop_index < len {
            return false;
        }
        self.wrap(now);
        // A zero-length loop waits for the next poll
        let period = self.pattern[len - 1].offset_ms;
        if period > 0.0 {
            self.fire_due(now, &mut fire);
        } else {
            self.loop_index = len;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 1000.0;
    const A: DrumKind = DrumKind::Kick;
    const B: DrumKind = DrumKind::Snare;

    /// Poll every `interval` samples up to `until`, collecting (time, voice)
    fn run(rec: &mut Recorder, from: u64, until: u64, interval: u64) -> Vec<(u64, DrumKind)> {
        let mut fired = Vec::new();
        let mut now = from;
        while now <= until {
            rec.poll(now, |v| fired.push((now, v)));
            now += interval;
        }
        fired
    }

    #[test]
    fn loop_replays_with_recorded_spacing() {
        let mut rec = Recorder::new(SR);
        rec.start_recording(1000);
        rec.record(A, 1000);
        rec.record(B, 1300);
        assert_eq!(rec.stop_recording(), Some(2));
        assert_eq!(rec.pattern()[1].offset_ms, 300.0);

        rec.start_looping(5000).unwrap();
        let fired = run(&mut rec, 5000, 5950, 1);
        let voices: Vec<DrumKind> = fired.iter().map(|f| f.1).collect();
        assert_eq!(voices, vec![A, B, A, B, A, B, A]);
        let a_times: Vec<u64> = fired.iter().filter(|f| f.1 == A).map(|f| f.0).collect();
        let b_times: Vec<u64> = fired.iter().filter(|f| f.1 == B).map(|f| f.0).collect();
        for (a, b) in a_times.iter().zip(&b_times) {
            assert_eq!(b - a, 300);
        }
        assert_eq!(a_times[1] - a_times[0], 300);
    }

    #[test]
    fn coarse_polling_keeps_order() {
        let mut rec = Recorder::new(SR);
        rec.start_recording(0);
        rec.record(A, 0);
        rec.record(B, 300);
        rec.stop_recording();
        rec.start_looping(0).unwrap();
        // ~60 Hz poller
        let fired = run(&mut rec, 0, 2000, 17);
        let voices: Vec<DrumKind> = fired.iter().map(|f| f.1).collect();
        for pair in voices.chunks(2) {
            assert_eq!(pair[0], A);
            if pair.len() == 2 {
                assert_eq!(pair[1], B);
            }
        }
        assert!(voices.len() >= 10);
    }

    #[test]
    fn zero_length_loop_repeats_once_per_poll() {
        let mut rec = Recorder::new(SR);
        rec.start_recording(0);
        rec.record(A, 0);
        rec.stop_recording();
        rec.start_looping(0).unwrap();
        let fired = run(&mut rec, 0, 40, 10);
        assert_eq!(fired.len(), 5);
    }

    #[test]
    fn looping_needs_a_recording() {
        let mut rec = Recorder::new(SR);
        assert!(matches!(rec.start_looping(0), Err(EngineError::EmptyRecording)));
        rec.start_recording(0);
        rec.stop_recording();
        assert!(matches!(rec.start_looping(0), Err(EngineError::EmptyRecording)));
    }

    #[test]
    fn recording_and_looping_are_exclusive() {
        let mut rec = Recorder::new(SR);
        rec.start_recording(0);
        rec.record(A, 10);
        rec.start_looping(20).unwrap();
        assert_eq!(rec.state(), RecorderState::Looping);
        rec.record(B, 30);
        assert_eq!(rec.pattern().len(), 1);

        rec.start_recording(40);
        assert_eq!(rec.state(), RecorderState::Recording);
        assert!(rec.pattern().is_empty());
        assert!(!rec.stop_looping());
    }
}
