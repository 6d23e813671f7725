use serde::{Deserialize, Serialize};

use super::pattern::STEPS;

/// The independently clocked sequencers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockKind {
    Drum,
    Bassline,
    Metronome,
}

impl ClockKind {
    pub const ALL: [ClockKind; 3] = [ClockKind::Drum, ClockKind::Bassline, ClockKind::Metronome];

    pub fn name(&self) -> &'static str {
        match self {
            ClockKind::Drum => "drum",
            ClockKind::Bassline => "bassline",
            ClockKind::Metronome => "metronome",
        }
    }

    /// Ticks per beat: sixteenths for the grids, quarters for the metronome
    pub fn ticks_per_beat(&self) -> f64 {
        match self {
            ClockKind::Metronome => 1.0,
            _ => 4.0,
        }
    }

    /// Step count the position wraps at
    pub fn steps(&self) -> usize {
        match self {
            ClockKind::Metronome => 4,
            _ => STEPS,
        }
    }
}

/// BPM timing; counts samples on the audio thread and reports step ticks
pub struct StepClock {
    kind: ClockKind,
    bpm: f64,
    sample_rate: f64,
    samples_per_step: f64,
    sample_counter: f64,
    /// None until the first tick after start
    current_step: Option<usize>,
    running: bool,
}

impl StepClock {
    pub fn new(kind: ClockKind, sample_rate: f32, bpm: f32) -> Self {
        let mut clock = Self {
            kind,
            bpm: bpm as f64,
            sample_rate: sample_rate as f64,
            samples_per_step: 0.0,
            sample_counter: 0.0,
            current_step: None,
            running: false,
        };
        clock.recalculate_timing();
        clock
    }

    fn recalculate_timing(&mut self) {
        self.samples_per_step = self.sample_rate * self.period_ms() / 1000.0;
    }

    pub fn kind(&self) -> ClockKind {
        self.kind
    }

    pub fn bpm(&self) -> f32 {
        self.bpm as f32
    }

    /// Tick period in milliseconds: `(60 / bpm) * 1000 / ticks_per_beat`
    pub fn period_ms(&self) -> f64 {
        60.0 / self.bpm * 1000.0 / self.kind.ticks_per_beat()
    }

    /// Change tempo. A running clock restarts its period countdown from now
    /// and keeps its step position.
    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm as f64;
        self.recalculate_timing();
        if self.running {
            self.sample_counter = 0.0;
        }
    }

    /// Last step fired; 0 when stopped or not yet ticked
    pub fn current_step(&self) -> usize {
        self.current_step.unwrap_or(0)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Called once per sample. Returns Some(step) when a new step fires.
    pub fn tick(&mut self) -> Option<usize> {
        if !self.running {
            return None;
        }

        self.sample_counter += 1.0;
        if self.sample_counter >= self.samples_per_step {
            self.sample_counter -= self.samples_per_step;
            let step = match self.current_step {
                None => 0,
                Some(s) => (s + 1) % self.kind.steps(),
            };
            self.current_step = Some(step);
            return Some(step);
        }
        None
    }

    /// Returns false if already running
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.current_step = None;
        // Fire step 0 on the next sample
        self.sample_counter = self.samples_per_step - 1.0;
        true
    }

    /// Returns false if already stopped
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        self.current_step = None;
        self.sample_counter = 0.0;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sample indices at which the clock ticked, over `samples` samples
    fn tick_times(clock: &mut StepClock, samples: usize) -> Vec<(usize, usize)> {
        (0..samples)
            .filter_map(|i| clock.tick().map(|step| (i, step)))
            .collect()
    }

    #[test]
    fn sixteenth_period_at_120() {
        let clock = StepClock::new(ClockKind::Drum, 44100.0, 120.0);
        assert!((clock.period_ms() - 125.0).abs() < 1e-9);
        let metronome = StepClock::new(ClockKind::Metronome, 44100.0, 120.0);
        assert!((metronome.period_ms() - 500.0).abs() < 1e-9);
    }

    #[test]
    fn first_tick_is_step_zero_and_immediate() {
        let mut clock = StepClock::new(ClockKind::Drum, 1000.0, 120.0);
        clock.start();
        let ticks = tick_times(&mut clock, 400);
        // 125 samples per step at 1 kHz
        assert_eq!(ticks[0], (0, 0));
        assert_eq!(ticks[1], (125, 1));
        assert_eq!(ticks[3], (375, 3));
    }

    #[test]
    fn tempo_change_keeps_step_and_stretches_period() {
        let mut clock = StepClock::new(ClockKind::Drum, 1000.0, 120.0);
        clock.start();
        let ticks = tick_times(&mut clock, 260);
        assert_eq!(ticks.last().map(|t| t.1), Some(2));

        clock.set_bpm(60.0);
        assert!((clock.period_ms() - 250.0).abs() < 1e-9);
        assert_eq!(clock.current_step(), 2);
        let ticks = tick_times(&mut clock, 600);
        assert_eq!(ticks[0], (249, 3));
        assert_eq!(ticks[1], (499, 4));
    }

    #[test]
    fn steps_wrap_and_stop_resets() {
        let mut clock = StepClock::new(ClockKind::Metronome, 100.0, 600.0);
        // 10 samples per beat
        clock.start();
        let steps: Vec<usize> = tick_times(&mut clock, 60).into_iter().map(|t| t.1).collect();
        assert_eq!(steps, vec![0, 1, 2, 3, 0, 1]);

        assert!(clock.stop());
        assert!(!clock.stop());
        assert_eq!(clock.current_step(), 0);
        assert!(clock.tick().is_none());
        clock.start();
        assert_eq!(clock.tick(), Some(0));
    }
}
