use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::cache::BufferCache;
use super::mixer::MixerState;
use super::recorder::{Recorder, RecorderState};
use super::voice::VoicePlayer;
use crate::command::{Command, GridKind};
use crate::config::EngineConfig;
use crate::error::{check_range, Result};
use crate::event::{EngineEvent, EventLog};
use crate::project::{ProjectSnapshot, ResolvedProject};
use crate::sequencer::{
    BassGrid, ClockKind, DrumGrid, PatternBank, Preset, StepClock, BASS_ROWS, DRUM_TRACKS,
};
use crate::synth::params::{note_to_midi, parse_note};
use crate::synth::{
    bass_row_frequency, midi_to_freq, BassBank, BassTimbre, BassTimbrePatch, DrumKind,
    Instrument, Percussion, DEFAULT_OCTAVE, MAX_OCTAVE, MIN_OCTAVE,
};

/// Clock status as seen by readers of [`EngineState`]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClockStatus {
    pub running: bool,
    pub step: usize,
}

/// Periodically published view of the engine for UI readers
#[derive(Clone, Debug, PartialEq)]
pub struct EngineState {
    pub bpm: f32,
    pub drum: ClockStatus,
    pub bassline: ClockStatus,
    pub metronome: ClockStatus,
    pub recorder: RecorderState,
    pub pattern_slot: usize,
    pub octave: u8,
    pub instrument: Instrument,
    pub active_voices: usize,
    pub latest_event: u64,
    pub frame: u64,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            drum: ClockStatus::default(),
            bassline: ClockStatus::default(),
            metronome: ClockStatus::default(),
            recorder: RecorderState::Idle,
            pattern_slot: 1,
            octave: DEFAULT_OCTAVE,
            instrument: Instrument::Bass,
            active_voices: 0,
            latest_event: 0,
            frame: 0,
        }
    }
}

/// The engine context: every piece of shared session state, driven by
/// [`Command`]s and rendered one frame at a time.
///
/// Time is counted in output samples. Clock ticks, looper polls and the
/// voices they trigger all happen inside [`Engine::next_frame`], so the same
/// engine runs behind a live stream or an offline render.
pub struct Engine {
    sample_rate: f32,
    frame: u64,
    bpm: f32,
    clocks: [StepClock; 3],
    drum_grid: DrumGrid,
    bass_grid: BassGrid,
    bank: PatternBank,
    timbre: BassTimbre,
    bass: BassBank,
    mixer: MixerState,
    cache: BufferCache,
    voices: VoicePlayer,
    recorder: Recorder,
    events: EventLog,
    octave: u8,
    instrument: Instrument,
    poll_interval: u64,
    rng: StdRng,
}

fn slot(kind: ClockKind) -> usize {
    match kind {
        ClockKind::Drum => 0,
        ClockKind::Bassline => 1,
        ClockKind::Metronome => 2,
    }
}

/// Output saturation: linear below 0.5, then an exponential knee toward 1.0
pub fn soft_clip(x: f32) -> f32 {
    let a = x.abs();
    if a <= 0.5 {
        x
    } else {
        let y = 0.5 + 0.5 * (1.0 - (-(a - 0.5) * 2.0).exp());
        y.copysign(x)
    }
}

/// Start one drum voice with the channel's current gain and pan
fn play_drum(
    voices: &mut VoicePlayer,
    cache: &BufferCache,
    mixer: &MixerState,
    events: &mut EventLog,
    frame: u64,
    kind: DrumKind,
) {
    let gain = mixer.effective_gain(kind);
    let pan = mixer.channel(kind).pan;
    voices.trigger_percussion(Percussion::Drum(kind), cache, gain, pan, 0.0);
    events.push(
        frame,
        EngineEvent::VoiceTriggered {
            voice: kind.name().to_string(),
            gain,
        },
    );
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_seed(config, rand::thread_rng().gen())
    }

    /// Engine with reproducible noise, for tests and offline renders
    pub fn with_seed(config: EngineConfig, seed: u64) -> Self {
        let sample_rate = config.sample_rate;
        let bpm = config.bpm.clamp(20.0, 300.0);
        let timbre = BassTimbre::default();
        let poll_interval = (sample_rate / config.loop_poll_hz.max(1.0)).round().max(1.0) as u64;
        Self {
            sample_rate,
            frame: 0,
            bpm,
            clocks: ClockKind::ALL.map(|kind| StepClock::new(kind, sample_rate, bpm)),
            drum_grid: DrumGrid::new(),
            bass_grid: BassGrid::new(),
            bank: PatternBank::new(),
            bass: BassBank::new(&timbre),
            timbre,
            mixer: MixerState::new(config.master_volume, config.metronome_volume),
            cache: BufferCache::new(sample_rate),
            voices: VoicePlayer::new(sample_rate, config.max_voices, seed),
            recorder: Recorder::new(sample_rate),
            events: EventLog::new(),
            octave: DEFAULT_OCTAVE,
            instrument: Instrument::Bass,
            poll_interval,
            rng: StdRng::seed_from_u64(seed.wrapping_add(1)),
        }
    }

    /// Pre-render the percussion buffers. Triggers before this synthesize live.
    pub fn ensure_buffers(&mut self) -> bool {
        self.cache.ensure_ready(&mut self.rng)
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn clock(&self, kind: ClockKind) -> &StepClock {
        &self.clocks[slot(kind)]
    }

    pub fn drum_grid(&self) -> &DrumGrid {
        &self.drum_grid
    }

    pub fn bass_grid(&self) -> &BassGrid {
        &self.bass_grid
    }

    pub fn pattern_bank(&self) -> &PatternBank {
        &self.bank
    }

    pub fn timbre(&self) -> &BassTimbre {
        &self.timbre
    }

    pub fn mixer(&self) -> &MixerState {
        &self.mixer
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn octave(&self) -> u8 {
        self.octave
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    pub fn active_voices(&self) -> usize {
        self.voices.active_count()
    }

    pub fn state(&self) -> EngineState {
        let status = |kind| {
            let clock = self.clock(kind);
            ClockStatus {
                running: clock.is_running(),
                step: clock.current_step(),
            }
        };
        EngineState {
            bpm: self.bpm,
            drum: status(ClockKind::Drum),
            bassline: status(ClockKind::Bassline),
            metronome: status(ClockKind::Metronome),
            recorder: self.recorder.state(),
            pattern_slot: self.bank.current_slot(),
            octave: self.octave,
            instrument: self.instrument,
            active_voices: self.voices.active_count(),
            latest_event: self.events.latest_id(),
            frame: self.frame,
        }
    }

    /// Apply one command. A failed command leaves the engine unchanged.
    pub fn apply(&mut self, command: Command) -> Result<()> {
        match command {
            Command::StartClock(kind) => self.start_clock(kind),
            Command::StopClock(kind) => self.stop_clock(kind),
            Command::SetBpm(bpm) => self.set_bpm(bpm)?,
            Command::ToggleCell { grid, track, step } => {
                self.toggle_cell(grid, track, step)?;
            }
            Command::ClearGrid(GridKind::Drum) => self.drum_grid.clear(),
            Command::ClearGrid(GridKind::Bass) => self.bass_grid.clear(),
            Command::SetBassTimbre(patch) => self.set_bass_timbre(&patch)?,
            Command::LoadPreset(name) => self.load_preset(&name)?,
            Command::SelectSlot(slot) => {
                if let Some(grid) = self.bank.select(slot)? {
                    self.bass_grid = grid;
                }
            }
            Command::SaveSlot => self.bank.save(&self.bass_grid),
            Command::LoadSlot => self.bass_grid = self.bank.load()?,
            Command::CopyPattern => self.bank.copy(&self.bass_grid),
            Command::PastePattern => self.bass_grid = self.bank.paste()?,
            Command::SetMasterVolume(v) => self.mixer.set_master_volume(v)?,
            Command::SetMetronomeVolume(v) => self.mixer.set_metronome_volume(v)?,
            Command::SetChannelVolume { channel, volume } => {
                self.mixer.set_volume(channel, volume)?
            }
            Command::SetChannelPan { channel, pan } => self.mixer.set_pan(channel, pan)?,
            Command::SetMute { channel, muted } => self.mixer.set_mute(channel, muted),
            Command::SetSolo { channel, soloed } => self.mixer.set_solo(channel, soloed),
            Command::SetEffects(effects) => self.mixer.set_effects(&effects)?,
            Command::SetEq(eq) => self.mixer.set_eq(&eq)?,
            Command::SetCompressor(compressor) => self.mixer.set_compressor(&compressor)?,
            Command::TriggerDrum(kind) => self.trigger_voice(kind),
            Command::PlayNote(note) => self.play_note(&note)?,
            Command::SetOctave(octave) => {
                self.octave =
                    check_range("octave", octave as f32, MIN_OCTAVE as f32, MAX_OCTAVE as f32)?
                        as u8;
            }
            Command::SetInstrument(instrument) => self.instrument = instrument,
            Command::StartRecording => self.start_recording(),
            Command::StopRecording => self.stop_recording(),
            Command::StartLoop => self.start_loop()?,
            Command::StopLoop => {
                if self.recorder.stop_looping() {
                    tracing::info!("loop stopped");
                }
            }
            Command::ApplySnapshot(snapshot) => self.apply_full_state(&snapshot)?,
        }
        Ok(())
    }

    pub fn start_clock(&mut self, kind: ClockKind) {
        if self.clocks[slot(kind)].start() {
            tracing::info!(clock = kind.name(), bpm = self.bpm, "clock started");
            self.events
                .push(self.frame, EngineEvent::ClockStarted { clock: kind });
        }
    }

    pub fn stop_clock(&mut self, kind: ClockKind) {
        if self.clocks[slot(kind)].stop() {
            tracing::info!(clock = kind.name(), "clock stopped");
            self.events
                .push(self.frame, EngineEvent::ClockStopped { clock: kind });
        }
    }

    /// Change tempo for every clock; running clocks keep their step
    pub fn set_bpm(&mut self, bpm: f32) -> Result<()> {
        let bpm = check_range("bpm", bpm, 20.0, 300.0)?;
        for clock in self.clocks.iter_mut() {
            clock.set_bpm(bpm);
        }
        self.bpm = bpm;
        tracing::debug!(bpm, "tempo changed");
        Ok(())
    }

    /// Returns the new state of the cell
    pub fn toggle_cell(&mut self, grid: GridKind, track: usize, step: usize) -> Result<bool> {
        match grid {
            GridKind::Drum => self.drum_grid.toggle(track, step),
            GridKind::Bass => self.bass_grid.toggle(track, step),
        }
    }

    pub fn set_bass_timbre(&mut self, patch: &BassTimbrePatch) -> Result<()> {
        if self.timbre.apply(patch)? {
            self.bass.refresh_curve(&self.timbre);
        }
        tracing::debug!(timbre = ?self.timbre, "bass timbre set");
        Ok(())
    }

    /// Replace timbre and bassline grid with a genre preset
    pub fn load_preset(&mut self, name: &str) -> Result<()> {
        let preset = Preset::find(name)?;
        self.timbre = preset.timbre();
        self.bass.refresh_curve(&self.timbre);
        self.bass_grid = preset.grid();
        tracing::info!(preset = preset.name, "preset loaded");
        Ok(())
    }

    /// Play a drum pad now, capturing it if recording
    pub fn trigger_voice(&mut self, kind: DrumKind) {
        play_drum(
            &mut self.voices,
            &self.cache,
            &self.mixer,
            &mut self.events,
            self.frame,
            kind,
        );
        self.recorder.record(kind, self.frame);
    }

    /// Play a keyboard note. A bare pitch class ("F#") uses the current octave.
    pub fn play_note(&mut self, name: &str) -> Result<()> {
        let midi = if name.chars().any(|c| c.is_ascii_digit()) {
            parse_note(name)?
        } else {
            note_to_midi(name, self.octave as i32)?
        };
        let gain = self.mixer.master_volume();
        self.voices
            .trigger_keyboard(self.instrument, midi_to_freq(midi), gain);
        self.events.push(
            self.frame,
            EngineEvent::VoiceTriggered {
                voice: self.instrument.name().to_string(),
                gain,
            },
        );
        Ok(())
    }

    pub fn start_recording(&mut self) {
        self.recorder.start_recording(self.frame);
        tracing::info!("recording started");
    }

    pub fn stop_recording(&mut self) {
        if let Some(entries) = self.recorder.stop_recording() {
            tracing::info!(entries, "recording stopped");
            self.events
                .push(self.frame, EngineEvent::RecordingStopped { entries });
        }
    }

    pub fn start_loop(&mut self) -> Result<()> {
        self.recorder.start_looping(self.frame)?;
        tracing::info!(entries = self.recorder.pattern().len(), "loop started");
        Ok(())
    }

    pub fn gather_state(&self, name: &str) -> ProjectSnapshot {
        ProjectSnapshot::gather(self, name)
    }

    /// Replace all persistent state with a snapshot. Nothing changes unless
    /// the whole snapshot validates.
    pub fn apply_full_state(&mut self, snapshot: &ProjectSnapshot) -> Result<()> {
        let project = snapshot.resolve()?;
        self.restore(project);
        tracing::info!(name = %snapshot.name, "project applied");
        Ok(())
    }

    fn restore(&mut self, project: ResolvedProject) {
        for clock in self.clocks.iter_mut() {
            clock.set_bpm(project.bpm);
        }
        self.bpm = project.bpm;
        self.octave = project.octave;
        self.instrument = project.instrument;
        self.drum_grid = project.drum_grid;
        self.bass_grid = project.bass_grid;
        self.timbre = project.timbre;
        self.bass.refresh_curve(&self.timbre);
        self.mixer = project.mixer;
        self.recorder.set_pattern(project.recording);
    }

    fn fire_drum_step(&mut self, step: usize) {
        for track in 0..DRUM_TRACKS {
            if !self.drum_grid.get(track, step) {
                continue;
            }
            if let Some(kind) = DrumKind::from_index(track) {
                play_drum(
                    &mut self.voices,
                    &self.cache,
                    &self.mixer,
                    &mut self.events,
                    self.frame,
                    kind,
                );
                self.recorder.record(kind, self.frame);
            }
        }
    }

    fn fire_bass_step(&mut self, step: usize) {
        for row in 0..BASS_ROWS {
            if !self.bass_grid.get(row, step) {
                continue;
            }
            let frequency = match bass_row_frequency(row, self.timbre.octave) {
                Ok(f) => f,
                Err(err) => {
                    tracing::warn!(%err, row, "bass trigger skipped");
                    continue;
                }
            };
            let note = self.bass.note(&self.timbre, frequency, self.bpm);
            let gain = self.mixer.master_volume();
            self.voices
                .trigger_bass(&note, gain, self.timbre.glide_seconds());
            self.events.push(
                self.frame,
                EngineEvent::VoiceTriggered {
                    voice: self.timbre.bass_type.name().to_string(),
                    gain,
                },
            );
        }
    }

    fn click(&mut self) {
        let gain = self.mixer.metronome_volume();
        self.voices
            .trigger_percussion(Percussion::Click, &self.cache, gain, 0.0, 0.0);
    }

    fn poll_looper(&mut self) {
        let Engine {
            recorder,
            voices,
            cache,
            mixer,
            events,
            frame,
            ..
        } = self;
        let now = *frame;
        let wrapped = recorder.poll(now, |kind| play_drum(voices, cache, mixer, events, now, kind));
        if wrapped {
            events.push(now, EngineEvent::LoopWrapped);
        }
    }

    /// Advance one sample: tick clocks, poll the looper, mix voices
    pub fn next_frame(&mut self) -> (f32, f32) {
        for i in 0..self.clocks.len() {
            let Some(step) = self.clocks[i].tick() else {
                continue;
            };
            let kind = self.clocks[i].kind();
            self.events
                .push(self.frame, EngineEvent::StepAdvanced { clock: kind, step });
            match kind {
                ClockKind::Drum => self.fire_drum_step(step),
                ClockKind::Bassline => self.fire_bass_step(step),
                ClockKind::Metronome => self.click(),
            }
        }

        if self.frame % self.poll_interval == 0 {
            self.poll_looper();
        }

        let (left, right) = self.voices.next_frame();
        self.frame += 1;
        (soft_clip(left), soft_clip(right))
    }

    /// Silence every sounding voice
    pub fn panic(&mut self) {
        self.voices.clear();
    }
}
