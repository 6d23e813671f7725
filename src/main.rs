use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use beatz::audio::AudioOutput;
use beatz::command::{Command, CommandBus};
use beatz::project::{export_wav, import_project, ProjectStore, RenderOptions};
use beatz::sequencer::{ClockKind, PRESETS};
use beatz::{Engine, EngineConfig};

/// Beatz - drum machine and bassline sequencer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Engine settings file (JSON); unset fields keep their defaults
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Project file to load
    #[arg(long)]
    project: Option<PathBuf>,

    /// Genre preset for the bassline (see --list-presets)
    #[arg(long)]
    preset: Option<String>,

    /// Tempo in beats per minute (20-300)
    #[arg(long)]
    bpm: Option<f32>,

    /// Run the drum sequencer
    #[arg(long)]
    drums: bool,

    /// Run the bassline sequencer
    #[arg(long)]
    bass: bool,

    /// Run the metronome
    #[arg(long)]
    metronome: bool,

    /// Render to a WAV file instead of playing live
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,

    /// Bars to render with --export
    #[arg(long, default_value_t = 4)]
    bars: usize,

    /// How long to play live
    #[arg(long, default_value_t = 8.0)]
    seconds: f32,

    /// List available presets and exit
    #[arg(long)]
    list_presets: bool,

    /// Project store directory
    #[arg(long, value_name = "DIR")]
    store: Option<PathBuf>,

    /// List projects in the store and exit
    #[arg(long, requires = "store")]
    list_projects: bool,

    /// Load a project from the store by key
    #[arg(long, requires = "store", value_name = "KEY")]
    load: Option<String>,

    /// Save the configured project into the store under this name
    #[arg(long, requires = "store", value_name = "NAME")]
    save: Option<String>,
}

impl Args {
    /// Clocks to run; drums and bass when none are chosen
    fn clocks(&self) -> Vec<ClockKind> {
        let chosen: Vec<ClockKind> = [
            (ClockKind::Drum, self.drums),
            (ClockKind::Bassline, self.bass),
            (ClockKind::Metronome, self.metronome),
        ]
        .into_iter()
        .filter_map(|(kind, on)| on.then_some(kind))
        .collect();
        if chosen.is_empty() {
            vec![ClockKind::Drum, ClockKind::Bassline]
        } else {
            chosen
        }
    }

    /// Bring a fresh engine into the state the flags describe
    fn configure(&self, engine: &mut Engine, store: Option<&ProjectStore>) -> Result<()> {
        if let Some(path) = &self.project {
            let snapshot = import_project(path)?;
            engine.apply_full_state(&snapshot)?;
        }
        if let (Some(store), Some(key)) = (store, &self.load) {
            let snapshot = store.load(key)?;
            engine
                .apply_full_state(&snapshot)
                .with_context(|| format!("Failed to apply project {}", key))?;
        }
        if let Some(name) = &self.preset {
            engine.load_preset(name)?;
        }
        if let Some(bpm) = self.bpm {
            engine.set_bpm(bpm)?;
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.list_presets {
        println!("Available presets:");
        for preset in PRESETS.iter() {
            println!("  {:<8} {}", preset.name, preset.bass_type.name());
        }
        return Ok(());
    }

    let store = args
        .store
        .as_ref()
        .map(|dir| ProjectStore::open(dir.clone()))
        .transpose()?;

    if args.list_projects {
        if let Some(store) = &store {
            for entry in store.list()? {
                println!("{}  {}  {} BPM  {}", entry.key, entry.timestamp, entry.bpm, entry.name);
            }
        }
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    if let (Some(store), Some(name)) = (&store, &args.save) {
        let mut engine = Engine::new(config.clone());
        args.configure(&mut engine, Some(store))?;
        let key = store.save(&engine.gather_state(name))?;
        println!("Saved {} as {}", name, key);
        if args.export.is_none() && !(args.drums || args.bass || args.metronome) {
            return Ok(());
        }
    }

    if let Some(path) = &args.export {
        let mut engine = Engine::new(config);
        args.configure(&mut engine, store.as_ref())?;
        let clocks = args.clocks();
        let options = RenderOptions {
            bars: args.bars.max(1),
            drums: clocks.contains(&ClockKind::Drum),
            bass: clocks.contains(&ClockKind::Bassline),
            metronome: clocks.contains(&ClockKind::Metronome),
        };
        let result = export_wav(&mut engine, &options, path)?;
        println!(
            "Exported {} ({:.1}s, {} samples)",
            path.display(),
            result.duration_secs,
            result.samples
        );
        return Ok(());
    }

    let bus = CommandBus::new();
    let output = AudioOutput::start(config, bus.receiver(), |engine| {
        args.configure(engine, store.as_ref())
    })?;

    let tx = bus.sender();
    for kind in args.clocks() {
        tx.send(Command::StartClock(kind));
    }

    let started = Instant::now();
    let run_for = Duration::from_secs_f32(args.seconds.max(0.0).min(86_400.0));
    let mut last_step = None;
    while started.elapsed() < run_for {
        std::thread::sleep(Duration::from_millis(50));
        let state = output.state.read().engine.clone();
        if state.drum.running && last_step != Some(state.drum.step) {
            last_step = Some(state.drum.step);
            tracing::debug!(step = state.drum.step, voices = state.active_voices, "step");
        }
    }

    for kind in ClockKind::ALL {
        tx.send(Command::StopClock(kind));
    }
    std::thread::sleep(Duration::from_millis(100));
    Ok(())
}
