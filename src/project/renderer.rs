use std::path::Path;

use anyhow::{Context, Result};

use crate::audio::Engine;
use crate::sequencer::ClockKind;

const TAIL_SECONDS: f32 = 1.0;
const BEATS_PER_BAR: f32 = 4.0;

/// What to render
#[derive(Clone, Debug)]
pub struct RenderOptions {
    pub bars: usize,
    pub drums: bool,
    pub bass: bool,
    pub metronome: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            bars: 1,
            drums: true,
            bass: true,
            metronome: false,
        }
    }
}

/// Result of an export operation
pub struct ExportResult {
    pub duration_secs: f32,
    pub samples: usize,
}

/// Run the engine's clocks for `bars` bars, then a decay tail with the
/// clocks stopped.
pub fn render(engine: &mut Engine, options: &RenderOptions) -> Vec<(f32, f32)> {
    let sample_rate = engine.sample_rate();
    let samples_per_bar = sample_rate * 60.0 / engine.bpm() * BEATS_PER_BAR;
    let content_samples = (options.bars as f32 * samples_per_bar).round() as usize;
    let tail_samples = (sample_rate * TAIL_SECONDS) as usize;

    engine.ensure_buffers();
    let clocks = [
        (ClockKind::Drum, options.drums),
        (ClockKind::Bassline, options.bass),
        (ClockKind::Metronome, options.metronome),
    ];
    for (kind, enabled) in clocks {
        if enabled {
            engine.start_clock(kind);
        }
    }

    let mut output = Vec::with_capacity(content_samples + tail_samples);
    for _ in 0..content_samples {
        output.push(engine.next_frame());
    }
    for kind in ClockKind::ALL {
        engine.stop_clock(kind);
    }
    for _ in 0..tail_samples {
        output.push(engine.next_frame());
    }
    output
}

/// Render and export audio as a 16-bit stereo WAV file
pub fn export_wav(engine: &mut Engine, options: &RenderOptions, path: &Path) -> Result<ExportResult> {
    let samples = render(engine, options);
    let sample_rate = engine.sample_rate();

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: sample_rate as u32,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;

    for (left, right) in &samples {
        let l = (*left * 32767.0).clamp(-32768.0, 32767.0) as i16;
        let r = (*right * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer.write_sample(l)?;
        writer.write_sample(r)?;
    }

    writer
        .finalize()
        .with_context(|| format!("Failed to finalize WAV file: {}", path.display()))?;

    let duration_secs = samples.len() as f32 / sample_rate;
    tracing::info!(path = %path.display(), duration_secs, bars = options.bars, "rendered");

    Ok(ExportResult {
        duration_secs,
        samples: samples.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, GridKind};
    use crate::config::EngineConfig;

    fn engine() -> Engine {
        let mut engine = Engine::with_seed(EngineConfig::with_sample_rate(8000.0), 11);
        engine
            .apply(Command::ToggleCell {
                grid: GridKind::Drum,
                track: 0,
                step: 0,
            })
            .unwrap();
        engine
    }

    #[test]
    fn render_covers_bars_plus_tail() {
        let mut engine = engine();
        let out = render(&mut engine, &RenderOptions::default());
        // One bar at 120 BPM is 2 s
        assert_eq!(out.len(), 16000 + 8000);
        assert!(out[..100].iter().any(|(l, _)| *l != 0.0));
        assert!(out.iter().all(|(l, r)| l.abs() <= 1.0 && r.abs() <= 1.0));
        assert!(!engine.clock(ClockKind::Drum).is_running());
        assert_eq!(out[out.len() - 1], (0.0, 0.0));
    }

    #[test]
    fn exports_stereo_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beat.wav");
        let mut engine = engine();
        let options = RenderOptions {
            bars: 2,
            ..Default::default()
        };
        let result = export_wav(&mut engine, &options, &path).unwrap();
        assert_eq!(result.samples, 40000);
        assert!((result.duration_secs - 5.0).abs() < 1e-4);

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 8000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len(), 80000);
    }
}
