use std::sync::Arc;

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use parking_lot::RwLock;

use super::engine::{Engine, EngineState};
use crate::command::CommandReceiver;
use crate::config::EngineConfig;
use crate::event::Event;

/// What the audio thread publishes for UI readers
#[derive(Clone, Debug, Default)]
pub struct SharedState {
    pub engine: EngineState,
    /// Events since the previous publish
    pub recent_events: Vec<Event>,
}

/// Live output on the default device. The stream callback owns the engine.
pub struct AudioOutput {
    _stream: Stream,
    pub state: Arc<RwLock<SharedState>>,
    pub sample_rate: f32,
}

impl AudioOutput {
    /// Open the default output device and start rendering. `setup` runs on
    /// the engine before the stream starts, after buffers are pre-rendered.
    pub fn start(
        config: EngineConfig,
        command_rx: CommandReceiver,
        setup: impl FnOnce(&mut Engine) -> Result<()>,
    ) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("No output device available")?;

        let supported = device
            .default_output_config()
            .context("No default output config")?;
        let sample_format = supported.sample_format();
        let stream_config: StreamConfig = supported.into();
        let sample_rate = stream_config.sample_rate.0 as f32;

        let mut engine = Engine::new(EngineConfig {
            sample_rate,
            ..config
        });
        engine.ensure_buffers();
        setup(&mut engine)?;

        let state = Arc::new(RwLock::new(SharedState::default()));

        let stream = match sample_format {
            SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &stream_config, engine, command_rx, state.clone())?
            }
            SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &stream_config, engine, command_rx, state.clone())?
            }
            SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &stream_config, engine, command_rx, state.clone())?
            }
            format => anyhow::bail!("Unsupported sample format: {:?}", format),
        };

        stream.play().context("Failed to start output stream")?;
        tracing::info!(sample_rate, ?sample_format, "audio output started");

        Ok(Self {
            _stream: stream,
            state,
            sample_rate,
        })
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        mut engine: Engine,
        command_rx: CommandReceiver,
        state: Arc<RwLock<SharedState>>,
    ) -> Result<Stream>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        let channels = config.channels as usize;

        let mut sync_counter = 0usize;
        let sync_interval = (engine.sample_rate() / 60.0) as usize; // ~60 times per second
        let mut published_event = 0u64;

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                while let Some(cmd) = command_rx.try_recv() {
                    let description = cmd.description();
                    if let Err(err) = engine.apply(cmd) {
                        tracing::warn!(%err, command = %description, "command failed");
                    }
                }

                for frame in data.chunks_mut(channels) {
                    let (left, right) = engine.next_frame();

                    // Left to ch0, right to ch1, mono mix for the rest
                    for (ch, channel_sample) in frame.iter_mut().enumerate() {
                        let sample = match ch {
                            0 => left,
                            1 => right,
                            _ => (left + right) * 0.5,
                        };
                        *channel_sample = T::from_sample(sample);
                    }

                    sync_counter += 1;
                    if sync_counter >= sync_interval {
                        sync_counter = 0;
                        if let Some(mut shared) = state.try_write() {
                            shared.engine = engine.state();
                            shared.recent_events = engine.events().get_events_since(published_event);
                            published_event = engine.events().latest_id();
                        }
                    }
                }
            },
            |err| {
                tracing::error!(%err, "audio stream error");
            },
            None,
        )?;

        Ok(stream)
    }
}
