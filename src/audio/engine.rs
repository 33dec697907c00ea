// Moteur audio - CPAL output stream for metronome clicks
//
// The tick thread never touches the stream: `AudioClickSink` pushes
// `ClickCommand`s into a ring buffer that the audio callback drains at the
// start of every buffer. On macOS the `Stream` is not Send, so `ClickEngine`
// stays on the thread that created it while the sink moves to the tick thread.
//
// Supported device formats are F32, I16 and U16; clicks are rendered in f32
// and converted per frame with `FromSample<f32>`.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer};
use thiserror::Error;

use crate::audio::click::ClickVoice;
use crate::audio::status::{AtomicOutputStatus, OutputStatus};
use crate::messaging::channels::{ClickConsumer, ClickProducer, create_click_channel};
use crate::messaging::command::ClickCommand;
use crate::sequencer::{ClickSink, ClickType, MetronomeError, MetronomeResult};

/// Audio output errors
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("No audio output device found")]
    NoDevice,

    #[error("Audio configuration error: {0}")]
    Config(String),

    #[error("Audio stream error: {0}")]
    Stream(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),
}

/// Owns the output stream; dropping it stops playback
pub struct ClickEngine {
    _device: Device,
    _stream: Stream,
    status: AtomicOutputStatus,
}

impl ClickEngine {
    /// Open the default output device and start a click stream at `volume`
    /// (0.0 to 1.0). Returns the engine and the sink to hand to the metronome.
    pub fn new(volume: f32, command_capacity: usize) -> Result<(Self, AudioClickSink), AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        log::info!(
            "Audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let supported_config = device
            .default_output_config()
            .map_err(|e| AudioError::Config(e.to_string()))?;

        let sample_format = supported_config.sample_format();
        let sample_rate = supported_config.sample_rate().0 as f32;
        let channels = supported_config.channels() as usize;
        let config: StreamConfig = supported_config.into();

        log::debug!("Audio config: {:?}, sample format {:?}", config, sample_format);

        let (command_tx, command_rx) = create_click_channel(command_capacity.max(1));
        let gain = volume.clamp(0.0, 1.0);
        let status = AtomicOutputStatus::new(OutputStatus::Starting);
        let voice = ClickVoice::new(sample_rate);

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(
                &device,
                &config,
                channels,
                command_rx,
                voice,
                gain,
                status.clone(),
            ),
            SampleFormat::I16 => Self::build_stream::<i16>(
                &device,
                &config,
                channels,
                command_rx,
                voice,
                gain,
                status.clone(),
            ),
            SampleFormat::U16 => Self::build_stream::<u16>(
                &device,
                &config,
                channels,
                command_rx,
                voice,
                gain,
                status.clone(),
            ),
            other => return Err(AudioError::UnsupportedFormat(format!("{:?}", other))),
        }?;

        stream
            .play()
            .map_err(|e| AudioError::Stream(e.to_string()))?;
        status.set(OutputStatus::Running);

        log::info!("Click output started: {} Hz, {} channels", sample_rate, channels);

        let sink = AudioClickSink::from_parts(command_tx, status.clone());

        Ok((
            Self {
                _device: device,
                _stream: stream,
                status,
            },
            sink,
        ))
    }

    /// Current state of the output stream
    pub fn status(&self) -> OutputStatus {
        self.status.get()
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        channels: usize,
        mut commands: ClickConsumer,
        mut voice: ClickVoice,
        gain: f32,
        status: AtomicOutputStatus,
    ) -> Result<Stream, AudioError>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    // No allocations, no I/O, no blocking locks
                    while let Some(command) = commands.try_pop() {
                        match command {
                            ClickCommand::Play(click_type) => voice.trigger(click_type),
                            ClickCommand::Silence => voice.silence(),
                        }
                    }

                    if !voice.is_active() {
                        data.fill(T::EQUILIBRIUM);
                        return;
                    }

                    for frame in data.chunks_mut(channels) {
                        let sample = T::from_sample(voice.next_sample() * gain);
                        for channel_sample in frame.iter_mut() {
                            *channel_sample = sample;
                        }
                    }
                },
                move |err| {
                    log::error!("Audio stream error: {}", err);
                    status.set(OutputStatus::Failed);
                },
                None,
            )
            .map_err(|e| AudioError::Stream(e.to_string()))
    }
}

/// `ClickSink` that feeds the click stream
pub struct AudioClickSink {
    commands: ClickProducer,
    status: AtomicOutputStatus,
}

impl AudioClickSink {
    /// Sink over an existing click channel (the consumer end feeds a stream)
    pub fn from_parts(commands: ClickProducer, status: AtomicOutputStatus) -> Self {
        Self { commands, status }
    }
}

impl ClickSink for AudioClickSink {
    fn prepare(&mut self) -> MetronomeResult<()> {
        match self.status.get() {
            OutputStatus::Failed => Err(MetronomeError::EmissionFailure(
                "audio stream has failed".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn emit(&mut self, click: ClickType) -> MetronomeResult<()> {
        if self.status.get() == OutputStatus::Failed {
            return Err(MetronomeError::EmissionFailure(
                "audio stream has failed".to_string(),
            ));
        }

        self.commands
            .try_push(ClickCommand::Play(click))
            .map_err(|_| MetronomeError::EmissionFailure("click queue is full".to_string()))
    }

    /// Cut the click still sounding when the metronome stops
    fn finish(&mut self) -> MetronomeResult<()> {
        self.commands
            .try_push(ClickCommand::Silence)
            .map_err(|_| MetronomeError::EmissionFailure("click queue is full".to_string()))
    }
}
