//! cpal output stream
//!
//! ```text
//! ┌──────────────────┐                     ┌─────────────────────┐
//! │  Foreground loop │──write() + lock────►│  SharedRingBuffer   │
//! │ (PlaybackSched.) │                     └──────────┬──────────┘
//! └──────────────────┘                                │ read() + lock
//!         │ start() after first fill                  ▼
//!         ▼                                ┌─────────────────────┐
//! ┌──────────────────┐    owns             │  cpal audio thread  │
//! │    CpalOutput    │────────────────────►│ (AudioCallbackSink) │
//! └──────────────────┘                     └─────────────────────┘
//! ```
//!
//! The stream is built paused so nothing is pulled from the ring before the
//! playback loop has filled it once.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{
    BufferSize as CpalBufferSize, FromSample, SampleFormat, SizedSample, Stream, StreamConfig,
    SupportedBufferSize, SupportedStreamConfigRange,
};

use super::backend::AudioOutput;
use super::config::{AudioConfig, DEFAULT_BUFFER_SIZE};
use super::device::resolve_device;
use super::error::{AudioError, AudioResult};
use super::sink::AudioCallbackSink;
use crate::types::{Sample, CHANNELS};

/// Keeps the stream alive; drop it to stop audio
pub struct CpalOutput {
    stream: Stream,
    sample_rate: u32,
    buffer_size: u32,
    started: bool,
}

impl AudioOutput for CpalOutput {
    fn start(&mut self) -> AudioResult<()> {
        if self.started {
            return Ok(());
        }
        self.stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;
        self.started = true;
        log::info!("Audio stream started");
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.started
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn buffer_size(&self) -> u32 {
        self.buffer_size
    }
}

/// Device and stream settings, chosen before the callback exists
///
/// The ring is sized from the negotiated period, so the plan is made first and
/// the sink installed afterwards with [`OutputPlan::open`].
pub struct OutputPlan {
    device: cpal::Device,
    stream_config: StreamConfig,
    sample_format: SampleFormat,
    sample_rate: u32,
    buffer_size: Option<u32>,
}

impl OutputPlan {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames per callback; the usual default when the host picks it
    pub fn buffer_size(&self) -> u32 {
        self.buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE)
    }

    /// Build the stream with `sink` as its callback
    ///
    /// The returned output is paused; call [`AudioOutput::start`] after the
    /// first fill of the ring.
    pub fn open(self, sink: AudioCallbackSink) -> AudioResult<CpalOutput> {
        let stream = match self.sample_format {
            SampleFormat::I16 => build_stream::<i16>(&self.device, &self.stream_config, sink)?,
            SampleFormat::F32 => build_stream::<f32>(&self.device, &self.stream_config, sink)?,
            SampleFormat::U16 => build_stream::<u16>(&self.device, &self.stream_config, sink)?,
            other => return Err(AudioError::UnsupportedFormat(format!("{:?}", other))),
        };

        // Some hosts start streams on creation
        if let Err(e) = stream.pause() {
            log::debug!("Could not pause new stream: {}", e);
        }

        Ok(CpalOutput {
            stream,
            sample_rate: self.sample_rate,
            buffer_size: self.buffer_size(),
            started: false,
        })
    }
}

/// Resolve the configured device and negotiate rate, format and period
pub fn plan_output(config: &AudioConfig) -> AudioResult<OutputPlan> {
    let device = resolve_device(config.device.as_ref())?;
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    log::info!("Using audio device: {}", device_name);

    let (range, sample_rate) = select_config(&device, config.sample_rate)?;
    let buffer_size = negotiate_buffer_size(range.buffer_size(), config);
    let stream_config = StreamConfig {
        channels: range.channels(),
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: match buffer_size {
            Some(frames) => CpalBufferSize::Fixed(frames),
            None => CpalBufferSize::Default,
        },
    };

    log::info!(
        "Audio config: {} channels, {}Hz, {:?}, {} frames",
        stream_config.channels,
        sample_rate,
        range.sample_format(),
        buffer_size.map_or_else(|| "host default".to_string(), |f| f.to_string())
    );

    Ok(OutputPlan {
        device,
        stream_config,
        sample_format: range.sample_format(),
        sample_rate,
        buffer_size,
    })
}

fn format_rank(format: SampleFormat) -> Option<u8> {
    match format {
        SampleFormat::I16 => Some(0),
        SampleFormat::F32 => Some(1),
        SampleFormat::U16 => Some(2),
        _ => None,
    }
}

/// Pick a supported configuration, preferring 16-bit stereo at `target_rate`
///
/// Falls back to whatever rate the best format supports; the emulator is then
/// opened at that rate instead.
fn select_config(
    device: &cpal::Device,
    target_rate: u32,
) -> AudioResult<(SupportedStreamConfigRange, u32)> {
    let supported: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .filter(|c| format_rank(c.sample_format()).is_some())
        .collect();

    if supported.is_empty() {
        return Err(AudioError::UnsupportedFormat(
            "device offers no i16, f32 or u16 output".to_string(),
        ));
    }

    let supports_rate =
        |c: &SupportedStreamConfigRange| (c.min_sample_rate().0..=c.max_sample_rate().0).contains(&target_rate);
    let channel_rank = |c: &SupportedStreamConfigRange| match c.channels() as usize {
        CHANNELS => 0,
        1 => 2,
        _ => 1,
    };

    let best = supported
        .iter()
        .min_by_key(|c| (!supports_rate(c), channel_rank(c), format_rank(c.sample_format())))
        .ok_or_else(|| AudioError::ConfigError("No suitable output configuration found".to_string()))?;

    let sample_rate = if supports_rate(best) {
        target_rate
    } else {
        let fallback = best.max_sample_rate().0;
        log::warn!(
            "Audio device doesn't support {}Hz, falling back to {}Hz",
            target_rate,
            fallback
        );
        fallback
    };

    Ok((best.clone(), sample_rate))
}

/// Requested period clamped to what the device reports, None for host default
fn negotiate_buffer_size(supported: &SupportedBufferSize, config: &AudioConfig) -> Option<u32> {
    let requested = config.buffer_size.as_frames()?;
    match supported {
        SupportedBufferSize::Range { min, max } => Some(requested.clamp(*min, *max)),
        SupportedBufferSize::Unknown => Some(requested),
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut sink: AudioCallbackSink,
) -> AudioResult<Stream>
where
    T: SizedSample + FromSample<Sample>,
{
    let channels = config.channels as usize;
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _info: &cpal::OutputCallbackInfo| {
                sink.fill_device(data, channels);
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}
