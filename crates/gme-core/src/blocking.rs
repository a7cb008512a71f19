//! Blocking (non-realtime) playback
//!
//! Decodes one period at a time and hands it to a sink that may block for as
//! long as it likes, until the track has played for its play length or the
//! decoder stops. Used for rendering to files and to pipes such as
//! `gmeplay render song.nsf -o - | aplay -f cd`.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::emu::EmuError;
use crate::session::DecodeSession;
use crate::types::{whole_frames, Sample, CHANNELS};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Write failed: {0}")]
    Io(#[from] io::Error),

    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),
}

/// Destination for decoded periods
pub trait BlockingSink {
    fn write_block(&mut self, samples: &[Sample]) -> Result<(), RenderError>;

    /// Flush and close; called once after the last block
    fn finish(&mut self) -> Result<(), RenderError>;
}

/// Interleaved signed 16-bit little-endian PCM to any writer
pub struct RawPcmSink<W: Write> {
    out: W,
    bytes: Vec<u8>,
}

impl<W: Write> RawPcmSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            bytes: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> BlockingSink for RawPcmSink<W> {
    fn write_block(&mut self, samples: &[Sample]) -> Result<(), RenderError> {
        self.bytes.clear();
        self.bytes.extend(samples.iter().flat_map(|s| s.to_le_bytes()));
        self.out.write_all(&self.bytes)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        self.out.flush()?;
        Ok(())
    }
}

/// 16-bit stereo WAV file
pub struct WavFileSink {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
}

impl WavFileSink {
    pub fn create(path: &Path, sample_rate: u32) -> Result<Self, RenderError> {
        let spec = hound::WavSpec {
            channels: CHANNELS as u16,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(path, spec)?;
        log::info!("Writing {:?} ({} Hz stereo)", path, sample_rate);
        Ok(Self {
            writer: Some(writer),
        })
    }
}

impl BlockingSink for WavFileSink {
    fn write_block(&mut self, samples: &[Sample]) -> Result<(), RenderError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(io::Error::new(io::ErrorKind::Other, "WAV file already finalized").into());
        };
        let mut block = writer.get_i16_writer(samples.len() as u32);
        for &sample in samples {
            block.write_sample(sample);
        }
        block.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
        }
        Ok(())
    }
}

/// Why rendering stopped
#[derive(Debug)]
pub enum RenderStop {
    /// The track reached its play length
    PlayLength,
    DecodeFailure(EmuError),
}

#[derive(Debug)]
pub struct RenderSummary {
    /// Interleaved samples written to the sink
    pub samples: u64,
    pub elapsed_ms: u64,
    pub stop: RenderStop,
}

/// Play the session's current track into `sink` in `period_samples` blocks
///
/// Decode failures end the render and are returned in the summary; only sink
/// failures are errors.
pub fn render_track(
    session: &mut DecodeSession,
    sink: &mut dyn BlockingSink,
    period_samples: usize,
) -> Result<RenderSummary, RenderError> {
    let mut block = vec![0; whole_frames(period_samples).max(CHANNELS)];
    let mut written = 0u64;

    let stop = loop {
        if session.reached_play_length() {
            break RenderStop::PlayLength;
        }
        if let Err(e) = session.produce(&mut block) {
            log::warn!("Decoder stopped: {}", e);
            break RenderStop::DecodeFailure(e);
        }
        sink.write_block(&block)?;
        written += block.len() as u64;
    };
    sink.finish()?;

    let summary = RenderSummary {
        samples: written,
        elapsed_ms: session.elapsed_ms(),
        stop,
    };
    log::info!(
        "Rendered {} ms of track {} ({} samples)",
        summary.elapsed_ms,
        session.track_index(),
        summary.samples
    );
    Ok(summary)
}
