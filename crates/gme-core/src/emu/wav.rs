//! RIFF/WAVE emulator
//!
//! Treats a WAV file as single-track media with one voice per channel.
//! Samples of any bit depth are normalized to 16 bits on load and stepped to
//! the output rate with a 32.32 fixed-point cursor.

use std::io::Cursor;

use hound::{SampleFormat, WavReader};

use super::{EmuError, EmuResult, MusicEmu, OpenMode, TrackInfo};
use crate::types::{Sample, CHANNELS};

pub struct WavEmu {
    /// Interleaved source samples (empty when opened for information only)
    samples: Vec<Sample>,
    channels: usize,
    source_rate: u32,
    frames: usize,
    /// Output rate, None when opened for information only
    output_rate: Option<u32>,
    /// Source frame position, 32.32 fixed point
    position: u64,
    step: u64,
    muted: Vec<bool>,
    info: TrackInfo,
}

impl WavEmu {
    pub fn from_bytes(data: &[u8], mode: OpenMode) -> EmuResult<Self> {
        let mut reader = WavReader::new(Cursor::new(data))
            .map_err(|e| EmuError::InvalidData(format!("WAV: {}", e)))?;
        let spec = reader.spec();
        let channels = spec.channels as usize;
        if channels == 0 || spec.sample_rate == 0 {
            return Err(EmuError::InvalidData(
                "WAV header has no channels or a zero sample rate".to_string(),
            ));
        }
        let frames = reader.duration() as usize;

        let samples = match mode {
            OpenMode::InfoOnly => Vec::new(),
            OpenMode::Playback(_) => read_samples(&mut reader)?,
        };
        let frames = if samples.is_empty() {
            frames
        } else {
            samples.len() / channels
        };

        let length_ms = (frames as u64 * 1000 / spec.sample_rate as u64).min(i32::MAX as u64) as i32;
        let info = TrackInfo {
            system: "RIFF WAVE".to_string(),
            ..TrackInfo::default()
        }
        .with_lengths(length_ms, -1, -1);

        let output_rate = mode.sample_rate();
        let step = output_rate
            .filter(|&rate| rate > 0)
            .map(|rate| ((spec.sample_rate as u64) << 32) / rate as u64)
            .unwrap_or(1 << 32);

        log::debug!(
            "WAV: {} channels, {}Hz, {} bits, {} frames",
            channels,
            spec.sample_rate,
            spec.bits_per_sample,
            frames
        );

        Ok(Self {
            samples,
            channels,
            source_rate: spec.sample_rate,
            frames,
            output_rate,
            position: 0,
            step,
            muted: vec![false; channels],
            info,
        })
    }

    /// Downmix one source frame to a stereo pair, skipping muted channels
    ///
    /// Even channels feed the left output and odd channels the right; mono
    /// feeds both. Muted channels still count toward the divisor so muting
    /// never raises the level of the remaining voices.
    fn mix_frame(&self, frame: usize) -> (Sample, Sample) {
        let base = frame * self.channels;
        let mut acc = [0i32; CHANNELS];
        let mut count = [0i32; CHANNELS];
        for channel in 0..self.channels {
            let value = if self.muted[channel] {
                0
            } else {
                self.samples[base + channel] as i32
            };
            if self.channels == 1 {
                acc[0] += value;
                acc[1] += value;
                count[0] += 1;
                count[1] += 1;
            } else {
                acc[channel % 2] += value;
                count[channel % 2] += 1;
            }
        }
        (
            (acc[0] / count[0].max(1)) as Sample,
            (acc[1] / count[1].max(1)) as Sample,
        )
    }

    #[inline]
    fn current_frame(&self) -> usize {
        (self.position >> 32) as usize
    }
}

fn read_samples(reader: &mut WavReader<Cursor<&[u8]>>) -> EmuResult<Vec<Sample>> {
    let spec = reader.spec();
    let decode_err = |e: hound::Error| EmuError::InvalidData(format!("WAV samples: {}", e));
    match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| {
                s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as Sample)
                    .map_err(decode_err)
            })
            .collect(),
        SampleFormat::Int => {
            let bits = spec.bits_per_sample as i32;
            reader
                .samples::<i32>()
                .map(|s| {
                    s.map(|v| {
                        if bits > 16 {
                            (v >> (bits - 16)) as Sample
                        } else {
                            (v << (16 - bits)) as Sample
                        }
                    })
                    .map_err(decode_err)
                })
                .collect()
        }
    }
}

impl MusicEmu for WavEmu {
    fn track_count(&self) -> usize {
        1
    }

    fn track_info(&self, index: usize) -> EmuResult<TrackInfo> {
        if index != 0 {
            return Err(EmuError::TrackOutOfRange {
                requested: index as i64,
                track_count: 1,
                clamped: 0,
            });
        }
        Ok(self.info.clone())
    }

    fn start_track(&mut self, index: usize) -> EmuResult<()> {
        self.track_info(index)?;
        self.position = 0;
        Ok(())
    }

    fn play(&mut self, out: &mut [Sample]) -> EmuResult<()> {
        if self.output_rate.is_none() {
            return Err(EmuError::InfoOnly);
        }
        if self.current_frame() >= self.frames {
            return Err(EmuError::EndOfTrack);
        }

        for pair in out.chunks_exact_mut(CHANNELS) {
            let frame = self.current_frame();
            if frame >= self.frames {
                pair.fill(0);
                continue;
            }
            let (left, right) = self.mix_frame(frame);
            pair[0] = left;
            pair[1] = right;
            self.position += self.step;
        }
        Ok(())
    }

    fn voice_count(&self) -> usize {
        self.channels
    }

    fn voice_name(&self, index: usize) -> String {
        match (self.channels, index) {
            (1, 0) => "Mono".to_string(),
            (2, 0) => "Left".to_string(),
            (2, 1) => "Right".to_string(),
            _ => format!("Channel {}", index + 1),
        }
    }

    fn mute_voice(&mut self, index: usize, muted: bool) {
        if let Some(flag) = self.muted.get_mut(index) {
            *flag = muted;
        }
    }

    fn tell_ms(&self) -> i64 {
        (self.current_frame() as u64 * 1000 / self.source_rate as u64) as i64
    }

    fn sample_rate(&self) -> u32 {
        self.output_rate.unwrap_or(0)
    }
}
