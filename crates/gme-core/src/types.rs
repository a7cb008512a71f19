//! Common types for gmeplay
//!
//! Sample format and sizing constants shared by the decode side, the ring
//! buffer and the audio host.

/// Default output sample rate (Hz)
pub const SAMPLE_RATE: u32 = 44100;

/// Interleaved output channels (left, right)
pub const CHANNELS: usize = 2;

/// Default audio period in interleaved samples (512 stereo frames)
pub const DEFAULT_PERIOD_SAMPLES: usize = 1024;

/// Ring capacity expressed in audio periods
pub const DEFAULT_RING_PERIODS: usize = 10;

/// Highest number of voices addressable from the keyboard (digit keys 0-9)
pub const MAX_VOICES: usize = 10;

/// A single interleaved PCM sample
pub type Sample = i16;

/// Play length used when a track reports neither a length nor a loop length
pub const DEFAULT_PLAY_LENGTH_MS: i32 = 150_000;

/// Round a sample count down to a whole number of stereo frames
#[inline]
pub fn whole_frames(samples: usize) -> usize {
    samples - samples % CHANNELS
}

/// Duration in milliseconds of `samples` interleaved samples at `sample_rate`
#[inline]
pub fn samples_to_ms(samples: u64, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    samples / CHANNELS as u64 * 1000 / sample_rate as u64
}
