//! Audio output seam used by the playback loop
//!
//! The scheduler only needs to know the negotiated format and to open the
//! gate once the ring has been filled; everything host specific stays behind
//! this trait.

use super::error::AudioResult;

/// A host output whose callback is already installed but not yet running
pub trait AudioOutput {
    /// Begin callback invocation
    ///
    /// Called once, after the first fill of the ring buffer.
    fn start(&mut self) -> AudioResult<()>;

    /// Whether [`start`](Self::start) has succeeded
    fn is_started(&self) -> bool;

    /// Sample rate the host negotiated
    fn sample_rate(&self) -> u32;

    /// Callback period in frames
    fn buffer_size(&self) -> u32;

    /// One-way output latency in milliseconds
    fn latency_ms(&self) -> f32 {
        (self.buffer_size() as f32 / self.sample_rate().max(1) as f32) * 1000.0
    }
}
