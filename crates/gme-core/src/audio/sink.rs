//! Realtime consumer side of the ring buffer
//!
//! [`AudioCallbackSink`] is moved into the host's audio callback. Per call it
//! takes the ring lock once per scratch chunk, copies what is buffered and
//! leaves the rest silent. It never decodes, allocates or logs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cpal::{FromSample, SizedSample};

use crate::ring::SharedRingBuffer;
use crate::types::{Sample, CHANNELS};

use super::config::MAX_BUFFER_SIZE;

pub struct AudioCallbackSink {
    ring: SharedRingBuffer,
    /// Interleaved stereo staging area, sized once at construction
    scratch: Box<[Sample]>,
    underruns: Arc<AtomicU64>,
}

impl AudioCallbackSink {
    pub fn new(ring: SharedRingBuffer) -> Self {
        Self::with_scratch_frames(ring, MAX_BUFFER_SIZE)
    }

    pub fn with_scratch_frames(ring: SharedRingBuffer, frames: usize) -> Self {
        Self {
            ring,
            scratch: vec![0; frames.max(1) * CHANNELS].into_boxed_slice(),
            underruns: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Counter of callbacks that found fewer samples than requested
    ///
    /// Read it from the foreground loop; the callback itself stays silent.
    pub fn underrun_counter(&self) -> Arc<AtomicU64> {
        self.underruns.clone()
    }

    /// Copy buffered samples into `out`, zero-filling whatever is missing
    ///
    /// Returns how many samples came from the ring.
    pub fn fill(&mut self, out: &mut [Sample]) -> usize {
        let got = self.ring.read(out);
        if got < out.len() {
            out[got..].fill(0);
            self.underruns.fetch_add(1, Ordering::Relaxed);
        }
        got
    }

    /// Fill a device buffer of `channels`-channel frames in format `T`
    ///
    /// Stereo maps straight through, mono is the average of left and right,
    /// and channels beyond the second are silent.
    pub fn fill_device<T>(&mut self, data: &mut [T], channels: usize)
    where
        T: SizedSample + FromSample<Sample>,
    {
        if channels == 0 {
            return;
        }
        let chunk_frames = self.scratch.len() / CHANNELS;
        let mut underrun = false;

        for chunk in data.chunks_mut(chunk_frames * channels) {
            let frames = chunk.len() / channels;
            let staged = &mut self.scratch[..frames * CHANNELS];
            let got = self.ring.read(staged);
            if got < staged.len() {
                staged[got..].fill(0);
                underrun = true;
            }

            for (frame, pair) in chunk.chunks_mut(channels).zip(staged.chunks_exact(CHANNELS)) {
                if channels == 1 {
                    let mono = ((pair[0] as i32 + pair[1] as i32) / 2) as Sample;
                    frame[0] = T::from_sample_(mono);
                    continue;
                }
                frame[0] = T::from_sample_(pair[0]);
                frame[1] = T::from_sample_(pair[1]);
                for extra in frame.iter_mut().skip(2) {
                    *extra = T::EQUILIBRIUM;
                }
            }
            // A trailing partial frame (malformed host buffer) stays silent
            for sample in chunk[frames * channels..].iter_mut() {
                *sample = T::EQUILIBRIUM;
            }
        }

        if underrun {
            self.underruns.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_with(samples: &[Sample], capacity: usize) -> SharedRingBuffer {
        let ring = SharedRingBuffer::new(capacity);
        assert_eq!(ring.write(samples), samples.len());
        ring
    }

    #[test]
    fn test_empty_ring_yields_silence() {
        let ring = SharedRingBuffer::new(1024);
        let mut sink = AudioCallbackSink::new(ring.clone());
        let mut out = vec![7; 256];
        assert_eq!(sink.fill(&mut out), 0);
        assert!(out.iter().all(|&s| s == 0));
        assert_eq!(ring.read_cursor(), 0);
        assert_eq!(sink.underrun_counter().load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_partial_fill_zeroes_tail() {
        let ring = ring_with(&[1, 2, 3, 4], 16);
        let mut sink = AudioCallbackSink::new(ring.clone());
        let mut out = vec![9; 8];
        assert_eq!(sink.fill(&mut out), 4);
        assert_eq!(out, vec![1, 2, 3, 4, 0, 0, 0, 0]);
        assert_eq!(ring.available_to_read(), 0);
    }

    #[test]
    fn test_full_fill_advances_read_cursor_only() {
        let ring = ring_with(&[5; 10], 16);
        let mut sink = AudioCallbackSink::new(ring.clone());
        let mut out = vec![0; 6];
        assert_eq!(sink.fill(&mut out), 6);
        assert_eq!(ring.read_cursor(), 6);
        assert_eq!(ring.write_cursor(), 10);
        assert_eq!(sink.underrun_counter().load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_device_stereo_i16() {
        let ring = ring_with(&[1, -1, 2, -2], 16);
        let mut sink = AudioCallbackSink::new(ring);
        let mut data = vec![0i16; 6];
        sink.fill_device(&mut data, 2);
        assert_eq!(data, vec![1, -1, 2, -2, 0, 0]);
    }

    #[test]
    fn test_device_mono_downmix() {
        let ring = ring_with(&[100, 300, -50, -150], 16);
        let mut sink = AudioCallbackSink::new(ring);
        let mut data = vec![0i16; 2];
        sink.fill_device(&mut data, 1);
        assert_eq!(data, vec![200, -100]);
    }

    #[test]
    fn test_device_extra_channels_silent() {
        let ring = ring_with(&[i16::MAX, i16::MIN], 16);
        let mut sink = AudioCallbackSink::new(ring);
        let mut data = vec![0.5f32; 4];
        sink.fill_device(&mut data, 4);
        assert!(data[0] > 0.99);
        assert_eq!(data[1], -1.0);
        assert_eq!(&data[2..], &[0.0, 0.0]);
    }

    #[test]
    fn test_device_u16_silence_is_midpoint() {
        let ring = SharedRingBuffer::new(16);
        let mut sink = AudioCallbackSink::new(ring);
        let mut data = vec![0u16; 4];
        sink.fill_device(&mut data, 2);
        assert!(data.iter().all(|&s| s == 32768));
    }

    #[test]
    fn test_device_chunks_larger_than_scratch() {
        let samples: Vec<Sample> = (0..40).collect();
        let ring = ring_with(&samples, 64);
        let mut sink = AudioCallbackSink::with_scratch_frames(ring, 3);
        let mut data = vec![0i16; 40];
        sink.fill_device(&mut data, 2);
        assert_eq!(data, samples);
    }
}
