//! Waveform visualization
//!
//! The sampler copies the most recent window of produced audio out of the ring
//! (without moving the read cursor) and draws it into a small pixel grid, at
//! most once per frame interval. Frames are rebuilt in place; no history is
//! kept.

use std::time::{Duration, Instant};

use crate::ring::SharedRingBuffer;
use crate::types::{Sample, CHANNELS};

/// Fixed-size monochrome pixel grid, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualizationFrame {
    width: usize,
    height: usize,
    pixels: Vec<bool>,
}

impl VisualizationFrame {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![false; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.pixels[y * self.width + x]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.pixels.chunks(self.width.max(1))
    }

    fn clear(&mut self) {
        self.pixels.fill(false);
    }

    fn set(&mut self, x: usize, y: usize) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = true;
        }
    }
}

/// Row for a sample value, 0 at the top for full positive scale
fn row_for(value: i32, height: usize) -> usize {
    let span = (i16::MAX as i32 - i16::MIN as i32) as i64;
    let from_top = (i16::MAX as i32 - value) as i64;
    ((from_top * (height as i64 - 1) + span / 2) / span) as usize
}

pub struct VisualizationSampler {
    interval: Duration,
    last_frame: Option<Instant>,
    /// Interleaved stereo window, allocated once
    window: Vec<Sample>,
    frame: VisualizationFrame,
}

impl VisualizationSampler {
    /// `window_samples` interleaved samples are drawn across `width` columns
    pub fn new(frame_rate: u32, width: usize, height: usize, window_samples: usize) -> Self {
        let window_samples = (window_samples / CHANNELS).max(1) * CHANNELS;
        Self {
            interval: Duration::from_millis(1000 / frame_rate.max(1) as u64),
            last_frame: None,
            window: vec![0; window_samples],
            frame: VisualizationFrame::new(width, height),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a frame is owed at `now`
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_frame {
            None => true,
            Some(last) => now.duration_since(last) >= self.interval,
        }
    }

    /// Render a new frame from `ring` if one is due
    pub fn tick(&mut self, ring: &SharedRingBuffer, now: Instant) -> Option<&VisualizationFrame> {
        if !self.is_due(now) {
            return None;
        }
        self.last_frame = Some(now);
        let copied = ring.snapshot_recent(&mut self.window);
        self.render(copied);
        Some(&self.frame)
    }

    pub fn frame(&self) -> &VisualizationFrame {
        &self.frame
    }

    /// Draw the first `len` samples of the window as per-column min/max bars
    fn render(&mut self, len: usize) {
        self.frame.clear();
        let (width, height) = (self.frame.width(), self.frame.height());
        let frames = len / CHANNELS;
        if frames == 0 || width == 0 || height == 0 {
            return;
        }

        for x in 0..width {
            let start = x * frames / width;
            let end = ((x + 1) * frames / width).max(start + 1).min(frames);
            let mut low = i32::MAX;
            let mut high = i32::MIN;
            for pair in self.window[start * CHANNELS..end * CHANNELS].chunks_exact(CHANNELS) {
                let mono = (pair[0] as i32 + pair[1] as i32) / 2;
                low = low.min(mono);
                high = high.max(mono);
            }
            if low > high {
                continue;
            }
            for y in row_for(high, height)..=row_for(low, height) {
                self.frame.set(x, y);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_cover_full_scale() {
        assert_eq!(row_for(i16::MAX as i32, 16), 0);
        assert_eq!(row_for(i16::MIN as i32, 16), 15);
        assert_eq!(row_for(0, 17), 8);
    }

    #[test]
    fn test_frame_interval() {
        let sampler = VisualizationSampler::new(25, 8, 4, 64);
        assert_eq!(sampler.interval(), Duration::from_millis(40));
    }

    #[test]
    fn test_tick_respects_frame_rate() {
        let ring = SharedRingBuffer::new(64);
        let mut sampler = VisualizationSampler::new(10, 4, 4, 16);
        let start = Instant::now();
        assert!(sampler.tick(&ring, start).is_some());
        assert!(sampler.tick(&ring, start + Duration::from_millis(50)).is_none());
        assert!(sampler.tick(&ring, start + Duration::from_millis(100)).is_some());
    }

    #[test]
    fn test_empty_ring_draws_nothing() {
        let ring = SharedRingBuffer::new(64);
        let mut sampler = VisualizationSampler::new(30, 4, 4, 16);
        let frame = sampler.tick(&ring, Instant::now()).unwrap();
        assert!(frame.rows().all(|row| row.iter().all(|&p| !p)));
    }

    #[test]
    fn test_silence_draws_center_line() {
        let ring = SharedRingBuffer::new(64);
        ring.write(&[0; 32]);
        let mut sampler = VisualizationSampler::new(30, 4, 5, 16);
        let frame = sampler.tick(&ring, Instant::now()).unwrap();
        for x in 0..4 {
            let lit: Vec<usize> = (0..5).filter(|&y| frame.get(x, y)).collect();
            assert_eq!(lit, vec![2]);
        }
    }

    #[test]
    fn test_snapshot_does_not_consume() {
        let ring = SharedRingBuffer::new(64);
        ring.write(&[i16::MAX; 16]);
        let mut sampler = VisualizationSampler::new(30, 2, 3, 16);
        let frame = sampler.tick(&ring, Instant::now()).unwrap();
        assert!(frame.get(0, 0) && frame.get(1, 0));
        assert!(!frame.get(0, 2));
        assert_eq!(ring.available_to_read(), 16);
    }

    #[test]
    fn test_window_uses_most_recent_samples() {
        let ring = SharedRingBuffer::new(64);
        ring.write(&[i16::MIN; 32]);
        ring.write(&[i16::MAX; 8]);
        let mut sampler = VisualizationSampler::new(30, 1, 3, 8);
        let frame = sampler.tick(&ring, Instant::now()).unwrap();
        assert!(frame.get(0, 0));
        assert!(!frame.get(0, 2));
    }
}
