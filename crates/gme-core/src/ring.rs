//! Sample ring buffer shared between the decode loop and the audio callback
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   write() under lock   ┌─────────────────────┐
//! │  Foreground loop │───────────────────────►│   SharedRingBuffer  │
//! │  (decodes first, │                        │  cursors + storage  │
//! │   then commits)  │                        └──────────┬──────────┘
//! └──────────────────┘                                   │ read() under lock
//!                                                        ▼
//!                                             ┌─────────────────────┐
//!                                             │   Audio callback    │
//!                                             │ (zero-fills the tail│
//!                                             │   on underrun)      │
//!                                             └─────────────────────┘
//! ```
//!
//! Both cursors grow without bound and are reduced modulo the capacity only to
//! index storage. `read_cursor <= write_cursor <= read_cursor + capacity` holds
//! after every operation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::types::Sample;

/// Fixed-capacity circular sample store
///
/// Not synchronized by itself; shared access goes through [`SharedRingBuffer`].
#[derive(Debug)]
pub struct RingBuffer {
    storage: Box<[Sample]>,
    write_cursor: u64,
    read_cursor: u64,
}

impl RingBuffer {
    /// Allocate a ring holding `capacity` samples
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");
        Self {
            storage: vec![0; capacity].into_boxed_slice(),
            write_cursor: 0,
            read_cursor: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Samples committed but not yet consumed
    #[inline]
    pub fn available_to_read(&self) -> usize {
        (self.write_cursor - self.read_cursor) as usize
    }

    /// Free slots the producer may fill without overrunning the reader
    #[inline]
    pub fn available_to_write(&self) -> usize {
        self.capacity() - self.available_to_read()
    }

    #[inline]
    pub fn write_cursor(&self) -> u64 {
        self.write_cursor
    }

    #[inline]
    pub fn read_cursor(&self) -> u64 {
        self.read_cursor
    }

    #[inline]
    fn index(&self, cursor: u64) -> usize {
        (cursor % self.capacity() as u64) as usize
    }

    /// Copy `samples` in at the write cursor, then advance it
    ///
    /// Anything beyond `available_to_write()` is dropped; the return value is
    /// the number of samples committed.
    pub fn write(&mut self, samples: &[Sample]) -> usize {
        let count = samples.len().min(self.available_to_write());
        if count == 0 {
            return 0;
        }

        let start = self.index(self.write_cursor);
        let first = count.min(self.capacity() - start);
        self.storage[start..start + first].copy_from_slice(&samples[..first]);
        if first < count {
            // Run crosses the end of storage
            self.storage[..count - first].copy_from_slice(&samples[first..count]);
        }

        self.write_cursor += count as u64;
        count
    }

    /// Copy up to `dest.len()` committed samples out, then advance the read cursor
    ///
    /// Returns immediately with 0 when nothing is committed. The caller owns
    /// whatever part of `dest` was not filled.
    pub fn read(&mut self, dest: &mut [Sample]) -> usize {
        let count = dest.len().min(self.available_to_read());
        if count == 0 {
            return 0;
        }

        let start = self.index(self.read_cursor);
        let first = count.min(self.capacity() - start);
        dest[..first].copy_from_slice(&self.storage[start..start + first]);
        if first < count {
            dest[first..count].copy_from_slice(&self.storage[..count - first]);
        }

        self.read_cursor += count as u64;
        count
    }

    /// Copy the most recently committed samples into `dest` without consuming
    ///
    /// The window ends at the write cursor and is at most one capacity long.
    /// Returns the number of samples copied (the tail of `dest` is untouched).
    pub fn copy_recent(&self, dest: &mut [Sample]) -> usize {
        let valid = (self.write_cursor.min(self.capacity() as u64)) as usize;
        let count = dest.len().min(valid);
        if count == 0 {
            return 0;
        }

        let begin = self.write_cursor - count as u64;
        let start = self.index(begin);
        let first = count.min(self.capacity() - start);
        dest[..first].copy_from_slice(&self.storage[start..start + first]);
        if first < count {
            dest[first..count].copy_from_slice(&self.storage[..count - first]);
        }
        count
    }
}

/// The ring buffer behind one mutex, shared by producer and consumer
///
/// Every cursor change and every fill-level query takes the lock, so a level
/// read here is never stale relative to a concurrent commit. Decoding never
/// happens while the lock is held: producers render into their own scratch
/// buffer and call [`write`](Self::write) only to commit.
#[derive(Debug, Clone)]
pub struct SharedRingBuffer {
    inner: Arc<Mutex<RingBuffer>>,
    capacity: usize,
}

impl SharedRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RingBuffer::new(capacity))),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RingBuffer> {
        // A panic mid-copy cannot leave the cursors half-updated, so the data
        // behind a poisoned lock is still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn write(&self, samples: &[Sample]) -> usize {
        self.lock().write(samples)
    }

    pub fn read(&self, dest: &mut [Sample]) -> usize {
        self.lock().read(dest)
    }

    pub fn available_to_read(&self) -> usize {
        self.lock().available_to_read()
    }

    pub fn available_to_write(&self) -> usize {
        self.lock().available_to_write()
    }

    /// Non-consuming copy of the newest samples, for display
    pub fn snapshot_recent(&self, dest: &mut [Sample]) -> usize {
        self.lock().copy_recent(dest)
    }

    /// Total samples ever committed
    pub fn write_cursor(&self) -> u64 {
        self.lock().write_cursor()
    }

    /// Total samples ever consumed
    pub fn read_cursor(&self) -> u64 {
        self.lock().read_cursor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn ramp(start: i16, len: usize) -> Vec<i16> {
        (0..len).map(|i| start.wrapping_add(i as i16)).collect()
    }

    #[test]
    fn test_levels_sum_to_capacity() {
        let mut ring = RingBuffer::new(64);
        let mut out = vec![0; 64];
        for step in 0..50 {
            let w = (step * 7) % 23;
            ring.write(&ramp(0, w));
            assert_eq!(ring.available_to_read() + ring.available_to_write(), 64);
            let r = (step * 5) % 19;
            ring.read(&mut out[..r]);
            assert_eq!(ring.available_to_read() + ring.available_to_write(), 64);
            assert!(ring.read_cursor() <= ring.write_cursor());
            assert!(ring.write_cursor() <= ring.read_cursor() + 64);
        }
    }

    #[test]
    fn test_full_then_partial_drain_scenario() {
        let mut ring = RingBuffer::new(1000);
        assert_eq!(ring.write(&ramp(0, 1000)), 1000);
        assert_eq!(ring.available_to_write(), 0);

        let mut out = vec![0; 400];
        assert_eq!(ring.read(&mut out), 400);
        assert_eq!(ring.available_to_read(), 600);
        assert_eq!(ring.available_to_write(), 400);

        // 500 only fits once another 100 are consumed
        let mut more = vec![0; 100];
        ring.read(&mut more);
        let before = ring.write_cursor();
        assert_eq!(ring.write(&ramp(1000, 500)), 500);
        assert_eq!(ring.write_cursor() - before, 500);
    }

    #[test]
    fn test_write_is_truncated_at_capacity() {
        let mut ring = RingBuffer::new(1000);
        ring.write(&ramp(0, 1000));
        let mut out = vec![0; 400];
        ring.read(&mut out);
        let before = ring.write_cursor();
        assert_eq!(ring.write(&ramp(0, 500)), 400);
        assert_eq!(ring.write_cursor() - before, 400);
        assert_eq!(ring.available_to_write(), 0);
    }

    #[test]
    fn test_read_from_empty_returns_zero() {
        let mut ring = RingBuffer::new(512);
        let mut out = vec![7i16; 256];
        assert_eq!(ring.read(&mut out), 0);
        // Untouched: filling silence is the caller's job
        assert!(out.iter().all(|&s| s == 7));
    }

    #[test]
    fn test_wraparound_preserves_order() {
        let mut ring = RingBuffer::new(10);
        ring.write(&ramp(0, 8));
        let mut out = vec![0; 6];
        ring.read(&mut out);
        assert_eq!(out, vec![0, 1, 2, 3, 4, 5]);

        // Cursor at 8: this run wraps from index 8 to index 3
        assert_eq!(ring.write(&ramp(100, 6)), 6);
        let mut out = vec![0; 8];
        assert_eq!(ring.read(&mut out), 8);
        assert_eq!(out, vec![6, 7, 100, 101, 102, 103, 104, 105]);
    }

    #[test]
    fn test_never_returns_overwritten_data() {
        let mut ring = RingBuffer::new(4);
        let mut out = vec![0; 4];
        for round in 0..10i16 {
            let block = ramp(round * 10, 3);
            ring.write(&block);
            let n = ring.read(&mut out);
            assert_eq!(&out[..n], &block[..]);
        }
    }

    #[test]
    fn test_copy_recent_does_not_consume() {
        let mut ring = RingBuffer::new(8);
        ring.write(&ramp(0, 6));
        let mut out = vec![0; 4];
        ring.read(&mut out);
        ring.write(&ramp(6, 5));

        let mut recent = vec![0; 5];
        assert_eq!(ring.copy_recent(&mut recent), 5);
        assert_eq!(recent, vec![6, 7, 8, 9, 10]);
        assert_eq!(ring.available_to_read(), 7);
    }

    #[test]
    fn test_copy_recent_before_first_wrap() {
        let mut ring = RingBuffer::new(16);
        ring.write(&ramp(0, 3));
        let mut recent = vec![-1; 8];
        assert_eq!(ring.copy_recent(&mut recent), 3);
        assert_eq!(&recent[..3], &[0, 1, 2]);
        assert_eq!(recent[3], -1);
    }

    #[test]
    fn test_shared_ring_concurrent_transfer_is_lossless() {
        const TOTAL: usize = 50_000;
        let ring = SharedRingBuffer::new(256);
        let consumer_ring = ring.clone();

        let consumer = thread::spawn(move || {
            let mut received = Vec::with_capacity(TOTAL);
            let mut chunk = vec![0i16; 37];
            while received.len() < TOTAL {
                let n = consumer_ring.read(&mut chunk);
                received.extend_from_slice(&chunk[..n]);
                if n == 0 {
                    thread::yield_now();
                }
            }
            received
        });

        let source: Vec<i16> = (0..TOTAL).map(|i| (i % 30_000) as i16).collect();
        let mut sent = 0;
        while sent < TOTAL {
            let free = ring.available_to_write();
            let end = (sent + free.min(53)).min(TOTAL);
            sent += ring.write(&source[sent..end]);
            if free == 0 {
                thread::yield_now();
            }
        }

        let received = consumer.join().unwrap();
        assert_eq!(received, source);
        assert_eq!(ring.write_cursor(), TOTAL as u64);
        assert_eq!(ring.read_cursor(), TOTAL as u64);
    }
}
