//! Lock-free ring buffer for real-time audio transport
//!
//! Carries interleaved stereo samples from the capture callback (producer)
//! to the render callback (consumer) without locking either audio thread.
//!
//! Performance characteristics:
//! - Lock-free (no mutex contention)
//! - Wait-free for single producer/consumer
//! - Cache-friendly sequential access
//! - No allocations in hot path

use crossbeam::utils::CachePadded;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Lock-free single-producer single-consumer ring buffer
///
/// Shared behind an `Arc`; `write` may only be called from one thread and
/// `read` from one thread at a time. Uses cache-padded counters to prevent
/// false sharing between cores.
pub struct SpscRing {
    /// Buffer storage. UnsafeCell so the producer can write through a
    /// shared reference; the position protocol below keeps the producer
    /// and consumer on disjoint regions.
    buffer: UnsafeCell<Box<[f32]>>,

    /// Write position (cache-padded to prevent false sharing)
    write_pos: CachePadded<AtomicUsize>,

    /// Read position (cache-padded to prevent false sharing)
    read_pos: CachePadded<AtomicUsize>,

    /// Buffer capacity (must be power of 2 for fast modulo)
    capacity: usize,

    /// Mask for fast modulo operation (capacity - 1)
    mask: usize,
}

// SAFETY: the SPSC protocol guarantees the producer only touches slots in
// [write_pos, write_pos + available_write) and the consumer only touches
// [read_pos, read_pos + available_read); the acquire/release pairs on the
// positions order those accesses.
unsafe impl Send for SpscRing {}
unsafe impl Sync for SpscRing {}

impl SpscRing {
    /// Create a new ring buffer
    ///
    /// Capacity will be rounded up to the next power of 2 for efficiency.
    pub fn with_capacity(mut capacity: usize) -> Self {
        if !capacity.is_power_of_two() {
            capacity = capacity.next_power_of_two();
        }

        Self {
            buffer: UnsafeCell::new(vec![0.0; capacity].into_boxed_slice()),
            write_pos: CachePadded::new(AtomicUsize::new(0)),
            read_pos: CachePadded::new(AtomicUsize::new(0)),
            capacity,
            mask: capacity - 1,
        }
    }

    /// Write samples to the buffer (producer side)
    ///
    /// Returns the number of samples actually written.
    pub fn write(&self, samples: &[f32]) -> usize {
        let write_pos = self.write_pos.load(Ordering::Acquire);
        let read_pos = self.read_pos.load(Ordering::Acquire);

        let available = self.available_write_internal(write_pos, read_pos);
        let to_write = samples.len().min(available);

        for (i, &sample) in samples.iter().take(to_write).enumerate() {
            let pos = (write_pos + i) & self.mask;
            unsafe {
                // SAFETY: slots in the writable region belong to the
                // producer until write_pos is published below
                (*self.buffer.get())[pos] = sample;
            }
        }

        // Release semantics make the writes visible to the consumer
        self.write_pos.store(write_pos + to_write, Ordering::Release);

        to_write
    }

    /// Read samples from the buffer (consumer side)
    ///
    /// Returns the number of samples actually read.
    pub fn read(&self, buffer: &mut [f32]) -> usize {
        let read_pos = self.read_pos.load(Ordering::Acquire);
        let write_pos = self.write_pos.load(Ordering::Acquire);

        let available = self.available_read_internal(read_pos, write_pos);
        let to_read = buffer.len().min(available);

        for (i, slot) in buffer.iter_mut().take(to_read).enumerate() {
            let pos = (read_pos + i) & self.mask;
            unsafe {
                // SAFETY: slots in the readable region belong to the
                // consumer until read_pos is published below
                *slot = (*self.buffer.get())[pos];
            }
        }

        self.read_pos.store(read_pos + to_read, Ordering::Release);

        to_read
    }

    /// Get available write space (internal version with known positions)
    #[inline]
    fn available_write_internal(&self, write_pos: usize, read_pos: usize) -> usize {
        // One slot is kept empty to distinguish full from empty
        self.capacity - (write_pos - read_pos) - 1
    }

    /// Get available read samples (internal version with known positions)
    #[inline]
    fn available_read_internal(&self, read_pos: usize, write_pos: usize) -> usize {
        write_pos - read_pos
    }

    /// Get available write space
    pub fn available_write(&self) -> usize {
        let write_pos = self.write_pos.load(Ordering::Acquire);
        let read_pos = self.read_pos.load(Ordering::Acquire);
        self.available_write_internal(write_pos, read_pos)
    }

    /// Get available read samples
    pub fn available_read(&self) -> usize {
        let read_pos = self.read_pos.load(Ordering::Acquire);
        let write_pos = self.write_pos.load(Ordering::Acquire);
        self.available_read_internal(read_pos, write_pos)
    }

    /// Clear the buffer (reset positions)
    pub fn clear(&self) {
        let write_pos = self.write_pos.load(Ordering::Acquire);
        self.read_pos.store(write_pos, Ordering::Release);
    }

    /// Get buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.available_read() == 0
    }

    /// Get current fill level
    pub fn len(&self) -> usize {
        self.available_read()
    }
}
