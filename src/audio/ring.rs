//! Fixed-capacity accumulator for variable-rate audio bursts.
//!
//! The sensor delivers audio as bursts of fixed-size sub-frames at a rate
//! unrelated to the visual capture cadence. The accumulator buffers them
//! until a consumer drains it. Overflow policy is reset-not-evict: a burst
//! that would not fit clears the whole accumulator first, so a burst is
//! never split across a wrap and the cost of sustained overflow is one
//! wholesale drop, not per-slot bookkeeping. This is a deliberate
//! simplicity/latency tradeoff carried over from the deployed engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::types::{
    AudioSubFrame, AUDIO_BUFFER_LEN, AUDIO_META_LEN, AUDIO_RING_LEN, SUBFRAME_SIZE,
};

/// The raw ring storage: samples, per-subframe metadata, used-count.
pub struct AudioRing {
    samples: Box<[f32]>,
    /// Interleaved (beam_angle, beam_confidence) per sub-frame slot.
    meta: Box<[f32]>,
    used: usize,
}

impl Default for AudioRing {
    fn default() -> Self {
        AudioRing {
            samples: vec![0f32; AUDIO_BUFFER_LEN].into_boxed_slice(),
            meta: vec![0f32; AUDIO_META_LEN].into_boxed_slice(),
            used: 0,
        }
    }
}

impl AudioRing {
    pub fn used(&self) -> usize {
        self.used
    }

    pub fn capacity(&self) -> usize {
        AUDIO_RING_LEN
    }

    /// Append a burst of sub-frames.
    ///
    /// If the burst would overflow, the accumulator resets to empty before
    /// appending; whatever was unread is discarded wholesale and the new
    /// burst starts at offset 0.
    pub fn push_burst(&mut self, burst: &[AudioSubFrame]) {
        // A burst larger than the whole ring cannot fit either way; keep
        // the leading slots so the accumulator still sees fresh data.
        let count = burst.len().min(AUDIO_RING_LEN);
        if count + self.used >= AUDIO_RING_LEN {
            self.used = 0;
        }
        for (i, sub) in burst.iter().take(count).enumerate() {
            let slot = self.used + i;
            self.meta[slot * 2] = sub.beam_angle;
            self.meta[slot * 2 + 1] = sub.beam_confidence;
            let start = slot * SUBFRAME_SIZE;
            self.samples[start..start + SUBFRAME_SIZE].copy_from_slice(&sub.samples);
        }
        self.used += count;
    }

    /// Copy out the full sample and metadata buffers, return how many
    /// sub-frame slots were in use, and reset to empty.
    ///
    /// Destinations must be the full fixed sizes ([`AUDIO_BUFFER_LEN`],
    /// [`AUDIO_META_LEN`]); a mismatch drains nothing and returns 0.
    pub fn drain_into(&mut self, samples_dest: &mut [f32], meta_dest: &mut [f32]) -> usize {
        if samples_dest.len() != self.samples.len() || meta_dest.len() != self.meta.len() {
            return 0;
        }
        samples_dest.copy_from_slice(&self.samples);
        meta_dest.copy_from_slice(&self.meta);
        let len = self.used;
        self.used = 0;
        len
    }
}

/// Thread-safe accumulator shared between the audio worker and consumers.
///
/// Keeps an atomic mirror of the used-count so the empty check on the
/// consumer path never takes the lock.
pub struct AudioAccumulator {
    ring: Mutex<AudioRing>,
    used: AtomicUsize,
}

impl Default for AudioAccumulator {
    fn default() -> Self {
        AudioAccumulator {
            ring: Mutex::new(AudioRing::default()),
            used: AtomicUsize::new(0),
        }
    }
}

impl AudioAccumulator {
    /// Writer side: append one burst under the lock.
    pub fn push_burst(&self, burst: &[AudioSubFrame]) {
        let mut ring = self.ring.lock().expect("lock poisoned");
        ring.push_burst(burst);
        self.used.store(ring.used(), Ordering::Release);
    }

    /// Destructive read. Returns 0 immediately, without locking, when
    /// nothing is buffered; otherwise copies out both buffers, returns the
    /// used sub-frame count, and resets the accumulator.
    pub fn drain(&self, samples_dest: &mut [f32], meta_dest: &mut [f32]) -> usize {
        if self.used.load(Ordering::Acquire) == 0 {
            return 0;
        }
        let mut ring = self.ring.lock().expect("lock poisoned");
        let len = ring.drain_into(samples_dest, meta_dest);
        self.used.store(ring.used(), Ordering::Release);
        len
    }

    /// Sub-frames currently buffered (approximate from a reader's view).
    pub fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }
}
