//! Byte-at-a-time boundary detection over a Rabin fingerprint.
//!
//! The detector keeps the last `k` bytes of the stream in a ring buffer and a
//! running fingerprint over them. The window is continuous across chunk
//! boundaries, so whether a position is a boundary depends only on the bytes
//! around it (plus the min/max bounds measured from the previous boundary).

use crate::cdc::RollingHasher;
use crate::config::ChunkConfig;

/// Rolling boundary detector state.
#[derive(Debug, Clone)]
pub struct RabinCdc {
    hasher: RollingHasher,
    /// Ring buffer holding the current window.
    window: Vec<u8>,
    /// Index of the oldest byte in `window` once it is full.
    head: usize,
    /// Number of window slots filled so far (saturates at `k`).
    filled: usize,
    fingerprint: u32,
    mask: u32,
    min_size: usize,
    max_size: Option<usize>,
    /// Number of bytes processed since last boundary.
    bytes_since_boundary: usize,
}

impl RabinCdc {
    /// Creates a detector for a validated configuration.
    pub fn new(config: &ChunkConfig) -> Self {
        let window_size = config.window_size().max(1);
        Self {
            hasher: RollingHasher::with_window(window_size, config.multiplier()),
            window: vec![0u8; window_size],
            head: 0,
            filled: 0,
            fingerprint: 0,
            mask: config.mask(),
            min_size: config.min_size(),
            max_size: config.max_size(),
            bytes_since_boundary: 0,
        }
    }

    /// Resets the state for a new stream.
    pub fn reset(&mut self) {
        self.head = 0;
        self.filled = 0;
        self.fingerprint = 0;
        self.bytes_since_boundary = 0;
    }

    /// Processes a single byte and returns true if a chunk ends with it.
    ///
    /// 1. Rolls the fingerprint (or computes it once the first window fills)
    /// 2. Holds back while the chunk is shorter than `min_size`
    /// 3. Forces a boundary when the chunk reaches `max_size`
    /// 4. Otherwise declares a boundary when `fingerprint & mask == 0`
    #[inline]
    pub fn update(&mut self, byte: u8) -> bool {
        self.bytes_since_boundary += 1;

        let k = self.window.len();
        let ready = if self.filled < k {
            self.window[self.filled] = byte;
            self.filled += 1;
            if self.filled == k {
                // The ring starts at index 0, so the window is in order here.
                self.fingerprint = self.window.iter().fold(0u32, |acc, &b| {
                    acc.wrapping_mul(self.hasher.multiplier())
                        .wrapping_add(b as u32)
                });
                true
            } else {
                false
            }
        } else {
            let leaving = self.window[self.head];
            self.window[self.head] = byte;
            self.head = (self.head + 1) % k;
            self.fingerprint = self.hasher.advance(self.fingerprint, leaving, byte);
            true
        };

        if self.bytes_since_boundary < self.min_size {
            return false;
        }

        let forced = self
            .max_size
            .is_some_and(|max| self.bytes_since_boundary >= max);

        if forced || (ready && self.fingerprint & self.mask == 0) {
            self.bytes_since_boundary = 0;
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    pub fn fingerprint(&self) -> u32 {
        self.fingerprint
    }

    #[cfg(test)]
    pub fn bytes_since_boundary(&self) -> usize {
        self.bytes_since_boundary
    }
}
