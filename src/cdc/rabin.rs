//! Rabin-Karp rolling polynomial fingerprint.
//!
//! The fingerprint of a window `w[0..k]` with multiplier `a` is
//!
//! ```text
//! H(w) = a^(k-1)*w[0] + a^(k-2)*w[1] + ... + a*w[k-2] + w[k-1]   (mod 2^32)
//! ```
//!
//! Sliding the window by one byte removes the leading term, multiplies the
//! rest by `a` and adds the entering byte:
//!
//! ```text
//! H(w[1..k] ++ [x]) = (H(w) - a^(k-1)*w[0]) * a + x   (mod 2^32)
//! ```
//!
//! All arithmetic wraps, so [`RollingHasher::advance`] agrees bit-for-bit with
//! [`RollingHasher::hash`] of the shifted window for every byte value.

use crate::config::{DEFAULT_MULTIPLIER, DEFAULT_WINDOW_SIZE};
use crate::error::ChunkError;

/// Polynomial fingerprint over a fixed-width window.
///
/// `hash` is O(k) and `advance` is O(1); the powers `a^0..a^(k-1)` are
/// computed once at construction.
///
/// # Example
///
/// ```
/// use chunkar::RollingHasher;
///
/// let hasher = RollingHasher::new(4, 1_103_515_245)?;
/// let data = b"abcde";
///
/// let first = hasher.hash(&data[0..4])?;
/// let rolled = hasher.advance(first, data[0], data[4]);
/// assert_eq!(rolled, hasher.hash(&data[1..5])?);
/// # Ok::<(), chunkar::ChunkError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollingHasher {
    multiplier: u32,
    /// `powers[i] = a^i`, for `i` in `0..k`.
    powers: Vec<u32>,
    /// `a^(k-1)`, the weight of the byte leaving the window.
    top: u32,
}

impl RollingHasher {
    /// Creates a hasher for windows of `window_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::InvalidConfig`] if `window_size` is zero.
    pub fn new(window_size: usize, multiplier: u32) -> Result<Self, ChunkError> {
        if window_size == 0 {
            return Err(ChunkError::InvalidConfig {
                message: "window size must be non-zero",
            });
        }
        Ok(Self::with_window(window_size, multiplier))
    }

    /// Builds the power table; `window_size` must be non-zero.
    pub(crate) fn with_window(window_size: usize, multiplier: u32) -> Self {
        let mut powers = Vec::with_capacity(window_size);
        let mut acc = 1u32;
        powers.push(acc);
        for _ in 1..window_size {
            acc = acc.wrapping_mul(multiplier);
            powers.push(acc);
        }

        Self {
            multiplier,
            powers,
            top: acc,
        }
    }

    /// Returns the window width `k`.
    pub fn window_size(&self) -> usize {
        self.powers.len()
    }

    /// Returns the multiplier `a`.
    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    /// Computes the fingerprint of the first `k` bytes of `window`.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::WindowTooShort`] if fewer than `k` bytes are
    /// supplied.
    pub fn hash(&self, window: &[u8]) -> Result<u32, ChunkError> {
        let k = self.window_size();
        if window.len() < k {
            return Err(ChunkError::WindowTooShort {
                expected: k,
                actual: window.len(),
            });
        }

        Ok(window[..k]
            .iter()
            .zip(self.powers.iter().rev())
            .fold(0u32, |acc, (&byte, &power)| {
                acc.wrapping_add(power.wrapping_mul(byte as u32))
            }))
    }

    /// Slides the window by one byte.
    ///
    /// `leaving` is the oldest byte of the window `fingerprint` was computed
    /// over and `entering` the byte that follows the window.
    #[inline]
    pub fn advance(&self, fingerprint: u32, leaving: u8, entering: u8) -> u32 {
        fingerprint
            .wrapping_sub(self.top.wrapping_mul(leaving as u32))
            .wrapping_mul(self.multiplier)
            .wrapping_add(entering as u32)
    }
}

impl Default for RollingHasher {
    fn default() -> Self {
        Self::with_window(DEFAULT_WINDOW_SIZE, DEFAULT_MULTIPLIER)
    }
}
