//! Configuration for chunking behavior.
//!
//! This module provides types to configure how chunking is performed:
//!
//! - [`ChunkConfig`] - Rolling-hash window, boundary mask and chunk size bounds
//! - [`HashConfig`] - Specifies whether to compute per-chunk digests
//!
//! # Example
//!
//! ```
//! use chunkar::{ChunkConfig, HashConfig};
//!
//! // Pure rolling-hash chunking: 48-byte window, 12-bit mask (~4 KiB chunks)
//! let config = ChunkConfig::new(48, 12)?;
//!
//! // Builder pattern on top of the defaults
//! let config = ChunkConfig::default()
//!     .with_mask_bits(14)
//!     .with_min_size(4096)
//!     .with_max_size(Some(65536))
//!     .with_hash_config(HashConfig::enabled());
//! config.validate()?;
//!
//! # Ok::<(), chunkar::ChunkError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ChunkError;

/// Default rolling-hash window width in bytes.
pub const DEFAULT_WINDOW_SIZE: usize = 48;

/// Default number of low fingerprint bits tested for a boundary (~64 KiB chunks).
pub const DEFAULT_MASK_BITS: u32 = 16;

/// Default polynomial multiplier.
pub const DEFAULT_MULTIPLIER: u32 = 1_103_515_245;

/// Default minimum chunk size (16 KiB).
pub const DEFAULT_MIN_CHUNK_SIZE: usize = 16 * 1024;

/// Default maximum chunk size (256 KiB).
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 256 * 1024;

/// Configuration for content-defined chunking behavior.
///
/// A boundary is declared after a byte when the Rabin fingerprint of the last
/// `window_size` bytes has its low `mask_bits` bits all zero. The expected
/// chunk size is therefore about `2^mask_bits` bytes.
///
/// Two optional bounds shape the distribution:
///
/// - `min_size` - no boundary is declared while the current chunk is shorter
///   (`0` disables the bound)
/// - `max_size` - a boundary is forced once the current chunk reaches it
///   (`None` disables the bound)
///
/// The final chunk of a stream always ends at end-of-stream and may be
/// shorter than `min_size`.
///
/// `ChunkConfig` is persisted with a store so that every member of the store
/// is chunked identically; the hash setting is not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Rolling-hash window width in bytes.
    window_size: usize,

    /// Number of low fingerprint bits that must be zero at a boundary.
    mask_bits: u32,

    /// Polynomial multiplier of the rolling hash.
    multiplier: u32,

    /// Minimum chunk size in bytes.
    min_size: usize,

    /// Maximum chunk size in bytes.
    max_size: Option<usize>,

    /// Configuration for hashing behavior.
    #[serde(skip)]
    hash_config: HashConfig,
}

impl ChunkConfig {
    /// Creates a pure rolling-hash configuration without size bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::InvalidConfig`] if `window_size` is zero or
    /// `mask_bits` is outside `1..=32`.
    ///
    /// # Example
    ///
    /// ```
    /// use chunkar::ChunkConfig;
    ///
    /// let config = ChunkConfig::new(48, 16)?;
    /// assert_eq!(config.window_size(), 48);
    /// assert_eq!(config.mask(), 0xFFFF);
    /// assert_eq!(config.min_size(), 0);
    /// assert_eq!(config.max_size(), None);
    /// # Ok::<(), chunkar::ChunkError>(())
    /// ```
    pub fn new(window_size: usize, mask_bits: u32) -> Result<Self, ChunkError> {
        let config = Self {
            window_size,
            mask_bits,
            multiplier: DEFAULT_MULTIPLIER,
            min_size: 0,
            max_size: None,
            hash_config: HashConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the rolling-hash window width.
    ///
    /// Note: This does not validate the configuration. Use [`ChunkConfig::validate`]
    /// to check if the configuration is valid.
    pub fn with_window_size(mut self, size: usize) -> Self {
        self.window_size = size;
        self
    }

    /// Sets the number of masked fingerprint bits.
    ///
    /// Note: This does not validate the configuration.
    pub fn with_mask_bits(mut self, bits: u32) -> Self {
        self.mask_bits = bits;
        self
    }

    /// Sets the polynomial multiplier.
    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the minimum chunk size (`0` disables it).
    ///
    /// Note: This does not validate the configuration.
    pub fn with_min_size(mut self, size: usize) -> Self {
        self.min_size = size;
        self
    }

    /// Sets the maximum chunk size (`None` disables it).
    ///
    /// Note: This does not validate the configuration.
    pub fn with_max_size(mut self, size: Option<usize>) -> Self {
        self.max_size = size;
        self
    }

    /// Sets the hash configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use chunkar::{ChunkConfig, HashConfig};
    ///
    /// let config = ChunkConfig::default()
    ///     .with_hash_config(HashConfig::disabled());
    /// assert!(!config.hash_config().enabled);
    /// ```
    pub fn with_hash_config(mut self, config: HashConfig) -> Self {
        self.hash_config = config;
        self
    }

    /// Returns the rolling-hash window width.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Returns the number of masked fingerprint bits.
    pub fn mask_bits(&self) -> u32 {
        self.mask_bits
    }

    /// Returns the boundary mask selecting the low `mask_bits` bits.
    pub fn mask(&self) -> u32 {
        if self.mask_bits >= 32 {
            u32::MAX
        } else {
            (1u32 << self.mask_bits) - 1
        }
    }

    /// Returns the polynomial multiplier.
    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    /// Returns the minimum chunk size.
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// Returns the maximum chunk size, if bounded.
    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    /// Returns the hash configuration.
    pub fn hash_config(&self) -> &HashConfig {
        &self.hash_config
    }

    /// Validates the current configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use chunkar::ChunkConfig;
    ///
    /// let config = ChunkConfig::default().with_window_size(0);
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ChunkError> {
        if self.window_size == 0 {
            return Err(ChunkError::InvalidConfig {
                message: "window size must be non-zero",
            });
        }

        if self.mask_bits == 0 || self.mask_bits > 32 {
            return Err(ChunkError::InvalidConfig {
                message: "mask bits must be between 1 and 32",
            });
        }

        if let Some(max_size) = self.max_size {
            if max_size == 0 {
                return Err(ChunkError::InvalidConfig {
                    message: "max_size must be non-zero",
                });
            }
            if self.min_size > max_size {
                return Err(ChunkError::InvalidConfig {
                    message: "min_size cannot be greater than max_size",
                });
            }
        }

        Ok(())
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            mask_bits: DEFAULT_MASK_BITS,
            multiplier: DEFAULT_MULTIPLIER,
            min_size: DEFAULT_MIN_CHUNK_SIZE,
            max_size: Some(DEFAULT_MAX_CHUNK_SIZE),
            hash_config: HashConfig::default(),
        }
    }
}

/// Configuration for chunk hashing behavior.
///
/// `HashConfig` controls whether BLAKE3 digests are computed for each chunk.
/// Hashing is enabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashConfig {
    /// Whether to compute BLAKE3 digests for chunks.
    pub enabled: bool,
}

impl HashConfig {
    /// Creates a new hash configuration.
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Enables hashing.
    pub const fn enabled() -> Self {
        Self { enabled: true }
    }

    /// Disables hashing.
    pub const fn disabled() -> Self {
        Self { enabled: false }
    }
}

impl Default for HashConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
