//! Content-Defined Chunking (CDC) implementation.
//!
//! This module contains the core algorithm for identifying chunk boundaries
//! based on content patterns rather than fixed sizes.
//!
//! - [`RollingHasher`] - Rabin-Karp polynomial fingerprint with O(1) shift
//! - `RabinCdc` - byte-at-a-time boundary detector built on it (internal)

mod detector;
mod rabin;

pub(crate) use detector::RabinCdc;
pub use rabin::RollingHasher;
