//! Content digests.
//!
//! - [`Digest`] - 32-byte BLAKE3 digest, the address of every blob
//! - [`DigestHasher`] - incremental hasher for whole archives

mod digest;
mod stream;

pub use digest::Digest;
pub use stream::DigestHasher;
