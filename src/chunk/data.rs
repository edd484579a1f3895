//! The Chunk type.

use std::fmt;
use std::ops::Range;

use bytes::Bytes;

use crate::hash::Digest;

/// One content-defined piece of an input stream.
///
/// `data` is usually a zero-copy slice of what was pushed into the chunker.
/// `offset` is the position of the first byte in the stream, and `hash` is
/// filled in when the chunker was configured to hash.
///
/// # Example
///
/// ```
/// use chunkar::{Chunk, Digest};
/// use bytes::Bytes;
///
/// let chunk = Chunk {
///     data: Bytes::from_static(b"HELLO"),
///     offset: Some(10),
///     hash: Some(Digest::of(b"HELLO")),
/// };
///
/// assert_eq!(chunk.range(), 10..15);
/// assert!(chunk.verify());
/// ```
#[derive(Debug, Clone)]
pub struct Chunk {
    /// The chunk bytes.
    pub data: Bytes,

    /// Stream position of the first byte, if known.
    pub offset: Option<u64>,

    /// BLAKE3 digest of `data`, if the chunker computed one.
    pub hash: Option<Digest>,
}

impl Chunk {
    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the chunk holds no bytes. The chunker never emits one.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the recorded digest, or hashes `data` if there is none.
    pub fn digest(&self) -> Digest {
        self.hash.unwrap_or_else(|| Digest::of(&self.data))
    }

    /// Returns false if a recorded digest no longer matches `data`.
    pub fn verify(&self) -> bool {
        self.hash.is_none_or(|hash| hash == Digest::of(&self.data))
    }

    /// Stream position of the first byte (0 if unknown).
    pub fn start(&self) -> u64 {
        self.offset.unwrap_or(0)
    }

    /// Stream position one past the last byte.
    pub fn end(&self) -> u64 {
        self.start() + self.data.len() as u64
    }

    /// `start()..end()`.
    pub fn range(&self) -> Range<u64> {
        self.start()..self.end()
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(_) => write!(f, "{}..{}", self.start(), self.end())?,
            None => write!(f, "{} bytes", self.len())?,
        }
        if let Some(hash) = self.hash {
            write!(f, " {hash}")?;
        }
        Ok(())
    }
}
