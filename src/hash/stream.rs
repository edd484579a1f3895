//! Whole-stream hashing.

use std::io;

use crate::hash::Digest;

/// Incremental BLAKE3 hasher that also counts what it has seen.
///
/// The archive engine folds every chunk of a member into one of these, so
/// the byte count doubles as the current position in the member.
#[derive(Debug, Clone, Default)]
pub struct DigestHasher {
    state: blake3::Hasher,
    length: u64,
}

impl DigestHasher {
    /// Creates an empty hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds `data` into the digest.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.state.update(data);
        self.length += data.len() as u64;
        self
    }

    /// Number of bytes hashed so far.
    pub fn len(&self) -> u64 {
        self.length
    }

    /// Returns true if nothing has been hashed yet.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Digest of everything fed so far. The hasher stays usable.
    pub fn finalize(&self) -> Digest {
        Digest::new(self.state.finalize().into())
    }
}

impl io::Write for DigestHasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
