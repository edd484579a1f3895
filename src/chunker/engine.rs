//! Incremental chunking engine - StreamChunker with push/finish API.
//!
//! - [`StreamChunker`] - Stateful engine that processes streaming bytes
//! - `push()` - Feed data in any size (1 byte, 8KB, 1MB, etc.)
//! - `finish()` - Flush remaining data when stream ends
//!
//! # Example
//!
//! ```
//! use chunkar::{StreamChunker, ChunkConfig};
//! use bytes::Bytes;
//!
//! let mut chunker = StreamChunker::new(ChunkConfig::default());
//!
//! let mut chunks = chunker.push(Bytes::from(&b"first"[..]));
//! chunks.extend(chunker.push(Bytes::from(&b"second"[..])));
//! chunks.extend(chunker.finish());
//!
//! assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), 11);
//! ```

use bytes::{Bytes, BytesMut};

use crate::cdc::RabinCdc;
use crate::chunk::Chunk;
use crate::config::ChunkConfig;
use crate::hash::Digest;

/// A chunker that processes streaming byte data into content-defined chunks.
///
/// `StreamChunker` accepts bytes via `push()` and yields chunks as the
/// rolling hash identifies boundaries. It keeps the fingerprint window and the
/// bytes of the open chunk across calls.
///
/// # Determinism
///
/// Identical byte streams produce identical chunk boundaries, regardless of
/// how many bytes are pushed at once or how many `push()` calls are made.
///
/// # Zero-Copy
///
/// A chunk that lies entirely within one pushed `Bytes` is a slice of it.
/// Only chunks that span `push()` calls are copied, and each of their bytes
/// is copied once.
#[derive(Debug)]
pub struct StreamChunker {
    cdc: RabinCdc,
    /// Open-chunk bytes carried over from earlier pushes.
    spilled: BytesMut,
    /// Open-chunk bytes from the latest push, not yet copied.
    tail: Bytes,
    offset: u64,
    config: ChunkConfig,
}

impl StreamChunker {
    /// Creates a new chunker with the given configuration.
    ///
    /// The configuration is expected to be valid (see [`ChunkConfig::validate`]).
    pub fn new(config: ChunkConfig) -> Self {
        Self {
            cdc: RabinCdc::new(&config),
            spilled: BytesMut::new(),
            tail: Bytes::new(),
            offset: 0,
            config,
        }
    }

    fn create_chunk(&self, data: Bytes, offset: u64) -> Chunk {
        let hash = self
            .config
            .hash_config()
            .enabled
            .then(|| Digest::of(&data));
        Chunk {
            data,
            offset: Some(offset),
            hash,
        }
    }

    /// Pushes data into the chunker and returns the chunks it completes.
    ///
    /// Bytes after the last boundary are held internally and become the
    /// start of the next chunk.
    ///
    /// # Example
    ///
    /// ```
    /// use chunkar::{StreamChunker, ChunkConfig};
    /// use bytes::Bytes;
    ///
    /// let config = ChunkConfig::new(4, 4)?;
    /// let mut chunker = StreamChunker::new(config);
    ///
    /// let chunks = chunker.push(Bytes::from_static(b"HELLOHE"));
    /// assert_eq!(chunks.len(), 2);
    /// assert_eq!(&chunks[0].data[..], b"HELLO");
    /// assert_eq!(chunker.pending_len(), 0);
    /// # Ok::<(), chunkar::ChunkError>(())
    /// ```
    pub fn push(&mut self, data: Bytes) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut new_chunk_start = 0;

        if !self.tail.is_empty() {
            self.spilled.extend_from_slice(&self.tail);
            self.tail = Bytes::new();
        }

        for (i, &byte) in data.iter().enumerate() {
            if !self.cdc.update(byte) {
                continue;
            }

            let chunk_data = if self.spilled.is_empty() {
                data.slice(new_chunk_start..=i)
            } else {
                self.spilled.extend_from_slice(&data[new_chunk_start..=i]);
                self.spilled.split().freeze()
            };

            let chunk_offset = self.offset;
            self.offset += chunk_data.len() as u64;
            chunks.push(self.create_chunk(chunk_data, chunk_offset));
            new_chunk_start = i + 1;
        }

        if new_chunk_start < data.len() {
            self.tail = data.slice(new_chunk_start..);
        }

        chunks
    }

    /// Finalizes the stream and returns the final chunk, if any bytes remain.
    ///
    /// The final chunk ends at end-of-stream regardless of the fingerprint
    /// and may be shorter than the minimum size. After `finish()` the chunker
    /// is reset and can be reused for a new stream.
    pub fn finish(&mut self) -> Option<Chunk> {
        let data = if self.spilled.is_empty() {
            std::mem::take(&mut self.tail)
        } else {
            self.spilled.extend_from_slice(&self.tail);
            self.spilled.split().freeze()
        };
        let chunk = if data.is_empty() {
            None
        } else {
            Some(self.create_chunk(data, self.offset))
        };
        self.reset();
        chunk
    }

    /// Resets the chunker state for a new stream.
    ///
    /// Clears the fingerprint window, pending data, and offset.
    pub fn reset(&mut self) {
        self.cdc.reset();
        self.spilled.clear();
        self.tail = Bytes::new();
        self.offset = 0;
    }

    /// Returns the stream offset of the next chunk to be emitted.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns the number of bytes held for the open chunk.
    pub fn pending_len(&self) -> usize {
        self.spilled.len() + self.tail.len()
    }

    /// Returns the configuration used by this chunker.
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }
}

impl Default for StreamChunker {
    fn default() -> Self {
        Self::new(ChunkConfig::default())
    }
}
