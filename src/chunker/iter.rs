//! Reader-driven chunking - Chunker and ChunkIter.
//!
//! - [`Chunker`] - Configures and initiates chunking operations
//! - [`ChunkIter`] - Iterator that yields chunks from a [`std::io::Read`] source
//!
//! # Example
//!
//! ```no_run
//! use chunkar::{Chunker, ChunkConfig};
//! use std::fs::File;
//!
//! let file = File::open("data.bin")?;
//! let chunker = Chunker::new(ChunkConfig::default());
//!
//! for chunk in chunker.chunk(file) {
//!     let chunk = chunk?;
//!     println!("Chunk: {} bytes", chunk.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use bytes::Bytes;

use crate::buffer::Buffer;
use crate::chunk::Chunk;
use crate::chunker::StreamChunker;
use crate::config::ChunkConfig;
use crate::error::ChunkError;

/// A chunker that processes byte streams into content-defined chunks.
///
/// `Chunker` is the high-level API for synchronous chunking. It holds a
/// configuration and provides methods to chunk data from various sources.
///
/// # Example
///
/// ```
/// use chunkar::{Chunker, ChunkConfig};
/// use std::io::Cursor;
///
/// let data = b"some data to chunk";
/// let chunker = Chunker::new(ChunkConfig::default());
/// let chunks: Vec<_> = chunker.chunk(Cursor::new(&data[..])).collect::<Result<_, _>>()?;
/// assert_eq!(chunks.len(), 1);
/// # Ok::<(), chunkar::ChunkError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    /// Creates a new chunker with the given configuration.
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration used by this chunker.
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Creates a chunking iterator from a reader.
    ///
    /// The iterator reads lazily and yields chunks in stream order as
    /// boundaries are found. The reader is drained exactly once.
    pub fn chunk<R: Read>(self, reader: R) -> ChunkIter<R> {
        ChunkIter::new(reader, self.config)
    }

    /// Chunks an in-memory buffer.
    ///
    /// Every chunk is a zero-copy slice of `data`.
    ///
    /// # Example
    ///
    /// ```
    /// use chunkar::{Chunker, ChunkConfig};
    ///
    /// let chunker = Chunker::new(ChunkConfig::new(4, 4)?);
    /// let chunks = chunker.chunk_bytes(&b"HELLOHELLOHELLO"[..]);
    ///
    /// assert_eq!(chunks.len(), 7);
    /// assert_eq!(&chunks[0].data[..], b"HELLO");
    /// # Ok::<(), chunkar::ChunkError>(())
    /// ```
    pub fn chunk_bytes(&self, data: impl Into<Bytes>) -> Vec<Chunk> {
        let mut engine = StreamChunker::new(self.config);
        let mut chunks = engine.push(data.into());
        chunks.extend(engine.finish());
        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkConfig::default())
    }
}

/// An iterator that yields chunks from a reader.
///
/// `ChunkIter` reads from a [`std::io::Read`] source into a pooled 64 KiB
/// buffer and feeds each read through a [`StreamChunker`]. Boundaries do not
/// depend on how the reader splits its data.
///
/// A read error is yielded once as [`ChunkError::Io`] and ends the iteration;
/// bytes of the open chunk are discarded. Interrupted reads are retried.
pub struct ChunkIter<R> {
    reader: R,
    engine: StreamChunker,
    buffer: Buffer,
    ready: VecDeque<Chunk>,
    consumed: u64,
    finished: bool,
}

impl<R: Read> ChunkIter<R> {
    fn new(reader: R, config: ChunkConfig) -> Self {
        Self {
            reader,
            engine: StreamChunker::new(config),
            buffer: Buffer::take(),
            ready: VecDeque::new(),
            consumed: 0,
            finished: false,
        }
    }

    /// Returns the number of bytes consumed from the reader so far.
    pub fn bytes_read(&self) -> u64 {
        self.consumed
    }
}

impl<R: Read> Iterator for ChunkIter<R> {
    type Item = Result<Chunk, ChunkError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(chunk) = self.ready.pop_front() {
                return Some(Ok(chunk));
            }
            if self.finished {
                return None;
            }

            match self.reader.read(self.buffer.as_mut_slice()) {
                Ok(0) => {
                    self.finished = true;
                    return self.engine.finish().map(Ok);
                }
                Ok(n) => {
                    self.consumed += n as u64;
                    let data = Bytes::copy_from_slice(self.buffer.filled(n));
                    self.ready.extend(self.engine.push(data));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.finished = true;
                    self.engine.reset();
                    return Some(Err(e.into()));
                }
            }
        }
    }
}
