//! Async stream adapter for chunking.
//!
//! # Example
//!
//! ```ignore
//! use futures_util::StreamExt;
//! use chunkar::{chunk_async, ChunkConfig};
//! use futures_io::AsyncRead;
//!
//! async fn demo<R: AsyncRead + Unpin>(reader: R) -> Result<(), chunkar::ChunkError> {
//!     let mut stream = chunk_async(reader, ChunkConfig::default());
//!
//!     while let Some(chunk) = stream.next().await {
//!         let chunk = chunk?;
//!         println!("Chunk: {} bytes", chunk.len());
//!     }
//!     Ok(())
//! }
//! ```

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_core::Stream;
use futures_io::AsyncRead;
use pin_project_lite::pin_project;

use crate::chunk::Chunk;
use crate::chunker::StreamChunker;
use crate::config::ChunkConfig;
use crate::error::ChunkError;

/// Bytes requested from the reader per poll.
const READ_SIZE: usize = 64 * 1024;

pin_project! {
    /// A stream that yields chunks from an async reader.
    ///
    /// Boundaries, offsets and digests are identical to those produced by
    /// [`Chunker::chunk`](crate::Chunker::chunk) over the same bytes.
    pub struct ChunkStream<R> {
        #[pin]
        reader: R,
        engine: StreamChunker,
        buffer: Vec<u8>,
        ready: VecDeque<Chunk>,
        finished: bool,
    }
}

impl<R> ChunkStream<R> {
    /// Creates a new chunk stream from an async reader.
    pub fn new(reader: R, config: ChunkConfig) -> Self {
        Self {
            reader,
            engine: StreamChunker::new(config),
            buffer: vec![0u8; READ_SIZE],
            ready: VecDeque::new(),
            finished: false,
        }
    }
}

impl<R: AsyncRead> Stream for ChunkStream<R> {
    type Item = Result<Chunk, ChunkError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(chunk) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(chunk)));
            }
            if *this.finished {
                return Poll::Ready(None);
            }

            match this.reader.as_mut().poll_read(cx, &mut this.buffer[..]) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Ok(0)) => {
                    *this.finished = true;
                    return Poll::Ready(this.engine.finish().map(Ok));
                }
                Poll::Ready(Ok(n)) => {
                    let data = Bytes::copy_from_slice(&this.buffer[..n]);
                    this.ready.extend(this.engine.push(data));
                }
                Poll::Ready(Err(e)) if e.kind() == ErrorKind::Interrupted => continue,
                Poll::Ready(Err(e)) => {
                    *this.finished = true;
                    this.engine.reset();
                    return Poll::Ready(Some(Err(ChunkError::Io(e))));
                }
            }
        }
    }
}

/// Creates a chunk stream from an async reader.
///
/// Uses `futures_io::AsyncRead` for runtime-agnostic async I/O. Tokio users
/// can adapt their readers with `tokio_util::compat`:
///
/// ```ignore
/// use tokio_util::compat::TokioAsyncReadCompatExt;
/// use chunkar::{chunk_async, ChunkConfig};
///
/// let tokio_reader = tokio::fs::File::open("file").await?;
/// let stream = chunk_async(tokio_reader.compat(), ChunkConfig::default());
/// ```
pub fn chunk_async<R: AsyncRead>(reader: R, config: ChunkConfig) -> ChunkStream<R> {
    ChunkStream::new(reader, config)
}
