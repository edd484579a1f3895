//! Chunking for async readers (`async-io` feature).
//!
//! [`chunk_async`] wraps any `futures-io` [`AsyncRead`](futures_io::AsyncRead)
//! in a [`ChunkStream`]. Tokio readers work through `tokio-util`'s compat
//! layer. Archiving itself stays synchronous; this is for callers that only
//! need boundaries and digests.

mod stream;

pub use stream::{ChunkStream, chunk_async};
