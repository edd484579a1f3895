//! Chunking engine for processing byte streams.
//!
//! - [`Chunker`] - Reader-driven chunking through [`ChunkIter`]
//! - [`StreamChunker`] - Stateful engine with `push()`/`finish()` API

mod engine;
mod iter;

pub use engine::StreamChunker;
pub use iter::{ChunkIter, Chunker};
