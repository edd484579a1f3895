//! chunkar
//!
//! Deduplicating archival storage built on streaming content-defined chunking.
//!
//! `chunkar` splits byte streams ("members") into content-defined chunks with
//! a Rabin rolling hash, stores every unique chunk exactly once under its
//! BLAKE3 digest, and records in a SQLite catalog how the chunks recombine.
//! Because boundaries depend only on nearby content, an edit to a member
//! perturbs only the chunks around it and everything else deduplicates.
//!
//! The crate has two layers:
//!
//! - the **chunker**: [`RollingHasher`], [`Chunker`] / [`ChunkIter`] over any
//!   [`std::io::Read`], the incremental [`StreamChunker`], and [`ReadAhead`]
//!   for overlapping reads with chunking
//! - the **store**: [`ArchiveStore`] with `store`, `load`, `delete`, `list`,
//!   `info` and `fsck`, on top of a [`BlobStore`] and a [`Catalog`]
//!
//! # Chunking
//!
//! ```no_run
//! use std::fs::File;
//! use chunkar::{Chunker, ChunkConfig, ChunkError};
//!
//! fn main() -> Result<(), ChunkError> {
//!     let file = File::open("data.bin")?;
//!     let chunker = Chunker::new(ChunkConfig::default());
//!
//!     for chunk in chunker.chunk(file) {
//!         let chunk = chunk?;
//!         println!("chunk {} bytes at {}", chunk.len(), chunk.start());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Archiving
//!
//! ```no_run
//! use std::fs::File;
//! use chunkar::{ArchiveStore, ArchiveError, ChunkConfig};
//!
//! fn main() -> Result<(), ArchiveError> {
//!     let mut store = ArchiveStore::open_or_create("backups", ChunkConfig::default())?;
//!
//!     let summary = store.store("etc.tar", File::open("etc.tar")?)?;
//!     println!("{} chunks, {} new", summary.chunks, summary.new_blobs);
//!
//!     store.load("etc.tar", File::create("etc.restored.tar")?)?;
//!
//!     let report = store.fsck()?;
//!     if !report.is_clean() {
//!         eprint!("{report}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Async (feature = "async-io")
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
//!         println!("chunk {}", chunk.data.len());
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod archive;
mod chunk;
mod chunker;
mod config;
mod error;
mod hash;
mod prefetch;
mod store;

mod buffer; // internal (thread-local reuse)
mod cdc; // internal rolling hash and boundary detection
mod util;

#[cfg(feature = "async-io")]
mod async_stream;

pub use archive::{ArchiveStore, CATALOG_FILE, Finding, FsckReport, StoreSummary};
pub use cdc::RollingHasher;
pub use chunk::Chunk;
pub use chunker::{ChunkIter, Chunker, StreamChunker};
pub use config::{
    ChunkConfig, DEFAULT_MASK_BITS, DEFAULT_MAX_CHUNK_SIZE, DEFAULT_MIN_CHUNK_SIZE,
    DEFAULT_MULTIPLIER, DEFAULT_WINDOW_SIZE, HashConfig,
};
pub use error::{ArchiveError, BlobError, ChunkError, IntegrityError};
pub use hash::{Digest, DigestHasher};
pub use prefetch::{DEFAULT_BLOCK_SIZE, ReadAhead};
pub use store::{
    ArchiveRecord, BlobStore, Catalog, CatalogTx, ChunkRecord, ChunkTotal, FsBlobStore,
    MemoryBlobStore, STORE_NAME, STORE_VERSION,
};

#[cfg(feature = "async-io")]
pub use async_stream::{ChunkStream, chunk_async};
