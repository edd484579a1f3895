//! Persistent storage behind an archive store.
//!
//! - [`BlobStore`] - Chunk bytes keyed by digest ([`FsBlobStore`], [`MemoryBlobStore`])
//! - [`Catalog`] - SQLite tables mapping archives to chunk lists
//! - `format` - The `format/` descriptor identifying a store directory

mod blob;
mod catalog;
pub(crate) mod format;

pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use catalog::{ArchiveRecord, Catalog, CatalogTx, ChunkRecord, ChunkTotal};
pub use format::{STORE_NAME, STORE_VERSION};
