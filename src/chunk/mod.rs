//! Chunk types.
//!
//! - [`Chunk`] - Content-defined chunk with data, offset, digest

mod data;

pub use data::Chunk;
