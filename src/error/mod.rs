//! Error types for chunkar.
//!
//! - [`ChunkError`] - chunking and configuration failures
//! - [`BlobError`] - blob store failures
//! - [`IntegrityError`] - stored data disagrees with recorded digests or lengths
//! - [`ArchiveError`] - everything an archive operation can fail with

use std::path::PathBuf;

use thiserror::Error;

use crate::hash::Digest;

/// Errors that can occur during chunking operations.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// An I/O error occurred while reading input data.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A fingerprint was requested over fewer bytes than the window width.
    #[error("window too short: {actual} bytes (need {expected})")]
    WindowTooShort {
        /// The configured window width.
        expected: usize,
        /// The number of bytes supplied.
        actual: usize,
    },

    /// Invalid configuration parameter.
    #[error("invalid config: {message}")]
    InvalidConfig {
        /// Description of what was invalid.
        message: &'static str,
    },
}

/// Errors raised by a [`BlobStore`](crate::BlobStore).
#[derive(Debug, Error)]
pub enum BlobError {
    /// No blob is stored under the digest.
    #[error("blob {0} not found")]
    NotFound(Digest),

    /// The underlying storage failed.
    #[error("blob store io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stored data that no longer matches what the catalog recorded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntegrityError {
    /// A blob's length disagrees with its chunk row.
    #[error("chunk {digest} of {name} is {actual} bytes, expected {expected}")]
    ChunkLength {
        /// Archive being read.
        name: String,
        /// Digest of the blob.
        digest: Digest,
        /// Length recorded in the chunk row.
        expected: u64,
        /// Length of the stored blob.
        actual: u64,
    },

    /// The reassembled stream hashes to a different digest.
    #[error("{name} hash mismatch: expected {expected}, got {actual}")]
    ArchiveDigest {
        /// Archive being read.
        name: String,
        /// Digest recorded for the archive.
        expected: Digest,
        /// Digest of the reassembled bytes.
        actual: Digest,
    },

    /// The reassembled stream has a different total length.
    #[error("{name} length mismatch: expected {expected}, got {actual}")]
    ArchiveLength {
        /// Archive being read.
        name: String,
        /// Length recorded for the archive.
        expected: u64,
        /// Number of bytes reassembled.
        actual: u64,
    },

    /// Chunk rows do not tile the archive contiguously.
    #[error("{name} chunk at offset {offset} does not follow offset {expected}")]
    Discontinuity {
        /// Archive being read.
        name: String,
        /// Offset the next chunk should start at.
        expected: u64,
        /// Offset the next chunk actually starts at.
        offset: u64,
    },
}

/// Errors returned by [`ArchiveStore`](crate::ArchiveStore) operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The directory is missing, malformed, or uses an unsupported format.
    #[error("{} is not a chunkar store: {reason}", path.display())]
    NotAStore {
        /// Store directory.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// An archive with this name is already stored.
    #[error("archive {0} already exists")]
    ArchiveAlreadyExists(String),

    /// No archive with this name is stored.
    #[error("member {0} not found in archive")]
    MemberNotFound(String),

    /// Stored data failed verification.
    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    /// Chunking the input failed.
    #[error("chunker error: {0}")]
    Chunker(#[from] ChunkError),

    /// The blob store failed.
    #[error(transparent)]
    Blob(#[from] BlobError),

    /// The catalog failed.
    #[error("metadata error: {0}")]
    Metadata(#[from] rusqlite::Error),

    /// Writing output or laying out the store failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The chunking descriptor could not be encoded or decoded.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: ChunkError = io_err.into();
        assert!(matches!(err, ChunkError::Io(_)));
    }

    #[test]
    fn test_display() {
        let err = ChunkError::WindowTooShort {
            expected: 48,
            actual: 3,
        };
        assert!(err.to_string().contains("window too short"));

        let err = ArchiveError::MemberNotFound("a".into());
        assert_eq!(err.to_string(), "member a not found in archive");
    }

    #[test]
    fn test_chunk_error_wraps_into_archive_error() {
        let err: ArchiveError = ChunkError::InvalidConfig { message: "bad" }.into();
        assert!(matches!(err, ArchiveError::Chunker(_)));
    }

    #[test]
    fn test_blob_error_is_transparent() {
        let digest = Digest::of(b"x");
        let err: ArchiveError = BlobError::NotFound(digest).into();
        assert_eq!(err.to_string(), format!("blob {digest} not found"));
    }
}
