//! The archive engine.
//!
//! [`ArchiveStore`] ties the chunker, a [`BlobStore`] and the [`Catalog`]
//! together. Storing a member splits it into chunks, writes each unseen chunk
//! as a blob, and records the chunk list in one catalog transaction.
//!
//! # Crash safety
//!
//! Every blob is written before the chunk row that references it, and an
//! archive becomes visible only when its transaction commits with the final
//! length and digest. A crash at any point therefore leaves at most blobs
//! nobody references; `fsck` reports them and nothing depends on them.
//! Deleting removes blobs first and rows last, so an interrupted delete is
//! completed by running it again.

mod fsck;

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use rusqlite::ErrorCode;
use tracing::{debug, info, instrument};

use crate::chunker::Chunker;
use crate::config::{ChunkConfig, HashConfig};
use crate::error::{ArchiveError, IntegrityError};
use crate::hash::DigestHasher;
use crate::store::{ArchiveRecord, BlobStore, Catalog, FsBlobStore, format};

pub use fsck::{Finding, FsckReport};

/// File name of the catalog inside a store directory.
pub const CATALOG_FILE: &str = "catalog.db";

/// What [`ArchiveStore::store`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSummary {
    /// The new archive.
    pub archive: ArchiveRecord,
    /// Number of chunks the member was split into.
    pub chunks: usize,
    /// Number of blobs that were not stored before this call.
    pub new_blobs: usize,
}

/// A deduplicating archive store.
///
/// # Example
///
/// ```
/// use chunkar::{ArchiveStore, ChunkConfig};
///
/// let dir = tempfile::tempdir()?;
/// let mut store = ArchiveStore::create(dir.path(), ChunkConfig::default())?;
///
/// store.store("greeting", &b"hello world"[..])?;
///
/// let mut out = Vec::new();
/// store.load("greeting", &mut out)?;
/// assert_eq!(out, b"hello world");
/// assert_eq!(store.list()?, vec!["greeting".to_string()]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct ArchiveStore<B: BlobStore = FsBlobStore> {
    root: Option<PathBuf>,
    catalog: Catalog,
    blobs: B,
    config: ChunkConfig,
}

impl ArchiveStore<FsBlobStore> {
    /// Creates a new store in `dir`, which must not already hold one.
    ///
    /// `config` is recorded in the store and used for every member.
    #[instrument(skip(dir), fields(dir = %dir.as_ref().display()))]
    pub fn create(dir: impl AsRef<Path>, config: ChunkConfig) -> Result<Self, ArchiveError> {
        let root = dir.as_ref();
        config.validate()?;

        if root.exists() && !root.is_dir() {
            return Err(ArchiveError::NotAStore {
                path: root.to_path_buf(),
                reason: "not a directory".into(),
            });
        }
        if format::exists(root) {
            return Err(ArchiveError::NotAStore {
                path: root.to_path_buf(),
                reason: "already contains a store".into(),
            });
        }

        fs::create_dir_all(root)?;
        let blobs = FsBlobStore::open(root)?;
        let catalog = Catalog::open(root.join(CATALOG_FILE))?;
        // The descriptor goes last: a half-created directory is not a store.
        format::write(root, &config)?;

        info!("created store");
        Ok(Self {
            root: Some(root.to_path_buf()),
            catalog,
            blobs,
            config,
        })
    }

    /// Opens an existing store.
    #[instrument(skip(dir), fields(dir = %dir.as_ref().display()))]
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let root = dir.as_ref();
        if !root.is_dir() {
            return Err(ArchiveError::NotAStore {
                path: root.to_path_buf(),
                reason: "not a directory".into(),
            });
        }

        let config = format::read(root)?;
        let catalog_path = root.join(CATALOG_FILE);
        // Never recreate a lost catalog: every blob would read as an orphan.
        if !catalog_path.is_file() {
            return Err(ArchiveError::NotAStore {
                path: root.to_path_buf(),
                reason: format!("missing {CATALOG_FILE}"),
            });
        }
        let blobs = FsBlobStore::open(root)?;
        let catalog = Catalog::open(catalog_path)?;

        debug!(?config, "opened store");
        Ok(Self {
            root: Some(root.to_path_buf()),
            catalog,
            blobs,
            config,
        })
    }

    /// Opens the store in `dir`, creating it with `config` if there is none.
    ///
    /// An existing store keeps the chunking parameters it was created with.
    pub fn open_or_create(
        dir: impl AsRef<Path>,
        config: ChunkConfig,
    ) -> Result<Self, ArchiveError> {
        let root = dir.as_ref();
        if format::exists(root) {
            Self::open(root)
        } else {
            Self::create(root, config)
        }
    }
}

impl<B: BlobStore> ArchiveStore<B> {
    /// Builds a store from an already opened catalog and blob store.
    ///
    /// Nothing is written to disk; this is how in-memory stores are made.
    pub fn from_parts(
        catalog: Catalog,
        blobs: B,
        config: ChunkConfig,
    ) -> Result<Self, ArchiveError> {
        config.validate()?;
        Ok(Self {
            root: None,
            catalog,
            blobs,
            config,
        })
    }

    /// Returns the store directory, if the store lives on disk.
    pub fn path(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Returns the chunking parameters of this store.
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Returns the catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Returns the blob store.
    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    /// Stores the contents of `reader` as a new archive called `name`.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::ArchiveAlreadyExists`] if `name` is taken
    /// - [`ArchiveError::Chunker`] if reading the input fails
    ///
    /// On any error nothing becomes visible in the catalog; blobs already
    /// written stay behind unreferenced.
    #[instrument(skip(self, reader))]
    pub fn store<R: Read>(&mut self, name: &str, reader: R) -> Result<StoreSummary, ArchiveError> {
        let config = self.config.with_hash_config(HashConfig::enabled());

        let tx = self.catalog.begin()?;
        if tx.archive_id(name)?.is_some() {
            return Err(ArchiveError::ArchiveAlreadyExists(name.to_string()));
        }
        let archive_id = tx
            .insert_archive(name)
            .map_err(|e| already_exists(e, name))?;

        let mut whole = DigestHasher::new();
        let mut chunks = 0usize;
        let mut new_blobs = 0usize;

        for chunk in Chunker::new(config).chunk(reader) {
            let chunk = chunk?;
            let digest = chunk.digest();

            // Blob first: a crash between the two leaves an orphan, never a
            // chunk row without its bytes.
            if self.blobs.put(&digest, &chunk.data)? {
                new_blobs += 1;
            }
            tx.insert_chunk(archive_id, &digest, whole.len(), chunk.len() as u64)?;

            whole.update(&chunk.data);
            chunks += 1;
        }

        let (length, digest) = (whole.len(), whole.finalize());
        tx.finalize_archive(archive_id, length, &digest)?;
        tx.commit()?;

        info!(length, chunks, new_blobs, %digest, "stored archive");
        Ok(StoreSummary {
            archive: ArchiveRecord {
                id: archive_id,
                name: name.to_string(),
                length,
                digest,
            },
            chunks,
            new_blobs,
        })
    }

    /// Writes archive `name` to `sink`, verifying it on the way.
    ///
    /// Every chunk's length is checked as it is read and the whole member's
    /// digest and length are checked at the end. Bytes already written to
    /// `sink` before a failure are not retracted.
    #[instrument(skip(self, sink))]
    pub fn load<W: Write>(&self, name: &str, mut sink: W) -> Result<ArchiveRecord, ArchiveError> {
        let record = self
            .catalog
            .archive(name)?
            .ok_or_else(|| ArchiveError::MemberNotFound(name.to_string()))?;

        let mut hasher = DigestHasher::new();

        for chunk in self.catalog.chunks(record.id)? {
            if chunk.offset != hasher.len() {
                return Err(IntegrityError::Discontinuity {
                    name: record.name,
                    expected: hasher.len(),
                    offset: chunk.offset,
                }
                .into());
            }

            let data = self.blobs.get(&chunk.digest)?;
            if data.len() as u64 != chunk.length {
                return Err(IntegrityError::ChunkLength {
                    name: record.name,
                    digest: chunk.digest,
                    expected: chunk.length,
                    actual: data.len() as u64,
                }
                .into());
            }

            sink.write_all(&data)?;
            hasher.update(&data);
        }
        sink.flush()?;

        let actual = hasher.finalize();
        if actual != record.digest {
            return Err(IntegrityError::ArchiveDigest {
                name: record.name,
                expected: record.digest,
                actual,
            }
            .into());
        }
        if hasher.len() != record.length {
            return Err(IntegrityError::ArchiveLength {
                name: record.name,
                expected: record.length,
                actual: hasher.len(),
            }
            .into());
        }

        debug!(length = hasher.len(), "loaded archive");
        Ok(record)
    }

    /// Deletes archive `name` and every blob only it referenced.
    ///
    /// Unfinished archive rows can be deleted too.
    #[instrument(skip(self))]
    pub fn delete(&mut self, name: &str) -> Result<(), ArchiveError> {
        let tx = self.catalog.begin()?;
        let archive_id = tx
            .archive_id(name)?
            .ok_or_else(|| ArchiveError::MemberNotFound(name.to_string()))?;

        let mut freed = 0usize;
        for digest in tx.archive_digests(archive_id)? {
            if !tx.referenced_elsewhere(&digest, archive_id)? {
                self.blobs.delete(&digest)?;
                freed += 1;
            }
        }

        tx.delete_archive(archive_id)?;
        tx.commit()?;

        info!(freed, "deleted archive");
        Ok(())
    }

    /// Lists the names of stored archives in ascending order.
    pub fn list(&self) -> Result<Vec<String>, ArchiveError> {
        Ok(self.catalog.archive_names()?)
    }

    /// Returns the catalog record of archive `name`.
    pub fn info(&self, name: &str) -> Result<ArchiveRecord, ArchiveError> {
        self.catalog
            .archive(name)?
            .ok_or_else(|| ArchiveError::MemberNotFound(name.to_string()))
    }

    /// Audits the whole store without changing it.
    ///
    /// Returns an error only if the catalog or blob store cannot be read at
    /// all; every inconsistency is reported as a [`Finding`].
    #[instrument(skip(self))]
    pub fn fsck(&self) -> Result<FsckReport, ArchiveError> {
        let checker = fsck::ConsistencyChecker::new(&self.catalog, &self.blobs);
        let report = checker.run()?;
        info!(
            findings = report.findings.len(),
            archives = report.archives_checked,
            blobs = report.blobs_checked,
            "fsck finished"
        );
        Ok(report)
    }
}

/// Maps a UNIQUE violation on the archive name to `ArchiveAlreadyExists`.
fn already_exists(err: rusqlite::Error, name: &str) -> ArchiveError {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            ArchiveError::ArchiveAlreadyExists(name.to_string())
        }
        other => other.into(),
    }
}
