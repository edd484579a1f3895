//! Read-only consistency checking.
//!
//! The checker cross-examines the catalog and the blob store and reports
//! everything that disagrees as a [`Finding`]. It never modifies either side.

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, warn};

use crate::error::ArchiveError;
use crate::hash::{Digest, DigestHasher};
use crate::store::{ArchiveRecord, BlobStore, Catalog};

/// One inconsistency found by [`ArchiveStore::fsck`](crate::ArchiveStore::fsck).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// Bytes `start..end` of an archive are covered by no chunk.
    Gap {
        /// Archive name.
        name: String,
        /// First uncovered offset.
        start: u64,
        /// Offset of the next chunk.
        end: u64,
    },
    /// A chunk starts before the previous chunk ended.
    Overlap {
        /// Archive name.
        name: String,
        /// Offset of the overlapping chunk.
        offset: u64,
    },
    /// A stored blob that no chunk references.
    OrphanBlob {
        /// Digest of the blob.
        digest: Digest,
    },
    /// A referenced blob could not be read.
    UnreadableBlob {
        /// Digest of the blob.
        digest: Digest,
        /// Why the read failed.
        error: String,
    },
    /// A referenced blob has a different length than its chunk rows.
    WrongSize {
        /// Digest of the blob.
        digest: Digest,
        /// Length recorded in the catalog.
        expected: u64,
        /// Length of the stored blob.
        actual: u64,
    },
    /// A referenced blob no longer hashes to its digest.
    CorruptBlob {
        /// Digest the blob is stored under.
        digest: Digest,
        /// Digest of its current contents.
        actual: Digest,
    },
    /// Reassembling an archive yields a different digest than recorded.
    ArchiveHashMismatch {
        /// Archive name.
        name: String,
        /// Recorded digest.
        expected: Digest,
        /// Digest of the reassembled bytes.
        actual: Digest,
    },
    /// An archive's recorded length differs from the sum of its chunks.
    ArchiveLengthMismatch {
        /// Archive name.
        name: String,
        /// Recorded length.
        expected: u64,
        /// Sum of chunk lengths.
        actual: u64,
    },
    /// An archive could not be reassembled to verify its digest.
    ArchiveUnreadable {
        /// Archive name.
        name: String,
        /// First chunk that could not be read.
        digest: Digest,
        /// Why the read failed.
        error: String,
    },
    /// An archive row without a recorded length or digest.
    UnfinishedArchive {
        /// Archive name.
        name: String,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gap { name, start, end } => {
                write!(f, "hole in {name} found between {start} and {end}")
            }
            Self::Overlap { name, offset } => {
                write!(f, "chunk at offset {offset} for {name} has an overlap")
            }
            Self::OrphanBlob { digest } => write!(f, "unknown object {digest}"),
            Self::UnreadableBlob { digest, error } => {
                write!(f, "could not read chunk {digest}: {error}")
            }
            Self::WrongSize {
                digest,
                expected,
                actual,
            } => write!(
                f,
                "chunk {digest} wrong size: {actual} bytes, expected {expected}"
            ),
            Self::CorruptBlob { digest, actual } => {
                write!(f, "chunk {digest} corrupt: contents hash to {actual}")
            }
            Self::ArchiveHashMismatch {
                name,
                expected,
                actual,
            } => write!(
                f,
                "archive {name} hash mismatch: expected {expected}, got {actual}"
            ),
            Self::ArchiveLengthMismatch {
                name,
                expected,
                actual,
            } => write!(
                f,
                "archive {name} length mismatch: recorded {expected}, chunks sum to {actual}"
            ),
            Self::ArchiveUnreadable {
                name,
                digest,
                error,
            } => write!(f, "archive {name} unreadable at chunk {digest}: {error}"),
            Self::UnfinishedArchive { name } => {
                write!(f, "archive {name} was never finished")
            }
        }
    }
}

/// Result of a consistency check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FsckReport {
    /// Everything found, in check order.
    pub findings: Vec<Finding>,
    /// Number of completed archives examined.
    pub archives_checked: usize,
    /// Number of distinct referenced blobs examined.
    pub blobs_checked: usize,
}

impl FsckReport {
    /// Returns true if nothing was found.
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

impl fmt::Display for FsckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for finding in &self.findings {
            writeln!(f, "{finding}")?;
        }
        Ok(())
    }
}

/// Runs every check against one catalog and blob store.
pub(crate) struct ConsistencyChecker<'a, B> {
    catalog: &'a Catalog,
    blobs: &'a B,
    report: FsckReport,
}

impl<'a, B: BlobStore> ConsistencyChecker<'a, B> {
    pub(crate) fn new(catalog: &'a Catalog, blobs: &'a B) -> Self {
        Self {
            catalog,
            blobs,
            report: FsckReport::default(),
        }
    }

    pub(crate) fn run(mut self) -> Result<FsckReport, ArchiveError> {
        let archives = self.catalog.archives()?;
        self.report.archives_checked = archives.len();

        self.check_unfinished()?;
        self.check_coverage(&archives)?;
        self.check_orphans()?;
        self.check_blobs()?;
        self.check_archive_digests(&archives)?;
        self.check_archive_lengths()?;

        Ok(self.report)
    }

    fn record(&mut self, finding: Finding) {
        warn!(%finding, "fsck");
        self.report.findings.push(finding);
    }

    fn check_unfinished(&mut self) -> Result<(), ArchiveError> {
        for name in self.catalog.unfinished_archives()? {
            self.record(Finding::UnfinishedArchive { name });
        }
        Ok(())
    }

    fn check_coverage(&mut self, archives: &[ArchiveRecord]) -> Result<(), ArchiveError> {
        for archive in archives {
            let mut expected = 0u64;
            for chunk in self.catalog.chunks(archive.id)? {
                if chunk.offset > expected {
                    self.record(Finding::Gap {
                        name: archive.name.clone(),
                        start: expected,
                        end: chunk.offset,
                    });
                } else if chunk.offset < expected {
                    self.record(Finding::Overlap {
                        name: archive.name.clone(),
                        offset: chunk.offset,
                    });
                }
                expected = chunk.end();
            }
        }
        debug!("coverage checked");
        Ok(())
    }

    fn check_orphans(&mut self) -> Result<(), ArchiveError> {
        let referenced: BTreeSet<Digest> = self
            .catalog
            .referenced_blobs()?
            .into_iter()
            .map(|(digest, _)| digest)
            .collect();

        for digest in self.blobs.list_digests()? {
            if !referenced.contains(&digest) {
                self.record(Finding::OrphanBlob { digest });
            }
        }
        debug!("orphans checked");
        Ok(())
    }

    fn check_blobs(&mut self) -> Result<(), ArchiveError> {
        let referenced = self.catalog.referenced_blobs()?;
        self.report.blobs_checked = referenced
            .iter()
            .map(|(digest, _)| digest)
            .collect::<BTreeSet<_>>()
            .len();

        for (digest, expected) in referenced {
            let data = match self.blobs.get(&digest) {
                Ok(data) => data,
                Err(e) => {
                    self.record(Finding::UnreadableBlob {
                        digest,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let actual_len = data.len() as u64;
            if actual_len != expected {
                self.record(Finding::WrongSize {
                    digest,
                    expected,
                    actual: actual_len,
                });
                continue;
            }

            let actual = Digest::of(&data);
            if actual != digest {
                self.record(Finding::CorruptBlob { digest, actual });
            }
        }
        debug!("blobs checked");
        Ok(())
    }

    fn check_archive_digests(&mut self, archives: &[ArchiveRecord]) -> Result<(), ArchiveError> {
        'archives: for archive in archives {
            let mut hasher = DigestHasher::new();
            for chunk in self.catalog.chunks(archive.id)? {
                match self.blobs.get(&chunk.digest) {
                    Ok(data) => {
                        hasher.update(&data);
                    }
                    Err(e) => {
                        self.record(Finding::ArchiveUnreadable {
                            name: archive.name.clone(),
                            digest: chunk.digest,
                            error: e.to_string(),
                        });
                        continue 'archives;
                    }
                }
            }

            let actual = hasher.finalize();
            if actual != archive.digest {
                self.record(Finding::ArchiveHashMismatch {
                    name: archive.name.clone(),
                    expected: archive.digest,
                    actual,
                });
            }
        }
        debug!("archive digests checked");
        Ok(())
    }

    fn check_archive_lengths(&mut self) -> Result<(), ArchiveError> {
        for total in self.catalog.chunk_totals()? {
            if total.recorded != total.summed {
                self.record(Finding::ArchiveLengthMismatch {
                    name: total.name,
                    expected: total.recorded,
                    actual: total.summed,
                });
            }
        }
        Ok(())
    }
}
