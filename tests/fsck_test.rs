// Integration tests for fsck and load verification
// Faults are injected behind the store's back: blob files are truncated,
// flipped, added or removed, and catalog rows are edited over a second
// SQLite connection.

use std::fs::{self, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chunkar::{ArchiveError, ArchiveStore, ChunkConfig, Digest, Finding, IntegrityError};
use rusqlite::{Connection, params};
use tempfile::TempDir;

/// "HELLOHELLOXXXXX" is stored as HELLO@0, HELLO@5, XXXXX@10.
fn setup() -> (TempDir, ArchiveStore, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("store");
    let config = ChunkConfig::new(4, 4).unwrap().with_min_size(5);
    let mut store = ArchiveStore::create(&root, config).unwrap();
    store.store("a", &b"HELLOHELLOHELLO"[..]).unwrap();
    store.store("b", &b"HELLOHELLOXXXXX"[..]).unwrap();
    (dir, store, root)
}

fn blob_path(root: &Path, data: &[u8]) -> PathBuf {
    root.join("objects").join(Digest::of(data).to_hex())
}

fn raw_catalog(root: &Path) -> Connection {
    Connection::open(root.join("catalog.db")).unwrap()
}

fn archive_id(conn: &Connection, name: &str) -> i64 {
    conn.query_row(
        "SELECT id FROM archive WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
    .unwrap()
}

fn findings(store: &ArchiveStore) -> Vec<Finding> {
    store.fsck().unwrap().findings
}

#[test]
fn test_clean_store() {
    let (_dir, store, _root) = setup();
    let report = store.fsck().unwrap();
    assert!(report.is_clean(), "{report}");
    assert_eq!(report.archives_checked, 2);
    assert_eq!(report.blobs_checked, 2);
}

#[test]
fn test_truncated_blob() {
    let (_dir, store, root) = setup();
    let file = OpenOptions::new()
        .write(true)
        .open(blob_path(&root, b"XXXXX"))
        .unwrap();
    file.set_len(3).unwrap();
    drop(file);

    let found = findings(&store);
    assert!(found.contains(&Finding::WrongSize {
        digest: Digest::of(b"XXXXX"),
        expected: 5,
        actual: 3,
    }));
    assert!(found.iter().any(|f| matches!(
        f,
        Finding::ArchiveHashMismatch { name, .. } if name == "b"
    )));

    let err = store.load("b", Vec::new()).unwrap_err();
    assert!(matches!(
        err,
        ArchiveError::Integrity(IntegrityError::ChunkLength { .. })
    ));
}

#[test]
fn test_flipped_byte() {
    let (_dir, store, root) = setup();
    let path = blob_path(&root, b"HELLO");
    fs::write(&path, b"HELLP").unwrap();

    let found = findings(&store);
    assert!(found.contains(&Finding::CorruptBlob {
        digest: Digest::of(b"HELLO"),
        actual: Digest::of(b"HELLP"),
    }));
    // Both archives share the corrupted chunk.
    let mismatched: Vec<_> = found
        .iter()
        .filter_map(|f| match f {
            Finding::ArchiveHashMismatch { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(mismatched, vec!["a", "b"]);

    let err = store.load("a", Vec::new()).unwrap_err();
    assert!(matches!(
        err,
        ArchiveError::Integrity(IntegrityError::ArchiveDigest { .. })
    ));
}

#[test]
fn test_orphan_blob() {
    let (_dir, store, root) = setup();
    let stray = Digest::of(b"left behind by a crash");
    fs::write(
        root.join("objects").join(stray.to_hex()),
        b"left behind by a crash",
    )
    .unwrap();
    fs::write(root.join("objects").join("not-a-digest"), b"ignored").unwrap();

    assert_eq!(
        findings(&store),
        vec![Finding::OrphanBlob { digest: stray }]
    );
}

#[test]
fn test_missing_blob() {
    let (_dir, store, root) = setup();
    fs::remove_file(blob_path(&root, b"XXXXX")).unwrap();

    let found = findings(&store);
    assert!(found.iter().any(|f| matches!(
        f,
        Finding::UnreadableBlob { digest, .. } if *digest == Digest::of(b"XXXXX")
    )));
    assert!(found.iter().any(|f| matches!(
        f,
        Finding::ArchiveUnreadable { name, .. } if name == "b"
    )));

    let err = store.load("b", Vec::new()).unwrap_err();
    assert!(matches!(
        err,
        ArchiveError::Blob(chunkar::BlobError::NotFound(_))
    ));
}

#[test]
fn test_deleted_chunk_row() {
    let (_dir, store, root) = setup();
    let conn = raw_catalog(&root);
    let id = archive_id(&conn, "b");
    conn.execute(
        "DELETE FROM chunk WHERE archive_id = ?1 AND offset = 5",
        params![id],
    )
    .unwrap();

    let found = findings(&store);
    assert!(found.contains(&Finding::Gap {
        name: "b".into(),
        start: 5,
        end: 10,
    }));
    assert!(found.contains(&Finding::ArchiveLengthMismatch {
        name: "b".into(),
        expected: 15,
        actual: 10,
    }));
    assert!(found.iter().any(|f| matches!(
        f,
        Finding::ArchiveHashMismatch { name, .. } if name == "b"
    )));
    // "a" still references HELLO, so nothing is orphaned.
    assert!(
        !found
            .iter()
            .any(|f| matches!(f, Finding::OrphanBlob { .. }))
    );

    let err = store.load("b", Vec::new()).unwrap_err();
    assert!(matches!(
        err,
        ArchiveError::Integrity(IntegrityError::Discontinuity {
            expected: 5,
            offset: 10,
            ..
        })
    ));
}

#[test]
fn test_deleted_row_orphans_its_blob() {
    let (_dir, store, root) = setup();
    let conn = raw_catalog(&root);
    let id = archive_id(&conn, "b");
    conn.execute(
        "DELETE FROM chunk WHERE archive_id = ?1 AND offset = 10",
        params![id],
    )
    .unwrap();

    let found = findings(&store);
    assert!(found.contains(&Finding::OrphanBlob {
        digest: Digest::of(b"XXXXX"),
    }));
    assert!(found.contains(&Finding::ArchiveLengthMismatch {
        name: "b".into(),
        expected: 15,
        actual: 10,
    }));
    // A missing tail is not a hole between chunks.
    assert!(!found.iter().any(|f| matches!(f, Finding::Gap { .. })));
}

#[test]
fn test_overlapping_chunk_row() {
    let (_dir, store, root) = setup();
    let conn = raw_catalog(&root);
    let id = archive_id(&conn, "a");
    conn.execute(
        "INSERT INTO chunk (archive_id, digest, offset, length) VALUES (?1, ?2, 12, 5)",
        params![id, Digest::of(b"HELLO")],
    )
    .unwrap();

    let found = findings(&store);
    assert!(found.contains(&Finding::Overlap {
        name: "a".into(),
        offset: 12,
    }));
    assert!(found.contains(&Finding::ArchiveLengthMismatch {
        name: "a".into(),
        expected: 15,
        actual: 20,
    }));
}

#[test]
fn test_trailing_gap() {
    let (_dir, store, root) = setup();
    let conn = raw_catalog(&root);
    let id = archive_id(&conn, "a");
    conn.execute(
        "INSERT INTO chunk (archive_id, digest, offset, length) VALUES (?1, ?2, 20, 5)",
        params![id, Digest::of(b"HELLO")],
    )
    .unwrap();

    let found = findings(&store);
    assert!(found.contains(&Finding::Gap {
        name: "a".into(),
        start: 15,
        end: 20,
    }));
}

#[test]
fn test_negative_offset_row_rejected() {
    let (_dir, store, root) = setup();
    let conn = raw_catalog(&root);
    let id = archive_id(&conn, "a");
    let inserted = conn.execute(
        "INSERT INTO chunk (archive_id, digest, offset, length) VALUES (?1, ?2, -1, 5)",
        params![id, Digest::of(b"HELLO")],
    );
    assert!(inserted.is_err());
    assert!(store.fsck().unwrap().is_clean());
}

/// Serves `data`, then fails every read.
struct FailsAtEnd<'a>(&'a [u8]);

impl Read for FailsAtEnd<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.0.is_empty() {
            return Err(io::Error::other("cable pulled"));
        }
        let n = self.0.len().min(buf.len());
        buf[..n].copy_from_slice(&self.0[..n]);
        self.0 = &self.0[n..];
        Ok(n)
    }
}

#[test]
fn test_interrupted_store_leaves_only_orphans() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("store");
    let config = ChunkConfig::new(4, 4).unwrap().with_min_size(5);
    let mut store = ArchiveStore::create(&root, config).unwrap();

    let err = store
        .store("a", FailsAtEnd(b"HELLOHELLOXXXXX"))
        .unwrap_err();
    assert!(matches!(err, ArchiveError::Chunker(_)));
    assert!(store.list().unwrap().is_empty());
    assert_eq!(store.catalog().archive_id("a").unwrap(), None);
    assert!(blob_path(&root, b"HELLO").is_file());

    let found = findings(&store);
    assert!(found.contains(&Finding::OrphanBlob {
        digest: Digest::of(b"HELLO"),
    }));
    assert!(
        found
            .iter()
            .all(|f| matches!(f, Finding::OrphanBlob { .. }))
    );

    // Reopening sees the same state.
    drop(store);
    let store = ArchiveStore::open(&root).unwrap();
    assert!(store.list().unwrap().is_empty());
    assert_eq!(findings(&store).len(), found.len());
}

#[test]
fn test_unfinished_archive() {
    let (_dir, store, root) = setup();
    raw_catalog(&root)
        .execute("INSERT INTO archive (name) VALUES ('partial')", [])
        .unwrap();

    assert_eq!(
        findings(&store),
        vec![Finding::UnfinishedArchive {
            name: "partial".into()
        }]
    );
    assert!(!store.list().unwrap().contains(&"partial".to_string()));
}

#[test]
fn test_unfinished_archive_can_be_deleted() {
    let (_dir, mut store, root) = setup();
    raw_catalog(&root)
        .execute("INSERT INTO archive (name) VALUES ('partial')", [])
        .unwrap();

    store.delete("partial").unwrap();
    assert!(store.fsck().unwrap().is_clean());
}

#[test]
fn test_finding_lines() {
    let (_dir, store, root) = setup();
    let stray = Digest::of(b"stray");
    fs::write(root.join("objects").join(stray.to_hex()), b"stray").unwrap();

    let report = store.fsck().unwrap();
    assert_eq!(report.to_string(), format!("unknown object {stray}\n"));
}
