//! SQLite catalog of archives and their chunk lists.
//!
//! The catalog owns two tables: `archive` (one row per stored member) and
//! `chunk` (one row per chunk of a member, referencing its blob by digest).
//! Blob liveness is never stored; it is the existence of a chunk row with
//! the blob's digest, answered through `chunk_digest_idx`.

use std::path::Path;
use std::time::Duration;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Type, ValueRef};
use rusqlite::{Connection, OptionalExtension, ToSql, Transaction, TransactionBehavior, params};
use tracing::debug;

use crate::hash::Digest;

/// How long a connection waits for another writer's lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS archive (
    id     INTEGER PRIMARY KEY,
    name   TEXT NOT NULL UNIQUE,
    length INTEGER CHECK (length >= 0),
    digest BLOB
);
CREATE TABLE IF NOT EXISTS chunk (
    archive_id INTEGER NOT NULL REFERENCES archive(id),
    digest     BLOB NOT NULL,
    offset     INTEGER NOT NULL CHECK (offset >= 0),
    length     INTEGER NOT NULL CHECK (length > 0),
    UNIQUE (archive_id, offset)
);
CREATE INDEX IF NOT EXISTS chunk_digest_idx ON chunk(digest);
"#;

impl ToSql for Digest {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(&self.as_bytes()[..]))
    }
}

impl FromSql for Digest {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let blob = value.as_blob()?;
        Digest::from_slice(blob).ok_or(FromSqlError::InvalidBlobSize {
            expected_size: Digest::SIZE,
            blob_size: blob.len(),
        })
    }
}

/// A completed archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRecord {
    /// Catalog row id.
    pub id: i64,
    /// Member name, unique within the store.
    pub name: String,
    /// Total length of the member in bytes.
    pub length: u64,
    /// Digest of the whole member.
    pub digest: Digest,
}

/// One chunk of an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRecord {
    /// Digest of the chunk bytes, and the key of its blob.
    pub digest: Digest,
    /// Position of the chunk within the member.
    pub offset: u64,
    /// Length of the chunk in bytes.
    pub length: u64,
}

impl ChunkRecord {
    /// Returns the offset one past the last byte of the chunk.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }
}

/// Recorded length of an archive next to the sum of its chunk lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkTotal {
    /// Member name.
    pub name: String,
    /// Length stored in the archive row.
    pub recorded: u64,
    /// Sum of the archive's chunk lengths.
    pub summed: u64,
}

/// Handle to the SQLite catalog.
#[derive(Debug)]
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    /// Opens (or creates) the catalog database at `path`.
    pub fn open(path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening catalog");
        Self::init(Connection::open(path)?)
    }

    /// Opens a private in-memory catalog.
    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> rusqlite::Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Looks up a completed archive by name.
    pub fn archive(&self, name: &str) -> rusqlite::Result<Option<ArchiveRecord>> {
        self.conn
            .query_row(
                "SELECT id, name, length, digest FROM archive
                 WHERE name = ?1 AND length IS NOT NULL AND digest IS NOT NULL",
                params![name],
                archive_from_row,
            )
            .optional()
    }

    /// Returns the row id of an archive, finished or not.
    pub fn archive_id(&self, name: &str) -> rusqlite::Result<Option<i64>> {
        archive_id(&self.conn, name)
    }

    /// Lists completed archives ordered by name.
    pub fn archives(&self) -> rusqlite::Result<Vec<ArchiveRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, length, digest FROM archive
             WHERE length IS NOT NULL AND digest IS NOT NULL
             ORDER BY name",
        )?;
        let rows = stmt.query_map([], archive_from_row)?;
        rows.collect()
    }

    /// Lists the names of completed archives in ascending order.
    pub fn archive_names(&self) -> rusqlite::Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM archive
             WHERE length IS NOT NULL AND digest IS NOT NULL
             ORDER BY name",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect()
    }

    /// Lists archives whose length or digest was never recorded.
    pub fn unfinished_archives(&self) -> rusqlite::Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM archive
             WHERE length IS NULL OR digest IS NULL
             ORDER BY name",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect()
    }

    /// Returns the chunks of an archive in offset order.
    pub fn chunks(&self, archive_id: i64) -> rusqlite::Result<Vec<ChunkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT digest, offset, length FROM chunk
             WHERE archive_id = ?1
             ORDER BY offset",
        )?;
        let rows = stmt.query_map(params![archive_id], |row| {
            Ok(ChunkRecord {
                digest: row.get(0)?,
                offset: get_u64(row, 1)?,
                length: get_u64(row, 2)?,
            })
        })?;
        rows.collect()
    }

    /// Returns every distinct `(digest, length)` pair referenced by a chunk row.
    pub fn referenced_blobs(&self) -> rusqlite::Result<Vec<(Digest, u64)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT digest, length FROM chunk ORDER BY digest, length")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, get_u64(row, 1)?)))?;
        rows.collect()
    }

    /// Compares each completed archive's recorded length with its chunk lengths.
    pub fn chunk_totals(&self) -> rusqlite::Result<Vec<ChunkTotal>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.name, a.length, COALESCE(SUM(c.length), 0)
             FROM archive a LEFT JOIN chunk c ON c.archive_id = a.id
             WHERE a.length IS NOT NULL
             GROUP BY a.id
             ORDER BY a.name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ChunkTotal {
                name: row.get(0)?,
                recorded: get_u64(row, 1)?,
                summed: get_u64(row, 2)?,
            })
        })?;
        rows.collect()
    }

    /// Returns whether any chunk row references `digest`.
    pub fn is_referenced(&self, digest: &Digest) -> rusqlite::Result<bool> {
        self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM chunk WHERE digest = ?1)",
            params![digest],
            |row| row.get(0),
        )
    }

    /// Starts a write transaction.
    ///
    /// The transaction takes the database write lock immediately. It is
    /// rolled back if dropped without [`CatalogTx::commit`].
    pub fn begin(&mut self) -> rusqlite::Result<CatalogTx<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(CatalogTx { tx })
    }
}

/// An open write transaction on the catalog.
#[derive(Debug)]
pub struct CatalogTx<'c> {
    tx: Transaction<'c>,
}

impl CatalogTx<'_> {
    /// Returns the row id of an archive, finished or not.
    pub fn archive_id(&self, name: &str) -> rusqlite::Result<Option<i64>> {
        archive_id(&self.tx, name)
    }

    /// Inserts an archive row with no length or digest yet.
    pub fn insert_archive(&self, name: &str) -> rusqlite::Result<i64> {
        self.tx
            .execute("INSERT INTO archive (name) VALUES (?1)", params![name])?;
        Ok(self.tx.last_insert_rowid())
    }

    /// Records one chunk of an archive.
    pub fn insert_chunk(
        &self,
        archive_id: i64,
        digest: &Digest,
        offset: u64,
        length: u64,
    ) -> rusqlite::Result<()> {
        self.tx.execute(
            "INSERT INTO chunk (archive_id, digest, offset, length) VALUES (?1, ?2, ?3, ?4)",
            params![archive_id, digest, offset as i64, length as i64],
        )?;
        Ok(())
    }

    /// Records the final length and digest of an archive.
    pub fn finalize_archive(
        &self,
        archive_id: i64,
        length: u64,
        digest: &Digest,
    ) -> rusqlite::Result<()> {
        self.tx.execute(
            "UPDATE archive SET length = ?2, digest = ?3 WHERE id = ?1",
            params![archive_id, length as i64, digest],
        )?;
        Ok(())
    }

    /// Returns the distinct chunk digests of an archive.
    pub fn archive_digests(&self, archive_id: i64) -> rusqlite::Result<Vec<Digest>> {
        let mut stmt = self.tx.prepare(
            "SELECT DISTINCT digest FROM chunk WHERE archive_id = ?1 ORDER BY digest",
        )?;
        let rows = stmt.query_map(params![archive_id], |row| row.get(0))?;
        rows.collect()
    }

    /// Returns whether a chunk row of any other archive references `digest`.
    pub fn referenced_elsewhere(
        &self,
        digest: &Digest,
        archive_id: i64,
    ) -> rusqlite::Result<bool> {
        self.tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM chunk WHERE digest = ?1 AND archive_id != ?2)",
            params![digest, archive_id],
            |row| row.get(0),
        )
    }

    /// Deletes an archive row together with its chunk rows.
    pub fn delete_archive(&self, archive_id: i64) -> rusqlite::Result<()> {
        self.tx.execute(
            "DELETE FROM chunk WHERE archive_id = ?1",
            params![archive_id],
        )?;
        self.tx
            .execute("DELETE FROM archive WHERE id = ?1", params![archive_id])?;
        Ok(())
    }

    /// Commits the transaction.
    pub fn commit(self) -> rusqlite::Result<()> {
        self.tx.commit()
    }
}

fn archive_id(conn: &Connection, name: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM archive WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
    .optional()
}

fn archive_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ArchiveRecord> {
    Ok(ArchiveRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        length: get_u64(row, 2)?,
        digest: row.get(3)?,
    })
}

/// Reads an integer column that the schema keeps non-negative.
fn get_u64(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(idx)?;
    u64::try_from(value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}
