//! Content-addressed blob storage.
//!
//! A blob is the bytes of one unique chunk, keyed by their digest. The store
//! holds each blob once no matter how many chunk rows reference it; deciding
//! when a blob is dead is the catalog's job, not the store's.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::{debug, trace};

use crate::error::BlobError;
use crate::hash::Digest;
use crate::util::fsync_dir;

/// Storage for chunk bytes addressed by digest.
///
/// Implementations never verify that `data` hashes to `digest`; callers
/// compute the digest and the consistency checker audits it later.
pub trait BlobStore: Send + Sync {
    /// Stores `data` under `digest` unless a blob with that digest exists.
    ///
    /// Returns `true` if the blob was written by this call. Safe to call
    /// concurrently for the same digest.
    fn put(&self, digest: &Digest, data: &[u8]) -> Result<bool, BlobError>;

    /// Returns the blob stored under `digest`.
    ///
    /// # Errors
    ///
    /// [`BlobError::NotFound`] if no such blob is stored.
    fn get(&self, digest: &Digest) -> Result<Bytes, BlobError>;

    /// Returns whether a blob is stored under `digest`.
    fn exists(&self, digest: &Digest) -> Result<bool, BlobError>;

    /// Removes the blob stored under `digest`. Removing an absent blob succeeds.
    fn delete(&self, digest: &Digest) -> Result<(), BlobError>;

    /// Lists the digests of all stored blobs, in ascending order.
    fn list_digests(&self) -> Result<Vec<Digest>, BlobError>;
}

/// Blob store backed by a directory with one file per blob.
///
/// Blobs live at `<root>/objects/<hex digest>`. Writes go to a temporary file
/// under `<root>/tmp`, are synced, and are then renamed into place, so a
/// blob file is either absent or complete.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    objects: PathBuf,
    tmp: PathBuf,
}

impl FsBlobStore {
    /// Opens the blob directories under `root`, creating them if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, BlobError> {
        let root = root.as_ref();
        let store = Self {
            objects: root.join("objects"),
            tmp: root.join("tmp"),
        };
        fs::create_dir_all(&store.objects)?;
        fs::create_dir_all(&store.tmp)?;
        Ok(store)
    }

    /// Returns the file a blob is (or would be) stored in.
    pub fn object_path(&self, digest: &Digest) -> PathBuf {
        self.objects.join(digest.to_hex())
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, digest: &Digest, data: &[u8]) -> Result<bool, BlobError> {
        let dest = self.object_path(digest);
        if dest.try_exists()? {
            trace!(%digest, "blob already present");
            return Ok(false);
        }

        let mut file = NamedTempFile::new_in(&self.tmp)?;
        file.write_all(data)?;
        file.as_file().sync_all()?;
        // A concurrent writer of the same digest renames identical bytes.
        file.persist(&dest).map_err(|e| e.error)?;
        fsync_dir(&self.objects)?;

        debug!(%digest, len = data.len(), "stored blob");
        Ok(true)
    }

    fn get(&self, digest: &Digest) -> Result<Bytes, BlobError> {
        match fs::read(self.object_path(digest)) {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BlobError::NotFound(*digest)),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, digest: &Digest) -> Result<bool, BlobError> {
        Ok(self.object_path(digest).try_exists()?)
    }

    fn delete(&self, digest: &Digest) -> Result<(), BlobError> {
        match fs::remove_file(self.object_path(digest)) {
            Ok(()) => {
                debug!(%digest, "deleted blob");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list_digests(&self) -> Result<Vec<Digest>, BlobError> {
        let mut digests = Vec::new();
        for entry in fs::read_dir(&self.objects)? {
            let entry = entry?;
            // Names that are not canonical digests are not blobs.
            if let Some(digest) = entry.file_name().to_str().and_then(Digest::from_hex) {
                digests.push(digest);
            }
        }
        digests.sort_unstable();
        Ok(digests)
    }
}

/// In-memory blob store, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<BTreeMap<Digest, Bytes>>,
}

impl MemoryBlobStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if no blobs are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, digest: &Digest, data: &[u8]) -> Result<bool, BlobError> {
        let mut blobs = self.blobs.write().unwrap_or_else(PoisonError::into_inner);
        if blobs.contains_key(digest) {
            return Ok(false);
        }
        blobs.insert(*digest, Bytes::copy_from_slice(data));
        Ok(true)
    }

    fn get(&self, digest: &Digest) -> Result<Bytes, BlobError> {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(digest)
            .cloned()
            .ok_or(BlobError::NotFound(*digest))
    }

    fn exists(&self, digest: &Digest) -> Result<bool, BlobError> {
        Ok(self
            .blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(digest))
    }

    fn delete(&self, digest: &Digest) -> Result<(), BlobError> {
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(digest);
        Ok(())
    }

    fn list_digests(&self) -> Result<Vec<Digest>, BlobError> {
        Ok(self
            .blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn BlobStore) {
        let digest = Digest::of(b"HELLO");

        assert!(!store.exists(&digest).unwrap());
        assert!(matches!(store.get(&digest), Err(BlobError::NotFound(d)) if d == digest));

        assert!(store.put(&digest, b"HELLO").unwrap());
        assert!(!store.put(&digest, b"HELLO").unwrap());
        assert!(store.exists(&digest).unwrap());
        assert_eq!(store.get(&digest).unwrap(), Bytes::from_static(b"HELLO"));
        assert_eq!(store.list_digests().unwrap(), vec![digest]);

        store.delete(&digest).unwrap();
        store.delete(&digest).unwrap();
        assert!(!store.exists(&digest).unwrap());
        assert!(store.list_digests().unwrap().is_empty());
    }

    #[test]
    fn test_fs_store_contract() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        exercise(&store);
    }

    #[test]
    fn test_memory_store_contract() {
        let store = MemoryBlobStore::new();
        exercise(&store);
        assert!(store.is_empty());
    }

    #[test]
    fn test_fs_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        let digest = Digest::of(b"abc");
        store.put(&digest, b"abc").unwrap();

        let path = dir.path().join("objects").join(digest.to_hex());
        assert_eq!(store.object_path(&digest), path);
        assert_eq!(fs::read(path).unwrap(), b"abc");
        // Temporary files are renamed away.
        assert_eq!(fs::read_dir(dir.path().join("tmp")).unwrap().count(), 0);
    }

    #[test]
    fn test_list_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        let a = Digest::of(b"a");
        let b = Digest::of(b"b");
        store.put(&a, b"a").unwrap();
        store.put(&b, b"b").unwrap();
        fs::write(dir.path().join("objects").join("README"), b"x").unwrap();
        fs::write(
            dir.path().join("objects").join(a.to_hex().to_uppercase()),
            b"x",
        )
        .unwrap();

        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(store.list_digests().unwrap(), expected);
    }

    #[test]
    fn test_concurrent_put_same_digest() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(FsBlobStore::open(dir.path()).unwrap());
        let digest = Digest::of(b"shared");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.put(&digest, b"shared").unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get(&digest).unwrap(), Bytes::from_static(b"shared"));
        assert_eq!(store.list_digests().unwrap(), vec![digest]);
    }
}
