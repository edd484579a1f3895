//! On-disk store descriptor.
//!
//! A store directory identifies itself with three small files under
//! `format/`: the store kind, the layout version, and the chunking
//! parameters every member of the store is split with.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::config::ChunkConfig;
use crate::error::ArchiveError;

/// Kind written to `format/name`.
pub const STORE_NAME: &str = "chunkar";

/// Layout version written to `format/version`.
pub const STORE_VERSION: u32 = 1;

const FORMAT_DIR: &str = "format";

/// Returns whether `root` already carries a store descriptor.
pub(crate) fn exists(root: &Path) -> bool {
    root.join(FORMAT_DIR).join("name").exists()
}

/// Writes the descriptor for a new store.
pub(crate) fn write(root: &Path, config: &ChunkConfig) -> Result<(), ArchiveError> {
    let dir = root.join(FORMAT_DIR);
    fs::create_dir_all(&dir)?;
    fs::write(dir.join("name"), format!("{STORE_NAME}\n"))?;
    fs::write(dir.join("version"), format!("{STORE_VERSION}\n"))?;
    fs::write(dir.join("chunking"), serde_json::to_vec_pretty(config)?)?;
    Ok(())
}

/// Reads and checks the descriptor, returning the store's chunking parameters.
pub(crate) fn read(root: &Path) -> Result<ChunkConfig, ArchiveError> {
    let not_a_store = |reason: String| ArchiveError::NotAStore {
        path: root.to_path_buf(),
        reason,
    };
    let dir = root.join(FORMAT_DIR);

    let name = read_small_file(&dir.join("name"))?
        .ok_or_else(|| not_a_store("missing format/name".into()))?;
    if name.trim() != STORE_NAME {
        return Err(not_a_store(format!("store kind is {:?}", name.trim())));
    }

    let version = read_small_file(&dir.join("version"))?
        .ok_or_else(|| not_a_store("missing format/version".into()))?;
    if version.trim() != STORE_VERSION.to_string() {
        return Err(not_a_store(format!(
            "uses version {} but only version {STORE_VERSION} is supported",
            version.trim()
        )));
    }

    let chunking = read_small_file(&dir.join("chunking"))?
        .ok_or_else(|| not_a_store("missing format/chunking".into()))?;
    let config: ChunkConfig = serde_json::from_str(&chunking)
        .map_err(|e| not_a_store(format!("unreadable chunking parameters: {e}")))?;
    config
        .validate()
        .map_err(|e| not_a_store(format!("invalid chunking parameters: {e}")))?;

    Ok(config)
}

fn read_small_file(path: &Path) -> Result<Option<String>, ArchiveError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
