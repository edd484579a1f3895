//! Stores two overlapping members, shows the deduplication, and checks the
//! store.
//!
//! Run with:
//!     RUST_LOG=chunkar=debug cargo run --example archive_roundtrip

use std::io::Cursor;

use chunkar::{ArchiveStore, ChunkConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dir = tempfile::tempdir()?;
    let config = ChunkConfig::new(32, 12)?.with_min_size(1024);
    let mut store = ArchiveStore::create(dir.path().join("store"), config)?;

    // Two members that share everything but a short insertion.
    let mut state = 0x9e37_79b9u32;
    let first: Vec<u8> = (0..1_000_000)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect();
    let mut second = first.clone();
    second.splice(500_000..500_000, b"a few inserted bytes".iter().copied());

    for (name, data) in [("first", &first), ("second", &second)] {
        let summary = store.store(name, Cursor::new(data))?;
        println!(
            "stored {name}: {} bytes, {} chunks, {} new blobs",
            summary.archive.length, summary.chunks, summary.new_blobs
        );
    }

    let mut restored = Vec::new();
    let record = store.load("second", &mut restored)?;
    assert_eq!(restored, second);
    println!(
        "restored {} ({} bytes, {})",
        record.name, record.length, record.digest
    );

    store.delete("first")?;
    println!("remaining: {:?}", store.list()?);

    let report = store.fsck()?;
    if report.is_clean() {
        println!("fsck: clean ({} blobs checked)", report.blobs_checked);
    } else {
        print!("{report}");
    }
    Ok(())
}
