//! Chunks a file and prints every boundary.
//!
//! Run with:
//!     cargo run --example chunk_file -- <path>

use std::fs::File;

use chunkar::{ChunkConfig, Chunker, ReadAhead};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).ok_or("usage: chunk_file <path>")?;

    let reader = ReadAhead::new(File::open(&path)?)?;
    let chunker = Chunker::new(ChunkConfig::default());

    let mut count = 0usize;
    let mut total = 0u64;
    for chunk in chunker.chunk(reader) {
        let chunk = chunk?;
        let (start, len, digest) = (chunk.start(), chunk.len(), chunk.digest());
        println!("{start:>12} {len:>8} {digest}");
        count += 1;
        total += chunk.len() as u64;
    }

    println!("\n{path}: {count} chunks, {total} bytes");
    if count > 0 {
        println!("average chunk size: {} bytes", total / count as u64);
    }
    Ok(())
}
