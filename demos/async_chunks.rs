//! Chunks a file from async code.
//!
//! Run with:
//!     cargo run --example async_chunks --features async-io -- <path>

use chunkar::{ChunkConfig, chunk_async};
use futures_util::StreamExt;
use tokio_util::compat::TokioAsyncReadCompatExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).ok_or("usage: async_chunks <path>")?;

    let file = tokio::fs::File::open(&path).await?;
    let mut stream = std::pin::pin!(chunk_async(file.compat(), ChunkConfig::default()));

    let mut count = 0usize;
    let mut total = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        count += 1;
        total += chunk.len() as u64;
    }

    println!("{path}: {count} chunks, {total} bytes");
    Ok(())
}
