//! Background read-ahead for blocking readers.
//!
//! [`ReadAhead`] moves reads from a slow source (a pipe, a network mount) to a
//! helper thread so that chunking the current block overlaps with reading the
//! next one. At most one block is queued while another is being consumed, so
//! memory use stays at two blocks.
//!
//! Read-ahead never changes chunk boundaries: the chunker sees exactly the
//! same byte sequence, only split differently across reads.

use std::io::{self, ErrorKind, Read};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;

use tracing::{debug, warn};

/// Default size of each prefetched block (8 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = 8 * 1024 * 1024;

/// A [`Read`] adapter that fills blocks on a background thread.
///
/// # Example
///
/// ```
/// use std::io::{Cursor, Read};
/// use chunkar::ReadAhead;
///
/// let mut reader = ReadAhead::with_block_size(Cursor::new(b"hello".to_vec()), 2)?;
/// let mut out = String::new();
/// reader.read_to_string(&mut out)?;
/// assert_eq!(out, "hello");
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct ReadAhead {
    blocks: Receiver<io::Result<Vec<u8>>>,
    current: Vec<u8>,
    pos: usize,
    done: bool,
}

impl ReadAhead {
    /// Starts prefetching `reader` in blocks of [`DEFAULT_BLOCK_SIZE`].
    pub fn new<R: Read + Send + 'static>(reader: R) -> io::Result<Self> {
        Self::with_block_size(reader, DEFAULT_BLOCK_SIZE)
    }

    /// Starts prefetching `reader` in blocks of `block_size` bytes.
    ///
    /// # Errors
    ///
    /// Fails if the helper thread cannot be spawned or `block_size` is zero.
    pub fn with_block_size<R: Read + Send + 'static>(
        reader: R,
        block_size: usize,
    ) -> io::Result<Self> {
        if block_size == 0 {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                "read-ahead block size must be non-zero",
            ));
        }

        let (tx, rx) = mpsc::sync_channel(1);
        thread::Builder::new()
            .name("chunkar-readahead".into())
            .spawn(move || fill_blocks(reader, block_size, tx))?;
        debug!(block_size, "read-ahead started");

        Ok(Self {
            blocks: rx,
            current: Vec::new(),
            pos: 0,
            done: false,
        })
    }
}

/// Reads full blocks until end of input, an error, or the consumer goes away.
fn fill_blocks<R: Read>(mut reader: R, block_size: usize, tx: SyncSender<io::Result<Vec<u8>>>) {
    loop {
        let mut block = vec![0u8; block_size];
        let mut filled = 0;
        while filled < block_size {
            match reader.read(&mut block[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "read-ahead source failed");
                    // Deliver what was read before the error, then the error.
                    if filled > 0 {
                        block.truncate(filled);
                        if tx.send(Ok(block)).is_err() {
                            return;
                        }
                    }
                    let _ = tx.send(Err(e));
                    return;
                }
            }
        }

        if filled == 0 {
            debug!("read-ahead reached end of input");
            return;
        }
        block.truncate(filled);
        if tx.send(Ok(block)).is_err() {
            // Consumer dropped the reader.
            return;
        }
        if filled < block_size {
            return;
        }
    }
}

impl Read for ReadAhead {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.pos == self.current.len() {
            if self.done {
                return Ok(0);
            }
            match self.blocks.recv() {
                Ok(Ok(block)) => {
                    self.current = block;
                    self.pos = 0;
                }
                Ok(Err(e)) => {
                    self.done = true;
                    return Err(e);
                }
                Err(_) => {
                    // Sender hung up: end of input.
                    self.done = true;
                    return Ok(0);
                }
            }
        }

        let n = buf.len().min(self.current.len() - self.pos);
        buf[..n].copy_from_slice(&self.current[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
