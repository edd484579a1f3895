//! Thread-local pool of read buffers.

use std::cell::RefCell;

/// Size of each pooled read buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024; // 64 KiB

/// Maximum number of buffers to keep per thread.
pub const MAX_POOL_SIZE: usize = 4;

/// A reusable, fixed-size read buffer.
///
/// The buffer is always `DEFAULT_BUFFER_SIZE` bytes long; readers fill a
/// prefix of it and the caller copies out what was read.
pub struct Buffer {
    data: Vec<u8>,
}

impl Buffer {
    /// Takes a buffer from the thread-local pool or allocates a new one.
    pub fn take() -> Self {
        THREAD_BUFFER_POOL.with(|pool| {
            let data = pool
                .borrow_mut()
                .pop()
                .unwrap_or_else(|| vec![0u8; DEFAULT_BUFFER_SIZE]);
            Self { data }
        })
    }

    /// Returns the whole buffer for a reader to fill.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Returns the first `len` bytes.
    pub fn filled(&self, len: usize) -> &[u8] {
        &self.data[..len.min(self.data.len())]
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if self.data.len() != DEFAULT_BUFFER_SIZE {
            return;
        }
        THREAD_BUFFER_POOL.with(|pool| {
            let mut pool = pool.borrow_mut();
            if pool.len() < MAX_POOL_SIZE {
                pool.push(std::mem::take(&mut self.data));
            }
        });
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::take()
    }
}

thread_local! {
    static THREAD_BUFFER_POOL: RefCell<Vec<Vec<u8>>> = const { RefCell::new(Vec::new()) };
}
