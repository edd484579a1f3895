//! Internal buffer management.
//!
//! Reads from a [`std::io::Read`] source go through a thread-local pool of
//! fixed-size buffers so that chunking many streams on one thread does not
//! reallocate the read buffer each time. It is an implementation detail and
//! not part of the public API.

mod pool;

pub(crate) use pool::Buffer;
