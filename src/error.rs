// In: src/error.rs

//! This module defines the single, unified error type for the entire accelflate
//! library. It uses the `thiserror` crate to provide ergonomic, context-aware
//! error handling.
//!
//! Every failure a compress or decompress call can surface maps onto exactly
//! one of these variants; raw backend status codes are preserved verbatim so
//! callers can reconstruct a full diagnostic message.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AccelflateError {
    /// The length prefix of a framed block is empty, truncated mid-varint,
    /// overflows the framing width, or the input is too large to frame.
    #[error("length framing error: {0}")]
    Framing(String),

    /// An allocation failed, by whichever convention the allocator signals.
    #[error("memory allocation error")]
    OutOfMemory,

    /// The backend engine reported a non-success, non-busy status code.
    #[error("backend status {0}")]
    Backend(u32),

    /// Decompression produced a different number of bytes than the framed
    /// original length promised.
    #[error("size mismatch: expected {expected} bytes, produced {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}
