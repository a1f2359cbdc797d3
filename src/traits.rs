// In: src/traits.rs

//! This module defines the crate-wide behavioral traits: the surface a
//! storage-engine registry programs against, and the allocator capability
//! decompression draws its output buffer from.

use crate::error::AccelflateError;

/// The registration surface a storage engine binds a codec under.
pub trait Compressor {
    /// Fixed registry name of this codec.
    fn name(&self) -> &'static str;

    /// Whether the codec accepts preset dictionaries.
    fn dictionary_supported(&self) -> bool;

    /// Worker-thread hint advertised to the storage engine.
    fn parallel_threads(&self) -> u32;

    /// The configured numeric compression level.
    fn level(&self) -> i32;

    /// Compresses `input` into `output` as one framed block.
    ///
    /// # Errors
    ///
    /// Will return `Err` when the backend reports a failure; `output`'s final
    /// content is unspecified in that case.
    fn compress(&self, input: &[u8], output: &mut Vec<u8>) -> Result<(), AccelflateError>;

    /// Decompresses one framed block, returning the restored bytes.
    ///
    /// # Errors
    ///
    /// Will return `Err` when the frame is malformed, allocation fails, or
    /// the backend reports a failure.
    fn decompress(&self, framed: &[u8]) -> Result<Vec<u8>, AccelflateError>;
}

/// Marker returned when an allocator cannot satisfy a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocFailed;

/// Allocator capability for decompression output buffers.
///
/// `allocate` returns a zero-initialized buffer of exactly `len` bytes.
/// Implementations that panic on exhaustion are tolerated: the codec
/// collapses a panic into the same failure as `Err(AllocFailed)` at the call
/// boundary.
pub trait BlockAllocator {
    fn allocate(&self, len: usize) -> Result<Vec<u8>, AllocFailed>;
}

/// Global-allocator-backed implementation used by
/// [`BlockCodec::decompress`](crate::BlockCodec::decompress).
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAllocator;

impl BlockAllocator for DefaultAllocator {
    fn allocate(&self, len: usize) -> Result<Vec<u8>, AllocFailed> {
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(len).map_err(|_| AllocFailed)?;
        buffer.resize(len, 0);
        Ok(buffer)
    }
}
