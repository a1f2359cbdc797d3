//! The codec engine: orchestration of a single compress or decompress call.
//!
//! Each call frames or unframes the block, sizes the output buffer, borrows
//! the per-thread execution context for the configured path, drives the
//! backend (resubmitting while its queue is busy), and maps backend statuses
//! onto [`AccelflateError`]. Calls block on the caller's thread; parallelism
//! comes from callers using independent threads, each of which gets its own
//! contexts.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::backend::{
    pool, DeflateEngine, Engine, EngineContext, EngineLevel, ExecStatus, Job, OpKind,
};
use crate::config::{AccelflateConfig, DEFAULT_LEVEL};
use crate::error::AccelflateError;
use crate::kernels::varint;
use crate::traits::{BlockAllocator, Compressor, DefaultAllocator};


/// Fixed name this codec registers under.
pub const CODEC_NAME: &str = "accelflate.deflate_block";

/// Largest span one stored sub-block covers when the backend falls back to
/// emitting data near-verbatim, and the fixed header cost of each such block.
const STORED_BLOCK_MAX: usize = 65_535;
const STORED_BLOCK_HEADER: usize = 5;

/// A block codec over a backend engine.
///
/// Cheap to clone-per-use via `Arc`s; all state lives in the shared
/// configuration, the shared engine, and the per-thread context caches.
pub struct BlockCodec {
    config: Arc<AccelflateConfig>,
    engine: Arc<dyn Engine>,
}

impl BlockCodec {
    /// Codec over the bundled software engine.
    pub fn new(config: Arc<AccelflateConfig>) -> Self {
        Self::with_engine(config, Arc::new(DeflateEngine::new()))
    }

    /// Codec over a caller-supplied engine (accelerator bindings, test
    /// doubles).
    pub fn with_engine(config: Arc<AccelflateConfig>, engine: Arc<dyn Engine>) -> Self {
        Self { config, engine }
    }

    /// Compresses `input` into `output` as one framed block:
    /// `[varint original length][compressed payload]`.
    ///
    /// `output` is grown speculatively to the worst-case size and truncated
    /// to the real size on success; callers must not assume a stable length
    /// while the call is in flight, and on failure the final content is
    /// unspecified.
    pub fn compress(&self, input: &[u8], output: &mut Vec<u8>) -> Result<(), AccelflateError> {
        // 1. Frame the original length.
        if input.len() > u32::MAX as usize {
            return Err(AccelflateError::Framing(format!(
                "block of {} bytes exceeds the 32-bit framing limit",
                input.len()
            )));
        }
        output.clear();
        varint::encode_into(input.len() as u32, output)?;
        let header_len = output.len();

        // 2. Worst case: the backend stores incompressible data in sub-blocks
        // of at most STORED_BLOCK_MAX bytes, each behind a fixed header. A
        // capacity overflowing the backend's 32-bit size fields is clamped;
        // if that leaves too little room the backend reports it.
        let n = input.len();
        let stored_blocks = n / STORED_BLOCK_MAX + usize::from(n % STORED_BLOCK_MAX != 0);
        let worst_case = header_len + n + stored_blocks * STORED_BLOCK_HEADER;
        let capacity = worst_case.min(u32::MAX as usize);

        // 3. Make the whole worst case addressable by the backend.
        output.resize(capacity, 0);

        // 4.-6. Run the job on this thread's context for the configured path,
        // resubmitting while the engine queue is busy.
        let path = self.config.execution_path;
        let level = engine_level(self.config.level);
        let mode = self.config.compression_mode;
        let verify = self.config.verify;
        let bytes_written =
            pool::with_context(&self.engine, OpKind::Compress, path, |engine, ctx| {
                let mut job =
                    Job::compress(input, &mut output[header_len..], level, mode, verify);
                execute_with_retry(engine, ctx, &mut job)
            })??;

        // 8. Shrink to what the backend actually produced.
        output.truncate(header_len + bytes_written);
        log::debug!(
            "compress: input size: {} - output size: {}",
            input.len(),
            output.len()
        );
        Ok(())
    }

    /// Decompresses one framed block with the default allocator.
    pub fn decompress(&self, framed: &[u8]) -> Result<Vec<u8>, AccelflateError> {
        self.decompress_with(framed, &DefaultAllocator)
    }

    /// Decompresses one framed block, drawing the output buffer from
    /// `allocator`. On success, ownership of the buffer transfers to the
    /// caller.
    ///
    /// On any failure after allocation — including
    /// [`AccelflateError::SizeMismatch`] — the partially-filled buffer is
    /// freed before the error returns; callers never observe it.
    pub fn decompress_with(
        &self,
        framed: &[u8],
        allocator: &dyn BlockAllocator,
    ) -> Result<Vec<u8>, AccelflateError> {
        // 1. Recover the original size. Nothing has been allocated yet, so a
        // malformed prefix costs nothing.
        let (original_len, header_len) = varint::decode_from::<u32>(framed)?;
        let original_len = original_len as usize;

        // 2. Exact-size output buffer. Allocators may fail by error return or
        // by panicking; both collapse to OutOfMemory here.
        let mut output = panic::catch_unwind(AssertUnwindSafe(|| allocator.allocate(original_len)))
            .map_err(|_| AccelflateError::OutOfMemory)?
            .map_err(|_| AccelflateError::OutOfMemory)?;

        // 3.-5. Run the job on this thread's context for the configured path.
        let path = self.config.execution_path;
        let bytes_written =
            pool::with_context(&self.engine, OpKind::Decompress, path, |engine, ctx| {
                let mut job = Job::decompress(&framed[header_len..], &mut output);
                execute_with_retry(engine, ctx, &mut job)
            })??;

        // 7. A backend can accept a corrupted payload and still come up
        // short; the framed length is authoritative.
        if bytes_written != original_len {
            return Err(AccelflateError::SizeMismatch {
                expected: original_len,
                actual: bytes_written,
            });
        }
        log::debug!(
            "decompress: input size: {} - output size: {}",
            framed.len(),
            bytes_written
        );
        Ok(output)
    }
}

impl Compressor for BlockCodec {
    fn name(&self) -> &'static str {
        CODEC_NAME
    }

    fn dictionary_supported(&self) -> bool {
        false
    }

    fn parallel_threads(&self) -> u32 {
        self.config.parallel_threads
    }

    fn level(&self) -> i32 {
        self.config.level
    }

    fn compress(&self, input: &[u8], output: &mut Vec<u8>) -> Result<(), AccelflateError> {
        BlockCodec::compress(self, input, output)
    }

    fn decompress(&self, framed: &[u8]) -> Result<Vec<u8>, AccelflateError> {
        BlockCodec::decompress(self, framed)
    }
}

/// Maps the configured numeric level onto the coarse backend scale: zero and
/// the storage engine's default sentinel select the backend's default effort,
/// anything else its high effort.
fn engine_level(level: i32) -> EngineLevel {
    if level == 0 || level == DEFAULT_LEVEL {
        EngineLevel::Default
    } else {
        EngineLevel::High
    }
}

/// Drives one job, resubmitting while the engine reports a busy queue. The
/// spin is a hand-off to the hardware submission queue, which is the only
/// party that can resolve it; there is no backoff and no retry cap.
fn execute_with_retry(
    engine: &dyn Engine,
    ctx: &mut dyn EngineContext,
    job: &mut Job<'_>,
) -> Result<usize, AccelflateError> {
    loop {
        match engine.execute(ctx, job) {
            ExecStatus::Complete { bytes_written } => return Ok(bytes_written),
            ExecStatus::Busy => continue,
            ExecStatus::Fail(status) => return Err(AccelflateError::Backend(status)),
        }
    }
}
