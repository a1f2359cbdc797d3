//! The backend engine contract.
//!
//! The codec engine treats the compression engine as an opaque collaborator
//! behind three calls: query the scratch size a context needs, initialize a
//! context over freshly allocated scratch, and execute a job against that
//! context. An engine may drive a dedicated accelerator, a software
//! emulation, or pick between them; the codec never inspects engine state
//! beyond the job fields documented here.
//!
//! The crate ships one implementation, [`deflate::DeflateEngine`], and keeps
//! the seam open for accelerator bindings and for test doubles.

use std::any::Any;

use crate::config::{CompressionMode, ExecutionPath};

pub mod deflate;
pub mod pool;

pub use deflate::DeflateEngine;

/// Raw engine status code, preserved verbatim in
/// [`AccelflateError::Backend`](crate::error::AccelflateError::Backend).
pub type StatusCode = u32;

/// The coarse level scale backends understand: their own default trade-off,
/// or their strongest effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineLevel {
    Default,
    High,
}

/// Which operation a context is initialized for. Contexts are
/// operation-specific: a compression context cannot run decompression jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Compress,
    Decompress,
}

/// Outcome of a single [`Engine::execute`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    /// The job ran to completion and `bytes_written` bytes landed in the
    /// output slice.
    Complete { bytes_written: usize },
    /// The engine's submission queue refused the job. The context is
    /// unchanged; the caller resubmits immediately.
    Busy,
    /// The engine failed with a backend-specific status code.
    Fail(StatusCode),
}

/// One compression or decompression job.
pub struct Job<'a> {
    pub op: OpKind,
    pub input: &'a [u8],
    pub output: &'a mut [u8],
    pub level: EngineLevel,
    pub mode: CompressionMode,
    /// Re-expand and compare after compressing before reporting success.
    pub verify: bool,
    /// This layer frames blocks itself and never embeds engine checksums.
    pub omit_checksums: bool,
}

impl<'a> Job<'a> {
    pub fn compress(
        input: &'a [u8],
        output: &'a mut [u8],
        level: EngineLevel,
        mode: CompressionMode,
        verify: bool,
    ) -> Self {
        Self {
            op: OpKind::Compress,
            input,
            output,
            level,
            mode,
            verify,
            omit_checksums: true,
        }
    }

    pub fn decompress(input: &'a [u8], output: &'a mut [u8]) -> Self {
        Self {
            op: OpKind::Decompress,
            input,
            output,
            level: EngineLevel::Default,
            mode: CompressionMode::default(),
            verify: false,
            omit_checksums: true,
        }
    }
}

/// Engine-private per-(thread, path) state. Created through
/// [`Engine::init_context`] and only ever handed back to the engine that
/// initialized it; the pool in [`pool`] enforces both properties.
pub trait EngineContext: Any + Send {
    /// Downcast support for engine implementations.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The call contract every backend engine implements.
pub trait Engine: Send + Sync {
    /// Scratch bytes one execution context on `path` requires.
    fn context_size(&self, path: ExecutionPath) -> Result<usize, StatusCode>;

    /// Builds an execution context for (`path`, `kind`) over `scratch`, which
    /// the caller allocated to the size reported by
    /// [`Engine::context_size`].
    fn init_context(
        &self,
        path: ExecutionPath,
        kind: OpKind,
        scratch: Vec<u8>,
    ) -> Result<Box<dyn EngineContext>, StatusCode>;

    /// Runs one job to completion, or reports a busy submission queue.
    fn execute(&self, ctx: &mut dyn EngineContext, job: &mut Job<'_>) -> ExecStatus;
}
