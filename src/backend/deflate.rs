//! The bundled software backend: an emulation of the engine contract on top
//! of raw-DEFLATE state from the `flate2` crate.
//!
//! The `software` path always initializes; `auto` resolves to the emulation
//! (this build carries no accelerator bindings); `hardware` fails context
//! initialization with [`STS_NO_ACCELERATOR`]. Streams are raw DEFLATE with
//! no wrapper and no checksums, matching the job contract's checksum
//! omission. The fixed/dynamic Huffman hint travels in the job but the
//! emulation lets the underlying deflate implementation choose per-block
//! encodings; the hint binds accelerated engines.

use std::any::Any;

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::backend::{Engine, EngineContext, EngineLevel, ExecStatus, Job, OpKind, StatusCode};
use crate::config::ExecutionPath;

//==================================================================================
// 1. Status Codes
//==================================================================================

/// No accelerator is present on this host; the hardware path cannot
/// initialize.
pub const STS_NO_ACCELERATOR: StatusCode = 7;
/// The output buffer filled before the stream could be finished.
pub const STS_OUTPUT_FULL: StatusCode = 40;
/// The input ended before the compressed stream did.
pub const STS_INPUT_TRUNCATED: StatusCode = 41;
/// The deflate state machine rejected the stream.
pub const STS_STREAM_ERROR: StatusCode = 42;
/// Post-compression verification decoded different bytes than the input.
pub const STS_VERIFY_FAILED: StatusCode = 43;
/// The context handed in was not produced by this engine or is of the wrong
/// operation kind.
pub const STS_BAD_CONTEXT: StatusCode = 44;

//==================================================================================
// 2. Execution Context
//==================================================================================

struct DeflateContext {
    kind: OpKind,
    /// Compression state and the level it was built with; rebuilt when a job
    /// asks for a different level.
    deflate: Option<(Compress, EngineLevel)>,
    /// Decompression state. Present from initialization on decompression
    /// contexts, created on first use on compression contexts that verify.
    inflate: Option<Decompress>,
    /// Engine-owned workspace; serves as the verify staging buffer.
    scratch: Vec<u8>,
}

impl EngineContext for DeflateContext {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn compression_of(level: EngineLevel) -> Compression {
    match level {
        EngineLevel::Default => Compression::default(),
        EngineLevel::High => Compression::best(),
    }
}

//==================================================================================
// 3. The Engine
//==================================================================================

/// Software emulation of the backend engine contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeflateEngine;

impl DeflateEngine {
    pub fn new() -> Self {
        Self
    }

    fn resolve(path: ExecutionPath) -> Result<(), StatusCode> {
        match path {
            ExecutionPath::Hardware => Err(STS_NO_ACCELERATOR),
            ExecutionPath::Auto | ExecutionPath::Software => Ok(()),
        }
    }
}

impl Engine for DeflateEngine {
    fn context_size(&self, path: ExecutionPath) -> Result<usize, StatusCode> {
        Self::resolve(path)?;
        Ok(std::mem::size_of::<DeflateContext>())
    }

    fn init_context(
        &self,
        path: ExecutionPath,
        kind: OpKind,
        scratch: Vec<u8>,
    ) -> Result<Box<dyn EngineContext>, StatusCode> {
        Self::resolve(path)?;
        let ctx = match kind {
            OpKind::Compress => DeflateContext {
                kind,
                deflate: Some((
                    Compress::new(compression_of(EngineLevel::Default), false),
                    EngineLevel::Default,
                )),
                inflate: None,
                scratch,
            },
            OpKind::Decompress => DeflateContext {
                kind,
                deflate: None,
                inflate: Some(Decompress::new(false)),
                scratch,
            },
        };
        log::trace!("initialized {kind:?} deflate context for path {path:?}");
        Ok(Box::new(ctx))
    }

    fn execute(&self, ctx: &mut dyn EngineContext, job: &mut Job<'_>) -> ExecStatus {
        let Some(ctx) = ctx.as_any_mut().downcast_mut::<DeflateContext>() else {
            return ExecStatus::Fail(STS_BAD_CONTEXT);
        };
        if ctx.kind != job.op {
            return ExecStatus::Fail(STS_BAD_CONTEXT);
        }
        match ctx.kind {
            OpKind::Compress => compress_job(ctx, job),
            OpKind::Decompress => decompress_job(ctx, job),
        }
    }
}

//==================================================================================
// 4. Job Drivers
//==================================================================================

fn compress_job(ctx: &mut DeflateContext, job: &mut Job<'_>) -> ExecStatus {
    let rebuild = !matches!(&ctx.deflate, Some((_, level)) if *level == job.level);
    if rebuild {
        ctx.deflate = Some((Compress::new(compression_of(job.level), false), job.level));
    }
    let Some((deflate, _)) = ctx.deflate.as_mut() else {
        return ExecStatus::Fail(STS_BAD_CONTEXT);
    };

    let written = match deflate_into(deflate, job.input, job.output) {
        Ok(written) => written,
        Err(status) => return ExecStatus::Fail(status),
    };

    if job.verify {
        let inflate = ctx.inflate.get_or_insert_with(|| Decompress::new(false));
        ctx.scratch.clear();
        ctx.scratch.resize(job.input.len(), 0);
        let expanded = match inflate_into(inflate, &job.output[..written], &mut ctx.scratch) {
            Ok(expanded) => expanded,
            Err(status) => return ExecStatus::Fail(status),
        };
        if expanded != job.input.len() || ctx.scratch[..expanded] != *job.input {
            return ExecStatus::Fail(STS_VERIFY_FAILED);
        }
    }

    ExecStatus::Complete {
        bytes_written: written,
    }
}

fn decompress_job(ctx: &mut DeflateContext, job: &mut Job<'_>) -> ExecStatus {
    let Some(inflate) = ctx.inflate.as_mut() else {
        return ExecStatus::Fail(STS_BAD_CONTEXT);
    };
    match inflate_into(inflate, job.input, job.output) {
        Ok(written) => ExecStatus::Complete {
            bytes_written: written,
        },
        Err(status) => ExecStatus::Fail(status),
    }
}

/// Drives one whole-buffer deflate stream into `output`, returning the bytes
/// produced.
fn deflate_into(
    deflate: &mut Compress,
    input: &[u8],
    output: &mut [u8],
) -> Result<usize, StatusCode> {
    deflate.reset();
    let mut consumed = 0usize;
    let mut written = 0usize;
    loop {
        let before_in = deflate.total_in();
        let before_out = deflate.total_out();
        let status = deflate
            .compress(&input[consumed..], &mut output[written..], FlushCompress::Finish)
            .map_err(|_| STS_STREAM_ERROR)?;
        consumed += (deflate.total_in() - before_in) as usize;
        written += (deflate.total_out() - before_out) as usize;
        match status {
            Status::StreamEnd => return Ok(written),
            Status::Ok | Status::BufError => {
                // The input is fully resident, so a stall can only mean the
                // output ran out of room to finish the stream.
                if deflate.total_in() == before_in && deflate.total_out() == before_out {
                    return Err(STS_OUTPUT_FULL);
                }
            }
        }
    }
}

/// Drives one whole-buffer inflate stream into `output`, returning the bytes
/// produced.
fn inflate_into(
    inflate: &mut Decompress,
    input: &[u8],
    output: &mut [u8],
) -> Result<usize, StatusCode> {
    inflate.reset(false);
    let mut consumed = 0usize;
    let mut written = 0usize;
    loop {
        let before_in = inflate.total_in();
        let before_out = inflate.total_out();
        let status = inflate
            .decompress(
                &input[consumed..],
                &mut output[written..],
                FlushDecompress::Finish,
            )
            .map_err(|_| STS_STREAM_ERROR)?;
        consumed += (inflate.total_in() - before_in) as usize;
        written += (inflate.total_out() - before_out) as usize;
        match status {
            Status::StreamEnd => return Ok(written),
            Status::Ok | Status::BufError => {
                if inflate.total_in() == before_in && inflate.total_out() == before_out {
                    return Err(if consumed == input.len() && written < output.len() {
                        STS_INPUT_TRUNCATED
                    } else {
                        STS_OUTPUT_FULL
                    });
                }
            }
        }
    }
}
