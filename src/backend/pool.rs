//! Per-thread execution-context caching.
//!
//! Backend contexts are expensive to initialize and cheap to reuse, so the
//! pool keeps one per (calling thread, execution path, operation kind) and
//! hands it out for the duration of a single job. Two independent caches
//! exist, one for compression contexts and one for decompression contexts,
//! because a context is operation-specific. Every entry is confined to its
//! owning thread for the thread's whole lifetime, so the caches need no
//! locking and have no teardown path.

use std::cell::RefCell;
use std::sync::Arc;

use crate::backend::{Engine, EngineContext, OpKind};
use crate::config::ExecutionPath;
use crate::error::AccelflateError;

/// A cached context together with the identity of the engine instance that
/// initialized it. Contexts are engine-private state; a slot last touched
/// through a different engine instance is rebuilt.
struct Slot {
    engine_id: usize,
    context: Box<dyn EngineContext>,
}

type PathSlots = [Option<Slot>; ExecutionPath::COUNT];

thread_local! {
    static COMPRESS_CONTEXTS: RefCell<PathSlots> = RefCell::new([None, None, None]);
    static DECOMPRESS_CONTEXTS: RefCell<PathSlots> = RefCell::new([None, None, None]);
}

/// Runs `f` with exclusive access to the cached context for (current thread,
/// `path`, `kind`), creating it on first use.
///
/// Creation follows the engine contract: query the scratch size, allocate it
/// fallibly ([`AccelflateError::OutOfMemory`] on failure), then let the
/// engine initialize over it ([`AccelflateError::Backend`] on an engine
/// status failure). Subsequent calls for the same slot reuse the context
/// without reinitialization.
pub fn with_context<R>(
    engine: &Arc<dyn Engine>,
    kind: OpKind,
    path: ExecutionPath,
    f: impl FnOnce(&dyn Engine, &mut dyn EngineContext) -> R,
) -> Result<R, AccelflateError> {
    let cache = match kind {
        OpKind::Compress => &COMPRESS_CONTEXTS,
        OpKind::Decompress => &DECOMPRESS_CONTEXTS,
    };
    cache.with(|cell| {
        let mut slots = cell.borrow_mut();
        let engine_id = Arc::as_ptr(engine) as *const () as usize;
        let slot = match &mut slots[path.index()] {
            Some(slot) if slot.engine_id == engine_id => slot,
            stale => {
                let size = engine.context_size(path).map_err(AccelflateError::Backend)?;
                let mut scratch = Vec::new();
                scratch
                    .try_reserve_exact(size)
                    .map_err(|_| AccelflateError::OutOfMemory)?;
                let context = engine
                    .init_context(path, kind, scratch)
                    .map_err(AccelflateError::Backend)?;
                stale.insert(Slot { engine_id, context })
            }
        };
        Ok(f(engine.as_ref(), slot.context.as_mut()))
    })
}

//==================================================================================
// Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::backend::{ExecStatus, Job, StatusCode};

    struct StubContext;

    impl EngineContext for StubContext {
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    /// Engine double that counts contract calls and can misreport its
    /// context size.
    struct StubEngine {
        reported_size: usize,
        size_calls: AtomicUsize,
        init_calls: AtomicUsize,
    }

    impl StubEngine {
        fn new(reported_size: usize) -> Self {
            Self {
                reported_size,
                size_calls: AtomicUsize::new(0),
                init_calls: AtomicUsize::new(0),
            }
        }
    }

    impl Engine for StubEngine {
        fn context_size(&self, _path: ExecutionPath) -> Result<usize, StatusCode> {
            self.size_calls.fetch_add(1, Ordering::Relaxed);
            Ok(self.reported_size)
        }

        fn init_context(
            &self,
            _path: ExecutionPath,
            _kind: OpKind,
            _scratch: Vec<u8>,
        ) -> Result<Box<dyn EngineContext>, StatusCode> {
            self.init_calls.fetch_add(1, Ordering::Relaxed);
            Ok(Box::new(StubContext))
        }

        fn execute(&self, _ctx: &mut dyn EngineContext, _job: &mut Job<'_>) -> ExecStatus {
            ExecStatus::Complete { bytes_written: 0 }
        }
    }

    #[test]
    fn test_same_slot_initializes_once() {
        let stub = Arc::new(StubEngine::new(64));
        let engine: Arc<dyn Engine> = stub.clone();
        for _ in 0..3 {
            with_context(&engine, OpKind::Compress, ExecutionPath::Software, |_, _| {}).unwrap();
        }
        assert_eq!(stub.init_calls.load(Ordering::Relaxed), 1);
        assert_eq!(stub.size_calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_paths_and_kinds_get_distinct_contexts() {
        let stub = Arc::new(StubEngine::new(64));
        let engine: Arc<dyn Engine> = stub.clone();
        with_context(&engine, OpKind::Compress, ExecutionPath::Software, |_, _| {}).unwrap();
        with_context(&engine, OpKind::Compress, ExecutionPath::Auto, |_, _| {}).unwrap();
        with_context(&engine, OpKind::Decompress, ExecutionPath::Software, |_, _| {}).unwrap();
        assert_eq!(stub.init_calls.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_unsatisfiable_scratch_size_reports_out_of_memory() {
        let stub = Arc::new(StubEngine::new(usize::MAX));
        let engine: Arc<dyn Engine> = stub.clone();
        let result = with_context(&engine, OpKind::Compress, ExecutionPath::Software, |_, _| {});
        assert!(matches!(result, Err(AccelflateError::OutOfMemory)));
        assert_eq!(stub.init_calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_engine_change_rebuilds_slot() {
        let first_stub = Arc::new(StubEngine::new(64));
        let second_stub = Arc::new(StubEngine::new(64));
        let first: Arc<dyn Engine> = first_stub.clone();
        let second: Arc<dyn Engine> = second_stub.clone();
        with_context(&first, OpKind::Compress, ExecutionPath::Software, |_, _| {}).unwrap();
        with_context(&second, OpKind::Compress, ExecutionPath::Software, |_, _| {}).unwrap();
        with_context(&first, OpKind::Compress, ExecutionPath::Software, |_, _| {}).unwrap();
        assert_eq!(first_stub.init_calls.load(Ordering::Relaxed), 2);
        assert_eq!(second_stub.init_calls.load(Ordering::Relaxed), 1);
    }
}
