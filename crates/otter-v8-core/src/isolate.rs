//! V8 isolates
//!
//! An isolate is an engine instance with its own heap. Every bridge call takes
//! the isolate's `Locker`, so one isolate may be used from several threads
//! one at a time while different isolates run in parallel.
//!
//! Handles dropped on a thread that is not inside the isolate while another
//! thread is running in it are queued and released once the isolate goes
//! idle, so a drop never blocks behind a long-running script.

use std::collections::HashMap;
use std::ffi::{c_int, c_void};
use std::fmt;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};

use crossbeam_channel::{Receiver, Sender, unbounded};
use otter_v8_sys::*;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::IsolateOptions;
use crate::context::ContextInner;
use crate::error::{V8Error, V8Result};
use crate::platform;
use crate::registry::CallbackRegistry;
use crate::snapshot::StartupData;
use crate::value::Value;

static NEXT_ISOLATE_ID: AtomicU64 = AtomicU64::new(1);

/// Bridge pointer shared between threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RawPtr(pub(crate) *mut c_void);

// SAFETY: bridge objects are only touched under the isolate's Locker
unsafe impl Send for RawPtr {}
// SAFETY: see above
unsafe impl Sync for RawPtr {}

impl RawPtr {
    pub(crate) const NULL: RawPtr = RawPtr(ptr::null_mut());

    pub(crate) fn is_null(self) -> bool {
        self.0.is_null()
    }
}

/// A bridge resource waiting to be released.
pub(crate) enum Release {
    Value {
        ptr: RawPtr,
        ctx: Option<Arc<ContextInner>>,
    },
    Context(RawPtr),
    Template(RawPtr),
    Script(RawPtr),
    CpuProfiler(RawPtr),
}

impl Release {
    /// # Safety
    /// `iso` must be the live isolate owning the resource.
    unsafe fn run(self, iso: RawPtr) {
        // SAFETY: each resource is released exactly once, under the caller's
        // guarantee that the isolate is still alive
        unsafe {
            match self {
                Release::Value { ptr, ctx: Some(ctx) } => {
                    let ctx_ptr = ctx.read_ptr();
                    // Closing the context already freed it
                    if !ctx_ptr.is_null() {
                        otter_v8_value_release(ptr.0);
                    }
                }
                Release::Value { ptr, ctx: None } => otter_v8_value_release(ptr.0),
                Release::Context(ptr) => otter_v8_context_free(ptr.0),
                Release::Template(ptr) => otter_v8_template_free(iso.0, ptr.0),
                Release::Script(ptr) => otter_v8_unbound_script_free(iso.0, ptr.0),
                Release::CpuProfiler(ptr) => otter_v8_cpu_profiler_dispose(ptr.0),
            }
        }
    }
}

/// Who owns the engine isolate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum IsolateOwner {
    Standalone,
    SnapshotCreator,
}

pub(crate) struct IsolateInner {
    id: u64,
    ptr: RwLock<RawPtr>,
    owner: IsolateOwner,
    pub(crate) callbacks: CallbackRegistry,
    /// Threads currently inside the isolate, with nesting depth
    active: Mutex<HashMap<ThreadId, usize>>,
    releases_tx: Sender<Release>,
    releases_rx: Receiver<Release>,
    /// Kept alive for the engine, which reads the blob lazily
    _startup_data: Option<StartupData>,
}

impl IsolateInner {
    pub(crate) fn new(
        ptr: OtterIsolatePtr,
        owner: IsolateOwner,
        startup_data: Option<StartupData>,
    ) -> Arc<Self> {
        let (releases_tx, releases_rx) = unbounded();
        let id = NEXT_ISOLATE_ID.fetch_add(1, Ordering::Relaxed);
        debug!(isolate = id, ?owner, "Isolate created");
        Arc::new(Self {
            id,
            ptr: RwLock::new(RawPtr(ptr)),
            owner,
            callbacks: CallbackRegistry::default(),
            active: Mutex::new(HashMap::new()),
            releases_tx,
            releases_rx,
            _startup_data: startup_data,
        })
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Enter the isolate for a bridge call.
    pub(crate) fn enter(&self) -> V8Result<IsolateGuard<'_>> {
        let ptr = self.ptr.read_recursive();
        if ptr.is_null() {
            return Err(V8Error::IsolateDisposed);
        }
        *self
            .active
            .lock()
            .entry(thread::current().id())
            .or_insert(0) += 1;
        Ok(IsolateGuard { inner: self, ptr })
    }

    /// Enter the isolate, panicking if it has been disposed.
    pub(crate) fn enter_live(&self) -> IsolateGuard<'_> {
        match self.enter() {
            Ok(guard) => guard,
            Err(e) => panic!("isolate {} used after disposal: {e}", self.id),
        }
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.ptr.read_recursive().is_null()
    }

    pub(crate) fn is_entered_by_current_thread(&self) -> bool {
        self.active.lock().contains_key(&thread::current().id())
    }

    /// Engine pointer without entering, for calls that need no locker.
    pub(crate) fn read_ptr(&self) -> RwLockReadGuard<'_, RawPtr> {
        self.ptr.read_recursive()
    }

    /// Release a resource now, or queue it while another thread runs inside
    /// the isolate.
    pub(crate) fn release(&self, job: Release) {
        let ptr = self.ptr.read_recursive();
        if ptr.is_null() {
            // Disposal already freed everything the isolate owned
            return;
        }
        let job = {
            let active = self.active.lock();
            let me = thread::current().id();
            if active.keys().any(|id| *id != me) {
                // Queued under the lock, so the busy thread's guard drains it
                // when it leaves
                trace!(isolate = self.id, "Deferring release");
                // The receiver lives as long as self
                let _ = self.releases_tx.send(job);
                return;
            }
            job
        };
        // SAFETY: the read guard keeps the isolate alive
        unsafe { job.run(*ptr) };
    }

    fn drain_releases(&self, ptr: RawPtr) {
        let mut released = 0usize;
        while let Ok(job) = self.releases_rx.try_recv() {
            // SAFETY: the caller holds the isolate's read guard
            unsafe { job.run(ptr) };
            released += 1;
        }
        if released > 0 {
            trace!(isolate = self.id, released, "Drained deferred releases");
        }
    }

    /// Take the engine pointer out and run `f` on it as the final operation.
    ///
    /// Returns `None` if the isolate was already disposed. Blocks until other
    /// threads leave the isolate.
    pub(crate) fn retire<R>(&self, f: impl FnOnce(OtterIsolatePtr) -> R) -> Option<R> {
        if self.is_entered_by_current_thread() {
            panic!(
                "isolate {} cannot be disposed from inside one of its own callbacks",
                self.id
            );
        }
        let mut ptr = self.ptr.write();
        if ptr.is_null() {
            return None;
        }
        let result = f(ptr.0);
        *ptr = RawPtr::NULL;
        drop(ptr);

        // Everything queued was freed with the isolate
        let dropped = self.releases_rx.try_iter().count();
        let callbacks = self.callbacks.len();
        self.callbacks.clear();
        debug!(isolate = self.id, dropped, callbacks, "Isolate disposed");
        Some(result)
    }
}

impl Drop for IsolateInner {
    fn drop(&mut self) {
        if self.owner == IsolateOwner::Standalone {
            // SAFETY: no handle to this isolate remains
            self.retire(|ptr| unsafe { otter_v8_isolate_dispose(ptr) });
        }
    }
}

/// Bookkeeping for one bridge call inside an isolate.
///
/// Holds the isolate's read lock so disposal waits for the call to finish.
pub(crate) struct IsolateGuard<'a> {
    inner: &'a IsolateInner,
    ptr: RwLockReadGuard<'a, RawPtr>,
}

impl IsolateGuard<'_> {
    pub(crate) fn ptr(&self) -> OtterIsolatePtr {
        self.ptr.0
    }
}

impl Drop for IsolateGuard<'_> {
    fn drop(&mut self) {
        let idle = {
            let mut active = self.inner.active.lock();
            let id = thread::current().id();
            if let Some(depth) = active.get_mut(&id) {
                *depth -= 1;
                if *depth == 0 {
                    active.remove(&id);
                }
            }
            active.is_empty()
        };
        if idle {
            self.inner.drain_releases(*self.ptr);
        }
    }
}

/// Heap usage counters for one isolate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HeapStatistics {
    pub total_heap_size: usize,
    pub total_heap_size_executable: usize,
    pub total_physical_size: usize,
    pub total_available_size: usize,
    pub used_heap_size: usize,
    pub heap_size_limit: usize,
    pub malloced_memory: usize,
    pub external_memory: usize,
    pub peak_malloced_memory: usize,
    pub number_of_native_contexts: usize,
    pub number_of_detached_contexts: usize,
}

impl From<OtterHeapStatistics> for HeapStatistics {
    fn from(s: OtterHeapStatistics) -> Self {
        Self {
            total_heap_size: s.total_heap_size,
            total_heap_size_executable: s.total_heap_size_executable,
            total_physical_size: s.total_physical_size,
            total_available_size: s.total_available_size,
            used_heap_size: s.used_heap_size,
            heap_size_limit: s.heap_size_limit,
            malloced_memory: s.malloced_memory,
            external_memory: s.external_memory,
            peak_malloced_memory: s.peak_malloced_memory,
            number_of_native_contexts: s.number_of_native_contexts,
            number_of_detached_contexts: s.number_of_detached_contexts,
        }
    }
}

/// A V8 isolate handle.
///
/// Cloning is cheap and yields another handle to the same isolate. The
/// isolate is disposed by [`Isolate::dispose`] or when the last handle (and
/// every context and value derived from it) is dropped.
///
/// # Example
///
/// ```no_run
/// use otter_v8_core::{Context, Isolate};
///
/// let iso = Isolate::new();
/// let ctx = Context::new(&iso).unwrap();
/// let value = ctx.run_script("1 + 2", "sum.js").unwrap();
/// assert_eq!(value.int32(), 3);
/// ```
#[derive(Clone)]
pub struct Isolate {
    inner: Arc<IsolateInner>,
}

impl Isolate {
    /// Create an isolate with default options
    pub fn new() -> Self {
        platform::initialize();
        // SAFETY: default params carry no borrowed data
        let ptr = unsafe { otter_v8_isolate_new(OtterIsolateParams::default()) };
        Self::from_inner(IsolateInner::new(ptr, IsolateOwner::Standalone, None))
    }

    /// Create an isolate from options
    pub fn with_options(options: IsolateOptions) -> V8Result<Self> {
        platform::initialize();
        let mut params = OtterIsolateParams {
            initial_heap_size: options.initial_heap_size,
            maximum_heap_size: options.max_heap_size,
            capture_stack_traces: c_int::from(options.capture_stack_traces),
            ..Default::default()
        };
        if let Some(data) = &options.startup_data {
            params.snapshot_data = data.as_bytes().as_ptr().cast();
            params.snapshot_length = c_int::try_from(data.len()).map_err(|_| {
                V8Error::invalid_argument(format!("startup data of {} bytes is too large", data.len()))
            })?;
        }
        // SAFETY: the blob outlives the isolate, which keeps it below
        let ptr = unsafe { otter_v8_isolate_new(params) };
        Ok(Self::from_inner(IsolateInner::new(
            ptr,
            IsolateOwner::Standalone,
            options.startup_data,
        )))
    }

    /// Create an isolate primed from a snapshot blob
    pub fn with_startup_data(data: StartupData) -> V8Result<Self> {
        Self::with_options(IsolateOptions::new().startup_data(data))
    }

    pub(crate) fn from_inner(inner: Arc<IsolateInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Arc<IsolateInner> {
        &self.inner
    }

    /// Check if two handles refer to the same isolate
    pub fn ptr_eq(&self, other: &Isolate) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Dispose the isolate and everything created in it.
    ///
    /// Idempotent. Blocks until other threads leave the isolate.
    ///
    /// # Panics
    /// When called from inside one of the isolate's own callbacks.
    pub fn dispose(&self) {
        match self.inner.owner {
            // SAFETY: retire runs this exactly once
            IsolateOwner::Standalone => {
                self.inner
                    .retire(|ptr| unsafe { otter_v8_isolate_dispose(ptr) });
            }
            IsolateOwner::SnapshotCreator => {
                debug!(
                    isolate = self.inner.id,
                    "Ignoring dispose of a snapshot creator isolate"
                );
            }
        }
    }

    /// Check if the isolate has been disposed
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Interrupt the script currently running in the isolate.
    ///
    /// May be called from any thread. The interrupted call fails with an
    /// error whose message starts with `"ExecutionTerminated:"`.
    pub fn terminate_execution(&self) {
        let ptr = self.inner.read_ptr();
        if ptr.is_null() {
            return;
        }
        // SAFETY: termination is thread-safe and needs no locker
        unsafe { otter_v8_isolate_terminate_execution(ptr.0) };
        debug!(isolate = self.inner.id, "Execution terminated");
    }

    /// Check if a termination is in progress
    pub fn is_execution_terminating(&self) -> bool {
        let guard = self.inner.enter_live();
        // SAFETY: guard keeps the isolate alive
        unsafe { otter_v8_isolate_is_execution_terminating(guard.ptr()) != 0 }
    }

    /// Check if some thread is currently running inside the isolate
    pub fn is_in_use(&self) -> bool {
        let ptr = self.inner.read_ptr();
        if ptr.is_null() {
            return false;
        }
        // SAFETY: the read guard keeps the isolate alive
        unsafe { otter_v8_isolate_is_in_use(ptr.0) != 0 }
    }

    /// Heap usage counters
    pub fn heap_statistics(&self) -> V8Result<HeapStatistics> {
        let guard = self.inner.enter()?;
        // SAFETY: guard keeps the isolate alive
        let stats = unsafe { otter_v8_isolate_heap_statistics(guard.ptr()) };
        Ok(stats.into())
    }

    /// Run pending microtasks
    pub fn perform_microtask_checkpoint(&self) -> V8Result<()> {
        let guard = self.inner.enter()?;
        // SAFETY: guard keeps the isolate alive
        unsafe { otter_v8_isolate_perform_microtask_checkpoint(guard.ptr()) };
        Ok(())
    }

    /// Schedule `value` to be thrown when the current host callback returns.
    ///
    /// Use from inside a function callback and return `None`; the exception
    /// surfaces at the script call that invoked the callback.
    pub fn throw_exception(&self, value: &Value) -> V8Result<Value> {
        self.assert_owns(value);
        let guard = self.inner.enter()?;
        // SAFETY: value belongs to this live isolate
        let ptr = unsafe { otter_v8_isolate_throw_exception(guard.ptr(), value.raw()) };
        // SAFETY: the bridge tracks the result in the internal context
        Ok(unsafe { Value::from_raw(ptr, None, self) })
    }

    /// # Panics
    /// When `value` was created in a different isolate.
    pub(crate) fn assert_owns(&self, value: &Value) {
        assert!(
            self.ptr_eq(value.isolate()),
            "value from isolate {} used in isolate {}",
            value.isolate().inner.id,
            self.inner.id
        );
    }
}

impl Default for Isolate {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Isolate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Isolate")
            .field("id", &self.inner.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
