//! Execution contexts
//!
//! A context owns a global object and tracks every value created in it.
//! Closing the context releases those values; Rust handles that outlive the
//! context notice the closed state and skip their own release.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Weak};

use dashmap::DashMap;
use otter_v8_sys::*;
use parking_lot::{RwLock, RwLockReadGuard};
use tracing::debug;

use crate::error::{V8Error, V8Result};
use crate::isolate::{Isolate, IsolateGuard, RawPtr, Release};
use crate::object::Object;
use crate::string::{c_len, to_cstring};
use crate::template::ObjectTemplate;
use crate::value::Value;

/// Token 0 is the isolate's internal context inside the bridge.
static NEXT_CONTEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Process-wide directory from context token to live context.
static CONTEXTS: LazyLock<DashMap<u64, Weak<ContextInner>>> = LazyLock::new(DashMap::new);

/// Resolve a context token handed back by the bridge.
pub(crate) fn lookup_context(token: u64) -> Option<Context> {
    CONTEXTS
        .get(&token)
        .and_then(|entry| entry.upgrade())
        .map(|inner| Context { inner })
}

pub(crate) struct ContextInner {
    iso: Isolate,
    ptr: RwLock<RawPtr>,
    token: u64,
}

impl ContextInner {
    pub(crate) fn isolate(&self) -> &Isolate {
        &self.iso
    }

    pub(crate) fn read_ptr(&self) -> RwLockReadGuard<'_, RawPtr> {
        self.ptr.read_recursive()
    }

    /// Enter the isolate and check the context is still open.
    pub(crate) fn enter(&self) -> V8Result<ContextGuard<'_>> {
        let iso = self.iso.inner().enter()?;
        let ptr = self.ptr.read_recursive();
        if ptr.is_null() {
            return Err(V8Error::ContextClosed);
        }
        Ok(ContextGuard { ptr, _iso: iso })
    }

    /// Detach the engine context and run `f` on it as the final operation.
    ///
    /// Returns `None` if already closed.
    pub(crate) fn take<R>(&self, f: impl FnOnce(RawPtr) -> R) -> Option<R> {
        let mut ptr = if self.iso.inner().is_entered_by_current_thread() {
            match self.ptr.try_write() {
                Some(ptr) => ptr,
                None => panic!(
                    "context {} cannot be closed while one of its scripts is running",
                    self.token
                ),
            }
        } else {
            self.ptr.write()
        };
        if ptr.is_null() {
            return None;
        }
        let raw = *ptr;
        *ptr = RawPtr::NULL;
        drop(ptr);
        CONTEXTS.remove(&self.token);
        Some(f(raw))
    }

    fn close(&self) {
        let closed = self.take(|raw| self.iso.inner().release(Release::Context(raw)));
        if closed.is_some() {
            debug!(context = self.token, "Context closed");
        }
    }
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        self.close();
    }
}

/// Bookkeeping for one bridge call inside a context.
pub(crate) struct ContextGuard<'a> {
    ptr: RwLockReadGuard<'a, RawPtr>,
    _iso: IsolateGuard<'a>,
}

impl ContextGuard<'_> {
    pub(crate) fn ptr(&self) -> OtterContextPtr {
        self.ptr.0
    }
}

/// A JavaScript execution context.
///
/// Cloning is cheap. The context is closed by [`Context::close`] or when the
/// last handle (and every value created in it) is dropped.
///
/// # Example
///
/// ```no_run
/// use otter_v8_core::{Context, Isolate};
///
/// let iso = Isolate::new();
/// let ctx = Context::new(&iso).unwrap();
/// ctx.run_script("const add = (a, b) => a + b", "math.js").unwrap();
/// let sum = ctx.run_script("add(3, 4)", "main.js").unwrap();
/// assert_eq!(sum.to_string(), "7");
/// ```
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Create a context with an empty global object
    pub fn new(iso: &Isolate) -> V8Result<Self> {
        Self::create(iso, |iso_ptr, token| {
            // SAFETY: iso_ptr is entered by create
            unsafe { otter_v8_context_new(iso_ptr, std::ptr::null_mut(), token) }
        })
    }

    /// Create a context whose global object is built from `global`
    pub fn with_global(iso: &Isolate, global: &ObjectTemplate) -> V8Result<Self> {
        assert!(
            global.isolate().ptr_eq(iso),
            "global template belongs to a different isolate"
        );
        let tmpl = global.raw();
        Self::create(iso, |iso_ptr, token| {
            // SAFETY: the template is owned by this entered isolate
            unsafe { otter_v8_context_new(iso_ptr, tmpl, token) }
        })
    }

    /// Create a context from one added to the isolate's startup snapshot.
    ///
    /// `index` is the value returned by `SnapshotCreator::add_context`.
    pub fn from_snapshot(iso: &Isolate, index: usize) -> V8Result<Self> {
        Self::create(iso, |iso_ptr, token| {
            // SAFETY: iso_ptr is entered by create
            unsafe { otter_v8_context_from_snapshot(iso_ptr, index, token) }
        })
    }

    /// Create a context in a fresh isolate owned by the context
    pub fn with_new_isolate() -> V8Result<Self> {
        Self::new(&Isolate::new())
    }

    fn create(
        iso: &Isolate,
        new_context: impl FnOnce(OtterIsolatePtr, i64) -> OtterContextPtr,
    ) -> V8Result<Self> {
        let token = NEXT_CONTEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        let raw_token = i64::try_from(token)
            .map_err(|_| V8Error::internal("context tokens exhausted"))?;
        let ptr = {
            let guard = iso.inner().enter()?;
            new_context(guard.ptr(), raw_token)
        };
        if ptr.is_null() {
            return Err(V8Error::internal(
                "context creation returned null (no such snapshot context?)",
            ));
        }
        let inner = Arc::new(ContextInner {
            iso: iso.clone(),
            ptr: RwLock::new(RawPtr(ptr)),
            token,
        });
        CONTEXTS.insert(token, Arc::downgrade(&inner));
        debug!(context = token, isolate = iso.inner().id(), "Context created");
        Ok(Self { inner })
    }

    pub(crate) fn from_inner(inner: Arc<ContextInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Arc<ContextInner> {
        &self.inner
    }

    /// The owning isolate
    pub fn isolate(&self) -> &Isolate {
        &self.inner.iso
    }

    /// Check if two handles refer to the same context
    pub fn ptr_eq(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The context's global object
    pub fn global(&self) -> V8Result<Object> {
        let guard = self.inner.enter()?;
        // SAFETY: guard keeps the context open
        let ptr = unsafe { otter_v8_context_global(guard.ptr()) };
        // SAFETY: the bridge tracks the result in this context
        let value = unsafe { Value::from_raw(ptr, Some(&self.inner), self.isolate()) };
        drop(guard);
        value.into_object()
    }

    /// Compile and run `source`, reporting `origin` in locations and stacks.
    pub fn run_script(&self, source: &str, origin: &str) -> V8Result<Value> {
        let len = c_len(source)?;
        let origin = to_cstring(origin)?;
        let guard = self.inner.enter()?;
        // SAFETY: source is valid for len bytes; guard keeps the context open
        let rtn = unsafe {
            otter_v8_context_run_script(guard.ptr(), source.as_ptr().cast(), len, origin.as_ptr())
        };
        drop(guard);
        // SAFETY: the record comes straight from the bridge
        unsafe { Value::from_rtn(rtn, Some(&self.inner), self.isolate()) }
    }

    /// Run pending microtasks such as promise continuations
    pub fn perform_microtask_checkpoint(&self) -> V8Result<()> {
        let _guard = self.inner.enter()?;
        self.isolate().perform_microtask_checkpoint()
    }

    /// Close the context, releasing every value still tracked by it.
    ///
    /// Idempotent. Values created in the context become unusable.
    pub fn close(&self) {
        self.inner.close();
    }

    /// Check if the context has been closed
    pub fn is_closed(&self) -> bool {
        self.inner.read_ptr().is_null()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("token", &self.inner.token)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_token_is_not_found() {
        assert!(lookup_context(u64::MAX).is_none());
    }
}
