//! Startup snapshots
//!
//! A [`SnapshotCreator`] owns a special isolate. Scripts run in its contexts,
//! the contexts are handed to the creator, and `create` serializes the heap
//! into a [`StartupData`] blob that primes new isolates.

use std::fmt;
use std::sync::Arc;

use otter_v8_sys::*;
use scopeguard::defer;
use tracing::debug;

use crate::context::Context;
use crate::error::{V8Error, V8Result};
use crate::isolate::{Isolate, IsolateInner, IsolateOwner, RawPtr};
use crate::platform;

/// What to keep of compiled functions in a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FunctionCodeHandling {
    /// Drop compiled code; functions recompile lazily
    #[default]
    Clear,
    /// Keep compiled code in the blob
    Keep,
}

impl FunctionCodeHandling {
    fn raw(self) -> std::ffi::c_int {
        match self {
            FunctionCodeHandling::Clear => OTTER_FUNCTION_CODE_CLEAR,
            FunctionCodeHandling::Keep => OTTER_FUNCTION_CODE_KEEP,
        }
    }
}

/// A serialized isolate heap.
///
/// Cheap to clone; every isolate created from the blob keeps it alive.
#[derive(Clone, PartialEq, Eq)]
pub struct StartupData {
    bytes: Arc<[u8]>,
}

impl StartupData {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Vec<u8>> for StartupData {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl AsRef<[u8]> for StartupData {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for StartupData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartupData")
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CreatorState {
    Empty,
    HasDefault,
    Frozen,
}

/// Builds a startup snapshot.
///
/// # Example
///
/// ```no_run
/// use otter_v8_core::{Context, FunctionCodeHandling, Isolate, SnapshotCreator};
///
/// let mut creator = SnapshotCreator::new().unwrap();
/// let iso = creator.isolate().unwrap();
/// let ctx = Context::new(&iso).unwrap();
/// ctx.run_script("const add = (a, b) => a + b", "add.js").unwrap();
/// creator.set_default_context(&ctx).unwrap();
/// let blob = creator.create(FunctionCodeHandling::Clear).unwrap();
///
/// let iso = Isolate::with_startup_data(blob).unwrap();
/// let ctx = Context::new(&iso).unwrap();
/// assert_eq!(ctx.run_script("add(3, 4)", "main.js").unwrap().to_string(), "7");
/// ```
pub struct SnapshotCreator {
    ptr: RawPtr,
    iso: Isolate,
    state: CreatorState,
}

impl SnapshotCreator {
    pub fn new() -> V8Result<Self> {
        platform::initialize();
        // SAFETY: no arguments
        let rtn = unsafe { otter_v8_snapshot_creator_new() };
        if rtn.creator.is_null() || rtn.iso.is_null() {
            return Err(V8Error::internal("engine returned no snapshot creator"));
        }
        let inner = IsolateInner::new(rtn.iso, IsolateOwner::SnapshotCreator, None);
        debug!(isolate = inner.id(), "Snapshot creator created");
        Ok(Self {
            ptr: RawPtr(rtn.creator),
            iso: Isolate::from_inner(inner),
            state: CreatorState::Empty,
        })
    }

    /// The creator's isolate. Fails once the blob has been created.
    pub fn isolate(&self) -> V8Result<Isolate> {
        self.ensure_open()?;
        Ok(self.iso.clone())
    }

    /// Make `ctx` the context every isolate built from the blob starts with.
    ///
    /// The context is consumed and closed on the host side. May be called
    /// once.
    pub fn set_default_context(&mut self, ctx: &Context) -> V8Result<()> {
        self.ensure_open()?;
        if self.state == CreatorState::HasDefault {
            return Err(V8Error::snapshot("default context is already set"));
        }
        let creator = self.ptr;
        self.consume(ctx, |iso, raw| {
            let _guard = iso.inner().enter()?;
            // SAFETY: the bridge takes over the detached context
            unsafe { otter_v8_snapshot_creator_set_default_context(creator.0, raw.0) };
            Ok(())
        })?;
        self.state = CreatorState::HasDefault;
        debug!(isolate = self.iso.inner().id(), "Snapshot default context set");
        Ok(())
    }

    /// Add `ctx` to the blob and return the index for
    /// [`Context::from_snapshot`]. The context is consumed.
    pub fn add_context(&mut self, ctx: &Context) -> V8Result<usize> {
        self.ensure_open()?;
        let creator = self.ptr;
        let index = self.consume(ctx, |iso, raw| {
            let _guard = iso.inner().enter()?;
            // SAFETY: the bridge takes over the detached context
            Ok(unsafe { otter_v8_snapshot_creator_add_context(creator.0, raw.0) })
        })?;
        debug!(isolate = self.iso.inner().id(), index, "Snapshot context added");
        Ok(index)
    }

    /// Serialize the heap. The creator and its isolate are finished
    /// afterwards; every further call fails.
    pub fn create(&mut self, handling: FunctionCodeHandling) -> V8Result<StartupData> {
        match self.state {
            CreatorState::Frozen => return Err(V8Error::snapshot("snapshot already created")),
            CreatorState::Empty => {
                return Err(V8Error::snapshot(
                    "set_default_context must be called before create",
                ));
            }
            CreatorState::HasDefault => {}
        }
        let creator = self.ptr;
        let blob = self
            .iso
            .inner()
            // SAFETY: create_blob deletes the creator and its isolate
            .retire(|_| unsafe { otter_v8_snapshot_creator_create_blob(creator.0, handling.raw()) })
            .ok_or(V8Error::IsolateDisposed)?;
        self.ptr = RawPtr::NULL;
        self.state = CreatorState::Frozen;

        defer! {
            // SAFETY: the blob is released once, after copying
            unsafe { otter_v8_startup_blob_delete(blob) };
        }
        let len = usize::try_from(blob.length).unwrap_or(0);
        if blob.data.is_null() || len == 0 {
            return Err(V8Error::snapshot("engine produced an empty startup blob"));
        }
        // SAFETY: the blob owns `length` bytes at `data`
        let bytes = unsafe { std::slice::from_raw_parts(blob.data.cast::<u8>(), len) };
        debug!(bytes = len, ?handling, "Snapshot created");
        Ok(StartupData::new(bytes))
    }

    fn ensure_open(&self) -> V8Result<()> {
        if self.state == CreatorState::Frozen {
            return Err(V8Error::snapshot("snapshot already created"));
        }
        Ok(())
    }

    fn consume<R>(
        &self,
        ctx: &Context,
        f: impl FnOnce(&Isolate, RawPtr) -> V8Result<R>,
    ) -> V8Result<R> {
        assert!(
            ctx.isolate().ptr_eq(&self.iso),
            "context does not belong to the snapshot creator's isolate"
        );
        ctx.inner()
            .take(|raw| f(&self.iso, raw))
            .ok_or(V8Error::ContextClosed)?
    }
}

impl Drop for SnapshotCreator {
    fn drop(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        let creator = self.ptr;
        // SAFETY: deleting the creator disposes its isolate exactly once
        self.iso
            .inner()
            .retire(|_| unsafe { otter_v8_snapshot_creator_delete(creator.0) });
        debug!(isolate = self.iso.inner().id(), "Snapshot creator discarded");
    }
}

impl fmt::Debug for SnapshotCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotCreator")
            .field("isolate", &self.iso.inner().id())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_code_handling_maps_to_bridge() {
        assert_eq!(FunctionCodeHandling::Clear.raw(), OTTER_FUNCTION_CODE_CLEAR);
        assert_eq!(FunctionCodeHandling::Keep.raw(), OTTER_FUNCTION_CODE_KEEP);
    }

    #[test]
    fn test_startup_data_shares_bytes() {
        let data = StartupData::from(vec![1, 2, 3]);
        let copy = data.clone();
        assert_eq!(copy.as_bytes(), &[1, 2, 3]);
        assert_eq!(data.len(), 3);
        assert!(!data.is_empty());
        assert_eq!(format!("{data:?}"), "StartupData { len: 3 }");
    }
}
