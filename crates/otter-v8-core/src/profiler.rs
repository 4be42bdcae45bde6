//! CPU and heap profiling
//!
//! A stopped CPU profile is copied out of the engine into an arena owned by
//! [`CpuProfile`], so the call tree stays readable after the profiler or the
//! isolate is gone.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use otter_v8_sys::profile::lossy_string;
use otter_v8_sys::*;
use parking_lot::Mutex;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::debug;

use crate::error::{V8Error, V8Result};
use crate::isolate::{Isolate, RawPtr, Release};
use crate::string::{take_rtn_string, to_cstring};

/// Sampling CPU profiler bound to one isolate.
///
/// # Example
///
/// ```no_run
/// use otter_v8_core::{Context, CpuProfiler, Isolate};
///
/// let iso = Isolate::new();
/// let ctx = Context::new(&iso).unwrap();
/// let profiler = CpuProfiler::new(&iso).unwrap();
/// profiler.start_profiling("boot").unwrap();
/// ctx.run_script("for (let i = 0; i < 1e6; i++) {}", "loop.js").unwrap();
/// let profile = profiler.stop_profiling("boot").unwrap();
/// let root = profile.top_down_root().unwrap();
/// assert_eq!(root.function_name(), "(root)");
/// ```
pub struct CpuProfiler {
    iso: Isolate,
    ptr: Mutex<RawPtr>,
}

impl CpuProfiler {
    pub fn new(iso: &Isolate) -> V8Result<Self> {
        let guard = iso.inner().enter()?;
        // SAFETY: guard keeps the isolate alive
        let ptr = unsafe { otter_v8_cpu_profiler_new(guard.ptr()) };
        drop(guard);
        if ptr.is_null() {
            return Err(V8Error::internal("engine returned no CPU profiler"));
        }
        Ok(Self {
            iso: iso.clone(),
            ptr: Mutex::new(RawPtr(ptr)),
        })
    }

    /// Start a profile named `title`. Starting a running title again is a
    /// no-op in the engine.
    ///
    /// # Panics
    /// When the profiler has been disposed.
    pub fn start_profiling(&self, title: &str) -> V8Result<()> {
        let title_c = to_cstring(title)?;
        let ptr = self.ptr.lock();
        assert!(!ptr.is_null(), "CPU profiler used after dispose");
        let _guard = self.iso.inner().enter()?;
        // SAFETY: the profiler is live while its mutex is held
        unsafe { otter_v8_cpu_profiler_start(ptr.0, title_c.as_ptr()) };
        debug!(isolate = self.iso.inner().id(), title, "CPU profiling started");
        Ok(())
    }

    /// Stop the profile named `title` and copy it out.
    ///
    /// Fails with `InvalidArgument` when no such profile is running.
    ///
    /// # Panics
    /// When the profiler has been disposed.
    pub fn stop_profiling(&self, title: &str) -> V8Result<CpuProfile> {
        let title_c = to_cstring(title)?;
        let ptr = self.ptr.lock();
        assert!(!ptr.is_null(), "CPU profiler used after dispose");
        let guard = self.iso.inner().enter()?;
        // SAFETY: the profiler is live while its mutex is held
        let raw = unsafe { otter_v8_cpu_profiler_stop(ptr.0, title_c.as_ptr()) };
        drop(guard);
        drop(ptr);
        if raw.is_null() {
            return Err(V8Error::invalid_argument(format!(
                "no CPU profile named {title:?} is running"
            )));
        }
        // SAFETY: raw is an unowned record from the bridge
        let profile = unsafe { CpuProfile::from_raw(raw) };
        debug!(
            isolate = self.iso.inner().id(),
            title,
            nodes = profile.nodes.len(),
            "CPU profiling stopped"
        );
        Ok(profile)
    }

    /// Release the engine profiler. Idempotent.
    pub fn dispose(&self) {
        let ptr = std::mem::replace(&mut *self.ptr.lock(), RawPtr::NULL);
        if !ptr.is_null() {
            self.iso.inner().release(Release::CpuProfiler(ptr));
        }
    }

    /// Check if [`CpuProfiler::dispose`] has run
    pub fn is_disposed(&self) -> bool {
        self.ptr.lock().is_null()
    }
}

impl Drop for CpuProfiler {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for CpuProfiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuProfiler")
            .field("isolate", &self.iso.inner().id())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    node_id: u32,
    script_id: i32,
    script_resource_name: String,
    function_name: String,
    line_number: i32,
    column_number: i32,
    hit_count: u32,
    bailout_reason: String,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// A finished CPU profile with its top-down call tree.
#[derive(Debug, Clone)]
pub struct CpuProfile {
    title: String,
    start_time: i64,
    end_time: i64,
    /// Depth-first order, root at index 0
    nodes: Vec<NodeData>,
}

impl CpuProfile {
    /// Copy the bridge record and release it.
    ///
    /// # Safety
    /// `raw` must be an unowned profile returned by the bridge.
    unsafe fn from_raw(raw: *mut OtterCpuProfile) -> CpuProfile {
        scopeguard::defer! {
            // SAFETY: freed exactly once after copying
            unsafe { otter_v8_cpu_profile_delete(raw) };
        }
        // SAFETY: forwarded caller contract
        unsafe { Self::copy(&*raw) }
    }

    /// # Safety
    /// Every pointer reachable from `raw` must be valid.
    unsafe fn copy(raw: &OtterCpuProfile) -> CpuProfile {
        let mut nodes: Vec<NodeData> = Vec::new();
        let mut stack: Vec<(*const OtterCpuProfileNode, Option<usize>)> = Vec::new();
        if !raw.root.is_null() {
            stack.push((raw.root, None));
        }
        while let Some((ptr, parent)) = stack.pop() {
            // SAFETY: caller guarantees the tree is valid
            let node = unsafe { &*ptr };
            let index = nodes.len();
            // SAFETY: strings belong to the same record
            let data = unsafe {
                NodeData {
                    node_id: node.node_id,
                    script_id: node.script_id,
                    script_resource_name: lossy_string(node.script_resource_name),
                    function_name: lossy_string(node.function_name),
                    line_number: node.line_number,
                    column_number: node.column_number,
                    hit_count: node.hit_count,
                    bailout_reason: lossy_string(node.bailout_reason),
                    parent,
                    children: Vec::new(),
                }
            };
            nodes.push(data);
            if let Some(parent) = parent {
                nodes[parent].children.push(index);
            }
            // Reversed so children pop in engine order
            // SAFETY: caller guarantees the tree is valid
            for child in unsafe { node.children() }.iter().rev() {
                if !child.is_null() {
                    stack.push((*child, Some(index)));
                }
            }
        }
        CpuProfile {
            // SAFETY: title belongs to the record
            title: unsafe { lossy_string(raw.title) },
            start_time: raw.start_time,
            end_time: raw.end_time,
            nodes,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Start timestamp in microseconds
    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    /// End timestamp in microseconds
    pub fn end_time(&self) -> i64 {
        self.end_time
    }

    pub fn duration(&self) -> Duration {
        Duration::from_micros(u64::try_from(self.end_time - self.start_time).unwrap_or(0))
    }

    /// Root of the top-down call tree; `None` after [`CpuProfile::delete`]
    pub fn top_down_root(&self) -> Option<CpuProfileNode<'_>> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(CpuProfileNode {
                profile: self,
                index: 0,
            })
        }
    }

    /// Drop the call tree. Idempotent.
    pub fn delete(&mut self) {
        self.nodes = Vec::new();
    }

    /// Check if [`CpuProfile::delete`] has run
    pub fn is_deleted(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Serialize the profile and its nested call tree
    pub fn to_json(&self) -> V8Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Serialized as a flat node list in depth-first order, each node naming its
/// parent and children by id, so arbitrarily deep trees serialize without
/// recursion.
impl Serialize for CpuProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("CpuProfile", 4)?;
        s.serialize_field("title", &self.title)?;
        s.serialize_field("start_time", &self.start_time)?;
        s.serialize_field("end_time", &self.end_time)?;
        s.serialize_field("nodes", &NodeList(self))?;
        s.end()
    }
}

struct NodeList<'a>(&'a CpuProfile);

impl Serialize for NodeList<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let profile = self.0;
        serializer.collect_seq((0..profile.nodes.len()).map(|index| CpuProfileNode { profile, index }))
    }
}

/// A node of the top-down call tree, borrowed from its profile.
#[derive(Clone, Copy)]
pub struct CpuProfileNode<'a> {
    profile: &'a CpuProfile,
    index: usize,
}

impl<'a> CpuProfileNode<'a> {
    fn data(&self) -> &'a NodeData {
        &self.profile.nodes[self.index]
    }

    fn at(&self, index: usize) -> CpuProfileNode<'a> {
        CpuProfileNode {
            profile: self.profile,
            index,
        }
    }

    pub fn node_id(&self) -> u32 {
        self.data().node_id
    }

    pub fn script_id(&self) -> i32 {
        self.data().script_id
    }

    pub fn script_resource_name(&self) -> &'a str {
        &self.data().script_resource_name
    }

    /// Function name, or a pseudo-name such as `(program)` or
    /// `(garbage collector)`
    pub fn function_name(&self) -> &'a str {
        &self.data().function_name
    }

    /// 1-based line, 0 when unknown
    pub fn line_number(&self) -> i32 {
        self.data().line_number
    }

    /// 1-based column, 0 when unknown
    pub fn column_number(&self) -> i32 {
        self.data().column_number
    }

    /// Samples taken while this node was on top of the stack
    pub fn hit_count(&self) -> u32 {
        self.data().hit_count
    }

    /// Why the optimizer gave up on the function, empty if it did not
    pub fn bailout_reason(&self) -> &'a str {
        &self.data().bailout_reason
    }

    pub fn children_count(&self) -> usize {
        self.data().children.len()
    }

    pub fn child(&self, index: usize) -> Option<CpuProfileNode<'a>> {
        self.data().children.get(index).map(|&i| self.at(i))
    }

    pub fn children(&self) -> impl Iterator<Item = CpuProfileNode<'a>> + use<'a> {
        let profile = self.profile;
        self.data()
            .children
            .iter()
            .map(move |&index| CpuProfileNode { profile, index })
    }

    pub fn parent(&self) -> Option<CpuProfileNode<'a>> {
        self.data().parent.map(|i| self.at(i))
    }
}

impl Serialize for CpuProfileNode<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let data = self.data();
        let parent = self.parent().map(|p| p.node_id());
        let children: Vec<u32> = self.children().map(|c| c.node_id()).collect();
        let mut s = serializer.serialize_struct("CpuProfileNode", 10)?;
        s.serialize_field("id", &data.node_id)?;
        s.serialize_field("parent", &parent)?;
        s.serialize_field("function_name", &data.function_name)?;
        s.serialize_field("script_id", &data.script_id)?;
        s.serialize_field("script_resource_name", &data.script_resource_name)?;
        s.serialize_field("line_number", &data.line_number)?;
        s.serialize_field("column_number", &data.column_number)?;
        s.serialize_field("hit_count", &data.hit_count)?;
        s.serialize_field("bailout_reason", &data.bailout_reason)?;
        s.serialize_field("children", &children)?;
        s.end()
    }
}

impl fmt::Debug for CpuProfileNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuProfileNode")
            .field("node_id", &self.node_id())
            .field("function_name", &self.function_name())
            .field("children", &self.children_count())
            .finish()
    }
}

/// Heap snapshots of one isolate
#[derive(Debug, Clone)]
pub struct HeapProfiler {
    iso: Isolate,
}

impl HeapProfiler {
    pub fn new(iso: &Isolate) -> Self {
        Self { iso: iso.clone() }
    }

    /// Capture the heap as the engine's standard JSON snapshot document
    pub fn take_heap_snapshot(&self) -> V8Result<String> {
        let guard = self.iso.inner().enter()?;
        // SAFETY: guard keeps the isolate alive
        let snapshot = unsafe { take_rtn_string(otter_v8_heap_snapshot(guard.ptr())) }?;
        debug!(
            isolate = self.iso.inner().id(),
            bytes = snapshot.len(),
            "Heap snapshot taken"
        );
        Ok(snapshot)
    }

    /// Capture a snapshot and write it to `path`
    pub fn write_heap_snapshot(&self, path: impl AsRef<Path>) -> V8Result<()> {
        let snapshot = self.take_heap_snapshot()?;
        std::fs::write(path, snapshot)?;
        Ok(())
    }
}
