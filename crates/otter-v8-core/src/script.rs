//! Context-independent compiled scripts and the code cache

use std::fmt;
use std::ptr;

use otter_v8_sys::*;
use scopeguard::defer;
use tracing::trace;

use crate::context::Context;
use crate::error::{JsError, V8Error, V8Result};
use crate::isolate::{Isolate, RawPtr, Release};
use crate::string::{c_len, to_cstring};
use crate::value::Value;

/// How the engine compiles a script
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompileMode {
    /// Lazy compilation
    #[default]
    Default,
    /// Use the supplied [`CompilerCachedData`]
    ConsumeCodeCache,
    /// Compile every function up front
    EagerCompile,
}

impl CompileMode {
    fn raw(self) -> OtterCompileMode {
        match self {
            CompileMode::Default => OTTER_COMPILE_DEFAULT,
            CompileMode::ConsumeCodeCache => OTTER_COMPILE_CONSUME_CODE_CACHE,
            CompileMode::EagerCompile => OTTER_COMPILE_EAGER,
        }
    }
}

/// Serialized compiler output for a script
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerCachedData {
    pub bytes: Vec<u8>,
    /// Set when the engine refused to consume the cache
    pub rejected: bool,
}

impl CompilerCachedData {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            rejected: false,
        }
    }
}

/// Options for [`Isolate::compile_unbound_script`]
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub mode: CompileMode,
    pub cached_data: Option<CompilerCachedData>,
}

impl CompileOptions {
    /// Consume `cached` when compiling
    pub fn with_code_cache(cached: CompilerCachedData) -> Self {
        Self {
            mode: CompileMode::ConsumeCodeCache,
            cached_data: Some(cached),
        }
    }

    /// Compile eagerly
    pub fn eager() -> Self {
        Self {
            mode: CompileMode::EagerCompile,
            cached_data: None,
        }
    }
}

/// A script compiled once and runnable in any context of its isolate.
///
/// # Example
///
/// ```no_run
/// use otter_v8_core::{CompileOptions, Context, Isolate};
///
/// let iso = Isolate::new();
/// let script = iso
///     .compile_unbound_script("6 * 7", "answer.js", CompileOptions::default())
///     .unwrap();
/// let cache = script.create_code_cache().unwrap();
///
/// let ctx = Context::new(&iso).unwrap();
/// assert_eq!(script.run(&ctx).unwrap().int32(), 42);
///
/// let cached = iso
///     .compile_unbound_script("6 * 7", "answer.js", CompileOptions::with_code_cache(cache))
///     .unwrap();
/// assert!(!cached.cached_data_rejected());
/// ```
pub struct UnboundScript {
    iso: Isolate,
    ptr: RawPtr,
    cached_data_rejected: bool,
}

impl Isolate {
    /// Compile `source` without binding it to a context
    pub fn compile_unbound_script(
        &self,
        source: &str,
        origin: &str,
        options: CompileOptions,
    ) -> V8Result<UnboundScript> {
        let len = c_len(source)?;
        let origin = to_cstring(origin)?;

        let cached = options.cached_data.as_ref();
        let cached_data = match cached {
            Some(cached) => OtterCachedData {
                data: cached.bytes.as_ptr(),
                length: c_len_bytes(&cached.bytes)?,
                rejected: 0,
            },
            None => OtterCachedData {
                data: ptr::null(),
                length: 0,
                rejected: 0,
            },
        };
        let raw_options = OtterCompileOptions {
            cached_data,
            compile_mode: options.mode.raw(),
        };

        let guard = self.inner().enter()?;
        // SAFETY: source and the cache bytes outlive the call; the bridge only
        // borrows them
        let rtn = unsafe {
            otter_v8_isolate_compile_unbound_script(
                guard.ptr(),
                source.as_ptr().cast(),
                len,
                origin.as_ptr(),
                raw_options,
            )
        };
        drop(guard);

        // SAFETY: error strings are ours to release
        if let Some(err) = unsafe { JsError::from_rtn(rtn.error) } {
            return Err(err.into());
        }
        if rtn.ptr.is_null() {
            return Err(V8Error::internal("compilation returned no script"));
        }
        let cached_data_rejected = cached.is_some() && rtn.cached_data_rejected != 0;
        trace!(isolate = self.inner().id(), cached_data_rejected, "Compiled unbound script");
        Ok(UnboundScript {
            iso: self.clone(),
            ptr: RawPtr(rtn.ptr),
            cached_data_rejected,
        })
    }
}

fn c_len_bytes(bytes: &[u8]) -> V8Result<std::ffi::c_int> {
    std::ffi::c_int::try_from(bytes.len()).map_err(|_| {
        V8Error::invalid_argument(format!("code cache of {} bytes is too large", bytes.len()))
    })
}

impl UnboundScript {
    /// Bind to `ctx` and run.
    ///
    /// # Panics
    /// When `ctx` belongs to another isolate.
    pub fn run(&self, ctx: &Context) -> V8Result<Value> {
        assert!(
            self.iso.ptr_eq(ctx.isolate()),
            "unbound script run in a context of a different isolate"
        );
        let guard = ctx.inner().enter()?;
        // SAFETY: script and context belong to the entered isolate
        let rtn = unsafe { otter_v8_unbound_script_run(guard.ptr(), self.ptr.0) };
        drop(guard);
        // SAFETY: the result is tracked in ctx
        unsafe { Value::from_rtn(rtn, Some(ctx.inner()), ctx.isolate()) }
    }

    /// Serialize the compiled code for a later [`CompileMode::ConsumeCodeCache`]
    pub fn create_code_cache(&self) -> V8Result<CompilerCachedData> {
        let guard = self.iso.inner().enter()?;
        // SAFETY: the script belongs to the entered isolate
        let raw = unsafe { otter_v8_unbound_script_create_code_cache(guard.ptr(), self.ptr.0) };
        drop(guard);
        if raw.is_null() {
            return Err(V8Error::internal("engine produced no code cache"));
        }
        defer! {
            // SAFETY: raw came from create_code_cache and is freed once
            unsafe { otter_v8_cached_data_delete(raw) };
        }
        // SAFETY: raw is a live record until the deferred delete
        let cached = unsafe { &*raw };
        let len = usize::try_from(cached.length).unwrap_or(0);
        let bytes = if cached.data.is_null() || len == 0 {
            Vec::new()
        } else {
            // SAFETY: the record owns `length` bytes at `data`
            unsafe { std::slice::from_raw_parts(cached.data, len) }.to_vec()
        };
        Ok(CompilerCachedData {
            bytes,
            rejected: cached.rejected != 0,
        })
    }

    /// Whether the engine refused the cache passed at compile time
    pub fn cached_data_rejected(&self) -> bool {
        self.cached_data_rejected
    }

    /// The owning isolate
    pub fn isolate(&self) -> &Isolate {
        &self.iso
    }
}

impl Drop for UnboundScript {
    fn drop(&mut self) {
        self.iso.inner().release(Release::Script(self.ptr));
    }
}

impl fmt::Debug for UnboundScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnboundScript")
            .field("isolate", &self.iso.inner().id())
            .field("cached_data_rejected", &self.cached_data_rejected)
            .finish()
    }
}
