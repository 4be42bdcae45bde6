//! Safe wrappers for embedding V8.
//!
//! This crate provides RAII wrappers around the C ABI exported by
//! `otter-v8-sys`: isolates, contexts, values, templates with host
//! callbacks, promises, unbound scripts, profilers and startup snapshots.
//!
//! # Example
//!
//! ```no_run
//! use otter_v8_core::{Context, FunctionTemplate, Isolate, ObjectTemplate, PropertyAttribute, Value};
//!
//! let iso = Isolate::new();
//! let global = ObjectTemplate::new(&iso).unwrap();
//! let double = FunctionTemplate::new(&iso, |info| {
//!     let n = info.arg(0)?.number();
//!     Value::new(info.isolate(), n * 2.0).ok()
//! })
//! .unwrap();
//! global.set("double", &double, PropertyAttribute::NONE).unwrap();
//!
//! let ctx = Context::with_global(&iso, &global).unwrap();
//! let result = ctx.run_script("double(21)", "main.js").unwrap();
//! assert_eq!(result.int32(), 42);
//! ```
//!
//! # Thread Safety
//!
//! Every bridge call takes the isolate's `Locker`, so [`Isolate`],
//! [`Context`] and the template types are `Send + Sync` and calls from
//! different threads on one isolate are serialized. [`Value`] and its typed
//! views are `Send` but `!Sync`: a handle may be moved to a worker thread,
//! for example to resolve a promise, but not shared.
//!
//! ```compile_fail
//! use otter_v8_core::{Isolate, Value};
//! use std::sync::Arc;
//!
//! let iso = Isolate::new();
//! let value = Arc::new(Value::new(&iso, 1).unwrap());
//! let shared = value.clone();
//! std::thread::spawn(move || {
//!     // Error: Value is !Sync, so Arc<Value> is !Send
//!     let _ = shared.int32();
//! });
//! ```
//!
//! Values dropped on a thread that is not inside the isolate while another
//! thread runs a script are released once the isolate goes idle.

mod array;
mod config;
mod context;
mod error;
mod exception;
mod function;
mod isolate;
pub mod json;
mod marshal;
mod object;
mod platform;
mod profiler;
mod promise;
mod registry;
mod script;
mod snapshot;
mod string;
mod symbol;
mod template;
mod value;

pub use array::{Array, ArrayBuffer, Uint8Array};
pub use config::IsolateOptions;
pub use context::Context;
pub use error::{JsError, TERMINATED_PREFIX, V8Error, V8Result};
pub use exception::{ErrorKind, Exception};
pub use function::{Function, FunctionCallbackInfo};
pub use isolate::{HeapStatistics, Isolate};
pub use marshal::Primitive;
pub use object::{Object, PropertyValue};
pub use platform::{FLAGS_ENV, initialize, set_flags, version};
pub use profiler::{CpuProfile, CpuProfileNode, CpuProfiler, HeapProfiler};
pub use promise::{Promise, PromiseResolver, PromiseState};
pub use registry::FunctionCallback;
pub use script::{CompileMode, CompileOptions, CompilerCachedData, UnboundScript};
pub use snapshot::{FunctionCodeHandling, SnapshotCreator, StartupData};
pub use symbol::Symbol;
pub use template::{FunctionTemplate, ObjectTemplate, PropertyAttribute, TemplateValue};
pub use value::{Value, ValueKind};

// Re-export the raw bindings for direct FFI access when needed
pub use otter_v8_sys as sys;
