//! Native error values

use std::fmt;

use otter_v8_sys::*;

use crate::error::V8Result;
use crate::isolate::Isolate;
use crate::object::PropertyValue;
use crate::string::{c_len, take_rtn_string};
use crate::value::Value;

/// Native error constructors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorKind {
    Error = OTTER_ERROR,
    RangeError = OTTER_RANGE_ERROR,
    ReferenceError = OTTER_REFERENCE_ERROR,
    SyntaxError = OTTER_SYNTAX_ERROR,
    TypeError = OTTER_TYPE_ERROR,
    WasmCompileError = OTTER_WASM_COMPILE_ERROR,
    WasmLinkError = OTTER_WASM_LINK_ERROR,
    WasmRuntimeError = OTTER_WASM_RUNTIME_ERROR,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Error => "Error",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::WasmCompileError => "CompileError",
            ErrorKind::WasmLinkError => "LinkError",
            ErrorKind::WasmRuntimeError => "RuntimeError",
        })
    }
}

/// A native error object, typically thrown from a host callback.
///
/// ```no_run
/// use otter_v8_core::{Exception, FunctionTemplate, Isolate};
///
/// let iso = Isolate::new();
/// let fail = FunctionTemplate::new(&iso, |info| {
///     if let Ok(err) = Exception::type_error(info.isolate(), "expected a string") {
///         let _ = info.isolate().throw_exception(&err);
///     }
///     None
/// })
/// .unwrap();
/// ```
pub struct Exception {
    value: Value,
}

impl Exception {
    /// Create an error of the given kind with `message`
    pub fn new(iso: &Isolate, kind: ErrorKind, message: &str) -> V8Result<Exception> {
        let len = c_len(message)?;
        let guard = iso.inner().enter()?;
        // SAFETY: guard keeps the isolate alive; message is valid for len bytes
        let ptr = unsafe {
            otter_v8_exception_new(guard.ptr(), kind as OtterErrorKind, message.as_ptr().cast(), len)
        };
        drop(guard);
        // SAFETY: tracked in the internal context
        Ok(Exception {
            value: unsafe { Value::from_raw(ptr, None, iso) },
        })
    }

    /// `new Error(message)`
    pub fn error(iso: &Isolate, message: &str) -> V8Result<Exception> {
        Self::new(iso, ErrorKind::Error, message)
    }

    /// `new RangeError(message)`
    pub fn range_error(iso: &Isolate, message: &str) -> V8Result<Exception> {
        Self::new(iso, ErrorKind::RangeError, message)
    }

    /// `new ReferenceError(message)`
    pub fn reference_error(iso: &Isolate, message: &str) -> V8Result<Exception> {
        Self::new(iso, ErrorKind::ReferenceError, message)
    }

    /// `new SyntaxError(message)`
    pub fn syntax_error(iso: &Isolate, message: &str) -> V8Result<Exception> {
        Self::new(iso, ErrorKind::SyntaxError, message)
    }

    /// `new TypeError(message)`
    pub fn type_error(iso: &Isolate, message: &str) -> V8Result<Exception> {
        Self::new(iso, ErrorKind::TypeError, message)
    }

    /// `new WebAssembly.CompileError(message)`
    pub fn wasm_compile_error(iso: &Isolate, message: &str) -> V8Result<Exception> {
        Self::new(iso, ErrorKind::WasmCompileError, message)
    }

    /// `new WebAssembly.LinkError(message)`
    pub fn wasm_link_error(iso: &Isolate, message: &str) -> V8Result<Exception> {
        Self::new(iso, ErrorKind::WasmLinkError, message)
    }

    /// `new WebAssembly.RuntimeError(message)`
    pub fn wasm_runtime_error(iso: &Isolate, message: &str) -> V8Result<Exception> {
        Self::new(iso, ErrorKind::WasmRuntimeError, message)
    }

    /// The engine's message text, e.g. `"Uncaught TypeError: expected a string"`
    pub fn message(&self) -> V8Result<String> {
        let _guard = self.value.enter()?;
        // SAFETY: guard keeps the error alive
        unsafe { take_rtn_string(otter_v8_exception_message(self.value.raw())) }
    }

    /// Borrow as a plain value
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Convert into a plain value
    pub fn into_value(self) -> Value {
        self.value
    }
}

impl std::ops::Deref for Exception {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.value
    }
}

impl<'a> From<&'a Exception> for PropertyValue<'a> {
    fn from(v: &'a Exception) -> Self {
        PropertyValue::Value(&v.value)
    }
}

impl fmt::Debug for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Exception({})", self.value)
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}
