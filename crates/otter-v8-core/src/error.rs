//! Error types for V8 operations
//!
//! Script failures keep the engine's message, location and stack trace so
//! callers can render them the same way the engine would.

use std::ffi::c_void;
use std::fmt;

use otter_v8_sys::{OtterRtnError, otter_v8_free};
use thiserror::Error;

use crate::string::take_cstring;

/// Result type alias for V8 operations
pub type V8Result<T> = Result<T, V8Error>;

/// Structured error types for V8 operations
#[derive(Debug, Error)]
pub enum V8Error {
    /// JavaScript exception, termination or engine failure
    #[error(transparent)]
    Js(#[from] JsError),

    /// Value cannot be stored in a template
    #[error("Unsupported property: {0}")]
    UnsupportedProperty(String),

    /// Type conversion error
    #[error("Type error: expected {expected}, got {actual}")]
    TypeError { expected: String, actual: String },

    /// Argument rejected before reaching the engine
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The owning isolate has been disposed
    #[error("Isolate has been disposed")]
    IsolateDisposed,

    /// The owning context has been closed
    #[error("Context has been closed")]
    ContextClosed,

    /// Byte range outside an array buffer
    #[error("Out of bounds: {len} bytes at offset {offset} exceed capacity {capacity}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },

    /// Snapshot creator refused the operation
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal/unexpected error
    #[error("Internal V8 error: {0}")]
    Internal(String),
}

impl V8Error {
    /// Create a type error
    pub fn type_error(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeError {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a snapshot error
    pub fn snapshot(message: impl Into<String>) -> Self {
        Self::Snapshot(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error was raised by JavaScript
    pub fn is_script_error(&self) -> bool {
        matches!(self, Self::Js(_))
    }

    /// Borrow the JavaScript error, if any
    pub fn as_js_error(&self) -> Option<&JsError> {
        match self {
            Self::Js(e) => Some(e),
            _ => None,
        }
    }

    /// Check if this error comes from `Isolate::terminate_execution`
    pub fn is_terminated(&self) -> bool {
        self.as_js_error().is_some_and(JsError::is_terminated)
    }
}

/// Prefix of the message reported for terminated executions
pub const TERMINATED_PREFIX: &str = "ExecutionTerminated:";

/// A JavaScript error as reported by the engine.
///
/// `{}` prints the message, `{:#}` the full stack trace and `{:?}` the quoted
/// message.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct JsError {
    /// Exception converted to a string, e.g. `"ReferenceError: x is not defined"`
    pub message: String,
    /// `"<origin>:<line>:<column>"`, empty when the engine has no position
    pub location: String,
    /// Engine stack trace, empty when unavailable
    pub stack_trace: String,
}

impl JsError {
    /// Create an error with only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Take ownership of a bridge error record.
    ///
    /// Returns `None` for a success record.
    ///
    /// # Safety
    /// The record's strings must be unowned allocations from the bridge.
    pub(crate) unsafe fn from_rtn(rtn: OtterRtnError) -> Option<Self> {
        if rtn.is_ok() {
            // SAFETY: success records may still carry stray allocations
            unsafe {
                otter_v8_free(rtn.location as *mut c_void);
                otter_v8_free(rtn.stack as *mut c_void);
            }
            return None;
        }
        // SAFETY: each string is a bridge allocation released exactly once here
        unsafe {
            Some(Self {
                message: take_cstring(rtn.msg),
                location: take_cstring(rtn.location),
                stack_trace: take_cstring(rtn.stack),
            })
        }
    }

    /// Check if this error was produced by a terminated execution
    pub fn is_terminated(&self) -> bool {
        self.message.starts_with(TERMINATED_PREFIX)
    }
}

impl fmt::Display for JsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !f.alternate() || self.stack_trace.is_empty() {
            return f.write_str(&self.message);
        }
        // Some engine errors have no stack beyond the message line
        if self.stack_trace == self.message && !self.location.is_empty() {
            return write!(f, "{} (at {})", self.stack_trace, self.location);
        }
        f.write_str(&self.stack_trace)
    }
}

impl fmt::Debug for JsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.message)
    }
}

impl std::error::Error for JsError {}

/// Convert a bridge error record into a result.
///
/// # Safety
/// Same contract as [`JsError::from_rtn`].
pub(crate) unsafe fn check(rtn: OtterRtnError) -> V8Result<()> {
    // SAFETY: forwarded caller contract
    match unsafe { JsError::from_rtn(rtn) } {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}
