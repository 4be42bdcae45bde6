//! String transfer between Rust and the bridge
//!
//! Strings returned by the bridge are malloc'd and must be released with
//! `otter_v8_free` exactly once; these helpers take ownership and copy them
//! into Rust strings.

use std::ffi::{CStr, CString, c_char, c_int, c_void};

use otter_v8_sys::{OtterRtnString, otter_v8_free};

use crate::error::{JsError, V8Error, V8Result};

/// Copy and release a NUL-terminated bridge string, treating null as empty.
///
/// # Safety
/// `ptr` must be null or an unowned bridge allocation.
pub(crate) unsafe fn take_cstring(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    // SAFETY: caller guarantees a NUL-terminated allocation we now own
    unsafe {
        let s = CStr::from_ptr(ptr).to_string_lossy().into_owned();
        otter_v8_free(ptr as *mut c_void);
        s
    }
}

/// Take ownership of a length-delimited bridge string.
///
/// # Safety
/// The record's buffers must be unowned bridge allocations.
pub(crate) unsafe fn take_rtn_string(rtn: OtterRtnString) -> V8Result<String> {
    // SAFETY: forwarded caller contract
    if let Some(err) = unsafe { JsError::from_rtn(rtn.error) } {
        // SAFETY: data is null or owned by us
        unsafe { otter_v8_free(rtn.data as *mut c_void) };
        return Err(err.into());
    }
    if rtn.data.is_null() {
        return Ok(String::new());
    }
    let len = usize::try_from(rtn.length).unwrap_or(0);
    // SAFETY: the bridge allocated `length` bytes (plus a trailing NUL)
    unsafe {
        let bytes = std::slice::from_raw_parts(rtn.data.cast::<u8>(), len);
        let s = String::from_utf8_lossy(bytes).into_owned();
        otter_v8_free(rtn.data as *mut c_void);
        Ok(s)
    }
}

/// Length of a string as the bridge's `int` length argument
pub(crate) fn c_len(s: &str) -> V8Result<c_int> {
    c_int::try_from(s.len())
        .map_err(|_| V8Error::invalid_argument(format!("string of {} bytes is too long", s.len())))
}

/// Convert to a NUL-terminated string for bridge arguments such as origins
pub(crate) fn to_cstring(s: &str) -> V8Result<CString> {
    CString::new(s).map_err(|e| V8Error::invalid_argument(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_cstring_null_is_empty() {
        assert_eq!(unsafe { take_cstring(std::ptr::null()) }, "");
    }

    #[test]
    fn test_to_cstring_rejects_interior_nul() {
        assert!(matches!(
            to_cstring("a\0b"),
            Err(V8Error::InvalidArgument(_))
        ));
        assert_eq!(to_cstring("origin.js").unwrap().as_bytes(), b"origin.js");
    }

    #[test]
    fn test_c_len_matches_utf8_length() {
        assert_eq!(c_len("héllo").unwrap(), 6);
    }
}
