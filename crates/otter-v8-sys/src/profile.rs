//! CPU profile records
//!
//! The bridge deep-copies a V8 profile into these heap records so the call
//! tree survives profile deletion. Release with `otter_v8_cpu_profile_delete`.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_uint};

#[repr(C)]
#[derive(Debug)]
pub struct OtterCpuProfileNode {
    pub node_id: c_uint,
    pub script_id: c_int,
    pub script_resource_name: *const c_char,
    pub function_name: *const c_char,
    pub line_number: c_int,
    pub column_number: c_int,
    pub hit_count: c_uint,
    pub bailout_reason: *const c_char,
    pub children_count: c_int,
    pub children: *mut *mut OtterCpuProfileNode,
}

impl OtterCpuProfileNode {
    /// Borrow the node's children.
    ///
    /// # Safety
    /// `self` must come from a live profile returned by the bridge.
    pub unsafe fn children(&self) -> &[*mut OtterCpuProfileNode] {
        if self.children.is_null() || self.children_count <= 0 {
            return &[];
        }
        // SAFETY: the bridge allocates exactly `children_count` entries
        unsafe { std::slice::from_raw_parts(self.children, self.children_count as usize) }
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct OtterCpuProfile {
    pub title: *const c_char,
    pub start_time: i64,
    pub end_time: i64,
    pub root: *mut OtterCpuProfileNode,
}

/// Copy a bridge-owned C string, treating null as empty.
///
/// # Safety
/// `ptr` must be null or a valid NUL-terminated string.
pub unsafe fn lossy_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    // SAFETY: caller guarantees a NUL-terminated string
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lossy_string_null_is_empty() {
        assert_eq!(unsafe { lossy_string(std::ptr::null()) }, "");
    }

    #[test]
    fn test_leaf_node_has_no_children() {
        let node = OtterCpuProfileNode {
            node_id: 1,
            script_id: 0,
            script_resource_name: std::ptr::null(),
            function_name: c"(root)".as_ptr(),
            line_number: 0,
            column_number: 0,
            hit_count: 0,
            bailout_reason: std::ptr::null(),
            children_count: 0,
            children: std::ptr::null_mut(),
        };
        assert!(unsafe { node.children() }.is_empty());
        assert_eq!(unsafe { lossy_string(node.function_name) }, "(root)");
    }
}
