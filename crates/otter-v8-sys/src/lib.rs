//! Raw FFI bindings to V8
//!
//! V8's C++ API is wrapped by a small C++ bridge (`src/bridge`) that owns all
//! handle scopes, lockers and try/catch blocks and exports a plain C ABI.
//! This crate declares that ABI. Use the safe wrappers in `otter-v8-core`
//! for higher-level access.

#![allow(non_camel_case_types)]

use std::ffi::c_void;
use std::os::raw::{c_char, c_int};

pub mod profile;

pub use profile::{OtterCpuProfile, OtterCpuProfileNode};

// Opaque bridge handles
pub type OtterIsolatePtr = *mut c_void;
pub type OtterContextPtr = *mut c_void;
pub type OtterValuePtr = *mut c_void;
pub type OtterTemplatePtr = *mut c_void;
pub type OtterUnboundScriptPtr = *mut c_void;
pub type OtterCpuProfilerPtr = *mut c_void;
pub type OtterSnapshotCreatorPtr = *mut c_void;

/// Error record. A null `msg` means success; strings are owned by the caller
/// and released with [`otter_v8_free`].
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct OtterRtnError {
    pub msg: *const c_char,
    pub location: *const c_char,
    pub stack: *const c_char,
}

impl OtterRtnError {
    pub fn is_ok(&self) -> bool {
        self.msg.is_null()
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct OtterRtnValue {
    pub value: OtterValuePtr,
    pub error: OtterRtnError,
}

/// Byte string (may contain NULs) plus error record.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct OtterRtnString {
    pub data: *const c_char,
    pub length: c_int,
    pub error: OtterRtnError,
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct OtterRtnUnboundScript {
    pub ptr: OtterUnboundScriptPtr,
    pub cached_data_rejected: c_int,
    pub error: OtterRtnError,
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct OtterCachedData {
    pub data: *const u8,
    pub length: c_int,
    pub rejected: c_int,
}

impl Default for OtterCachedData {
    fn default() -> Self {
        Self {
            data: std::ptr::null(),
            length: 0,
            rejected: 0,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct OtterCompileOptions {
    pub cached_data: OtterCachedData,
    pub compile_mode: c_int,
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct OtterIsolateParams {
    pub initial_heap_size: usize,
    pub maximum_heap_size: usize,
    pub snapshot_data: *const c_char,
    pub snapshot_length: c_int,
    pub capture_stack_traces: c_int,
}

impl Default for OtterIsolateParams {
    fn default() -> Self {
        Self {
            initial_heap_size: 0,
            maximum_heap_size: 0,
            snapshot_data: std::ptr::null(),
            snapshot_length: 0,
            capture_stack_traces: 1,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct OtterHeapStatistics {
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

/// BigInt as sign + little-endian 64-bit words. `words` is malloc'd.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct OtterBigInt {
    pub sign_bit: c_int,
    pub word_count: c_int,
    pub words: *mut u64,
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct OtterRtnSnapshotCreator {
    pub creator: OtterSnapshotCreatorPtr,
    pub iso: OtterIsolatePtr,
}

/// Serialized startup data, released with [`otter_v8_startup_blob_delete`].
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct OtterStartupBlob {
    pub data: *const c_char,
    pub length: c_int,
}

// Value kinds understood by `otter_v8_value_is`
pub type OtterValueKind = c_int;
pub const OTTER_KIND_UNDEFINED: OtterValueKind = 0;
pub const OTTER_KIND_NULL: OtterValueKind = 1;
pub const OTTER_KIND_NULL_OR_UNDEFINED: OtterValueKind = 2;
pub const OTTER_KIND_TRUE: OtterValueKind = 3;
pub const OTTER_KIND_FALSE: OtterValueKind = 4;
pub const OTTER_KIND_NAME: OtterValueKind = 5;
pub const OTTER_KIND_STRING: OtterValueKind = 6;
pub const OTTER_KIND_SYMBOL: OtterValueKind = 7;
pub const OTTER_KIND_FUNCTION: OtterValueKind = 8;
pub const OTTER_KIND_OBJECT: OtterValueKind = 9;
pub const OTTER_KIND_BIG_INT: OtterValueKind = 10;
pub const OTTER_KIND_BOOLEAN: OtterValueKind = 11;
pub const OTTER_KIND_NUMBER: OtterValueKind = 12;
pub const OTTER_KIND_EXTERNAL: OtterValueKind = 13;
pub const OTTER_KIND_INT32: OtterValueKind = 14;
pub const OTTER_KIND_UINT32: OtterValueKind = 15;
pub const OTTER_KIND_DATE: OtterValueKind = 16;
pub const OTTER_KIND_ARGUMENTS_OBJECT: OtterValueKind = 17;
pub const OTTER_KIND_BIG_INT_OBJECT: OtterValueKind = 18;
pub const OTTER_KIND_NUMBER_OBJECT: OtterValueKind = 19;
pub const OTTER_KIND_STRING_OBJECT: OtterValueKind = 20;
pub const OTTER_KIND_SYMBOL_OBJECT: OtterValueKind = 21;
pub const OTTER_KIND_NATIVE_ERROR: OtterValueKind = 22;
pub const OTTER_KIND_REG_EXP: OtterValueKind = 23;
pub const OTTER_KIND_ASYNC_FUNCTION: OtterValueKind = 24;
pub const OTTER_KIND_GENERATOR_FUNCTION: OtterValueKind = 25;
pub const OTTER_KIND_GENERATOR_OBJECT: OtterValueKind = 26;
pub const OTTER_KIND_PROMISE: OtterValueKind = 27;
pub const OTTER_KIND_MAP: OtterValueKind = 28;
pub const OTTER_KIND_SET: OtterValueKind = 29;
pub const OTTER_KIND_MAP_ITERATOR: OtterValueKind = 30;
pub const OTTER_KIND_SET_ITERATOR: OtterValueKind = 31;
pub const OTTER_KIND_WEAK_MAP: OtterValueKind = 32;
pub const OTTER_KIND_WEAK_SET: OtterValueKind = 33;
pub const OTTER_KIND_ARRAY: OtterValueKind = 34;
pub const OTTER_KIND_ARRAY_BUFFER: OtterValueKind = 35;
pub const OTTER_KIND_ARRAY_BUFFER_VIEW: OtterValueKind = 36;
pub const OTTER_KIND_TYPED_ARRAY: OtterValueKind = 37;
pub const OTTER_KIND_UINT8_ARRAY: OtterValueKind = 38;
pub const OTTER_KIND_UINT8_CLAMPED_ARRAY: OtterValueKind = 39;
pub const OTTER_KIND_INT8_ARRAY: OtterValueKind = 40;
pub const OTTER_KIND_UINT16_ARRAY: OtterValueKind = 41;
pub const OTTER_KIND_INT16_ARRAY: OtterValueKind = 42;
pub const OTTER_KIND_UINT32_ARRAY: OtterValueKind = 43;
pub const OTTER_KIND_INT32_ARRAY: OtterValueKind = 44;
pub const OTTER_KIND_FLOAT32_ARRAY: OtterValueKind = 45;
pub const OTTER_KIND_FLOAT64_ARRAY: OtterValueKind = 46;
pub const OTTER_KIND_BIG_INT64_ARRAY: OtterValueKind = 47;
pub const OTTER_KIND_BIG_UINT64_ARRAY: OtterValueKind = 48;
pub const OTTER_KIND_DATA_VIEW: OtterValueKind = 49;
pub const OTTER_KIND_SHARED_ARRAY_BUFFER: OtterValueKind = 50;
pub const OTTER_KIND_PROXY: OtterValueKind = 51;
pub const OTTER_KIND_WASM_MODULE_OBJECT: OtterValueKind = 52;
pub const OTTER_KIND_MODULE_NAMESPACE_OBJECT: OtterValueKind = 53;

// Well-known symbols
pub type OtterSymbolIndex = c_int;
pub const OTTER_SYMBOL_ASYNC_ITERATOR: OtterSymbolIndex = 0;
pub const OTTER_SYMBOL_HAS_INSTANCE: OtterSymbolIndex = 1;
pub const OTTER_SYMBOL_IS_CONCAT_SPREADABLE: OtterSymbolIndex = 2;
pub const OTTER_SYMBOL_ITERATOR: OtterSymbolIndex = 3;
pub const OTTER_SYMBOL_MATCH: OtterSymbolIndex = 4;
pub const OTTER_SYMBOL_REPLACE: OtterSymbolIndex = 5;
pub const OTTER_SYMBOL_SEARCH: OtterSymbolIndex = 6;
pub const OTTER_SYMBOL_SPLIT: OtterSymbolIndex = 7;
pub const OTTER_SYMBOL_TO_PRIMITIVE: OtterSymbolIndex = 8;
pub const OTTER_SYMBOL_TO_STRING_TAG: OtterSymbolIndex = 9;
pub const OTTER_SYMBOL_UNSCOPABLES: OtterSymbolIndex = 10;

// Native error constructors
pub type OtterErrorKind = c_int;
pub const OTTER_ERROR: OtterErrorKind = 0;
pub const OTTER_RANGE_ERROR: OtterErrorKind = 1;
pub const OTTER_REFERENCE_ERROR: OtterErrorKind = 2;
pub const OTTER_SYNTAX_ERROR: OtterErrorKind = 3;
pub const OTTER_TYPE_ERROR: OtterErrorKind = 4;
pub const OTTER_WASM_COMPILE_ERROR: OtterErrorKind = 5;
pub const OTTER_WASM_LINK_ERROR: OtterErrorKind = 6;
pub const OTTER_WASM_RUNTIME_ERROR: OtterErrorKind = 7;

// Script compile modes
pub type OtterCompileMode = c_int;
pub const OTTER_COMPILE_DEFAULT: OtterCompileMode = 0;
pub const OTTER_COMPILE_CONSUME_CODE_CACHE: OtterCompileMode = 1;
pub const OTTER_COMPILE_EAGER: OtterCompileMode = 2;

// Promise states, as reported by V8
pub const OTTER_PROMISE_PENDING: c_int = 0;
pub const OTTER_PROMISE_FULFILLED: c_int = 1;
pub const OTTER_PROMISE_REJECTED: c_int = 2;

// Property attributes
pub const OTTER_PROPERTY_NONE: c_int = 0;
pub const OTTER_PROPERTY_READ_ONLY: c_int = 1 << 0;
pub const OTTER_PROPERTY_DONT_ENUM: c_int = 1 << 1;
pub const OTTER_PROPERTY_DONT_DELETE: c_int = 1 << 2;

// Snapshot function code handling
pub const OTTER_FUNCTION_CODE_CLEAR: c_int = 0;
pub const OTTER_FUNCTION_CODE_KEEP: c_int = 1;

/// Host entry point for every JavaScript call into a host function.
///
/// The host receives ownership of `this` and each entry of `args` and returns
/// an owned value pointer, or null for `undefined`.
pub type OtterFunctionCallback = Option<
    unsafe extern "C" fn(
        ctx_ref: i64,
        cb_ref: i64,
        this: OtterValuePtr,
        args: *const OtterValuePtr,
        args_count: c_int,
    ) -> OtterValuePtr,
>;

// FFI declarations - the bridge and V8 are linked by build.rs
unsafe extern "C" {
    // Platform
    pub fn otter_v8_initialize(callback: OtterFunctionCallback);
    pub fn otter_v8_set_flags(flags: *const c_char);
    pub fn otter_v8_version() -> *const c_char;
    pub fn otter_v8_free(ptr: *mut c_void);

    // Isolate
    pub fn otter_v8_isolate_new(params: OtterIsolateParams) -> OtterIsolatePtr;
    pub fn otter_v8_isolate_dispose(iso: OtterIsolatePtr);
    pub fn otter_v8_isolate_terminate_execution(iso: OtterIsolatePtr);
    pub fn otter_v8_isolate_is_execution_terminating(iso: OtterIsolatePtr) -> c_int;
    pub fn otter_v8_isolate_is_in_use(iso: OtterIsolatePtr) -> c_int;
    pub fn otter_v8_isolate_heap_statistics(iso: OtterIsolatePtr) -> OtterHeapStatistics;
    pub fn otter_v8_isolate_perform_microtask_checkpoint(iso: OtterIsolatePtr);
    pub fn otter_v8_isolate_throw_exception(
        iso: OtterIsolatePtr,
        value: OtterValuePtr,
    ) -> OtterValuePtr;
    pub fn otter_v8_isolate_compile_unbound_script(
        iso: OtterIsolatePtr,
        source: *const c_char,
        source_length: c_int,
        origin: *const c_char,
        options: OtterCompileOptions,
    ) -> OtterRtnUnboundScript;

    // Context
    pub fn otter_v8_context_new(
        iso: OtterIsolatePtr,
        global: OtterTemplatePtr,
        ctx_ref: i64,
    ) -> OtterContextPtr;
    pub fn otter_v8_context_from_snapshot(
        iso: OtterIsolatePtr,
        index: usize,
        ctx_ref: i64,
    ) -> OtterContextPtr;
    pub fn otter_v8_context_free(ctx: OtterContextPtr);
    pub fn otter_v8_context_global(ctx: OtterContextPtr) -> OtterValuePtr;
    pub fn otter_v8_context_run_script(
        ctx: OtterContextPtr,
        source: *const c_char,
        source_length: c_int,
        origin: *const c_char,
    ) -> OtterRtnValue;
    pub fn otter_v8_json_parse(
        ctx: OtterContextPtr,
        json: *const c_char,
        json_length: c_int,
    ) -> OtterRtnValue;
    pub fn otter_v8_json_stringify(ctx: OtterContextPtr, value: OtterValuePtr)
    -> OtterRtnString;

    // UnboundScript
    pub fn otter_v8_unbound_script_run(
        ctx: OtterContextPtr,
        script: OtterUnboundScriptPtr,
    ) -> OtterRtnValue;
    pub fn otter_v8_unbound_script_create_code_cache(
        iso: OtterIsolatePtr,
        script: OtterUnboundScriptPtr,
    ) -> *mut OtterCachedData;
    pub fn otter_v8_cached_data_delete(data: *mut OtterCachedData);
    pub fn otter_v8_unbound_script_free(iso: OtterIsolatePtr, script: OtterUnboundScriptPtr);

    // Value constructors
    pub fn otter_v8_value_new_integer(iso: OtterIsolatePtr, v: i32) -> OtterValuePtr;
    pub fn otter_v8_value_new_unsigned(iso: OtterIsolatePtr, v: u32) -> OtterValuePtr;
    pub fn otter_v8_value_new_number(iso: OtterIsolatePtr, v: f64) -> OtterValuePtr;
    pub fn otter_v8_value_new_boolean(iso: OtterIsolatePtr, v: c_int) -> OtterValuePtr;
    pub fn otter_v8_value_new_null(iso: OtterIsolatePtr) -> OtterValuePtr;
    pub fn otter_v8_value_new_undefined(iso: OtterIsolatePtr) -> OtterValuePtr;
    pub fn otter_v8_value_new_string(
        iso: OtterIsolatePtr,
        data: *const c_char,
        length: c_int,
    ) -> OtterRtnValue;
    pub fn otter_v8_value_new_big_int(
        iso: OtterIsolatePtr,
        sign_bit: c_int,
        word_count: c_int,
        words: *const u64,
    ) -> OtterRtnValue;
    pub fn otter_v8_value_new_uint8_array(
        iso: OtterIsolatePtr,
        data: *const u8,
        length: usize,
    ) -> OtterValuePtr;

    // Value lifetime
    pub fn otter_v8_value_copy(value: OtterValuePtr) -> OtterValuePtr;
    pub fn otter_v8_value_release(value: OtterValuePtr);

    // Value predicates and accessors
    pub fn otter_v8_value_is(value: OtterValuePtr, kind: OtterValueKind) -> c_int;
    pub fn otter_v8_value_same_value(a: OtterValuePtr, b: OtterValuePtr) -> c_int;
    pub fn otter_v8_value_strict_equals(a: OtterValuePtr, b: OtterValuePtr) -> c_int;
    pub fn otter_v8_value_to_string(value: OtterValuePtr) -> OtterRtnString;
    pub fn otter_v8_value_to_detail_string(value: OtterValuePtr) -> OtterRtnString;
    pub fn otter_v8_value_to_int32(value: OtterValuePtr) -> i32;
    pub fn otter_v8_value_to_uint32(value: OtterValuePtr) -> u32;
    pub fn otter_v8_value_to_int64(value: OtterValuePtr) -> i64;
    pub fn otter_v8_value_to_uint64(value: OtterValuePtr) -> u64;
    pub fn otter_v8_value_to_number(value: OtterValuePtr) -> f64;
    pub fn otter_v8_value_to_boolean(value: OtterValuePtr) -> c_int;
    pub fn otter_v8_value_to_big_int(value: OtterValuePtr) -> OtterBigInt;
    pub fn otter_v8_value_to_object(value: OtterValuePtr) -> OtterRtnValue;
    pub fn otter_v8_value_to_uint8_array(value: OtterValuePtr, length: *mut usize) -> *mut u8;

    // Object
    pub fn otter_v8_object_set(
        obj: OtterValuePtr,
        key: *const c_char,
        key_length: c_int,
        value: OtterValuePtr,
    ) -> OtterRtnError;
    pub fn otter_v8_object_set_index(
        obj: OtterValuePtr,
        index: u32,
        value: OtterValuePtr,
    ) -> OtterRtnError;
    pub fn otter_v8_object_set_key(
        obj: OtterValuePtr,
        key: OtterValuePtr,
        value: OtterValuePtr,
    ) -> OtterRtnError;
    pub fn otter_v8_object_get(
        obj: OtterValuePtr,
        key: *const c_char,
        key_length: c_int,
    ) -> OtterRtnValue;
    pub fn otter_v8_object_get_index(obj: OtterValuePtr, index: u32) -> OtterRtnValue;
    pub fn otter_v8_object_get_key(obj: OtterValuePtr, key: OtterValuePtr) -> OtterRtnValue;
    pub fn otter_v8_object_has(obj: OtterValuePtr, key: *const c_char, key_length: c_int)
    -> c_int;
    pub fn otter_v8_object_has_index(obj: OtterValuePtr, index: u32) -> c_int;
    pub fn otter_v8_object_delete(
        obj: OtterValuePtr,
        key: *const c_char,
        key_length: c_int,
    ) -> c_int;
    pub fn otter_v8_object_delete_index(obj: OtterValuePtr, index: u32) -> c_int;
    pub fn otter_v8_object_internal_field_count(obj: OtterValuePtr) -> c_int;

    // Array / ArrayBuffer / Uint8Array
    pub fn otter_v8_array_new(ctx: OtterContextPtr, length: u32) -> OtterValuePtr;
    pub fn otter_v8_array_length(array: OtterValuePtr) -> u32;
    pub fn otter_v8_array_buffer_new(ctx: OtterContextPtr, length: usize) -> OtterValuePtr;
    pub fn otter_v8_array_buffer_byte_length(buffer: OtterValuePtr) -> usize;
    pub fn otter_v8_array_buffer_copy_bytes(buffer: OtterValuePtr, dest: *mut u8, length: usize);
    pub fn otter_v8_array_buffer_put_bytes(
        buffer: OtterValuePtr,
        offset: usize,
        src: *const u8,
        length: usize,
    );
    pub fn otter_v8_uint8_array_new(
        buffer: OtterValuePtr,
        offset: usize,
        length: usize,
    ) -> OtterValuePtr;
    pub fn otter_v8_uint8_array_buffer(array: OtterValuePtr) -> OtterValuePtr;

    // Function
    pub fn otter_v8_function_call(
        function: OtterValuePtr,
        recv: OtterValuePtr,
        argc: c_int,
        argv: *const OtterValuePtr,
    ) -> OtterRtnValue;
    pub fn otter_v8_function_new_instance(
        function: OtterValuePtr,
        argc: c_int,
        argv: *const OtterValuePtr,
    ) -> OtterRtnValue;
    pub fn otter_v8_function_source_map_url(function: OtterValuePtr) -> OtterValuePtr;

    // Templates
    pub fn otter_v8_object_template_new(iso: OtterIsolatePtr) -> OtterTemplatePtr;
    pub fn otter_v8_function_template_new(iso: OtterIsolatePtr, cb_ref: i64) -> OtterTemplatePtr;
    pub fn otter_v8_template_free(iso: OtterIsolatePtr, tmpl: OtterTemplatePtr);
    pub fn otter_v8_template_set_value(
        tmpl: OtterTemplatePtr,
        name: *const c_char,
        name_length: c_int,
        value: OtterValuePtr,
        attributes: c_int,
    );
    pub fn otter_v8_template_set_template(
        tmpl: OtterTemplatePtr,
        name: *const c_char,
        name_length: c_int,
        value: OtterTemplatePtr,
        attributes: c_int,
    );
    pub fn otter_v8_template_set_symbol_value(
        tmpl: OtterTemplatePtr,
        key: OtterValuePtr,
        value: OtterValuePtr,
        attributes: c_int,
    );
    pub fn otter_v8_template_set_symbol_template(
        tmpl: OtterTemplatePtr,
        key: OtterValuePtr,
        value: OtterTemplatePtr,
        attributes: c_int,
    );
    pub fn otter_v8_object_template_new_instance(
        tmpl: OtterTemplatePtr,
        ctx: OtterContextPtr,
    ) -> OtterRtnValue;
    pub fn otter_v8_object_template_set_internal_field_count(tmpl: OtterTemplatePtr, count: c_int);
    pub fn otter_v8_object_template_internal_field_count(tmpl: OtterTemplatePtr) -> c_int;
    pub fn otter_v8_function_template_get_function(
        tmpl: OtterTemplatePtr,
        ctx: OtterContextPtr,
    ) -> OtterRtnValue;

    // Promise
    pub fn otter_v8_promise_resolver_new(ctx: OtterContextPtr) -> OtterRtnValue;
    pub fn otter_v8_promise_resolver_get_promise(resolver: OtterValuePtr) -> OtterValuePtr;
    pub fn otter_v8_promise_resolver_resolve(resolver: OtterValuePtr, value: OtterValuePtr)
    -> c_int;
    pub fn otter_v8_promise_resolver_reject(resolver: OtterValuePtr, value: OtterValuePtr) -> c_int;
    pub fn otter_v8_promise_state(promise: OtterValuePtr) -> c_int;
    pub fn otter_v8_promise_result(promise: OtterValuePtr) -> OtterValuePtr;
    pub fn otter_v8_promise_then(promise: OtterValuePtr, cb_ref: i64) -> OtterRtnValue;
    pub fn otter_v8_promise_then2(
        promise: OtterValuePtr,
        on_fulfilled_ref: i64,
        on_rejected_ref: i64,
    ) -> OtterRtnValue;
    pub fn otter_v8_promise_catch(promise: OtterValuePtr, cb_ref: i64) -> OtterRtnValue;

    // Symbol / Exception
    pub fn otter_v8_symbol_builtin(iso: OtterIsolatePtr, index: OtterSymbolIndex)
    -> OtterValuePtr;
    pub fn otter_v8_symbol_description(symbol: OtterValuePtr) -> OtterRtnString;
    pub fn otter_v8_exception_new(
        iso: OtterIsolatePtr,
        kind: OtterErrorKind,
        message: *const c_char,
        message_length: c_int,
    ) -> OtterValuePtr;
    pub fn otter_v8_exception_message(exception: OtterValuePtr) -> OtterRtnString;

    // Profiling
    pub fn otter_v8_cpu_profiler_new(iso: OtterIsolatePtr) -> OtterCpuProfilerPtr;
    pub fn otter_v8_cpu_profiler_dispose(profiler: OtterCpuProfilerPtr);
    pub fn otter_v8_cpu_profiler_start(profiler: OtterCpuProfilerPtr, title: *const c_char);
    pub fn otter_v8_cpu_profiler_stop(
        profiler: OtterCpuProfilerPtr,
        title: *const c_char,
    ) -> *mut OtterCpuProfile;
    pub fn otter_v8_cpu_profile_delete(profile: *mut OtterCpuProfile);
    pub fn otter_v8_heap_snapshot(iso: OtterIsolatePtr) -> OtterRtnString;

    // SnapshotCreator
    pub fn otter_v8_snapshot_creator_new() -> OtterRtnSnapshotCreator;
    pub fn otter_v8_snapshot_creator_delete(creator: OtterSnapshotCreatorPtr);
    pub fn otter_v8_snapshot_creator_set_default_context(
        creator: OtterSnapshotCreatorPtr,
        ctx: OtterContextPtr,
    );
    pub fn otter_v8_snapshot_creator_add_context(
        creator: OtterSnapshotCreatorPtr,
        ctx: OtterContextPtr,
    ) -> usize;
    pub fn otter_v8_snapshot_creator_create_blob(
        creator: OtterSnapshotCreatorPtr,
        function_code_handling: c_int,
    ) -> OtterStartupBlob;
    pub fn otter_v8_startup_blob_delete(blob: OtterStartupBlob);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rtn_error_success_is_null_message() {
        let err = OtterRtnError {
            msg: std::ptr::null(),
            location: std::ptr::null(),
            stack: std::ptr::null(),
        };
        assert!(err.is_ok());
    }

    #[test]
    fn test_default_isolate_params_capture_stack_traces() {
        let params = OtterIsolateParams::default();
        assert_eq!(params.capture_stack_traces, 1);
        assert!(params.snapshot_data.is_null());
        assert_eq!(params.maximum_heap_size, 0);
    }

    #[test]
    fn test_property_attributes_are_distinct_bits() {
        assert_eq!(
            OTTER_PROPERTY_READ_ONLY | OTTER_PROPERTY_DONT_ENUM | OTTER_PROPERTY_DONT_DELETE,
            0b111
        );
    }
}
