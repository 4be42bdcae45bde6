//! JavaScript values
//!
//! A [`Value`] owns one engine reference. Values created from an isolate
//! alone (fresh strings, numbers, symbols) belong to the isolate's internal
//! context; everything else belongs to the context it was produced in.

use std::cell::Cell;
use std::ffi::{c_int, c_void};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use num_bigint::BigInt;
use otter_v8_sys::*;
use parking_lot::RwLockReadGuard;

use crate::array::{Array, ArrayBuffer, Uint8Array};
use crate::context::{Context, ContextInner};
use crate::error::{JsError, V8Error, V8Result};
use crate::function::Function;
use crate::isolate::{Isolate, IsolateGuard, RawPtr, Release};
use crate::marshal::{Primitive, bigint_to_words, words_to_bigint};
use crate::object::Object;
use crate::promise::{Promise, PromiseResolver};
use crate::string::{c_len, take_rtn_string};
use crate::symbol::Symbol;

/// Engine value kinds understood by [`Value::is`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ValueKind {
    Undefined = OTTER_KIND_UNDEFINED,
    Null = OTTER_KIND_NULL,
    NullOrUndefined = OTTER_KIND_NULL_OR_UNDEFINED,
    True = OTTER_KIND_TRUE,
    False = OTTER_KIND_FALSE,
    Name = OTTER_KIND_NAME,
    String = OTTER_KIND_STRING,
    Symbol = OTTER_KIND_SYMBOL,
    Function = OTTER_KIND_FUNCTION,
    Object = OTTER_KIND_OBJECT,
    BigInt = OTTER_KIND_BIG_INT,
    Boolean = OTTER_KIND_BOOLEAN,
    Number = OTTER_KIND_NUMBER,
    External = OTTER_KIND_EXTERNAL,
    Int32 = OTTER_KIND_INT32,
    Uint32 = OTTER_KIND_UINT32,
    Date = OTTER_KIND_DATE,
    ArgumentsObject = OTTER_KIND_ARGUMENTS_OBJECT,
    BigIntObject = OTTER_KIND_BIG_INT_OBJECT,
    NumberObject = OTTER_KIND_NUMBER_OBJECT,
    StringObject = OTTER_KIND_STRING_OBJECT,
    SymbolObject = OTTER_KIND_SYMBOL_OBJECT,
    NativeError = OTTER_KIND_NATIVE_ERROR,
    RegExp = OTTER_KIND_REG_EXP,
    AsyncFunction = OTTER_KIND_ASYNC_FUNCTION,
    GeneratorFunction = OTTER_KIND_GENERATOR_FUNCTION,
    GeneratorObject = OTTER_KIND_GENERATOR_OBJECT,
    Promise = OTTER_KIND_PROMISE,
    Map = OTTER_KIND_MAP,
    Set = OTTER_KIND_SET,
    MapIterator = OTTER_KIND_MAP_ITERATOR,
    SetIterator = OTTER_KIND_SET_ITERATOR,
    WeakMap = OTTER_KIND_WEAK_MAP,
    WeakSet = OTTER_KIND_WEAK_SET,
    Array = OTTER_KIND_ARRAY,
    ArrayBuffer = OTTER_KIND_ARRAY_BUFFER,
    ArrayBufferView = OTTER_KIND_ARRAY_BUFFER_VIEW,
    TypedArray = OTTER_KIND_TYPED_ARRAY,
    Uint8Array = OTTER_KIND_UINT8_ARRAY,
    Uint8ClampedArray = OTTER_KIND_UINT8_CLAMPED_ARRAY,
    Int8Array = OTTER_KIND_INT8_ARRAY,
    Uint16Array = OTTER_KIND_UINT16_ARRAY,
    Int16Array = OTTER_KIND_INT16_ARRAY,
    Uint32Array = OTTER_KIND_UINT32_ARRAY,
    Int32Array = OTTER_KIND_INT32_ARRAY,
    Float32Array = OTTER_KIND_FLOAT32_ARRAY,
    Float64Array = OTTER_KIND_FLOAT64_ARRAY,
    BigInt64Array = OTTER_KIND_BIG_INT64_ARRAY,
    BigUint64Array = OTTER_KIND_BIG_UINT64_ARRAY,
    DataView = OTTER_KIND_DATA_VIEW,
    SharedArrayBuffer = OTTER_KIND_SHARED_ARRAY_BUFFER,
    Proxy = OTTER_KIND_PROXY,
    WasmModuleObject = OTTER_KIND_WASM_MODULE_OBJECT,
    ModuleNamespaceObject = OTTER_KIND_MODULE_NAMESPACE_OBJECT,
}

/// Kinds checked, most specific first, when naming a value's type in errors
const TYPE_NAMES: &[(ValueKind, &str)] = &[
    (ValueKind::Undefined, "Undefined"),
    (ValueKind::Null, "Null"),
    (ValueKind::Boolean, "Boolean"),
    (ValueKind::Number, "Number"),
    (ValueKind::BigInt, "BigInt"),
    (ValueKind::String, "String"),
    (ValueKind::Symbol, "Symbol"),
    (ValueKind::Function, "Function"),
    (ValueKind::Array, "Array"),
    (ValueKind::Promise, "Promise"),
    (ValueKind::Uint8Array, "Uint8Array"),
    (ValueKind::ArrayBuffer, "ArrayBuffer"),
    (ValueKind::NativeError, "Error"),
    (ValueKind::Object, "Object"),
];

/// Bookkeeping for one bridge call on a value.
pub(crate) struct ValueGuard<'a> {
    _ctx: Option<RwLockReadGuard<'a, RawPtr>>,
    iso: IsolateGuard<'a>,
}

impl ValueGuard<'_> {
    pub(crate) fn isolate_ptr(&self) -> OtterIsolatePtr {
        self.iso.ptr()
    }
}

/// A JavaScript value.
///
/// `Clone` creates a new engine reference; `Drop` releases it.
///
/// # Thread Safety
///
/// `Value` is `Send` but `!Sync`: a handle may move to another thread (for
/// example a promise resolver handed to a worker) but cannot be shared. The
/// engine serializes calls from different threads on the same isolate.
///
/// ```compile_fail
/// fn assert_sync<T: Sync>() {}
/// assert_sync::<otter_v8_core::Value>();
/// ```
pub struct Value {
    ptr: RawPtr,
    ctx: Option<Arc<ContextInner>>,
    iso: Isolate,
    _not_sync: PhantomData<Cell<()>>,
}

macro_rules! kind_predicates {
    ($($(#[$doc:meta])* $name:ident => $kind:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name(&self) -> bool {
                self.is(ValueKind::$kind)
            }
        )*
    };
}

macro_rules! typed_views {
    ($($(#[$doc:meta])* $as_name:ident, $into_name:ident => $ty:ident if $kind:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $as_name(&self) -> V8Result<$ty> {
                drop(self.enter()?);
                self.clone().$into_name()
            }

            $(#[$doc])*
            pub fn $into_name(self) -> V8Result<$ty> {
                drop(self.enter()?);
                if !self.is(ValueKind::$kind) {
                    return Err(V8Error::type_error(stringify!($ty), self.type_name()));
                }
                Ok($ty::from_value(self))
            }
        )*
    };
}

impl Value {
    /// Create a value from a host primitive.
    ///
    /// ```no_run
    /// use otter_v8_core::{Isolate, Value};
    ///
    /// let iso = Isolate::new();
    /// let s = Value::new(&iso, "hello").unwrap();
    /// let n = Value::new(&iso, 42).unwrap();
    /// assert!(s.is_string() && n.is_int32());
    /// ```
    pub fn new(iso: &Isolate, value: impl Into<Primitive>) -> V8Result<Value> {
        let guard = iso.inner().enter()?;
        let iso_ptr = guard.ptr();
        // SAFETY: iso_ptr is entered; every buffer outlives its call
        unsafe {
            let ptr = match value.into() {
                Primitive::String(s) => {
                    let len = c_len(&s)?;
                    let rtn = otter_v8_value_new_string(iso_ptr, s.as_ptr().cast(), len);
                    return Value::from_rtn(rtn, None, iso);
                }
                Primitive::BigInt(b) => {
                    let (negative, words) = bigint_to_words(&b);
                    let count = c_int::try_from(words.len())
                        .map_err(|_| V8Error::invalid_argument("bigint is too large"))?;
                    let rtn = otter_v8_value_new_big_int(
                        iso_ptr,
                        c_int::from(negative),
                        count,
                        words.as_ptr(),
                    );
                    return Value::from_rtn(rtn, None, iso);
                }
                Primitive::Int32(v) => otter_v8_value_new_integer(iso_ptr, v),
                Primitive::Uint32(v) => otter_v8_value_new_unsigned(iso_ptr, v),
                // Beyond 2^53 the nearest double is used
                Primitive::Int64(v) => otter_v8_value_new_number(iso_ptr, v as f64),
                Primitive::Uint64(v) => otter_v8_value_new_number(iso_ptr, v as f64),
                Primitive::Number(v) => otter_v8_value_new_number(iso_ptr, v),
                Primitive::Boolean(v) => otter_v8_value_new_boolean(iso_ptr, c_int::from(v)),
                Primitive::Bytes(b) => otter_v8_value_new_uint8_array(iso_ptr, b.as_ptr(), b.len()),
            };
            Ok(Value::from_raw(ptr, None, iso))
        }
    }

    /// The `undefined` value
    pub fn undefined(iso: &Isolate) -> V8Result<Value> {
        let guard = iso.inner().enter()?;
        // SAFETY: guard keeps the isolate alive
        let ptr = unsafe { otter_v8_value_new_undefined(guard.ptr()) };
        // SAFETY: tracked in the internal context
        Ok(unsafe { Value::from_raw(ptr, None, iso) })
    }

    /// The `null` value
    pub fn null(iso: &Isolate) -> V8Result<Value> {
        let guard = iso.inner().enter()?;
        // SAFETY: guard keeps the isolate alive
        let ptr = unsafe { otter_v8_value_new_null(guard.ptr()) };
        // SAFETY: tracked in the internal context
        Ok(unsafe { Value::from_raw(ptr, None, iso) })
    }

    /// Parse JSON into a value
    pub fn from_json(ctx: &Context, json: &str) -> V8Result<Value> {
        crate::json::parse(ctx, json)
    }

    /// Wrap an owned bridge handle.
    ///
    /// # Safety
    /// `ptr` must be an unowned handle tracked in `ctx` (or the internal
    /// context when `None`) of `iso`.
    pub(crate) unsafe fn from_raw(
        ptr: OtterValuePtr,
        ctx: Option<&Arc<ContextInner>>,
        iso: &Isolate,
    ) -> Value {
        Value {
            ptr: RawPtr(ptr),
            ctx: ctx.cloned(),
            iso: iso.clone(),
            _not_sync: PhantomData,
        }
    }

    /// Wrap a bridge value record.
    ///
    /// # Safety
    /// Same contract as [`Value::from_raw`] for the value, and the error
    /// strings must be unowned.
    pub(crate) unsafe fn from_rtn(
        rtn: OtterRtnValue,
        ctx: Option<&Arc<ContextInner>>,
        iso: &Isolate,
    ) -> V8Result<Value> {
        // SAFETY: forwarded caller contract
        unsafe {
            if let Some(err) = JsError::from_rtn(rtn.error) {
                return Err(err.into());
            }
            if rtn.value.is_null() {
                return Err(V8Error::internal("engine returned no value"));
            }
            Ok(Value::from_raw(rtn.value, ctx, iso))
        }
    }

    /// Wrap a handle the bridge derived from this value.
    ///
    /// # Safety
    /// `ptr` must be an unowned handle tracked in this value's context.
    pub(crate) unsafe fn derive(&self, ptr: OtterValuePtr) -> Value {
        // SAFETY: forwarded caller contract
        unsafe { Value::from_raw(ptr, self.ctx.as_ref(), &self.iso) }
    }

    /// Wrap a value record the bridge derived from this value.
    ///
    /// # Safety
    /// Same contract as [`Value::from_rtn`] with this value's context.
    pub(crate) unsafe fn derive_rtn(&self, rtn: OtterRtnValue) -> V8Result<Value> {
        // SAFETY: forwarded caller contract
        unsafe { Value::from_rtn(rtn, self.ctx.as_ref(), &self.iso) }
    }

    pub(crate) fn raw(&self) -> OtterValuePtr {
        self.ptr.0
    }

    /// Hand the engine reference to the bridge.
    pub(crate) fn into_raw(mut self) -> OtterValuePtr {
        std::mem::replace(&mut self.ptr, RawPtr::NULL).0
    }

    /// Enter the isolate (and context) for a bridge call on this value.
    pub(crate) fn enter(&self) -> V8Result<ValueGuard<'_>> {
        let iso = self.iso.inner().enter()?;
        let ctx = match &self.ctx {
            Some(ctx) => {
                let ptr = ctx.read_ptr();
                if ptr.is_null() {
                    return Err(V8Error::ContextClosed);
                }
                Some(ptr)
            }
            None => None,
        };
        Ok(ValueGuard { _ctx: ctx, iso })
    }

    /// Enter for an infallible accessor.
    ///
    /// # Panics
    /// When the isolate is disposed or the context closed.
    pub(crate) fn enter_live(&self) -> ValueGuard<'_> {
        match self.enter() {
            Ok(guard) => guard,
            Err(e) => panic!("value used after release: {e}"),
        }
    }

    /// The owning isolate
    pub fn isolate(&self) -> &Isolate {
        &self.iso
    }

    /// The owning context, `None` for values created from the isolate alone
    pub fn context(&self) -> Option<Context> {
        self.ctx.clone().map(Context::from_inner)
    }

    pub(crate) fn context_inner(&self) -> Option<&Arc<ContextInner>> {
        self.ctx.as_ref()
    }

    /// Check the value's kind
    pub fn is(&self, kind: ValueKind) -> bool {
        let _guard = self.enter_live();
        // SAFETY: guard keeps the value alive
        unsafe { otter_v8_value_is(self.raw(), kind as OtterValueKind) != 0 }
    }

    kind_predicates! {
        /// `undefined`
        is_undefined => Undefined,
        /// `null`
        is_null => Null,
        /// `null` or `undefined`
        is_null_or_undefined => NullOrUndefined,
        /// The boolean `true`
        is_true => True,
        /// The boolean `false`
        is_false => False,
        /// A string or symbol
        is_name => Name,
        is_string => String,
        is_symbol => Symbol,
        is_function => Function,
        /// Any object, including functions and arrays
        is_object => Object,
        is_big_int => BigInt,
        is_boolean => Boolean,
        is_number => Number,
        is_external => External,
        /// A number representable as a 32-bit signed integer
        is_int32 => Int32,
        /// A number representable as a 32-bit unsigned integer
        is_uint32 => Uint32,
        is_date => Date,
        is_arguments_object => ArgumentsObject,
        is_big_int_object => BigIntObject,
        is_number_object => NumberObject,
        is_string_object => StringObject,
        is_symbol_object => SymbolObject,
        /// An instance of a native error class such as `TypeError`
        is_native_error => NativeError,
        is_reg_exp => RegExp,
        is_async_function => AsyncFunction,
        is_generator_function => GeneratorFunction,
        is_generator_object => GeneratorObject,
        is_promise => Promise,
        is_map => Map,
        is_set => Set,
        is_map_iterator => MapIterator,
        is_set_iterator => SetIterator,
        is_weak_map => WeakMap,
        is_weak_set => WeakSet,
        is_array => Array,
        is_array_buffer => ArrayBuffer,
        is_array_buffer_view => ArrayBufferView,
        is_typed_array => TypedArray,
        is_uint8_array => Uint8Array,
        is_uint8_clamped_array => Uint8ClampedArray,
        is_int8_array => Int8Array,
        is_uint16_array => Uint16Array,
        is_int16_array => Int16Array,
        is_uint32_array => Uint32Array,
        is_int32_array => Int32Array,
        is_float32_array => Float32Array,
        is_float64_array => Float64Array,
        is_big_int64_array => BigInt64Array,
        is_big_uint64_array => BigUint64Array,
        is_data_view => DataView,
        is_shared_array_buffer => SharedArrayBuffer,
        is_proxy => Proxy,
        is_wasm_module_object => WasmModuleObject,
        is_module_namespace_object => ModuleNamespaceObject,
    }

    /// Name of the value's type for error messages
    pub(crate) fn type_name(&self) -> &'static str {
        TYPE_NAMES
            .iter()
            .find(|(kind, _)| self.is(*kind))
            .map_or("Value", |(_, name)| name)
    }

    /// `ToInt32` conversion, 0 when it throws
    pub fn int32(&self) -> i32 {
        let _guard = self.enter_live();
        // SAFETY: guard keeps the value alive
        unsafe { otter_v8_value_to_int32(self.raw()) }
    }

    /// `ToUint32` conversion, 0 when it throws
    pub fn uint32(&self) -> u32 {
        let _guard = self.enter_live();
        // SAFETY: guard keeps the value alive
        unsafe { otter_v8_value_to_uint32(self.raw()) }
    }

    /// Integer conversion; BigInts are truncated to 64 bits
    pub fn int64(&self) -> i64 {
        let _guard = self.enter_live();
        // SAFETY: guard keeps the value alive
        unsafe { otter_v8_value_to_int64(self.raw()) }
    }

    /// Unsigned integer conversion; BigInts are truncated to 64 bits
    pub fn uint64(&self) -> u64 {
        let _guard = self.enter_live();
        // SAFETY: guard keeps the value alive
        unsafe { otter_v8_value_to_uint64(self.raw()) }
    }

    /// `ToNumber` conversion, NaN when it throws
    pub fn number(&self) -> f64 {
        let _guard = self.enter_live();
        // SAFETY: guard keeps the value alive
        unsafe { otter_v8_value_to_number(self.raw()) }
    }

    /// `ToBoolean` conversion
    pub fn boolean(&self) -> bool {
        let _guard = self.enter_live();
        // SAFETY: guard keeps the value alive
        unsafe { otter_v8_value_to_boolean(self.raw()) != 0 }
    }

    /// The value as a BigInt, `None` unless it is one
    pub fn big_int(&self) -> Option<BigInt> {
        let _guard = self.enter_live();
        // SAFETY: guard keeps the value alive
        let rtn = unsafe { otter_v8_value_to_big_int(self.raw()) };
        if rtn.words.is_null() {
            return None;
        }
        // SAFETY: the bridge malloc'd the words array for us
        scopeguard::defer! { unsafe { otter_v8_free(rtn.words.cast::<c_void>()) } };
        let count = usize::try_from(rtn.word_count).unwrap_or(0);
        // SAFETY: the array holds word_count words
        let words = unsafe { std::slice::from_raw_parts(rtn.words, count) };
        Some(words_to_bigint(rtn.sign_bit != 0, words))
    }

    fn try_to_string(&self) -> V8Result<String> {
        let _guard = self.enter()?;
        // SAFETY: guard keeps the value alive
        unsafe { take_rtn_string(otter_v8_value_to_string(self.raw())) }
    }

    /// Engine detail string, as used by `console.log`. Never throws.
    pub fn detail_string(&self) -> String {
        let _guard = self.enter_live();
        // SAFETY: guard keeps the value alive
        unsafe { take_rtn_string(otter_v8_value_to_detail_string(self.raw())) }.unwrap_or_default()
    }

    /// Copy of a `Uint8Array`'s bytes, empty for any other value
    pub fn uint8_array(&self) -> Vec<u8> {
        let _guard = self.enter_live();
        let mut len = 0usize;
        // SAFETY: guard keeps the value alive
        let data = unsafe { otter_v8_value_to_uint8_array(self.raw(), &mut len) };
        if data.is_null() {
            return Vec::new();
        }
        // SAFETY: the bridge malloc'd len bytes for us
        unsafe {
            let bytes = std::slice::from_raw_parts(data, len).to_vec();
            otter_v8_free(data.cast::<c_void>());
            bytes
        }
    }

    /// `SameValue` comparison (`Object.is`)
    pub fn same_value(&self, other: &Value) -> bool {
        self.iso.assert_owns(other);
        let _guard = self.enter_live();
        let _other = other.enter_live();
        // SAFETY: both values are alive in the same isolate
        unsafe { otter_v8_value_same_value(self.raw(), other.raw()) != 0 }
    }

    /// Strict equality (`===`)
    pub fn strict_equals(&self, other: &Value) -> bool {
        self.iso.assert_owns(other);
        let _guard = self.enter_live();
        let _other = other.enter_live();
        // SAFETY: both values are alive in the same isolate
        unsafe { otter_v8_value_strict_equals(self.raw(), other.raw()) != 0 }
    }

    /// `ToObject` conversion; fails for `null` and `undefined`
    pub fn to_object(&self) -> V8Result<Object> {
        let guard = self.enter()?;
        // SAFETY: guard keeps the value alive
        let rtn = unsafe { otter_v8_value_to_object(self.raw()) };
        drop(guard);
        // SAFETY: the result is tracked in this value's context
        let value = unsafe { self.derive_rtn(rtn)? };
        Ok(Object::from_value(value))
    }

    typed_views! {
        /// View as an object
        as_object, into_object => Object if Object,
        /// View as a function
        as_function, into_function => Function if Function,
        /// View as an array
        as_array, into_array => Array if Array,
        /// View as an array buffer
        as_array_buffer, into_array_buffer => ArrayBuffer if ArrayBuffer,
        /// View as a `Uint8Array`
        as_uint8_array, into_uint8_array => Uint8Array if Uint8Array,
        /// View as a promise
        as_promise, into_promise => Promise if Promise,
        /// View as a symbol
        as_symbol, into_symbol => Symbol if Symbol,
    }

    /// View as a promise resolver. The engine has no resolver kind, so only
    /// objects are checked.
    pub(crate) fn into_promise_resolver(self) -> V8Result<PromiseResolver> {
        if !self.is_object() {
            return Err(V8Error::type_error("PromiseResolver", self.type_name()));
        }
        Ok(PromiseResolver::from_value(self))
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        let _guard = self.enter_live();
        // SAFETY: guard keeps the value alive; the copy is tracked alongside it
        unsafe { self.derive(otter_v8_value_copy(self.raw())) }
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        self.iso.inner().release(Release::Value {
            ptr: self.ptr,
            ctx: self.ctx.take(),
        });
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_to_string() {
            Ok(s) => f.write_str(&s),
            // Symbols and objects with throwing toString
            Err(V8Error::Js(_)) => f.write_str(&self.detail_string()),
            Err(_) => f.write_str("<released>"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.enter() {
            Ok(guard) => {
                drop(guard);
                write!(f, "Value({})", self.detail_string())
            }
            Err(_) => write!(f, "Value(<released>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kind_matches_bridge_numbering() {
        assert_eq!(ValueKind::Undefined as i32, 0);
        assert_eq!(ValueKind::Promise as i32, OTTER_KIND_PROMISE);
        assert_eq!(ValueKind::ModuleNamespaceObject as i32, 53);
    }

    #[test]
    fn test_type_names_end_with_object() {
        assert_eq!(TYPE_NAMES.last().map(|(k, _)| *k), Some(ValueKind::Object));
    }
}
