//! JavaScript objects with property access

use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;

use num_bigint::BigInt;
use otter_v8_sys::*;

use crate::error::{V8Result, check};
use crate::isolate::Isolate;
use crate::marshal::Primitive;
use crate::string::c_len;
use crate::value::Value;

/// A property value: an existing engine value or a host primitive that is
/// converted on the way in.
pub enum PropertyValue<'a> {
    Primitive(Primitive),
    Value(&'a Value),
}

impl<'a> PropertyValue<'a> {
    /// Resolve to an engine value of `iso`.
    ///
    /// # Panics
    /// When an existing value belongs to a different isolate.
    pub(crate) fn into_value(self, iso: &Isolate) -> V8Result<Cow<'a, Value>> {
        match self {
            PropertyValue::Value(v) => {
                iso.assert_owns(v);
                Ok(Cow::Borrowed(v))
            }
            PropertyValue::Primitive(p) => Value::new(iso, p).map(Cow::Owned),
        }
    }
}

impl<'a> From<&'a Value> for PropertyValue<'a> {
    fn from(v: &'a Value) -> Self {
        PropertyValue::Value(v)
    }
}

macro_rules! impl_property_from_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for PropertyValue<'_> {
                fn from(v: $ty) -> Self {
                    PropertyValue::Primitive(v.into())
                }
            }
        )*
    };
}

impl_property_from_primitive!(
    &str,
    String,
    i32,
    u32,
    i64,
    u64,
    f64,
    bool,
    BigInt,
    Vec<u8>,
    &[u8],
    Primitive,
);

/// Implement the `Value` refinement plumbing for a wrapper type.
macro_rules! value_refinement {
    ($ty:ident, $field:ident: $inner:ty) => {
        impl $ty {
            pub(crate) fn from_value(value: $crate::value::Value) -> Self {
                Self {
                    $field: <$inner>::from_value(value),
                }
            }

            /// Borrow as a plain value
            pub fn as_value(&self) -> &$crate::value::Value {
                self.$field.as_value()
            }

            /// Convert into a plain value
            pub fn into_value(self) -> $crate::value::Value {
                self.$field.into_value()
            }
        }

        impl Clone for $ty {
            fn clone(&self) -> Self {
                Self {
                    $field: self.$field.clone(),
                }
            }
        }

        impl std::ops::Deref for $ty {
            type Target = $inner;

            fn deref(&self) -> &$inner {
                &self.$field
            }
        }

        impl<'a> From<&'a $ty> for $crate::object::PropertyValue<'a> {
            fn from(v: &'a $ty) -> Self {
                $crate::object::PropertyValue::Value(v.as_value())
            }
        }

        impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($ty)).field(self.as_value()).finish()
            }
        }
    };
}

pub(crate) use value_refinement;

/// A JavaScript object.
///
/// Dereferences to [`Value`] for predicates and conversions.
///
/// # Example
///
/// ```no_run
/// use otter_v8_core::{Context, Isolate};
///
/// let ctx = Context::new(&Isolate::new()).unwrap();
/// let obj = ctx.run_script("({})", "obj.js").unwrap().into_object().unwrap();
/// obj.set("answer", 42).unwrap();
/// assert_eq!(obj.get("answer").unwrap().int32(), 42);
/// ```
#[derive(Clone)]
pub struct Object {
    value: Value,
}

impl Object {
    pub(crate) fn from_value(value: Value) -> Self {
        Self { value }
    }

    /// Borrow as a plain value
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Convert into a plain value
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Set a property by name
    pub fn set<'a>(&self, key: &str, value: impl Into<PropertyValue<'a>>) -> V8Result<()> {
        let key_len = c_len(key)?;
        let value = value.into().into_value(self.isolate())?;
        let _guard = self.value.enter()?;
        let _item = value.enter()?;
        // SAFETY: both handles are alive in the same isolate
        unsafe {
            check(otter_v8_object_set(
                self.raw(),
                key.as_ptr().cast(),
                key_len,
                value.raw(),
            ))
        }
    }

    /// Set an element by index
    pub fn set_index<'a>(&self, index: u32, value: impl Into<PropertyValue<'a>>) -> V8Result<()> {
        let value = value.into().into_value(self.isolate())?;
        let _guard = self.value.enter()?;
        let _item = value.enter()?;
        // SAFETY: both handles are alive in the same isolate
        unsafe { check(otter_v8_object_set_index(self.raw(), index, value.raw())) }
    }

    /// Set a property keyed by an arbitrary value, typically a symbol
    pub fn set_key<'a>(&self, key: &Value, value: impl Into<PropertyValue<'a>>) -> V8Result<()> {
        self.isolate().assert_owns(key);
        let value = value.into().into_value(self.isolate())?;
        let _guard = self.value.enter()?;
        let _key = key.enter()?;
        let _item = value.enter()?;
        // SAFETY: all handles are alive in the same isolate
        unsafe { check(otter_v8_object_set_key(self.raw(), key.raw(), value.raw())) }
    }

    /// Get a property by name; missing properties are `undefined`
    pub fn get(&self, key: &str) -> V8Result<Value> {
        let key_len = c_len(key)?;
        let guard = self.value.enter()?;
        // SAFETY: guard keeps the object alive
        let rtn = unsafe { otter_v8_object_get(self.raw(), key.as_ptr().cast(), key_len) };
        drop(guard);
        // SAFETY: the result is tracked in this object's context
        unsafe { self.derive_rtn(rtn) }
    }

    /// Get an element by index
    pub fn get_index(&self, index: u32) -> V8Result<Value> {
        let guard = self.value.enter()?;
        // SAFETY: guard keeps the object alive
        let rtn = unsafe { otter_v8_object_get_index(self.raw(), index) };
        drop(guard);
        // SAFETY: the result is tracked in this object's context
        unsafe { self.derive_rtn(rtn) }
    }

    /// Get a property keyed by an arbitrary value, typically a symbol
    pub fn get_key(&self, key: &Value) -> V8Result<Value> {
        self.isolate().assert_owns(key);
        let guard = self.value.enter()?;
        let key_guard = key.enter()?;
        // SAFETY: both handles are alive in the same isolate
        let rtn = unsafe { otter_v8_object_get_key(self.raw(), key.raw()) };
        drop(key_guard);
        drop(guard);
        // SAFETY: the result is tracked in this object's context
        unsafe { self.derive_rtn(rtn) }
    }

    /// Check for a property by name, including inherited ones
    pub fn has(&self, key: &str) -> V8Result<bool> {
        let key_len = c_len(key)?;
        let _guard = self.value.enter()?;
        // SAFETY: guard keeps the object alive
        Ok(unsafe { otter_v8_object_has(self.raw(), key.as_ptr().cast(), key_len) } != 0)
    }

    /// Check for an element by index
    pub fn has_index(&self, index: u32) -> V8Result<bool> {
        let _guard = self.value.enter()?;
        // SAFETY: guard keeps the object alive
        Ok(unsafe { otter_v8_object_has_index(self.raw(), index) } != 0)
    }

    /// Delete a property by name, returning whether it is gone
    pub fn delete(&self, key: &str) -> V8Result<bool> {
        let key_len = c_len(key)?;
        let _guard = self.value.enter()?;
        // SAFETY: guard keeps the object alive
        Ok(unsafe { otter_v8_object_delete(self.raw(), key.as_ptr().cast(), key_len) } != 0)
    }

    /// Delete an element by index, returning whether it is gone
    pub fn delete_index(&self, index: u32) -> V8Result<bool> {
        let _guard = self.value.enter()?;
        // SAFETY: guard keeps the object alive
        Ok(unsafe { otter_v8_object_delete_index(self.raw(), index) } != 0)
    }

    /// Call the method `name` with this object as receiver
    pub fn method_call(&self, name: &str, args: &[&Value]) -> V8Result<Value> {
        let method = self.get(name)?.into_function()?;
        method.call(Some(self.as_value()), args)
    }

    /// Number of internal fields, set through `ObjectTemplate::set_internal_field_count`
    pub fn internal_field_count(&self) -> u32 {
        let _guard = self.value.enter_live();
        // SAFETY: guard keeps the object alive
        let count = unsafe { otter_v8_object_internal_field_count(self.raw()) };
        u32::try_from(count).unwrap_or(0)
    }
}

impl Deref for Object {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.value
    }
}

impl<'a> From<&'a Object> for PropertyValue<'a> {
    fn from(v: &'a Object) -> Self {
        PropertyValue::Value(&v.value)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Object").field(&self.value).finish()
    }
}
