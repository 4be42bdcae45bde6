//! Object and function templates
//!
//! Templates are blueprints owned by an isolate and independent of any
//! context. Changing a template affects only objects and functions created
//! from it afterwards.

use std::ffi::{c_char, c_int};
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use otter_v8_sys::*;
use scopeguard::ScopeGuard;
use tracing::trace;

use crate::context::Context;
use crate::error::{V8Error, V8Result};
use crate::function::{Function, FunctionCallbackInfo};
use crate::isolate::{Isolate, RawPtr, Release};
use crate::marshal::Primitive;
use crate::object::{Object, PropertyValue};
use crate::registry::bridge_token;
use crate::string::c_len;
use crate::value::Value;

/// Property attribute flags, combinable with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PropertyAttribute(c_int);

impl PropertyAttribute {
    pub const NONE: Self = Self(OTTER_PROPERTY_NONE);
    /// Not writable
    pub const READ_ONLY: Self = Self(OTTER_PROPERTY_READ_ONLY);
    /// Not enumerable
    pub const DONT_ENUM: Self = Self(OTTER_PROPERTY_DONT_ENUM);
    /// Not configurable
    pub const DONT_DELETE: Self = Self(OTTER_PROPERTY_DONT_DELETE);

    /// Check if every flag of `other` is set
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub(crate) fn bits(self) -> c_int {
        self.0
    }
}

impl BitOr for PropertyAttribute {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A template entry: a primitive value or a nested template.
pub enum TemplateValue<'a> {
    Value(PropertyValue<'a>),
    ObjectTemplate(&'a ObjectTemplate),
    FunctionTemplate(&'a FunctionTemplate),
}

impl<'a> From<&'a ObjectTemplate> for TemplateValue<'a> {
    fn from(t: &'a ObjectTemplate) -> Self {
        TemplateValue::ObjectTemplate(t)
    }
}

impl<'a> From<&'a FunctionTemplate> for TemplateValue<'a> {
    fn from(t: &'a FunctionTemplate) -> Self {
        TemplateValue::FunctionTemplate(t)
    }
}

impl<'a> From<&'a Value> for TemplateValue<'a> {
    fn from(v: &'a Value) -> Self {
        TemplateValue::Value(PropertyValue::Value(v))
    }
}

macro_rules! impl_template_from_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for TemplateValue<'_> {
                fn from(v: $ty) -> Self {
                    TemplateValue::Value(PropertyValue::Primitive(v.into()))
                }
            }
        )*
    };
}

impl_template_from_primitive!(&str, String, i32, u32, i64, u64, f64, bool, Primitive);

/// Template key: a property name or a symbol.
enum TemplateKey<'a> {
    Name(&'a str),
    Symbol(&'a Value),
}

/// Shared template state; the engine template lives until the isolate is
/// disposed or the last handle drops.
struct TemplateInner {
    iso: Isolate,
    ptr: OtterTemplatePtr,
}

// SAFETY: the template pointer is only used under the isolate's Locker
unsafe impl Send for TemplateInner {}
// SAFETY: see above
unsafe impl Sync for TemplateInner {}

impl TemplateInner {
    fn new(
        iso: &Isolate,
        create: impl FnOnce(OtterIsolatePtr) -> OtterTemplatePtr,
    ) -> V8Result<Self> {
        let guard = iso.inner().enter()?;
        let ptr = create(guard.ptr());
        if ptr.is_null() {
            return Err(V8Error::internal("template creation returned null"));
        }
        Ok(Self {
            iso: iso.clone(),
            ptr,
        })
    }

    fn set(
        &self,
        key: TemplateKey<'_>,
        value: TemplateValue<'_>,
        attributes: PropertyAttribute,
    ) -> V8Result<()> {
        if let TemplateKey::Symbol(sym) = &key {
            self.iso.assert_owns(sym);
            if !sym.is_symbol() {
                return Err(V8Error::type_error("Symbol", sym.type_name()));
            }
        }
        match value {
            TemplateValue::Value(value) => {
                let value = value.into_value(&self.iso)?;
                if value.is_object() {
                    return Err(V8Error::UnsupportedProperty(format!(
                        "cannot set an object value ({}) on a template; use a nested template",
                        value.type_name()
                    )));
                }
                let _item = value.enter()?;
                self.set_raw(key, |tmpl, key| match key {
                    // SAFETY: all handles are alive in this isolate
                    RawKey::Name(name, len) => unsafe {
                        otter_v8_template_set_value(tmpl, name, len, value.raw(), attributes.bits())
                    },
                    // SAFETY: all handles are alive in this isolate
                    RawKey::Symbol(sym) => unsafe {
                        otter_v8_template_set_symbol_value(tmpl, sym, value.raw(), attributes.bits())
                    },
                })
            }
            TemplateValue::ObjectTemplate(nested) => self.set_template(key, &nested.inner, attributes),
            TemplateValue::FunctionTemplate(nested) => {
                self.set_template(key, &nested.inner, attributes)
            }
        }
    }

    fn set_template(
        &self,
        key: TemplateKey<'_>,
        nested: &TemplateInner,
        attributes: PropertyAttribute,
    ) -> V8Result<()> {
        assert!(
            nested.iso.ptr_eq(&self.iso),
            "nested template belongs to a different isolate"
        );
        self.set_raw(key, |tmpl, key| match key {
            // SAFETY: both templates are alive in this isolate
            RawKey::Name(name, len) => unsafe {
                otter_v8_template_set_template(tmpl, name, len, nested.ptr, attributes.bits())
            },
            // SAFETY: both templates are alive in this isolate
            RawKey::Symbol(sym) => unsafe {
                otter_v8_template_set_symbol_template(tmpl, sym, nested.ptr, attributes.bits())
            },
        })
    }

    fn set_raw(
        &self,
        key: TemplateKey<'_>,
        set: impl FnOnce(OtterTemplatePtr, RawKey),
    ) -> V8Result<()> {
        let _guard = self.iso.inner().enter()?;
        match key {
            TemplateKey::Name(name) => {
                let len = c_len(name)?;
                set(self.ptr, RawKey::Name(name.as_ptr().cast(), len));
            }
            TemplateKey::Symbol(sym) => {
                let _sym = sym.enter()?;
                set(self.ptr, RawKey::Symbol(sym.raw()));
            }
        }
        Ok(())
    }
}

/// Key as passed to the bridge
enum RawKey {
    Name(*const c_char, c_int),
    Symbol(OtterValuePtr),
}

impl Drop for TemplateInner {
    fn drop(&mut self) {
        self.iso
            .inner()
            .release(Release::Template(RawPtr(self.ptr)));
    }
}

/// Blueprint for objects, also used for a context's global object.
///
/// # Example
///
/// ```no_run
/// use otter_v8_core::{Context, Isolate, ObjectTemplate, PropertyAttribute};
///
/// let iso = Isolate::new();
/// let global = ObjectTemplate::new(&iso).unwrap();
/// global.set("version", "1.0", PropertyAttribute::READ_ONLY).unwrap();
/// let ctx = Context::with_global(&iso, &global).unwrap();
/// assert_eq!(ctx.run_script("version", "main.js").unwrap().to_string(), "1.0");
/// ```
#[derive(Clone)]
pub struct ObjectTemplate {
    inner: Arc<TemplateInner>,
}

impl ObjectTemplate {
    /// Create an empty object template
    pub fn new(iso: &Isolate) -> V8Result<Self> {
        let inner = TemplateInner::new(iso, |iso_ptr| {
            // SAFETY: iso_ptr is entered by TemplateInner::new
            unsafe { otter_v8_object_template_new(iso_ptr) }
        })?;
        trace!("Object template created");
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub(crate) fn isolate(&self) -> &Isolate {
        &self.inner.iso
    }

    pub(crate) fn raw(&self) -> OtterTemplatePtr {
        self.inner.ptr
    }

    /// Set a named entry.
    ///
    /// Object values fail with [`V8Error::UnsupportedProperty`]; use a nested
    /// template instead.
    pub fn set<'a>(
        &self,
        name: &str,
        value: impl Into<TemplateValue<'a>>,
        attributes: PropertyAttribute,
    ) -> V8Result<()> {
        self.inner.set(TemplateKey::Name(name), value.into(), attributes)
    }

    /// Set an entry keyed by a symbol
    pub fn set_symbol<'a>(
        &self,
        key: &Value,
        value: impl Into<TemplateValue<'a>>,
        attributes: PropertyAttribute,
    ) -> V8Result<()> {
        self.inner.set(TemplateKey::Symbol(key), value.into(), attributes)
    }

    /// Create an object from the template
    pub fn new_instance(&self, ctx: &Context) -> V8Result<Object> {
        assert!(
            ctx.isolate().ptr_eq(&self.inner.iso),
            "template used in a context of a different isolate"
        );
        let guard = ctx.inner().enter()?;
        // SAFETY: guard keeps the context open; the template is in its isolate
        let rtn = unsafe { otter_v8_object_template_new_instance(self.inner.ptr, guard.ptr()) };
        drop(guard);
        // SAFETY: the result is tracked in ctx
        let value = unsafe { Value::from_rtn(rtn, Some(ctx.inner()), ctx.isolate())? };
        Ok(Object::from_value(value))
    }

    /// Reserve internal fields on objects created from the template
    pub fn set_internal_field_count(&self, count: u32) -> V8Result<()> {
        let count = c_int::try_from(count)
            .map_err(|_| V8Error::invalid_argument(format!("internal field count {count}")))?;
        let _guard = self.inner.iso.inner().enter()?;
        // SAFETY: guard keeps the isolate alive
        unsafe { otter_v8_object_template_set_internal_field_count(self.inner.ptr, count) };
        Ok(())
    }

    /// Number of internal fields on objects created from the template
    pub fn internal_field_count(&self) -> u32 {
        let _guard = self.inner.iso.inner().enter_live();
        // SAFETY: guard keeps the isolate alive
        let count = unsafe { otter_v8_object_template_internal_field_count(self.inner.ptr) };
        u32::try_from(count).unwrap_or(0)
    }
}

impl fmt::Debug for ObjectTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectTemplate").finish_non_exhaustive()
    }
}

/// Blueprint for a function backed by a Rust closure.
///
/// # Example
///
/// ```no_run
/// use otter_v8_core::{Context, FunctionTemplate, Isolate, ObjectTemplate, PropertyAttribute, Value};
///
/// let iso = Isolate::new();
/// let hello = FunctionTemplate::new(&iso, |info| {
///     let name = info.arg(0).map(|v| v.to_string()).unwrap_or_default();
///     Value::new(info.isolate(), format!("hello {name}")).ok()
/// })
/// .unwrap();
/// let global = ObjectTemplate::new(&iso).unwrap();
/// global.set("hello", &hello, PropertyAttribute::NONE).unwrap();
/// let ctx = Context::with_global(&iso, &global).unwrap();
/// let greeting = ctx.run_script("hello('v8')", "main.js").unwrap();
/// assert_eq!(greeting.to_string(), "hello v8");
/// ```
#[derive(Clone)]
pub struct FunctionTemplate {
    inner: Arc<TemplateInner>,
}

impl FunctionTemplate {
    /// Create a function template calling `callback`
    pub fn new<F>(iso: &Isolate, callback: F) -> V8Result<Self>
    where
        F: Fn(&FunctionCallbackInfo) -> Option<Value> + Send + Sync + 'static,
    {
        let registry = &iso.inner().callbacks;
        let token = scopeguard::guard(registry.register(Arc::new(callback)), |token| {
            registry.unregister(&[token]);
        });
        let data = bridge_token(*token);
        let inner = TemplateInner::new(iso, |iso_ptr| {
            // SAFETY: iso_ptr is entered by TemplateInner::new
            unsafe { otter_v8_function_template_new(iso_ptr, data) }
        })?;
        let token = ScopeGuard::into_inner(token);
        trace!(token, "Function template created");
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Set a named entry on functions created from the template
    pub fn set<'a>(
        &self,
        name: &str,
        value: impl Into<TemplateValue<'a>>,
        attributes: PropertyAttribute,
    ) -> V8Result<()> {
        self.inner.set(TemplateKey::Name(name), value.into(), attributes)
    }

    /// Instantiate the function in `ctx`
    pub fn get_function(&self, ctx: &Context) -> V8Result<Function> {
        assert!(
            ctx.isolate().ptr_eq(&self.inner.iso),
            "template used in a context of a different isolate"
        );
        let guard = ctx.inner().enter()?;
        // SAFETY: guard keeps the context open; the template is in its isolate
        let rtn = unsafe { otter_v8_function_template_get_function(self.inner.ptr, guard.ptr()) };
        drop(guard);
        // SAFETY: the result is tracked in ctx
        let value = unsafe { Value::from_rtn(rtn, Some(ctx.inner()), ctx.isolate())? };
        Ok(Function::from_value(value))
    }
}

impl fmt::Debug for FunctionTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTemplate").finish_non_exhaustive()
    }
}
