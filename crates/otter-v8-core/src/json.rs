//! JSON conversion between engine values and Rust data

use otter_v8_sys::*;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::context::Context;
use crate::error::{V8Error, V8Result};
use crate::string::{c_len, take_rtn_string};
use crate::value::Value;

/// Parse `json` with the engine's `JSON.parse`
pub fn parse(ctx: &Context, json: &str) -> V8Result<Value> {
    let len = c_len(json)?;
    let guard = ctx.inner().enter()?;
    // SAFETY: json is valid for len bytes; guard keeps the context open
    let rtn = unsafe { otter_v8_json_parse(guard.ptr(), json.as_ptr().cast(), len) };
    drop(guard);
    // SAFETY: the result is tracked in ctx
    unsafe { Value::from_rtn(rtn, Some(ctx.inner()), ctx.isolate()) }
}

/// Serialize `value` with the engine's `JSON.stringify`.
///
/// Values `JSON.stringify` maps to `undefined` (functions, symbols) yield the
/// text `"undefined"`, which is not valid JSON.
pub fn stringify(ctx: &Context, value: &Value) -> V8Result<String> {
    ctx.isolate().assert_owns(value);
    let guard = ctx.inner().enter()?;
    let _item = value.enter()?;
    // SAFETY: both handles are alive in the entered isolate
    unsafe { take_rtn_string(otter_v8_json_stringify(guard.ptr(), value.raw())) }
}

impl Value {
    /// Build a value from any serializable Rust data
    pub fn from_serde<T: Serialize + ?Sized>(ctx: &Context, data: &T) -> V8Result<Value> {
        let json = serde_json::to_string(data)?;
        parse(ctx, &json)
    }

    /// Convert into Rust data through JSON.
    ///
    /// Fails with `InvalidArgument` for values not bound to a context, such as
    /// primitives created with [`Value::new`].
    pub fn deserialize<T: DeserializeOwned>(&self) -> V8Result<T> {
        let ctx = self.context().ok_or_else(|| {
            V8Error::invalid_argument("value has no context to serialize it in")
        })?;
        let json = stringify(&ctx, self)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// `JSON.stringify` in the value's own context
    pub fn to_json(&self) -> V8Result<String> {
        let ctx = self.context().ok_or_else(|| {
            V8Error::invalid_argument("value has no context to serialize it in")
        })?;
        stringify(&ctx, self)
    }
}
