//! Well-known symbols

use otter_v8_sys::*;

use crate::error::V8Result;
use crate::isolate::Isolate;
use crate::object::PropertyValue;
use crate::string::take_rtn_string;
use crate::value::Value;

/// A JavaScript symbol.
///
/// ```no_run
/// use otter_v8_core::{Isolate, Symbol};
///
/// let iso = Isolate::new();
/// let sym = Symbol::iterator(&iso).unwrap();
/// assert_eq!(sym.description().unwrap(), "Symbol.iterator");
/// ```
pub struct Symbol {
    value: Value,
}

impl Symbol {
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

    fn builtin(iso: &Isolate, index: OtterSymbolIndex) -> V8Result<Symbol> {
        let guard = iso.inner().enter()?;
        // SAFETY: guard keeps the isolate alive
        let ptr = unsafe { otter_v8_symbol_builtin(guard.ptr(), index) };
        drop(guard);
        // SAFETY: tracked in the internal context
        Ok(Symbol::from_value(unsafe { Value::from_raw(ptr, None, iso) }))
    }

    /// The symbol's description, empty when it has none
    pub fn description(&self) -> V8Result<String> {
        let _guard = self.value.enter()?;
        // SAFETY: guard keeps the symbol alive
        unsafe { take_rtn_string(otter_v8_symbol_description(self.value.raw())) }
    }
}

macro_rules! builtin_symbols {
    ($($(#[$doc:meta])* $name:ident => $index:ident),* $(,)?) => {
        impl Symbol {
            $(
                $(#[$doc])*
                pub fn $name(iso: &Isolate) -> V8Result<Symbol> {
                    Symbol::builtin(iso, $index)
                }
            )*
        }
    };
}

builtin_symbols! {
    /// `Symbol.asyncIterator`
    async_iterator => OTTER_SYMBOL_ASYNC_ITERATOR,
    /// `Symbol.hasInstance`
    has_instance => OTTER_SYMBOL_HAS_INSTANCE,
    /// `Symbol.isConcatSpreadable`
    is_concat_spreadable => OTTER_SYMBOL_IS_CONCAT_SPREADABLE,
    /// `Symbol.iterator`
    iterator => OTTER_SYMBOL_ITERATOR,
    /// `Symbol.match`
    match_ => OTTER_SYMBOL_MATCH,
    /// `Symbol.replace`
    replace => OTTER_SYMBOL_REPLACE,
    /// `Symbol.search`
    search => OTTER_SYMBOL_SEARCH,
    /// `Symbol.split`
    split => OTTER_SYMBOL_SPLIT,
    /// `Symbol.toPrimitive`
    to_primitive => OTTER_SYMBOL_TO_PRIMITIVE,
    /// `Symbol.toStringTag`
    to_string_tag => OTTER_SYMBOL_TO_STRING_TAG,
    /// `Symbol.unscopables`
    unscopables => OTTER_SYMBOL_UNSCOPABLES,
}

impl std::ops::Deref for Symbol {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.value
    }
}

impl Clone for Symbol {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
        }
    }
}

impl<'a> From<&'a Symbol> for PropertyValue<'a> {
    fn from(v: &'a Symbol) -> Self {
        PropertyValue::Value(&v.value)
    }
}

impl std::fmt::Debug for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Symbol").field(&self.value).finish()
    }
}

