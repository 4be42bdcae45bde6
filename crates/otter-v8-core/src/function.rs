//! JavaScript functions and host callback arguments

use std::ffi::c_int;

use otter_v8_sys::*;

use crate::context::Context;
use crate::error::{V8Error, V8Result};
use crate::isolate::Isolate;
use crate::object::{Object, value_refinement};
use crate::value::{Value, ValueGuard};

/// A JavaScript function.
///
/// # Example
///
/// ```no_run
/// use otter_v8_core::{Context, Isolate, Value};
///
/// let iso = Isolate::new();
/// let ctx = Context::new(&iso).unwrap();
/// let add = ctx
///     .run_script("(a, b) => a + b", "add.js")
///     .unwrap()
///     .into_function()
///     .unwrap();
/// let a = Value::new(&iso, 1).unwrap();
/// let b = Value::new(&iso, 2).unwrap();
/// assert_eq!(add.call(None, &[&a, &b]).unwrap().int32(), 3);
/// ```
pub struct Function {
    object: Object,
}

value_refinement!(Function, object: Object);

impl Function {
    /// Call with `this` as receiver (`undefined` when `None`)
    pub fn call(&self, this: Option<&Value>, args: &[&Value]) -> V8Result<Value> {
        let guard = self.enter()?;
        let (argv, _arg_guards) = self.argv(args)?;
        let argc = argc(&argv)?;

        let undefined;
        let recv = match this {
            Some(this) => {
                self.isolate().assert_owns(this);
                this
            }
            None => {
                undefined = Value::undefined(self.isolate())?;
                &undefined
            }
        };
        let _recv_guard = recv.enter()?;

        // SAFETY: every handle is alive in this isolate for the whole call
        let rtn = unsafe { otter_v8_function_call(self.raw(), recv.raw(), argc, argv.as_ptr()) };
        drop(guard);
        // SAFETY: the result is tracked in this function's context
        unsafe { self.derive_rtn(rtn) }
    }

    /// Invoke as a constructor (`new f(...args)`)
    pub fn new_instance(&self, args: &[&Value]) -> V8Result<Object> {
        let guard = self.enter()?;
        let (argv, _arg_guards) = self.argv(args)?;
        let argc = argc(&argv)?;
        // SAFETY: every handle is alive in this isolate for the whole call
        let rtn = unsafe { otter_v8_function_new_instance(self.raw(), argc, argv.as_ptr()) };
        drop(guard);
        // SAFETY: the result is tracked in this function's context
        let value = unsafe { self.derive_rtn(rtn)? };
        Ok(Object::from_value(value))
    }

    /// URL from the script's `//# sourceMappingURL=` comment, or `undefined`
    pub fn source_map_url(&self) -> V8Result<Value> {
        let guard = self.enter()?;
        // SAFETY: guard keeps the function alive
        let ptr = unsafe { otter_v8_function_source_map_url(self.raw()) };
        drop(guard);
        // SAFETY: the result is tracked in this function's context
        Ok(unsafe { self.derive(ptr) })
    }

    fn argv<'a>(
        &self,
        args: &'a [&'a Value],
    ) -> V8Result<(Vec<OtterValuePtr>, Vec<ValueGuard<'a>>)> {
        let mut argv = Vec::with_capacity(args.len());
        let mut guards = Vec::with_capacity(args.len());
        for arg in args {
            self.isolate().assert_owns(arg);
            guards.push(arg.enter()?);
            argv.push(arg.raw());
        }
        Ok((argv, guards))
    }
}

fn argc(argv: &[OtterValuePtr]) -> V8Result<c_int> {
    c_int::try_from(argv.len())
        .map_err(|_| V8Error::invalid_argument(format!("too many arguments: {}", argv.len())))
}

/// Receiver and arguments of a host function call.
pub struct FunctionCallbackInfo {
    context: Context,
    this: Value,
    args: Vec<Value>,
}

impl FunctionCallbackInfo {
    pub(crate) fn new(context: Context, this: Value, args: Vec<Value>) -> Self {
        Self {
            context,
            this,
            args,
        }
    }

    /// The context the function was called in
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The isolate the function was called in
    pub fn isolate(&self) -> &Isolate {
        self.context.isolate()
    }

    /// The receiver (`this`)
    pub fn this(&self) -> &Value {
        &self.this
    }

    /// All arguments
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Argument `index`, if passed
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Number of arguments passed
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Check if no arguments were passed
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}
