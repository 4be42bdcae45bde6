//! Promises and promise resolvers
//!
//! Isolates run with an explicit microtask policy: continuations registered
//! with `then` run only at `Context::perform_microtask_checkpoint`.

use std::fmt;
use std::sync::Arc;

use otter_v8_sys::*;
use scopeguard::ScopeGuard;

use crate::context::Context;
use crate::error::V8Result;
use crate::function::FunctionCallbackInfo;
use crate::object::{Object, PropertyValue, value_refinement};
use crate::registry::{FunctionCallback, bridge_token};
use crate::value::Value;

/// Settlement state of a promise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromiseState {
    Pending,
    Fulfilled,
    Rejected,
}

impl PromiseState {
    fn from_raw(state: i32) -> Self {
        match state {
            OTTER_PROMISE_FULFILLED => PromiseState::Fulfilled,
            OTTER_PROMISE_REJECTED => PromiseState::Rejected,
            _ => PromiseState::Pending,
        }
    }
}

impl fmt::Display for PromiseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PromiseState::Pending => "pending",
            PromiseState::Fulfilled => "fulfilled",
            PromiseState::Rejected => "rejected",
        })
    }
}

/// The settling side of a promise.
///
/// A resolver may be moved to another thread and settled there; the engine
/// serializes the call with the thread running the isolate.
///
/// # Example
///
/// ```no_run
/// use otter_v8_core::{Context, Isolate, PromiseResolver, PromiseState};
///
/// let ctx = Context::new(&Isolate::new()).unwrap();
/// let resolver = PromiseResolver::new(&ctx).unwrap();
/// let promise = resolver.get_promise().unwrap();
/// assert!(resolver.resolve("done").unwrap());
/// assert_eq!(promise.state(), PromiseState::Fulfilled);
/// ```
pub struct PromiseResolver {
    object: Object,
}

value_refinement!(PromiseResolver, object: Object);

impl PromiseResolver {
    /// Create a resolver with a fresh pending promise
    pub fn new(ctx: &Context) -> V8Result<PromiseResolver> {
        let guard = ctx.inner().enter()?;
        // SAFETY: guard keeps the context open
        let rtn = unsafe { otter_v8_promise_resolver_new(guard.ptr()) };
        drop(guard);
        // SAFETY: the result is tracked in ctx
        let value = unsafe { Value::from_rtn(rtn, Some(ctx.inner()), ctx.isolate())? };
        value.into_promise_resolver()
    }

    /// The promise controlled by this resolver; the same promise every call
    pub fn get_promise(&self) -> V8Result<Promise> {
        let guard = self.enter()?;
        // SAFETY: guard keeps the resolver alive
        let ptr = unsafe { otter_v8_promise_resolver_get_promise(self.raw()) };
        drop(guard);
        // SAFETY: tracked with the resolver
        Ok(Promise::from_value(unsafe { self.derive(ptr) }))
    }

    /// Fulfill the promise; returns whether it was still pending
    pub fn resolve<'a>(&self, value: impl Into<PropertyValue<'a>>) -> V8Result<bool> {
        self.settle(value.into(), otter_v8_promise_resolver_resolve)
    }

    /// Reject the promise; returns whether it was still pending
    pub fn reject<'a>(&self, value: impl Into<PropertyValue<'a>>) -> V8Result<bool> {
        self.settle(value.into(), otter_v8_promise_resolver_reject)
    }

    fn settle(
        &self,
        value: PropertyValue<'_>,
        settle: unsafe extern "C" fn(OtterValuePtr, OtterValuePtr) -> i32,
    ) -> V8Result<bool> {
        let value = value.into_value(self.isolate())?;
        let _guard = self.enter()?;
        let _item = value.enter()?;
        // SAFETY: both handles are alive in the same isolate
        Ok(unsafe { settle(self.raw(), value.raw()) } != 0)
    }
}

/// A JavaScript promise.
///
/// # Example
///
/// ```no_run
/// use otter_v8_core::{Context, Isolate};
///
/// let ctx = Context::new(&Isolate::new()).unwrap();
/// let promise = ctx
///     .run_script("Promise.resolve(21)", "main.js")
///     .unwrap()
///     .into_promise()
///     .unwrap();
/// let doubled = promise
///     .then(|info| {
///         let n = info.arg(0)?.int32();
///         otter_v8_core::Value::new(info.isolate(), n * 2).ok()
///     })
///     .unwrap();
/// ctx.perform_microtask_checkpoint().unwrap();
/// assert_eq!(doubled.result().unwrap().int32(), 42);
/// ```
pub struct Promise {
    object: Object,
}

value_refinement!(Promise, object: Object);

impl Promise {
    /// Current settlement state
    pub fn state(&self) -> PromiseState {
        let _guard = self.enter_live();
        // SAFETY: guard keeps the promise alive
        PromiseState::from_raw(unsafe { otter_v8_promise_state(self.raw()) })
    }

    /// Fulfillment value or rejection reason; `undefined` while pending
    pub fn result(&self) -> V8Result<Value> {
        let guard = self.enter()?;
        // SAFETY: guard keeps the promise alive
        let ptr = unsafe { otter_v8_promise_result(self.raw()) };
        drop(guard);
        // SAFETY: tracked with the promise
        Ok(unsafe { self.derive(ptr) })
    }

    /// Register a fulfillment handler and return the chained promise
    pub fn then<F>(&self, on_fulfilled: F) -> V8Result<Promise>
    where
        F: Fn(&FunctionCallbackInfo) -> Option<Value> + Send + Sync + 'static,
    {
        self.react(vec![Arc::new(on_fulfilled) as Arc<FunctionCallback>], |promise, tokens| {
            // SAFETY: the caller's guard keeps the promise alive
            unsafe { otter_v8_promise_then(promise, tokens[0]) }
        })
    }

    /// Register fulfillment and rejection handlers and return the chained
    /// promise
    pub fn then_or_else<F, R>(&self, on_fulfilled: F, on_rejected: R) -> V8Result<Promise>
    where
        F: Fn(&FunctionCallbackInfo) -> Option<Value> + Send + Sync + 'static,
        R: Fn(&FunctionCallbackInfo) -> Option<Value> + Send + Sync + 'static,
    {
        self.react(
            vec![
                Arc::new(on_fulfilled) as Arc<FunctionCallback>,
                Arc::new(on_rejected) as Arc<FunctionCallback>,
            ],
            |promise, tokens| {
                // SAFETY: the caller's guard keeps the promise alive
                unsafe { otter_v8_promise_then2(promise, tokens[0], tokens[1]) }
            },
        )
    }

    /// Register a rejection handler and return the chained promise
    pub fn catch<R>(&self, on_rejected: R) -> V8Result<Promise>
    where
        R: Fn(&FunctionCallbackInfo) -> Option<Value> + Send + Sync + 'static,
    {
        self.react(vec![Arc::new(on_rejected) as Arc<FunctionCallback>], |promise, tokens| {
            // SAFETY: the caller's guard keeps the promise alive
            unsafe { otter_v8_promise_catch(promise, tokens[0]) }
        })
    }

    /// Attach one reaction. Its handlers stay registered only if the engine
    /// accepted them.
    fn react(
        &self,
        handlers: Vec<Arc<FunctionCallback>>,
        attach: impl FnOnce(OtterValuePtr, &[i64]) -> OtterRtnValue,
    ) -> V8Result<Promise> {
        let guard = self.enter()?;
        let registry = &self.isolate().inner().callbacks;
        let tokens = scopeguard::guard(registry.register_reaction(handlers), |tokens| {
            registry.unregister(&tokens);
        });
        let bridge: Vec<i64> = tokens.iter().copied().map(bridge_token).collect();
        let rtn = attach(self.raw(), &bridge);
        drop(guard);
        let chained = self.chained(rtn)?;
        ScopeGuard::into_inner(tokens);
        Ok(chained)
    }

    fn chained(&self, rtn: OtterRtnValue) -> V8Result<Promise> {
        // SAFETY: the result is tracked with this promise
        let value = unsafe { self.derive_rtn(rtn)? };
        Ok(Promise::from_value(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::V8Error;

    #[test]
    fn test_state_from_bridge_codes() {
        assert_eq!(PromiseState::from_raw(OTTER_PROMISE_PENDING), PromiseState::Pending);
        assert_eq!(PromiseState::from_raw(OTTER_PROMISE_FULFILLED), PromiseState::Fulfilled);
        assert_eq!(PromiseState::from_raw(OTTER_PROMISE_REJECTED), PromiseState::Rejected);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(PromiseState::Rejected.to_string(), "rejected");
    }

    #[test]
    fn test_reaction_on_closed_context_registers_nothing() {
        let ctx = Context::with_new_isolate().unwrap();
        let promise = PromiseResolver::new(&ctx).unwrap().get_promise().unwrap();
        let registry = &ctx.isolate().inner().callbacks;
        let before = registry.len();

        ctx.close();
        assert!(matches!(promise.then(|_| None), Err(V8Error::ContextClosed)));
        assert!(matches!(promise.catch(|_| None), Err(V8Error::ContextClosed)));
        assert!(matches!(
            promise.then_or_else(|_| None, |_| None),
            Err(V8Error::ContextClosed)
        ));
        assert_eq!(registry.len(), before);
    }

    #[test]
    fn test_reaction_handlers_released_after_settlement() {
        let ctx = Context::with_new_isolate().unwrap();
        let resolver = PromiseResolver::new(&ctx).unwrap();
        let promise = resolver.get_promise().unwrap();
        let registry = &ctx.isolate().inner().callbacks;
        let before = registry.len();

        let chained = promise.then_or_else(|_| None, |_| None).unwrap();
        let _tail = chained.catch(|_| None).unwrap();
        assert_eq!(registry.len(), before + 3);

        resolver.resolve(1).unwrap();
        ctx.perform_microtask_checkpoint().unwrap();
        // The catch handler never runs on a fulfilled chain
        assert_eq!(registry.len(), before + 1);
        assert_eq!(chained.state(), PromiseState::Fulfilled);
    }
}
