//! Host callback registry and the bridge trampoline
//!
//! Engine functions backed by Rust closures carry a numeric token instead of
//! a pointer. When JavaScript calls one, the bridge hands the context token
//! and callback token to [`function_callback_trampoline`], which resolves
//! both and invokes the closure.

use std::collections::HashMap;
use std::ffi::c_int;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use otter_v8_sys::OtterValuePtr;
use parking_lot::RwLock;
use tracing::trace;

use crate::context::lookup_context;
use crate::function::FunctionCallbackInfo;
use crate::value::Value;

/// A host function callable from JavaScript.
///
/// Return `Some(value)` to produce a result or `None` for `undefined`. To
/// throw, call `Isolate::throw_exception` and return `None`.
///
/// A panic inside a callback aborts the process, since it would unwind
/// through engine frames.
pub type FunctionCallback = dyn Fn(&FunctionCallbackInfo) -> Option<Value> + Send + Sync;

struct Entry {
    callback: Arc<FunctionCallback>,
    /// Sibling tokens of a promise reaction, all dropped after the first call
    reaction: Option<Arc<[u64]>>,
}

/// Per-isolate map from token to closure.
pub(crate) struct CallbackRegistry {
    next: AtomicU64,
    callbacks: RwLock<HashMap<u64, Entry>>,
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self {
            next: AtomicU64::new(1),
            callbacks: RwLock::new(HashMap::new()),
        }
    }
}

impl CallbackRegistry {
    fn next_token(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a closure that stays callable until the isolate is disposed
    pub(crate) fn register(&self, callback: Arc<FunctionCallback>) -> u64 {
        let token = self.next_token();
        self.callbacks.write().insert(
            token,
            Entry {
                callback,
                reaction: None,
            },
        );
        trace!(token, "Callback registered");
        token
    }

    /// Register the handlers of one promise reaction.
    ///
    /// The engine runs at most one of them, once, so the first call removes
    /// the whole group.
    pub(crate) fn register_reaction(&self, callbacks: Vec<Arc<FunctionCallback>>) -> Vec<u64> {
        let tokens: Vec<u64> = callbacks.iter().map(|_| self.next_token()).collect();
        let group: Arc<[u64]> = Arc::from(tokens.as_slice());
        let mut map = self.callbacks.write();
        for (token, callback) in tokens.iter().zip(callbacks) {
            map.insert(
                *token,
                Entry {
                    callback,
                    reaction: Some(group.clone()),
                },
            );
        }
        drop(map);
        trace!(?tokens, "Reaction registered");
        tokens
    }

    /// Forget `tokens`; unknown tokens are ignored
    pub(crate) fn unregister(&self, tokens: &[u64]) {
        let removed: Vec<Entry> = {
            let mut map = self.callbacks.write();
            tokens.iter().filter_map(|token| map.remove(token)).collect()
        };
        // Closures may own values; drop them outside the lock
        drop(removed);
    }

    /// Look up the closure for a call from the engine
    pub(crate) fn resolve(&self, token: u64) -> Option<Arc<FunctionCallback>> {
        let (callback, group) = {
            let map = self.callbacks.read();
            let entry = map.get(&token)?;
            (entry.callback.clone(), entry.reaction.clone())
        };
        if let Some(group) = group {
            self.unregister(&group);
            trace!(token, "Reaction consumed");
        }
        Some(callback)
    }

    pub(crate) fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    pub(crate) fn clear(&self) {
        // Closures may own values; drop them outside the lock
        let callbacks = std::mem::take(&mut *self.callbacks.write());
        drop(callbacks);
    }
}

/// Token as passed through the bridge
pub(crate) fn bridge_token(token: u64) -> i64 {
    // Tokens start at 1 and increase by one; they never reach i64::MAX
    token as i64
}

/// Entry point for every JavaScript call into a host function.
///
/// # Safety
/// Called by the bridge only, inside the isolate's locker, with owned value
/// handles for `this` and each of `argc` arguments.
pub(crate) unsafe extern "C" fn function_callback_trampoline(
    ctx_token: i64,
    cb_token: i64,
    this: OtterValuePtr,
    args: *const OtterValuePtr,
    argc: c_int,
) -> OtterValuePtr {
    let Some(ctx) = lookup_context(ctx_token as u64) else {
        panic!("host callback invoked for unknown context token {ctx_token}");
    };
    let iso = ctx.isolate().clone();

    // SAFETY: the bridge transfers ownership of these handles to us
    let this = unsafe { Value::from_raw(this, Some(ctx.inner()), &iso) };
    let args: Vec<Value> = (0..usize::try_from(argc).unwrap_or(0))
        // SAFETY: args holds argc owned handles
        .map(|i| unsafe { Value::from_raw(*args.add(i), Some(ctx.inner()), &iso) })
        .collect();

    let Some(callback) = iso.inner().callbacks.resolve(cb_token as u64) else {
        panic!("host callback invoked with unknown callback token {cb_token}");
    };
    trace!(context = ctx_token, callback = cb_token, argc, "Invoking host callback");

    let info = FunctionCallbackInfo::new(ctx, this, args);
    match callback(&info) {
        Some(value) => {
            iso.assert_owns(&value);
            value.into_raw()
        }
        None => ptr::null_mut(),
    }
}
