//! Integration tests for promises and resolvers

use std::sync::Arc;

use otter_v8_core::{Context, Exception, PromiseResolver, PromiseState, Value};
use parking_lot::Mutex;

#[test]
fn test_resolver_fulfills_once() {
    let ctx = Context::with_new_isolate().unwrap();
    let resolver = PromiseResolver::new(&ctx).unwrap();
    let promise = resolver.get_promise().unwrap();
    assert_eq!(promise.state(), PromiseState::Pending);
    assert!(promise.result().unwrap().is_undefined());

    assert!(resolver.resolve("done").unwrap());
    assert_eq!(promise.state(), PromiseState::Fulfilled);
    assert_eq!(promise.result().unwrap().to_string(), "done");

    assert!(!resolver.resolve("again").unwrap());
    assert!(!resolver.reject("late").unwrap());
    assert_eq!(promise.result().unwrap().to_string(), "done");
}

#[test]
fn test_resolver_rejects() {
    let ctx = Context::with_new_isolate().unwrap();
    let resolver = PromiseResolver::new(&ctx).unwrap();
    let err = Exception::error(ctx.isolate(), "nope").unwrap();
    assert!(resolver.reject(&err).unwrap());

    let promise = resolver.get_promise().unwrap();
    assert_eq!(promise.state(), PromiseState::Rejected);
    assert_eq!(promise.result().unwrap().to_string(), "Error: nope");
}

#[test]
fn test_then_runs_at_checkpoint() {
    let ctx = Context::with_new_isolate().unwrap();
    let resolver = PromiseResolver::new(&ctx).unwrap();
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    let chained = resolver
        .get_promise()
        .unwrap()
        .then(move |info| {
            let n = info.arg(0)?.int32();
            *sink.lock() = Some(n);
            Value::new(info.isolate(), n * 2).ok()
        })
        .unwrap();

    resolver.resolve(21).unwrap();
    assert_eq!(*seen.lock(), None);
    assert_eq!(chained.state(), PromiseState::Pending);

    ctx.perform_microtask_checkpoint().unwrap();
    assert_eq!(*seen.lock(), Some(21));
    assert_eq!(chained.state(), PromiseState::Fulfilled);
    assert_eq!(chained.result().unwrap().int32(), 42);
}

#[test]
fn test_catch_handles_script_rejection() {
    let ctx = Context::with_new_isolate().unwrap();
    let promise = ctx
        .run_script("Promise.reject(new TypeError('bad'))", "main.js")
        .unwrap()
        .into_promise()
        .unwrap();
    assert_eq!(promise.state(), PromiseState::Rejected);

    let recovered = promise
        .catch(|info| {
            let reason = info.arg(0)?.to_string();
            Value::new(info.isolate(), format!("recovered from {reason}")).ok()
        })
        .unwrap();
    ctx.perform_microtask_checkpoint().unwrap();
    assert_eq!(recovered.state(), PromiseState::Fulfilled);
    assert_eq!(
        recovered.result().unwrap().to_string(),
        "recovered from TypeError: bad"
    );
}

#[test]
fn test_then_or_else_picks_branch() {
    let ctx = Context::with_new_isolate().unwrap();
    let outcome = Arc::new(Mutex::new(Vec::new()));

    for source in ["Promise.resolve(1)", "Promise.reject(2)"] {
        let promise = ctx
            .run_script(source, "main.js")
            .unwrap()
            .into_promise()
            .unwrap();
        let ok = outcome.clone();
        let err = outcome.clone();
        promise
            .then_or_else(
                move |info| {
                    ok.lock().push(format!("ok {}", info.arg(0)?.int32()));
                    None
                },
                move |info| {
                    err.lock().push(format!("err {}", info.arg(0)?.int32()));
                    None
                },
            )
            .unwrap();
    }
    ctx.perform_microtask_checkpoint().unwrap();
    assert_eq!(*outcome.lock(), vec!["ok 1".to_string(), "err 2".to_string()]);
}

#[test]
fn test_resolver_settles_from_another_thread() {
    let ctx = Context::with_new_isolate().unwrap();
    let resolver = PromiseResolver::new(&ctx).unwrap();
    let promise = resolver.get_promise().unwrap();
    let iso = ctx.isolate().clone();

    std::thread::spawn(move || {
        let value = Value::new(&iso, "from worker").unwrap();
        assert!(resolver.resolve(&value).unwrap());
    })
    .join()
    .unwrap();

    assert_eq!(promise.state(), PromiseState::Fulfilled);
    assert_eq!(promise.result().unwrap().to_string(), "from worker");
}

#[test]
fn test_promise_kind_and_resolver_promise_identity() {
    let ctx = Context::with_new_isolate().unwrap();
    let resolver = PromiseResolver::new(&ctx).unwrap();
    let a = resolver.get_promise().unwrap();
    let b = resolver.get_promise().unwrap();
    assert!(a.is_promise());
    assert!(a.strict_equals(&b));
    assert_eq!(PromiseState::Pending.to_string(), "pending");
}
