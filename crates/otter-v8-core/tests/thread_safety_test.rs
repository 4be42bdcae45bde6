//! Thread-safety guarantees of the handle types
//!
//! Isolates, contexts and templates are `Send + Sync`: every engine call
//! takes the isolate's lock. Values are `Send` but `!Sync`.

use std::sync::Arc;
use std::thread;

use otter_v8_core::{
    Context, CpuProfiler, FunctionTemplate, Isolate, ObjectTemplate, PromiseResolver,
    SnapshotCreator, UnboundScript, Value,
};

fn assert_send<T: Send>() {}
fn assert_send_sync<T: Send + Sync>() {}

/// ```compile_fail
/// use otter_v8_core::{Isolate, Value};
/// use std::sync::Arc;
///
/// let iso = Isolate::new();
/// let value = Arc::new(Value::new(&iso, 1).unwrap());
/// let shared = value.clone();
/// std::thread::spawn(move || {
///     // This should fail to compile: Value is !Sync
///     let _ = shared.int32();
/// });
/// ```
fn _value_not_sync() {}

/// ```compile_fail
/// use otter_v8_core::{Context, Isolate};
///
/// let ctx = Context::new(&Isolate::new()).unwrap();
/// let obj = ctx.run_script("({})", "main.js").unwrap().into_object().unwrap();
/// let borrowed = &obj;
/// std::thread::scope(|s| {
///     // This should fail to compile: &Object is !Send
///     s.spawn(move || borrowed.get("a"));
/// });
/// ```
fn _object_ref_not_send() {}

#[test]
fn test_handle_markers() {
    assert_send_sync::<Isolate>();
    assert_send_sync::<Context>();
    assert_send_sync::<ObjectTemplate>();
    assert_send_sync::<FunctionTemplate>();
    assert_send_sync::<UnboundScript>();
    assert_send_sync::<CpuProfiler>();
    assert_send_sync::<SnapshotCreator>();
    assert_send::<Value>();
    assert_send::<PromiseResolver>();
}

#[test]
fn test_contexts_used_from_many_threads() {
    let iso = Isolate::new();
    let workers: Vec<_> = (0..4)
        .map(|i| {
            let iso = iso.clone();
            thread::spawn(move || {
                let ctx = Context::new(&iso).unwrap();
                let mut last = 0;
                for _ in 0..50 {
                    last = ctx
                        .run_script(&format!("globalThis.n = (globalThis.n || 0) + {i}; n"), "worker.js")
                        .unwrap()
                        .int32();
                }
                last
            })
        })
        .collect();
    let totals: Vec<i32> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    assert_eq!(totals, vec![0, 50, 100, 150]);
}

#[test]
fn test_shared_context_serializes_scripts() {
    let ctx = Arc::new(Context::with_new_isolate().unwrap());
    ctx.run_script("var counter = 0", "init.js").unwrap();
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let ctx = ctx.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    ctx.run_script("counter++", "inc.js").unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(ctx.run_script("counter", "read.js").unwrap().int32(), 400);
}

#[test]
fn test_value_moved_to_worker_and_dropped_there() {
    let ctx = Context::with_new_isolate().unwrap();
    let value = ctx.run_script("({ answer: 42 })", "main.js").unwrap();
    let answer = thread::spawn(move || {
        let answer = value.as_object().unwrap().get("answer").unwrap().int32();
        drop(value);
        answer
    })
    .join()
    .unwrap();
    assert_eq!(answer, 42);
    assert_eq!(ctx.run_script("1 + 1", "main.js").unwrap().int32(), 2);
}
