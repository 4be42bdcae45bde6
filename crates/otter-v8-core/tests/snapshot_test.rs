//! Integration tests for startup snapshots

use otter_v8_core::{
    Context, FunctionCodeHandling, Isolate, IsolateOptions, SnapshotCreator, StartupData,
    V8Error,
};

fn add_snapshot() -> StartupData {
    let mut creator = SnapshotCreator::new().unwrap();
    let iso = creator.isolate().unwrap();
    let ctx = Context::new(&iso).unwrap();
    ctx.run_script(
        "const add=(a,b)=>a+b; function run(){return add(3,4);}",
        "main.js",
    )
    .unwrap();
    creator.set_default_context(&ctx).unwrap();
    assert!(ctx.is_closed());
    creator.create(FunctionCodeHandling::Clear).unwrap()
}

#[test]
fn test_default_context_restores_functions() {
    let data = add_snapshot();
    assert!(!data.is_empty());

    let iso = Isolate::with_startup_data(data).unwrap();
    let ctx = Context::new(&iso).unwrap();
    let run = ctx.global().unwrap().get("run").unwrap().into_function().unwrap();
    let result = run.call(None, &[]).unwrap();
    assert_eq!(result.to_string(), "7");
}

#[test]
fn test_one_blob_primes_many_isolates() {
    let data = add_snapshot();
    for _ in 0..3 {
        let iso = Isolate::with_options(IsolateOptions::new().startup_data(data.clone())).unwrap();
        let ctx = Context::new(&iso).unwrap();
        assert_eq!(ctx.run_script("add(20, 22)", "main.js").unwrap().int32(), 42);
    }
}

#[test]
fn test_added_context_by_index() {
    let mut creator = SnapshotCreator::new().unwrap();
    let iso = creator.isolate().unwrap();

    let default = Context::new(&iso).unwrap();
    default.run_script("var origin = 'default'", "default.js").unwrap();
    creator.set_default_context(&default).unwrap();

    let extra = Context::new(&iso).unwrap();
    extra.run_script("var origin = 'extra'", "extra.js").unwrap();
    let index = creator.add_context(&extra).unwrap();
    assert_eq!(index, 0);

    let data = creator.create(FunctionCodeHandling::Keep).unwrap();
    let iso = Isolate::with_startup_data(data).unwrap();

    let ctx = Context::from_snapshot(&iso, index).unwrap();
    assert_eq!(ctx.run_script("origin", "main.js").unwrap().to_string(), "extra");
    let ctx = Context::new(&iso).unwrap();
    assert_eq!(ctx.run_script("origin", "main.js").unwrap().to_string(), "default");
}

#[test]
fn test_create_requires_default_context() {
    let mut creator = SnapshotCreator::new().unwrap();
    assert!(matches!(
        creator.create(FunctionCodeHandling::Clear),
        Err(V8Error::Snapshot(_))
    ));
}

#[test]
fn test_default_context_only_once() {
    let mut creator = SnapshotCreator::new().unwrap();
    let iso = creator.isolate().unwrap();
    let first = Context::new(&iso).unwrap();
    let second = Context::new(&iso).unwrap();
    creator.set_default_context(&first).unwrap();
    assert!(matches!(
        creator.set_default_context(&second),
        Err(V8Error::Snapshot(_))
    ));
    assert!(!second.is_closed());
}

#[test]
fn test_creator_is_frozen_after_create() {
    let mut creator = SnapshotCreator::new().unwrap();
    let iso = creator.isolate().unwrap();
    let ctx = Context::new(&iso).unwrap();
    creator.set_default_context(&ctx).unwrap();
    creator.create(FunctionCodeHandling::Clear).unwrap();

    assert!(matches!(creator.isolate(), Err(V8Error::Snapshot(_))));
    assert!(matches!(
        creator.create(FunctionCodeHandling::Clear),
        Err(V8Error::Snapshot(_))
    ));
    assert!(iso.is_disposed());
    assert!(matches!(Context::new(&iso), Err(V8Error::IsolateDisposed)));
}

#[test]
fn test_closed_context_cannot_be_added() {
    let mut creator = SnapshotCreator::new().unwrap();
    let iso = creator.isolate().unwrap();
    let ctx = Context::new(&iso).unwrap();
    ctx.close();
    assert!(matches!(
        creator.add_context(&ctx),
        Err(V8Error::ContextClosed)
    ));
}

#[test]
fn test_dropping_unfinished_creator() {
    let creator = SnapshotCreator::new().unwrap();
    let iso = creator.isolate().unwrap();
    let ctx = Context::new(&iso).unwrap();
    ctx.run_script("1 + 1", "main.js").unwrap();
    drop(ctx);
    drop(creator);
    assert!(iso.is_disposed());
}
