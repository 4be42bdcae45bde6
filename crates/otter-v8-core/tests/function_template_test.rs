//! Integration tests for templates and host callbacks

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use otter_v8_core::{
    Context, Exception, FunctionTemplate, Isolate, ObjectTemplate, PropertyAttribute, V8Error,
    Value,
};

#[test]
fn test_nested_template_reverses_bytes() {
    let iso = Isolate::new();
    let reverse = FunctionTemplate::new(&iso, |info| {
        let mut bytes = info.arg(0)?.uint8_array();
        bytes.reverse();
        Value::new(info.isolate(), bytes).ok()
    })
    .unwrap();

    let native = ObjectTemplate::new(&iso).unwrap();
    native
        .set("reverseUint8Array", &reverse, PropertyAttribute::NONE)
        .unwrap();
    let global = ObjectTemplate::new(&iso).unwrap();
    global.set("native", &native, PropertyAttribute::NONE).unwrap();

    let ctx = Context::with_global(&iso, &global).unwrap();
    let result = ctx
        .run_script(
            "native.reverseUint8Array(new Uint8Array([0, 1, 2, 3, 4, 5, 6, 7, 8, 9]))",
            "main.js",
        )
        .unwrap();
    assert!(result.is_uint8_array());
    assert_eq!(result.uint8_array(), vec![9, 8, 7, 6, 5, 4, 3, 2, 1, 0]);
}

#[test]
fn test_callback_sees_receiver_and_arguments() {
    let iso = Isolate::new();
    let describe = FunctionTemplate::new(&iso, |info| {
        let name = info.this().as_object().ok()?.get("name").ok()?;
        let text = format!("{}:{}", name, info.len());
        Value::new(info.isolate(), text).ok()
    })
    .unwrap();
    let ctx = Context::new(&iso).unwrap();
    let f = describe.get_function(&ctx).unwrap();
    ctx.global().unwrap().set("describe", &f).unwrap();

    let result = ctx
        .run_script("({ name: 'otter', describe }).describe(1, 2)", "main.js")
        .unwrap();
    assert_eq!(result.to_string(), "otter:2");
}

#[test]
fn test_callback_without_result_returns_undefined() {
    let iso = Isolate::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let tick = FunctionTemplate::new(&iso, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        None
    })
    .unwrap();
    let global = ObjectTemplate::new(&iso).unwrap();
    global.set("tick", &tick, PropertyAttribute::NONE).unwrap();
    let ctx = Context::with_global(&iso, &global).unwrap();

    let result = ctx.run_script("tick(); tick(); tick()", "main.js").unwrap();
    assert!(result.is_undefined());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_callback_throws_exception() {
    let iso = Isolate::new();
    let fail = FunctionTemplate::new(&iso, |info| {
        let err = Exception::type_error(info.isolate(), "bad input").ok()?;
        let _ = info.isolate().throw_exception(&err);
        None
    })
    .unwrap();
    let global = ObjectTemplate::new(&iso).unwrap();
    global.set("fail", &fail, PropertyAttribute::NONE).unwrap();
    let ctx = Context::with_global(&iso, &global).unwrap();

    let err = ctx.run_script("fail()", "main.js").unwrap_err();
    assert_eq!(err.to_string(), "TypeError: bad input");

    let caught = ctx
        .run_script(
            "try { fail() } catch (e) { e instanceof TypeError && e.message }",
            "main.js",
        )
        .unwrap();
    assert_eq!(caught.to_string(), "bad input");
}

#[test]
fn test_template_primitive_entries() {
    let iso = Isolate::new();
    let global = ObjectTemplate::new(&iso).unwrap();
    global.set("name", "otter", PropertyAttribute::NONE).unwrap();
    global.set("answer", 42, PropertyAttribute::NONE).unwrap();
    global.set("ratio", 0.5, PropertyAttribute::NONE).unwrap();
    global.set("enabled", true, PropertyAttribute::NONE).unwrap();
    global
        .set(
            "hidden",
            1,
            PropertyAttribute::DONT_ENUM | PropertyAttribute::DONT_DELETE,
        )
        .unwrap();

    let ctx = Context::with_global(&iso, &global).unwrap();
    let result = ctx
        .run_script("`${name} ${answer} ${ratio} ${enabled}`", "main.js")
        .unwrap();
    assert_eq!(result.to_string(), "otter 42 0.5 true");

    let keys = ctx
        .run_script("Object.keys(globalThis).includes('hidden')", "main.js")
        .unwrap();
    assert!(!keys.boolean());
    let deleted = ctx.run_script("delete globalThis.hidden", "main.js").unwrap();
    assert!(!deleted.boolean());
}

#[test]
fn test_template_rejects_object_values() {
    let iso = Isolate::new();
    let ctx = Context::new(&iso).unwrap();
    let obj = ctx.run_script("({})", "main.js").unwrap();
    let template = ObjectTemplate::new(&iso).unwrap();
    assert!(matches!(
        template.set("obj", &obj, PropertyAttribute::NONE),
        Err(V8Error::UnsupportedProperty(_))
    ));
}

#[test]
fn test_object_template_new_instance() {
    let iso = Isolate::new();
    let template = ObjectTemplate::new(&iso).unwrap();
    template.set("kind", "point", PropertyAttribute::READ_ONLY).unwrap();
    template.set_internal_field_count(2).unwrap();
    assert_eq!(template.internal_field_count(), 2);

    let ctx = Context::new(&iso).unwrap();
    let obj = template.new_instance(&ctx).unwrap();
    assert_eq!(obj.get("kind").unwrap().to_string(), "point");
    assert_eq!(obj.internal_field_count(), 2);
}

#[test]
fn test_function_template_properties() {
    let iso = Isolate::new();
    let f = FunctionTemplate::new(&iso, |_| None).unwrap();
    f.set("version", "2", PropertyAttribute::NONE).unwrap();
    let ctx = Context::new(&iso).unwrap();
    let function = f.get_function(&ctx).unwrap();
    assert_eq!(function.get("version").unwrap().to_string(), "2");
}

#[test]
fn test_function_template_in_two_contexts() {
    let iso = Isolate::new();
    let one = FunctionTemplate::new(&iso, |info| Value::new(info.isolate(), 1).ok()).unwrap();
    let global = ObjectTemplate::new(&iso).unwrap();
    global.set("one", &one, PropertyAttribute::NONE).unwrap();

    let a = Context::with_global(&iso, &global).unwrap();
    let b = Context::with_global(&iso, &global).unwrap();
    assert_eq!(a.run_script("one()", "a.js").unwrap().int32(), 1);
    assert_eq!(b.run_script("one() + one()", "b.js").unwrap().int32(), 2);
}
