//! Integration tests for object property access

use otter_v8_core::{Context, Isolate, Symbol, V8Error, Value};

#[test]
fn test_set_get_has_delete() {
    let ctx = Context::with_new_isolate().unwrap();
    let obj = ctx.run_script("({})", "obj.js").unwrap().into_object().unwrap();

    obj.set("name", "otter").unwrap();
    obj.set("age", 7).unwrap();
    assert!(obj.has("name").unwrap());
    assert_eq!(obj.get("name").unwrap().to_string(), "otter");
    assert_eq!(obj.get("age").unwrap().int32(), 7);

    assert!(obj.get("missing").unwrap().is_undefined());
    assert!(!obj.has("missing").unwrap());

    assert!(obj.delete("name").unwrap());
    assert!(!obj.has("name").unwrap());
    assert!(obj.has("toString").unwrap());
}

#[test]
fn test_indexed_access() {
    let ctx = Context::with_new_isolate().unwrap();
    let arr = ctx.run_script("[10, 20]", "arr.js").unwrap().into_array().unwrap();
    assert_eq!(arr.length(), 2);
    assert_eq!(arr.get_index(1).unwrap().int32(), 20);

    arr.set_index(2, 30).unwrap();
    assert_eq!(arr.length(), 3);
    assert!(arr.has_index(2).unwrap());
    assert!(arr.delete_index(2).unwrap());
    assert!(!arr.has_index(2).unwrap());
    assert!(arr.get_index(2).unwrap().is_undefined());
}

#[test]
fn test_set_value_from_script() {
    let ctx = Context::with_new_isolate().unwrap();
    let global = ctx.global().unwrap();
    let list = ctx.run_script("[1, 2, 3]", "list.js").unwrap();
    global.set("list", &list).unwrap();
    let sum = ctx.run_script("list.reduce((a, b) => a + b)", "sum.js").unwrap();
    assert_eq!(sum.int32(), 6);
}

#[test]
fn test_symbol_keys() {
    let ctx = Context::with_new_isolate().unwrap();
    let obj = ctx
        .run_script("({ [Symbol.toStringTag]: 'Custom' })", "sym.js")
        .unwrap()
        .into_object()
        .unwrap();
    let tag = Symbol::to_string_tag(ctx.isolate()).unwrap();
    assert_eq!(obj.get_key(&tag).unwrap().to_string(), "Custom");

    obj.set_key(&tag, "Renamed").unwrap();
    assert_eq!(obj.to_string(), "[object Renamed]");
}

#[test]
fn test_method_call() {
    let ctx = Context::with_new_isolate().unwrap();
    let obj = ctx
        .run_script(
            "({ base: 10, add(a, b) { return this.base + a + b; } })",
            "method.js",
        )
        .unwrap()
        .into_object()
        .unwrap();
    let a = Value::new(ctx.isolate(), 1).unwrap();
    let b = Value::new(ctx.isolate(), 2).unwrap();
    assert_eq!(obj.method_call("add", &[&a, &b]).unwrap().int32(), 13);

    assert!(matches!(
        obj.method_call("base", &[]),
        Err(V8Error::TypeError { .. })
    ));
}

#[test]
fn test_throwing_getter_surfaces_js_error() {
    let ctx = Context::with_new_isolate().unwrap();
    let obj = ctx
        .run_script("({ get boom() { throw new RangeError('nope'); } })", "get.js")
        .unwrap()
        .into_object()
        .unwrap();
    let err = obj.get("boom").unwrap_err();
    assert!(err.is_script_error());
    assert_eq!(err.to_string(), "RangeError: nope");
}

#[test]
fn test_function_call_and_new_instance() {
    let ctx = Context::with_new_isolate().unwrap();
    let iso = ctx.isolate();
    let point = ctx
        .run_script(
            "(function Point(x, y) { this.x = x; this.y = y; })",
            "point.js",
        )
        .unwrap()
        .into_function()
        .unwrap();
    let x = Value::new(iso, 3).unwrap();
    let y = Value::new(iso, 4).unwrap();
    let p = point.new_instance(&[&x, &y]).unwrap();
    assert_eq!(p.get("y").unwrap().int32(), 4);

    let norm = ctx
        .run_script("(function () { return Math.hypot(this.x, this.y); })", "norm.js")
        .unwrap()
        .into_function()
        .unwrap();
    assert_eq!(norm.call(Some(p.as_value()), &[]).unwrap().int32(), 5);
}

#[test]
fn test_source_map_url() {
    let ctx = Context::with_new_isolate().unwrap();
    let f = ctx
        .run_script("(() => 1)\n//# sourceMappingURL=app.js.map", "app.js")
        .unwrap()
        .into_function()
        .unwrap();
    assert_eq!(f.source_map_url().unwrap().to_string(), "app.js.map");
}

#[test]
fn test_well_known_symbols() {
    let iso = Isolate::new();
    assert_eq!(
        Symbol::iterator(&iso).unwrap().description().unwrap(),
        "Symbol.iterator"
    );
    assert_eq!(
        Symbol::async_iterator(&iso).unwrap().description().unwrap(),
        "Symbol.asyncIterator"
    );
    assert!(Symbol::unscopables(&iso).unwrap().is_symbol());
}
