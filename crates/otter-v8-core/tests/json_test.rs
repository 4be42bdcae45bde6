//! Integration tests for JSON conversion

use otter_v8_core::{Context, Isolate, V8Error, Value, json};
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Animal {
    name: String,
    legs: u32,
    tags: Vec<String>,
}

fn otter() -> Animal {
    Animal {
        name: "otter".into(),
        legs: 4,
        tags: vec!["aquatic".into(), "playful".into()],
    }
}

#[test]
fn test_parse_and_stringify() {
    let ctx = Context::with_new_isolate().unwrap();
    let value = json::parse(&ctx, r#"{"a":1,"b":[true,null]}"#).unwrap();
    assert!(value.is_object());
    let obj = value.as_object().unwrap();
    assert_eq!(obj.get("a").unwrap().int32(), 1);

    assert_eq!(json::stringify(&ctx, &value).unwrap(), r#"{"a":1,"b":[true,null]}"#);
    assert_eq!(value.to_json().unwrap(), r#"{"a":1,"b":[true,null]}"#);
}

#[test]
fn test_parse_error_is_syntax_error() {
    let ctx = Context::with_new_isolate().unwrap();
    let err = json::parse(&ctx, "{not json").unwrap_err();
    assert!(err.is_script_error());
    assert!(err.to_string().starts_with("SyntaxError"), "{err}");
}

#[test]
fn test_serde_round_trip() {
    let ctx = Context::with_new_isolate().unwrap();
    let value = Value::from_serde(&ctx, &otter()).unwrap();
    ctx.global().unwrap().set("animal", &value).unwrap();
    let summary = ctx
        .run_script("`${animal.name}:${animal.legs}:${animal.tags.length}`", "main.js")
        .unwrap();
    assert_eq!(summary.to_string(), "otter:4:2");

    ctx.run_script("animal.legs = 3", "main.js").unwrap();
    let back: Animal = value.deserialize().unwrap();
    assert_eq!(back.legs, 3);
    assert_eq!(back.tags, otter().tags);
}

#[test]
fn test_deserialize_script_result() {
    let ctx = Context::with_new_isolate().unwrap();
    let value = ctx
        .run_script("({ name: 'seal', legs: 0, tags: [] })", "main.js")
        .unwrap();
    let animal: Animal = value.deserialize().unwrap();
    assert_eq!(animal.name, "seal");
    assert!(animal.tags.is_empty());

    let bad = ctx.run_script("({ name: 1 })", "main.js").unwrap();
    assert!(matches!(bad.deserialize::<Animal>(), Err(V8Error::Json(_))));
}

#[test]
fn test_context_free_value_cannot_deserialize() {
    let iso = Isolate::new();
    let value = Value::new(&iso, 1).unwrap();
    assert!(matches!(
        value.deserialize::<u32>(),
        Err(V8Error::InvalidArgument(_))
    ));
}

#[test]
fn test_stringify_undefined() {
    let ctx = Context::with_new_isolate().unwrap();
    let f = ctx.run_script("() => 1", "main.js").unwrap();
    assert_eq!(json::stringify(&ctx, &f).unwrap(), "undefined");

    let cyclic = ctx.run_script("const c = {}; c.self = c; c", "main.js").unwrap();
    let err = json::stringify(&ctx, &cyclic).unwrap_err();
    assert!(err.to_string().starts_with("TypeError"), "{err}");
}
