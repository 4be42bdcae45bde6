//! Integration tests for CPU profiling and heap snapshots

use otter_v8_core::{Context, CpuProfileNode, CpuProfiler, HeapProfiler, Isolate, V8Error, Value};
use serial_test::serial;

const PROFILE_SCRIPT: &str = r#"function loop(timeout) {
  this.mmm = 0;
  var start = Date.now();
  while (Date.now() - start < timeout) {
    var n = 10;
    while (n > 1) {
      n--;
      this.mmm += n * n * n;
    }
  }
}
function delay() { try { loop(10); } catch (e) { } }
function bar() { delay(); }
function baz() { delay(); }
function foo() {
  try {
    delay();
    bar();
    delay();
    baz();
  } catch (e) { }
}
function start(timeout) {
  var start = Date.now();
  do {
    foo();
    var duration = Date.now() - start;
  } while (duration < timeout);
  return duration;
}"#;

fn child_named<'a>(node: &CpuProfileNode<'a>, name: &str) -> Option<CpuProfileNode<'a>> {
    node.children().find(|child| child.function_name() == name)
}

#[test]
#[serial]
fn test_profile_call_tree() {
    let iso = Isolate::new();
    let ctx = Context::new(&iso).unwrap();
    let profiler = CpuProfiler::new(&iso).unwrap();

    profiler.start_profiling("cpu").unwrap();
    ctx.run_script(PROFILE_SCRIPT, "script.js").unwrap();
    let start = ctx.global().unwrap().get("start").unwrap().into_function().unwrap();
    let timeout = Value::new(&iso, 0).unwrap();
    start.call(None, &[&timeout]).unwrap();
    let profile = profiler.stop_profiling("cpu").unwrap();

    assert_eq!(profile.title(), "cpu");
    assert!(profile.end_time() >= profile.start_time());

    let root = profile.top_down_root().unwrap();
    assert_eq!(root.function_name(), "(root)");
    assert!(root.parent().is_none());
    assert!(root.children_count() >= 2);
    assert!(child_named(&root, "(program)").is_some());

    let start_node = child_named(&root, "start").unwrap();
    assert_eq!(start_node.script_resource_name(), "script.js");
    assert_eq!(start_node.line_number(), 23);
    assert_eq!(start_node.parent().unwrap().node_id(), root.node_id());

    let foo = child_named(&start_node, "foo").unwrap();
    assert_eq!(foo.line_number(), 15);
    let names: Vec<&str> = foo.children().map(|c| c.function_name()).collect();
    for expected in ["delay", "bar", "baz"] {
        assert!(names.contains(&expected), "foo children: {names:?}");
    }

    let bar = child_named(&foo, "bar").unwrap();
    assert!(child_named(&bar, "delay").is_some());
}

#[test]
#[serial]
fn test_profile_to_json_and_delete() {
    let iso = Isolate::new();
    let ctx = Context::new(&iso).unwrap();
    let profiler = CpuProfiler::new(&iso).unwrap();

    profiler.start_profiling("json").unwrap();
    ctx.run_script(
        "let t = Date.now(); while (Date.now() - t < 20) {}",
        "busy.js",
    )
    .unwrap();
    let mut profile = profiler.stop_profiling("json").unwrap();

    let json: serde_json::Value = serde_json::from_str(&profile.to_json().unwrap()).unwrap();
    assert_eq!(json["title"], "json");
    let nodes = json["nodes"].as_array().unwrap();
    assert_eq!(nodes[0]["function_name"], "(root)");
    assert!(nodes[0]["parent"].is_null());
    assert!(nodes[0]["children"].is_array());

    profile.delete();
    profile.delete();
    assert!(profile.is_deleted());
    assert!(profile.top_down_root().is_none());
}

#[test]
#[serial]
fn test_stop_unknown_title_fails() {
    let iso = Isolate::new();
    let profiler = CpuProfiler::new(&iso).unwrap();
    assert!(matches!(
        profiler.stop_profiling("never-started"),
        Err(V8Error::InvalidArgument(_))
    ));
}

#[test]
#[serial]
fn test_profiler_dispose_is_idempotent() {
    let iso = Isolate::new();
    let profiler = CpuProfiler::new(&iso).unwrap();
    assert!(!profiler.is_disposed());
    profiler.dispose();
    profiler.dispose();
    assert!(profiler.is_disposed());
}

#[test]
#[serial]
#[should_panic(expected = "CPU profiler used after dispose")]
fn test_start_after_dispose_panics() {
    let iso = Isolate::new();
    let profiler = CpuProfiler::new(&iso).unwrap();
    profiler.dispose();
    let _ = profiler.start_profiling("late");
}

#[test]
#[serial]
fn test_heap_snapshot_is_json() {
    let iso = Isolate::new();
    let ctx = Context::new(&iso).unwrap();
    ctx.run_script("globalThis.keep = { name: 'otter' }", "heap.js").unwrap();

    let profiler = HeapProfiler::new(&iso);
    let snapshot = profiler.take_heap_snapshot().unwrap();
    let json: serde_json::Value = serde_json::from_str(&snapshot).unwrap();
    assert!(json["snapshot"].is_object());
    assert!(json["nodes"].is_array());
    assert!(json["strings"].is_array());
}

#[test]
#[serial]
fn test_write_heap_snapshot_to_file() {
    let iso = Isolate::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("otter.heapsnapshot");

    HeapProfiler::new(&iso).write_heap_snapshot(&path).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.starts_with('{'));

    let missing = dir.path().join("no-such-dir").join("x.heapsnapshot");
    assert!(matches!(
        HeapProfiler::new(&iso).write_heap_snapshot(missing),
        Err(V8Error::Io(_))
    ));
}
