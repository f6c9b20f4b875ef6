//! End-to-end session tests
//!
//! A session is started, scripts are evaluated, returned functions are
//! called, and the session is torn down, all through the public API.

use bridge_types::Value;
use integration_tests::{session_with, standard_session};
use node_bridge::testing::ScriptedEngine;
use node_bridge::{BridgeError, ContextState, HostValue, Node, NodeConfig};
use std::collections::BTreeMap;
use std::rc::Rc;

#[test]
fn test_eval_arithmetic() {
    let (_, node) = standard_session();
    assert_eq!(node.eval("1+1").unwrap(), HostValue::Float(2.0));
}

#[test]
fn test_eval_string() {
    let (_, node) = standard_session();
    assert_eq!(node.eval("'x'.repeat(3)").unwrap(), HostValue::from("xxx"));
}

#[test]
fn test_eval_function_and_call() {
    let (_, node) = standard_session();
    let f = node.eval("function f(a){return a+1;} f").unwrap();
    let f = f.as_callable().expect("a callable");
    assert_eq!(f.call(&[&41]).unwrap(), HostValue::Float(42.0));
}

#[test]
fn test_identity_function_returns_ping() {
    let (_, node) = standard_session();
    let echo = node.eval("function echo(x){return x;} echo").unwrap();
    assert_eq!(
        echo.as_callable().unwrap().call(&[&"ping"]).unwrap(),
        HostValue::from("ping")
    );
}

#[test]
fn test_structured_argument_through_function() {
    let (_, node) = standard_session();
    let echo = node.eval("function echo(x){return x;} echo").unwrap();

    let mut record = BTreeMap::new();
    record.insert("id", HostValue::Float(7.0));
    record.insert("tags", HostValue::List(vec![HostValue::from("a"), HostValue::from("b")]));

    let result = echo.as_callable().unwrap().call(&[&record]).unwrap();
    let map = result.as_map().unwrap();
    assert_eq!(map["id"], HostValue::Float(7.0));
    assert_eq!(map["tags"].as_list().unwrap().len(), 2);
}

#[test]
fn test_host_values_passed_back() {
    let (_, node) = standard_session();
    let list = node.eval("[1, 'a', null]").unwrap();
    let echo = node.eval("function echo(x){return x;} echo").unwrap();
    let items = list.as_list().unwrap().to_vec();

    let result = echo.as_callable().unwrap().call_values(&items).unwrap();
    assert_eq!(result, HostValue::Float(1.0));
}

#[test]
fn test_callable_can_be_cloned_and_compared() {
    let (_, node) = standard_session();
    let f = node.eval("function f(a){return a+1;} f").unwrap();
    let g = node.eval("function f(a){return a+1;} f").unwrap();
    assert_eq!(f, g);
    assert_eq!(f.to_string(), "[Function: f]");
}

#[test]
fn test_functions_are_scoped_to_their_session() {
    let (_, first) = standard_session();
    let (_, second) = standard_session();
    let a = first.eval("function f(a){return a+1;} f").unwrap();
    let b = second.eval("function f(a){return a+1;} f").unwrap();
    assert_ne!(a, b);

    first.dispose().unwrap();
    assert_eq!(
        a.as_callable().unwrap().call(&[&1]),
        Err(BridgeError::UseAfterDispose)
    );
    assert_eq!(b.as_callable().unwrap().call(&[&1]).unwrap(), HostValue::Float(2.0));
}

#[test]
fn test_runtime_nested_function_results() {
    let engine = Rc::new(ScriptedEngine::standard());
    let inner = engine.function("inner", "inner", |_| Value::String("from inner".into()));
    engine.script(
        "({run: inner})",
        Value::Object(vec![("run".into(), Value::Function(inner))]),
    );
    let node = Node::new(engine).unwrap();

    let object = node.eval("({run: inner})").unwrap();
    let run = object.as_map().unwrap()["run"].clone();
    assert_eq!(
        run.as_callable().unwrap().call(&[]).unwrap(),
        HostValue::from("from inner")
    );
}

#[test]
fn test_session_lifecycle_states() {
    let (_, node) = standard_session();
    assert_eq!(node.state(), ContextState::Initialized);
    node.eval("1+1").unwrap();
    assert_eq!(node.state(), ContextState::Running);
    node.stop().unwrap();
    assert_eq!(node.state(), ContextState::Stopped);
    node.dispose().unwrap();
    assert_eq!(node.state(), ContextState::Disposed);
}

#[test]
fn test_config_reaches_runtime() {
    let (engine, node) = session_with(
        NodeConfig::new()
            .with_thread_pool_size(8)
            .with_program_name("embedder"),
    );
    assert_eq!(engine.thread_pool_size(), Some(8));
    assert_eq!(engine.argv(), vec!["embedder"]);
    assert_eq!(node.config().thread_pool_size, 8);
}

#[test]
fn test_config_file_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("node.json");
    std::fs::write(&path, r#"{ "thread_pool_size": 2, "extra_args": ["--max-old-space-size=64"] }"#)
        .unwrap();

    let (engine, _node) = session_with(NodeConfig::from_json_file(&path).unwrap());
    assert_eq!(engine.thread_pool_size(), Some(2));
    assert_eq!(engine.argv()[1], "--max-old-space-size=64");
}

#[test]
fn test_decode_error_does_not_poison_session() {
    let engine = Rc::new(ScriptedEngine::standard());
    engine.script("bad()", Value::BigInt("12abc".into()));
    let node = Node::new(engine.clone()).unwrap();

    assert!(matches!(node.eval("bad()"), Err(BridgeError::Decode(_))));
    assert_eq!(node.eval("1+1").unwrap(), HostValue::Float(2.0));

    node.dispose().unwrap();
    assert_eq!(engine.stats().live, 0);
}
