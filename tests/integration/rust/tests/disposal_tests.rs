//! Disposal accounting across whole sessions
//!
//! The scripted engine counts every value it hands out and every release it
//! receives; these tests check that the two always match exactly.

use bridge_types::Value;
use integration_tests::standard_session;
use node_bridge::testing::ScriptedEngine;
use node_bridge::{BridgeError, ContextState, DisposeReport, Node, RuntimeContext};
use std::rc::Rc;

#[test]
fn test_long_session_releases_everything_once() {
    let (engine, node) = standard_session();
    let f = node.eval("function f(a){return a+1;} f").unwrap();
    let echo = node.eval("function echo(x){return x;} echo").unwrap();
    for i in 0..50 {
        node.eval("'x'.repeat(3)").unwrap();
        node.eval("[1, 'a', null]").unwrap();
        f.as_callable().unwrap().call(&[&i]).unwrap();
        echo.as_callable().unwrap().call(&[&format!("item {}", i)]).unwrap();
    }
    // two functions; per round a string, an array holding a string and one
    // string result
    assert_eq!(node.pending(), 2 + 50 * 4);

    let report = node.dispose().unwrap();
    assert_eq!(report.released, 202);

    let stats = engine.stats();
    assert_eq!(stats.allocated, stats.disposed);
    assert_eq!(stats.live, 0);
    assert_eq!(stats.double_frees, 0);
    assert_eq!(node.pending(), 0);
}

#[test]
fn test_scalar_results_are_not_registered() {
    let (engine, node) = standard_session();
    for source in ["1+1", "null", "undefined", "false", "0"] {
        node.eval(source).unwrap();
    }
    assert_eq!(node.pending(), 0);
    node.dispose().unwrap();
    assert_eq!(engine.stats().allocated, 0);
    assert_eq!(engine.calls().iter().filter(|c| *c == "dispose_value").count(), 0);
}

#[test]
fn test_release_precedes_teardown_triad() {
    let (engine, node) = standard_session();
    node.eval("'x'.repeat(3)").unwrap();
    node.eval("2n ** 64n").unwrap();
    node.dispose().unwrap();

    let calls = engine.calls();
    let tail: Vec<&str> = calls[calls.len() - 5..].iter().map(String::as_str).collect();
    assert_eq!(
        tail,
        vec!["dispose_value", "dispose_value", "stop", "destroy", "dispose"]
    );
}

#[test]
fn test_teardown_after_explicit_stop_skips_second_stop() {
    let (engine, node) = standard_session();
    node.eval("1+1").unwrap();
    node.stop().unwrap();
    node.dispose().unwrap();

    let calls = engine.calls();
    let tail: Vec<&str> = calls[calls.len() - 3..].iter().map(String::as_str).collect();
    assert_eq!(tail, vec!["stop", "destroy", "dispose"]);
}

#[test]
fn test_failures_are_counted_not_fatal() {
    let (engine, node) = standard_session();
    for _ in 0..5 {
        node.eval("Symbol('id')").unwrap();
    }
    engine.fail_disposals(3);

    let report = node.dispose().unwrap();
    assert_eq!(report.failed, 3);
    assert_eq!(report.released, 2);
    assert_eq!(node.state(), ContextState::Disposed);
    assert_eq!(engine.stats().live, 0);
    assert_eq!(engine.calls().last().map(String::as_str), Some("dispose"));
}

#[test]
fn test_arguments_are_not_registered() {
    let (engine, node) = standard_session();
    let f = node.eval("function f(a){return a+1;} f").unwrap();
    let long_text = "y".repeat(4096);
    // f returns a string for string input; only that result is registered
    f.as_callable().unwrap().call(&[&long_text]).unwrap();
    assert_eq!(node.pending(), 2);

    node.dispose().unwrap();
    assert_eq!(engine.stats().allocated, 2);
    assert_eq!(engine.stats().disposed, 2);
}

#[test]
fn test_drop_of_low_level_context_releases_values() {
    let engine = Rc::new(ScriptedEngine::standard());
    {
        let mut context = RuntimeContext::create(engine.clone()).unwrap();
        context.setup(&["host".to_string()]).unwrap();
        context.init(1).unwrap();
        context.run_script("({a: 1, b: [true]})").unwrap();
        context.run_script("'x'.repeat(3)").unwrap();
        assert_eq!(context.pending(), 3);
    }
    assert_eq!(engine.stats().live, 0);
    assert_eq!(engine.stats().disposed, 3);
}

#[test]
fn test_nested_values_are_released_node_by_node() {
    let (engine, node) = standard_session();
    node.eval("[1, 'a', null]").unwrap();
    node.eval("({a: 1, b: [true]})").unwrap();
    assert_eq!(node.pending(), 4);

    let report = node.dispose().unwrap();
    assert_eq!(report, DisposeReport { released: 4, failed: 0 });
    let releases = engine.calls().iter().filter(|c| *c == "dispose_value").count();
    assert_eq!(releases, 4);

    let stats = engine.stats();
    assert_eq!(stats.allocated, 4);
    assert_eq!(stats.live, 0);
    assert_eq!(stats.double_frees, 0);
}

#[test]
fn test_deeply_nested_result_leaves_nothing_behind() {
    let engine = Rc::new(ScriptedEngine::standard());
    engine.script(
        "deep()",
        Value::Object(vec![(
            "rows".into(),
            Value::Array(vec![
                Value::Array(vec![Value::String("x".into()), Value::BigInt("7".into())]),
                Value::Object(vec![("id".into(), Value::Symbol(None))]),
            ]),
        )]),
    );
    let node = Node::new(engine.clone()).unwrap();
    node.eval("deep()").unwrap();
    // object, rows, inner array, string, bigint, inner object, symbol
    assert_eq!(node.pending(), 7);

    node.dispose().unwrap();
    assert_eq!(engine.stats().allocated, 7);
    assert_eq!(engine.stats().disposed, 7);
    assert_eq!(engine.stats().live, 0);
}

#[test]
fn test_unreadable_result_is_still_released() {
    let engine = Rc::new(ScriptedEngine::standard());
    engine.script("broken()", Value::BigInt("not digits".into()));
    let node = Node::new(engine.clone()).unwrap();

    assert!(matches!(node.eval("broken()"), Err(BridgeError::Decode(_))));
    assert_eq!(node.pending(), 1);
    node.dispose().unwrap();
    assert_eq!(engine.stats().live, 0);
}

#[test]
fn test_second_dispose_releases_nothing() {
    let (engine, node) = standard_session();
    node.eval("[1, 'a', null]").unwrap();
    node.dispose().unwrap();
    let calls_after_first = engine.calls().len();

    assert_eq!(node.dispose(), Err(BridgeError::UseAfterDispose));
    assert_eq!(engine.calls().len(), calls_after_first);
    assert_eq!(engine.stats().double_frees, 0);
}
