//! Integration test suite for the Node.js bridge
//!
//! Drives `node_bridge` sessions end to end against the instrumented
//! scripted engine and checks the boundary types they exchange.

use node_bridge::testing::ScriptedEngine;
use node_bridge::{Node, NodeConfig};
use std::rc::Rc;

/// Re-export components for test convenience
pub mod components {
    pub use bridge_types;
    pub use node_bridge;
}

/// A session over the standard scripted engine, returning the engine so
/// tests can inspect its counters.
pub fn standard_session() -> (Rc<ScriptedEngine>, Node) {
    session_with(NodeConfig::default())
}

/// Like [`standard_session`] with an explicit configuration.
pub fn session_with(config: NodeConfig) -> (Rc<ScriptedEngine>, Node) {
    let engine = Rc::new(ScriptedEngine::standard());
    let node = Node::with_config(engine.clone(), config).expect("scripted session starts");
    (engine, node)
}
