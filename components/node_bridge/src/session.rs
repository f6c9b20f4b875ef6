//! High-level session: one configured, initialised runtime context.

use crate::config::NodeConfig;
use crate::context::{ContextState, DisposeReport, MarshalOptions, RuntimeContext};
use crate::decoder::Decoder;
use crate::engine::Engine;
use crate::host::HostValue;
use bridge_types::BridgeResult;
use std::cell::RefCell;
use std::rc::Rc;

/// An embedded runtime ready to evaluate scripts.
///
/// Construction runs create, setup and init in order. Functions returned by
/// [`Node::eval`] stay bound to this session and fail cleanly once it is
/// disposed.
///
/// # Examples
///
/// ```
/// use node_bridge::testing::ScriptedEngine;
/// use node_bridge::Node;
/// use std::rc::Rc;
///
/// let node = Node::new(Rc::new(ScriptedEngine::standard())).unwrap();
/// assert_eq!(node.eval("1+1").unwrap().as_f64(), Some(2.0));
/// assert_eq!(node.eval("'x'.repeat(3)").unwrap().as_str(), Some("xxx"));
/// node.dispose().unwrap();
/// ```
#[derive(Debug)]
pub struct Node {
    context: Rc<RefCell<RuntimeContext>>,
    config: NodeConfig,
}

impl Node {
    /// Starts a session with [`NodeConfig::default`].
    pub fn new(engine: Rc<dyn Engine>) -> BridgeResult<Self> {
        Self::with_config(engine, NodeConfig::default())
    }

    /// Starts a session with `config`.
    ///
    /// # Errors
    ///
    /// Configuration errors surface before the runtime is touched; create,
    /// setup and init failures are returned as-is and the half-built context
    /// is torn down.
    pub fn with_config(engine: Rc<dyn Engine>, config: NodeConfig) -> BridgeResult<Self> {
        config.validate()?;
        let mut context = RuntimeContext::create(engine)?.with_options(MarshalOptions {
            max_encode_depth: config.max_encode_depth,
            strict_decode: config.strict_decode,
        });
        context.setup(&config.argv())?;
        context.init(config.thread_pool_size)?;
        tracing::info!(
            thread_pool_size = config.thread_pool_size,
            program = %config.program_name,
            "runtime session started"
        );
        Ok(Self {
            context: Rc::new(RefCell::new(context)),
            config,
        })
    }

    /// Evaluates `source` and decodes the result.
    pub fn eval(&self, source: &str) -> BridgeResult<HostValue> {
        let value = self.context.borrow_mut().run_script(source)?;
        self.decoder().decode(&value)
    }

    /// A decoder whose functions call back into this session.
    pub fn decoder(&self) -> Decoder {
        Decoder::bound(&self.context).strict(self.config.strict_decode)
    }

    /// Signals the runtime to halt; later evaluations are rejected.
    pub fn stop(&self) -> BridgeResult<()> {
        self.context.borrow_mut().stop()
    }

    /// Releases every runtime value and the context itself.
    pub fn dispose(&self) -> BridgeResult<DisposeReport> {
        self.context.borrow_mut().dispose()
    }

    /// Values awaiting release.
    pub fn pending(&self) -> usize {
        self.context.borrow().pending()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ContextState {
        self.context.borrow().state()
    }

    /// Diagnostic rendering of the most recent runtime result.
    pub fn describe_last(&self) -> BridgeResult<Option<String>> {
        self.context.borrow().describe_last()
    }

    /// Configuration the session was started with.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// The shared context, for callers that drive it directly.
    pub fn context(&self) -> &Rc<RefCell<RuntimeContext>> {
        &self.context
    }
}
