//! Host-side handles to functions living in the runtime.

use crate::context::{ContextState, RuntimeContext};
use crate::decoder::Decoder;
use crate::encoder::{Encode, Encoder};
use crate::host::HostValue;
use bridge_types::{BridgeError, BridgeResult, FunctionRef, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;

/// A runtime function bound to the context that produced it.
///
/// The binding is weak: once the context is disposed or dropped, calling the
/// function fails with [`BridgeError::UseAfterDispose`] instead of touching a
/// dead runtime.
#[derive(Clone)]
pub struct Callable {
    context: Weak<RefCell<RuntimeContext>>,
    function: FunctionRef,
}

impl Callable {
    pub(crate) fn new(context: Weak<RefCell<RuntimeContext>>, function: FunctionRef) -> Self {
        Self { context, function }
    }

    /// Function name as reported by the runtime; empty for anonymous
    /// functions.
    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// The boundary reference this callable wraps.
    pub fn function_ref(&self) -> &FunctionRef {
        &self.function
    }

    /// Whether the owning context can still run calls.
    pub fn is_alive(&self) -> bool {
        match self.context.upgrade() {
            // A context borrowed elsewhere is mid-call, hence alive
            Some(context) => context
                .try_borrow()
                .map_or(true, |context| context.state() != ContextState::Disposed),
            None => false,
        }
    }

    /// Encodes `args`, invokes the function and decodes its result.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::UseAfterDispose`] once the owning context is gone
    /// - [`BridgeError::InvalidState`] if the context is busy or not running
    /// - [`BridgeError::Encode`] / [`BridgeError::Decode`] for marshalling
    ///   failures; encoding failures happen before the runtime is touched
    ///
    /// # Examples
    ///
    /// ```
    /// use node_bridge::testing::ScriptedEngine;
    /// use node_bridge::Node;
    /// use std::rc::Rc;
    ///
    /// let node = Node::new(Rc::new(ScriptedEngine::standard())).unwrap();
    /// let f = node.eval("function f(a){return a+1;} f").unwrap();
    /// let result = f.as_callable().unwrap().call(&[&41]).unwrap();
    /// assert_eq!(result.as_f64(), Some(42.0));
    /// ```
    pub fn call(&self, args: &[&dyn Encode]) -> BridgeResult<HostValue> {
        let context = self.context.upgrade().ok_or(BridgeError::UseAfterDispose)?;
        let options = context
            .try_borrow()
            .map_err(|_| busy())?
            .options();

        let mut encoder = Encoder::with_max_depth(options.max_encode_depth);
        let encoded = args
            .iter()
            .map(|arg| encoder.encode(*arg))
            .collect::<BridgeResult<Vec<_>>>()?;

        let result = context
            .try_borrow_mut()
            .map_err(|_| busy())?
            .call_function(&Value::Function(self.function.clone()), &encoded)?;

        Decoder::from_weak(self.context.clone())
            .strict(options.strict_decode)
            .decode(&result)
    }

    /// Calls the function with already-decoded host values as arguments.
    pub fn call_values(&self, args: &[HostValue]) -> BridgeResult<HostValue> {
        let args: Vec<&dyn Encode> = args.iter().map(|arg| arg as &dyn Encode).collect();
        self.call(&args)
    }
}

fn busy() -> BridgeError {
    BridgeError::InvalidState {
        operation: "call a function",
        state: "busy",
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.function.name)
            .field("handle", &self.function.handle)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Two callables are equal when they wrap the same runtime function of the
/// same context.
impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.function.handle == other.function.handle && Weak::ptr_eq(&self.context, &other.context)
    }
}
