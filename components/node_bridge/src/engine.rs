//! The boundary calls consumed from the embedded runtime.

use crate::ffi::{ContextHandle, RawValue};
use bridge_types::BridgeResult;
use std::ffi::{CStr, CString};

/// The fixed set of entry points an embedded runtime exposes.
///
/// [`NativeLibrary`](crate::NativeLibrary) implements this over a loaded
/// shared library; tests implement it with an instrumented in-process engine.
/// All calls block until the runtime answers.
pub trait Engine {
    /// Allocates a runtime context. `None` means the runtime could not
    /// allocate one.
    fn create(&self) -> Option<ContextHandle>;

    /// Passes process-style arguments; returns the native status code.
    fn setup(&self, context: ContextHandle, argv: &[CString]) -> i32;

    /// Starts the runtime with `thread_pool_size` background workers;
    /// returns the native status code.
    fn init(&self, context: ContextHandle, thread_pool_size: i32) -> i32;

    /// Evaluates `source`; the returned value is owned by the runtime.
    fn run_script(&self, context: ContextHandle, source: &CStr) -> RawValue;

    /// Invokes `function` with `args`; the returned value is owned by the
    /// runtime.
    ///
    /// # Safety
    ///
    /// `function` must be a Function value whose handle came from this
    /// context, and every value in `args` must stay valid for the call.
    unsafe fn call_function(
        &self,
        context: ContextHandle,
        function: RawValue,
        args: &mut [RawValue],
    ) -> RawValue;

    /// Signals the runtime to halt pending work.
    fn stop(&self, context: ContextHandle);

    /// Destroys the context.
    fn destroy(&self, context: ContextHandle);

    /// Releases the remaining per-context runtime resources.
    fn dispose(&self, context: ContextHandle);

    /// Releases a value previously returned by `run_script` or
    /// `call_function`.
    ///
    /// # Safety
    ///
    /// `value` must have been produced by this engine and not released yet.
    unsafe fn dispose_value(&self, value: RawValue) -> BridgeResult<()>;

    /// Diagnostic rendering of a runtime value, when the runtime offers one.
    ///
    /// # Safety
    ///
    /// `value` must be a live value produced by this engine.
    unsafe fn value_to_string(&self, value: &RawValue) -> Option<String>;
}
