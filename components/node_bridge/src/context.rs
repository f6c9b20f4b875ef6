//! Runtime context lifecycle and the pending-disposal registry.
//!
//! A context moves strictly forward through
//! `Created → SetUp → Initialized → Running → Stopped → Destroyed → Disposed`.
//! Every heap-owning value the runtime hands back, nested elements included,
//! is registered and released exactly once when the context is disposed. The
//! runtime's `dispose_value` releases a single node, so containers are
//! registered after their elements.
//!
//! A failed setup or init leaves the native context unusable: later lifecycle
//! calls are rejected and only teardown remains.

use crate::encoder::DEFAULT_MAX_DEPTH;
use crate::engine::Engine;
use crate::ffi::{self, ContextHandle, HostValues, RawValue};
use bridge_types::{BridgeError, BridgeResult, Value};
use std::ffi::CString;
use std::fmt;
use std::rc::Rc;

/// Lifecycle state of a [`RuntimeContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContextState {
    /// Handle allocated
    Created,
    /// Process arguments accepted
    SetUp,
    /// Worker pool started
    Initialized,
    /// At least one script or call has run
    Running,
    /// Halt signalled
    Stopped,
    /// Native context destroyed
    Destroyed,
    /// All resources released
    Disposed,
}

impl ContextState {
    /// Lower-case name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            ContextState::Created => "created",
            ContextState::SetUp => "set up",
            ContextState::Initialized => "initialized",
            ContextState::Running => "running",
            ContextState::Stopped => "stopped",
            ContextState::Destroyed => "destroyed",
            ContextState::Disposed => "disposed",
        }
    }

    /// Whether scripts and calls may run in this state.
    pub fn is_live(self) -> bool {
        matches!(self, ContextState::Initialized | ContextState::Running)
    }
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Settings applied when marshalling values for this context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarshalOptions {
    /// Nesting bound handed to the encoder
    pub max_encode_depth: usize,
    /// Whether Unknown values fail to decode
    pub strict_decode: bool,
}

impl Default for MarshalOptions {
    fn default() -> Self {
        Self {
            max_encode_depth: DEFAULT_MAX_DEPTH,
            strict_decode: false,
        }
    }
}

/// Outcome of draining the pending-disposal registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisposeReport {
    /// Values released successfully
    pub released: usize,
    /// Values whose release call failed
    pub failed: usize,
}

/// A runtime-owned value awaiting release.
///
/// Not `Clone`: moving it into `dispose_value` is the single release point.
struct NativeValue(RawValue);

/// One embedded-runtime session.
///
/// Not thread safe; the `Rc` engine handle keeps it `!Send` and `!Sync`.
pub struct RuntimeContext {
    engine: Rc<dyn Engine>,
    handle: ContextHandle,
    state: ContextState,
    argv: Vec<CString>,
    pending: Vec<NativeValue>,
    options: MarshalOptions,
    failed: bool,
}

impl RuntimeContext {
    /// Allocates a runtime context through `engine`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::CreateFailed`] when the runtime returns no
    /// handle.
    pub fn create(engine: Rc<dyn Engine>) -> BridgeResult<Self> {
        let handle = engine.create().ok_or(BridgeError::CreateFailed)?;
        tracing::debug!("runtime context created");
        Ok(Self {
            engine,
            handle,
            state: ContextState::Created,
            argv: Vec::new(),
            pending: Vec::new(),
            options: MarshalOptions::default(),
            failed: false,
        })
    }

    /// Replaces the marshalling options.
    pub fn with_options(mut self, options: MarshalOptions) -> Self {
        self.options = options;
        self
    }

    /// Marshalling options in effect.
    pub fn options(&self) -> MarshalOptions {
        self.options
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Number of values awaiting release.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Passes process-style arguments to the runtime; `argv[0]` is the
    /// program name.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Setup`] with the native status on failure. The
    /// context then stays `Created` but rejects every further setup, init or
    /// run with [`BridgeError::InvalidState`]; it can only be disposed.
    pub fn setup(&mut self, argv: &[String]) -> BridgeResult<()> {
        self.require("set up", &[ContextState::Created])?;
        if argv.is_empty() {
            return Err(BridgeError::Config(
                "argv must contain at least the program name".into(),
            ));
        }
        let argv = argv
            .iter()
            .map(|arg| {
                CString::new(arg.as_str()).map_err(|_| {
                    BridgeError::Config(format!("argument contains a NUL byte: {:?}", arg))
                })
            })
            .collect::<BridgeResult<Vec<_>>>()?;

        let code = self.engine.setup(self.handle, &argv);
        tracing::debug!(argc = argv.len(), code, "runtime setup");
        if code != 0 {
            self.failed = true;
            return Err(BridgeError::Setup { code });
        }
        self.argv = argv;
        self.state = ContextState::SetUp;
        Ok(())
    }

    /// Starts the runtime with `thread_pool_size` background workers.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Init`] with the native status on failure; like a
    /// failed setup, this leaves the context good only for disposal.
    pub fn init(&mut self, thread_pool_size: u32) -> BridgeResult<()> {
        self.require("initialize", &[ContextState::SetUp])?;
        let size = i32::try_from(thread_pool_size).map_err(|_| {
            BridgeError::Config(format!("thread pool size {} is too large", thread_pool_size))
        })?;
        let code = self.engine.init(self.handle, size);
        tracing::debug!(thread_pool_size, code, "runtime init");
        if code != 0 {
            self.failed = true;
            return Err(BridgeError::Init { code });
        }
        self.state = ContextState::Initialized;
        Ok(())
    }

    /// Evaluates `source` and returns a copy of the result.
    ///
    /// The runtime-owned result is registered for release at dispose time,
    /// even when copying it fails.
    pub fn run_script(&mut self, source: &str) -> BridgeResult<Value> {
        self.require("run a script", &[ContextState::Initialized, ContextState::Running])?;
        let source = CString::new(source)
            .map_err(|_| BridgeError::Encode("script source contains a NUL byte".into()))?;
        self.state = ContextState::Running;
        let raw = self.engine.run_script(self.handle, &source);
        tracing::debug!(tag = %raw.tag(), "script evaluated");
        self.adopt(raw)
    }

    /// Invokes a Function value with already-encoded arguments.
    ///
    /// The argument buffers are released as soon as the call returns; the
    /// result is registered like a script result.
    pub fn call_function(&mut self, function: &Value, args: &[Value]) -> BridgeResult<Value> {
        self.require("call a function", &[ContextState::Initialized, ContextState::Running])?;
        if function.as_function().is_none() {
            return Err(BridgeError::NotCallable(function.tag().name()));
        }
        let callee = HostValues::alloc(std::slice::from_ref(function))?;
        let mut arguments = HostValues::alloc(args)?;
        let function = callee
            .first()
            .ok_or_else(|| BridgeError::Encode("function value was not allocated".into()))?;

        self.state = ContextState::Running;
        // SAFETY: the handle came from this context, which is live, and the
        // argument buffers outlive the call
        let raw = unsafe {
            self.engine
                .call_function(self.handle, function, arguments.as_mut_slice())
        };
        tracing::debug!(argc = arguments.len(), tag = %raw.tag(), "function called");
        drop(arguments);
        drop(callee);
        self.adopt(raw)
    }

    /// Diagnostic rendering of the most recently registered value.
    pub fn describe_last(&self) -> BridgeResult<Option<String>> {
        self.require_not_disposed()?;
        Ok(self.pending.last().and_then(|value| {
            // SAFETY: registered values stay live until dispose
            unsafe { self.engine.value_to_string(&value.0) }
        }))
    }

    /// Signals the runtime to halt pending work. Calling it again is a no-op.
    pub fn stop(&mut self) -> BridgeResult<()> {
        self.require_not_disposed()?;
        if self.state.is_live() {
            self.engine.stop(self.handle);
            self.state = ContextState::Stopped;
            tracing::debug!("runtime stopped");
        }
        Ok(())
    }

    /// Releases every registered value, then stops, destroys and disposes the
    /// runtime context.
    ///
    /// A failing release does not stop the drain; failures are counted and
    /// reported once.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UseAfterDispose`] if the context was already
    /// disposed.
    pub fn dispose(&mut self) -> BridgeResult<DisposeReport> {
        self.require_not_disposed()?;

        let mut report = DisposeReport::default();
        let mut first_failure = None;
        for NativeValue(raw) in self.pending.drain(..) {
            // SAFETY: each registered value came from this engine and is
            // drained from the registry, so it is released exactly once
            match unsafe { self.engine.dispose_value(raw) } {
                Ok(()) => report.released += 1,
                Err(e) => {
                    report.failed += 1;
                    first_failure.get_or_insert(e);
                }
            }
        }
        if let Some(error) = first_failure {
            tracing::warn!(
                failed = report.failed,
                released = report.released,
                first_error = %error,
                "some runtime values could not be released"
            );
        }

        self.stop()?;
        if self.state < ContextState::Destroyed {
            self.engine.destroy(self.handle);
            self.state = ContextState::Destroyed;
        }
        self.engine.dispose(self.handle);
        self.state = ContextState::Disposed;
        self.argv.clear();

        tracing::info!(
            released = report.released,
            failed = report.failed,
            "runtime context disposed"
        );
        Ok(report)
    }

    fn adopt(&mut self, raw: RawValue) -> BridgeResult<Value> {
        // SAFETY: the runtime hands out valid values and they stay live until
        // dispose
        let nodes = unsafe { ffi::owned_nodes(&raw) };
        self.pending.extend(nodes.into_iter().map(NativeValue));
        // SAFETY: as above
        unsafe { ffi::read(&raw) }
    }

    fn require(&self, operation: &'static str, allowed: &[ContextState]) -> BridgeResult<()> {
        self.require_not_disposed()?;
        if self.failed {
            return Err(BridgeError::InvalidState {
                operation,
                state: "failed",
            });
        }
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(BridgeError::InvalidState {
                operation,
                state: self.state.name(),
            })
        }
    }

    fn require_not_disposed(&self) -> BridgeResult<()> {
        if self.state == ContextState::Disposed {
            Err(BridgeError::UseAfterDispose)
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("state", &self.state)
            .field("pending", &self.pending.len())
            .field("failed", &self.failed)
            .field("options", &self.options)
            .finish()
    }
}

impl Drop for RuntimeContext {
    fn drop(&mut self) {
        if self.state != ContextState::Disposed {
            if let Err(e) = self.dispose() {
                tracing::warn!(error = %e, "runtime context teardown failed");
            }
        }
    }
}
