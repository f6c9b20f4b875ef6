//! An instrumented in-process [`Engine`] for tests.
//!
//! [`ScriptedEngine`] answers scripts from a fixed table and implements
//! functions as Rust closures. Every heap-owning value it hands out, nested
//! elements included, carries a serial number, so tests can assert that each
//! one is released exactly once. Like the native runtime, a release frees a
//! single node and leaves the elements of a container to their own release.

use crate::engine::Engine;
use crate::ffi::{self, ContextHandle, RawValue};
use bridge_types::{BridgeError, BridgeResult, FunctionHandle, FunctionRef, Value, ValueTag};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::ffi::{c_void, CStr, CString};
use std::fmt;
use std::ptr::NonNull;

type NativeFn = Box<dyn Fn(&[Value]) -> Value>;

/// Allocation and release counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Heap-owning nodes handed to the host, nested ones included
    pub allocated: usize,
    /// Successful `dispose_value` calls
    pub disposed: usize,
    /// Values handed out and not yet released
    pub live: usize,
    /// Releases of values that were already released
    pub double_frees: usize,
    /// Releases that failed by injection
    pub failed: usize,
}

struct NativeFunction {
    name: String,
    body: NativeFn,
}

#[derive(Default)]
struct State {
    scripts: HashMap<String, Value>,
    functions: Vec<NativeFunction>,
    live: HashSet<u64>,
    next_serial: u64,
    stats: EngineStats,
    calls: Vec<String>,
    create_fails: bool,
    setup_status: i32,
    init_status: i32,
    failing_disposals: usize,
    argv: Vec<String>,
    thread_pool_size: Option<i32>,
    receivers: Vec<Option<FunctionHandle>>,
}

impl State {
    /// Stamps a serial into the otherwise unused number slot of every
    /// heap-owning node and gives container elements their container as
    /// receiver.
    ///
    /// # Safety
    ///
    /// `raw` must come from [`ffi::alloc`].
    unsafe fn stamp(&mut self, raw: &mut RawValue) {
        if !raw.tag().owns_heap() {
            return;
        }
        self.next_serial += 1;
        let serial = self.next_serial;
        self.live.insert(serial);
        self.stats.allocated += 1;
        raw.val_num = serial as f64;

        let (ptr, len) = match raw.tag() {
            ValueTag::Array => (raw.val_array, raw.val_array_len),
            ValueTag::Object => (raw.object_values, raw.object_len),
            _ => return,
        };
        if ptr.is_null() || len <= 0 {
            return;
        }
        for child in std::slice::from_raw_parts_mut(ptr, len as usize) {
            child.parent = receiver_handle(serial).as_ptr();
            self.stamp(child);
        }
    }
}

/// Scripted runtime with leak and double-free accounting.
///
/// Scripts missing from the table evaluate to `undefined`.
#[derive(Default)]
pub struct ScriptedEngine {
    state: RefCell<State>,
}

impl ScriptedEngine {
    /// An engine with no scripts.
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine preloaded with a small set of scripts:
    ///
    /// | source | result |
    /// |---|---|
    /// | `1+1` | `2` |
    /// | `'x'.repeat(3)` | `"xxx"` |
    /// | `function f(a){return a+1;} f` | function `f` adding one |
    /// | `function echo(x){return x;} echo` | identity function |
    /// | `function sum(...xs){return xs.reduce((a,b)=>a+b,0);} sum` | numeric sum |
    /// | `[1, 'a', null]` | array |
    /// | `({a: 1, b: [true]})` | object |
    /// | `2n ** 64n` | `18446744073709551616n` |
    /// | `Symbol('id')` | symbol |
    /// | `null`, `undefined`, `false`, `0`, `''` | themselves |
    pub fn standard() -> Self {
        let engine = Self::new();
        engine.script("1+1", Value::Number(2.0));
        engine.script("'x'.repeat(3)", Value::String("xxx".into()));
        engine.script(
            "[1, 'a', null]",
            Value::Array(vec![
                Value::Number(1.0),
                Value::String("a".into()),
                Value::Null,
            ]),
        );
        engine.script(
            "({a: 1, b: [true]})",
            Value::Object(vec![
                ("a".into(), Value::Number(1.0)),
                ("b".into(), Value::Array(vec![Value::Boolean(true)])),
            ]),
        );
        engine.script("2n ** 64n", Value::BigInt("18446744073709551616".into()));
        engine.script("Symbol('id')", Value::Symbol(Some("id".into())));
        engine.script("null", Value::Null);
        engine.script("undefined", Value::Undefined);
        engine.script("false", Value::Boolean(false));
        engine.script("0", Value::Number(0.0));
        engine.script("''", Value::String(String::new()));

        engine.function("function f(a){return a+1;} f", "f", |args| match args.first() {
            Some(Value::Number(n)) => Value::Number(n + 1.0),
            Some(Value::String(s)) => Value::String(format!("{}1", s)),
            _ => Value::Number(f64::NAN),
        });
        engine.function("function echo(x){return x;} echo", "echo", |args| {
            args.first().cloned().unwrap_or(Value::Undefined)
        });
        engine.function(
            "function sum(...xs){return xs.reduce((a,b)=>a+b,0);} sum",
            "sum",
            |args| {
                Value::Number(
                    args.iter()
                        .map(|arg| match arg {
                            Value::Number(n) => *n,
                            _ => f64::NAN,
                        })
                        .sum(),
                )
            },
        );
        engine
    }

    /// Makes `source` evaluate to `value`.
    pub fn script(&self, source: impl Into<String>, value: Value) {
        self.state.borrow_mut().scripts.insert(source.into(), value);
    }

    /// Makes `source` evaluate to a function named `name` running `body`.
    pub fn function<F>(&self, source: impl Into<String>, name: impl Into<String>, body: F) -> FunctionRef
    where
        F: Fn(&[Value]) -> Value + 'static,
    {
        let mut state = self.state.borrow_mut();
        let name = name.into();
        state.functions.push(NativeFunction {
            name: name.clone(),
            body: Box::new(body),
        });
        let function = FunctionRef::new(function_handle(state.functions.len()), name);
        state
            .scripts
            .insert(source.into(), Value::Function(function.clone()));
        function
    }

    /// Makes `create` return no context.
    pub fn set_create_fails(&self, fails: bool) {
        self.state.borrow_mut().create_fails = fails;
    }

    /// Status returned by `setup`.
    pub fn set_setup_status(&self, code: i32) {
        self.state.borrow_mut().setup_status = code;
    }

    /// Status returned by `init`.
    pub fn set_init_status(&self, code: i32) {
        self.state.borrow_mut().init_status = code;
    }

    /// Makes the next `count` releases fail. The memory is still reclaimed.
    pub fn fail_disposals(&self, count: usize) {
        self.state.borrow_mut().failing_disposals = count;
    }

    /// Current counters.
    pub fn stats(&self) -> EngineStats {
        let state = self.state.borrow();
        EngineStats {
            live: state.live.len(),
            ..state.stats
        }
    }

    /// Names of the boundary calls received, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    /// Arguments received by the last `setup`.
    pub fn argv(&self) -> Vec<String> {
        self.state.borrow().argv.clone()
    }

    /// Receiver of every `call_function`, in order; `None` for calls on the
    /// global object.
    pub fn receivers(&self) -> Vec<Option<FunctionHandle>> {
        self.state.borrow().receivers.clone()
    }

    /// Worker count received by the last `init`.
    pub fn thread_pool_size(&self) -> Option<i32> {
        self.state.borrow().thread_pool_size
    }

    fn record(&self, call: impl Into<String>) {
        self.state.borrow_mut().calls.push(call.into());
    }

    /// Allocates `value` as a runtime-owned result.
    fn hand_out(&self, value: &Value) -> RawValue {
        let mut raw = match ffi::alloc(value) {
            Ok(raw) => raw,
            Err(_) => return RawValue::empty(ValueTag::Undefined),
        };
        // SAFETY: `raw` was just allocated above
        unsafe { self.state.borrow_mut().stamp(&mut raw) };
        raw
    }
}

// Handles are distinct, non-null and never dereferenced; function handles
// are multiples of 16, receivers are not.
fn function_handle(index: usize) -> FunctionHandle {
    FunctionHandle::from_raw((index * 16) as *mut c_void)
}

fn receiver_handle(serial: u64) -> FunctionHandle {
    FunctionHandle::from_raw((serial as usize * 16 + 8) as *mut c_void)
}

impl fmt::Debug for ScriptedEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ScriptedEngine")
            .field("scripts", &state.scripts.len())
            .field("functions", &state.functions.len())
            .field("stats", &state.stats)
            .finish()
    }
}

impl Engine for ScriptedEngine {
    fn create(&self) -> Option<ContextHandle> {
        self.record("create");
        if self.state.borrow().create_fails {
            return None;
        }
        Some(ContextHandle::from_non_null(NonNull::dangling()))
    }

    fn setup(&self, _context: ContextHandle, argv: &[CString]) -> i32 {
        self.record("setup");
        let mut state = self.state.borrow_mut();
        state.argv = argv
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        state.setup_status
    }

    fn init(&self, _context: ContextHandle, thread_pool_size: i32) -> i32 {
        self.record("init");
        let mut state = self.state.borrow_mut();
        state.thread_pool_size = Some(thread_pool_size);
        state.init_status
    }

    fn run_script(&self, _context: ContextHandle, source: &CStr) -> RawValue {
        self.record("run_script");
        let value = self
            .state
            .borrow()
            .scripts
            .get(&*source.to_string_lossy())
            .cloned()
            .unwrap_or(Value::Undefined);
        self.hand_out(&value)
    }

    unsafe fn call_function(
        &self,
        _context: ContextHandle,
        function: RawValue,
        args: &mut [RawValue],
    ) -> RawValue {
        self.record("call_function");
        let function = match ffi::read(&function) {
            Ok(Value::Function(function)) => function,
            _ => return self.hand_out(&Value::Undefined),
        };
        self.state.borrow_mut().receivers.push(function.receiver);
        let args = match args.iter().map(|arg| ffi::read(arg)).collect::<BridgeResult<Vec<_>>>() {
            Ok(args) => args,
            Err(_) => return self.hand_out(&Value::Undefined),
        };
        let result = {
            let state = self.state.borrow();
            state
                .functions
                .iter()
                .enumerate()
                .find(|(i, native)| {
                    function_handle(i + 1) == function.handle && native.name == function.name
                })
                .map(|(_, native)| (native.body)(&args))
                .unwrap_or(Value::Undefined)
        };
        self.hand_out(&result)
    }

    fn stop(&self, _context: ContextHandle) {
        self.record("stop");
    }

    fn destroy(&self, _context: ContextHandle) {
        self.record("destroy");
    }

    fn dispose(&self, _context: ContextHandle) {
        self.record("dispose");
    }

    unsafe fn dispose_value(&self, value: RawValue) -> BridgeResult<()> {
        self.record("dispose_value");
        let serial = value.val_num as u64;
        let mut state = self.state.borrow_mut();
        if !state.live.remove(&serial) {
            state.stats.double_frees += 1;
            return Err(BridgeError::Dispose(format!(
                "value {} released twice",
                serial
            )));
        }
        ffi::free_shallow(value);
        if state.failing_disposals > 0 {
            state.failing_disposals -= 1;
            state.stats.failed += 1;
            return Err(BridgeError::Dispose(format!(
                "injected failure releasing value {}",
                serial
            )));
        }
        state.stats.disposed += 1;
        Ok(())
    }

    unsafe fn value_to_string(&self, value: &RawValue) -> Option<String> {
        ffi::read(value).ok().map(|value| value.to_string())
    }
}
