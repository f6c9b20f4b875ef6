//! Shared-library backed [`Engine`].
//!
//! The embedding application chooses where the runtime library lives and
//! passes the loaded [`NativeLibrary`] to every context it creates; nothing
//! here is cached per process.

use crate::engine::Engine;
use crate::ffi::{ContextHandle, RawValue};
use bridge_types::{BridgeError, BridgeResult};
use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::fmt;
use std::path::{Path, PathBuf};

type CreateFn = unsafe extern "C" fn() -> *mut c_void;
type SetupFn = unsafe extern "C" fn(*mut c_void, c_int, *mut *mut c_char) -> c_int;
type InitFn = unsafe extern "C" fn(*mut c_void, c_int) -> c_int;
type RunScriptFn = unsafe extern "C" fn(*mut c_void, *const c_char) -> RawValue;
type CallFunctionFn = unsafe extern "C" fn(*mut c_void, RawValue, *mut RawValue, usize) -> RawValue;
type ContextFn = unsafe extern "C" fn(*mut c_void);
type DisposeValueFn = unsafe extern "C" fn(RawValue);
type ValueToStringFn = unsafe extern "C" fn(RawValue) -> *mut c_char;

/// Entry points resolved from the library.
struct Symbols {
    create: CreateFn,
    setup: SetupFn,
    init: InitFn,
    run_script: RunScriptFn,
    call_function: CallFunctionFn,
    stop: ContextFn,
    destroy: ContextFn,
    dispose: ContextFn,
    dispose_value: DisposeValueFn,
    value_to_string: Option<ValueToStringFn>,
}

/// A loaded runtime library.
pub struct NativeLibrary {
    symbols: Symbols,
    path: PathBuf,
    /// Kept alive so the resolved symbols stay mapped
    _library: libloading::Library,
}

impl NativeLibrary {
    /// Loads the runtime library at `path` and resolves its entry points.
    ///
    /// `Node_Value_To_String` is optional; every other symbol is required.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Library`] if the library cannot be opened or a
    /// required symbol is missing.
    pub fn load(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();

        // SAFETY: loading runs the library's initialisers; the caller chose
        // the library and vouches for it.
        let library = unsafe { libloading::Library::new(path) }.map_err(|e| {
            BridgeError::Library(format!("failed to load {}: {}", path.display(), e))
        })?;

        // SAFETY: the declared signatures match the runtime's exported C ABI
        let symbols = unsafe {
            Symbols {
                create: required(&library, b"NodeContext_Create\0")?,
                setup: required(&library, b"NodeContext_Setup\0")?,
                init: required(&library, b"NodeContext_Init\0")?,
                run_script: required(&library, b"NodeContext_Run_Script\0")?,
                call_function: required(&library, b"NodeContext_Call_Function\0")?,
                stop: required(&library, b"NodeContext_Stop\0")?,
                destroy: required(&library, b"NodeContext_Destroy\0")?,
                dispose: required(&library, b"NodeContext_Dispose\0")?,
                dispose_value: required(&library, b"Node_Dispose_Value\0")?,
                value_to_string: library
                    .get::<ValueToStringFn>(b"Node_Value_To_String\0")
                    .ok()
                    .map(|symbol| *symbol),
            }
        };

        tracing::info!(
            path = %path.display(),
            value_to_string = symbols.value_to_string.is_some(),
            "loaded runtime library"
        );

        Ok(Self {
            symbols,
            path: path.to_path_buf(),
            _library: library,
        })
    }

    /// Path the library was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

unsafe fn required<T: Copy>(library: &libloading::Library, name: &[u8]) -> BridgeResult<T> {
    library.get::<T>(name).map(|symbol| *symbol).map_err(|e| {
        let printable = String::from_utf8_lossy(&name[..name.len().saturating_sub(1)]);
        BridgeError::Library(format!("missing symbol {}: {}", printable, e))
    })
}

impl fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("path", &self.path)
            .finish()
    }
}

impl Engine for NativeLibrary {
    fn create(&self) -> Option<ContextHandle> {
        // SAFETY: no preconditions
        ContextHandle::new(unsafe { (self.symbols.create)() })
    }

    fn setup(&self, context: ContextHandle, argv: &[CString]) -> i32 {
        let mut pointers: Vec<*mut c_char> = argv
            .iter()
            .map(|arg| arg.as_ptr() as *mut c_char)
            .chain(std::iter::once(std::ptr::null_mut()))
            .collect();
        let argc = c_int::try_from(argv.len()).unwrap_or(c_int::MAX);
        // SAFETY: argv outlives the call and is NULL terminated
        unsafe { (self.symbols.setup)(context.as_ptr(), argc, pointers.as_mut_ptr()) }
    }

    fn init(&self, context: ContextHandle, thread_pool_size: i32) -> i32 {
        // SAFETY: the context came from `create`
        unsafe { (self.symbols.init)(context.as_ptr(), thread_pool_size) }
    }

    fn run_script(&self, context: ContextHandle, source: &CStr) -> RawValue {
        // SAFETY: the context came from `create` and `source` is NUL terminated
        unsafe { (self.symbols.run_script)(context.as_ptr(), source.as_ptr()) }
    }

    unsafe fn call_function(
        &self,
        context: ContextHandle,
        function: RawValue,
        args: &mut [RawValue],
    ) -> RawValue {
        (self.symbols.call_function)(context.as_ptr(), function, args.as_mut_ptr(), args.len())
    }

    fn stop(&self, context: ContextHandle) {
        // SAFETY: the context came from `create`
        unsafe { (self.symbols.stop)(context.as_ptr()) }
    }

    fn destroy(&self, context: ContextHandle) {
        // SAFETY: the context came from `create`
        unsafe { (self.symbols.destroy)(context.as_ptr()) }
    }

    fn dispose(&self, context: ContextHandle) {
        // SAFETY: the context came from `create`
        unsafe { (self.symbols.dispose)(context.as_ptr()) }
    }

    unsafe fn dispose_value(&self, value: RawValue) -> BridgeResult<()> {
        (self.symbols.dispose_value)(value);
        Ok(())
    }

    unsafe fn value_to_string(&self, value: &RawValue) -> Option<String> {
        let to_string = self.symbols.value_to_string?;
        let text = to_string(*value);
        if text.is_null() {
            return None;
        }
        // The runtime keeps ownership of the returned buffer
        Some(CStr::from_ptr(text).to_string_lossy().into_owned())
    }
}
