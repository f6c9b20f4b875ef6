//! `#[repr(C)]` mirror of the runtime's value struct.
//!
//! Everything that touches raw boundary memory lives here:
//!
//! - [`RawValue`] - the C layout exchanged with the runtime
//! - [`alloc`] / [`free`] - host-side allocation of boundary values
//! - [`read`] - copies a runtime-owned value into an owned [`Value`]
//! - [`owned_nodes`] - every heap-owning node of a runtime value
//! - [`HostValues`] - request-scoped argument buffers released on drop
//!
//! Memory allocated by [`alloc`] must only be released by [`free`]; memory the
//! runtime hands out must only be released through the runtime's own
//! `dispose_value` entry point.

use bridge_types::{BridgeError, BridgeResult, FunctionHandle, FunctionRef, Value, ValueTag};
use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::ptr::{self, NonNull};

/// C layout of a boundary value.
///
/// Only the fields selected by `tag` are meaningful; every other pointer is
/// null and every other length is zero.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawValue {
    /// Raw [`ValueTag`] discriminant
    pub tag: c_int,
    /// Boolean payload
    pub val_bool: bool,
    /// Number payload
    pub val_num: f64,
    /// NUL-terminated UTF-8 string payload
    pub val_string: *mut c_char,
    /// Symbol description
    pub val_symbol: *mut c_char,
    /// Name of a function value
    pub function_name: *mut c_char,
    /// Runtime-side function handle; never owned by the host
    pub function: *mut c_void,
    /// Array elements
    pub val_array: *mut RawValue,
    /// Number of array elements
    pub val_array_len: c_int,
    /// Decimal digits of a BigInt
    pub val_big: *mut c_char,
    /// Object keys, parallel to `object_values`
    pub object_keys: *mut *mut c_char,
    /// Object values, parallel to `object_keys`
    pub object_values: *mut RawValue,
    /// Number of object entries
    pub object_len: c_int,
    /// Receiver the runtime attaches to array elements and object values;
    /// a function carrying one is called with it as `this`
    pub parent: *mut c_void,
}

impl RawValue {
    /// A value with the given tag and no payload.
    pub fn empty(tag: ValueTag) -> Self {
        Self {
            tag: tag.as_raw(),
            val_bool: false,
            val_num: 0.0,
            val_string: ptr::null_mut(),
            val_symbol: ptr::null_mut(),
            function_name: ptr::null_mut(),
            function: ptr::null_mut(),
            val_array: ptr::null_mut(),
            val_array_len: 0,
            val_big: ptr::null_mut(),
            object_keys: ptr::null_mut(),
            object_values: ptr::null_mut(),
            object_len: 0,
            parent: ptr::null_mut(),
        }
    }

    /// Decoded tag; discriminants outside the ABI map to `Unknown`.
    pub fn tag(&self) -> ValueTag {
        ValueTag::from_raw(self.tag)
    }
}

/// Opaque, non-null handle to a runtime context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextHandle(NonNull<c_void>);

impl ContextHandle {
    /// Wraps a handle returned by the runtime; `None` for null.
    pub fn new(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    /// Wraps a handle known to be non-null.
    pub fn from_non_null(ptr: NonNull<c_void>) -> Self {
        Self(ptr)
    }

    /// Raw pointer passed to the runtime.
    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// Allocates a boundary copy of `value` on the host side.
///
/// # Errors
///
/// Returns [`BridgeError::Encode`] when a string contains an interior NUL byte
/// or a container is longer than the ABI's `int` length fields allow. Nothing
/// is leaked on failure.
pub fn alloc(value: &Value) -> BridgeResult<RawValue> {
    let mut raw = RawValue::empty(value.tag());
    match value {
        Value::Undefined | Value::Null | Value::Unknown => {}
        Value::Boolean(b) => raw.val_bool = *b,
        Value::Number(n) => raw.val_num = *n,
        Value::String(s) => raw.val_string = alloc_string(s)?,
        Value::Symbol(description) => {
            if let Some(description) = description {
                raw.val_symbol = alloc_string(description)?;
            }
        }
        Value::Function(function) => {
            raw.function = function.handle.as_ptr();
            raw.function_name = alloc_string(&function.name)?;
            raw.parent = function.receiver.map_or(ptr::null_mut(), FunctionHandle::as_ptr);
        }
        Value::Array(items) => {
            let len = c_len(items.len())?;
            let children = alloc_values(items.iter())?;
            raw.val_array = leak_slice(children);
            raw.val_array_len = len;
        }
        Value::BigInt(digits) => raw.val_big = alloc_string(digits)?,
        Value::Object(entries) => {
            let len = c_len(entries.len())?;
            let values = alloc_values(entries.iter().map(|(_, v)| v))?;
            let mut keys = Vec::with_capacity(entries.len());
            for (key, _) in entries {
                match alloc_string(key) {
                    Ok(key) => keys.push(key),
                    Err(e) => {
                        // SAFETY: every pointer here was produced by this module
                        unsafe {
                            keys.into_iter().for_each(|k| free_string(k));
                            values.into_iter().for_each(|v| free(v));
                        }
                        return Err(e);
                    }
                }
            }
            raw.object_keys = leak_slice(keys);
            raw.object_values = leak_slice(values);
            raw.object_len = len;
        }
    }
    Ok(raw)
}

/// Releases a value produced by [`alloc`], children included.
///
/// The `function` and `parent` handles are never touched; they belong to the
/// runtime.
///
/// # Safety
///
/// `raw` must come from [`alloc`] and must not have been freed already.
pub unsafe fn free(raw: RawValue) {
    for child in children(&raw) {
        free(*child);
    }
    free_shallow(raw);
}

/// Releases the buffers of one node: its strings, its key strings and the
/// element buffers themselves, but not what the elements own.
///
/// This is the granularity of the runtime's `dispose_value`, which is why the
/// host has to release nested values one by one.
///
/// # Safety
///
/// `raw` must come from [`alloc`] and must not have been freed already. The
/// children stay readable only until this returns.
pub unsafe fn free_shallow(raw: RawValue) {
    free_string(raw.val_string);
    free_string(raw.val_symbol);
    free_string(raw.function_name);
    free_string(raw.val_big);
    if !raw.val_array.is_null() {
        drop(reclaim_slice(raw.val_array, raw.val_array_len));
    }
    if !raw.object_keys.is_null() {
        for key in reclaim_slice(raw.object_keys, raw.object_len).iter() {
            free_string(*key);
        }
    }
    if !raw.object_values.is_null() {
        drop(reclaim_slice(raw.object_values, raw.object_len));
    }
}

/// Every heap-owning node of `raw`, children before their container.
///
/// Releasing the nodes in this order never touches a buffer that was already
/// released. Containers whose length or buffer is malformed are listed but
/// not walked.
///
/// # Safety
///
/// Same contract as [`read`].
pub unsafe fn owned_nodes(raw: &RawValue) -> Vec<RawValue> {
    let mut out = Vec::new();
    collect_owned(raw, &mut out);
    out
}

unsafe fn collect_owned(raw: &RawValue, out: &mut Vec<RawValue>) {
    for child in children(raw) {
        collect_owned(child, out);
    }
    if raw.tag().owns_heap() {
        out.push(*raw);
    }
}

/// Array elements and object values; empty when the buffer is unusable.
unsafe fn children<'a>(raw: &RawValue) -> &'a [RawValue] {
    let slice = match raw.tag() {
        ValueTag::Array => raw_slice(raw.val_array, raw.val_array_len, "array"),
        ValueTag::Object => raw_slice(raw.object_values, raw.object_len, "object values"),
        _ => Ok(&[][..]),
    };
    slice.unwrap_or(&[])
}

/// Copies a boundary value into an owned [`Value`].
///
/// The source is only read; whoever produced it still owns its buffers.
///
/// # Errors
///
/// Returns [`BridgeError::Decode`] for null payloads where the tag requires
/// one, negative lengths, and strings that are not valid UTF-8.
///
/// # Safety
///
/// Every non-null pointer in `raw` (recursively) must be valid for reads and
/// every length must describe the buffer it accompanies.
pub unsafe fn read(raw: &RawValue) -> BridgeResult<Value> {
    let value = match raw.tag() {
        ValueTag::Undefined => Value::Undefined,
        ValueTag::Null => Value::Null,
        ValueTag::Boolean => Value::Boolean(raw.val_bool),
        ValueTag::Number => Value::Number(raw.val_num),
        ValueTag::String => Value::String(read_string(raw.val_string, "string")?),
        ValueTag::Symbol => Value::Symbol(read_optional_string(raw.val_symbol, "symbol")?),
        ValueTag::Function => {
            if raw.function.is_null() {
                return Err(BridgeError::Decode("function value without a handle".into()));
            }
            // Some runtime builds report the name through the string slot
            let name = if raw.function_name.is_null() {
                raw.val_string
            } else {
                raw.function_name
            };
            let name = read_optional_string(name, "function name")?.unwrap_or_default();
            let function = FunctionRef::new(FunctionHandle::from_raw(raw.function), name);
            Value::Function(if raw.parent.is_null() {
                function
            } else {
                function.with_receiver(FunctionHandle::from_raw(raw.parent))
            })
        }
        ValueTag::Array => {
            let items = raw_slice(raw.val_array, raw.val_array_len, "array")?;
            Value::Array(items.iter().map(|c| read(c)).collect::<BridgeResult<_>>()?)
        }
        ValueTag::BigInt => Value::BigInt(read_string(raw.val_big, "bigint")?),
        ValueTag::Object => {
            let keys = raw_slice(raw.object_keys, raw.object_len, "object keys")?;
            let values = raw_slice(raw.object_values, raw.object_len, "object values")?;
            let mut entries = Vec::with_capacity(keys.len());
            for (key, value) in keys.iter().zip(values) {
                entries.push((read_string(*key, "object key")?, read(value)?));
            }
            Value::Object(entries)
        }
        ValueTag::Unknown => Value::Unknown,
    };
    Ok(value)
}

/// Host-allocated boundary values that live for one request.
///
/// The buffers are released when this is dropped, so arguments never outlive
/// the call they were encoded for.
pub struct HostValues {
    values: Vec<RawValue>,
}

impl HostValues {
    /// Allocates boundary copies of `values`.
    pub fn alloc(values: &[Value]) -> BridgeResult<Self> {
        Ok(Self {
            values: alloc_values(values.iter())?,
        })
    }

    /// The allocated values, in input order.
    pub fn as_mut_slice(&mut self) -> &mut [RawValue] {
        &mut self.values
    }

    /// The first allocated value.
    pub fn first(&self) -> Option<RawValue> {
        self.values.first().copied()
    }

    /// Number of allocated values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no values were allocated.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Drop for HostValues {
    fn drop(&mut self) {
        for raw in self.values.drain(..) {
            // SAFETY: values were produced by `alloc` and are freed only here
            unsafe { free(raw) }
        }
    }
}

fn alloc_string(text: &str) -> BridgeResult<*mut c_char> {
    CString::new(text)
        .map(CString::into_raw)
        .map_err(|_| BridgeError::Encode(format!("string contains a NUL byte: {:?}", text)))
}

fn alloc_values<'a>(values: impl Iterator<Item = &'a Value>) -> BridgeResult<Vec<RawValue>> {
    let mut out = Vec::new();
    for value in values {
        match alloc(value) {
            Ok(raw) => out.push(raw),
            Err(e) => {
                // SAFETY: every element was produced by `alloc` above
                out.into_iter().for_each(|raw| unsafe { free(raw) });
                return Err(e);
            }
        }
    }
    Ok(out)
}

fn c_len(len: usize) -> BridgeResult<c_int> {
    c_int::try_from(len)
        .map_err(|_| BridgeError::Encode(format!("container of {} elements is too large", len)))
}

fn leak_slice<T>(items: Vec<T>) -> *mut T {
    Box::into_raw(items.into_boxed_slice()) as *mut T
}

unsafe fn reclaim_slice<T>(ptr: *mut T, len: c_int) -> Box<[T]> {
    Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len.max(0) as usize))
}

unsafe fn free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

unsafe fn raw_slice<'a, T>(ptr: *const T, len: c_int, what: &str) -> BridgeResult<&'a [T]> {
    let len = usize::try_from(len)
        .map_err(|_| BridgeError::Decode(format!("{} has negative length {}", what, len)))?;
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(BridgeError::Decode(format!(
            "{} of length {} has no buffer",
            what, len
        )));
    }
    Ok(std::slice::from_raw_parts(ptr, len))
}

unsafe fn read_string(ptr: *const c_char, what: &str) -> BridgeResult<String> {
    read_optional_string(ptr, what)?
        .ok_or_else(|| BridgeError::Decode(format!("{} payload is null", what)))
}

unsafe fn read_optional_string(ptr: *const c_char, what: &str) -> BridgeResult<Option<String>> {
    if ptr.is_null() {
        return Ok(None);
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map(|s| Some(s.to_owned()))
        .map_err(|e| BridgeError::Decode(format!("{} is not valid UTF-8: {}", what, e)))
}
