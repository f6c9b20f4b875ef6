//! Boundary value representation.
//!
//! This module provides the `Value` enum exchanged with the embedded runtime.
//! Exactly one payload is active per variant and every buffer payload is an
//! owned Rust buffer, so a `Value` has a single release point: its drop.

use crate::{BridgeError, BridgeResult, ValueTag};
use num_bigint::BigInt;
use std::ffi::c_void;
use std::fmt;

/// Largest integer magnitude a double represents exactly (`2^53 - 1`).
pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// Negative counterpart of [`MAX_SAFE_INTEGER`].
pub const MIN_SAFE_INTEGER: i64 = -MAX_SAFE_INTEGER;

/// Whether `n` lies inside the safe-integer range and can travel as a
/// Number without losing precision.
///
/// # Examples
///
/// ```
/// use bridge_types::fits_safe_integer;
///
/// assert!(fits_safe_integer((1i128 << 53) - 1));
/// assert!(!fits_safe_integer(1i128 << 53));
/// ```
pub fn fits_safe_integer(n: i128) -> bool {
    (MIN_SAFE_INTEGER as i128..=MAX_SAFE_INTEGER as i128).contains(&n)
}

/// Parses the decimal payload of a BigInt value.
///
/// Only an optional leading `-` followed by ASCII digits is accepted.
///
/// # Errors
///
/// Returns [`BridgeError::Decode`] for empty or non base-10 text.
///
/// # Examples
///
/// ```
/// use bridge_types::parse_bigint;
///
/// let n = parse_bigint("-42").unwrap();
/// assert_eq!(n.to_string(), "-42");
/// assert!(parse_bigint("abc").is_err());
/// ```
pub fn parse_bigint(digits: &str) -> BridgeResult<BigInt> {
    let unsigned = digits.strip_prefix('-').unwrap_or(digits);
    if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BridgeError::Decode(format!(
            "invalid bigint literal {:?}",
            digits
        )));
    }
    BigInt::parse_bytes(digits.as_bytes(), 10)
        .ok_or_else(|| BridgeError::Decode(format!("invalid bigint literal {:?}", digits)))
}

/// Opaque handle to an object living inside the runtime: a function, or the
/// receiver a method was read from.
///
/// The handle is never dereferenced on the host side; it is only handed back
/// to the runtime when the function is called.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionHandle(*mut c_void);

impl FunctionHandle {
    /// Wraps a raw handle received from the runtime.
    pub fn from_raw(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    /// Returns the raw handle for passing back to the runtime.
    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }

    /// Whether the runtime handed out a null handle.
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

impl fmt::Debug for FunctionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionHandle({:p})", self.0)
    }
}

/// A runtime-resident function: its handle plus the name the runtime reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRef {
    /// Handle passed back to `call_function`
    pub handle: FunctionHandle,
    /// Function name (empty for anonymous functions)
    pub name: String,
    /// `this` for the call when the function was read off an array or
    /// object; `None` calls it on the global object
    pub receiver: Option<FunctionHandle>,
}

impl FunctionRef {
    /// A function called on the global object.
    pub fn new(handle: FunctionHandle, name: impl Into<String>) -> Self {
        Self {
            handle,
            name: name.into(),
            receiver: None,
        }
    }

    /// Binds the call receiver.
    pub fn with_receiver(mut self, receiver: FunctionHandle) -> Self {
        self.receiver = Some(receiver);
        self
    }
}

/// A value crossing the runtime boundary.
///
/// # Examples
///
/// ```
/// use bridge_types::{Value, ValueTag};
///
/// let list = Value::Array(vec![Value::Number(1.0), Value::String("a".into())]);
/// assert_eq!(list.tag(), ValueTag::Array);
/// assert_eq!(list.to_string(), "1,a");
/// assert_eq!(Value::Null.to_string(), "null");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// JavaScript undefined value
    Undefined,
    /// JavaScript null value
    Null,
    /// JavaScript boolean (true or false)
    Boolean(bool),
    /// IEEE 754 double-precision floating point
    Number(f64),
    /// UTF-8 string
    String(String),
    /// Symbol, carrying its description when the runtime reported one
    Symbol(Option<String>),
    /// Function living inside the runtime
    Function(FunctionRef),
    /// Ordered sequence of values
    Array(Vec<Value>),
    /// Arbitrary precision integer as base-10 text
    BigInt(String),
    /// String-keyed entries; order carries no meaning
    Object(Vec<(String, Value)>),
    /// Value the runtime could not classify
    Unknown,
}

impl Value {
    /// Returns the ABI tag of this value.
    pub fn tag(&self) -> ValueTag {
        match self {
            Value::Undefined => ValueTag::Undefined,
            Value::Null => ValueTag::Null,
            Value::Boolean(_) => ValueTag::Boolean,
            Value::Number(_) => ValueTag::Number,
            Value::String(_) => ValueTag::String,
            Value::Symbol(_) => ValueTag::Symbol,
            Value::Function(_) => ValueTag::Function,
            Value::Array(_) => ValueTag::Array,
            Value::BigInt(_) => ValueTag::BigInt,
            Value::Object(_) => ValueTag::Object,
            Value::Unknown => ValueTag::Unknown,
        }
    }

    /// Whether this value is `undefined` or `null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Returns the function reference for Function values.
    pub fn as_function(&self) -> Option<&FunctionRef> {
        match self {
            Value::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Number of values in this tree, counting the value itself.
    pub fn node_count(&self) -> usize {
        match self {
            Value::Array(items) => 1 + items.iter().map(Value::node_count).sum::<usize>(),
            Value::Object(entries) => {
                1 + entries.iter().map(|(_, v)| v.node_count()).sum::<usize>()
            }
            _ => 1,
        }
    }
}

/// Follows JavaScript's `String()` conversion for primitives.
///
/// - undefined → "undefined"
/// - number → shortest decimal, `NaN`, `Infinity`
/// - array → elements joined with `,` (nullish elements render empty)
/// - object → "[object Object]"
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => {
                if n.is_nan() {
                    write!(f, "NaN")
                } else if n.is_infinite() {
                    if n.is_sign_positive() {
                        write!(f, "Infinity")
                    } else {
                        write!(f, "-Infinity")
                    }
                } else if n.fract() == 0.0 && n.abs() < 1e15 {
                    // Integer-valued doubles display without decimal point
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::Symbol(description) => {
                write!(f, "Symbol({})", description.as_deref().unwrap_or(""))
            }
            Value::Function(function) => {
                write!(f, "function {}() {{ [native code] }}", function.name)
            }
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    if !item.is_nullish() {
                        write!(f, "{}", item)?;
                    }
                }
                Ok(())
            }
            Value::BigInt(digits) => write!(f, "{}", digits),
            Value::Object(_) => write!(f, "[object Object]"),
            Value::Unknown => write!(f, "[unknown]"),
        }
    }
}
