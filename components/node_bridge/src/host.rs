//! Host-side representation of decoded runtime values.

use crate::callable::Callable;
use num_bigint::BigInt;
use std::collections::HashMap;
use std::fmt;

/// A runtime value after decoding into host terms.
///
/// Undefined and null both decode to [`HostValue::None`]; every Number
/// decodes to [`HostValue::Float`], and only BigInt values decode to
/// [`HostValue::Int`].
///
/// # Examples
///
/// ```
/// use node_bridge::HostValue;
///
/// let list = HostValue::List(vec![HostValue::from(1.0), HostValue::from("a")]);
/// assert_eq!(list.to_string(), "[1, 'a']");
/// assert!(HostValue::None.is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// Absent value (`undefined`, `null`, symbols and unknown values)
    None,
    /// Boolean
    Bool(bool),
    /// Double precision number
    Float(f64),
    /// Arbitrary precision integer
    Int(BigInt),
    /// Text
    Str(String),
    /// Ordered sequence
    List(Vec<HostValue>),
    /// String-keyed mapping
    Map(HashMap<String, HostValue>),
    /// Function living in the runtime
    Function(Callable),
}

impl HostValue {
    /// Whether this is the absent value.
    pub fn is_none(&self) -> bool {
        matches!(self, HostValue::None)
    }

    /// Boolean payload.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Number payload.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HostValue::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Integer payload.
    pub fn as_bigint(&self) -> Option<&BigInt> {
        match self {
            HostValue::Int(n) => Some(n),
            _ => None,
        }
    }

    /// Text payload.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Sequence payload.
    pub fn as_list(&self) -> Option<&[HostValue]> {
        match self {
            HostValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Mapping payload.
    pub fn as_map(&self) -> Option<&HashMap<String, HostValue>> {
        match self {
            HostValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Function payload.
    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            HostValue::Function(callable) => Some(callable),
            _ => None,
        }
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        HostValue::Bool(b)
    }
}

impl From<f64> for HostValue {
    fn from(n: f64) -> Self {
        HostValue::Float(n)
    }
}

impl From<BigInt> for HostValue {
    fn from(n: BigInt) -> Self {
        HostValue::Int(n)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::Str(s.to_string())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        HostValue::Str(s)
    }
}

impl From<Vec<HostValue>> for HostValue {
    fn from(items: Vec<HostValue>) -> Self {
        HostValue::List(items)
    }
}

impl From<HashMap<String, HostValue>> for HostValue {
    fn from(entries: HashMap<String, HostValue>) -> Self {
        HostValue::Map(entries)
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(HostValue::None, Into::into)
    }
}

/// REPL-style rendering: strings quoted, maps with sorted keys.
impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::None => write!(f, "null"),
            HostValue::Bool(b) => write!(f, "{}", b),
            HostValue::Float(n) => write!(f, "{}", bridge_types::Value::Number(*n)),
            HostValue::Int(n) => write!(f, "{}n", n),
            HostValue::Str(s) => write!(f, "'{}'", s),
            HostValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            HostValue::Map(entries) => {
                let mut keys: Vec<&String> = entries.keys().collect();
                keys.sort();
                write!(f, "{{")?;
                for (i, key) in keys.into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {}: {}", key, entries[key])?;
                }
                if entries.is_empty() {
                    write!(f, "}}")
                } else {
                    write!(f, " }}")
                }
            }
            HostValue::Function(callable) => {
                if callable.name().is_empty() {
                    write!(f, "[Function (anonymous)]")
                } else {
                    write!(f, "[Function: {}]", callable.name())
                }
            }
        }
    }
}
