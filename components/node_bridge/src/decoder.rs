//! Boundary values to host values.

use crate::callable::Callable;
use crate::context::RuntimeContext;
use crate::host::HostValue;
use bridge_types::{parse_bigint, BridgeError, BridgeResult, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Decodes boundary values, binding Function values to a runtime context.
///
/// Decoding only reads the source value; whoever produced it keeps ownership.
#[derive(Debug, Clone)]
pub struct Decoder {
    context: Weak<RefCell<RuntimeContext>>,
    strict: bool,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::detached()
    }
}

impl Decoder {
    /// A decoder without a context; functions it produces report
    /// use-after-dispose when called.
    pub fn detached() -> Self {
        Self {
            context: Weak::new(),
            strict: false,
        }
    }

    /// A decoder whose functions call into `context`.
    pub fn bound(context: &Rc<RefCell<RuntimeContext>>) -> Self {
        Self::from_weak(Rc::downgrade(context))
    }

    pub(crate) fn from_weak(context: Weak<RefCell<RuntimeContext>>) -> Self {
        Self {
            context,
            strict: false,
        }
    }

    /// Rejects Unknown values with a decode error instead of mapping them to
    /// [`HostValue::None`].
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Whether Unknown values are rejected.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Decodes `value`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Decode`] for malformed BigInt digits and, in
    /// strict mode, for Unknown values. A failure aborts only this decode.
    pub fn decode(&self, value: &Value) -> BridgeResult<HostValue> {
        let host = match value {
            Value::Undefined | Value::Null => HostValue::None,
            Value::Boolean(b) => HostValue::Bool(*b),
            Value::Number(n) => HostValue::Float(*n),
            Value::String(s) => HostValue::Str(s.clone()),
            // Symbols have no host counterpart yet
            Value::Symbol(_) => HostValue::None,
            Value::Function(function) => HostValue::Function(Callable::new(
                self.context.clone(),
                function.clone(),
            )),
            Value::Array(items) => HostValue::List(
                items
                    .iter()
                    .map(|item| self.decode(item))
                    .collect::<BridgeResult<_>>()?,
            ),
            Value::BigInt(digits) => HostValue::Int(parse_bigint(digits)?),
            Value::Object(entries) => {
                let mut map = HashMap::with_capacity(entries.len());
                for (key, value) in entries {
                    map.insert(key.clone(), self.decode(value)?);
                }
                HostValue::Map(map)
            }
            Value::Unknown if self.strict => {
                return Err(BridgeError::Decode(
                    "runtime returned a value of unknown type".into(),
                ))
            }
            Value::Unknown => HostValue::None,
        };
        Ok(host)
    }
}

/// Decodes `value` without a context.
///
/// # Examples
///
/// ```
/// use bridge_types::Value;
/// use node_bridge::{decode, HostValue};
///
/// let host = decode(&Value::BigInt("123456789012345678901234567890".into())).unwrap();
/// assert_eq!(host.as_bigint().unwrap().to_string(), "123456789012345678901234567890");
/// assert!(decode(&Value::BigInt("abc".into())).is_err());
/// ```
pub fn decode(value: &Value) -> BridgeResult<HostValue> {
    Decoder::detached().decode(value)
}
