//! Host values to boundary values.
//!
//! Tag selection follows a fixed order:
//!
//! 1. absent (`None`, `()`) → Null
//! 2. integers → Number inside ±(2^53 − 1), BigInt with the exact decimal
//!    digits outside it
//! 3. floats → Number
//! 4. sequences and sets → Array, element order preserved
//! 5. maps → Object, keys rendered through `Display`
//! 6. text → String
//! 7. anything else implementing `Display`, via [`Displayed`] → String
//!
//! Nesting is bounded by [`Encoder::max_depth`], and shared cells
//! (`Rc<RefCell<T>>`) are checked for cycles, so a self-referencing structure
//! fails with [`BridgeError::Encode`] instead of recursing forever.

use crate::callable::Callable;
use crate::host::HostValue;
use bridge_types::{fits_safe_integer, BridgeError, BridgeResult, Value, MAX_SAFE_INTEGER};
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::Display;
use std::hash::BuildHasher;
use std::rc::Rc;

/// Default bound on container nesting.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// A host value that can be sent to the runtime.
pub trait Encode {
    /// Produces the boundary representation of `self`.
    fn encode(&self, encoder: &mut Encoder) -> BridgeResult<Value>;
}

/// Recursive encoder state: the nesting depth and the shared cells currently
/// being encoded.
#[derive(Debug)]
pub struct Encoder {
    max_depth: usize,
    depth: usize,
    active: HashSet<usize>,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    /// An encoder with the default depth bound.
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    /// An encoder refusing containers nested deeper than `max_depth`.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            depth: 0,
            active: HashSet::new(),
        }
    }

    /// Configured depth bound.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Encodes any [`Encode`] value.
    pub fn encode<T: Encode + ?Sized>(&mut self, value: &T) -> BridgeResult<Value> {
        value.encode(self)
    }

    /// Encodes a signed integer.
    pub fn integer(&mut self, n: i128) -> Value {
        if fits_safe_integer(n) {
            Value::Number(n as f64)
        } else {
            Value::BigInt(n.to_string())
        }
    }

    /// Encodes an unsigned integer.
    pub fn unsigned(&mut self, n: u128) -> Value {
        if n <= MAX_SAFE_INTEGER as u128 {
            Value::Number(n as f64)
        } else {
            Value::BigInt(n.to_string())
        }
    }

    /// Encodes an arbitrary precision integer.
    pub fn big_integer(&mut self, n: &BigInt) -> Value {
        match n.to_i128() {
            Some(small) => self.integer(small),
            None => Value::BigInt(n.to_string()),
        }
    }

    /// Encodes `value` through its canonical text form.
    pub fn stringify<T: Display + ?Sized>(&mut self, value: &T) -> Value {
        Value::String(value.to_string())
    }

    /// Runs `f` one nesting level deeper.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Encode`] when the depth bound is exceeded.
    pub fn nested<F>(&mut self, f: F) -> BridgeResult<Value>
    where
        F: FnOnce(&mut Self) -> BridgeResult<Value>,
    {
        if self.depth >= self.max_depth {
            return Err(BridgeError::Encode(format!(
                "value nests deeper than {} levels",
                self.max_depth
            )));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Encodes every item, in iteration order, as an Array.
    pub fn sequence<'a, T, I>(&mut self, items: I) -> BridgeResult<Value>
    where
        T: Encode + ?Sized + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        self.nested(|encoder| {
            let items = items
                .into_iter()
                .map(|item| item.encode(encoder))
                .collect::<BridgeResult<Vec<_>>>()?;
            Ok(Value::Array(items))
        })
    }

    /// Encodes every entry as an Object, rendering keys with `Display`.
    pub fn mapping<'a, K, V, I>(&mut self, entries: I) -> BridgeResult<Value>
    where
        K: Display + ?Sized + 'a,
        V: Encode + ?Sized + 'a,
        I: IntoIterator<Item = (&'a K, &'a V)>,
    {
        self.nested(|encoder| {
            let entries = entries
                .into_iter()
                .map(|(key, value)| Ok((key.to_string(), value.encode(encoder)?)))
                .collect::<BridgeResult<Vec<_>>>()?;
            Ok(Value::Object(entries))
        })
    }

    /// Encodes the contents of a shared cell, failing if the cell is already
    /// being encoded further up the tree.
    pub fn shared<T: Encode + ?Sized>(&mut self, cell: &Rc<RefCell<T>>) -> BridgeResult<Value> {
        let key = Rc::as_ptr(cell) as *const () as usize;
        if !self.active.insert(key) {
            return Err(BridgeError::Encode(
                "cyclic structure cannot be sent to the runtime".into(),
            ));
        }
        let result = match cell.try_borrow() {
            Ok(inner) => inner.encode(self),
            Err(_) => Err(BridgeError::Encode(
                "shared value is mutably borrowed".into(),
            )),
        };
        self.active.remove(&key);
        result
    }
}

/// Encodes `value` with a fresh [`Encoder`].
///
/// # Examples
///
/// ```
/// use bridge_types::Value;
/// use node_bridge::encode;
///
/// assert_eq!(encode(&9_007_199_254_740_991i64).unwrap(), Value::Number(9_007_199_254_740_991.0));
/// assert_eq!(
///     encode(&9_007_199_254_740_992i64).unwrap(),
///     Value::BigInt("9007199254740992".to_string())
/// );
/// ```
pub fn encode<T: Encode + ?Sized>(value: &T) -> BridgeResult<Value> {
    Encoder::new().encode(value)
}

/// Sends any `Display` value as its text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Displayed<T>(pub T);

impl<T: Display> Encode for Displayed<T> {
    fn encode(&self, encoder: &mut Encoder) -> BridgeResult<Value> {
        Ok(encoder.stringify(&self.0))
    }
}

macro_rules! encode_signed {
    ($($t:ty),*) => {$(
        impl Encode for $t {
            fn encode(&self, encoder: &mut Encoder) -> BridgeResult<Value> {
                Ok(encoder.integer(*self as i128))
            }
        }
    )*};
}

macro_rules! encode_unsigned {
    ($($t:ty),*) => {$(
        impl Encode for $t {
            fn encode(&self, encoder: &mut Encoder) -> BridgeResult<Value> {
                Ok(encoder.unsigned(*self as u128))
            }
        }
    )*};
}

encode_signed!(i8, i16, i32, i64, i128, isize);
encode_unsigned!(u8, u16, u32, u64, u128, usize);

impl Encode for f64 {
    fn encode(&self, _: &mut Encoder) -> BridgeResult<Value> {
        Ok(Value::Number(*self))
    }
}

impl Encode for f32 {
    fn encode(&self, _: &mut Encoder) -> BridgeResult<Value> {
        Ok(Value::Number(f64::from(*self)))
    }
}

impl Encode for bool {
    fn encode(&self, _: &mut Encoder) -> BridgeResult<Value> {
        Ok(Value::Boolean(*self))
    }
}

impl Encode for () {
    fn encode(&self, _: &mut Encoder) -> BridgeResult<Value> {
        Ok(Value::Null)
    }
}

impl Encode for char {
    fn encode(&self, encoder: &mut Encoder) -> BridgeResult<Value> {
        Ok(encoder.stringify(self))
    }
}

impl Encode for str {
    fn encode(&self, _: &mut Encoder) -> BridgeResult<Value> {
        Ok(Value::String(self.to_string()))
    }
}

impl Encode for String {
    fn encode(&self, _: &mut Encoder) -> BridgeResult<Value> {
        Ok(Value::String(self.clone()))
    }
}

impl Encode for BigInt {
    fn encode(&self, encoder: &mut Encoder) -> BridgeResult<Value> {
        Ok(encoder.big_integer(self))
    }
}

impl Encode for Value {
    fn encode(&self, _: &mut Encoder) -> BridgeResult<Value> {
        Ok(self.clone())
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, encoder: &mut Encoder) -> BridgeResult<Value> {
        (**self).encode(encoder)
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encode(&self, encoder: &mut Encoder) -> BridgeResult<Value> {
        (**self).encode(encoder)
    }
}

impl<T: Encode + ?Sized> Encode for Rc<RefCell<T>> {
    fn encode(&self, encoder: &mut Encoder) -> BridgeResult<Value> {
        encoder.shared(self)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, encoder: &mut Encoder) -> BridgeResult<Value> {
        match self {
            Some(value) => value.encode(encoder),
            None => Ok(Value::Null),
        }
    }
}

impl<T: Encode> Encode for [T] {
    fn encode(&self, encoder: &mut Encoder) -> BridgeResult<Value> {
        encoder.sequence(self)
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode(&self, encoder: &mut Encoder) -> BridgeResult<Value> {
        encoder.sequence(self)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, encoder: &mut Encoder) -> BridgeResult<Value> {
        encoder.sequence(self)
    }
}

impl<T: Encode> Encode for VecDeque<T> {
    fn encode(&self, encoder: &mut Encoder) -> BridgeResult<Value> {
        encoder.sequence(self)
    }
}

impl<T: Encode, S: BuildHasher> Encode for HashSet<T, S> {
    fn encode(&self, encoder: &mut Encoder) -> BridgeResult<Value> {
        encoder.sequence(self)
    }
}

impl<T: Encode> Encode for BTreeSet<T> {
    fn encode(&self, encoder: &mut Encoder) -> BridgeResult<Value> {
        encoder.sequence(self)
    }
}

impl<K: Display, V: Encode, S: BuildHasher> Encode for HashMap<K, V, S> {
    fn encode(&self, encoder: &mut Encoder) -> BridgeResult<Value> {
        encoder.mapping(self)
    }
}

impl<K: Display, V: Encode> Encode for BTreeMap<K, V> {
    fn encode(&self, encoder: &mut Encoder) -> BridgeResult<Value> {
        encoder.mapping(self)
    }
}

macro_rules! encode_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Encode),+> Encode for ($($name,)+) {
            fn encode(&self, encoder: &mut Encoder) -> BridgeResult<Value> {
                encoder.nested(|encoder| {
                    Ok(Value::Array(vec![$(self.$idx.encode(encoder)?),+]))
                })
            }
        }
    };
}

encode_tuple!(A: 0);
encode_tuple!(A: 0, B: 1);
encode_tuple!(A: 0, B: 1, C: 2);
encode_tuple!(A: 0, B: 1, C: 2, D: 3);

impl Encode for Callable {
    fn encode(&self, _: &mut Encoder) -> BridgeResult<Value> {
        if !self.is_alive() {
            return Err(BridgeError::Encode(format!(
                "function {:?} belongs to a disposed runtime context",
                self.name()
            )));
        }
        Ok(Value::Function(self.function_ref().clone()))
    }
}

impl Encode for HostValue {
    fn encode(&self, encoder: &mut Encoder) -> BridgeResult<Value> {
        match self {
            HostValue::None => Ok(Value::Null),
            HostValue::Bool(b) => b.encode(encoder),
            HostValue::Float(n) => n.encode(encoder),
            HostValue::Int(n) => n.encode(encoder),
            HostValue::Str(s) => s.encode(encoder),
            HostValue::List(items) => encoder.sequence(items),
            HostValue::Map(entries) => encoder.mapping(entries),
            HostValue::Function(callable) => callable.encode(encoder),
        }
    }
}
