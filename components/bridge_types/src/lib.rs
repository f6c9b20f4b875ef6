//! Wire-level value types and error handling for the runtime bridge.
//!
//! This crate provides the foundational types shared by every layer of the
//! bridge: the tagged value that crosses the native boundary, its tag
//! enumeration, opaque function handles, and the bridge error type.
//!
//! # Overview
//!
//! - [`Value`] - Tagged representation of a runtime value
//! - [`ValueTag`] - Discriminant of a [`Value`] as laid out by the native ABI
//! - [`FunctionRef`] - A runtime-resident function handle plus its name
//! - [`BridgeError`] - Failures raised while crossing the boundary
//!
//! # Examples
//!
//! ```
//! use bridge_types::{Value, ValueTag};
//!
//! let greeting = Value::String("hello".to_string());
//! assert_eq!(greeting.tag(), ValueTag::String);
//! assert!(greeting.tag().owns_heap());
//!
//! let answer = Value::Number(42.0);
//! assert_eq!(answer.to_string(), "42");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod tag;
mod value;

pub use error::{BridgeError, BridgeResult};
pub use tag::ValueTag;
pub use value::{
    fits_safe_integer, parse_bigint, FunctionHandle, FunctionRef, Value, MAX_SAFE_INTEGER,
    MIN_SAFE_INTEGER,
};
