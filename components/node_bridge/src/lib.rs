//! Host-side bridge to an embedded Node.js runtime
//!
//! The runtime is a shared library exposing a small C ABI: create a context,
//! pass it argv, start it, evaluate scripts, call functions it returned, and
//! tear it down. This crate:
//!
//! - loads that library ([`NativeLibrary`]) behind the [`Engine`] trait
//! - converts host data to boundary [`Value`](bridge_types::Value)s
//!   ([`Encode`], [`Encoder`]) and back ([`Decoder`], [`HostValue`])
//! - owns the context lifecycle and releases every value the runtime hands
//!   out exactly once ([`RuntimeContext`])
//! - exposes runtime functions as host callables ([`Callable`])
//!
//! [`Node`] ties these together for the common case.
//!
//! Sessions are single threaded; nothing here is `Send` or `Sync`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod callable;
pub mod cli;
pub mod config;
pub mod context;
pub mod decoder;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod host;
pub mod library;
pub mod repl;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bridge_types::{BridgeError, BridgeResult, Value, ValueTag};
pub use callable::Callable;
pub use cli::Cli;
pub use config::NodeConfig;
pub use context::{ContextState, DisposeReport, MarshalOptions, RuntimeContext};
pub use decoder::{decode, Decoder};
pub use encoder::{encode, Displayed, Encode, Encoder};
pub use engine::Engine;
pub use error::{CliError, CliResult};
pub use host::HostValue;
pub use library::NativeLibrary;
pub use session::Node;
