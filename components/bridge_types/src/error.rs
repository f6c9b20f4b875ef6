//! Bridge error types.
//!
//! Every failure raised while driving the embedded runtime or marshalling a
//! value across the boundary is reported as a [`BridgeError`]. Setup and init
//! failures carry the native status code so callers can correlate them with
//! what the runtime printed.

use thiserror::Error;

/// A failure raised by the runtime bridge.
///
/// # Examples
///
/// ```
/// use bridge_types::BridgeError;
///
/// let error = BridgeError::Setup { code: 9 };
/// assert_eq!(error.to_string(), "runtime setup failed with status 9");
/// assert_eq!(error.status_code(), Some(9));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The native library could not be loaded or is missing a symbol
    #[error("native library error: {0}")]
    Library(String),

    /// The runtime returned no context handle
    #[error("runtime context allocation failed")]
    CreateFailed,

    /// `setup` returned a non-zero status
    #[error("runtime setup failed with status {code}")]
    Setup {
        /// Native status code
        code: i32,
    },

    /// `init` returned a non-zero status
    #[error("runtime init failed with status {code}")]
    Init {
        /// Native status code
        code: i32,
    },

    /// An operation was issued in a lifecycle state that does not allow it
    #[error("cannot {operation} while the runtime context is {state}")]
    InvalidState {
        /// The rejected operation
        operation: &'static str,
        /// The state the context was in
        state: &'static str,
    },

    /// A boundary call was issued after the context was disposed
    #[error("runtime context used after dispose")]
    UseAfterDispose,

    /// A value could not be decoded into a host value
    #[error("decode error: {0}")]
    Decode(String),

    /// A host value could not be encoded into a boundary value
    #[error("encode error: {0}")]
    Encode(String),

    /// `call_function` was given a value that is not a function
    #[error("value of type {0} is not callable")]
    NotCallable(&'static str),

    /// Releasing a single value failed
    #[error("value disposal failed: {0}")]
    Dispose(String),

    /// A session was configured with unusable settings
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BridgeError {
    /// Native status code carried by setup and init failures.
    pub fn status_code(&self) -> Option<i32> {
        match self {
            BridgeError::Setup { code } | BridgeError::Init { code } => Some(*code),
            _ => None,
        }
    }

    /// Whether the context that raised this error can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::CreateFailed
                | BridgeError::Setup { .. }
                | BridgeError::Init { .. }
                | BridgeError::UseAfterDispose
                | BridgeError::Library(_)
                | BridgeError::Config(_)
        )
    }
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
