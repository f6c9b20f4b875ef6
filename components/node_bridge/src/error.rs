//! Error types for the command line front end

use bridge_types::BridgeError;
use std::fmt;

/// CLI-specific errors
#[derive(Debug)]
pub enum CliError {
    /// Failure reported by the bridge
    Bridge(BridgeError),

    /// File I/O error
    Io(std::io::Error),

    /// Missing or inconsistent arguments
    Usage(String),

    /// REPL error
    Repl(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Bridge(e) => write!(f, "{}", e),
            CliError::Io(e) => write!(f, "File error: {}", e),
            CliError::Usage(s) => write!(f, "Usage error: {}", s),
            CliError::Repl(s) => write!(f, "REPL error: {}", s),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Bridge(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BridgeError> for CliError {
    fn from(err: BridgeError) -> Self {
        CliError::Bridge(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err)
    }
}

impl From<rustyline::error::ReadlineError> for CliError {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        CliError::Repl(err.to_string())
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
