//! Session configuration.
//!
//! Settings come from builder methods, `NODE_BRIDGE_*` environment variables
//! or a JSON file. Missing JSON fields keep their defaults.

use crate::encoder::DEFAULT_MAX_DEPTH;
use bridge_types::{BridgeError, BridgeResult};
use serde::Deserialize;
use std::path::Path;

/// Environment variable holding the worker thread count.
pub const THREAD_POOL_SIZE_VAR: &str = "NODE_BRIDGE_THREAD_POOL_SIZE";
/// Environment variable enabling strict decoding.
pub const STRICT_DECODE_VAR: &str = "NODE_BRIDGE_STRICT_DECODE";

const DEFAULT_PROGRAM_NAME: &str = "node-bridge";

/// Settings for one [`Node`](crate::Node) session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    /// Background worker threads started by the runtime (at least 1)
    pub thread_pool_size: u32,
    /// `argv[0]` handed to the runtime
    pub program_name: String,
    /// Further argv entries
    pub extra_args: Vec<String>,
    /// Nesting bound for encoded arguments
    pub max_encode_depth: usize,
    /// Reject values of unknown type instead of decoding them as absent
    pub strict_decode: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            thread_pool_size: 1,
            program_name: default_program_name(),
            extra_args: Vec::new(),
            max_encode_depth: DEFAULT_MAX_DEPTH,
            strict_decode: false,
        }
    }
}

impl NodeConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the worker thread count.
    pub fn with_thread_pool_size(mut self, size: u32) -> Self {
        self.thread_pool_size = size;
        self
    }

    /// Sets `argv[0]`.
    pub fn with_program_name(mut self, name: impl Into<String>) -> Self {
        self.program_name = name.into();
        self
    }

    /// Appends an argv entry.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Sets the encoder nesting bound.
    pub fn with_max_encode_depth(mut self, depth: usize) -> Self {
        self.max_encode_depth = depth;
        self
    }

    /// Enables or disables strict decoding.
    pub fn with_strict_decode(mut self, strict: bool) -> Self {
        self.strict_decode = strict;
        self
    }

    /// Defaults overridden by `NODE_BRIDGE_THREAD_POOL_SIZE` and
    /// `NODE_BRIDGE_STRICT_DECODE`. Unparseable or zero values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`NodeConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let thread_pool_size = lookup(THREAD_POOL_SIZE_VAR)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|&v| v != 0)
            .unwrap_or(defaults.thread_pool_size);
        let strict_decode = lookup(STRICT_DECODE_VAR)
            .and_then(|v| parse_flag(v.trim()))
            .unwrap_or(defaults.strict_decode);
        Self {
            thread_pool_size,
            strict_decode,
            ..defaults
        }
    }

    /// Reads a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] when the file cannot be read, is not
    /// valid JSON for this structure, or fails [`NodeConfig::validate`].
    pub fn from_json_file(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
            .map_err(|e| BridgeError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parses a JSON configuration document.
    pub fn from_json_str(text: &str) -> BridgeResult<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| BridgeError::Config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings before a session is created.
    pub fn validate(&self) -> BridgeResult<()> {
        if self.thread_pool_size == 0 {
            return Err(BridgeError::Config(
                "thread_pool_size must be at least 1".into(),
            ));
        }
        if i32::try_from(self.thread_pool_size).is_err() {
            return Err(BridgeError::Config(format!(
                "thread_pool_size {} is too large",
                self.thread_pool_size
            )));
        }
        if self.max_encode_depth == 0 {
            return Err(BridgeError::Config(
                "max_encode_depth must be at least 1".into(),
            ));
        }
        if self.program_name.is_empty() {
            return Err(BridgeError::Config("program_name must not be empty".into()));
        }
        Ok(())
    }

    /// The argv handed to the runtime: program name, then extra arguments.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program_name.clone())
            .chain(self.extra_args.iter().cloned())
            .collect()
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}

fn default_program_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_PROGRAM_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.thread_pool_size, 1);
        assert_eq!(config.max_encode_depth, DEFAULT_MAX_DEPTH);
        assert!(!config.strict_decode);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = NodeConfig::from_lookup(lookup(&[
            (THREAD_POOL_SIZE_VAR, "4"),
            (STRICT_DECODE_VAR, "yes"),
        ]));
        assert_eq!(config.thread_pool_size, 4);
        assert!(config.strict_decode);
    }

    #[test]
    fn test_env_ignores_zero_and_garbage() {
        let config = NodeConfig::from_lookup(lookup(&[
            (THREAD_POOL_SIZE_VAR, "0"),
            (STRICT_DECODE_VAR, "maybe"),
        ]));
        assert_eq!(config.thread_pool_size, 1);
        assert!(!config.strict_decode);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let error = NodeConfig::new().with_thread_pool_size(0).validate().unwrap_err();
        assert!(matches!(error, BridgeError::Config(_)));
    }

    #[test]
    fn test_argv_order() {
        let config = NodeConfig::new()
            .with_program_name("host")
            .with_arg("--expose-gc")
            .with_arg("--no-warnings");
        assert_eq!(config.argv(), vec!["host", "--expose-gc", "--no-warnings"]);
    }

    #[test]
    fn test_json_partial_document_keeps_defaults() {
        let config = NodeConfig::from_json_str(r#"{ "thread_pool_size": 3 }"#).unwrap();
        assert_eq!(config.thread_pool_size, 3);
        assert_eq!(config.max_encode_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_json_unknown_field_rejected() {
        assert!(NodeConfig::from_json_str(r#"{ "threads": 3 }"#).is_err());
    }

    #[test]
    fn test_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "strict_decode": true, "extra_args": ["--trace"] }}"#).unwrap();
        let config = NodeConfig::from_json_file(file.path()).unwrap();
        assert!(config.strict_decode);
        assert_eq!(config.extra_args, vec!["--trace"]);
    }

    #[test]
    fn test_missing_file() {
        let error = NodeConfig::from_json_file("/nonexistent/node-bridge.json").unwrap_err();
        assert!(matches!(error, BridgeError::Config(_)));
    }
}
