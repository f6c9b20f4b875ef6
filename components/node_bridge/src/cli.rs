//! Command line arguments for the `node-bridge` binary.

use crate::config::NodeConfig;
use bridge_types::BridgeResult;
use clap::Parser;
use std::path::PathBuf;

/// Evaluate JavaScript in an embedded Node.js runtime
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "node-bridge", version)]
pub struct Cli {
    /// Path to the runtime shared library
    #[arg(short, long, value_name = "PATH")]
    pub lib: Option<PathBuf>,

    /// JavaScript file to execute
    #[arg(short, long, conflicts_with_all = ["eval", "repl"])]
    pub file: Option<PathBuf>,

    /// Inline code to evaluate
    #[arg(short, long, conflicts_with = "repl")]
    pub eval: Option<String>,

    /// Start an interactive session
    #[arg(short, long)]
    pub repl: bool,

    /// Background worker threads
    #[arg(short, long, value_name = "N")]
    pub threads: Option<u32>,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Fail on values of unknown type instead of printing null
    #[arg(long)]
    pub strict: bool,
}

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Run a file
    File(PathBuf),
    /// Evaluate a string
    Eval(String),
    /// Interactive loop
    Repl,
    /// Nothing requested; print usage
    Usage,
}

impl Cli {
    /// The requested mode.
    pub fn mode(&self) -> Mode {
        if let Some(file) = &self.file {
            Mode::File(file.clone())
        } else if let Some(code) = &self.eval {
            Mode::Eval(code.clone())
        } else if self.repl {
            Mode::Repl
        } else {
            Mode::Usage
        }
    }

    /// Session settings: the config file (or the environment when none is
    /// given), overridden by explicit flags.
    pub fn node_config(&self) -> BridgeResult<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::from_json_file(path)?,
            None => NodeConfig::from_env(),
        };
        if let Some(threads) = self.threads {
            config.thread_pool_size = threads;
        }
        if self.strict {
            config.strict_decode = true;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Usage text printed when no mode is given.
pub fn usage() -> String {
    [
        "node-bridge - evaluate JavaScript in an embedded Node.js runtime",
        "",
        "Usage:",
        "  node-bridge --lib <PATH> --file <FILE>     Execute a JavaScript file",
        "  node-bridge --lib <PATH> --eval <CODE>     Evaluate inline JavaScript code",
        "  node-bridge --lib <PATH> --repl            Start interactive REPL",
        "",
        "Run 'node-bridge --help' for more options.",
    ]
    .join("\n")
}
