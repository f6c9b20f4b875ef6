//! CLI argument parsing tests
//!
//! Tests for verifying clap argument parsing and config assembly

use clap::Parser as ClapParser;
use node_bridge::cli::Mode;
use node_bridge::{BridgeError, Cli};
use std::fs;
use std::path::PathBuf;

/// Test parsing no arguments (default behavior)
#[test]
fn cli_parse_no_args() {
    let cli = Cli::try_parse_from(["node-bridge"]).unwrap();

    assert_eq!(cli.lib, None);
    assert_eq!(cli.file, None);
    assert_eq!(cli.eval, None);
    assert!(!cli.repl);
    assert_eq!(cli.mode(), Mode::Usage);
}

/// Test parsing --lib with --eval
#[test]
fn cli_parse_lib_and_eval() {
    let cli = Cli::try_parse_from(["node-bridge", "--lib", "./libnode.so", "--eval", "1+1"]).unwrap();

    assert_eq!(cli.lib, Some(PathBuf::from("./libnode.so")));
    assert_eq!(cli.mode(), Mode::Eval("1+1".to_string()));
}

/// Test parsing short forms
#[test]
fn cli_parse_short_forms() {
    let cli = Cli::try_parse_from(["node-bridge", "-l", "lib.so", "-f", "script.js", "-t", "3"]).unwrap();

    assert_eq!(cli.mode(), Mode::File(PathBuf::from("script.js")));
    assert_eq!(cli.threads, Some(3));
}

/// Test parsing --repl
#[test]
fn cli_parse_repl() {
    let cli = Cli::try_parse_from(["node-bridge", "--repl"]).unwrap();
    assert_eq!(cli.mode(), Mode::Repl);
}

/// Test that modes are mutually exclusive
#[test]
fn cli_parse_conflicting_modes() {
    assert!(Cli::try_parse_from(["node-bridge", "--file", "a.js", "--eval", "1"]).is_err());
    assert!(Cli::try_parse_from(["node-bridge", "--eval", "1", "--repl"]).is_err());
}

/// Test that a non-numeric thread count is rejected
#[test]
fn cli_parse_invalid_threads() {
    assert!(Cli::try_parse_from(["node-bridge", "--threads", "many"]).is_err());
}

/// Test that flags override the config file
#[test]
fn cli_flags_override_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bridge.json");
    fs::write(&path, r#"{ "thread_pool_size": 2, "program_name": "from-file" }"#).unwrap();

    let cli = Cli::try_parse_from([
        "node-bridge",
        "--config",
        path.to_str().unwrap(),
        "--threads",
        "6",
        "--strict",
    ])
    .unwrap();
    let config = cli.node_config().unwrap();

    assert_eq!(config.thread_pool_size, 6);
    assert_eq!(config.program_name, "from-file");
    assert!(config.strict_decode);
}

/// Test that zero threads on the command line is a config error
#[test]
fn cli_zero_threads_rejected() {
    let cli = Cli::try_parse_from(["node-bridge", "--threads", "0"]).unwrap();
    assert!(matches!(cli.node_config(), Err(BridgeError::Config(_))));
}

/// Test that a broken config file is reported
#[test]
fn cli_invalid_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bridge.json");
    fs::write(&path, "{ not json").unwrap();

    let cli = Cli::try_parse_from(["node-bridge", "--config", path.to_str().unwrap()]).unwrap();
    assert!(matches!(cli.node_config(), Err(BridgeError::Config(_))));
}
