//! node-bridge
//!
//! Loads the runtime library, starts one session and evaluates a file, an
//! inline string or an interactive REPL in it.

use clap::Parser as ClapParser;
use node_bridge::cli::{usage, Mode};
use node_bridge::repl::run_repl;
use node_bridge::{Cli, CliError, CliResult, NativeLibrary, Node};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        match e {
            CliError::Io(e) => eprintln!("Error: Could not read input: {}", e),
            e => eprintln!("Error: {}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> CliResult<()> {
    let mode = cli.mode();
    if mode == Mode::Usage {
        println!("{}", usage());
        return Ok(());
    }

    let lib = cli
        .lib
        .as_ref()
        .ok_or_else(|| CliError::Usage("--lib <PATH> is required".into()))?;
    let config = cli.node_config()?;
    let library = NativeLibrary::load(lib)?;
    let node = Node::with_config(Rc::new(library), config)?;

    let outcome = match mode {
        Mode::File(path) => std::fs::read_to_string(&path)
            .map_err(CliError::from)
            .and_then(|source| print_result(&node, &source)),
        Mode::Eval(code) => print_result(&node, &code),
        Mode::Repl => run_repl(&node),
        Mode::Usage => Ok(()),
    };

    // Teardown runs even when evaluation failed
    let report = node.dispose()?;
    tracing::debug!(released = report.released, failed = report.failed, "session closed");
    outcome
}

fn print_result(node: &Node, source: &str) -> CliResult<()> {
    let value = node.eval(source)?;
    if !value.is_none() {
        println!("{}", value);
    }
    Ok(())
}
