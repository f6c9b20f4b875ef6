//! REPL (Read-Eval-Print Loop) over one runtime session

use crate::error::{CliError, CliResult};
use crate::session::Node;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Run the interactive REPL
///
/// Every line is evaluated in the same session, so functions defined earlier
/// stay callable. Returns when the user exits.
pub fn run_repl(node: &Node) -> CliResult<()> {
    let mut editor = DefaultEditor::new()
        .map_err(|e| CliError::Repl(format!("Failed to initialize editor: {}", e)))?;

    println!("node-bridge {}", env!("CARGO_PKG_VERSION"));
    println!("Type JavaScript code, .help for commands, or .exit to quit.");
    println!();

    let mut line_buffer = String::new();
    let mut in_multiline = false;

    loop {
        let prompt = if in_multiline { "... " } else { "> " };

        match editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();

                if !in_multiline && (trimmed == "exit" || trimmed == ".exit") {
                    break;
                }

                if !in_multiline && trimmed.starts_with('.') {
                    println!("{}", handle_repl_command(trimmed, node));
                    continue;
                }

                if in_multiline {
                    line_buffer.push('\n');
                }
                line_buffer.push_str(&line);

                if !is_input_complete(&line_buffer) {
                    in_multiline = true;
                    continue;
                }
                in_multiline = false;

                if !line_buffer.trim().is_empty() {
                    let _ = editor.add_history_entry(&line_buffer);
                    match node.eval(&line_buffer) {
                        Ok(value) => println!("{}", value),
                        Err(e) if e.is_fatal() => return Err(e.into()),
                        Err(e) => eprintln!("Error: {}", e),
                    }
                }
                line_buffer.clear();
            }
            Err(ReadlineError::Interrupted) => {
                if in_multiline {
                    println!("^C");
                    line_buffer.clear();
                    in_multiline = false;
                } else {
                    println!("Press Ctrl-D or type .exit to quit");
                }
            }
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

/// Output of a dot command
fn handle_repl_command(command: &str, node: &Node) -> String {
    match command {
        ".help" => [
            "REPL Commands:",
            "  .help     - Show this help message",
            "  .pending  - Show how many runtime values await release",
            "  .exit     - Exit the REPL",
        ]
        .join("\n"),
        ".pending" => format!("{} value(s) pending release", node.pending()),
        _ => format!("Unknown command: {}\nType .help for available commands", command),
    }
}

/// Check if the input appears to be complete
///
/// Counts braces, brackets and parentheses outside string literals.
fn is_input_complete(input: &str) -> bool {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut string_char = ' ';
    let mut escape_next = false;

    for c in input.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }

        if c == '\\' && in_string {
            escape_next = true;
            continue;
        }

        if !in_string {
            match c {
                '"' | '\'' | '`' => {
                    in_string = true;
                    string_char = c;
                }
                '{' | '[' | '(' => depth += 1,
                '}' | ']' | ')' => depth -= 1,
                _ => {}
            }
        } else if c == string_char {
            in_string = false;
        }
    }

    depth <= 0 && !in_string
}
