//! Line-oriented calculation engine.
//!
//! Reads one expression per line from stdin and answers `= <value>` on
//! stdout, or `Error: <message>` on stderr. `exit` or `quit` ends it.
//! This is the process `calcbridge` supervises by default.

use std::io::{self, BufRead, IsTerminal, Write};

use calcbridge::EvalError;
use calcbridge::consts::format_value;
use calcbridge::local::parser;

fn main() -> anyhow::Result<()> {
    let interactive = io::stdin().is_terminal();
    let mut out = io::stdout().lock();

    writeln!(out, "=== Expression Calculator ===")?;
    writeln!(out, "Enter mathematical expressions:")?;
    writeln!(out, "Examples: 2+3, 10*5-2, 100/4, 2^3, 10%3")?;
    writeln!(out, "Supports: + - * / % ^ (power) and parentheses")?;
    writeln!(out, "Type 'exit' to quit\n")?;
    out.flush()?;

    let mut lines = io::stdin().lock().lines();
    loop {
        // Behind a pipe there is nobody to prompt.
        if interactive {
            write!(out, "> ")?;
            out.flush()?;
        }

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let input = line.trim();

        if input == "exit" || input == "quit" {
            writeln!(out, "Goodbye!")?;
            break;
        }
        if input.is_empty() {
            continue;
        }

        match evaluate(input) {
            Ok(value) => writeln!(out, "= {}", format_value(value))?,
            Err(message) => eprintln!("Error: {message}"),
        }
        out.flush()?;
    }
    Ok(())
}

fn evaluate(input: &str) -> Result<f64, String> {
    match parser::evaluate(input) {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(_) => Err("result is not a finite number".to_string()),
        Err(EvalError::InvalidExpression(msg)) => Err(msg),
        Err(e) => Err(e.to_string()),
    }
}
