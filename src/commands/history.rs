use async_trait::async_trait;

use super::{Command, CommandResult, Session};
use crate::consts::format_value;
use crate::history::HistoryEntry;

/// Entries shown when no count is given.
const DEFAULT_SHOWN: usize = 10;

pub struct HistoryCommand;

#[async_trait]
impl Command for HistoryCommand {
    fn name(&self) -> &str {
        "/history"
    }

    fn description(&self) -> &str {
        "show recent calculations (/history [n])"
    }

    async fn execute(&self, args: &str, session: &Session<'_>) -> CommandResult {
        let Some(count) = parse_count(args) else {
            println!("  usage: /history [n]");
            return CommandResult::Handled;
        };

        match session.bridge.history().await {
            Ok(entries) if entries.is_empty() => println!("  no calculations yet"),
            Ok(entries) => print!("{}", render(&entries, count)),
            Err(e) => eprintln!("  failed to read history: {e}"),
        }
        CommandResult::Handled
    }
}

fn parse_count(args: &str) -> Option<usize> {
    if args.is_empty() {
        return Some(DEFAULT_SHOWN);
    }
    args.parse().ok().filter(|n| *n > 0)
}

fn render(entries: &[HistoryEntry], count: usize) -> String {
    let shown = &entries[..count.min(entries.len())];
    let width = shown.iter().map(|e| e.expression.len()).max().unwrap_or(0);

    let mut out = String::new();
    for (i, entry) in shown.iter().enumerate() {
        out.push_str(&format!(
            "  {:>2}. {:<width$} = {}   {}\n",
            i + 1,
            entry.expression,
            format_value(entry.result),
            entry.timestamp,
        ));
    }
    out
}
