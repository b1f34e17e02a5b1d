//! Built-in REPL commands prefixed with `/`.
//!
//! Commands implement the [`Command`] trait and are registered in a
//! [`CommandRegistry`]. The registry handles dispatch, alias resolution,
//! and help generation. Anything that is not a command is an expression.

mod clear;
mod history;
mod quit;
mod status;

use async_trait::async_trait;
use std::sync::Arc;

use crate::bridge::Bridge;

/// What commands can see while they run.
pub struct Session<'a> {
    pub bridge: &'a Bridge,
    pub db_path: &'a str,
}

/// What the REPL should do after a command runs.
#[derive(Debug)]
pub enum CommandResult {
    /// Not a command. Evaluate the input as an expression.
    NotACommand,
    /// Command handled, continue the REPL loop.
    Handled,
    /// Exit the REPL.
    Quit,
}

#[async_trait]
pub trait Command: Send + Sync {
    /// Primary name, e.g. `"/history"`.
    fn name(&self) -> &str;

    /// Alternative names, e.g. `&["/h", "/?"]`.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// One-line description for `/help`.
    fn description(&self) -> &str;

    /// Run the command. `args` is whatever followed the name, trimmed.
    async fn execute(&self, args: &str, session: &Session<'_>) -> CommandResult;
}

pub struct CommandRegistry {
    commands: Vec<Arc<dyn Command>>,
}

/// `/help` lives in the registry itself since it lists everything else.
const HELP: &str = "/help";
const HELP_ALIASES: &[&str] = &["/h", "/?"];

impl CommandRegistry {
    /// Create a registry with all built-in commands.
    pub fn new() -> Self {
        let commands: Vec<Arc<dyn Command>> = vec![
            Arc::new(history::HistoryCommand),
            Arc::new(clear::ClearCommand),
            Arc::new(status::StatusCommand),
            Arc::new(quit::QuitCommand),
        ];
        Self { commands }
    }

    pub fn register(&mut self, command: Arc<dyn Command>) {
        self.commands.push(command);
    }

    /// Dispatch input to a matching command, or return `NotACommand`.
    pub async fn dispatch(&self, input: &str, session: &Session<'_>) -> CommandResult {
        let input = input.trim();
        let (name, args) = match input.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (input, ""),
        };

        if name == HELP || HELP_ALIASES.contains(&name) {
            print!("{}", self.help_text());
            return CommandResult::Handled;
        }

        for command in &self.commands {
            if name == command.name() || command.aliases().contains(&name) {
                return command.execute(args, session).await;
            }
        }

        if name.starts_with('/') {
            println!("unknown command: {name}");
            println!("type /help for available commands");
            return CommandResult::Handled;
        }

        CommandResult::NotACommand
    }

    /// Help text for `/help` plus every registered command.
    pub fn help_text(&self) -> String {
        let mut entries: Vec<(String, &str)> =
            vec![(format_label(HELP, HELP_ALIASES), "show this help")];
        entries.extend(
            self.commands
                .iter()
                .map(|c| (format_label(c.name(), c.aliases()), c.description())),
        );

        let max_width = entries
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(10);

        let mut out = String::new();
        for (label, desc) in &entries {
            out.push_str(&format!("  {label:<max_width$}  {desc}\n"));
        }
        out
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names = vec![HELP];
        names.extend(self.commands.iter().map(|c| c.name()));
        names
    }

    /// All registered names and aliases (for duplicate detection).
    pub fn all_triggers(&self) -> Vec<&str> {
        let mut triggers = vec![HELP];
        triggers.extend_from_slice(HELP_ALIASES);
        for cmd in &self.commands {
            triggers.push(cmd.name());
            triggers.extend_from_slice(cmd.aliases());
        }
        triggers
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn format_label(name: &str, aliases: &[&str]) -> String {
    if aliases.is_empty() {
        name.to_string()
    } else {
        format!("{} ({})", name, aliases.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineSupervisor;
    use crate::history::sqlite::SqliteHistory;

    pub(crate) fn test_bridge() -> Bridge {
        Bridge::new(
            EngineSupervisor::disabled(),
            Box::new(SqliteHistory::in_memory().unwrap()),
        )
    }

    pub(crate) fn test_session(bridge: &Bridge) -> Session<'_> {
        Session {
            bridge,
            db_path: ":memory:",
        }
    }

    #[test]
    fn all_builtins_registered() {
        let reg = CommandRegistry::new();
        let names = reg.names();
        for expected in ["/help", "/history", "/clear", "/status", "/quit"] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn no_duplicate_triggers() {
        let reg = CommandRegistry::new();
        let triggers = reg.all_triggers();
        let mut seen = Vec::new();
        for t in &triggers {
            assert!(!seen.contains(t), "duplicate trigger: {t}");
            seen.push(t);
        }
    }

    #[test]
    fn help_text_includes_all_commands_and_aliases() {
        let reg = CommandRegistry::new();
        let text = reg.help_text();
        for name in reg.names() {
            assert!(text.contains(name), "help missing: {name}");
        }
        assert!(text.contains("/h"));
        assert!(text.contains("/?"));
    }

    #[tokio::test]
    async fn unknown_slash_command_is_handled() {
        let bridge = test_bridge();
        let reg = CommandRegistry::new();
        assert!(matches!(
            reg.dispatch("/foobar", &test_session(&bridge)).await,
            CommandResult::Handled
        ));
    }

    #[tokio::test]
    async fn expressions_pass_through() {
        let bridge = test_bridge();
        let reg = CommandRegistry::new();
        for input in ["2+2", "(1 + 2) * 3", "10 / 4"] {
            assert!(matches!(
                reg.dispatch(input, &test_session(&bridge)).await,
                CommandResult::NotACommand
            ));
        }
    }

    #[tokio::test]
    async fn help_alias_is_handled() {
        let bridge = test_bridge();
        let reg = CommandRegistry::new();
        assert!(matches!(
            reg.dispatch("/?", &test_session(&bridge)).await,
            CommandResult::Handled
        ));
    }

    #[tokio::test]
    async fn plugin_command_receives_args() {
        struct EchoCommand;

        #[async_trait]
        impl Command for EchoCommand {
            fn name(&self) -> &str {
                "/echo"
            }
            fn description(&self) -> &str {
                "echo"
            }
            async fn execute(&self, args: &str, _session: &Session<'_>) -> CommandResult {
                if args == "quit now" {
                    CommandResult::Quit
                } else {
                    CommandResult::Handled
                }
            }
        }

        let bridge = test_bridge();
        let mut reg = CommandRegistry::new();
        reg.register(Arc::new(EchoCommand));
        assert!(matches!(
            reg.dispatch("  /echo   quit now ", &test_session(&bridge)).await,
            CommandResult::Quit
        ));
        assert!(reg.help_text().contains("/echo"));
    }

    #[test]
    fn format_label_with_aliases() {
        assert_eq!(format_label("/help", &["/h", "/?"]), "/help (/h, /?)");
        assert_eq!(format_label("/status", &[]), "/status");
    }
}
