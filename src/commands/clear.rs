use async_trait::async_trait;

use super::{Command, CommandResult, Session};

pub struct ClearCommand;

#[async_trait]
impl Command for ClearCommand {
    fn name(&self) -> &str {
        "/clear"
    }

    fn description(&self) -> &str {
        "clear calculation history"
    }

    async fn execute(&self, _args: &str, session: &Session<'_>) -> CommandResult {
        match session.bridge.clear_history().await {
            Ok(()) => println!("  history cleared"),
            Err(e) => eprintln!("  failed to clear history: {e}"),
        }
        CommandResult::Handled
    }
}
