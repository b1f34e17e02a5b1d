use async_trait::async_trait;

use super::{Command, CommandResult, Session};

pub struct StatusCommand;

#[async_trait]
impl Command for StatusCommand {
    fn name(&self) -> &str {
        "/status"
    }

    fn description(&self) -> &str {
        "show engine status and storage location"
    }

    async fn execute(&self, _args: &str, session: &Session<'_>) -> CommandResult {
        let supervisor = session.bridge.supervisor();
        let pid = supervisor
            .handle()
            .and_then(|h| h.pid())
            .map(|pid| format!(" (pid {pid})"))
            .unwrap_or_default();
        let program = supervisor
            .config()
            .command
            .as_ref()
            .map(|c| c.program.display().to_string())
            .unwrap_or_else(|| "none".to_string());

        println!("  engine    {}{}", session.bridge.engine_status(), pid);
        println!("  program   {}", program);
        println!("  storage   {}", session.db_path);
        CommandResult::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{test_bridge, test_session};

    #[tokio::test]
    async fn returns_handled() {
        let bridge = test_bridge();
        assert!(matches!(
            StatusCommand.execute("", &test_session(&bridge)).await,
            CommandResult::Handled
        ));
    }
}
