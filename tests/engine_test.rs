use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

use calcbridge::engine::{EngineCommand, EngineConfig, EngineSupervisor};
use calcbridge::history::sqlite::SqliteHistory;
use calcbridge::{Bridge, EngineStatus, EvalError, EvalPath};

const ENGINE: &str = env!("CARGO_BIN_EXE_calc-engine");

async fn bridge() -> Bridge {
    let supervisor = EngineSupervisor::new(EngineConfig {
        command: Some(EngineCommand::new(ENGINE)),
        response_window: Duration::from_millis(200),
        startup_grace: Duration::from_millis(200),
    });
    assert!(supervisor.start().await, "calc-engine failed to start");
    Bridge::new(supervisor, Box::new(SqliteHistory::in_memory().unwrap()))
}

#[tokio::test]
async fn engine_answers_over_pipes() {
    let mut child = Command::new(ENGINE)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .unwrap();
    let mut stdin = child.stdin.take().unwrap();
    let mut stdout = BufReader::new(child.stdout.take().unwrap()).lines();

    stdin.write_all(b"2+3*4\nexit\n").await.unwrap();
    stdin.flush().await.unwrap();

    let mut lines = Vec::new();
    while let Some(line) = stdout.next_line().await.unwrap() {
        lines.push(line);
    }
    assert!(lines.iter().any(|l| l == "= 14"), "got {lines:?}");
    assert_eq!(lines.last().map(String::as_str), Some("Goodbye!"));
    assert!(child.wait().await.unwrap().success());
}

#[tokio::test]
async fn engine_reports_errors_on_stderr() {
    let mut child = Command::new(ENGINE)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .unwrap();
    let mut stdin = child.stdin.take().unwrap();
    let mut stderr = BufReader::new(child.stderr.take().unwrap()).lines();

    stdin.write_all(b"1/0\n2+\nquit\n").await.unwrap();

    let first = stderr.next_line().await.unwrap().unwrap();
    assert!(first.starts_with("Error: "), "{first}");
    let second = stderr.next_line().await.unwrap().unwrap();
    assert!(second.starts_with("Error: "), "{second}");
}

#[tokio::test]
async fn bridge_uses_real_engine() {
    let bridge = bridge().await;

    let eval = bridge.calculate("(1 + 2) ^ 2").await.unwrap();
    assert_eq!(eval.value, 9.0);
    assert_eq!(eval.path, EvalPath::Engine);

    let eval = bridge.calculate("10 % 4 - 0.5").await.unwrap();
    assert_eq!(eval.value, 1.5);
    assert_eq!(eval.path, EvalPath::Engine);

    bridge.shutdown();
}

#[tokio::test]
async fn engine_error_then_local_error() {
    let bridge = bridge().await;

    assert_eq!(
        bridge.calculate("1/0").await,
        Err(EvalError::InvalidCalculation)
    );
    // The engine survives its own error report.
    assert_eq!(bridge.engine_status(), EngineStatus::Running);
    assert_eq!(
        bridge.calculate("7*6").await.unwrap().path,
        EvalPath::Engine
    );

    bridge.shutdown();
}
