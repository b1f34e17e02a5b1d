//! The evaluation bridge: engine first, local evaluator as fallback.
//!
//! Engine-path failures never reach the caller. They are logged, and
//! the same expression is handed to [`evaluate_locally`]. Only the
//! outcome of the last path tried is returned.

use std::fmt;

use serde::Serialize;

use crate::engine::{EngineSupervisor, EvaluationRequest, protocol};
use crate::error::EvalError;
use crate::history::{History, HistoryEntry};
use crate::local::evaluate_locally;

/// Which path produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalPath {
    Engine,
    Local,
}

impl fmt::Display for EvalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine => f.write_str("engine"),
            Self::Local => f.write_str("local"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub value: f64,
    pub path: EvalPath,
}

pub type EvaluationResult = Result<Evaluation, EvalError>;

/// What the presentation layer receives: `{"value": n}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Value { value: f64 },
    Error { error: String },
}

impl From<&EvaluationResult> for Outcome {
    fn from(result: &EvaluationResult) -> Self {
        match result {
            Ok(eval) => Self::Value { value: eval.value },
            Err(e) => Self::Error {
                error: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Running,
    Stopped,
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("running"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}

pub struct Bridge {
    supervisor: EngineSupervisor,
    history: Box<dyn History>,
}

impl Bridge {
    pub fn new(supervisor: EngineSupervisor, history: Box<dyn History>) -> Self {
        Self {
            supervisor,
            history,
        }
    }

    /// Evaluate `expression`, recording successes in history.
    pub async fn calculate(&self, expression: &str) -> EvaluationResult {
        let request = EvaluationRequest::new(expression)?;

        let evaluation = match self.via_engine(&request).await {
            Ok(value) => Evaluation {
                value,
                path: EvalPath::Engine,
            },
            Err(e) if e.is_engine_failure() => {
                tracing::debug!(
                    expression = request.expression(),
                    kind = %e.kind(),
                    error = %e,
                    "engine path failed, evaluating locally"
                );
                Evaluation {
                    value: evaluate_locally(request.expression())?,
                    path: EvalPath::Local,
                }
            }
            Err(e) => return Err(e),
        };

        let entry = HistoryEntry::new(request.expression(), evaluation.value);
        if let Err(e) = self.history.record(entry).await {
            tracing::warn!(error = %e, "failed to persist history entry");
        }

        Ok(evaluation)
    }

    async fn via_engine(&self, request: &EvaluationRequest) -> Result<f64, EvalError> {
        let Some(handle) = self.supervisor.handle() else {
            return Err(EvalError::EngineUnavailable("no engine handle".to_string()));
        };
        let result = protocol::evaluate(&handle, request).await;
        if result.is_err() && handle.has_exited() {
            self.supervisor.retire(&handle, "engine stopped answering");
        }
        result
    }

    pub fn engine_status(&self) -> EngineStatus {
        if self.supervisor.is_running() {
            EngineStatus::Running
        } else {
            EngineStatus::Stopped
        }
    }

    pub fn supervisor(&self) -> &EngineSupervisor {
        &self.supervisor
    }

    /// Newest first.
    pub async fn history(&self) -> anyhow::Result<Vec<HistoryEntry>> {
        self.history.entries().await
    }

    pub async fn clear_history(&self) -> anyhow::Result<()> {
        self.history.clear().await
    }

    /// Terminate the engine. Call before the program exits.
    pub fn shutdown(&self) {
        self.supervisor.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, duplex};

    use super::*;
    use crate::engine::EngineHandle;
    use crate::history::sqlite::SqliteHistory;

    fn local_only() -> Bridge {
        Bridge::new(
            EngineSupervisor::disabled(),
            Box::new(SqliteHistory::in_memory().unwrap()),
        )
    }

    #[tokio::test]
    async fn blank_input_is_rejected_before_any_path() {
        let bridge = local_only();
        assert_eq!(bridge.calculate("").await, Err(EvalError::EmptyExpression));
        assert_eq!(bridge.calculate("   ").await, Err(EvalError::EmptyExpression));
        assert!(bridge.history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_engine_falls_back_to_local() {
        let bridge = local_only();
        let eval = bridge.calculate("2+2").await.unwrap();
        assert_eq!(eval.value, 4.0);
        assert_eq!(eval.path, EvalPath::Local);
        assert_eq!(bridge.engine_status(), EngineStatus::Stopped);
    }

    #[tokio::test]
    async fn local_failure_is_surfaced() {
        let bridge = local_only();
        assert_eq!(
            bridge.calculate("1/0").await,
            Err(EvalError::InvalidCalculation)
        );
        assert!(matches!(
            bridge.calculate("2+abc").await,
            Err(EvalError::InvalidExpression(_))
        ));
    }

    #[tokio::test]
    async fn failures_are_not_recorded() {
        let bridge = local_only();
        let _ = bridge.calculate("1/0").await;
        bridge.calculate("3*3").await.unwrap();

        let history = bridge.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].expression, "3*3");
        assert_eq!(history[0].result, 9.0);
    }

    fn duplex_bridge() -> (Bridge, DuplexStream, DuplexStream) {
        let (stdin, engine_in) = duplex(1024);
        let (engine_out, stdout) = duplex(1024);
        // Nothing is ever written to stderr.
        let (_, stderr) = duplex(1024);
        let handle = EngineHandle::from_streams(stdin, stdout, stderr, Duration::from_millis(100));
        let bridge = Bridge::new(
            EngineSupervisor::with_handle(handle),
            Box::new(SqliteHistory::in_memory().unwrap()),
        );
        (bridge, engine_in, engine_out)
    }

    #[tokio::test]
    async fn adopted_handle_answers() {
        let (bridge, engine_in, mut engine_out) = duplex_bridge();
        let mut requests = BufReader::new(engine_in);
        let engine = async {
            let mut line = String::new();
            requests.read_line(&mut line).await.unwrap();
            engine_out.write_all(b"= 21\n").await.unwrap();
        };

        let (eval, ()) = tokio::join!(bridge.calculate("7*3"), engine);
        let eval = eval.unwrap();
        assert_eq!(eval.value, 21.0);
        assert_eq!(eval.path, EvalPath::Engine);
        assert_eq!(bridge.engine_status(), EngineStatus::Running);
    }

    #[tokio::test]
    async fn closed_engine_output_retires_handle() {
        let (bridge, _engine_in, engine_out) = duplex_bridge();
        drop(engine_out);

        let eval = bridge.calculate("7*3").await.unwrap();
        assert_eq!(eval.path, EvalPath::Local);
        assert_eq!(bridge.engine_status(), EngineStatus::Stopped);
    }

    #[test]
    fn outcome_wire_shape() {
        let ok: EvaluationResult = Ok(Evaluation {
            value: 4.0,
            path: EvalPath::Local,
        });
        assert_eq!(
            serde_json::to_string(&Outcome::from(&ok)).unwrap(),
            r#"{"value":4.0}"#
        );

        let err: EvaluationResult = Err(EvalError::EmptyExpression);
        assert_eq!(
            serde_json::to_string(&Outcome::from(&err)).unwrap(),
            r#"{"error":"empty expression"}"#
        );
    }

    #[test]
    fn status_display() {
        assert_eq!(EngineStatus::Running.to_string(), "running");
        assert_eq!(EvalPath::Engine.to_string(), "engine");
    }
}
