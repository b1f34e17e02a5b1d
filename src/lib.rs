pub mod banner;
pub mod bridge;
pub mod commands;
pub mod consts;
pub mod engine;
pub mod error;
pub mod history;
pub mod local;
pub mod storage;
pub mod validator;

pub use bridge::{Bridge, EngineStatus, EvalPath, Evaluation, EvaluationResult, Outcome};
pub use error::{EvalError, FailureKind};
