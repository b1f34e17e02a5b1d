//! The external calculation engine: a long-lived child process spoken
//! to over its standard streams.
//!
//! [`supervisor`] owns the process lifecycle; [`protocol`] runs one
//! request/response exchange at a time against it.

pub mod protocol;
pub mod supervisor;

use std::path::PathBuf;
use std::time::Duration;

use crate::consts::{RESPONSE_WINDOW, STARTUP_GRACE};

pub use protocol::{EngineHandle, EvaluationRequest};
pub use supervisor::EngineSupervisor;

/// Program and arguments used to launch the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl EngineCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// `None` runs without an engine; every call uses the local evaluator.
    pub command: Option<EngineCommand>,
    pub response_window: Duration,
    pub startup_grace: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: None,
            response_window: RESPONSE_WINDOW,
            startup_grace: STARTUP_GRACE,
        }
    }
}
