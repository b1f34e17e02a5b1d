//! Lifecycle of the single engine process.
//!
//! One spawn attempt, ever. A handle that dies is retired and never
//! replaced; from then on callers only see [`None`] from
//! [`EngineSupervisor::handle`].

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::process::Command;

use super::{EngineConfig, EngineHandle};

pub struct EngineSupervisor {
    config: EngineConfig,
    attempted: AtomicBool,
    handle: Mutex<Option<Arc<EngineHandle>>>,
}

impl EngineSupervisor {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            attempted: AtomicBool::new(false),
            handle: Mutex::new(None),
        }
    }

    /// A supervisor that never has an engine.
    pub fn disabled() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Adopt an already wired handle, e.g. one built from in-memory streams.
    /// Counts as the one start attempt.
    pub fn with_handle(handle: EngineHandle) -> Self {
        let supervisor = Self::disabled();
        supervisor.attempted.store(true, Ordering::SeqCst);
        *supervisor.slot() = Some(Arc::new(handle));
        supervisor
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<EngineHandle>>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Launch the engine. Only the first call does anything; later calls
    /// report whether that first attempt left a live engine.
    ///
    /// Readiness is not probed. The process is assumed ready if it is
    /// still running after the startup grace period.
    pub async fn start(&self) -> bool {
        if self.attempted.swap(true, Ordering::SeqCst) {
            return self.is_running();
        }
        let Some(command) = &self.config.command else {
            tracing::info!("no engine configured, using local evaluation only");
            return false;
        };

        let child = match Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(
                    program = %command.program.display(),
                    error = %e,
                    "failed to start engine, using local evaluation"
                );
                return false;
            }
        };

        let handle = match EngineHandle::from_child(child, self.config.response_window) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(error = %e, "failed to wire engine streams");
                return false;
            }
        };

        tokio::time::sleep(self.config.startup_grace).await;

        if let Some(status) = handle.exit_status() {
            tracing::warn!(%status, "engine exited during startup");
            return false;
        }

        tracing::info!(
            program = %command.program.display(),
            pid = handle.pid(),
            "engine started"
        );
        *self.slot() = Some(Arc::new(handle));
        true
    }

    /// The live engine, if there is one.
    pub fn handle(&self) -> Option<Arc<EngineHandle>> {
        self.slot().clone()
    }

    pub fn is_running(&self) -> bool {
        self.slot().is_some()
    }

    /// Permanently drop `handle` after its death was detected. No-op if
    /// a different (or no) handle is current.
    pub fn retire(&self, handle: &Arc<EngineHandle>, reason: &str) {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, handle)) {
            tracing::warn!(reason, "engine retired, falling back to local evaluation");
            handle.kill();
            *slot = None;
        }
    }

    /// Request termination of the engine and release the handle.
    /// Safe to call any number of times, with or without a prior start.
    pub fn stop(&self) {
        if let Some(handle) = self.slot().take() {
            tracing::info!(pid = handle.pid(), "stopping engine");
            handle.kill();
        }
    }
}

impl Drop for EngineSupervisor {
    fn drop(&mut self) {
        self.stop();
    }
}
