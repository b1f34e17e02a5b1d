//! Line-oriented exchange with the engine.
//!
//! A request is the expression followed by `\n`. The engine answers in
//! free-form text; the protocol has no framing and no request IDs, so a
//! response is whatever arrives on stdout/stderr within a fixed window.
//! Exchanges against one [`EngineHandle`] are serialized through its
//! exchange slot; bytes that arrive after a window closes are discarded
//! when the next exchange opens.

use std::process::ExitStatus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Child;
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;

use crate::error::EvalError;
use crate::validator::validate;

/// `= <number>` anywhere on the answer line.
static RESULT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=\s*([-+0-9.eE]+)").expect("result pattern is valid"));

const READ_CHUNK: usize = 4096;

/// Chunks buffered per stream between exchanges. Output past this is dropped.
const PUMP_CAPACITY: usize = 64;

/// A validated expression, ready to go on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRequest {
    expression: String,
}

impl EvaluationRequest {
    /// Validate `expression`. Blank input gives [`EvalError::EmptyExpression`].
    pub fn new(expression: &str) -> Result<Self, EvalError> {
        validate(expression)?;
        Ok(Self {
            expression: expression.trim().to_string(),
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    fn to_line(&self) -> String {
        format!("{}\n", self.expression)
    }
}

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Exclusive access to the engine's streams. Held for exactly one exchange.
struct ExchangeSlot {
    stdin: Writer,
    stdout: mpsc::Receiver<Vec<u8>>,
    stderr: mpsc::Receiver<Vec<u8>>,
    stdout_open: bool,
    stderr_open: bool,
}

impl ExchangeSlot {
    /// Drop anything left over from earlier exchanges (or the engine's
    /// startup banner) and open a fresh exchange.
    fn begin(&mut self, window: Duration) -> PendingExchange<'_> {
        let stale = drain(&mut self.stdout, &mut self.stdout_open)
            + drain(&mut self.stderr, &mut self.stderr_open);
        if stale > 0 {
            tracing::debug!(bytes = stale, "discarded stale engine output");
        }
        PendingExchange {
            deadline: Instant::now() + window,
            stdout: Vec::new(),
            stderr: Vec::new(),
            slot: self,
        }
    }
}

fn drain(rx: &mut mpsc::Receiver<Vec<u8>>, open: &mut bool) -> usize {
    let mut bytes = 0;
    loop {
        match rx.try_recv() {
            Ok(chunk) => bytes += chunk.len(),
            Err(mpsc::error::TryRecvError::Empty) => return bytes,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                *open = false;
                return bytes;
            }
        }
    }
}

enum Stream {
    Out,
    Err,
}

/// Output gathered for one in-flight request. Collection stops when
/// this is consumed, so nothing from this exchange leaks into the next.
pub struct PendingExchange<'a> {
    slot: &'a mut ExchangeSlot,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    deadline: Instant,
}

impl PendingExchange<'_> {
    /// Accumulate both streams until the deadline, or until both close.
    async fn collect(&mut self) {
        while self.slot.stdout_open || self.slot.stderr_open {
            let slot = &mut *self.slot;
            let event = tokio::select! {
                _ = tokio::time::sleep_until(self.deadline) => None,
                chunk = slot.stdout.recv(), if slot.stdout_open => Some((Stream::Out, chunk)),
                chunk = slot.stderr.recv(), if slot.stderr_open => Some((Stream::Err, chunk)),
            };
            match event {
                None => return,
                Some((Stream::Out, Some(chunk))) => self.stdout.extend_from_slice(&chunk),
                Some((Stream::Err, Some(chunk))) => self.stderr.extend_from_slice(&chunk),
                Some((Stream::Out, None)) => self.slot.stdout_open = false,
                Some((Stream::Err, None)) => self.slot.stderr_open = false,
            }
        }
    }

    fn into_result(self) -> Result<f64, EvalError> {
        if !self.stderr.is_empty() {
            let message = String::from_utf8_lossy(&self.stderr).trim().to_string();
            return Err(EvalError::EngineError(message));
        }
        if !self.stdout.is_empty() {
            return parse_response(&String::from_utf8_lossy(&self.stdout));
        }
        Err(EvalError::NoResponse)
    }
}

/// Pull the value out of the engine's reply: the first `= <number>` on
/// the last non-empty line.
pub fn parse_response(output: &str) -> Result<f64, EvalError> {
    let line = output
        .lines()
        .map(str::trim)
        .rfind(|l| !l.is_empty())
        .ok_or(EvalError::NoResponse)?;

    RESULT_PATTERN
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|token| leading_number(token.as_str()))
        .ok_or_else(|| EvalError::UnparseableOutput(line.to_string()))
}

/// Longest prefix of `token` that parses as a finite float.
fn leading_number(token: &str) -> Option<f64> {
    (1..=token.len())
        .rev()
        .find_map(|end| token[..end].parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Forward everything read from `reader` into a channel, chunk by chunk.
/// Chunks that do not fit are dropped, so an engine chattering between
/// exchanges cannot grow memory. The channel closes when the stream
/// reaches EOF or fails.
fn pump<R>(mut reader: R) -> mpsc::Receiver<Vec<u8>>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let (tx, rx) = mpsc::channel(PUMP_CAPACITY);
    tokio::spawn(async move {
        let mut buf = [0u8; READ_CHUNK];
        let mut dropped = 0usize;
        loop {
            match reader.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => match tx.try_send(buf[..n].to_vec()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => dropped += n,
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                },
            }
        }
        if dropped > 0 {
            tracing::debug!(bytes = dropped, "dropped unread engine output");
        }
    });
    rx
}

/// The supervised engine: its process (if any) and its streams.
pub struct EngineHandle {
    slot: Mutex<ExchangeSlot>,
    child: StdMutex<Option<Child>>,
    broken: AtomicBool,
    window: Duration,
}

impl EngineHandle {
    /// Wire up an engine from raw streams. Must be called inside a Tokio
    /// runtime: the output streams are read by background tasks from here on.
    pub fn from_streams<W, O, E>(stdin: W, stdout: O, stderr: E, window: Duration) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
        O: AsyncRead + Send + Unpin + 'static,
        E: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            slot: Mutex::new(ExchangeSlot {
                stdin: Box::new(stdin),
                stdout: pump(stdout),
                stderr: pump(stderr),
                stdout_open: true,
                stderr_open: true,
            }),
            child: StdMutex::new(None),
            broken: AtomicBool::new(false),
            window,
        }
    }

    /// Take ownership of a spawned child with all three streams piped.
    pub fn from_child(mut child: Child, window: Duration) -> Result<Self> {
        let stdin = child.stdin.take().context("engine stdin not piped")?;
        let stdout = child.stdout.take().context("engine stdout not piped")?;
        let stderr = child.stderr.take().context("engine stderr not piped")?;
        let handle = Self::from_streams(stdin, stdout, stderr, window);
        *handle.child.lock().unwrap_or_else(PoisonError::into_inner) = Some(child);
        Ok(handle)
    }

    pub fn pid(&self) -> Option<u32> {
        self.child
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Child::id)
    }

    /// Exit status, if the process has already terminated.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        child.as_mut().and_then(|c| c.try_wait().ok().flatten())
    }

    /// True once the engine can no longer answer: the process exited,
    /// its stdin broke, or its stdout closed.
    pub fn has_exited(&self) -> bool {
        if self.broken.load(Ordering::SeqCst) || self.exit_status().is_some() {
            return true;
        }
        match self.slot.try_lock() {
            Ok(slot) => !slot.stdout_open,
            // An exchange is running, so the streams were alive a moment ago.
            Err(_) => false,
        }
    }

    /// Ask the process to terminate. Does not wait for it.
    pub fn kill(&self) {
        let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(process) = child.as_mut()
            && let Err(e) = process.start_kill()
        {
            tracing::debug!(error = %e, "engine kill failed (already gone?)");
        }
    }

    /// Run one exchange: send the request, collect for the response
    /// window, and interpret what came back.
    pub async fn evaluate(&self, request: &EvaluationRequest) -> Result<f64, EvalError> {
        let mut slot = self.slot.lock().await;
        let mut pending = slot.begin(self.window);

        let line = request.to_line();
        let sent = async {
            pending.slot.stdin.write_all(line.as_bytes()).await?;
            pending.slot.stdin.flush().await
        }
        .await;
        if let Err(e) = sent {
            self.broken.store(true, Ordering::SeqCst);
            return Err(EvalError::EngineUnavailable(format!(
                "failed to write request: {e}"
            )));
        }

        // The window runs from the moment the request is on the wire.
        pending.deadline = Instant::now() + self.window;
        pending.collect().await;
        pending.into_result()
    }
}

/// Protocol-client entry point: one exchange against `engine`.
pub async fn evaluate(
    engine: &EngineHandle,
    request: &EvaluationRequest,
) -> Result<f64, EvalError> {
    engine.evaluate(request).await
}
