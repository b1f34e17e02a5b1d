use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use calcbridge::banner::{BannerInfo, print_banner, print_session_summary};
use calcbridge::commands::{CommandRegistry, CommandResult, Session};
use calcbridge::consts::{
    RESPONSE_WINDOW, STARTUP_GRACE, default_db_path, default_engine_path, format_value,
};
use calcbridge::engine::{EngineCommand, EngineConfig, EngineSupervisor};
use calcbridge::history::sqlite::SqliteHistory;
use calcbridge::{Bridge, EvaluationResult, Outcome};

#[derive(Parser)]
#[command(
    name = "calcbridge",
    version,
    about = "Arithmetic through an external engine, with a local fallback."
)]
struct Cli {
    /// Engine executable (default: calc-engine next to this binary)
    #[arg(short, long)]
    engine: Option<PathBuf>,

    /// Argument passed to the engine; repeat for several
    #[arg(long = "engine-arg", allow_hyphen_values = true)]
    engine_args: Vec<String>,

    /// Do not start an engine; evaluate everything locally
    #[arg(long, default_value_t = false)]
    no_engine: bool,

    /// How long to collect engine output per request, in milliseconds
    #[arg(long, default_value_t = RESPONSE_WINDOW.as_millis() as u64)]
    window_ms: u64,

    /// How long the engine gets to come up before it is assumed ready, in milliseconds
    #[arg(long, default_value_t = STARTUP_GRACE.as_millis() as u64)]
    grace_ms: u64,

    /// SQLite database for history (use :memory: for ephemeral)
    #[arg(short, long)]
    db: Option<String>,

    /// Evaluate a single expression and exit (non-interactive)
    #[arg(short, long)]
    run: Option<String>,

    /// Print results as {"value": ...} / {"error": ...}
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Log engine exchanges and fallbacks to stderr
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    // Installed before the engine exists, so no interrupt can orphan it.
    let mut shutdown = Shutdown::install()?;

    let db_path = resolve_db_path(cli.db.as_deref())?;
    let history = SqliteHistory::new(&db_path)
        .with_context(|| format!("failed to open history database at {db_path}"))?;

    let command = if cli.no_engine {
        None
    } else {
        cli.engine.or_else(default_engine_path).map(|program| EngineCommand {
            program,
            args: cli.engine_args,
        })
    };
    let engine_label = command
        .as_ref()
        .map(|c| c.program.display().to_string())
        .unwrap_or_else(|| "none".to_string());

    let supervisor = EngineSupervisor::new(EngineConfig {
        command,
        response_window: Duration::from_millis(cli.window_ms),
        startup_grace: Duration::from_millis(cli.grace_ms),
    });
    let started = tokio::select! {
        started = supervisor.start() => started,
        _ = shutdown.recv() => {
            // Dropping the start future kills a half-started child.
            tracing::info!("interrupted during engine startup");
            supervisor.stop();
            return Ok(());
        }
    };
    if !started {
        tracing::warn!("calculator engine not available, using local evaluation");
    }
    let bridge = Bridge::new(supervisor, Box::new(history));

    // Single expression mode
    if let Some(expression) = cli.run {
        let result = tokio::select! {
            result = bridge.calculate(&expression) => result,
            _ = shutdown.recv() => {
                bridge.shutdown();
                return Ok(());
            }
        };
        print_result(&result, cli.json)?;
        bridge.shutdown();
        if result.is_err() {
            std::process::exit(1);
        }
        return Ok(());
    }

    let storage_label = if db_path == ":memory:" {
        "ephemeral"
    } else {
        db_path.as_str()
    };
    print_banner(&BannerInfo {
        engine: &engine_label,
        status: bridge.engine_status(),
        window_ms: u128::from(cli.window_ms),
        storage: storage_label,
    });

    let registry = CommandRegistry::new();
    let session = Session {
        bridge: &bridge,
        db_path: &db_path,
    };
    let mut calculations = 0;

    let mut lines = stdin_lines();

    loop {
        print!("calc> ");
        io::stdout().flush()?;

        let line = tokio::select! {
            result = lines.recv() => {
                match result {
                    Some(Ok(line)) => line,
                    None => {
                        // Ctrl+D (EOF)
                        println!();
                        break;
                    }
                    Some(Err(e)) => {
                        eprintln!("input error: {}", e);
                        break;
                    }
                }
            }
            _ = shutdown.recv() => {
                println!();
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match registry.dispatch(input, &session).await {
            CommandResult::Quit => break,
            CommandResult::Handled => continue,
            CommandResult::NotACommand => {}
        }

        let result = tokio::select! {
            result = bridge.calculate(input) => result,
            _ = shutdown.recv() => {
                println!();
                break;
            }
        };
        if result.is_ok() {
            calculations += 1;
        }
        print_result(&result, cli.json)?;
    }

    bridge.shutdown();
    print_session_summary(calculations);
    Ok(())
}

/// Stdin lines, read on a plain thread. A blocking read inside the runtime
/// cannot be cancelled and would hold up shutdown until the next Enter.
fn stdin_lines() -> mpsc::Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel(1);
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "calcbridge=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// `--db` if given, else `~/.calcbridge/calcbridge.db` (created on demand),
/// else an in-memory database.
fn resolve_db_path(explicit: Option<&str>) -> anyhow::Result<String> {
    if let Some(path) = explicit {
        return Ok(path.to_string());
    }
    let Some(path) = default_db_path() else {
        tracing::warn!("cannot determine home directory, history will not be persisted");
        return Ok(":memory:".to_string());
    };
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    Ok(path.to_string_lossy().into_owned())
}

fn print_result(result: &EvaluationResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(&Outcome::from(result))?);
        return Ok(());
    }
    match result {
        Ok(eval) => println!("= {}", format_value(eval.value)),
        Err(e) => eprintln!("error: {}", e),
    }
    Ok(())
}

/// Ctrl+C, or SIGTERM on Unix.
///
/// Handlers are registered at construction. A signal that arrives while
/// nobody is waiting is kept and seen by the next [`Shutdown::recv`].
struct Shutdown {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl Shutdown {
    #[cfg(unix)]
    fn install() -> anyhow::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?,
            terminate: signal(SignalKind::terminate())
                .context("failed to install SIGTERM handler")?,
        })
    }

    #[cfg(not(unix))]
    fn install() -> anyhow::Result<Self> {
        Ok(Self {})
    }

    #[cfg(unix)]
    async fn recv(&mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => {}
            _ = self.terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) {
        let _ = tokio::signal::ctrl_c().await;
    }
}
