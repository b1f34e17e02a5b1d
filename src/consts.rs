//! Project-wide constants.

use std::path::PathBuf;
use std::time::Duration;

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const HOMEPAGE: &str = env!("CARGO_PKG_HOMEPAGE");

/// Storage key the history list lives under.
pub const HISTORY_KEY: &str = "calculatorHistory";

/// Maximum number of history entries kept.
pub const HISTORY_LIMIT: usize = 50;

/// How long an exchange collects engine output before it is judged.
pub const RESPONSE_WINDOW: Duration = Duration::from_millis(200);

/// Time a freshly spawned engine is given before it is assumed ready.
pub const STARTUP_GRACE: Duration = Duration::from_millis(500);

/// File name of the bundled engine binary.
pub const ENGINE_BINARY: &str = "calc-engine";

/// Default database path: `~/.calcbridge/calcbridge.db`.
pub fn default_db_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".calcbridge").join("calcbridge.db"))
}

/// The engine binary installed next to the running executable, if any.
pub fn default_engine_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let candidate = exe.parent()?.join(ENGINE_BINARY);
    candidate.is_file().then_some(candidate)
}

/// Render a result the way the engine prints it: integers without a
/// fractional part, everything else in shortest round-trip form.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
