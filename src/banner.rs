//! Startup banner and session summary display.

use crate::bridge::EngineStatus;
use crate::consts::{AUTHOR, HISTORY_LIMIT, HOMEPAGE};

/// Session configuration for display in the startup banner.
pub struct BannerInfo<'a> {
    pub engine: &'a str,
    pub status: EngineStatus,
    pub window_ms: u128,
    pub storage: &'a str,
}

pub fn print_banner(info: &BannerInfo) {
    println!(
        r#"
   ╔═══════════════════════════════════════╗
   ║          C A L C B R I D G E          ║
   ║    engine first, local as fallback    ║
   ╚═══════════════════════════════════════╝

   version   {}
   by        {}
   home      {}
   engine    {} ({})
   window    {} ms
   history   {} (last {})

   operators + - * / % ^ ( )   type /help for commands
"#,
        env!("CARGO_PKG_VERSION"),
        AUTHOR,
        HOMEPAGE,
        info.engine,
        info.status,
        info.window_ms,
        info.storage,
        HISTORY_LIMIT,
    );
}

/// Print the session summary (calculation count + farewell).
pub fn print_session_summary(calculations: usize) {
    if calculations > 0 {
        println!("session: {calculations} calculation(s)");
    }
    println!("goodbye.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_banner_does_not_panic() {
        let info = BannerInfo {
            engine: "/usr/local/bin/calc-engine",
            status: EngineStatus::Running,
            window_ms: 200,
            storage: "ephemeral",
        };
        print_banner(&info);
    }

    #[test]
    fn print_session_summary_does_not_panic() {
        print_session_summary(0);
        print_session_summary(3);
    }
}
