//! Structured logging initialization.
//!
//! # Responsibilities
//! - Map the config's textual level to a tracing severity
//! - Select the sink: stderr, or a rolling file
//!
//! # Design Decisions
//! - Exactly four textual levels map; anything else keeps the default (info)
//! - The sink is chosen once at cold start and not revisited on reload
//! - File logging rolls daily through a non-blocking writer

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;

use crate::config::schema::LogConfig;

/// The fixed level mapping. Unknown values fall back to the default.
fn level_filter(level: &str) -> LevelFilter {
    match level {
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

/// Initialize the global subscriber from the loaded config.
///
/// Returns a guard that must stay alive for file logging to flush; `None`
/// when logging to stderr.
pub fn init_logging(config: &LogConfig) -> std::io::Result<Option<WorkerGuard>> {
    let level = level_filter(&config.level);

    if config.output.is_empty() {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    }

    let path = Path::new(&config.output);
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("proxy-agent.log");

    let appender = tracing_appender::rolling::daily(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_levels_map() {
        assert_eq!(level_filter("debug"), LevelFilter::DEBUG);
        assert_eq!(level_filter("info"), LevelFilter::INFO);
        assert_eq!(level_filter("warn"), LevelFilter::WARN);
        assert_eq!(level_filter("error"), LevelFilter::ERROR);
    }

    #[test]
    fn unknown_level_keeps_default() {
        assert_eq!(level_filter("trace"), LevelFilter::INFO);
        assert_eq!(level_filter(""), LevelFilter::INFO);
        assert_eq!(level_filter("verbose"), LevelFilter::INFO);
    }
}
