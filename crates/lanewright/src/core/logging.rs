//! Logging infrastructure for the layout pipeline
//!
//! Structured `tracing` output written to stderr, so stdout stays free for
//! layout JSON and call logs.
//!
//! ```rust,no_run
//! use lanewright::core::logging::init_logging;
//!
//! init_logging(None, None).ok();
//! init_logging(Some("debug"), Some("pretty")).ok();
//! ```
//!
//! Formats: `compact` (one line per event, spans closed silently), `pretty`
//! (multi-line with source locations and span enter/exit), `json` (one
//! object per line with span close timings).
//!
//! The level comes from the explicit argument, then `LANEWRIGHT_LOG_LEVEL`,
//! then `RUST_LOG`. `LANEWRIGHT_LOG_FORMAT` picks the format when none is
//! given.
//!
//! Each pipeline stage opens its own span (`layout_process`,
//! `assign_swimlanes`, `break_cycles`, `assign_columns`, `order_rows`,
//! `emit_geometry`, `publish`), so stages can be filtered by module:
//!
//! ```bash
//! RUST_LOG="info,lanewright::plugins::process::ordering=trace" lanewright layout process.json
//! ```

use std::fmt as std_fmt;
use std::str::FromStr;

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact single-line format
    #[default]
    Compact,
    /// Pretty multi-line format with colors
    Pretty,
    /// JSON format for log aggregation
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

impl std_fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std_fmt::Formatter<'_>) -> std_fmt::Result {
        let name = match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        };
        f.write_str(name)
    }
}

impl LogFormat {
    /// Get all valid format names
    pub fn variants() -> &'static [&'static str] {
        &["compact", "pretty", "json"]
    }

    /// Stderr layer for this format
    fn layer(self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let base = fmt::Layer::default().with_writer(std::io::stderr).with_level(true);
        match self {
            LogFormat::Compact => base
                .with_target(false)
                .with_span_events(FmtSpan::NONE)
                .compact()
                .boxed(),
            LogFormat::Pretty => base
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::ACTIVE)
                .pretty()
                .boxed(),
            LogFormat::Json => base
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::CLOSE)
                .json()
                .boxed(),
        }
    }
}

/// Pick the filter directive: explicit value, then `LANEWRIGHT_LOG_LEVEL`,
/// then `RUST_LOG`, then `info`
fn resolve_level<F>(explicit: Option<&str>, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    explicit
        .map(str::to_string)
        .or_else(|| lookup("LANEWRIGHT_LOG_LEVEL"))
        .or_else(|| lookup("RUST_LOG"))
        .filter(|level| !level.trim().is_empty())
        .unwrap_or_else(|| "info".to_string())
}

/// Initialize the tracing subscriber with the given log level and format
///
/// * `level` - Optional filter directive (`debug`, or a full `RUST_LOG`
///   style string). If None, uses `LANEWRIGHT_LOG_LEVEL` or `RUST_LOG`,
///   or defaults to `info`.
/// * `format` - Optional log format (compact|pretty|json). If None, uses
///   `LANEWRIGHT_LOG_FORMAT`, or defaults to `compact`.
///
/// Logs always go to stderr so stdout stays clean for JSON output.
/// Returns an error if the format is unknown or a global subscriber is
/// already installed.
pub fn init_logging(
    level: Option<&str>,
    format: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let log_format = match format
        .map(str::to_string)
        .or_else(|| std::env::var("LANEWRIGHT_LOG_FORMAT").ok())
    {
        Some(name) => {
            LogFormat::from_str(&name).map_err(|e| format!("Invalid log format: {}", e))?
        }
        None => LogFormat::default(),
    };

    let directive = resolve_level(level, |key| std::env::var(key).ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

    Registry::default()
        .with(log_format.layer())
        .with(filter)
        .try_init()?;

    Ok(())
}

/// Initialize logging with default settings (info level, compact format)
pub fn init_default_logging() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(None, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_str("compact").unwrap(), LogFormat::Compact);
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("json").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert!(LogFormat::from_str("xml").is_err());
    }

    #[test]
    fn test_log_format_display_matches_variants() {
        let shown: Vec<String> = [LogFormat::Compact, LogFormat::Pretty, LogFormat::Json]
            .iter()
            .map(|f| f.to_string())
            .collect();
        assert_eq!(shown, LogFormat::variants());
    }

    #[test]
    fn test_resolve_level_precedence() {
        let env = |key: &str| match key {
            "LANEWRIGHT_LOG_LEVEL" => Some("warn".to_string()),
            "RUST_LOG" => Some("trace".to_string()),
            _ => None,
        };
        assert_eq!(resolve_level(Some("debug"), env), "debug");
        assert_eq!(resolve_level(None, env), "warn");
        assert_eq!(resolve_level(None, |key| (key == "RUST_LOG").then(|| "error".to_string())), "error");
        assert_eq!(resolve_level(None, |_| None), "info");
        assert_eq!(resolve_level(None, |_| Some("  ".to_string())), "info");
    }

    #[test]
    fn test_log_format_variants() {
        let variants = LogFormat::variants();
        assert_eq!(variants.len(), 3);
        assert!(variants.contains(&"compact"));
        assert!(variants.contains(&"json"));
    }
}
