//! Logging setup.
//!
//! The loader emits `tracing` events everywhere; nothing is printed unless a
//! subscriber is installed. [`init`] installs one (with the
//! `tracing-subscriber` feature) based on environment variables:
//!
//! - `WEFT_DEBUG=true|1|yes` enables debug-level output
//! - `WEFT_LOG_LEVEL=trace|debug|info|warn|error` sets the level explicitly
//! - `WEFT_LOG_FORMAT=json|pretty|compact` picks the output format (default: json)
//!
//! ```rust,no_run
//! weft_core::logging::init();
//! ```
//!
//! Events worth knowing about:
//!
//! ```rust,ignore
//! debug!(navigation = %edge.qualified_name(), keys = 3, rows = 9, elapsed_ms = 1, "batch fetch");
//! warn!(navigation = "Post.Tags", elapsed_ms = 1800, "slow batch fetch");
//! warn!(entity_type = "Person", key = %key, conflicts = 1, "identity conflict: ...");
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Multi-line human readable output.
    Pretty,
    /// Single-line human readable output.
    Compact,
}

impl LogFormat {
    fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "pretty" => Self::Pretty,
            "compact" => Self::Compact,
            _ => Self::Json,
        }
    }

    /// Name of the format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
            Self::Compact => "compact",
        }
    }
}

fn truthy(raw: &str) -> bool {
    matches!(raw.to_lowercase().as_str(), "true" | "1" | "yes")
}

fn level_from(raw_level: Option<&str>, debug: bool) -> &'static str {
    let fallback = if debug { "debug" } else { "warn" };
    match raw_level.map(str::to_lowercase).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => fallback,
    }
}

/// Check if `WEFT_DEBUG` is set to a truthy value.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("WEFT_DEBUG").map(|v| truthy(&v)).unwrap_or(false)
}

/// The level requested through `WEFT_LOG_LEVEL`.
///
/// Falls back to `debug` when `WEFT_DEBUG` is enabled and `warn` otherwise.
pub fn log_level() -> &'static str {
    level_from(env::var("WEFT_LOG_LEVEL").ok().as_deref(), is_debug_enabled())
}

/// The format requested through `WEFT_LOG_FORMAT`.
pub fn log_format() -> LogFormat {
    env::var("WEFT_LOG_FORMAT")
        .map(|f| LogFormat::parse(&f))
        .unwrap_or(LogFormat::Json)
}

/// Install the global subscriber once.
///
/// Does nothing unless `WEFT_DEBUG` or `WEFT_LOG_LEVEL` is set, or when the
/// `tracing-subscriber` feature is off. Later calls are no-ops.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("WEFT_LOG_LEVEL").is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = log_level();
            let format = log_format();
            let filter = EnvFilter::try_new(format!("weft={level},weft_core={level},blogging={level}"))
                .unwrap_or_else(|_| EnvFilter::new("warn"));

            let registry = tracing_subscriber::registry().with(filter);
            let installed = match format {
                LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
                LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
                LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
            };

            if installed.is_ok() {
                tracing::info!(level, format = format.as_str(), "weft logging initialized");
            }
        }
    });
}

/// Install the subscriber at `level`.
///
/// # Safety
///
/// Sets `WEFT_LOG_LEVEL` in the process environment. Call this at startup,
/// before other threads exist.
pub fn init_with_level(level: &str) {
    // SAFETY: documented as startup-only, before threads are spawned.
    unsafe {
        env::set_var("WEFT_LOG_LEVEL", level);
    }
    init();
}

/// Install the subscriber at debug level.
///
/// # Safety
///
/// Sets `WEFT_DEBUG` in the process environment. Call this at startup,
/// before other threads exist.
pub fn init_debug() {
    // SAFETY: documented as startup-only, before threads are spawned.
    unsafe {
        env::set_var("WEFT_DEBUG", "true");
    }
    init();
}

/// Debug event emitted only when `WEFT_DEBUG` is enabled.
#[macro_export]
macro_rules! weft_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}

/// Trace event emitted only when `WEFT_DEBUG` is enabled.
#[macro_export]
macro_rules! weft_trace {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::trace!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthy() {
        assert!(truthy("TRUE"));
        assert!(truthy("1"));
        assert!(truthy("yes"));
        assert!(!truthy("off"));
    }

    #[test]
    fn test_level_resolution() {
        assert_eq!(level_from(None, false), "warn");
        assert_eq!(level_from(None, true), "debug");
        assert_eq!(level_from(Some("TRACE"), false), "trace");
        assert_eq!(level_from(Some("loud"), false), "warn");
        assert_eq!(level_from(Some("loud"), true), "debug");
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(LogFormat::parse("Pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::parse("xml"), LogFormat::Json);
        assert_eq!(LogFormat::Json.as_str(), "json");
    }
}
