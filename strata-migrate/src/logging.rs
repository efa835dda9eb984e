//! Logging setup for Strata.
//!
//! Everything in Strata logs through `tracing`; this module only installs a
//! subscriber when asked to through the environment.
//!
//! # Environment Variables
//!
//! - `STRATA_DEBUG=true|1|yes` - Enable debug logging
//! - `STRATA_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific level
//! - `STRATA_LOG_FORMAT=json|pretty|compact` - Output format (default: json)
//!
//! ```rust,no_run
//! use strata_migrate::logging;
//!
//! logging::init();
//! ```
//!
//! Each executed statement is logged at `debug` with its rendered SQL, each
//! created or migrated table at `info`, deferred failures at `warn`.

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Check if `STRATA_DEBUG` is set to `true`, `1` or `yes`.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("STRATA_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// The configured log level.
///
/// `STRATA_LOG_LEVEL` wins; otherwise `debug` when `STRATA_DEBUG` is set and
/// `warn` when not.
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("STRATA_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// The configured output format, `json` unless `STRATA_LOG_FORMAT` says
/// otherwise.
pub fn get_log_format() -> &'static str {
    env::var("STRATA_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Install the Strata subscriber. Subsequent calls are no-ops.
///
/// Does nothing unless `STRATA_DEBUG` or `STRATA_LOG_LEVEL` is set, or when
/// built without the `tracing-subscriber` feature.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("STRATA_LOG_LEVEL").is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(format!(
                "strata={level},strata_schema={level},strata_migrate={level},strata_mysql={level}"
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            let registry = tracing_subscriber::registry().with(filter);
            let installed = match get_log_format() {
                "compact" => registry.with(fmt::layer().compact()).try_init(),
                "pretty" => registry.with(fmt::layer().pretty()).try_init(),
                _ => registry.with(fmt::layer().json()).try_init(),
            };

            if installed.is_ok() {
                tracing::info!(
                    level = level,
                    format = get_log_format(),
                    "Strata logging initialized"
                );
            }
        }
    });
}

/// Set `STRATA_LOG_LEVEL` and initialize.
///
/// # Safety
///
/// Modifies the process environment; call before spawning threads.
pub fn init_with_level(level: &str) {
    // SAFETY: documented as startup-only, before other threads exist.
    unsafe {
        env::set_var("STRATA_LOG_LEVEL", level);
    }
    init();
}
