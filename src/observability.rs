//! This module provides observability and diagnostics for the pipeline engine.
//!
//! Library code logs through the `log` facade. Applications (and tests that want
//! to see the output) call [`enable_verbose_logging`] once to install an
//! `env_logger` backend. The `log_metric!` macro emits structured key/value
//! metrics and is compiled out of release builds.

use log::LevelFilter;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Once;

use crate::error::Result;

/// Logs a structured key-value metric at debug level, only in debug builds.
///
/// # Example
/// ```
/// use strata::log_metric;
/// let tuples = 4096;
/// log_metric!("event"="filter_complete", "filter"="ConditionalSetValue", "tuples"=&tuples);
/// ```
#[macro_export]
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        #[cfg(debug_assertions)]
        {
            // Collect each pair as a JSON string fragment
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+

            log::debug!("STRATA_METRIC: {{ {} }}", parts.join(", "));
        }
    };
}

static INIT_LOGGER: Once = Once::new();

/// Installs the `env_logger` backend exactly once per process.
///
/// `level` accepts the usual names (`"error"`, `"warn"`, `"info"`, `"debug"`,
/// `"trace"`); anything else falls back to `info`. With `log_file` set, records
/// are appended to that file instead of stderr.
pub fn enable_verbose_logging(level: Option<&str>, log_file: Option<&Path>) -> Result<()> {
    let target = match log_file {
        Some(path) => Some(OpenOptions::new().append(true).create(true).open(path)?),
        None => None,
    };
    let filter = level
        .and_then(|l| l.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);

    INIT_LOGGER.call_once(move || {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(filter);

        // Custom formatter: just print the level and message
        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", record.level(), record.args())?;
            buf.flush()?;
            Ok(())
        });

        if let Some(file) = target {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        let _ = builder.try_init();
    });
    Ok(())
}
