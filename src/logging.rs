//! Diagnostic logging setup.
//!
//! User-facing output goes through [`crate::output`]; this only configures
//! `tracing` diagnostics written to stderr and, optionally, to a log file.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{AutopushError, Result};

/// Filter used when `RUST_LOG` is unset and debug logging is off.
pub const DEFAULT_FILTER: &str = "warn";

/// Filter used when `RUST_LOG` is unset and debug logging is on.
pub const DEBUG_FILTER: &str = "warn,autopush=debug";

/// Filter for the log file, independent of `RUST_LOG` and `--debug`.
pub const FILE_FILTER: &str = "info,autopush=debug";

/// The filter directive to fall back on when `RUST_LOG` is not set.
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        DEBUG_FILTER
    } else {
        DEFAULT_FILTER
    }
}

/// Open `path` for appending, creating it and its parent directory.
pub fn open_log_file(path: &Path) -> Result<File> {
    let describe = |e: std::io::Error| {
        AutopushError::Logging(format!("cannot open log file {}: {}", path.display(), e))
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(describe)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(describe)
}

/// Install the global subscriber. `RUST_LOG` overrides `debug` on stderr.
///
/// With `log_file`, every run also appends plain-text diagnostics there.
pub fn init_logging(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let stderr_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_filter);

    let file_layer = match log_file {
        Some(path) => Some(
            fmt::layer()
                .with_writer(Mutex::new(open_log_file(path)?))
                .with_ansi(false)
                .with_filter(EnvFilter::new(FILE_FILTER)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AutopushError::Logging(e.to_string()))
}
