//! Tracing setup for the `sandbox-vm` binary.
//!
//! Stderr always gets a `fmt` layer filtered by `RUST_LOG`. With
//! `SANDBOX_VM_LOG=1` a second, ANSI-free layer appends to
//! `sandbox-vm.log` under [`paths::log_dir`], and the default level rises to
//! `info` so lifecycle decisions end up in the file.
//!
//! Keep the returned [`LogGuard`] alive until exit or buffered lines are lost.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::paths;

pub const LOG_ENV: &str = "SANDBOX_VM_LOG";
pub const LOG_FILE: &str = "sandbox-vm.log";

pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Filter used when `RUST_LOG` is unset.
pub fn default_directive(verbose: bool, file_logging: bool) -> &'static str {
    match (verbose, file_logging) {
        (true, _) => "debug",
        (false, true) => "info",
        (false, false) => "warn",
    }
}

pub fn init(verbose: bool) -> LogGuard {
    let file_logging = std::env::var(LOG_ENV).as_deref() == Ok("1");
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, file_logging)));

    let (file_layer, file_guard) = if file_logging {
        let dir = paths::log_dir();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            eprintln!("sandbox-vm: cannot create log directory {}: {e}", dir.display());
        }
        let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, LOG_FILE));
        (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    LogGuard {
        _file_guard: file_guard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_wins_over_file_logging() {
        assert_eq!(default_directive(true, false), "debug");
        assert_eq!(default_directive(true, true), "debug");
        assert_eq!(default_directive(false, true), "info");
        assert_eq!(default_directive(false, false), "warn");
    }
}
