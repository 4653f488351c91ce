//! Tracing subscriber setup
//!
//! Shared by the command line tool and tests.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Logs go to `log_file_path` when given, stderr otherwise. Filtering follows
/// `RUST_LOG`, defaulting to WARN. Returns false if the log file could not be
/// created or a subscriber was already installed.
pub fn init_global(log_file_path: Option<&Path>) -> bool {
    let writer = match log_file_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match File::create(path) {
                Ok(file) => BoxMakeWriter::new(Arc::new(file)),
                Err(e) => {
                    eprintln!("Failed to create log file {}: {}", path.display(), e);
                    return false;
                }
            }
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing::subscriber::set_global_default(build_subscriber(writer)).is_ok()
}

/// Build a subscriber writing to `writer` with `RUST_LOG` filtering.
pub fn build_subscriber(writer: BoxMakeWriter) -> impl tracing::Subscriber + Send + Sync {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let fmt_layer = fmt::layer().with_writer(writer).with_ansi(false);

    tracing_subscriber::registry().with(fmt_layer).with(env_filter)
}
