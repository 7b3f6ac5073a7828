//! Logging setup for Gator.
//!
//! Command output goes to stdout, so every log line is written to stderr and
//! optionally mirrored into a file.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::Result;

/// Map a configured level name to a [`Level`]. Unknown names mean `info`.
fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// `RUST_LOG` directives plus the configured level.
fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::from_default_env().add_directive(parse_level(level).into())
}

/// Install the global subscriber described by `config`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let Some(path) = config.file.as_deref().map(Path::new) else {
        init_console_only(&config.level);
        return Ok(());
    };

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let writer = std::io::stderr.and(Arc::new(File::create(path)?));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .with(level_filter(&config.level))
        .init();
    Ok(())
}

/// Install a stderr-only subscriber at `level`.
pub fn init_console_only(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .with(level_filter(level))
        .init();
}
