//! Logging configuration for Prismatic.
//!
//! Builds a tracing subscriber from the `[logger]` configuration section:
//! a console layer on stderr or stdout plus an optional file layer, each
//! with its own level.

use crate::config::LoggerConfig;
use crate::error::{PrismaticError, Result};
use std::fs::OpenOptions;
use std::io;
use std::sync::Arc;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Initializes the global tracing subscriber from configuration.
///
/// The console output value must have been validated at config load; an
/// empty `file_output` disables the file layer.
pub fn init(cfg: &LoggerConfig) -> Result<()> {
    let console_writer = match cfg.console_output.as_str() {
        "stdout" => BoxMakeWriter::new(io::stdout),
        _ => BoxMakeWriter::new(io::stderr),
    };

    let console_layer = fmt::layer()
        .with_writer(console_writer)
        .with_target(false)
        .with_filter(parse_level(&cfg.console_level));

    let file_layer = if cfg.file_output.is_empty() {
        None
    } else {
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&cfg.file_output)
            .map_err(|e| {
                PrismaticError::config(format!(
                    "failed to open log file {}: {e}",
                    cfg.file_output
                ))
            })?;

        Some(
            fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .with_filter(parse_level(&cfg.file_level)),
        )
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}

/// Parses a configured level name, defaulting to `info`.
fn parse_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "debug" => LevelFilter::DEBUG,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}
