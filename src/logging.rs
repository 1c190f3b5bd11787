//! Structured logging and tracing for chargebridge
//!
//! Console output (plain or JSON) and optional daily-rotated log files, both
//! fed from one `tracing` registry filtered by `RUST_LOG` or the configured
//! level.

use crate::config::LoggingConfig;
use crate::error::{BridgeError, Result};
use std::path::Path;
use tracing::{Level, info};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod level;
mod state;
mod structured;

pub use level::parse_log_level;
pub use structured::{LogContext, StructuredLogger, get_logger, get_logger_with_context};

use state::{INIT_ERROR, INIT_ONCE, LOG_GUARD};

/// Initialize logging system based on configuration
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    INIT_ONCE.call_once(|| {
        let init_result = (|| -> Result<()> {
            let level = parse_log_level(&config.level)?;
            let filter = build_env_filter(level);

            match config.file.as_deref() {
                Some(dir) if !should_use_console_only() => {
                    init_file_logging(config, dir, filter, level)
                }
                _ => {
                    init_console_only_logging(filter, config.json_format, level);
                    Ok(())
                }
            }
        })();

        if let Err(e) = init_result {
            let _ = INIT_ERROR.set(e.to_string());
        }
    });

    if let Some(err) = INIT_ERROR.get() {
        return Err(BridgeError::config(err.clone()));
    }
    Ok(())
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| format!("chargebridge={}", level).into())
}

fn should_use_console_only() -> bool {
    cfg!(test) || std::env::var_os("CHARGEBRIDGE_DISABLE_FILE_LOG").is_some()
}

fn console_layer<S>(json_format: bool, level: Level) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);
    if json_format {
        layer
            .json()
            .with_filter(LevelFilter::from_level(level))
            .boxed()
    } else {
        layer.with_filter(LevelFilter::from_level(level)).boxed()
    }
}

fn init_console_only_logging(filter: EnvFilter, json_format: bool, level: Level) {
    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer(json_format, level))
        .init();

    info!("Logging initialized - level: {:?}, console-only", level);
}

fn init_file_logging(
    config: &LoggingConfig,
    dir: &str,
    filter: EnvFilter,
    level: Level,
) -> Result<()> {
    // Accept either a directory or a file path whose parent is used
    let p = Path::new(dir);
    let dir = if p.extension().is_some() {
        p.parent().unwrap_or(p)
    } else {
        p
    };

    let file_appender = rolling::Builder::new()
        .rotation(rolling::Rotation::DAILY)
        .filename_prefix("chargebridge")
        .filename_suffix("log")
        .max_log_files(config.backup_count.max(1) as usize)
        .build(dir)
        .map_err(|e| BridgeError::io(format!("Failed to create log file appender: {}", e)))?;

    let (non_blocking_appender, guard) = non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    let file_layer = {
        let base = fmt::layer()
            .with_writer(non_blocking_appender)
            .with_ansi(false)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false);
        if config.json_format {
            base.json()
                .with_filter(LevelFilter::from_level(level))
                .boxed()
        } else {
            base.with_filter(LevelFilter::from_level(level)).boxed()
        }
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(file_layer);

    if config.console_output {
        subscriber
            .with(console_layer(config.json_format, level))
            .init();
    } else {
        subscriber.init();
    }

    info!(
        "Logging initialized - level: {:?}, directory: {}",
        level,
        dir.display()
    );
    Ok(())
}
