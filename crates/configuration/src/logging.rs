use crate::error::ConfigError;
use crate::settings::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global subscriber: a console layer on stderr and a daily-rolling file
/// layer under `config.dir`.
///
/// The returned guard flushes the file writer when dropped, so the caller must hold
/// it for the lifetime of the process.
pub fn init_tracing(config: &LoggingConfig) -> Result<WorkerGuard, ConfigError> {
    std::fs::create_dir_all(&config.dir).map_err(|e| {
        ConfigError::LoggingError(format!(
            "cannot create log directory {}: {e}",
            config.dir.display()
        ))
    })?;

    let file_appender = tracing_appender::rolling::daily(&config.dir, &config.file_prefix);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .try_init()
        .map_err(|e| ConfigError::LoggingError(e.to_string()))?;

    Ok(guard)
}
