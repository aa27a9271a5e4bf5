// ocular-server/src/logging.rs

use anyhow::{Context, Result};
use ocular_core::config::LoggingConfig;
use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use time::macros::format_description;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, time::LocalTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

pub const LOG_FILE_NAME: &str = "ocular-server.log";

/// Filter directive used when `RUST_LOG` is not set: `-v` flags win over the
/// configured level.
pub fn default_directive(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.trim().to_ascii_lowercase(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

pub fn log_directory(config: &LoggingConfig) -> PathBuf {
    config.directory.clone().unwrap_or_else(|| {
        dirs::cache_dir()
            .or_else(dirs::runtime_dir)
            .unwrap_or_else(env::temp_dir)
            .join("ocular")
    })
}

/// Installs the global subscriber: stderr plus a plain-text log file.
///
/// stdout is left alone since it carries the MCP transport. The returned guard
/// flushes the file writer when dropped and must live until exit.
pub fn init(verbose: u8, config: &LoggingConfig) -> Result<(WorkerGuard, PathBuf)> {
    let directive = default_directive(verbose, &config.level);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directive))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_dir = log_directory(config);
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let log_path = log_dir.join(LOG_FILE_NAME);

    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let timer = LocalTime::new(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
    ));

    let file_layer = fmt::layer()
        .with_writer(non_blocking_writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_timer(timer.clone());

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(timer)
        .with_target(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok((guard, log_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_overrides_configured_level() {
        assert_eq!(default_directive(0, "Debug "), "debug");
        assert_eq!(default_directive(1, "error"), "info");
        assert_eq!(default_directive(2, "error"), "debug");
        assert_eq!(default_directive(5, "error"), "trace");
    }

    #[test]
    fn test_log_directory_prefers_config() {
        let config = LoggingConfig {
            level: "info".into(),
            directory: Some(PathBuf::from("/var/log/ocular")),
        };
        assert_eq!(log_directory(&config), PathBuf::from("/var/log/ocular"));

        let default = log_directory(&LoggingConfig::default());
        assert!(default.ends_with("ocular"));
    }

    // Only test in this binary that installs the global subscriber.
    #[test]
    fn test_init_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            level: "debug".into(),
            directory: Some(dir.path().join("logs")),
        };
        let (guard, path) = init(0, &config).unwrap();
        tracing::info!("written to the log file");
        drop(guard);

        assert_eq!(path, dir.path().join("logs").join(LOG_FILE_NAME));
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("written to the log file"), "log: {:?}", contents);
    }
}
