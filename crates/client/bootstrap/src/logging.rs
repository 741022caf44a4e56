//! Tracing subscriber setup.
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::PlaykitConfig;

const LOG_FILE: &str = "playkit.log";

/// Install the global subscriber: stderr always, plus a per-session log file
/// when `config.log_dir` is set.
///
/// The filter honours `RUST_LOG` and defaults to `info`. Keep the returned
/// guard alive for as long as file logs should be flushed.
pub fn setup_logging(config: &PlaykitConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard, log_path) = match &config.log_dir {
        Some(log_dir) => {
            let session_log_dir = log_dir.join(session_id(config));
            std::fs::create_dir_all(&session_log_dir).with_context(|| {
                format!("Failed to create log directory {}", session_log_dir.display())
            })?;

            let file_appender = tracing_appender::rolling::never(&session_log_dir, LOG_FILE);
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false);
            (Some(layer), Some(guard), Some(session_log_dir.join(LOG_FILE)))
        }
        None => (None, None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    match log_path {
        Some(path) => tracing::info!("Logging initialized: log file {}", path.display()),
        None => tracing::debug!("Logging initialized: stderr only"),
    }
    Ok(guard)
}

fn session_id(config: &PlaykitConfig) -> String {
    config.session_id.clone().unwrap_or_else(|| {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        format!("session_{}", timestamp)
    })
}
