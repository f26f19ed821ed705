//! Logging setup for the dvsync binary
//!
//! Human-readable events go to stderr so stdout stays reserved for command
//! output. With a log directory, a JSON file layer rolls daily alongside it.
//! `RUST_LOG` takes precedence over the default filter.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str =
    "warn,dvsync=info,dvsync_core=info,dvsync_schema_tools=info,dvsync_dataverse=info";
const VERBOSE_FILTER: &str =
    "info,dvsync=debug,dvsync_core=debug,dvsync_schema_tools=debug,dvsync_dataverse=debug";

/// Logging configuration
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for JSON log files; console only when unset
    pub log_dir: Option<PathBuf>,

    /// Raise the default filter to debug for dvsync crates
    pub verbose: bool,
}

impl LoggingConfig {
    pub fn default_filter(&self) -> &'static str {
        if self.verbose {
            VERBOSE_FILTER
        } else {
            DEFAULT_FILTER
        }
    }
}

/// Install the global subscriber
///
/// The returned guard flushes the file writer on drop and must be held until
/// the program exits.
pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter()));

    let mut layers = Vec::new();

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.verbose)
        .with_ansi(true)
        .compact()
        .with_filter(env_filter.clone())
        .boxed();
    layers.push(console_layer);

    let mut guard = None;
    if let Some(log_dir) = &config.log_dir {
        std::fs::create_dir_all(log_dir)?;

        let file_appender = tracing_appender::rolling::daily(log_dir, "dvsync.log");
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(non_blocking)
            .json()
            .with_filter(env_filter)
            .boxed();
        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    Ok(guard)
}
