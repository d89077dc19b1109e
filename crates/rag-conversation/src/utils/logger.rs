use anyhow::Result;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::{LogFormat, LoggingConfig};

/// Where log output goes besides the optional rolling file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// Server: stdout plus file when configured
    Stdout,
    /// Interactive CLI: file only, keeps the terminal clean
    FileOnly,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global tracing subscriber.
///
/// The returned guard must be held for the life of the process when a log
/// directory is configured, otherwise buffered file output is lost.
pub fn init_logger(config: &LoggingConfig, target: LogTarget, file_prefix: &str) -> Result<Option<WorkerGuard>> {
    let log_level = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,rag_conversation=debug".to_string());
    let filter = EnvFilter::try_new(&log_level)?;

    let json = config.format == LogFormat::Json;
    let mut layers: Vec<BoxedLayer> = Vec::new();

    if target == LogTarget::Stdout {
        let layer = if json {
            fmt::layer()
                .json()
                .with_writer(std::io::stdout)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .boxed()
        } else {
            fmt::layer()
                .pretty()
                .with_writer(std::io::stdout)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .boxed()
        };
        layers.push(layer);
    }

    let mut guard = None;
    if let Some(directory) = &config.directory {
        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(file_prefix)
            .filename_suffix("log")
            .build(directory)?;
        let (writer, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);

        let layer = if json {
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .boxed()
        } else {
            fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_level(true)
                .with_ansi(false) // No colors in file
                .boxed()
        };
        layers.push(layer);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()?;

    Ok(guard)
}
