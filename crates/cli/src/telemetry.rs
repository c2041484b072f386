use std::path::PathBuf;

use {
    tracing_appender::{
        non_blocking::WorkerGuard,
        rolling::{RollingFileAppender, Rotation},
    },
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

/// Resolved log settings: command-line flags over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryOptions {
    pub level: String,
    pub json: bool,
    pub dir: Option<PathBuf>,
}

/// Handle for the process-wide subscriber. Dropping it flushes the file
/// writer, so keep it alive until `main` returns.
///
/// Console logs go to stderr; stdout carries command output.
pub struct Telemetry {
    _file_guard: Option<WorkerGuard>,
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

pub fn init_telemetry(options: &TelemetryOptions) -> anyhow::Result<Telemetry> {
    let (file_layer, file_guard) = match &options.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("exambank")
                .filename_suffix("log")
                .max_log_files(5)
                .build(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        },
        None => (None, None),
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter(&options.level))
        .with(file_layer);

    if options.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }

    Ok(Telemetry {
        _file_guard: file_guard,
    })
}
