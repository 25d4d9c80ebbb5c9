use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{FileLogConfig, LogConfig};

/// Flushes buffered file output when dropped; hold it until shutdown.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|err| {
        eprintln!("invalid log filter {level:?} ({err}), using info");
        EnvFilter::new("info")
    })
}

/// Opens the daily-rolling log file, creating its directory if needed.
pub fn open_file_writer(config: &FileLogConfig) -> Result<(NonBlocking, WorkerGuard), InitError> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(config.file_name.clone())
        .build(&config.dir)?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Installs the global subscriber: stderr always, plus a file when configured.
///
/// A log file that cannot be opened is reported on stderr and skipped so the
/// binary still starts.
pub fn init_tracing(config: &LogConfig) -> Option<FileLogGuard> {
    let file = config.file.as_ref().and_then(|file| match open_file_writer(file) {
        Ok(writer) => Some(writer),
        Err(err) => {
            eprintln!("file logging disabled, {}: {err}", file.dir.display());
            None
        }
    });
    let (file_layer, guard) = match file {
        Some((writer, guard)) => (
            Some(fmt::layer().with_writer(writer).with_ansi(false).with_target(true)),
            Some(FileLogGuard { _guard: guard }),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}
