//! Logging setup: concise console output plus a detailed log file.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Initialize global logging.
///
/// The console shows INFO (DEBUG when `verbose`) as bare messages; `RUST_LOG`
/// overrides. The log file always records DEBUG with timestamps and levels.
pub fn init_logging(log_file: &Path, verbose: bool) {
    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .without_time()
        .with_level(false)
        .with_target(false)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(console_level.into())
                .from_env_lossy(),
        );

    let file_layer = file_appender(log_file).map(|appender| {
        fmt::layer()
            .with_writer(appender)
            .with_ansi(false)
            .with_target(false)
            .with_filter(
                EnvFilter::builder()
                    .with_default_directive(LevelFilter::DEBUG.into())
                    .parse_lossy("debug,reqwest=info,hyper_util=info"),
            )
    });

    let _ = Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

/// Open the log file for appending. `None` (console only) if it cannot be opened.
fn file_appender(log_file: &Path) -> Option<RollingFileAppender> {
    let (dir, name) = log_file_parts(log_file)?;
    let name = name.to_str()?;
    match RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
    {
        Ok(appender) => Some(appender),
        Err(e) => {
            eprintln!("Cannot open log file {}: {}", log_file.display(), e);
            None
        }
    }
}

/// Split the log path into the directory/file pair `tracing-appender` wants,
/// creating the directory. `None` if it cannot be created.
fn log_file_parts(log_file: &Path) -> Option<(&Path, &std::ffi::OsStr)> {
    let dir = log_file.parent()?;
    let name = log_file.file_name()?;
    std::fs::create_dir_all(dir).ok()?;
    Some((dir, name))
}
