use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Console logs on stderr plus a daily file under the local data dir
/// (`~/.local/share/qerase/logs/` on Linux). `RUST_LOG` overrides the level.
///
/// Stdout is left for command output. The returned guard flushes the file
/// writer on drop, so keep it alive until exit.
pub fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("qerase")
        .join("logs");

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .compact();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match std::fs::create_dir_all(&log_dir) {
        Ok(()) => {
            let appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "qerase.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!("warning: cannot create log directory {}: {}", log_dir.display(), e);
            eprintln!("logging to console only");
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::debug!(dir = %log_dir.display(), "file logging ready");
    guard
}
