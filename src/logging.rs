use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "survey_pipeline=info";

/// Initializes the logging system with both console and file output.
///
/// The returned guard flushes the file writer on drop, so the caller must keep it
/// alive for as long as logs should reach disk.
pub fn init_logging(log_dir: &Path) -> Option<WorkerGuard> {
    // Console-only if the log directory cannot be created
    if let Err(e) = fs::create_dir_all(log_dir) {
        let filter = env_filter();
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        tracing::warn!("Could not create log directory {}: {}", log_dir.display(), e);
        return None;
    }

    // Daily-rotated JSON file log
    let file_appender = tracing_appender::rolling::daily(log_dir, "pipeline.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    let console_layer = fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .with(console_layer)
        .init();

    Some(guard)
}

fn env_filter() -> EnvFilter {
    match DEFAULT_DIRECTIVE.parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    }
}
