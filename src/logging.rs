use crate::config::Config;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing.
///
/// Always installs a stdout layer. When `LOG_DIR` is configured, a daily
/// rotating file layer is added as well; the returned guard must be kept
/// alive for the lifetime of the process so the non-blocking writer flushes.
pub fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let registry = tracing_subscriber::registry().with(filter);

    match &config.log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, &config.log_file);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let file_layer = fmt::layer()
                .with_target(false)
                .with_writer(non_blocking)
                .with_ansi(false);
            let stdout_layer = fmt::layer().with_target(false).with_ansi(true);

            registry.with(file_layer).with(stdout_layer).init();
            Some(guard)
        }
        None => {
            let stdout_layer = fmt::layer().with_target(false).with_ansi(true);
            registry.with(stdout_layer).init();
            None
        }
    }
}
