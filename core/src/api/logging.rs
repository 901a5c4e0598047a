use super::config::DebuggerConfig;
use crate::error::DebuggerError;
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Install the global `tracing` subscriber.
///
/// Logs go to stderr unless `log_dir` is set, in which case they are written
/// to a daily rolling file there. Calling this again after a subscriber exists
/// is harmless.
pub fn init_logging(config: &DebuggerConfig) -> Result<(), DebuggerError> {
    let level = resolve_log_level(config.log_level.as_deref());

    match &config.log_dir {
        None => {
            let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
        }
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir)?;
            if FILE_GUARD.get().is_none() {
                let file_appender = tracing_appender::rolling::daily(log_dir, "netdebug_core");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                // Another subscriber may already own the process (host app, earlier init).
                let installed = tracing_subscriber::fmt()
                    .with_max_level(level)
                    .with_ansi(false)
                    .with_writer(non_blocking)
                    .try_init()
                    .is_ok();
                if installed {
                    let _ = FILE_GUARD.set(guard);
                }
            }
        }
    }

    tracing::info!("netdebug core initialized v{}", crate::VERSION);
    Ok(())
}

/// Level from the explicit setting, then `RUST_LOG`, defaulting to info.
pub fn resolve_log_level(explicit: Option<&str>) -> LevelFilter {
    let raw = match explicit {
        Some(level) => level.to_string(),
        None => match std::env::var("RUST_LOG") {
            Ok(val) => val,
            Err(_) => return LevelFilter::INFO,
        },
    };
    match raw.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" | "warning" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}
