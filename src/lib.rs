pub mod models;
pub mod services;

pub use models::{
    CacheStats, ConfidenceLevel, ExtractionMethod, ExtractionResult, PatternMatch, PatternType,
    ReasoningAnalytics, ReasoningMetrics, StreamPhase, StreamingState,
};
pub use services::{
    get_reasoning_analytics, remove_reasoning_from_content, ConfigError, ConfigStore,
    ExtractorConfig, ReasoningEngine, StreamingExtractor,
};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use services::config_store::env_truthy;

const ENV_LOG_DIR: &str = "REASONING_LENS_LOG_DIR";
const ENV_DISABLE_FILE_LOG: &str = "REASONING_LENS_DISABLE_FILE_LOG";
const LOG_FILE_PREFIX: &str = "reasoning_lens_";
const LOG_FILES_KEPT: usize = 30;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber: `RUST_LOG` filter (default `info`), console
/// output on stderr, plus a per-session log file when `REASONING_LENS_LOG_DIR`
/// is set. Calling it again after a subscriber exists does nothing.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if env_truthy(ENV_DISABLE_FILE_LOG) {
        init_console_only_logging(env_filter);
        return;
    }

    let logs_dir = match std::env::var(ENV_LOG_DIR) {
        Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => {
            init_console_only_logging(env_filter);
            return;
        }
    };

    if let Err(e) = fs::create_dir_all(&logs_dir) {
        eprintln!("Failed to create logs directory: {}", e);
        init_console_only_logging(env_filter);
        info!("Falling back to console-only logging (log dir not writable)");
        return;
    }

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let log_filename = format!("{}{}.log", LOG_FILE_PREFIX, timestamp);

    // One file per session; writes go through a non-blocking worker.
    let file_appender = rolling::never(&logs_dir, &log_filename);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(file_guard);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true);

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .is_ok();

    if installed {
        info!(version = env!("CARGO_PKG_VERSION"), "=== ReasoningLens Started ===");
        info!("Log file: {}/{}", logs_dir.display(), log_filename);
        std::thread::spawn(move || cleanup_old_logs(&logs_dir, LOG_FILES_KEPT));
    }
}

fn cleanup_old_logs(logs_dir: &Path, keep: usize) {
    let mut entries: Vec<_> = match fs::read_dir(logs_dir) {
        Ok(rd) => rd.filter_map(|e| e.ok()).collect(),
        Err(_) => return,
    };

    entries.retain(|e| {
        let name = e.file_name().to_string_lossy().to_string();
        name.starts_with(LOG_FILE_PREFIX) && name.ends_with(".log")
    });

    if entries.len() <= keep {
        return;
    }

    entries.sort_by_key(|e| {
        e.metadata()
            .and_then(|m| m.modified())
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
    });

    let remove_count = entries.len().saturating_sub(keep);
    for entry in entries.into_iter().take(remove_count) {
        let _ = fs::remove_file(entry.path());
    }
}

fn init_console_only_logging(env_filter: EnvFilter) {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_keeps_newest_logs_only() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("{}{}.log", LOG_FILE_PREFIX, i)), "x").unwrap();
        }
        fs::write(dir.path().join("unrelated.txt"), "x").unwrap();

        cleanup_old_logs(dir.path(), 2);

        let logs = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(LOG_FILE_PREFIX))
            .count();
        assert_eq!(logs, 2);
        assert!(dir.path().join("unrelated.txt").exists());
    }
}
