use std::path::Path;

use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{InitError, RollingFileAppender, Rotation},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::single_instance::StartMode;

const LOG_FILE_PREFIX: &str = "launcher";
const LOG_FILE_SUFFIX: &str = "log";
/// Every restart appends to the same day's file, older days get pruned.
const MAX_LOG_FILES: usize = 5;

fn file_appender(log_folder: &Path) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(MAX_LOG_FILES)
        .build(log_folder)
}

/// Logs to stderr and, when the folder is writable, to daily files in
/// `log_folder`. Keep the returned guard alive until exit so the file
/// writer gets flushed.
pub fn init_logging(log_folder: &Path, mode: StartMode) -> Option<WorkerGuard> {
    let _ = std::fs::create_dir_all(log_folder);
    let (file_layer, guard, file_error) = match file_appender(log_folder) {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_line_number(true);
            (Some(layer), Some(guard), None)
        }
        Err(err) => (None, None, Some(err)),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,disk_launcher=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();

    if let Some(err) = file_error {
        tracing::warn!(folder = %log_folder.display(), "Logging to stderr only: {err}");
    }
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = std::process::id(),
        ?mode,
        "Launcher starting"
    );
    guard
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn log_files_are_named_after_the_launcher() {
        let dir = tempfile::tempdir().unwrap();
        let mut appender = file_appender(dir.path()).unwrap();
        writeln!(appender, "started").unwrap();
        appender.flush().unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();

        assert_eq!(1, names.len());
        assert!(names[0].starts_with("launcher."));
        assert!(names[0].ends_with(".log"));
    }

    #[test]
    fn unusable_folder_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_folder = dir.path().join("file");
        std::fs::write(&not_a_folder, b"").unwrap();

        assert!(file_appender(&not_a_folder).is_err());
    }
}
