#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod config;
mod config_store;
mod error;
mod foreground;
mod installation;
mod launch;
mod launch_config;
mod logging;
mod registry;
mod settings;
mod single_instance;
mod ui;

use color_eyre::eyre::Result;
use tracing::{info, warn};

use crate::{
    config::{get_config_folder, get_launcher_folder},
    config_store::ConfigStore,
    error::LauncherError,
    installation::classify,
    settings::LauncherSettings,
    single_instance::{Acquisition, InstanceGuard, InstanceMutex, LockFileMutex, StartMode},
};

/// Reports a bootstrap error while this process still owns the instance
/// lock, so a second start raises the error window instead of opening another.
fn report_fatal<M: InstanceMutex>(
    _guard: &InstanceGuard<M>,
    err: &LauncherError,
    show: impl FnOnce(&str) -> Result<()>,
) -> Result<()> {
    tracing::error!("{err}");
    show(&err.to_string())
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args: Vec<String> = std::env::args().collect();
    let mode = StartMode::from_args(&args);
    let _log_guard = logging::init_logging(&get_config_folder(), mode);

    let settings = LauncherSettings::new().unwrap_or_else(|err| {
        warn!("Could not read launcher settings, using defaults: {err}");
        LauncherSettings::default()
    });

    let guard = match single_instance::acquire(
        LockFileMutex::new(),
        mode,
        settings.restart_wait(),
        settings.lock_poll(),
    ) {
        Acquisition::Active(guard) => guard,
        Acquisition::Yielded { holder } => {
            foreground::yield_to_running_instance(holder);
            return Ok(());
        }
    };

    let mut store = ConfigStore::new();
    let resolved = match store.resolve() {
        Ok(resolved) => resolved,
        Err(err) if err.is_fatal() => return report_fatal(&guard, &err, ui::run_fatal_error),
        Err(err) => return Err(err.into()),
    };

    let (presentation, config) = classify(resolved.config, &get_launcher_folder());
    info!(
        ?mode,
        ?presentation,
        provenance = ?resolved.provenance,
        "Starting launcher"
    );

    ui::run_ui(presentation, config, store, settings, guard)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::single_instance::acquire;

    #[test]
    fn lock_stays_held_while_fatal_error_is_shown() {
        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join("launcher.lock");
        let poll = Duration::from_millis(5);
        let Acquisition::Active(guard) =
            acquire(LockFileMutex::at(lock.clone()), StartMode::Normal, poll, poll)
        else {
            panic!("first launcher must own the lock");
        };

        let mut second_launch_active = None;
        report_fatal(
            &guard,
            &LauncherError::SourceConfigMissing(PathBuf::from("Config.json")),
            |_| {
                let second = acquire(LockFileMutex::at(lock.clone()), StartMode::Normal, poll, poll);
                second_launch_active = Some(second.is_active());
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(Some(false), second_launch_active);
    }
}
