use crate::config::get_settings_file;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the launcher itself, as opposed to the game configuration.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LauncherSettings {
    pub restart_wait_ms: u64,
    pub lock_poll_ms: u64,
    pub primary_close_delay_ms: u64,
}

impl LauncherSettings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings_file = get_settings_file();
        let settings_file = settings_file.to_string_lossy();
        Self::from_sources(Some(settings_file.as_ref()))
    }

    fn from_sources(settings_file: Option<&str>) -> Result<Self, ConfigError> {
        let default_str = include_str!("defaultsettings.toml");
        let mut builder = Config::builder()
            .add_source(File::from_str(default_str, config::FileFormat::Toml));
        if let Some(settings_file) = settings_file {
            // Optional file shipped on the disk next to the launcher
            builder = builder.add_source(File::with_name(settings_file).required(false));
        }
        // Eg.. `LAUNCHER_RESTART_WAIT_MS=8000 ./disk-launcher`
        let config = builder
            .add_source(Environment::with_prefix("launcher").try_parsing(true))
            .build()?;
        config.try_deserialize::<LauncherSettings>()
    }

    pub fn restart_wait(&self) -> Duration {
        Duration::from_millis(self.restart_wait_ms)
    }

    pub fn lock_poll(&self) -> Duration {
        Duration::from_millis(self.lock_poll_ms.max(1))
    }

    pub fn primary_close_delay(&self) -> Duration {
        Duration::from_millis(self.primary_close_delay_ms)
    }
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            restart_wait_ms: 5000,
            lock_poll_ms: 100,
            primary_close_delay_ms: 1000,
        }
    }
}
