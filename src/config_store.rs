use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{get_config_folder, get_source_config_file, override_file_name};
use crate::error::{LauncherError, LauncherResult};
use crate::launch_config::Configuration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Source,
    Override,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub config: Configuration,
    pub provenance: Provenance,
}

/// Write access to the per-user override, as needed by the install flow.
pub trait OverrideStore {
    fn persist(&self, config: &Configuration) -> LauncherResult<()>;
    fn delete_override(&self) -> LauncherResult<()>;
}

/// Reconciles the read-only configuration shipped beside the launcher with
/// the per-user override written after a successful install.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    source_path: PathBuf,
    override_folder: PathBuf,
    game_id: Option<String>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::with_paths(get_source_config_file(), get_config_folder())
    }

    pub fn with_paths(source_path: PathBuf, override_folder: PathBuf) -> Self {
        Self {
            source_path,
            override_folder,
            game_id: None,
        }
    }

    /// Only known once `resolve` has read the source configuration.
    pub fn override_path(&self) -> Option<PathBuf> {
        self.game_id
            .as_deref()
            .map(|id| self.override_folder.join(override_file_name(id)))
    }

    pub fn resolve(&mut self) -> LauncherResult<ResolvedConfig> {
        if !self.source_path.is_file() {
            return Err(LauncherError::SourceConfigMissing(self.source_path.clone()));
        }
        let source = read_config(&self.source_path)?;
        let game_id = source
            .game_id()
            .map(str::to_string)
            .ok_or_else(|| LauncherError::MissingGameId(self.source_path.clone()))?;

        let override_path = self.override_folder.join(override_file_name(&game_id));
        self.game_id = Some(game_id.clone());

        if override_path.is_file() {
            let mut config = read_config(&override_path)?;
            if config.game_id().is_none() {
                config.game_id = Some(game_id);
            }
            tracing::info!(path = %override_path.display(), "Using user configuration");
            return Ok(ResolvedConfig {
                config,
                provenance: Provenance::Override,
            });
        }

        tracing::info!(path = %self.source_path.display(), "Using shipped configuration");
        Ok(ResolvedConfig {
            config: source,
            provenance: Provenance::Source,
        })
    }

    fn target_for(&self, config: &Configuration) -> LauncherResult<PathBuf> {
        if let Some(path) = self.override_path() {
            return Ok(path);
        }
        config
            .game_id()
            .map(|id| self.override_folder.join(override_file_name(id)))
            .ok_or_else(|| LauncherError::MissingGameId(self.source_path.clone()))
    }
}

impl OverrideStore for ConfigStore {
    fn persist(&self, config: &Configuration) -> LauncherResult<()> {
        let path = self.target_for(config)?;
        let json = config.to_json().map_err(|e| LauncherError::OverridePersistFailure {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        write_atomically(&path, json.as_bytes()).map_err(|source| {
            LauncherError::OverridePersistFailure {
                path: path.clone(),
                source,
            }
        })?;
        tracing::info!(path = %path.display(), "Saved user configuration");
        Ok(())
    }

    fn delete_override(&self) -> LauncherResult<()> {
        let Some(path) = self.override_path() else {
            return Ok(());
        };
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Removed user configuration");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(LauncherError::OverridePersistFailure { path, source }),
        }
    }
}

fn read_config(path: &Path) -> LauncherResult<Configuration> {
    let content = fs::read_to_string(path).map_err(|e| LauncherError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Configuration::from_json(&content).map_err(|e| LauncherError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Temp file in the same folder, fsync, then rename over the target.
/// The old file stays intact until the rename succeeds.
fn write_atomically(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let temp_path = path.with_extension(format!("json.{}.tmp", std::process::id()));
    let written = (|| {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();
    if written.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    written
}
