use std::path::PathBuf;

use thiserror::Error;

pub type LauncherResult<T> = Result<T, LauncherError>;

#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("Could not find the launcher configuration at {0:?}")]
    SourceConfigMissing(PathBuf),
    #[error("The launcher configuration at {0:?} does not define a GameId")]
    MissingGameId(PathBuf),
    #[error("Could not read the configuration at {path:?}: {message}")]
    ConfigParseError { path: PathBuf, message: String },
    #[error("Could not save the configuration to {path:?}: {source}")]
    OverridePersistFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not find {0:?}")]
    LaunchTargetMissing(PathBuf),
    #[error("Could not open {target}: {message}")]
    LaunchFailure { target: String, message: String },
    #[error("Could not start the installer {path:?}: {source}")]
    InstallerLaunchFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Another instance did not release the instance lock in time")]
    SingleInstanceTimeout,
}

impl LauncherError {
    /// Bootstrap errors leave nothing meaningful to show, the process has to end.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LauncherError::SourceConfigMissing(_)
                | LauncherError::MissingGameId(_)
                | LauncherError::ConfigParseError { .. }
        )
    }
}
