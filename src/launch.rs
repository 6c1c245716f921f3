use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tokio::{runtime::Runtime, sync::watch};

use crate::error::{LauncherError, LauncherResult};
use crate::installation::{RestartMode, RestartRequest};
use crate::launch_config::{ActionKind, ButtonDescriptor, StyleKind};
use crate::single_instance::RESTART_FLAG;

#[derive(Debug, Clone, PartialEq)]
pub enum LaunchTarget {
    Executable { path: PathBuf, working_dir: PathBuf },
    Document { path: PathBuf, working_dir: PathBuf },
    Uri(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterLaunch {
    KeepOpen,
    CloseLauncher,
}

pub trait ProcessLauncher {
    fn launch(&self, target: &LaunchTarget) -> LauncherResult<()>;
}

/// Relative paths are relative to the launcher, not to the working directory.
pub fn resolve_local_path(launcher_folder: &Path, stored: &str) -> PathBuf {
    let path = Path::new(stored.trim());
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        launcher_folder.join(path)
    }
}

pub fn target_for(button: &ButtonDescriptor, launcher_folder: &Path) -> LauncherResult<LaunchTarget> {
    let stored = button.path.trim();
    if stored.is_empty() {
        return Err(LauncherError::LaunchTargetMissing(PathBuf::from(&button.text)));
    }
    match button.action_kind {
        ActionKind::Website => Ok(LaunchTarget::Uri(stored.to_string())),
        ActionKind::LocalFile => {
            let path = resolve_local_path(launcher_folder, stored);
            if !path.exists() {
                return Err(LauncherError::LaunchTargetMissing(path));
            }
            let working_dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| launcher_folder.to_path_buf());
            if is_executable::is_executable(&path) {
                Ok(LaunchTarget::Executable { path, working_dir })
            } else {
                Ok(LaunchTarget::Document { path, working_dir })
            }
        }
    }
}

/// Runs whatever a non-install button points at.
pub fn activate(
    button: &ButtonDescriptor,
    launcher_folder: &Path,
    launcher: &dyn ProcessLauncher,
) -> LauncherResult<AfterLaunch> {
    let target = target_for(button, launcher_folder)?;
    launcher.launch(&target)?;
    tracing::info!(?target, text = %button.text, "Launched button target");
    Ok(match button.style_kind {
        StyleKind::Primary => AfterLaunch::CloseLauncher,
        StyleKind::Default => AfterLaunch::KeepOpen,
    })
}

/// Spawns executables directly and hands everything else to the desktop's
/// default handler.
#[derive(Clone, Copy, Default)]
pub struct ShellLauncher;

impl ProcessLauncher for ShellLauncher {
    fn launch(&self, target: &LaunchTarget) -> LauncherResult<()> {
        match target {
            LaunchTarget::Executable { path, working_dir } => Command::new(path)
                .current_dir(working_dir)
                .spawn()
                .map(|_| ())
                .map_err(|e| LauncherError::LaunchFailure {
                    target: path.display().to_string(),
                    message: e.to_string(),
                }),
            LaunchTarget::Document { path, working_dir } => {
                let mut last_error = None;
                for mut command in open::commands(path) {
                    match command.current_dir(working_dir).spawn() {
                        Ok(_) => return Ok(()),
                        Err(err) => last_error = Some(err),
                    }
                }
                Err(LauncherError::LaunchFailure {
                    target: path.display().to_string(),
                    message: last_error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "no application is registered to open it".to_string()),
                })
            }
            LaunchTarget::Uri(uri) => {
                open::that_detached(uri).map_err(|e| LauncherError::LaunchFailure {
                    target: uri.clone(),
                    message: e.to_string(),
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstallerStatus {
    Running,
    Exited,
    Failed(String),
}

/// Starts the installer on the runtime and reports through the receiver once
/// it has exited. The exit code is not inspected.
pub fn run_installer(rt: &Runtime, installer: PathBuf) -> watch::Receiver<InstallerStatus> {
    let (tx, rx) = watch::channel(InstallerStatus::Running);
    rt.spawn(async move {
        let working_dir = installer
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let mut command = tokio::process::Command::new(&installer);
        command.stdin(Stdio::null());
        if !working_dir.as_os_str().is_empty() {
            command.current_dir(&working_dir);
        }
        let status = match command.spawn() {
            Ok(mut child) => {
                tracing::info!(installer = %installer.display(), "Waiting for installer to finish");
                match child.wait().await {
                    Ok(exit) => tracing::info!(?exit, "Installer finished"),
                    Err(err) => tracing::warn!("Lost track of installer: {err}"),
                }
                InstallerStatus::Exited
            }
            Err(source) => {
                let err = LauncherError::InstallerLaunchFailure {
                    path: installer.clone(),
                    source,
                };
                tracing::error!("{err}");
                InstallerStatus::Failed(err.to_string())
            }
        };
        let _ = tx.send(status);
    });
    rx
}

pub fn restart_command(exe: &Path, request: RestartRequest) -> Command {
    let mut command = Command::new(exe);
    if let Some(folder) = exe.parent() {
        command.current_dir(folder);
    }
    if request.mode == RestartMode::Handoff {
        command.arg(RESTART_FLAG);
    }
    command
}

pub fn restart_self(request: RestartRequest) -> LauncherResult<()> {
    let exe = std::env::current_exe().map_err(|e| LauncherError::LaunchFailure {
        target: "launcher".to_string(),
        message: e.to_string(),
    })?;
    tracing::info!(?request, exe = %exe.display(), "Restarting launcher");
    restart_command(&exe, request)
        .spawn()
        .map(|_| ())
        .map_err(|e| LauncherError::LaunchFailure {
            target: exe.display().to_string(),
            message: e.to_string(),
        })
}
