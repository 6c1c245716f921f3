//! Startup classification and the install / locate / recover workflow.
//!
//! The workflow is a state machine fed with [`FlowEvent`]s by the window and
//! answering with [`Effect`]s for the window to carry out, in order. Writing
//! and removing the user configuration happens here, through [`OverrideStore`];
//! everything that needs the user or another process is returned as an effect.

use std::path::{Path, PathBuf};

use crate::config_store::OverrideStore;
use crate::launch::resolve_local_path;
use crate::launch_config::Configuration;
use crate::registry::InstalledSoftware;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationState {
    FirstRun,
    Ready,
    Broken,
}

/// Derives the presentation state and filters the buttons accordingly.
/// A broken configuration is returned untouched.
pub fn classify(
    mut config: Configuration,
    launcher_folder: &Path,
) -> (PresentationState, Configuration) {
    let primary_path = config
        .primary_launch()
        .map(|button| button.path.trim().to_string())
        .filter(|path| !path.is_empty());

    match primary_path {
        Some(path) if resolve_local_path(launcher_folder, &path).exists() => {
            config.remove_install_action();
            (PresentationState::Ready, config)
        }
        Some(path) => {
            tracing::warn!(path = %path, "Configured game executable is missing");
            (PresentationState::Broken, config)
        }
        None => {
            config.remove_primary_launch();
            (PresentationState::FirstRun, config)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartMode {
    /// Plain start, re-evaluating everything from the shipped configuration.
    Fresh,
    /// Start that takes over the instance lock from this process.
    Handoff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartRequest {
    pub mode: RestartMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryChoice {
    Reset,
    Relocate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateOrigin {
    Recovery,
    InstallClick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    AwaitingRecoveryChoice,
    PickingInstaller,
    RunningInstaller,
    PickingExecutable(LocateOrigin),
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    InstallClicked,
    RecoveryChosen(RecoveryChoice),
    FilePicked(PathBuf),
    FilePickCancelled,
    InstallerExited,
    InstallerLaunchFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Blocking message, later effects wait until it is dismissed.
    Notice(String),
    AskRecovery,
    PickInstaller,
    PickExecutable,
    RunInstaller(PathBuf),
    Restart(RestartRequest),
    Exit,
}

pub struct InstallFlow<S: OverrideStore, R: InstalledSoftware> {
    state: FlowState,
    config: Configuration,
    store: S,
    software: R,
}

impl<S: OverrideStore, R: InstalledSoftware> InstallFlow<S, R> {
    pub fn new(config: Configuration, store: S, software: R) -> Self {
        Self {
            state: FlowState::Idle,
            config,
            store,
            software,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn is_idle(&self) -> bool {
        self.state == FlowState::Idle
    }

    /// Buttons stay hidden while a broken install is being dealt with.
    pub fn shows_buttons(&self) -> bool {
        !matches!(
            self.state,
            FlowState::AwaitingRecoveryChoice
                | FlowState::PickingExecutable(LocateOrigin::Recovery)
                | FlowState::Finished
        )
    }

    pub fn start(&mut self, presentation: PresentationState) -> Vec<Effect> {
        match presentation {
            PresentationState::Broken => {
                self.state = FlowState::AwaitingRecoveryChoice;
                vec![Effect::AskRecovery]
            }
            PresentationState::FirstRun | PresentationState::Ready => {
                self.state = FlowState::Idle;
                vec![]
            }
        }
    }

    pub fn handle(&mut self, event: FlowEvent) -> Vec<Effect> {
        tracing::debug!(state = ?self.state, ?event, "Install flow event");
        match (self.state, event) {
            (FlowState::Idle, FlowEvent::InstallClicked) => self.begin_install(),

            (FlowState::AwaitingRecoveryChoice, FlowEvent::RecoveryChosen(RecoveryChoice::Reset)) => {
                self.state = FlowState::Finished;
                match self.store.delete_override() {
                    Ok(()) => vec![
                        Effect::Restart(RestartRequest {
                            mode: RestartMode::Fresh,
                        }),
                        Effect::Exit,
                    ],
                    Err(err) => {
                        tracing::error!("{err}");
                        vec![Effect::Notice(err.to_string()), Effect::Exit]
                    }
                }
            }
            (FlowState::AwaitingRecoveryChoice, FlowEvent::RecoveryChosen(RecoveryChoice::Relocate)) => {
                self.state = FlowState::PickingExecutable(LocateOrigin::Recovery);
                vec![Effect::PickExecutable]
            }

            (FlowState::PickingInstaller, FlowEvent::FilePicked(installer)) => {
                self.state = FlowState::RunningInstaller;
                vec![Effect::RunInstaller(installer)]
            }
            (FlowState::PickingInstaller, FlowEvent::FilePickCancelled) => {
                self.state = FlowState::Idle;
                vec![]
            }

            (FlowState::RunningInstaller, FlowEvent::InstallerExited) => {
                self.state = FlowState::PickingExecutable(LocateOrigin::InstallClick);
                vec![Effect::PickExecutable]
            }
            (FlowState::RunningInstaller, FlowEvent::InstallerLaunchFailed(message)) => {
                self.state = FlowState::Idle;
                vec![Effect::Notice(message)]
            }

            (FlowState::PickingExecutable(origin), FlowEvent::FilePicked(executable)) => {
                self.locate_executable(origin, &executable)
            }
            (FlowState::PickingExecutable(_), FlowEvent::FilePickCancelled) => {
                self.state = FlowState::Finished;
                vec![Effect::Exit]
            }

            (state, event) => {
                tracing::warn!(?state, ?event, "Ignoring unexpected install flow event");
                vec![]
            }
        }
    }

    fn begin_install(&mut self) -> Vec<Effect> {
        let fragment = self
            .config
            .install_action()
            .and_then(|button| button.registry_display_name_fragment.clone())
            .filter(|fragment| !fragment.trim().is_empty());

        if let Some(fragment) = fragment {
            if self.software.is_installed(&fragment) {
                tracing::info!(fragment = %fragment, "Game is already installed, skipping installer");
                self.state = FlowState::PickingExecutable(LocateOrigin::InstallClick);
                return vec![
                    Effect::Notice(format!(
                        "{fragment} is already installed on this computer. Please select the game executable."
                    )),
                    Effect::PickExecutable,
                ];
            }
        }

        self.state = FlowState::PickingInstaller;
        vec![Effect::PickInstaller]
    }

    fn locate_executable(&mut self, origin: LocateOrigin, executable: &Path) -> Vec<Effect> {
        let previous = self.config.clone();
        self.config
            .set_primary_launch_path(&executable.to_string_lossy());
        self.config.remove_install_action();

        match self.store.persist(&self.config) {
            Ok(()) => {
                tracing::info!(executable = %executable.display(), "Game executable located");
                self.state = FlowState::Finished;
                vec![
                    Effect::Restart(RestartRequest {
                        mode: RestartMode::Handoff,
                    }),
                    Effect::Exit,
                ]
            }
            Err(err) => {
                tracing::error!("{err}");
                // Memory has to keep matching what is on disk
                self.config = previous;
                match origin {
                    LocateOrigin::InstallClick => {
                        self.state = FlowState::Idle;
                        vec![Effect::Notice(err.to_string())]
                    }
                    LocateOrigin::Recovery => {
                        self.state = FlowState::Finished;
                        vec![Effect::Notice(err.to_string()), Effect::Exit]
                    }
                }
            }
        }
    }
}
