use std::{
    collections::VecDeque,
    path::PathBuf,
    time::{Duration, Instant},
};

use eframe::{egui, App, Frame};
use egui::{Align, Button, Layout, RichText, Rounding, Stroke, Vec2};
use tokio::{runtime::Runtime, sync::watch::Receiver};

use crate::{
    config::get_launcher_folder,
    config_store::ConfigStore,
    installation::{Effect, FlowEvent, InstallFlow, PresentationState, RecoveryChoice},
    launch::{self, AfterLaunch, InstallerStatus, ShellLauncher},
    launch_config::{ButtonDescriptor, Configuration, StyleKind},
    registry::UninstallRegistry,
    settings::LauncherSettings,
    single_instance::{InstanceGuard, LockFileMutex},
};

use super::{
    ui_colors::{
        BACKGROUND_COLOR, BG_STROKE_COLOR, EXTRA_BACKGROUND_COLOR, LIGHT_PRIMARY_COLOR,
        MUTED_TEXT_COLOR, PRIMARY_COLOR, TEXT_COLOR,
    },
    FilePicker, PickerOutcome, BUTTON_HEIGHT, BUTTON_WIDTH, EXECUTABLE_FILTER, INSTALLER_FILTER,
    SECTION_SPACING,
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

enum Modal {
    Notice(String),
    Recovery,
    Picker(FilePicker),
}

pub struct LauncherApp {
    flow: InstallFlow<ConfigStore, UninstallRegistry>,
    settings: LauncherSettings,
    rt: Runtime,
    launcher_folder: PathBuf,
    instance_guard: Option<InstanceGuard<LockFileMutex>>,
    pending: VecDeque<Effect>,
    modal: Option<Modal>,
    installer_status: Option<Receiver<InstallerStatus>>,
    close_at: Option<Instant>,
}

impl LauncherApp {
    pub fn new(
        presentation: PresentationState,
        config: Configuration,
        store: ConfigStore,
        settings: LauncherSettings,
        instance_guard: InstanceGuard<LockFileMutex>,
    ) -> eyre::Result<Self> {
        let runtime = Runtime::new()?;
        let mut flow = InstallFlow::new(config, store, UninstallRegistry);
        let pending = flow.start(presentation).into();
        Ok(Self {
            flow,
            settings,
            rt: runtime,
            launcher_folder: get_launcher_folder(),
            instance_guard: Some(instance_guard),
            pending,
            modal: None,
            installer_status: None,
            close_at: None,
        })
    }

    fn busy(&self) -> bool {
        !self.flow.is_idle()
            || !self.pending.is_empty()
            || self.modal.is_some()
            || self.installer_status.is_some()
            || self.close_at.is_some()
    }

    fn dispatch(&mut self, event: FlowEvent) {
        let effects = self.flow.handle(event);
        self.pending.extend(effects);
    }

    fn poll_installer(&mut self) {
        let status = match &self.installer_status {
            Some(rx) => rx.borrow().clone(),
            None => return,
        };
        match status {
            InstallerStatus::Running => {}
            InstallerStatus::Exited => {
                self.installer_status = None;
                self.dispatch(FlowEvent::InstallerExited);
            }
            InstallerStatus::Failed(message) => {
                self.installer_status = None;
                self.dispatch(FlowEvent::InstallerLaunchFailed(message));
            }
        }
    }

    /// Carries out queued effects until one of them needs the user.
    fn run_effects(&mut self, ctx: &egui::Context) {
        while self.modal.is_none() {
            let Some(effect) = self.pending.pop_front() else {
                break;
            };
            match effect {
                Effect::Notice(message) => self.modal = Some(Modal::Notice(message)),
                Effect::AskRecovery => self.modal = Some(Modal::Recovery),
                Effect::PickInstaller => {
                    self.modal = Some(Modal::Picker(FilePicker::new(
                        "Select the installer",
                        INSTALLER_FILTER,
                        &self.launcher_folder,
                    )))
                }
                Effect::PickExecutable => {
                    self.modal = Some(Modal::Picker(FilePicker::new(
                        "Select the game executable",
                        EXECUTABLE_FILTER,
                        &self.launcher_folder,
                    )))
                }
                Effect::RunInstaller(installer) => {
                    self.installer_status = Some(launch::run_installer(&self.rt, installer));
                }
                Effect::Restart(request) => {
                    // The new process must find the lock free
                    if let Some(guard) = self.instance_guard.take() {
                        guard.release();
                    }
                    if let Err(err) = launch::restart_self(request) {
                        tracing::error!("{err}");
                        self.modal = Some(Modal::Notice(err.to_string()));
                    }
                }
                Effect::Exit => {
                    self.pending.clear();
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            }
        }
    }

    fn activate(&mut self, button: &ButtonDescriptor) {
        if button.is_install_action() {
            self.dispatch(FlowEvent::InstallClicked);
            return;
        }
        match launch::activate(button, &self.launcher_folder, &ShellLauncher) {
            Ok(AfterLaunch::CloseLauncher) => {
                self.close_at = Some(Instant::now() + self.settings.primary_close_delay());
            }
            Ok(AfterLaunch::KeepOpen) => {}
            Err(err) => {
                tracing::error!("{err}");
                self.modal = Some(Modal::Notice(err.to_string()));
            }
        }
    }

    fn render_buttons(&mut self, ui: &mut egui::Ui) {
        let enabled = !self.busy();
        let buttons = self.flow.config().buttons.clone();
        let mut clicked = None;
        for button in buttons {
            let primary = button.style_kind == StyleKind::Primary;
            let text = if primary {
                RichText::new(&button.text).strong().color(BACKGROUND_COLOR)
            } else {
                RichText::new(&button.text)
            };
            let mut widget = Button::new(text).min_size(Vec2::new(BUTTON_WIDTH, BUTTON_HEIGHT));
            if primary {
                widget = widget.fill(PRIMARY_COLOR);
            }
            if ui.add_enabled(enabled, widget).clicked() {
                clicked = Some(button);
            }
        }
        if let Some(button) = clicked {
            self.activate(&button);
        }
    }

    fn render_modal(&mut self, ctx: &egui::Context) {
        let Some(modal) = self.modal.as_mut() else {
            return;
        };
        match modal {
            Modal::Notice(message) => {
                let mut dismissed = false;
                egui::Window::new("Notice")
                    .collapsible(false)
                    .resizable(false)
                    .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                    .show(ctx, |ui| {
                        ui.label(message.as_str());
                        ui.add_space(10.0);
                        if ui.button("OK").clicked() {
                            dismissed = true;
                        }
                    });
                if dismissed {
                    self.modal = None;
                }
            }
            Modal::Recovery => {
                let mut choice = None;
                egui::Window::new("Game not found")
                    .collapsible(false)
                    .resizable(false)
                    .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                    .show(ctx, |ui| {
                        ui.label("The game could not be found where it was installed.");
                        ui.label("Reset the launcher to install it again, or locate the game executable.");
                        ui.add_space(10.0);
                        ui.horizontal(|ui| {
                            if ui.button("Reset").clicked() {
                                choice = Some(RecoveryChoice::Reset);
                            }
                            if ui.button("Locate").clicked() {
                                choice = Some(RecoveryChoice::Relocate);
                            }
                        });
                    });
                if let Some(choice) = choice {
                    self.modal = None;
                    self.dispatch(FlowEvent::RecoveryChosen(choice));
                }
            }
            Modal::Picker(picker) => match picker.show(ctx) {
                PickerOutcome::Open => {}
                PickerOutcome::Picked(path) => {
                    self.modal = None;
                    self.dispatch(FlowEvent::FilePicked(path));
                }
                PickerOutcome::Cancelled => {
                    self.modal = None;
                    self.dispatch(FlowEvent::FilePickCancelled);
                }
            },
        }
    }
}

impl App for LauncherApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.poll_installer();
        self.run_effects(ctx);

        if let Some(close_at) = self.close_at {
            if Instant::now() >= close_at {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                let config = self.flow.config();
                if let Some(title) = &config.title {
                    ui.heading(RichText::new(title).size(28.0).color(LIGHT_PRIMARY_COLOR));
                }
                if let Some(subtitle) = &config.subtitle {
                    ui.label(RichText::new(subtitle).color(MUTED_TEXT_COLOR));
                }
                ui.add_space(SECTION_SPACING);

                if self.flow.shows_buttons() {
                    self.render_buttons(ui);
                }

                if self.installer_status.is_some() {
                    ui.add_space(SECTION_SPACING);
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Waiting for the installer to finish");
                    });
                }
            });
            ui.with_layout(Layout::bottom_up(Align::Max), |ui| {
                let version = format!("v{}", self.flow.config().version);
                ui.label(RichText::new(version).small().color(MUTED_TEXT_COLOR));
            });
        });

        self.render_modal(ctx);

        if self.installer_status.is_some() || self.close_at.is_some() {
            ctx.request_repaint_after(POLL_INTERVAL);
        }
    }
}

fn create_style(style: &mut egui::Style) {
    style.spacing.item_spacing = egui::vec2(10.0, 10.0);
    style.visuals.dark_mode = true;
    style.visuals.panel_fill = BACKGROUND_COLOR;
    style.visuals.window_fill = EXTRA_BACKGROUND_COLOR;
    style.visuals.override_text_color = Some(TEXT_COLOR);
    style.visuals.extreme_bg_color = EXTRA_BACKGROUND_COLOR;
    style.visuals.widgets.inactive.weak_bg_fill = EXTRA_BACKGROUND_COLOR;
    style.visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, BG_STROKE_COLOR);
    style.visuals.widgets.inactive.rounding = Rounding::same(4.0);
    style.visuals.widgets.hovered.bg_stroke = Stroke::new(2.0, LIGHT_PRIMARY_COLOR);
    style.visuals.widgets.hovered.rounding = Rounding::same(4.0);
    style.visuals.widgets.active.bg_stroke = Stroke::new(2.0, PRIMARY_COLOR);
    style.visuals.widgets.active.rounding = Rounding::same(4.0);
    style.visuals.selection.bg_fill = PRIMARY_COLOR;
}

fn setup(ctx: &egui::Context) {
    let mut style: egui::Style = (*ctx.style()).clone();
    create_style(&mut style);
    ctx.set_style(style);
}

fn native_options(title: &str) -> eframe::NativeOptions {
    let viewport = egui::ViewportBuilder::default()
        .with_title(title)
        .with_inner_size([420.0, 420.0])
        .with_resizable(false);
    eframe::NativeOptions {
        viewport,
        ..Default::default()
    }
}

pub fn run_ui(
    presentation: PresentationState,
    config: Configuration,
    store: ConfigStore,
    settings: LauncherSettings,
    instance_guard: InstanceGuard<LockFileMutex>,
) -> eyre::Result<()> {
    let title = config
        .title
        .clone()
        .unwrap_or_else(|| "Launcher".to_string());
    let app = LauncherApp::new(presentation, config, store, settings, instance_guard)?;
    let run_result = eframe::run_native(
        &title,
        native_options(&title),
        Box::new(|cc| {
            setup(&cc.egui_ctx);
            Box::new(app)
        }),
    );
    run_result.map_err(|e| eyre::eyre!("Could not initialize: {:?}", e))
}

struct FatalErrorApp {
    message: String,
}

impl App for FatalErrorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("The launcher cannot start");
            ui.add_space(10.0);
            ui.label(self.message.as_str());
            ui.add_space(SECTION_SPACING);
            if ui.button("Close").clicked() {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        });
    }
}

/// Shows a bootstrap error, returns once the user closed the window.
pub fn run_fatal_error(message: &str) -> eyre::Result<()> {
    let app = FatalErrorApp {
        message: message.to_string(),
    };
    let run_result = eframe::run_native(
        "Launcher",
        native_options("Launcher"),
        Box::new(|cc| {
            setup(&cc.egui_ctx);
            Box::new(app)
        }),
    );
    run_result.map_err(|e| eyre::eyre!("Could not initialize: {:?}", e))
}
