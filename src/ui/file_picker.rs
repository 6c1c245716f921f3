use std::path::{Path, PathBuf};

use egui::{Align2, ScrollArea};

use super::ui_colors::{ERROR_COLOR, MUTED_TEXT_COLOR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileFilter {
    pub label: &'static str,
    /// Files the OS considers executable always pass.
    pub executables: bool,
    pub extensions: &'static [&'static str],
}

pub const INSTALLER_FILTER: FileFilter = FileFilter {
    label: "Installers",
    executables: true,
    extensions: &["exe", "msi"],
};

pub const EXECUTABLE_FILTER: FileFilter = FileFilter {
    label: "Programs",
    executables: true,
    extensions: &["exe"],
};

impl FileFilter {
    pub fn matches(&self, path: &Path) -> bool {
        let extension_matches = path
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy().to_lowercase();
                self.extensions.iter().any(|allowed| *allowed == ext)
            })
            .unwrap_or(false);
        extension_matches || (self.executables && is_executable::is_executable(path))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerEntry {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
}

/// Folders first, then the files passing the filter, each sorted by name.
pub fn list_entries(dir: &Path, filter: &FileFilter) -> std::io::Result<Vec<PickerEntry>> {
    let mut folders = vec![];
    let mut files = vec![];
    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if path.is_dir() {
            folders.push(PickerEntry {
                path,
                name,
                is_dir: true,
            });
        } else if filter.matches(&path) {
            files.push(PickerEntry {
                path,
                name,
                is_dir: false,
            });
        }
    }
    folders.sort_by_key(|e| e.name.to_lowercase());
    files.sort_by_key(|e| e.name.to_lowercase());
    folders.extend(files);
    Ok(folders)
}

#[derive(Debug, Clone, PartialEq)]
pub enum PickerOutcome {
    Open,
    Picked(PathBuf),
    Cancelled,
}

/// Modal file browser returning an absolute path or "cancelled".
pub struct FilePicker {
    title: String,
    filter: FileFilter,
    current_dir: PathBuf,
    entries: Vec<PickerEntry>,
    path_text: String,
    error: Option<String>,
}

impl FilePicker {
    pub fn new(title: &str, filter: FileFilter, start_dir: &Path) -> Self {
        let mut picker = Self {
            title: title.to_string(),
            filter,
            current_dir: start_dir.to_path_buf(),
            entries: vec![],
            path_text: String::new(),
            error: None,
        };
        picker.navigate(start_dir.to_path_buf());
        picker
    }

    fn navigate(&mut self, dir: PathBuf) {
        match list_entries(&dir, &self.filter) {
            Ok(entries) => {
                self.entries = entries;
                self.current_dir = dir;
                self.error = None;
            }
            Err(err) => {
                self.error = Some(format!("Could not open {}: {err}", dir.display()));
            }
        }
    }

    /// Resolves what is typed in the path field against the shown folder.
    fn typed_path(&self) -> PathBuf {
        let typed = PathBuf::from(self.path_text.trim());
        if typed.is_absolute() {
            typed
        } else {
            self.current_dir.join(typed)
        }
    }

    fn confirm(&mut self) -> PickerOutcome {
        let path = self.typed_path();
        if path.is_dir() {
            self.path_text.clear();
            self.navigate(path);
            PickerOutcome::Open
        } else if path.is_file() {
            PickerOutcome::Picked(path)
        } else {
            self.error = Some(format!("Could not find {}", path.display()));
            PickerOutcome::Open
        }
    }

    pub fn show(&mut self, ctx: &egui::Context) -> PickerOutcome {
        let mut outcome = PickerOutcome::Open;
        let mut navigate_to = None;
        let mut confirm = false;

        egui::Window::new(self.title.as_str())
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .default_width(480.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let parent = self.current_dir.parent().map(Path::to_path_buf);
                    if ui
                        .add_enabled(parent.is_some(), egui::Button::new("Up"))
                        .clicked()
                    {
                        navigate_to = parent;
                    }
                    ui.label(self.current_dir.to_string_lossy().to_string());
                });

                ScrollArea::vertical()
                    .max_height(240.0)
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        if self.entries.is_empty() {
                            ui.colored_label(MUTED_TEXT_COLOR, "Nothing to show in this folder");
                        }
                        for entry in &self.entries {
                            let label = if entry.is_dir {
                                format!("[{}]", entry.name)
                            } else {
                                entry.name.clone()
                            };
                            let selected = !entry.is_dir && self.path_text == entry.path.to_string_lossy();
                            let response = ui.selectable_label(selected, label);
                            if entry.is_dir && response.clicked() {
                                navigate_to = Some(entry.path.clone());
                            } else if response.double_clicked() {
                                self.path_text = entry.path.to_string_lossy().to_string();
                                confirm = true;
                            } else if response.clicked() {
                                self.path_text = entry.path.to_string_lossy().to_string();
                            }
                        }
                    });

                ui.horizontal(|ui| {
                    ui.label("File:");
                    let field = ui.text_edit_singleline(&mut self.path_text);
                    if field.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        confirm = true;
                    }
                });
                ui.colored_label(MUTED_TEXT_COLOR, self.filter.label);

                if let Some(error) = &self.error {
                    ui.colored_label(ERROR_COLOR, error);
                }

                ui.horizontal(|ui| {
                    if ui
                        .add_enabled(!self.path_text.trim().is_empty(), egui::Button::new("Open"))
                        .clicked()
                    {
                        confirm = true;
                    }
                    if ui.button("Cancel").clicked() {
                        outcome = PickerOutcome::Cancelled;
                    }
                });
            });

        if let Some(dir) = navigate_to {
            self.path_text.clear();
            self.navigate(dir);
        }
        if confirm && outcome == PickerOutcome::Open {
            outcome = self.confirm();
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn filter_accepts_listed_extensions_case_insensitively() {
        assert!(INSTALLER_FILTER.matches(Path::new("/D/Setup.MSI")));
        assert!(EXECUTABLE_FILTER.matches(Path::new("/D/Game.EXE")));
        assert!(!EXECUTABLE_FILTER.matches(Path::new("/D/readme.txt")));
    }

    #[test]
    fn listing_puts_folders_first_and_hides_other_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("zeta")).unwrap();
        fs::create_dir(dir.path().join("Alpha")).unwrap();
        fs::write(dir.path().join("setup.exe"), b"MZ").unwrap();
        fs::write(dir.path().join("Autorun.exe"), b"MZ").unwrap();
        fs::write(dir.path().join("readme.txt"), b"hi").unwrap();

        let names: Vec<String> = list_entries(dir.path(), &EXECUTABLE_FILTER)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();

        assert_eq!(vec!["Alpha", "zeta", "Autorun.exe", "setup.exe"], names);
    }

    #[test]
    fn typed_relative_path_resolves_against_shown_folder() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("Game")).unwrap();
        fs::write(dir.path().join("Game").join("game.exe"), b"MZ").unwrap();
        let mut picker = FilePicker::new("Select", EXECUTABLE_FILTER, dir.path());

        picker.path_text = "Game".to_string();
        assert_eq!(PickerOutcome::Open, picker.confirm());
        assert_eq!(dir.path().join("Game"), picker.current_dir);

        picker.path_text = "game.exe".to_string();
        assert_eq!(
            PickerOutcome::Picked(dir.path().join("Game").join("game.exe")),
            picker.confirm()
        );
    }

    #[test]
    fn missing_path_keeps_picker_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut picker = FilePicker::new("Select", EXECUTABLE_FILTER, dir.path());
        picker.path_text = "nope.exe".to_string();

        assert_eq!(PickerOutcome::Open, picker.confirm());
        assert!(picker.error.is_some());
    }
}
