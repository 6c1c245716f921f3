use std::path::{Path, PathBuf};

const APP_FOLDER: &str = "GameDiskLauncher";
const SOURCE_CONFIG_FILE: &str = "Config.json";

#[cfg(target_family = "unix")]
pub fn get_config_folder() -> PathBuf {
    let config_home = std::env::var("XDG_CONFIG_HOME");
    let home = std::env::var("HOME");
    match (config_home, home) {
        (Ok(p), _) if !p.is_empty() => Path::new(&p).join(APP_FOLDER),
        (_, Ok(home)) => Path::new(&home).join(".config").join(APP_FOLDER),
        _ => Path::new("").to_path_buf(),
    }
}

#[cfg(windows)]
pub fn get_config_folder() -> PathBuf {
    let config_home = std::env::var("APPDATA");
    match config_home {
        Ok(p) => Path::new(&p).join(APP_FOLDER),
        Err(_) => Path::new("").to_path_buf(),
    }
}

/// Folder containing the running launcher executable.
///
/// Relative button paths and the source configuration are resolved against
/// this, never against the working directory.
pub fn get_launcher_folder() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_default()
}

pub fn get_source_config_file() -> PathBuf {
    get_launcher_folder().join(SOURCE_CONFIG_FILE)
}

pub fn get_settings_file() -> PathBuf {
    get_launcher_folder().join("launcher.toml")
}

pub fn override_file_name(game_id: &str) -> String {
    format!("Config_{game_id}.json")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    #[cfg(target_family = "unix")]
    fn check_return_xdg_config_path() {
        std::env::set_var(
            "XDG_CONFIG_HOME",
            std::env::var("HOME").unwrap_or_default() + "/.config",
        );

        let xdg_config_home =
            std::env::var("XDG_CONFIG_HOME").unwrap_or_default() + "/GameDiskLauncher";
        let config_path = get_config_folder();

        assert_eq!(config_path, PathBuf::from(xdg_config_home));
    }

    #[test]
    fn override_file_is_namespaced_by_game_id() {
        assert_eq!("Config_space-quest.json", override_file_name("space-quest"));
    }

    #[test]
    fn source_config_sits_beside_the_executable() {
        let source = get_source_config_file();
        assert_eq!(Some(get_launcher_folder().as_path()), source.parent());
        assert_eq!(
            Some(std::ffi::OsStr::new("Config.json")),
            source.file_name()
        );
    }
}
