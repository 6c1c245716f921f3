/// Source of installed-software display names.
pub trait InstalledSoftware {
    fn display_names(&self) -> Vec<String>;

    fn is_installed(&self, fragment: &str) -> bool {
        let names = self.display_names();
        let found = names
            .iter()
            .any(|name| display_name_matches(fragment, name));
        tracing::debug!(fragment, records = names.len(), found, "Searched installed software");
        found
    }
}

/// Case-insensitive substring match with all whitespace removed from both sides.
pub fn display_name_matches(fragment: &str, display_name: &str) -> bool {
    let fragment = normalize(fragment);
    if fragment.is_empty() {
        return false;
    }
    normalize(display_name).contains(&fragment)
}

fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// The uninstall entries Windows keeps for every installed program.
#[derive(Clone, Copy, Default)]
pub struct UninstallRegistry;

#[cfg(target_os = "windows")]
impl InstalledSoftware for UninstallRegistry {
    fn display_names(&self) -> Vec<String> {
        use winreg::enums::*;
        use winreg::RegKey;

        const UNINSTALL_KEYS: [&str; 2] = [
            "SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Uninstall",
            "SOFTWARE\\WOW6432Node\\Microsoft\\Windows\\CurrentVersion\\Uninstall",
        ];

        let mut names = vec![];
        for hive in [HKEY_LOCAL_MACHINE, HKEY_CURRENT_USER] {
            let root = RegKey::predef(hive);
            for key_path in UNINSTALL_KEYS {
                let Ok(uninstall) = root.open_subkey(key_path) else {
                    continue;
                };
                for key in uninstall.enum_keys().filter_map(|k| k.ok()) {
                    if let Ok(entry) = uninstall.open_subkey(&key) {
                        let name: Result<String, _> = entry.get_value("DisplayName");
                        if let Ok(name) = name {
                            names.push(name);
                        }
                    }
                }
            }
        }
        names
    }
}

#[cfg(not(target_os = "windows"))]
impl InstalledSoftware for UninstallRegistry {
    fn display_names(&self) -> Vec<String> {
        vec![]
    }
}
