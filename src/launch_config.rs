use serde::{Deserialize, Serialize};

pub const PRIMARY_LAUNCH_ID: &str = "StartGame";
pub const INSTALL_ACTION_ID: &str = "InstallGame";
pub const DEFAULT_PRIMARY_TEXT: &str = "Start Game";

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Configuration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, rename = "SubTitle", skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip, default = "runtime_version")]
    pub version: String,
    #[serde(default)]
    pub buttons: Vec<ButtonDescriptor>,
}

fn runtime_version() -> String {
    VERSION.to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ButtonDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "Type", default)]
    pub action_kind: ActionKind,
    #[serde(default)]
    pub path: String,
    #[serde(rename = "StyleType", default)]
    pub style_kind: StyleKind,
    #[serde(
        rename = "RegistryDisplayName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub registry_display_name_fragment: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionKind {
    #[default]
    #[serde(rename = "File")]
    LocalFile,
    Website,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum StyleKind {
    Primary,
    #[default]
    Default,
}

impl ButtonDescriptor {
    pub fn new_primary_launch(path: &str) -> Self {
        Self {
            id: Some(PRIMARY_LAUNCH_ID.to_string()),
            text: DEFAULT_PRIMARY_TEXT.to_string(),
            action_kind: ActionKind::LocalFile,
            path: path.to_string(),
            style_kind: StyleKind::Primary,
            registry_display_name_fragment: None,
        }
    }

    pub fn is_primary_launch(&self) -> bool {
        self.id.as_deref() == Some(PRIMARY_LAUNCH_ID)
    }

    pub fn is_install_action(&self) -> bool {
        self.id.as_deref() == Some(INSTALL_ACTION_ID)
    }
}

impl Configuration {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// The non-empty game id, if any.
    pub fn game_id(&self) -> Option<&str> {
        self.game_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn primary_launch(&self) -> Option<&ButtonDescriptor> {
        self.buttons.iter().find(|b| b.is_primary_launch())
    }

    pub fn install_action(&self) -> Option<&ButtonDescriptor> {
        self.buttons.iter().find(|b| b.is_install_action())
    }

    pub fn remove_primary_launch(&mut self) {
        self.buttons.retain(|b| !b.is_primary_launch());
    }

    pub fn remove_install_action(&mut self) {
        self.buttons.retain(|b| !b.is_install_action());
    }

    /// Points the primary launch button at `path`, creating it at the front
    /// of the list when the configuration has none.
    pub fn set_primary_launch_path(&mut self, path: &str) {
        match self.buttons.iter_mut().find(|b| b.is_primary_launch()) {
            Some(button) => button.path = path.to_string(),
            None => self
                .buttons
                .insert(0, ButtonDescriptor::new_primary_launch(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_parse_source_config() {
        let json = include_str!("testdata/source_config.json");
        let config = Configuration::from_json(json).unwrap();

        assert_eq!(Some("space-quest"), config.game_id());
        assert_eq!(Some("Space Quest"), config.title.as_deref());
        assert_eq!(Some("Collector's Edition"), config.subtitle.as_deref());
        assert_eq!(4, config.buttons.len());
        assert_eq!(VERSION, config.version);

        let install = config.install_action().unwrap();
        assert_eq!(
            Some("Space Quest"),
            install.registry_display_name_fragment.as_deref()
        );
        assert_eq!(StyleKind::Primary, install.style_kind);

        let website = &config.buttons[3];
        assert_eq!(ActionKind::Website, website.action_kind);
        assert_eq!(StyleKind::Default, website.style_kind);
    }

    #[test]
    fn serialization_skips_empty_fields_and_version() {
        let config = Configuration {
            game_id: Some("g".to_string()),
            title: None,
            subtitle: None,
            version: "9.9.9".to_string(),
            buttons: vec![ButtonDescriptor::new_primary_launch("/X/game.exe")],
        };
        let json = config.to_json().unwrap();

        assert!(json.contains("\"GameId\": \"g\""));
        assert!(json.contains("\"Type\": \"File\""));
        assert!(json.contains("\"StyleType\": \"Primary\""));
        assert!(!json.contains("Title"));
        assert!(!json.contains("RegistryDisplayName"));
        assert!(!json.contains("9.9.9"));
    }

    #[test]
    fn blank_game_id_counts_as_missing() {
        let config = Configuration::from_json(r#"{ "GameId": "  ", "Buttons": [] }"#).unwrap();
        assert_eq!(None, config.game_id());
    }

    #[test]
    fn primary_launch_is_inserted_at_front_once() {
        let json = include_str!("testdata/source_config.json");
        let mut config = Configuration::from_json(json).unwrap();
        config.remove_primary_launch();
        assert!(config.primary_launch().is_none());

        config.set_primary_launch_path("/X/game.exe");
        config.set_primary_launch_path("/Y/game.exe");

        let primaries: Vec<_> = config
            .buttons
            .iter()
            .filter(|b| b.is_primary_launch())
            .collect();
        assert_eq!(1, primaries.len());
        assert!(config.buttons[0].is_primary_launch());
        assert_eq!("/Y/game.exe", config.buttons[0].path);
        assert_eq!(DEFAULT_PRIMARY_TEXT, config.buttons[0].text);
    }
}
