use std::fmt;
use std::path::Path;

use rand::Rng;
use serde::Serialize;
use serde_json::Value;

use crate::color::{random_color, HexColor};
use crate::project::error::{ProjectColorsError, Result};
use crate::services::store::{ConfigStore, ConfigTarget, FileStore, ProjectLocation};

/// Settings section every per-project key lives under.
pub const SECTION: &str = "projectColors";

/// Seed used when no main color is stored and random colors are off.
pub const DEFAULT_MAIN_COLOR: &str = "#681dd7";

/// Persisted per-project keys (`projectColors.<key>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    Name,
    MainColor,
    IsActivityBarColored,
    IsTitleBarColored,
    IsStatusBarColored,
    IsProjectNameColored,
    IsActiveItemsColored,
    SetWindowTitle,
}

impl SettingKey {
    pub const ALL: [SettingKey; 8] = [
        Self::Name,
        Self::MainColor,
        Self::IsActivityBarColored,
        Self::IsTitleBarColored,
        Self::IsStatusBarColored,
        Self::IsProjectNameColored,
        Self::IsActiveItemsColored,
        Self::SetWindowTitle,
    ];

    /// Older key still honored on read for `IsProjectNameColored`.
    pub const LEGACY_NAME_COLORED: &'static str = "isWindowNameColored";

    pub fn key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::MainColor => "mainColor",
            Self::IsActivityBarColored => "isActivityBarColored",
            Self::IsTitleBarColored => "isTitleBarColored",
            Self::IsStatusBarColored => "isStatusBarColored",
            Self::IsProjectNameColored => "isProjectNameColored",
            Self::IsActiveItemsColored => "isActiveItemsColored",
            Self::SetWindowTitle => "setWindowTitle",
        }
    }

    /// Accepts `mainColor`, `projectColors.mainColor` and the legacy alias.
    pub fn parse(s: &str) -> Option<Self> {
        let bare = s.strip_prefix("projectColors.").unwrap_or(s);
        if bare == Self::LEGACY_NAME_COLORED {
            return Some(Self::IsProjectNameColored);
        }
        Self::ALL.into_iter().find(|k| k.key() == bare)
    }

    /// Default for the boolean toggles; `None` for the non-boolean keys.
    pub fn default_toggle(self) -> Option<bool> {
        match self {
            Self::IsActivityBarColored => Some(false),
            Self::IsTitleBarColored => Some(false),
            Self::IsStatusBarColored => Some(true),
            Self::IsProjectNameColored => Some(true),
            Self::IsActiveItemsColored => Some(true),
            Self::SetWindowTitle => Some(true),
            Self::Name | Self::MainColor => None,
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", SECTION, self.key())
    }
}

/// Normalized settings of one project.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettings {
    pub name: String,
    pub main_color: HexColor,
    pub is_activity_bar_colored: bool,
    pub is_title_bar_colored: bool,
    pub is_status_bar_colored: bool,
    pub is_project_name_colored: bool,
    pub is_active_items_colored: bool,
    pub set_window_title: bool,
}

impl ProjectSettings {
    /// All defaults, with the given display name and main color.
    pub fn defaults(name: impl Into<String>, main_color: HexColor) -> Self {
        let toggle = |key: SettingKey| key.default_toggle().unwrap_or(false);
        Self {
            name: name.into(),
            main_color,
            is_activity_bar_colored: toggle(SettingKey::IsActivityBarColored),
            is_title_bar_colored: toggle(SettingKey::IsTitleBarColored),
            is_status_bar_colored: toggle(SettingKey::IsStatusBarColored),
            is_project_name_colored: toggle(SettingKey::IsProjectNameColored),
            is_active_items_colored: toggle(SettingKey::IsActiveItemsColored),
            set_window_title: toggle(SettingKey::SetWindowTitle),
        }
    }

    fn toggle_mut(&mut self, key: SettingKey) -> Option<&mut bool> {
        match key {
            SettingKey::IsActivityBarColored => Some(&mut self.is_activity_bar_colored),
            SettingKey::IsTitleBarColored => Some(&mut self.is_title_bar_colored),
            SettingKey::IsStatusBarColored => Some(&mut self.is_status_bar_colored),
            SettingKey::IsProjectNameColored => Some(&mut self.is_project_name_colored),
            SettingKey::IsActiveItemsColored => Some(&mut self.is_active_items_colored),
            SettingKey::SetWindowTitle => Some(&mut self.set_window_title),
            SettingKey::Name | SettingKey::MainColor => None,
        }
    }

    pub fn value_of(&self, key: SettingKey) -> Value {
        match key {
            SettingKey::Name => Value::String(self.name.clone()),
            SettingKey::MainColor => Value::String(self.main_color.to_string()),
            SettingKey::IsActivityBarColored => Value::Bool(self.is_activity_bar_colored),
            SettingKey::IsTitleBarColored => Value::Bool(self.is_title_bar_colored),
            SettingKey::IsStatusBarColored => Value::Bool(self.is_status_bar_colored),
            SettingKey::IsProjectNameColored => Value::Bool(self.is_project_name_colored),
            SettingKey::IsActiveItemsColored => Value::Bool(self.is_active_items_colored),
            SettingKey::SetWindowTitle => Value::Bool(self.set_window_title),
        }
    }

    /// Applies one user edit given as text and returns the value to persist.
    /// `None` means the stored key should be removed: an empty name goes
    /// back to the name derived from the project path.
    pub fn set(&mut self, key: SettingKey, raw: &str) -> Result<Option<Value>> {
        match key {
            SettingKey::Name => {
                let name = raw.trim();
                if name.is_empty() {
                    return Ok(None);
                }
                self.name = name.to_string();
            }
            SettingKey::MainColor => self.main_color = HexColor::parse(raw)?,
            toggle => {
                let value = parse_bool(raw)?;
                if let Some(slot) = self.toggle_mut(toggle) {
                    *slot = value;
                }
            }
        }
        Ok(Some(self.value_of(key)))
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(ProjectColorsError::InvalidBool(raw.to_string())),
    }
}

/// What to use when no valid main color is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MainColorDefault {
    Seed(HexColor),
    /// A fresh random color. The caller is expected to persist it.
    Random,
}

impl Default for MainColorDefault {
    fn default() -> Self {
        Self::Seed(HexColor::parse(DEFAULT_MAIN_COLOR).unwrap_or_else(|_| HexColor::black()))
    }
}

/// Resolver output: the settings plus any values that were generated
/// rather than read, which the caller should write back.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub settings: ProjectSettings,
    pub generated: Vec<(SettingKey, Value)>,
}

/// Reads a project's settings from disk with the fixed seed color.
/// Never fails: unreadable settings resolve to defaults.
pub fn resolve(path: &Path) -> ProjectSettings {
    resolve_with(path, &MainColorDefault::default(), &mut rand::thread_rng()).settings
}

pub fn resolve_with<R: Rng>(
    path: &Path,
    main_color_default: &MainColorDefault,
    rng: &mut R,
) -> Resolved {
    let location = ProjectLocation::from_path(path);
    let store = FileStore::new(Some(&location), None);
    resolve_from_store(&store, &location.display_name(), main_color_default, rng)
}

/// Resolves settings from the project target of any store.
pub fn resolve_from_store<S: ConfigStore + ?Sized, R: Rng>(
    store: &S,
    fallback_name: &str,
    main_color_default: &MainColorDefault,
    rng: &mut R,
) -> Resolved {
    let stored = |key: &str| store.get(ConfigTarget::Project, SECTION, key);
    let mut generated = Vec::new();

    let name = stored(SettingKey::Name.key())
        .and_then(|v| v.as_str().map(|s| s.trim().to_string()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback_name.to_string());

    let stored_color = stored(SettingKey::MainColor.key()).and_then(|v| match v {
        Value::String(s) => match HexColor::parse(&s) {
            Ok(color) => Some(color),
            Err(_) => {
                tracing::warn!(value = %s, "ignoring malformed main color");
                None
            }
        },
        other => {
            tracing::warn!(value = %other, "ignoring non-string main color");
            None
        }
    });
    let main_color = match (stored_color, main_color_default) {
        (Some(color), _) => color,
        (None, MainColorDefault::Seed(seed)) => seed.clone(),
        (None, MainColorDefault::Random) => {
            let color = random_color(rng);
            tracing::info!(color = %color, "generated main color");
            generated.push((SettingKey::MainColor, Value::String(color.to_string())));
            color
        }
    };

    let mut settings = ProjectSettings::defaults(name, main_color);
    for key in SettingKey::ALL {
        let mut raw = stored(key.key());
        if raw.is_none() && key == SettingKey::IsProjectNameColored {
            raw = stored(SettingKey::LEGACY_NAME_COLORED);
        }
        let Some(slot) = settings.toggle_mut(key) else {
            continue;
        };
        match raw {
            Some(Value::Bool(b)) => *slot = b,
            Some(other) => {
                tracing::debug!(key = %key, value = %other, "ignoring non-boolean toggle")
            }
            None => {}
        }
    }

    Resolved { settings, generated }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::{json, Map};
    use std::fs;
    use tempfile::TempDir;

    fn store_with(values: Value) -> MemoryStore {
        let map: Map<String, Value> = values.as_object().cloned().unwrap_or_default();
        MemoryStore::new().with_values(ConfigTarget::Project, map)
    }

    fn seed() -> MainColorDefault {
        MainColorDefault::default()
    }

    #[test]
    fn test_resolve_missing_settings_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("my-service");
        fs::create_dir_all(&project).unwrap();

        let settings = resolve(&project);
        assert_eq!(settings.name, "my-service");
        assert_eq!(settings.main_color.as_str(), DEFAULT_MAIN_COLOR);
        assert!(!settings.is_activity_bar_colored);
        assert!(!settings.is_title_bar_colored);
        assert!(settings.is_status_bar_colored);
        assert!(settings.is_project_name_colored);
        assert!(settings.is_active_items_colored);
        assert!(settings.set_window_title);
    }

    #[test]
    fn test_resolve_nonexistent_path_does_not_fail() {
        let settings = resolve(Path::new("/definitely/not/here/ghost"));
        assert_eq!(settings.name, "ghost");
    }

    #[test]
    fn test_resolve_corrupt_file_degrades_to_defaults() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(".vscode")).unwrap();
        fs::write(tmp.path().join(".vscode/settings.json"), "{ not json").unwrap();
        let settings = resolve(tmp.path());
        assert_eq!(settings.main_color.as_str(), DEFAULT_MAIN_COLOR);
    }

    #[test]
    fn test_resolve_reads_workspace_descriptor() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("suite.code-workspace");
        fs::write(
            &file,
            r##"{"folders":[],"settings":{"projectColors.name":"Suite","projectColors.mainColor":"#00AA00","projectColors.isTitleBarColored":true}}"##,
        )
        .unwrap();
        let settings = resolve(&file);
        assert_eq!(settings.name, "Suite");
        assert_eq!(settings.main_color.as_str(), "#00aa00");
        assert!(settings.is_title_bar_colored);
    }

    #[test]
    fn test_stored_values_win() {
        let store = store_with(json!({
            "projectColors.name": "Billing",
            "projectColors.mainColor": "#123456",
            "projectColors.isActivityBarColored": true,
            "projectColors.isStatusBarColored": false,
            "projectColors.setWindowTitle": false,
        }));
        let resolved = resolve_from_store(&store, "fallback", &seed(), &mut rand::thread_rng());
        let s = resolved.settings;
        assert_eq!(s.name, "Billing");
        assert_eq!(s.main_color.as_str(), "#123456");
        assert!(s.is_activity_bar_colored);
        assert!(!s.is_status_bar_colored);
        assert!(!s.set_window_title);
        assert!(resolved.generated.is_empty());
    }

    #[test]
    fn test_wrong_types_fall_back() {
        let store = store_with(json!({
            "projectColors.name": "",
            "projectColors.mainColor": "purple",
            "projectColors.isActiveItemsColored": "no",
            "projectColors.isTitleBarColored": 1,
        }));
        let s = resolve_from_store(&store, "api", &seed(), &mut rand::thread_rng()).settings;
        assert_eq!(s.name, "api");
        assert_eq!(s.main_color.as_str(), DEFAULT_MAIN_COLOR);
        assert!(s.is_active_items_colored);
        assert!(!s.is_title_bar_colored);
    }

    #[test]
    fn test_legacy_name_colored_alias() {
        let store = store_with(json!({ "projectColors.isWindowNameColored": false }));
        let s = resolve_from_store(&store, "x", &seed(), &mut rand::thread_rng()).settings;
        assert!(!s.is_project_name_colored);

        let both = store_with(json!({
            "projectColors.isWindowNameColored": false,
            "projectColors.isProjectNameColored": true,
        }));
        let s = resolve_from_store(&both, "x", &seed(), &mut rand::thread_rng()).settings;
        assert!(s.is_project_name_colored);
    }

    #[test]
    fn test_random_default_is_reported_for_persistence() {
        let store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(42);
        let resolved = resolve_from_store(&store, "x", &MainColorDefault::Random, &mut rng);
        assert_eq!(resolved.generated.len(), 1);
        let (key, value) = &resolved.generated[0];
        assert_eq!(*key, SettingKey::MainColor);
        assert_eq!(value.as_str(), Some(resolved.settings.main_color.as_str()));
        // resolution itself never writes
        assert_eq!(store.writes, 0);
    }

    #[test]
    fn test_random_default_ignored_when_color_stored() {
        let store = store_with(json!({ "projectColors.mainColor": "#abcdef" }));
        let resolved =
            resolve_from_store(&store, "x", &MainColorDefault::Random, &mut rand::thread_rng());
        assert!(resolved.generated.is_empty());
        assert_eq!(resolved.settings.main_color.as_str(), "#abcdef");
    }

    #[test]
    fn test_setting_key_parse() {
        assert_eq!(SettingKey::parse("mainColor"), Some(SettingKey::MainColor));
        assert_eq!(SettingKey::parse("projectColors.setWindowTitle"), Some(SettingKey::SetWindowTitle));
        assert_eq!(SettingKey::parse("isWindowNameColored"), Some(SettingKey::IsProjectNameColored));
        assert_eq!(SettingKey::parse("bogus"), None);
        assert_eq!(SettingKey::MainColor.to_string(), "projectColors.mainColor");
    }

    #[test]
    fn test_set_validates_input() {
        let mut s = ProjectSettings::defaults("p", HexColor::black());
        assert_eq!(s.set(SettingKey::MainColor, "#FF0000").unwrap(), Some(json!("#ff0000")));
        assert_eq!(s.set(SettingKey::IsTitleBarColored, "on").unwrap(), Some(json!(true)));
        assert!(s.is_title_bar_colored);
        assert!(matches!(
            s.set(SettingKey::MainColor, "red"),
            Err(ProjectColorsError::InvalidColor(_))
        ));
        assert!(matches!(
            s.set(SettingKey::SetWindowTitle, "maybe"),
            Err(ProjectColorsError::InvalidBool(_))
        ));
        assert_eq!(s.main_color.as_str(), "#ff0000");
    }

    #[test]
    fn test_set_empty_name_requests_removal() {
        let mut s = ProjectSettings::defaults("derived", HexColor::black());
        assert_eq!(s.set(SettingKey::Name, "  Billing ").unwrap(), Some(json!("Billing")));
        assert_eq!(s.name, "Billing");
        assert_eq!(s.set(SettingKey::Name, "   ").unwrap(), None);
    }

    #[test]
    fn test_settings_serialize_camel_case() {
        let s = ProjectSettings::defaults("p", HexColor::white());
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["mainColor"], json!("#ffffff"));
        assert_eq!(v["isStatusBarColored"], json!(true));
    }
}
