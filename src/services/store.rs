use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::{Map, Value};

use crate::project::error::StoreError;

/// Where a setting is persisted.
///
/// `Project` is the currently open project's own settings; `Global` is shared
/// across every project (the workspace registry lives there).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigTarget {
    Project,
    Global,
}

/// Key/value settings storage, addressed the way editor settings files are:
/// a flat object whose keys are `"{section}.{key}"`.
pub trait ConfigStore {
    fn get(&self, target: ConfigTarget, section: &str, key: &str) -> Option<Value>;

    /// Replaces the whole value of one key. `None` removes the key.
    fn update(
        &mut self,
        target: ConfigTarget,
        section: &str,
        key: &str,
        value: Option<Value>,
    ) -> Result<(), StoreError>;

    /// Drops any cached state so the next `get` sees external edits.
    fn refresh(&mut self) {}
}

pub fn full_key(section: &str, key: &str) -> String {
    if section.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", section, key)
    }
}

// ========== Project location ==========

pub const WORKSPACE_FILE_EXTENSION: &str = "code-workspace";

/// A project on disk: a plain directory with a `.vscode/settings.json`
/// sidecar, or a multi-root `*.code-workspace` descriptor whose `settings`
/// object holds the same keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectLocation {
    Directory(PathBuf),
    WorkspaceFile(PathBuf),
}

impl ProjectLocation {
    pub fn from_path(path: &Path) -> Self {
        let is_descriptor = path
            .extension()
            .map(|ext| ext == WORKSPACE_FILE_EXTENSION)
            .unwrap_or(false);
        if is_descriptor {
            Self::WorkspaceFile(path.to_path_buf())
        } else {
            Self::Directory(path.to_path_buf())
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Directory(p) | Self::WorkspaceFile(p) => p,
        }
    }

    /// The file that actually holds this project's settings.
    pub fn settings_file(&self) -> PathBuf {
        match self {
            Self::Directory(dir) => dir.join(".vscode").join("settings.json"),
            Self::WorkspaceFile(file) => file.clone(),
        }
    }

    /// Last path segment, used as the fallback project name.
    pub fn display_name(&self) -> String {
        self.path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Untitled Project".to_string())
    }

    pub fn exists(&self) -> bool {
        match self {
            Self::Directory(dir) => dir.is_dir(),
            Self::WorkspaceFile(file) => file.is_file(),
        }
    }
}

// ========== JSON settings file ==========

#[derive(Debug, Clone)]
enum FileState {
    Loaded,
    Missing,
    Unparseable(String),
}

/// One JSON settings document on disk.
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
    /// Settings live under a top-level `settings` object (workspace descriptors).
    nested: bool,
    document: Value,
    state: FileState,
}

impl SettingsFile {
    pub fn open(path: PathBuf, nested: bool) -> Self {
        let mut file = Self {
            path,
            nested,
            document: Value::Object(Map::new()),
            state: FileState::Missing,
        };
        file.reload();
        file
    }

    pub fn for_project(location: &ProjectLocation) -> Self {
        let nested = matches!(location, ProjectLocation::WorkspaceFile(_));
        Self::open(location.settings_file(), nested)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the document. Read and parse failures degrade to an empty
    /// document and are logged; such a file is then protected from writes.
    pub fn reload(&mut self) {
        self.document = Value::Object(Map::new());
        self.state = match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => FileState::Loaded,
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(doc @ Value::Object(_)) => {
                    self.document = doc;
                    FileState::Loaded
                }
                Ok(_) => {
                    tracing::warn!(path = %self.path.display(), "settings file is not a JSON object, using defaults");
                    FileState::Unparseable("top-level value is not an object".to_string())
                }
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "failed to parse settings file, using defaults");
                    FileState::Unparseable(e.to_string())
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "settings file not found, using defaults");
                FileState::Missing
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read settings file, using defaults");
                FileState::Unparseable(e.to_string())
            }
        };
    }

    pub fn is_missing(&self) -> bool {
        matches!(self.state, FileState::Missing)
    }

    /// The flat settings object (empty when absent).
    pub fn settings(&self) -> Option<&Map<String, Value>> {
        if self.nested {
            self.document.get("settings").and_then(Value::as_object)
        } else {
            self.document.as_object()
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.settings().and_then(|s| s.get(key))
    }

    fn settings_mut(&mut self) -> &mut Map<String, Value> {
        if !self.document.is_object() {
            self.document = Value::Object(Map::new());
        }
        let Value::Object(root) = &mut self.document else {
            unreachable!("document was just made an object");
        };
        if !self.nested {
            return root;
        }
        let entry = root
            .entry("settings")
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        match entry {
            Value::Object(map) => map,
            _ => unreachable!("settings entry was just made an object"),
        }
    }

    /// Sets or removes one key in memory. Call [`SettingsFile::save`] to persist.
    pub fn set(&mut self, key: &str, value: Option<Value>) {
        let settings = self.settings_mut();
        match value {
            Some(v) => {
                settings.insert(key.to_string(), v);
            }
            None => {
                settings.remove(key);
            }
        }
    }

    /// Writes the document using an atomic temp-file + rename.
    pub fn save(&mut self) -> Result<(), StoreError> {
        if let FileState::Unparseable(reason) = &self.state {
            return Err(StoreError::Unparseable {
                path: self.path.clone(),
                reason: reason.clone(),
            });
        }
        let content = serde_json::to_string_pretty(&self.document)?;
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        let mut temp_name = self.path.file_name().unwrap_or_default().to_os_string();
        temp_name.push(".tmp");
        let temp_path = self.path.with_file_name(temp_name);
        fs::write(&temp_path, format!("{}\n", content)).map_err(write_err)?;
        fs::rename(&temp_path, &self.path).map_err(write_err)?;

        self.state = FileState::Loaded;
        tracing::debug!(path = %self.path.display(), "settings file written");
        Ok(())
    }

    pub fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }
}

// ========== File-backed store ==========

/// Store backed by the project's settings file and a global JSON file.
#[derive(Debug)]
pub struct FileStore {
    project: Option<SettingsFile>,
    global: Option<SettingsFile>,
}

impl FileStore {
    pub fn new(project: Option<&ProjectLocation>, global_path: Option<PathBuf>) -> Self {
        Self {
            project: project.map(SettingsFile::for_project),
            global: global_path.map(|p| SettingsFile::open(p, false)),
        }
    }

    pub fn project_file(&self) -> Option<&SettingsFile> {
        self.project.as_ref()
    }

    fn file(&self, target: ConfigTarget) -> Option<&SettingsFile> {
        match target {
            ConfigTarget::Project => self.project.as_ref(),
            ConfigTarget::Global => self.global.as_ref(),
        }
    }

    fn file_mut(&mut self, target: ConfigTarget) -> Result<&mut SettingsFile, StoreError> {
        match target {
            ConfigTarget::Project => self.project.as_mut().ok_or(StoreError::NoProject),
            ConfigTarget::Global => self.global.as_mut().ok_or(StoreError::NoGlobalLocation),
        }
    }
}

impl ConfigStore for FileStore {
    fn get(&self, target: ConfigTarget, section: &str, key: &str) -> Option<Value> {
        self.file(target)
            .and_then(|f| f.get(&full_key(section, key)))
            .cloned()
    }

    fn update(
        &mut self,
        target: ConfigTarget,
        section: &str,
        key: &str,
        value: Option<Value>,
    ) -> Result<(), StoreError> {
        let file = self.file_mut(target)?;
        file.set(&full_key(section, key), value);
        file.save()
    }

    fn refresh(&mut self) {
        if let Some(file) = self.project.as_mut() {
            file.reload();
        }
        if let Some(file) = self.global.as_mut() {
            file.reload();
        }
    }
}

// ========== In-memory store ==========

/// Store kept entirely in memory. Used for dry runs and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<ConfigTarget, Map<String, Value>>,
    /// Every update fails with a write error while set.
    pub fail_writes: bool,
    pub writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds one target with an existing settings object.
    pub fn with_values(mut self, target: ConfigTarget, values: Map<String, Value>) -> Self {
        self.values.insert(target, values);
        self
    }

    #[cfg(test)]
    pub fn values(&self, target: ConfigTarget) -> Map<String, Value> {
        self.values.get(&target).cloned().unwrap_or_default()
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, target: ConfigTarget, section: &str, key: &str) -> Option<Value> {
        self.values
            .get(&target)
            .and_then(|m| m.get(&full_key(section, key)))
            .cloned()
    }

    fn update(
        &mut self,
        target: ConfigTarget,
        section: &str,
        key: &str,
        value: Option<Value>,
    ) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Write {
                path: PathBuf::from("<memory>"),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "store is read-only"),
            });
        }
        let map = self.values.entry(target).or_default();
        let full = full_key(section, key);
        match value {
            Some(v) => {
                map.insert(full, v);
            }
            None => {
                map.remove(&full);
            }
        }
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_location_detects_workspace_descriptor() {
        let loc = ProjectLocation::from_path(Path::new("/work/team.code-workspace"));
        assert!(matches!(loc, ProjectLocation::WorkspaceFile(_)));
        assert_eq!(loc.settings_file(), PathBuf::from("/work/team.code-workspace"));
        assert_eq!(loc.display_name(), "team.code-workspace");

        let dir = ProjectLocation::from_path(Path::new("/work/api"));
        assert_eq!(dir.settings_file(), PathBuf::from("/work/api/.vscode/settings.json"));
        assert_eq!(dir.display_name(), "api");
    }

    #[test]
    fn test_display_name_fallback() {
        assert_eq!(ProjectLocation::from_path(Path::new("/")).display_name(), "Untitled Project");
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let tmp = TempDir::new().unwrap();
        let loc = ProjectLocation::from_path(tmp.path());
        let file = SettingsFile::for_project(&loc);
        assert!(file.is_missing());
        assert!(file.settings().map(|s| s.is_empty()).unwrap_or(true));
    }

    #[test]
    fn test_write_creates_vscode_dir_and_keeps_other_keys() {
        let tmp = TempDir::new().unwrap();
        let vscode = tmp.path().join(".vscode");
        fs::create_dir_all(&vscode).unwrap();
        fs::write(vscode.join("settings.json"), r#"{"editor.tabSize": 2}"#).unwrap();

        let loc = ProjectLocation::from_path(tmp.path());
        let mut store = FileStore::new(Some(&loc), None);
        store
            .update(ConfigTarget::Project, "projectColors", "mainColor", Some(json!("#112233")))
            .unwrap();

        let written: Value =
            serde_json::from_str(&fs::read_to_string(vscode.join("settings.json")).unwrap()).unwrap();
        assert_eq!(written["editor.tabSize"], json!(2));
        assert_eq!(written["projectColors.mainColor"], json!("#112233"));
        assert!(!vscode.join("settings.json.tmp").exists());
    }

    #[test]
    fn test_workspace_descriptor_nests_settings() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("multi.code-workspace");
        fs::write(&path, r#"{"folders":[{"path":"a"}],"settings":{"x.y":1}}"#).unwrap();

        let loc = ProjectLocation::from_path(&path);
        let mut store = FileStore::new(Some(&loc), None);
        assert_eq!(store.get(ConfigTarget::Project, "x", "y"), Some(json!(1)));
        store.update(ConfigTarget::Project, "window", "title", Some(json!("Multi"))).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["folders"][0]["path"], json!("a"));
        assert_eq!(written["settings"]["window.title"], json!("Multi"));
        assert_eq!(written["settings"]["x.y"], json!(1));
    }

    #[test]
    fn test_unparseable_file_reads_empty_and_refuses_writes() {
        let tmp = TempDir::new().unwrap();
        let vscode = tmp.path().join(".vscode");
        fs::create_dir_all(&vscode).unwrap();
        let original = "{\n  // comment\n  \"a.b\": true,\n}";
        fs::write(vscode.join("settings.json"), original).unwrap();

        let loc = ProjectLocation::from_path(tmp.path());
        let mut store = FileStore::new(Some(&loc), None);
        assert_eq!(store.get(ConfigTarget::Project, "a", "b"), None);

        let err = store
            .update(ConfigTarget::Project, "a", "b", Some(json!(false)))
            .unwrap_err();
        assert!(matches!(err, StoreError::Unparseable { .. }));
        assert_eq!(fs::read_to_string(vscode.join("settings.json")).unwrap(), original);
    }

    #[test]
    fn test_update_none_removes_key() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.json");
        let mut store = FileStore::new(None, Some(global.clone()));
        store.update(ConfigTarget::Global, "s", "k", Some(json!([1]))).unwrap();
        assert_eq!(store.get(ConfigTarget::Global, "s", "k"), Some(json!([1])));
        store.update(ConfigTarget::Global, "s", "k", None).unwrap();
        assert_eq!(store.get(ConfigTarget::Global, "s", "k"), None);
    }

    #[test]
    fn test_project_target_without_project() {
        let mut store = FileStore::new(None, None);
        let err = store.update(ConfigTarget::Project, "a", "b", None).unwrap_err();
        assert!(matches!(err, StoreError::NoProject));
    }

    #[test]
    fn test_refresh_picks_up_external_edit() {
        let tmp = TempDir::new().unwrap();
        let loc = ProjectLocation::from_path(tmp.path());
        let mut store = FileStore::new(Some(&loc), None);
        assert_eq!(store.get(ConfigTarget::Project, "a", "b"), None);

        fs::create_dir_all(tmp.path().join(".vscode")).unwrap();
        fs::write(tmp.path().join(".vscode/settings.json"), r#"{"a.b": "c"}"#).unwrap();
        store.refresh();
        assert_eq!(store.get(ConfigTarget::Project, "a", "b"), Some(json!("c")));
    }

    #[test]
    fn test_memory_store_failure_mode() {
        let mut store = MemoryStore::new();
        store.fail_writes = true;
        assert!(store.update(ConfigTarget::Project, "a", "b", Some(json!(1))).is_err());
        assert_eq!(store.writes, 0);
    }
}
