use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::project::error::StoreError;
use crate::project::settings::{resolve, ProjectSettings, SECTION};
use crate::services::store::{ConfigStore, ConfigTarget, ProjectLocation};

pub const WORKSPACES_KEY: &str = "workspaces";
pub const GROUPS_KEY: &str = "groups";

/// A known project, identified by its directory (or descriptor) path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceReference {
    pub directory: String,
}

impl WorkspaceReference {
    pub fn new(directory: impl Into<String>) -> Self {
        Self { directory: directory.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceGroup {
    pub name: String,
    #[serde(default)]
    pub workspaces: Vec<WorkspaceReference>,
}

/// The two global lists: known projects and named groups.
///
/// Every mutation returns whether anything changed. Operations naming a
/// group or reference that does not exist are no-ops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    pub workspaces: Vec<WorkspaceReference>,
    pub groups: Vec<WorkspaceGroup>,
}

fn load_list<T, S>(store: &S, key: &str) -> Vec<T>
where
    T: for<'de> Deserialize<'de>,
    S: ConfigStore + ?Sized,
{
    match store.get(ConfigTarget::Global, SECTION, key) {
        Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "ignoring malformed registry list");
            Vec::new()
        }),
        None => Vec::new(),
    }
}

impl Registry {
    pub fn load<S: ConfigStore + ?Sized>(store: &S) -> Self {
        Self {
            workspaces: load_list(store, WORKSPACES_KEY),
            groups: load_list(store, GROUPS_KEY),
        }
    }

    /// Writes whichever lists differ from `previous`.
    pub fn save<S: ConfigStore + ?Sized>(&self, store: &mut S, previous: &Registry) -> Result<(), StoreError> {
        if self.workspaces != previous.workspaces {
            let value = serde_json::to_value(&self.workspaces)?;
            store.update(ConfigTarget::Global, SECTION, WORKSPACES_KEY, Some(value))?;
        }
        if self.groups != previous.groups {
            let value = serde_json::to_value(&self.groups)?;
            store.update(ConfigTarget::Global, SECTION, GROUPS_KEY, Some(value))?;
        }
        Ok(())
    }

    pub fn group(&self, name: &str) -> Option<&WorkspaceGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    fn group_mut(&mut self, name: &str) -> Option<&mut WorkspaceGroup> {
        self.groups.iter_mut().find(|g| g.name == name)
    }

    /// Replaces the reference with the same directory, or appends it.
    pub fn save_workspace(&mut self, reference: WorkspaceReference) -> bool {
        match self.workspaces.iter_mut().find(|r| r.directory == reference.directory) {
            Some(existing) if *existing == reference => false,
            Some(existing) => {
                *existing = reference;
                true
            }
            None => {
                self.workspaces.push(reference);
                true
            }
        }
    }

    pub fn delete_workspace(&mut self, directory: &str) -> bool {
        let before = self.workspaces.len();
        self.workspaces.retain(|r| r.directory != directory);
        self.workspaces.len() != before
    }

    /// Drag-and-drop reorder within the top-level list: the dragged reference
    /// lands at the target's position.
    pub fn reorder_workspace(&mut self, dragged: &str, target: &str) -> bool {
        let from = self.workspaces.iter().position(|r| r.directory == dragged);
        let to = self.workspaces.iter().position(|r| r.directory == target);
        match (from, to) {
            (Some(from), Some(to)) if from != to => {
                splice_move(&mut self.workspaces, from, to);
                true
            }
            _ => false,
        }
    }

    fn locate(&self, directory: &str) -> Option<(usize, usize)> {
        self.groups.iter().enumerate().find_map(|(gi, group)| {
            group
                .workspaces
                .iter()
                .position(|r| r.directory == directory)
                .map(|pos| (gi, pos))
        })
    }

    /// Moves `dragged` out of its group and into the target reference's
    /// group at the target's index. Works for same-group reorders too.
    pub fn move_workspace(&mut self, dragged: &str, target: &str) -> bool {
        if dragged == target {
            return false;
        }
        let (Some((src_group, src_pos)), Some((dst_group, dst_pos))) =
            (self.locate(dragged), self.locate(target))
        else {
            return false;
        };

        if src_group == dst_group {
            splice_move(&mut self.groups[src_group].workspaces, src_pos, dst_pos);
        } else {
            let item = self.groups[src_group].workspaces.remove(src_pos);
            let dst = &mut self.groups[dst_group].workspaces;
            let index = dst_pos.min(dst.len());
            dst.insert(index, item);
        }
        true
    }

    pub fn create_group(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.group(name).is_some() {
            return false;
        }
        self.groups.push(WorkspaceGroup {
            name: name.to_string(),
            workspaces: Vec::new(),
        });
        true
    }

    pub fn rename_group(&mut self, old: &str, new: &str) -> bool {
        let new = new.trim();
        if new.is_empty() || old == new || self.group(new).is_some() {
            return false;
        }
        match self.group_mut(old) {
            Some(group) => {
                group.name = new.to_string();
                true
            }
            None => false,
        }
    }

    pub fn delete_group(&mut self, name: &str) -> bool {
        let before = self.groups.len();
        self.groups.retain(|g| g.name != name);
        self.groups.len() != before
    }

    /// Appends a reference to a group, taking it out of any other group first.
    pub fn add_to_group(&mut self, group: &str, directory: &str) -> bool {
        if self.group(group).is_none() {
            return false;
        }
        if let Some((gi, _)) = self.locate(directory) {
            if self.groups[gi].name == group {
                return false;
            }
        }
        for other in self.groups.iter_mut() {
            other.workspaces.retain(|r| r.directory != directory);
        }
        match self.group_mut(group) {
            Some(target) => {
                target.workspaces.push(WorkspaceReference::new(directory));
                true
            }
            None => false,
        }
    }

    pub fn remove_from_group(&mut self, group: &str, directory: &str) -> bool {
        match self.group_mut(group) {
            Some(g) => {
                let before = g.workspaces.len();
                g.workspaces.retain(|r| r.directory != directory);
                g.workspaces.len() != before
            }
            None => false,
        }
    }
}

/// Removes `items[from]` and reinserts it at `to` (the target's index before
/// removal, clamped to the shortened list).
fn splice_move<T>(items: &mut Vec<T>, from: usize, to: usize) {
    let item = items.remove(from);
    let index = to.min(items.len());
    items.insert(index, item);
}

/// Loads the registry, applies `op`, and persists only when `op` reports a change.
pub fn update<S, F>(store: &mut S, op: F) -> Result<bool, StoreError>
where
    S: ConfigStore + ?Sized,
    F: FnOnce(&mut Registry) -> bool,
{
    let previous = Registry::load(store);
    let mut registry = previous.clone();
    if !op(&mut registry) {
        tracing::debug!("registry operation changed nothing");
        return Ok(false);
    }
    registry.save(store, &previous)?;
    Ok(true)
}

/// One row of the project list: the reference plus its resolved settings,
/// or `None` when the project is gone from disk.
#[derive(Debug, Clone)]
pub struct WorkspaceEntry {
    pub reference: WorkspaceReference,
    pub settings: Option<ProjectSettings>,
}

pub fn overview(references: &[WorkspaceReference]) -> Vec<WorkspaceEntry> {
    references
        .iter()
        .map(|reference| {
            let location = ProjectLocation::from_path(Path::new(&reference.directory));
            let settings = if location.exists() {
                Some(resolve(location.path()))
            } else {
                tracing::debug!(directory = %reference.directory, "project no longer exists");
                None
            };
            WorkspaceEntry {
                reference: reference.clone(),
                settings,
            }
        })
        .collect()
}

/// Raw JSON of both lists, as stored.
pub fn to_json(registry: &Registry) -> Value {
    serde_json::json!({
        WORKSPACES_KEY: registry.workspaces,
        GROUPS_KEY: registry.groups,
    })
}
