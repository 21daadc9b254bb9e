use serde_json::{Map, Value};

use crate::project::error::StoreError;
use crate::project::generator::{CustomizationMap, CustomizationValue, CUSTOMIZATIONS_KEY, CUSTOMIZATIONS_SECTION};
use crate::project::settings::{ProjectSettings, Resolved, SECTION};
use crate::services::store::{ConfigStore, ConfigTarget};

pub const WINDOW_SECTION: &str = "window";
pub const WINDOW_TITLE_KEY: &str = "title";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Keys written with a color.
    pub set: usize,
    /// Keys that were present and have been removed.
    pub removed: usize,
    /// Whether the store was written at all.
    pub changed: bool,
}

/// Merges `current` with `generated`: generated values win, cleared keys
/// are dropped, unrelated keys are kept.
pub fn merge(current: &Map<String, Value>, generated: &CustomizationMap) -> (Map<String, Value>, ApplyOutcome) {
    let mut merged = current.clone();
    let mut outcome = ApplyOutcome::default();
    for (key, value) in generated {
        match value {
            CustomizationValue::Set(color) => {
                merged.insert(key.clone(), Value::String(color.clone()));
                outcome.set += 1;
            }
            CustomizationValue::Clear => {
                if merged.remove(key).is_some() {
                    outcome.removed += 1;
                }
            }
        }
    }
    outcome.changed = merged != *current;
    (merged, outcome)
}

/// Writes generated customizations into the project's
/// `workbench.colorCustomizations` as one whole-value replacement.
///
/// Nothing is written when the merge changes nothing.
pub fn apply<S: ConfigStore + ?Sized>(
    store: &mut S,
    generated: &CustomizationMap,
) -> Result<ApplyOutcome, StoreError> {
    let current = store
        .get(ConfigTarget::Project, CUSTOMIZATIONS_SECTION, CUSTOMIZATIONS_KEY)
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default();

    let (merged, outcome) = merge(&current, generated);
    if !outcome.changed {
        tracing::debug!("color customizations already up to date");
        return Ok(outcome);
    }

    let value = if merged.is_empty() {
        None
    } else {
        Some(Value::Object(merged))
    };
    store.update(ConfigTarget::Project, CUSTOMIZATIONS_SECTION, CUSTOMIZATIONS_KEY, value)?;
    tracing::info!(set = outcome.set, removed = outcome.removed, "color customizations written");
    Ok(outcome)
}

/// Sets `window.title` to the project name, or removes it so the editor's
/// default title template comes back. Returns whether anything was written.
pub fn apply_window_title<S: ConfigStore + ?Sized>(
    store: &mut S,
    settings: &ProjectSettings,
) -> Result<bool, StoreError> {
    let current = store.get(ConfigTarget::Project, WINDOW_SECTION, WINDOW_TITLE_KEY);
    let wanted = settings
        .set_window_title
        .then(|| Value::String(settings.name.clone()));
    if current == wanted {
        return Ok(false);
    }
    store.update(ConfigTarget::Project, WINDOW_SECTION, WINDOW_TITLE_KEY, wanted)?;
    Ok(true)
}

/// Writes values the resolver generated (a first-run random color) back to
/// the project so they stay stable.
pub fn persist_generated<S: ConfigStore + ?Sized>(
    store: &mut S,
    resolved: &Resolved,
) -> Result<usize, StoreError> {
    for (key, value) in &resolved.generated {
        store.update(ConfigTarget::Project, SECTION, key.key(), Some(value.clone()))?;
    }
    Ok(resolved.generated.len())
}
