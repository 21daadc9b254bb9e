use std::time::{Duration, Instant};

use rand::Rng;

use crate::project::error::Result;
use crate::project::generator::generate;
use crate::project::settings::{resolve_from_store, MainColorDefault, ProjectSettings, SettingKey, SECTION};
use crate::project::writer::{apply, apply_window_title, persist_generated, ApplyOutcome};
use crate::services::registry::{self, WorkspaceReference};
use crate::services::store::{ConfigStore, ConfigTarget, ProjectLocation};

/// Change notifications are only acted on once the session is `Ready`, so
/// the writes made while activating do not feed back into themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    Ready,
}

/// Trailing-edge debounce: fires once no event arrived for `delay`.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    last_event: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, last_event: None }
    }

    pub fn trigger(&mut self, now: Instant) {
        self.last_event = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.last_event.is_some()
    }

    /// True exactly once per burst, after the quiet period.
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last_event {
            Some(last) if now.saturating_duration_since(last) >= self.delay => {
                self.last_event = None;
                true
            }
            _ => false,
        }
    }
}

/// Result of recomputing and writing one project's colors.
#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub settings: ProjectSettings,
    /// `None` when the customization write failed (see warnings).
    pub outcome: Option<ApplyOutcome>,
    pub title_changed: bool,
}

/// One open project: resolves its settings, keeps the editor's color
/// customizations in sync and reacts to configuration changes.
pub struct Session<S: ConfigStore> {
    store: S,
    location: ProjectLocation,
    main_color_default: MainColorDefault,
    state: SessionState,
    settings: Option<ProjectSettings>,
    debouncer: Debouncer,
    warnings: Vec<String>,
}

impl<S: ConfigStore> Session<S> {
    pub fn new(
        store: S,
        location: ProjectLocation,
        main_color_default: MainColorDefault,
        debounce: Duration,
    ) -> Self {
        Self {
            store,
            location,
            main_color_default,
            state: SessionState::Initializing,
            settings: None,
            debouncer: Debouncer::new(debounce),
            warnings: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn location(&self) -> &ProjectLocation {
        &self.location
    }

    /// Warnings collected since the last call (failed writes).
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    /// First-run sequence: resolve, persist generated defaults, register the
    /// project globally, write colors and title, then become `Ready`.
    pub fn activate<R: Rng>(&mut self, rng: &mut R) -> ApplyReport {
        self.state = SessionState::Initializing;
        self.load(rng);
        let report = self.refresh_colors();
        self.state = SessionState::Ready;
        tracing::info!(project = %self.location.path().display(), "session ready");
        report
    }

    /// Like [`Session::activate`] but leaves the color customizations alone,
    /// for callers that apply an edit right after.
    pub fn prepare<R: Rng>(&mut self, rng: &mut R) {
        self.state = SessionState::Initializing;
        self.load(rng);
        self.state = SessionState::Ready;
    }

    fn load<R: Rng>(&mut self, rng: &mut R) {
        let resolved = resolve_from_store(
            &self.store,
            &self.location.display_name(),
            &self.main_color_default,
            rng,
        );

        if let Err(e) = persist_generated(&mut self.store, &resolved) {
            self.warn(format!("Could not save the generated main color: {}", e));
        }

        let reference = WorkspaceReference::new(self.location.path().to_string_lossy());
        if let Err(e) = registry::update(&mut self.store, |r| r.save_workspace(reference)) {
            self.warn(format!("Could not register the project: {}", e));
        }

        self.settings = Some(resolved.settings);
    }

    /// Records a configuration change. Ignored while initializing.
    pub fn on_configuration_changed(&mut self, now: Instant) -> bool {
        if self.state != SessionState::Ready {
            tracing::debug!("ignoring configuration change during activation");
            return false;
        }
        self.debouncer.trigger(now);
        true
    }

    pub fn has_pending_change(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Re-resolves and re-applies once a change burst has settled.
    pub fn flush(&mut self, now: Instant) -> Option<ApplyReport> {
        if self.state != SessionState::Ready || !self.debouncer.ready(now) {
            return None;
        }
        self.store.refresh();
        self.settings = Some(self.re_resolve());
        Some(self.refresh_colors())
    }

    /// Applies one user edit: validate, persist the setting, recompute.
    pub fn update_setting(&mut self, key: SettingKey, raw: &str) -> Result<ApplyReport> {
        let mut settings = match self.settings.take() {
            Some(s) => s,
            None => self.re_resolve(),
        };
        let value = match settings.set(key, raw) {
            Ok(v) => v,
            Err(e) => {
                self.settings = Some(settings);
                return Err(e);
            }
        };
        self.settings = Some(settings);
        let removed = value.is_none();
        if let Err(e) = self.store.update(ConfigTarget::Project, SECTION, key.key(), value) {
            self.warn(format!("Could not save {}: {}", key, e));
        }
        if removed {
            self.settings = Some(self.re_resolve());
        }
        Ok(self.refresh_colors())
    }

    fn re_resolve(&self) -> ProjectSettings {
        // A color that is already in use stays the fallback, so a failed
        // first-run save does not produce a new random color on every pass.
        let fallback = match &self.settings {
            Some(current) => MainColorDefault::Seed(current.main_color.clone()),
            None => self.main_color_default.clone(),
        };
        resolve_from_store(
            &self.store,
            &self.location.display_name(),
            &fallback,
            &mut rand::thread_rng(),
        )
        .settings
    }

    fn refresh_colors(&mut self) -> ApplyReport {
        let settings = match &self.settings {
            Some(s) => s.clone(),
            None => self.re_resolve(),
        };
        let generated = generate(&settings);
        let outcome = match apply(&mut self.store, &generated) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                self.warn(format!("Failed to apply color customizations: {}", e));
                None
            }
        };
        let title_changed = match apply_window_title(&mut self.store, &settings) {
            Ok(changed) => changed,
            Err(e) => {
                self.warn(format!("Failed to update the window title: {}", e));
                false
            }
        };
        ApplyReport {
            settings,
            outcome,
            title_changed,
        }
    }
}
