use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::color::{
    contrast_color, inverse_contrast_color, lighten_or_darken, mix, semi_transparent, with_alpha,
    HexColor, WHITE,
};
use crate::project::settings::ProjectSettings;

/// Editor setting holding the UI color overrides (`workbench.colorCustomizations`).
pub const CUSTOMIZATIONS_SECTION: &str = "workbench";
pub const CUSTOMIZATIONS_KEY: &str = "colorCustomizations";

/// Value for one surface key: a color, or a request to drop the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomizationValue {
    Set(String),
    Clear,
}

pub type CustomizationMap = BTreeMap<String, CustomizationValue>;

/// One of the independently toggled sets of surface keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceGroup {
    TitleBar,
    ProjectName,
    StatusBar,
    ActiveItems,
    ActivityBar,
}

impl SurfaceGroup {
    pub fn is_enabled(self, settings: &ProjectSettings) -> bool {
        match self {
            Self::TitleBar => settings.is_title_bar_colored,
            Self::ProjectName => settings.is_project_name_colored,
            Self::StatusBar => settings.is_status_bar_colored,
            Self::ActiveItems => settings.is_active_items_colored,
            Self::ActivityBar => settings.is_activity_bar_colored,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::TitleBar => "title bar",
            Self::ProjectName => "project name",
            Self::StatusBar => "status bar",
            Self::ActiveItems => "active items",
            Self::ActivityBar => "activity bar",
        }
    }
}

/// How a surface color derives from the main color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shade {
    Main,
    Contrast,
    /// Contrast color at the fixed `90` alpha suffix.
    SemiContrast,
    InverseContrast,
    /// Main color lightened (positive) or darkened (negative) by a percentage.
    Shift(f64),
    /// Main color shifted toward its contrast color; used for hover states.
    Hover(f64),
    /// Main color with an alpha fraction.
    Alpha(f64),
    /// Main color blended with its contrast color by a percentage.
    TowardContrast(f64),
}

/// Colors computed once per generation and shared by every rule.
#[derive(Debug, Clone)]
pub struct Palette {
    pub main: HexColor,
    pub contrast: HexColor,
    pub semi_contrast: String,
    pub inverse_contrast: HexColor,
}

impl Palette {
    pub fn new(main: &HexColor) -> Self {
        let contrast = contrast_color(main);
        Self {
            main: main.clone(),
            semi_contrast: semi_transparent(&contrast),
            inverse_contrast: inverse_contrast_color(main),
            contrast,
        }
    }

    pub fn render(&self, shade: Shade) -> String {
        match shade {
            Shade::Main => self.main.to_string(),
            Shade::Contrast => self.contrast.to_string(),
            Shade::SemiContrast => self.semi_contrast.clone(),
            Shade::InverseContrast => self.inverse_contrast.to_string(),
            Shade::Shift(percent) => lighten_or_darken(&self.main, percent).to_string(),
            Shade::Hover(percent) => {
                let toward_light = self.contrast.as_str() == WHITE;
                let signed = if toward_light { percent } else { -percent };
                lighten_or_darken(&self.main, signed).to_string()
            }
            Shade::Alpha(alpha) => with_alpha(&self.main, alpha),
            Shade::TowardContrast(weight) => mix(&self.main, &self.contrast, weight).to_string(),
        }
    }
}

/// A toggle-gated set of surface keys.
#[derive(Debug)]
pub struct Rule {
    pub group: SurfaceGroup,
    pub surfaces: &'static [(&'static str, Shade)],
}

const TITLE_BAR: &[(&str, Shade)] = &[
    ("titleBar.activeBackground", Shade::Main),
    ("titleBar.activeForeground", Shade::Contrast),
    ("titleBar.inactiveBackground", Shade::Alpha(0.6)),
    ("titleBar.inactiveForeground", Shade::SemiContrast),
    ("titleBar.border", Shade::Main),
];

// The remote indicator slot on the left of the status bar shows the project name.
const PROJECT_NAME: &[(&str, Shade)] = &[
    ("statusBarItem.remoteBackground", Shade::Main),
    ("statusBarItem.remoteForeground", Shade::Contrast),
    ("statusBarItem.remoteHoverBackground", Shade::Hover(10.0)),
    ("statusBarItem.remoteHoverForeground", Shade::Contrast),
];

const STATUS_BAR: &[(&str, Shade)] = &[
    ("statusBar.background", Shade::Main),
    ("statusBar.foreground", Shade::Contrast),
    ("statusBar.border", Shade::Main),
    ("statusBar.debuggingBackground", Shade::Main),
    ("statusBar.debuggingForeground", Shade::Contrast),
    ("statusBar.debuggingBorder", Shade::Main),
    ("statusBar.noFolderBackground", Shade::Main),
    ("statusBar.noFolderForeground", Shade::Contrast),
    ("statusBarItem.hoverBackground", Shade::Hover(10.0)),
    ("statusBarItem.prominentBackground", Shade::TowardContrast(20.0)),
    ("statusBarItem.prominentForeground", Shade::Contrast),
    ("statusBarItem.prominentHoverBackground", Shade::Hover(10.0)),
    ("statusBarItem.remoteBackground", Shade::Main),
    ("statusBarItem.remoteForeground", Shade::Contrast),
];

const ACTIVE_ITEMS: &[(&str, Shade)] = &[
    ("focusBorder", Shade::Main),
    ("progressBar.background", Shade::Main),
    ("textLink.foreground", Shade::Shift(25.0)),
    ("textLink.activeForeground", Shade::Shift(35.0)),
    ("button.background", Shade::Main),
    ("button.foreground", Shade::Contrast),
    ("button.hoverBackground", Shade::Hover(10.0)),
    ("badge.background", Shade::Main),
    ("badge.foreground", Shade::Contrast),
    ("list.activeSelectionBackground", Shade::Alpha(0.5)),
    ("list.inactiveSelectionBackground", Shade::Alpha(0.25)),
    ("list.highlightForeground", Shade::Shift(20.0)),
    ("list.focusOutline", Shade::Main),
    ("tab.activeBorder", Shade::Main),
    ("tab.activeBorderTop", Shade::Main),
    ("tab.unfocusedActiveBorderTop", Shade::Alpha(0.5)),
    ("panelTitle.activeBorder", Shade::Main),
    ("pickerGroup.foreground", Shade::Shift(20.0)),
    ("quickInputList.focusBackground", Shade::Alpha(0.5)),
    ("sash.hoverBorder", Shade::Main),
    ("inputOption.activeBorder", Shade::Main),
    ("statusBarItem.remoteBackground", Shade::Main),
    ("statusBarItem.remoteForeground", Shade::Contrast),
];

const ACTIVITY_BAR: &[(&str, Shade)] = &[
    ("activityBar.background", Shade::Main),
    ("activityBar.foreground", Shade::Contrast),
    ("activityBar.activeBorder", Shade::Contrast),
    ("activityBar.inactiveForeground", Shade::SemiContrast),
    ("activityBarBadge.background", Shade::Contrast),
    ("activityBarBadge.foreground", Shade::InverseContrast),
];

/// Evaluation order. A key claimed by several groups takes the value of the
/// last enabled one; a disabled group never clears a key an enabled group sets.
pub const RULES: [Rule; 5] = [
    Rule { group: SurfaceGroup::TitleBar, surfaces: TITLE_BAR },
    Rule { group: SurfaceGroup::ProjectName, surfaces: PROJECT_NAME },
    Rule { group: SurfaceGroup::StatusBar, surfaces: STATUS_BAR },
    Rule { group: SurfaceGroup::ActiveItems, surfaces: ACTIVE_ITEMS },
    Rule { group: SurfaceGroup::ActivityBar, surfaces: ACTIVITY_BAR },
];

/// Every surface key this tool may write.
pub fn surface_keys() -> BTreeSet<&'static str> {
    RULES
        .iter()
        .flat_map(|rule| rule.surfaces.iter().map(|(key, _)| *key))
        .collect()
}

pub fn generate(settings: &ProjectSettings) -> CustomizationMap {
    generate_with(&RULES, settings)
}

/// Evaluates `rules` in order against the settings' toggles.
pub fn generate_with(rules: &[Rule], settings: &ProjectSettings) -> CustomizationMap {
    let palette = Palette::new(&settings.main_color);

    rules.iter().fold(CustomizationMap::new(), |mut map, rule| {
        if rule.group.is_enabled(settings) {
            for (key, shade) in rule.surfaces {
                map.insert(key.to_string(), CustomizationValue::Set(palette.render(*shade)));
            }
        } else {
            for (key, _) in rule.surfaces {
                map.entry(key.to_string()).or_insert(CustomizationValue::Clear);
            }
        }
        map
    })
}

/// JSON view of a map with cleared keys as `null`.
pub fn to_json(map: &CustomizationMap) -> Value {
    let object: Map<String, Value> = map
        .iter()
        .map(|(key, value)| {
            let v = match value {
                CustomizationValue::Set(color) => Value::String(color.clone()),
                CustomizationValue::Clear => Value::Null,
            };
            (key.clone(), v)
        })
        .collect();
    Value::Object(object)
}
