//! Plain-text reports for the terminal.
//!
//! Every function returns a `String` so output can be tested without a TTY;
//! swatches are only styled when `color` is true.

use std::fmt::Write as _;

use crossterm::style::{Color, Stylize};
use supports_color::Stream;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::color::{contrast_color, HexColor};
use crate::project::generator::{surface_keys, CustomizationMap, CustomizationValue, RULES};
use crate::project::settings::{ProjectSettings, SettingKey};
use crate::services::registry::{Registry, WorkspaceEntry};

const NAME_COLUMN_MAX: usize = 32;

/// Whether stdout takes 24-bit color. Swatches are always RGB, so lesser
/// terminals get plain text. Honors `NO_COLOR` and `FORCE_COLOR`.
pub fn stdout_supports_color() -> bool {
    supports_color::on(Stream::Stdout)
        .map(|level| level.has_16m)
        .unwrap_or(false)
}

fn to_crossterm(color: &HexColor) -> Color {
    let (r, g, b) = color.rgb();
    Color::Rgb { r, g, b }
}

/// `text` drawn on the color, in its contrast color.
pub fn swatch(color: &HexColor, text: &str, enabled: bool) -> String {
    if !enabled {
        return text.to_string();
    }
    text.with(to_crossterm(&contrast_color(color)))
        .on(to_crossterm(color))
        .to_string()
}

/// Truncates by display width, adding "…" when cut.
pub fn truncate_to_width(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let cw = c.width().unwrap_or(1);
        if used + cw + 1 > max {
            break;
        }
        out.push(c);
        used += cw;
    }
    out.push('…');
    out
}

pub fn pad_to_width(s: &str, width: usize) -> String {
    let current = s.width();
    if current >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - current))
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

pub fn settings_report(settings: &ProjectSettings, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", swatch(&settings.main_color, &format!(" {} ", settings.name), color));
    for key in SettingKey::ALL {
        let value = match key {
            SettingKey::Name => settings.name.clone(),
            SettingKey::MainColor => settings.main_color.to_string(),
            toggle => on_off(settings.value_of(toggle).as_bool().unwrap_or(false)).to_string(),
        };
        let _ = writeln!(out, "  {} {}", pad_to_width(key.key(), 22), value);
    }
    out
}

/// Generated map grouped by surface group, in evaluation order.
pub fn customization_report(map: &CustomizationMap, color: bool) -> String {
    let mut out = String::new();
    let mut seen = std::collections::BTreeSet::new();
    for rule in RULES.iter() {
        let _ = writeln!(out, "[{}]", rule.group.label());
        for (key, _) in rule.surfaces {
            if !seen.insert(*key) {
                continue;
            }
            let value = match map.get(*key) {
                Some(CustomizationValue::Set(v)) => {
                    let sample = HexColor::parse(&v[..v.len().min(7)]).ok();
                    match sample {
                        Some(c) if color => format!("{} {}", swatch(&c, "  ", true), v),
                        _ => v.clone(),
                    }
                }
                Some(CustomizationValue::Clear) => "(cleared)".to_string(),
                None => "-".to_string(),
            };
            let _ = writeln!(out, "  {} {}", pad_to_width(key, 40), value);
        }
    }
    let set = map.values().filter(|v| matches!(v, CustomizationValue::Set(_))).count();
    let _ = writeln!(out, "{} of {} surfaces colored", set, surface_keys().len());
    out
}

fn entry_line(entry: &WorkspaceEntry, color: bool) -> String {
    match &entry.settings {
        Some(s) => {
            let name = truncate_to_width(&s.name, NAME_COLUMN_MAX);
            format!(
                "{} {} {}",
                swatch(&s.main_color, &format!(" {} ", pad_to_width(&name, NAME_COLUMN_MAX)), color),
                s.main_color,
                entry.reference.directory
            )
        }
        None => format!(
            " {}  (missing)  {}",
            pad_to_width("?", NAME_COLUMN_MAX),
            entry.reference.directory
        ),
    }
}

pub fn workspace_report(entries: &[WorkspaceEntry], color: bool) -> String {
    if entries.is_empty() {
        return "No projects registered.\n".to_string();
    }
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| format!("{:>3}. {}\n", i + 1, entry_line(entry, color)))
        .collect()
}

/// Groups with their members; `resolve_entries` turns references into rows.
pub fn group_report<F>(registry: &Registry, color: bool, resolve_entries: F) -> String
where
    F: Fn(&[crate::services::registry::WorkspaceReference]) -> Vec<WorkspaceEntry>,
{
    if registry.groups.is_empty() {
        return "No groups.\n".to_string();
    }
    let mut out = String::new();
    for group in &registry.groups {
        let _ = writeln!(out, "{} ({})", group.name, group.workspaces.len());
        for entry in resolve_entries(&group.workspaces) {
            let _ = writeln!(out, "    {}", entry_line(&entry, color));
        }
    }
    out
}
