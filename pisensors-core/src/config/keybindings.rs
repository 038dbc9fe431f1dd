//! Dashboard key configuration
//!
//! Provides [`KeybindingSettings`] for user overrides and [`KeybindingDef`]
//! for the default key registry. Keys are plain strings (`"q"`, `"+"`,
//! `"Esc"`, `"F5"`); the terminal front-end maps them to key events.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Dashboard actions that can be bound to keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    /// Leave the dashboard
    Quit,
    /// Re-fetch static values and the disk table
    Refresh,
    /// Switch between human readable sizes and MiB
    ToggleUnits,
    /// Shorten the refresh interval
    Faster,
    /// Lengthen the refresh interval
    Slower,
}

impl KeyAction {
    /// Name used in `[keybindings.overrides]`
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Quit => "quit",
            Self::Refresh => "refresh",
            Self::ToggleUnits => "toggle_units",
            Self::Faster => "faster",
            Self::Slower => "slower",
        }
    }

    /// Looks up an action by its override name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        default_keybindings()
            .into_iter()
            .map(|d| d.action)
            .find(|a| a.name() == name)
    }
}

/// Custom key overrides stored in user settings.
///
/// Each entry maps an action name (e.g. `"quit"`) to one or more keys,
/// pipe-separated (e.g. `"q|Esc"`). Actions not present in `overrides`
/// use their built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeybindingSettings {
    /// Action name → key mapping.
    ///
    /// Only overridden bindings are stored; defaults are implicit.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub overrides: HashMap<String, String>,
}

/// A single keybinding definition with its default keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeybindingDef {
    /// Bound action
    pub action: KeyAction,
    /// Default key(s), pipe-separated for multiple
    pub default_keys: String,
    /// Label shown in the key menu
    pub label: String,
    /// Category for grouping in the key menu
    pub category: KeybindingCategory,
}

/// Categories for organizing keybindings in the key menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeybindingCategory {
    /// Application-level actions (quit)
    Application,
    /// What is displayed (refresh, units)
    Display,
    /// Refresh interval
    RefreshRate,
}

impl KeybindingCategory {
    /// Returns the display label for this category.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Application => "Application",
            Self::Display => "Display",
            Self::RefreshRate => "Refresh Rate",
        }
    }

    /// Returns all categories in display order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[Self::Application, Self::Display, Self::RefreshRate]
    }
}

impl KeybindingDef {
    /// Creates a new keybinding definition.
    #[must_use]
    pub fn new(
        action: KeyAction,
        default_keys: impl Into<String>,
        label: impl Into<String>,
        category: KeybindingCategory,
    ) -> Self {
        Self {
            action,
            default_keys: default_keys.into(),
            label: label.into(),
            category,
        }
    }
}

impl KeybindingSettings {
    /// Returns the key(s) for an action, falling back to the default.
    #[must_use]
    pub fn get_keys<'a>(&'a self, def: &'a KeybindingDef) -> &'a str {
        self.overrides
            .get(def.action.name())
            .map(String::as_str)
            .unwrap_or(&def.default_keys)
    }

    /// Resolves every action to its list of keys
    #[must_use]
    pub fn resolve(&self) -> Vec<(KeybindingDef, Vec<String>)> {
        default_keybindings()
            .into_iter()
            .map(|def| {
                let keys = split_keys(self.get_keys(&def))
                    .map(str::to_string)
                    .collect();
                (def, keys)
            })
            .collect()
    }

    /// Returns `true` if the user has overridden any keybindings.
    #[must_use]
    pub fn has_overrides(&self) -> bool {
        !self.overrides.is_empty()
    }

    /// Resets a single action to its default binding.
    pub fn reset(&mut self, action: KeyAction) {
        self.overrides.remove(action.name());
    }

    /// Resets all overrides.
    pub fn reset_all(&mut self) {
        self.overrides.clear();
    }

    /// Checks that every override names a known action and valid keys,
    /// and that no key ends up bound to two actions.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] describing the first problem.
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, keys) in &self.overrides {
            if KeyAction::from_name(name).is_none() {
                return Err(ConfigError::InvalidValue {
                    field: "keybindings",
                    reason: format!("unknown action {name:?}"),
                });
            }
            if let Some(bad) = split_keys(keys).find(|k| !is_valid_key(k)) {
                return Err(ConfigError::InvalidValue {
                    field: "keybindings",
                    reason: format!("invalid key {bad:?} for {name}"),
                });
            }
        }

        let mut seen: HashMap<String, KeyAction> = HashMap::new();
        for (def, keys) in self.resolve() {
            for key in keys {
                if let Some(other) = seen.insert(key.clone(), def.action) {
                    return Err(ConfigError::InvalidValue {
                        field: "keybindings",
                        reason: format!(
                            "key {key:?} is bound to both {} and {}",
                            other.name(),
                            def.action.name()
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

fn split_keys(keys: &str) -> impl Iterator<Item = &str> {
    keys.split('|').map(str::trim)
}

/// Returns the complete list of default keybinding definitions.
///
/// The order matches the key menu at the bottom of the dashboard.
#[must_use]
pub fn default_keybindings() -> Vec<KeybindingDef> {
    use KeybindingCategory::{Application, Display, RefreshRate};
    vec![
        KeybindingDef::new(KeyAction::Quit, "q", "Quit", Application),
        KeybindingDef::new(KeyAction::Refresh, "d", "Refresh", Display),
        KeybindingDef::new(KeyAction::ToggleUnits, "h", "Human units", Display),
        KeybindingDef::new(KeyAction::Faster, "+", "Faster", RefreshRate),
        KeybindingDef::new(KeyAction::Slower, "-", "Slower", RefreshRate),
    ]
}

/// Named keys accepted besides single characters
pub const NAMED_KEYS: [&str; 11] = [
    "Esc",
    "Enter",
    "Tab",
    "Space",
    "Backspace",
    "Up",
    "Down",
    "Left",
    "Right",
    "PageUp",
    "PageDown",
];

/// Validates a key string.
///
/// Accepts a single printable character, one of [`NAMED_KEYS`] or a
/// function key `F1`–`F12`.
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => !c.is_control() && !c.is_whitespace(),
        (Some(_), Some(_)) => {
            NAMED_KEYS.contains(&key)
                || key
                    .strip_prefix('F')
                    .and_then(|n| n.parse::<u8>().ok())
                    .is_some_and(|n| (1..=12).contains(&n))
        }
        _ => false,
    }
}
