//! Key handling for the dashboard.

use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pisensors_core::config::{KeyAction, KeybindingSettings};

use super::app::App;

/// One entry of the key menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    /// Keys as configured, e.g. `q` or `q/Esc`
    pub keys: String,
    /// What the keys do
    pub label: String,
}

/// Resolved key to action mapping
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    bindings: HashMap<KeyCode, KeyAction>,
    menu: Vec<MenuEntry>,
}

impl Keymap {
    /// Builds the mapping from the defaults and the user's overrides.
    ///
    /// Settings are validated on load, so unknown key names only appear
    /// here if validation was skipped; they are ignored.
    #[must_use]
    pub fn from_settings(settings: &KeybindingSettings) -> Self {
        let mut bindings = HashMap::new();
        let mut menu = Vec::new();
        for (def, keys) in settings.resolve() {
            for key in &keys {
                match parse_key(key) {
                    Some(code) => {
                        bindings.insert(code, def.action);
                    }
                    None => {
                        tracing::warn!(
                            key = %key,
                            action = def.action.name(),
                            "Ignoring unknown key"
                        );
                    }
                }
            }
            menu.push(MenuEntry {
                keys: keys.join("/"),
                label: def.label,
            });
        }
        Self { bindings, menu }
    }

    /// The action bound to `code`, if any
    #[must_use]
    pub fn action(&self, code: KeyCode) -> Option<KeyAction> {
        self.bindings.get(&code).copied()
    }

    /// Menu entries in display order
    #[must_use]
    pub fn menu(&self) -> &[MenuEntry] {
        &self.menu
    }
}

/// Maps a configured key name to a crossterm key code
#[must_use]
pub fn parse_key(name: &str) -> Option<KeyCode> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(KeyCode::Char(c));
    }
    let code = match name {
        "Esc" => KeyCode::Esc,
        "Enter" => KeyCode::Enter,
        "Tab" => KeyCode::Tab,
        "Space" => KeyCode::Char(' '),
        "Backspace" => KeyCode::Backspace,
        "Up" => KeyCode::Up,
        "Down" => KeyCode::Down,
        "Left" => KeyCode::Left,
        "Right" => KeyCode::Right,
        "PageUp" => KeyCode::PageUp,
        "PageDown" => KeyCode::PageDown,
        _ => {
            let n = name.strip_prefix('F')?.parse::<u8>().ok()?;
            return (1..=12).contains(&n).then_some(KeyCode::F(n));
        }
    };
    Some(code)
}

/// Applies one key press to the dashboard state.
///
/// Ctrl-C always quits; other chords with Ctrl or Alt are ignored.
pub fn handle_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if key.code == KeyCode::Char('c') {
            app.should_quit = true;
        }
        return;
    }
    if key.modifiers.contains(KeyModifiers::ALT) {
        return;
    }

    let Some(action) = app.keymap.action(key.code) else {
        return;
    };
    tracing::debug!(action = action.name(), "Key action");
    match action {
        KeyAction::Quit => app.should_quit = true,
        KeyAction::Refresh => app.config.request_refresh(),
        KeyAction::ToggleUnits => app.config.toggle_disk_units(),
        KeyAction::Faster => app.config.faster(),
        KeyAction::Slower => app.config.slower(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pisensors_core::config::{DashboardConfig, Settings};
    use pisensors_core::metrics::DiskUnits;

    fn app() -> App {
        App::new(
            DashboardConfig::default(),
            &Settings::default(),
            "pi@raspberrypi".to_string(),
        )
    }

    fn press(app: &mut App, c: char) {
        handle_key(app, KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
    }

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("q"), Some(KeyCode::Char('q')));
        assert_eq!(parse_key("+"), Some(KeyCode::Char('+')));
        assert_eq!(parse_key("Space"), Some(KeyCode::Char(' ')));
        assert_eq!(parse_key("Esc"), Some(KeyCode::Esc));
        assert_eq!(parse_key("F5"), Some(KeyCode::F(5)));
        assert_eq!(parse_key("F13"), None);
        assert_eq!(parse_key("Escape"), None);
        assert_eq!(parse_key(""), None);
    }

    #[test]
    fn test_default_keys() {
        let mut app = app();
        press(&mut app, 'h');
        assert_eq!(app.config.disk_units(), DiskUnits::Megabytes);
        assert!(app.config.refresh_pending());
        assert!(app.config.take_refresh_request());

        press(&mut app, 'd');
        assert!(app.config.refresh_pending());

        press(&mut app, '+');
        assert!((app.config.refresh_secs() - 0.4).abs() < 1e-9);
        press(&mut app, '-');
        press(&mut app, '-');
        assert!((app.config.refresh_secs() - 0.6).abs() < 1e-9);

        assert!(!app.should_quit);
        press(&mut app, 'q');
        assert!(app.should_quit);
    }

    #[test]
    fn test_ctrl_c_quits_and_other_chords_are_ignored() {
        let mut app = app();
        handle_key(
            &mut app,
            KeyEvent::new(KeyCode::Char('h'), KeyModifiers::CONTROL),
        );
        assert_eq!(app.config.disk_units(), DiskUnits::Human);
        handle_key(
            &mut app,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        );
        assert!(app.should_quit);
    }

    #[test]
    fn test_unbound_key_does_nothing() {
        let mut app = app();
        let before = app.config.clone();
        press(&mut app, 'x');
        assert_eq!(app.config, before);
        assert!(!app.should_quit);
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let mut settings = KeybindingSettings::default();
        settings
            .overrides
            .insert("quit".to_string(), "x|Esc".to_string());
        let keymap = Keymap::from_settings(&settings);
        assert_eq!(keymap.action(KeyCode::Char('x')), Some(KeyAction::Quit));
        assert_eq!(keymap.action(KeyCode::Esc), Some(KeyAction::Quit));
        assert_eq!(keymap.action(KeyCode::Char('q')), None);
        assert_eq!(keymap.menu()[0].keys, "x/Esc");
        assert_eq!(keymap.menu()[0].label, "Quit");
        assert_eq!(keymap.menu().len(), 5);
    }
}
