// Keyboard shortcuts and their help-window descriptions.

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Pan,
    New,
    Save,
    Import,
    Export,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Meta {
    None,
    Control,
    Alt,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Trigger {
    Key { key: &'static str, meta: Meta },
    // Pointer gestures can't be dispatched from a key press; they only show up in help.
    Gesture(&'static str),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Shortcut {
    pub name: &'static str,
    pub action: Action,
    pub trigger: Trigger,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
}

pub const SHORTCUTS: &[Shortcut] = &[
    Shortcut { name: "Pan", action: Action::Pan, trigger: Trigger::Gesture("Hold CTRL, then click and drag") },
    Shortcut { name: "New", action: Action::New, trigger: Trigger::Key { key: "N", meta: Meta::Alt } },
    Shortcut { name: "Save", action: Action::Save, trigger: Trigger::Key { key: "S", meta: Meta::Control } },
    Shortcut { name: "Import", action: Action::Import, trigger: Trigger::Key { key: "F8", meta: Meta::None } },
    Shortcut { name: "Export", action: Action::Export, trigger: Trigger::Key { key: "F9", meta: Meta::None } },
];

impl Shortcut {
    pub fn matches(&self, key: &str, mods: Modifiers) -> bool {
        let Trigger::Key { key: want, meta } = self.trigger else { return false };
        if !want.eq_ignore_ascii_case(key) {
            return false;
        }
        match meta {
            Meta::None => true,
            Meta::Control => mods.ctrl,
            Meta::Alt => mods.alt,
        }
    }

    pub fn describe(&self) -> String {
        match self.trigger {
            Trigger::Gesture(text) => text.to_string(),
            Trigger::Key { key, meta: Meta::None } => key.to_uppercase(),
            Trigger::Key { key, meta: Meta::Control } => format!("CTRL + {}", key.to_uppercase()),
            Trigger::Key { key, meta: Meta::Alt } => format!("ALT + {}", key.to_uppercase()),
        }
    }
}

pub fn match_shortcut(key: &str, mods: Modifiers) -> Option<Action> {
    SHORTCUTS.iter().find(|s| s.matches(key, mods)).map(|s| s.action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_need_their_modifier() {
        let ctrl = Modifiers { ctrl: true, alt: false };
        let alt = Modifiers { ctrl: false, alt: true };
        assert_eq!(match_shortcut("s", ctrl), Some(Action::Save));
        assert_eq!(match_shortcut("s", Modifiers::default()), None);
        assert_eq!(match_shortcut("N", alt), Some(Action::New));
        assert_eq!(match_shortcut("n", ctrl), None);
        assert_eq!(match_shortcut("F8", Modifiers::default()), Some(Action::Import));
        assert_eq!(match_shortcut("F9", ctrl), Some(Action::Export));
        assert_eq!(match_shortcut("x", ctrl), None);
    }

    #[test]
    fn pan_is_never_matched_by_a_key() {
        assert!(SHORTCUTS.iter().all(|s| s.action != Action::Pan || !s.matches("Pan", Modifiers::default())));
    }

    #[test]
    fn help_labels() {
        let labels: Vec<String> = SHORTCUTS.iter().map(Shortcut::describe).collect();
        assert_eq!(labels, vec!["Hold CTRL, then click and drag", "ALT + N", "CTRL + S", "F8", "F9"]);
    }
}
