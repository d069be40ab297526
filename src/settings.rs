use crate::models::{Action, KeyToken};
use serde::{Deserialize, Serialize};

/// Rendering knobs for a reading session. Treated as immutable for the
/// session's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadingSettings {
    pub lines_per_page: usize,
    pub chapters_per_page: usize,
    pub clear_on_navigate: bool,
}

impl Default for ReadingSettings {
    fn default() -> Self {
        Self {
            lines_per_page: 20,
            chapters_per_page: 10,
            clear_on_navigate: true,
        }
    }
}

impl ReadingSettings {
    pub fn merge(&mut self, other: Self) {
        self.lines_per_page = other.lines_per_page;
        self.chapters_per_page = other.chapters_per_page;
        self.clear_on_navigate = other.clear_on_navigate;
    }
}

/// Per-action key overrides as they appear in the config file. A present
/// entry replaces the built-in set for that action; absent entries keep
/// the defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyBindingOverrides {
    pub previous_chapter: Option<Vec<String>>,
    pub next_chapter: Option<Vec<String>>,
    pub exit: Option<Vec<String>>,
    pub help: Option<Vec<String>>,
    pub chapter_list: Option<Vec<String>>,
    pub reset_position: Option<Vec<String>>,
    pub scroll_to_end: Option<Vec<String>>,
    pub privacy_toggle: Option<Vec<String>>,
}

impl KeyBindingOverrides {
    /// Adopt every override another source defines, keeping local values
    /// for actions the other source leaves alone. Used when pulling the
    /// settings blob from the remote.
    pub fn apply(&mut self, other: &Self) {
        let adopt = |slot: &mut Option<Vec<String>>, value: &Option<Vec<String>>| {
            if value.is_some() {
                *slot = value.clone();
            }
        };
        adopt(&mut self.previous_chapter, &other.previous_chapter);
        adopt(&mut self.next_chapter, &other.next_chapter);
        adopt(&mut self.exit, &other.exit);
        adopt(&mut self.help, &other.help);
        adopt(&mut self.chapter_list, &other.chapter_list);
        adopt(&mut self.reset_position, &other.reset_position);
        adopt(&mut self.scroll_to_end, &other.scroll_to_end);
        adopt(&mut self.privacy_toggle, &other.privacy_toggle);
    }
}

/// The resolved key-binding table used by a session. Every action has a
/// non-empty set of tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyBindings {
    pub previous_chapter: Vec<String>,
    pub next_chapter: Vec<String>,
    pub exit: Vec<String>,
    pub help: Vec<String>,
    pub chapter_list: Vec<String>,
    pub reset_position: Vec<String>,
    pub scroll_to_end: Vec<String>,
    pub privacy_toggle: Vec<String>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            previous_chapter: keys(&["[", "up", "1"]),
            next_chapter: keys(&["]", "down", "2"]),
            exit: keys(&["q", "ctrl+c"]),
            help: keys(&["h", "?"]),
            chapter_list: keys(&["g"]),
            reset_position: keys(&["r", "home"]),
            scroll_to_end: keys(&["e", "end"]),
            privacy_toggle: keys(&["p"]),
        }
    }
}

fn keys(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}

impl KeyBindings {
    /// Apply user overrides on top of the defaults. Overrides replace the
    /// built-in set per action; an empty override falls back to the
    /// default so no action ever ends up unbound.
    pub fn merged(overrides: &KeyBindingOverrides) -> Self {
        let mut table = Self::default();
        let apply = |slot: &mut Vec<String>, value: &Option<Vec<String>>| {
            if let Some(tokens) = value
                && !tokens.is_empty()
            {
                *slot = tokens.clone();
            }
        };
        apply(&mut table.previous_chapter, &overrides.previous_chapter);
        apply(&mut table.next_chapter, &overrides.next_chapter);
        apply(&mut table.exit, &overrides.exit);
        apply(&mut table.help, &overrides.help);
        apply(&mut table.chapter_list, &overrides.chapter_list);
        apply(&mut table.reset_position, &overrides.reset_position);
        apply(&mut table.scroll_to_end, &overrides.scroll_to_end);
        apply(&mut table.privacy_toggle, &overrides.privacy_toggle);
        table
    }

    pub fn tokens_for(&self, action: Action) -> &[String] {
        match action {
            Action::Exit => &self.exit,
            Action::PreviousChapter => &self.previous_chapter,
            Action::NextChapter => &self.next_chapter,
            Action::Help => &self.help,
            Action::ResetPosition => &self.reset_position,
            Action::ChapterList => &self.chapter_list,
            Action::PrivacyToggle => &self.privacy_toggle,
            Action::ScrollToEnd => &self.scroll_to_end,
        }
    }

    /// Resolve a token to a logical action. Actions are checked in the
    /// fixed priority order, so a token bound to two actions always
    /// resolves to the higher-priority one.
    pub fn resolve(&self, token: &KeyToken) -> Option<Action> {
        Action::PRIORITY
            .into_iter()
            .find(|action| self.tokens_for(*action).iter().any(|b| matches_token(b, token)))
    }
}

/// Compare a configured binding against a normalized key token.
/// Single-character bindings match case-insensitively; named keys and
/// control chords match exactly.
pub fn matches_token(binding: &str, token: &KeyToken) -> bool {
    match token {
        KeyToken::Char(c) => {
            if binding == "space" {
                return *c == ' ';
            }
            let mut chars = binding.chars();
            match (chars.next(), chars.next()) {
                (Some(b), None) => b.to_lowercase().eq(c.to_lowercase()),
                _ => false,
            }
        }
        KeyToken::Named(name) => binding == *name,
        KeyToken::Ctrl(c) => {
            let Some(rest) = binding.strip_prefix("ctrl+") else {
                return false;
            };
            let mut chars = rest.chars();
            matches!((chars.next(), chars.next()), (Some(b), None) if b.eq_ignore_ascii_case(c))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_leave_no_action_unbound() {
        let table = KeyBindings::default();
        for action in Action::PRIORITY {
            assert!(
                !table.tokens_for(action).is_empty(),
                "{:?} has no bindings",
                action
            );
        }
    }

    #[test]
    fn test_override_replaces_only_named_action() {
        let overrides = KeyBindingOverrides {
            next_chapter: Some(keys(&["n"])),
            ..Default::default()
        };
        let table = KeyBindings::merged(&overrides);
        assert_eq!(table.next_chapter, keys(&["n"]));
        // Unspecified actions keep the built-in set.
        assert_eq!(table.previous_chapter, KeyBindings::default().previous_chapter);
    }

    #[test]
    fn test_empty_override_falls_back_to_default() {
        let overrides = KeyBindingOverrides {
            exit: Some(Vec::new()),
            ..Default::default()
        };
        let table = KeyBindings::merged(&overrides);
        assert_eq!(table.exit, KeyBindings::default().exit);
    }

    #[test]
    fn test_char_matching_is_case_insensitive() {
        assert!(matches_token("q", &KeyToken::Char('Q')));
        assert!(matches_token("Q", &KeyToken::Char('q')));
        assert!(!matches_token("q", &KeyToken::Char('x')));
    }

    #[test]
    fn test_named_and_ctrl_matching_is_exact() {
        assert!(matches_token("up", &KeyToken::Named("up")));
        assert!(!matches_token("u", &KeyToken::Named("up")));
        assert!(!matches_token("UP", &KeyToken::Named("up")));
        assert!(matches_token("ctrl+c", &KeyToken::Ctrl('c')));
        assert!(matches_token("ctrl+c", &KeyToken::Ctrl('C')));
        assert!(!matches_token("c", &KeyToken::Ctrl('c')));
    }

    #[test]
    fn test_space_binding() {
        assert!(matches_token("space", &KeyToken::Char(' ')));
        assert!(matches_token(" ", &KeyToken::Char(' ')));
    }

    #[test]
    fn test_resolution_priority_on_conflicting_binding() {
        // Bind "x" to both exit and scroll-to-end; exit outranks it.
        let overrides = KeyBindingOverrides {
            exit: Some(keys(&["x"])),
            scroll_to_end: Some(keys(&["x"])),
            ..Default::default()
        };
        let table = KeyBindings::merged(&overrides);
        assert_eq!(table.resolve(&KeyToken::Char('x')), Some(Action::Exit));
    }

    #[test]
    fn test_resolve_unbound_token() {
        let table = KeyBindings::default();
        assert_eq!(table.resolve(&KeyToken::Char('z')), None);
        assert_eq!(table.resolve(&KeyToken::Named("up")), Some(Action::PreviousChapter));
        assert_eq!(table.resolve(&KeyToken::Ctrl('c')), Some(Action::Exit));
    }

    #[test]
    fn test_overrides_apply_keeps_unset_fields() {
        let mut local = KeyBindingOverrides {
            exit: Some(keys(&["x"])),
            help: Some(keys(&["i"])),
            ..Default::default()
        };
        let remote = KeyBindingOverrides {
            help: Some(keys(&["?"])),
            next_chapter: Some(keys(&["n"])),
            ..Default::default()
        };
        local.apply(&remote);
        assert_eq!(local.exit, Some(keys(&["x"])));
        assert_eq!(local.help, Some(keys(&["?"])));
        assert_eq!(local.next_chapter, Some(keys(&["n"])));
    }

    #[test]
    fn test_reading_settings_defaults() {
        let settings = ReadingSettings::default();
        assert_eq!(settings.lines_per_page, 20);
        assert_eq!(settings.chapters_per_page, 10);
        assert!(settings.clear_on_navigate);
    }
}
