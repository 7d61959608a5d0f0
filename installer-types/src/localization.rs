// SPDX-License-Identifier: GPL-3.0-only

//! Localization domain state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizationState {
    pub language: String,
    pub language_support: Vec<String>,
    /// Whether the language was provided by kickstart.
    pub language_seen: bool,
    /// Virtual console keymap.
    pub vc_keymap: String,
    pub x_layouts: Vec<String>,
    pub layout_switch_options: Vec<String>,
    pub keyboard_seen: bool,
}

impl LocalizationState {
    /// The keymap to configure: the console keymap wins, then the first X
    /// layout.
    pub fn effective_keyboard(&self) -> Option<&str> {
        if !self.vc_keymap.is_empty() {
            return Some(&self.vc_keymap);
        }
        self.x_layouts.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_keymap_wins_over_layouts() {
        let mut state = LocalizationState {
            x_layouts: vec!["cz (qwerty)".into()],
            ..Default::default()
        };
        assert_eq!(state.effective_keyboard(), Some("cz (qwerty)"));
        state.vc_keymap = "cz".into();
        assert_eq!(state.effective_keyboard(), Some("cz"));
    }
}
