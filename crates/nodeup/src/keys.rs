//! Key classification shared by the handlers.

use crate::model::TextInput;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub fn is_quit(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

pub fn is_debug_toggle(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('d') && key.modifiers.contains(KeyModifiers::CONTROL)
}

pub fn is_enter(key: &KeyEvent) -> bool {
    key.code == KeyCode::Enter
}

pub fn is_esc(key: &KeyEvent) -> bool {
    key.code == KeyCode::Esc
}

/// Plain character typed without Ctrl/Alt, lowercased.
pub fn letter(key: &KeyEvent) -> Option<char> {
    match key.code {
        KeyCode::Char(c)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            Some(c.to_ascii_lowercase())
        }
        _ => None,
    }
}

pub fn is_yes(key: &KeyEvent) -> bool {
    letter(key) == Some('y')
}

pub fn is_no(key: &KeyEvent) -> bool {
    letter(key) == Some('n')
}

/// Apply typing/backspace to an input. Returns true when the key was consumed.
pub fn edit_text(input: &mut TextInput, key: &KeyEvent, accept: impl Fn(char) -> bool) -> bool {
    match key.code {
        KeyCode::Backspace => {
            input.backspace();
            true
        }
        KeyCode::Char(c)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                && accept(c) =>
        {
            input.push(c);
            true
        }
        _ => false,
    }
}
