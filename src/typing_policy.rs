use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::session::SessionState;

/// A physical key as delivered by the host event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Backspace,
    Char(char),
    /// Modifiers, navigation and anything else that is never scored.
    Other(String),
}

impl Key {
    /// Classify a browser-style key name: `"Backspace"`, a single character,
    /// or a named key such as `"Shift"`.
    pub fn parse(name: &str) -> Self {
        if name == "Backspace" {
            return Key::Backspace;
        }
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Key::Char(c),
            _ => Key::Other(name.to_string()),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Key::Backspace => "⌫".to_string(),
            Key::Char(' ') => "Space".to_string(),
            Key::Char(c) => c.to_uppercase().collect(),
            Key::Other(name) => match name.as_str() {
                "Enter" => "↵".to_string(),
                "CapsLock" => "Caps".to_string(),
                "Control" => "Ctrl".to_string(),
                "AltGraph" => "AltGr".to_string(),
                "Escape" => "Esc".to_string(),
                "ArrowUp" => "↑".to_string(),
                "ArrowDown" => "↓".to_string(),
                "ArrowLeft" => "←".to_string(),
                "ArrowRight" => "→".to_string(),
                other => other.to_string(),
            },
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::parse(name)
    }
}

impl From<KeyEvent> for Key {
    fn from(event: KeyEvent) -> Self {
        match event.code {
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Char(c)
                if !event
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                Key::Char(c)
            }
            KeyCode::Enter => Key::Other("Enter".to_string()),
            KeyCode::Tab => Key::Other("Tab".to_string()),
            KeyCode::Esc => Key::Other("Escape".to_string()),
            KeyCode::Up => Key::Other("ArrowUp".to_string()),
            KeyCode::Down => Key::Other("ArrowDown".to_string()),
            KeyCode::Left => Key::Other("ArrowLeft".to_string()),
            KeyCode::Right => Key::Other("ArrowRight".to_string()),
            other => Key::Other(format!("{other:?}")),
        }
    }
}

/// Write a printable character at the cursor.
///
/// Errors are counted per keystroke: a mismatch increments `errors` and the
/// cursor advances either way. Returns `false` when the cursor is already at
/// the end of the reference text, in which case the keystroke is dropped.
pub fn write_char(state: &mut SessionState, c: char) -> bool {
    let Some(&expected) = state.reference.get(state.cursor_pos) else {
        return false;
    };
    if c != expected {
        state.errors += 1;
    }
    state.input.push(c);
    state.cursor_pos += 1;
    true
}

/// Remove the last typed character. The error count is left untouched.
pub fn delete_char(state: &mut SessionState) -> bool {
    if state.input.pop().is_none() {
        return false;
    }
    state.cursor_pos = state.cursor_pos.saturating_sub(1);
    true
}
