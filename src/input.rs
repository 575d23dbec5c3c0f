//! Key bindings: normal and vim-style.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    Select,
    Reshuffle,
    Restart,
    Info,
    Quit,
    None,
}

/// Map key event to game action. Supports both normal (arrows, enter) and vim (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Up | KeyCode::Char('k') => Action::Up,
        KeyCode::Down | KeyCode::Char('j') => Action::Down,
        KeyCode::Left | KeyCode::Char('h') => Action::Left,
        KeyCode::Right | KeyCode::Char('l') => Action::Right,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Select,
        KeyCode::Char('r') | KeyCode::Char('R') => Action::Reshuffle,
        KeyCode::Char('n') | KeyCode::Char('N') => Action::Restart,
        KeyCode::Char('i') | KeyCode::Char('I') | KeyCode::Char('?') => Action::Info,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> Action {
        key_to_action(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn arrows_and_vim_keys_move() {
        assert_eq!(press(KeyCode::Up), Action::Up);
        assert_eq!(press(KeyCode::Char('k')), Action::Up);
        assert_eq!(press(KeyCode::Char('j')), Action::Down);
        assert_eq!(press(KeyCode::Char('h')), Action::Left);
        assert_eq!(press(KeyCode::Right), Action::Right);
    }

    #[test]
    fn game_keys() {
        assert_eq!(press(KeyCode::Enter), Action::Select);
        assert_eq!(press(KeyCode::Char(' ')), Action::Select);
        assert_eq!(press(KeyCode::Char('r')), Action::Reshuffle);
        assert_eq!(press(KeyCode::Char('n')), Action::Restart);
        assert_eq!(press(KeyCode::Char('i')), Action::Info);
        assert_eq!(press(KeyCode::Esc), Action::Quit);
        assert_eq!(press(KeyCode::Char('x')), Action::None);
    }

    #[test]
    fn control_chords_are_ignored() {
        let key = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(key), Action::None);
    }
}
