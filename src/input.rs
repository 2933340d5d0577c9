//! Key bindings: arrows and vim-style letters.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use sandblast::Command;

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    Rotate,
    SoftDrop,
    HardDrop,
    Pause,
    Restart,
    Quit,
    None,
}

impl Action {
    /// The session command behind a gameplay action.
    pub fn command(self) -> Option<Command> {
        match self {
            Self::MoveLeft => Some(Command::MoveLeft),
            Self::MoveRight => Some(Command::MoveRight),
            Self::Rotate => Some(Command::Rotate),
            Self::SoftDrop => Some(Command::SoftDrop),
            Self::HardDrop => Some(Command::HardDrop),
            _ => None,
        }
    }
}

pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    match code {
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p' | 'P') => Action::Pause,
        KeyCode::Char('r' | 'R') => Action::Restart,
        KeyCode::Left | KeyCode::Char('h' | 'a') => Action::MoveLeft,
        KeyCode::Right | KeyCode::Char('l' | 'd') => Action::MoveRight,
        KeyCode::Up | KeyCode::Char('k' | 'w') => Action::Rotate,
        KeyCode::Down | KeyCode::Char('j' | 's') => Action::SoftDrop,
        KeyCode::Enter | KeyCode::Char(' ') => Action::HardDrop,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn arrows_and_vim_keys_agree() {
        assert_eq!(key_to_action(key(KeyCode::Left)), key_to_action(key(KeyCode::Char('h'))));
        assert_eq!(key_to_action(key(KeyCode::Up)), Action::Rotate);
        assert_eq!(key_to_action(key(KeyCode::Char(' '))), Action::HardDrop);
    }

    #[test]
    fn ctrl_c_quits_other_chords_ignored() {
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Left, KeyModifiers::ALT)),
            Action::None
        );
    }

    #[test]
    fn only_gameplay_actions_map_to_commands() {
        assert_eq!(Action::SoftDrop.command(), Some(Command::SoftDrop));
        assert_eq!(Action::Pause.command(), None);
    }
}
