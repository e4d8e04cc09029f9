//! Keyboard input handling and event types for the parkwatch views.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

use crate::app::App;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use parkwatch_core::OccupancyMap;

// ============================================================================
// Event Types
// ============================================================================

/// Events driving the board's main loop.
#[derive(Debug, Clone)]
pub enum Event {
    /// Keyboard input from the user.
    Key(KeyEvent),

    /// Terminal window resize event.
    Resize(u16, u16),

    /// Handshake with the daemon completed.
    DaemonConnected {
        /// Identifier the daemon assigned to this connection.
        client_id: String,
    },

    /// Full occupancy map pushed by the daemon.
    Update(OccupancyMap),

    /// Connection to the daemon was lost.
    DaemonDisconnected,
}

// ============================================================================
// Action Types
// ============================================================================

/// What the main loop should do after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No action required.
    None,

    /// Quit the application.
    Quit,
}

// ============================================================================
// Input Handler
// ============================================================================

/// Returns true for the keys that end every view: `q`, `Q`, `Esc`, `Ctrl+C`.
pub fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }
    matches!(
        key.code,
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc
    )
}

/// Handles a keyboard event for the board and local views.
///
/// # Key Bindings
///
/// | Key          | Action                              |
/// |--------------|-------------------------------------|
/// | `q`, `Q`     | Quit the application                |
/// | `Esc`        | Quit the application                |
/// | `Ctrl+C`     | Quit the application                |
#[must_use]
pub fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    if is_quit_key(&key) {
        app.quit();
        return Action::Quit;
    }
    Action::None
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn key_event(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_quit_keys() {
        for code in [KeyCode::Char('q'), KeyCode::Char('Q'), KeyCode::Esc] {
            let mut app = App::new();
            assert_eq!(handle_key_event(key_event(code), &mut app), Action::Quit);
            assert!(app.should_quit);
        }
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut app = App::new();
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key_event(key, &mut app), Action::Quit);
        assert!(app.should_quit);
    }

    #[test]
    fn test_plain_c_does_not_quit() {
        let mut app = App::new();
        assert_eq!(
            handle_key_event(key_event(KeyCode::Char('c')), &mut app),
            Action::None
        );
        assert!(!app.should_quit);
    }

    #[test]
    fn test_key_release_ignored() {
        let mut key = key_event(KeyCode::Char('q'));
        key.kind = KeyEventKind::Release;
        assert!(!is_quit_key(&key));
    }

    #[test]
    fn test_other_keys_ignored() {
        let mut app = App::new();
        for code in [KeyCode::Char('j'), KeyCode::Enter, KeyCode::Up] {
            assert_eq!(handle_key_event(key_event(code), &mut app), Action::None);
        }
        assert!(!app.should_quit);
    }
}
