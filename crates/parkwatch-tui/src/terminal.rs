//! Terminal setup and cleanup shared by all views.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.

use std::io::{self, Stdout};

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::error::{Result, TuiError};

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Initializes the terminal for rendering.
///
/// Sets up raw mode and the alternate screen buffer; mouse capture is
/// enabled only for the mark tool, which needs click positions.
pub fn setup_terminal(mouse: bool) -> Result<Tui> {
    enable_raw_mode().map_err(|e| TuiError::TerminalInit(e.to_string()))?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).map_err(|e| TuiError::TerminalInit(e.to_string()))?;
    if mouse {
        execute!(stdout, EnableMouseCapture).map_err(|e| TuiError::TerminalInit(e.to_string()))?;
    }

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| TuiError::TerminalInit(e.to_string()))
}

/// Restores the terminal to its original state.
///
/// This should always be called before exiting, even on error.
pub fn cleanup_terminal(terminal: &mut Tui, mouse: bool) -> Result<()> {
    disable_raw_mode().map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    if mouse {
        execute!(terminal.backend_mut(), DisableMouseCapture)
            .map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;
    }
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    terminal
        .show_cursor()
        .map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    Ok(())
}
