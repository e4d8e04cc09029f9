//! In-process view over a [`StateStore`].
//!
//! A dedicated OS thread polls the store, draws the latest annotated frame
//! next to the zone board, and watches the keyboard. The crossterm event
//! poll doubles as the frame pacer, so the store is read roughly every
//! [`RENDER_POLL`]. Quitting cancels the shared token, which stops the
//! producer and the network server as well.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent};
use parkwatch_core::StateStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::app::App;
use crate::error::Result;
use crate::input::{handle_key_event, Action};
use crate::terminal::{cleanup_terminal, setup_terminal, Tui};
use crate::ui;

/// Store polling interval.
pub const RENDER_POLL: Duration = Duration::from_millis(30);

pub struct LocalView {
    store: StateStore,
    cancel_token: CancellationToken,
    poll: Duration,
}

impl LocalView {
    pub fn new(store: StateStore, cancel_token: CancellationToken) -> Self {
        Self {
            store,
            cancel_token,
            poll: RENDER_POLL,
        }
    }

    pub fn with_poll(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    /// Runs the view on a named OS thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<Result<()>>> {
        thread::Builder::new()
            .name("render".to_string())
            .spawn(move || self.run())
    }

    /// Takes over the terminal until quit or cancellation.
    pub fn run(self) -> Result<()> {
        let mut terminal = setup_terminal(false)?;
        let result = self.event_loop(&mut terminal);
        let cleanup = cleanup_terminal(&mut terminal, false);
        result?;
        cleanup
    }

    fn event_loop(&self, terminal: &mut Tui) -> Result<()> {
        let mut app = App::local();
        info!(poll_ms = self.poll.as_millis() as u64, "Local view started");

        loop {
            if self.cancel_token.is_cancelled() {
                debug!("Local view cancelled");
                return Ok(());
            }

            self.refresh(&mut app);
            terminal.draw(|frame| ui::render_local(frame, &app))?;

            if !event::poll(self.poll)? {
                continue;
            }
            if let CrosstermEvent::Key(key) = event::read()? {
                if handle_key_event(key, &mut app) == Action::Quit {
                    info!("User requested quit");
                    self.cancel_token.cancel();
                    return Ok(());
                }
            }
        }
    }

    /// Pulls the latest snapshot into the view state.
    fn refresh(&self, app: &mut App) {
        app.apply_snapshot(self.store.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parkwatch_core::{
        Frame, OccupancyMap, Point, RenderedFrame, ZoneId, ZoneRegistry, ZoneState,
    };
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    fn store() -> StateStore {
        let zones = ZoneRegistry::from_polygons(vec![vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ]])
        .unwrap();
        StateStore::new(&zones)
    }

    #[test]
    fn test_refresh_follows_store_updates() {
        let store = store();
        let view = LocalView::new(store.clone(), CancellationToken::new());
        let mut app = App::local();

        view.refresh(&mut app);
        assert_eq!(app.occupied_count(), 0);
        assert!(app.frame.is_none());

        let frame = Arc::new(RenderedFrame {
            index: 1,
            image: Frame::filled(16, 16, [0, 0, 0]).unwrap(),
            detections: 1,
            captured_at: Utc::now(),
        });
        store.replace(
            OccupancyMap::from_entries([(ZoneId::numbered(1), ZoneState::Occupied)]),
            frame,
        );
        view.refresh(&mut app);

        assert_eq!(app.occupied_count(), 1);
        assert_eq!(app.version, 1);
        assert_eq!(app.frame.as_ref().map(|f| f.index), Some(1));
    }

    #[test]
    fn test_renders_refreshed_state() {
        let store = store();
        let view = LocalView::new(store, CancellationToken::new()).with_poll(Duration::from_millis(5));
        let mut app = App::local();
        view.refresh(&mut app);

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| ui::render_local(frame, &app)).unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("Zone 1"));
        assert!(text.contains("starting"));
    }
}
