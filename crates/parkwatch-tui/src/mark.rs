//! Interactive zone marking.
//!
//! Shows one frame, records a corner per mouse click and closes a zone on
//! its fourth corner. `u` drops the last pending corner; `q` finishes and
//! hands back the session so the caller can print the zone file.
//!
//! Corners are taken as clicked: no convexity or self-intersection checks.

use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyCode, MouseButton, MouseEventKind};
use parkwatch_core::{
    draw_marker, draw_path, ConfigResult, Frame, Point, ZoneEntry, ZoneFile, FREE_COLOR,
    MARKER_COLOR,
};
use tracing::{debug, info};

use crate::error::Result;
use crate::input::is_quit_key;
use crate::terminal::{cleanup_terminal, setup_terminal, Tui};
use crate::ui::{self, FrameViewport};

/// Corners per zone; the zone is closed on the last one.
pub const POINTS_PER_ZONE: usize = 4;

const EVENT_POLL: Duration = Duration::from_millis(50);

/// Zones marked so far on a single frame.
#[derive(Debug, Clone)]
pub struct MarkSession {
    frame: Frame,
    zones: Vec<Vec<Point>>,
    pending: Vec<Point>,
}

impl MarkSession {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            zones: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Records a corner. Returns the 1-based zone number when this click
    /// closed a zone.
    pub fn click(&mut self, point: Point) -> Option<usize> {
        self.pending.push(point);
        debug!(x = point.x, y = point.y, pending = self.pending.len(), "Corner recorded");
        if self.pending.len() < POINTS_PER_ZONE {
            return None;
        }
        self.zones.push(std::mem::take(&mut self.pending));
        info!(zone = self.zones.len(), "Zone marked");
        Some(self.zones.len())
    }

    /// Drops the most recent pending corner. Finished zones are kept.
    pub fn undo(&mut self) -> Option<Point> {
        self.pending.pop()
    }

    pub fn zones(&self) -> &[Vec<Point>] {
        &self.zones
    }

    pub fn pending(&self) -> &[Point] {
        &self.pending
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Finished zones as a zone file; ids default to `Zone {n}` on load.
    pub fn zone_file(&self) -> ZoneFile {
        ZoneFile {
            zones: self
                .zones
                .iter()
                .map(|points| ZoneEntry {
                    id: None,
                    points: points.clone(),
                })
                .collect(),
        }
    }

    /// Finished zones in the TOML zone format. The pending corners of an
    /// unfinished zone are discarded.
    pub fn to_toml(&self) -> ConfigResult<String> {
        self.zone_file().to_toml_string()
    }

    /// The frame with finished zones outlined and pending corners marked.
    pub fn render(&self) -> Frame {
        let mut frame = self.frame.clone();
        for zone in &self.zones {
            draw_path(&mut frame, zone, true, FREE_COLOR);
        }
        draw_path(&mut frame, &self.pending, false, MARKER_COLOR);
        for point in &self.pending {
            draw_marker(&mut frame, *point, MARKER_COLOR);
        }
        frame
    }

    /// Runs the interactive loop on the terminal until `q`.
    pub fn run(self) -> Result<Self> {
        let mut terminal = setup_terminal(true)?;
        let result = self.event_loop(&mut terminal);
        // Restore even when the loop failed; report the loop error first
        let cleanup = cleanup_terminal(&mut terminal, true);
        let session = result?;
        cleanup?;
        Ok(session)
    }

    fn event_loop(mut self, terminal: &mut Tui) -> Result<Self> {
        let mut image = self.render();
        let mut viewport: Option<FrameViewport> = None;

        loop {
            terminal.draw(|frame| viewport = ui::render_mark(frame, &self, &image))?;

            if !event::poll(EVENT_POLL)? {
                continue;
            }
            let changed = match event::read()? {
                CrosstermEvent::Key(key) if is_quit_key(&key) => {
                    info!(zones = self.zones.len(), "Marking finished");
                    return Ok(self);
                }
                CrosstermEvent::Key(key) if key.code == KeyCode::Char('u') => {
                    self.undo().is_some()
                }
                CrosstermEvent::Mouse(mouse)
                    if mouse.kind == MouseEventKind::Down(MouseButton::Left) =>
                {
                    match viewport.and_then(|v| v.cell_to_frame(mouse.column, mouse.row)) {
                        Some(point) => {
                            self.click(point);
                            true
                        }
                        None => false,
                    }
                }
                _ => false,
            };

            if changed {
                image = self.render();
            }
        }
    }
}
