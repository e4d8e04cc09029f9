//! UI rendering for the parkwatch views.
//!
//! # Layout Structure
//!
//! ```text
//! +--------------------------------------------------+
//! |  Header: title, source status, zone counts       |  <- 3 lines
//! +-------------------------------+------------------+
//! | Annotated frame (local view)  | Zone board       |  <- fills remaining
//! | (70%)                         | (30%)            |
//! |                               | [X] Zone 1       |
//! |                               | [ ] Zone 2       |
//! +-------------------------------+------------------+
//! |  Footer: keybinding hints                        |  <- 3 lines
//! +--------------------------------------------------+
//! ```
//!
//! The networked board has no frames and gives the board the full width.
//! The mark tool shows only the frame.

pub mod board;
pub mod frame_view;
pub mod layout;
pub mod status_bar;
pub mod theme;

use crate::app::App;
use crate::mark::MarkSession;
use layout::AppLayout;
use parkwatch_core::Frame as RgbFrame;
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub use board::render_board;
pub use frame_view::{FrameView, FrameViewport};
pub use status_bar::{render_footer, render_header};

const VIEW_HINTS: &[(&str, &str)] = &[("q", "quit")];
const MARK_HINTS: &[(&str, &str)] = &[("click", "add corner"), ("u", "undo"), ("q", "finish")];

/// Renders the networked board.
pub fn render(frame: &mut Frame, app: &App) {
    let layout = AppLayout::board(frame.area());
    render_header(frame, layout.header, app);
    render_board(frame, layout.board_area, app);
    render_footer(frame, layout.footer, VIEW_HINTS);
}

/// Renders the local view: annotated frame beside the board.
pub fn render_local(frame: &mut Frame, app: &App) {
    let layout = AppLayout::with_frame(frame.area());
    render_header(frame, layout.header, app);

    let block = Block::default().borders(Borders::ALL).title(match &app.frame {
        Some(rendered) => format!(" Frame {} ({} detections) ", rendered.index, rendered.detections),
        None => " Frame ".to_string(),
    });
    let inner = block.inner(layout.frame_area);
    frame.render_widget(block, layout.frame_area);
    match &app.frame {
        Some(rendered) => frame.render_widget(FrameView::new(&rendered.image), inner),
        None => frame.render_widget(
            Paragraph::new(Span::styled(
                "Waiting for first frame...",
                Style::default().fg(Color::DarkGray),
            )),
            inner,
        ),
    }

    render_board(frame, layout.board_area, app);
    render_footer(frame, layout.footer, VIEW_HINTS);
}

/// Renders the mark tool and returns where the frame was drawn, so
/// mouse clicks can be mapped back to frame coordinates.
pub fn render_mark(frame: &mut Frame, session: &MarkSession, image: &RgbFrame) -> Option<FrameViewport> {
    let layout = AppLayout::frame_only(frame.area());

    let header_line = Line::from(vec![
        Span::styled(
            "parkwatch mark",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " | {} zone{} | corner {}/{}",
            session.zones().len(),
            if session.zones().len() == 1 { "" } else { "s" },
            session.pending().len() + 1,
            crate::mark::POINTS_PER_ZONE
        )),
        Span::styled(
            match session.pending().last() {
                Some(point) => format!(" | last {point}"),
                None => String::new(),
            },
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(
        Paragraph::new(header_line).block(Block::default().borders(Borders::ALL)),
        layout.header,
    );

    let view = FrameView::new(image);
    let viewport = view.viewport(layout.frame_area);
    frame.render_widget(view, layout.frame_area);

    render_footer(frame, layout.footer, MARK_HINTS);
    viewport
}
