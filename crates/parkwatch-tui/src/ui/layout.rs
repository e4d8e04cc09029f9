//! Layout helpers for the parkwatch views.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Main view layout areas.
///
/// Every view has a 3-line header and a 3-line footer. The content area
/// holds the frame view, the zone board, or both side by side.
#[derive(Debug, Clone, Copy)]
pub struct AppLayout {
    /// Header area for title and status
    pub header: Rect,
    /// Annotated frame (empty when the view has no frame)
    pub frame_area: Rect,
    /// Zone board (empty when the view has no board)
    pub board_area: Rect,
    /// Footer area for keybindings
    pub footer: Rect,
}

impl AppLayout {
    /// Board only: the networked client has no frames.
    pub fn board(area: Rect) -> Self {
        let [header, content, footer] = split_vertical(area);
        Self {
            header,
            frame_area: Rect::default(),
            board_area: content,
            footer,
        }
    }

    /// Frame (70%) next to the board (30%), for the local view.
    pub fn with_frame(area: Rect) -> Self {
        let [header, content, footer] = split_vertical(area);
        let [frame_area, board_area] = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .areas(content);
        Self {
            header,
            frame_area,
            board_area,
            footer,
        }
    }

    /// Frame across the whole content area, for the mark tool.
    pub fn frame_only(area: Rect) -> Self {
        let [header, content, footer] = split_vertical(area);
        Self {
            header,
            frame_area: content,
            board_area: Rect::default(),
            footer,
        }
    }
}

fn split_vertical(area: Rect) -> [Rect; 3] {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(5),    // Content
            Constraint::Length(3), // Footer
        ])
        .areas(area)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_layout() {
        let layout = AppLayout::board(Rect::new(0, 0, 80, 24));
        assert_eq!(layout.header.height, 3);
        assert_eq!(layout.footer.y + layout.footer.height, 24);
        assert_eq!(layout.board_area.width, 80);
        assert_eq!(layout.board_area.y, 3);
        assert!(layout.frame_area.is_empty());
    }

    #[test]
    fn test_frame_and_board_split() {
        let layout = AppLayout::with_frame(Rect::new(0, 0, 100, 30));
        assert_eq!(layout.frame_area.width, 70);
        assert_eq!(layout.board_area.width, 30);
        assert_eq!(layout.board_area.x, 70);
    }

    #[test]
    fn test_frame_only_layout() {
        let layout = AppLayout::frame_only(Rect::new(0, 0, 80, 24));
        assert_eq!(layout.frame_area.width, 80);
        assert_eq!(layout.frame_area.height, 18);
        assert!(layout.board_area.is_empty());
    }
}
