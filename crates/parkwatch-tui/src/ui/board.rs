//! Zone board widget: one row per zone in registry order.

use crate::app::{App, ConnectionState};
use crate::ui::theme::{occupancy_color, zone_state_color, zone_state_icon};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table},
    Frame,
};

/// Renders the zone board with a summary title.
pub fn render_board(frame: &mut Frame, area: Rect, app: &App) {
    let title = Line::from(vec![
        Span::raw(" Zones "),
        Span::styled(
            format!("{}/{} free ", app.free_count(), app.zone_count()),
            Style::default()
                .fg(occupancy_color(app.occupancy_ratio()))
                .add_modifier(Modifier::BOLD),
        ),
    ]);
    let block = Block::default().borders(Borders::ALL).title(title);

    if app.zone_count() == 0 {
        let message = match app.state {
            ConnectionState::Local | ConnectionState::Connected => "No zones configured",
            ConnectionState::Connecting | ConnectionState::Disconnected { .. } => {
                "Waiting for daemon..."
            }
        };
        let empty = Paragraph::new(Line::from(Span::styled(
            message,
            Style::default().fg(Color::DarkGray),
        )))
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let stale = matches!(app.state, ConnectionState::Disconnected { .. });
    let rows = app.zones().map(|(id, state)| {
        let color = if stale {
            Color::DarkGray
        } else {
            zone_state_color(state)
        };
        Row::new(vec![
            Span::styled(zone_state_icon(state), Style::default().fg(color)),
            Span::raw(id.to_string()),
            Span::styled(state.label(), Style::default().fg(color)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(9),
        ],
    )
    .column_spacing(1)
    .block(block);

    frame.render_widget(table, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkwatch_core::{OccupancyMap, ZoneId, ZoneState};
    use ratatui::{backend::TestBackend, Terminal};

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_board_lists_zones_in_order() {
        let mut app = App::new();
        app.apply_update(OccupancyMap::from_entries([
            (ZoneId::numbered(1), ZoneState::Occupied),
            (ZoneId::numbered(2), ZoneState::Free),
        ]));

        let mut terminal = Terminal::new(TestBackend::new(40, 6)).unwrap();
        terminal
            .draw(|frame| render_board(frame, frame.area(), &app))
            .unwrap();

        let text = buffer_text(&terminal);
        let first = text.find("Zone 1").unwrap();
        let second = text.find("Zone 2").unwrap();
        assert!(first < second);
        assert!(text.contains("1/2 free"));
    }

    #[test]
    fn test_board_waiting_message() {
        let app = App::new();
        let mut terminal = Terminal::new(TestBackend::new(40, 6)).unwrap();
        terminal
            .draw(|frame| render_board(frame, frame.area(), &app))
            .unwrap();
        assert!(buffer_text(&terminal).contains("Waiting for daemon"));
    }
}
