//! Header and footer status bar widgets.
//!
//! - Header: title, data source state and summary counts
//! - Footer: keybinding hints for the active view

use crate::app::{App, ConnectionState};
use crate::ui::theme::{connection_color, pipeline_status_color};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Renders the header bar with title, link status and summary.
pub fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let (status_text, status_style) = status_display(app);

    let mut stats = String::new();
    if app.zone_count() > 0 {
        stats.push_str(&format!(
            " | {} zone{} | {} occupied | {} free",
            app.zone_count(),
            if app.zone_count() == 1 { "" } else { "s" },
            app.occupied_count(),
            app.free_count()
        ));
    }
    if let Some(at) = app.last_update {
        stats.push_str(&format!(" | changed {}", at.format("%H:%M:%S")));
    }

    let header_line = Line::from(vec![
        Span::styled(
            "parkwatch",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(status_text, status_style),
        Span::styled(stats, Style::default().fg(Color::DarkGray)),
    ]);

    let header = Paragraph::new(header_line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(connection_color(&app.state))),
    );

    frame.render_widget(header, area);
}

/// Renders the footer with `(key, description)` hints.
pub fn render_footer(frame: &mut Frame, area: Rect, hints: &[(&str, &str)]) {
    let key_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let sep_style = Style::default().fg(Color::DarkGray);

    let mut spans = vec![Span::raw(" ")];
    for (i, (key, description)) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("  |  ", sep_style));
        }
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::raw(format!(" {description}")));
    }

    let footer = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}

/// Status text and style for the header.
fn status_display(app: &App) -> (String, Style) {
    match &app.state {
        ConnectionState::Local => match &app.status {
            Some(status) => (
                status.to_string(),
                Style::default().fg(pipeline_status_color(status)),
            ),
            None => ("starting".to_string(), Style::default().fg(Color::Yellow)),
        },
        ConnectionState::Connected => ("connected".to_string(), Style::default().fg(Color::Green)),
        ConnectionState::Connecting => (
            "connecting...".to_string(),
            Style::default().fg(Color::Yellow),
        ),
        ConnectionState::Disconnected { retry_count, .. } => (
            format!("disconnected (retry {retry_count})"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkwatch_core::PipelineStatus;

    #[test]
    fn test_status_display_connected() {
        let mut app = App::new();
        app.mark_connected();
        let (text, style) = status_display(&app);
        assert_eq!(text, "connected");
        assert_eq!(style.fg, Some(Color::Green));
    }

    #[test]
    fn test_status_display_disconnected_shows_retries() {
        let mut app = App::new();
        app.mark_disconnected();
        app.mark_disconnected();
        let (text, _) = status_display(&app);
        assert!(text.contains("retry 2"));
    }

    #[test]
    fn test_status_display_local_failed() {
        let mut app = App::local();
        app.status = Some(PipelineStatus::Failed("detector exited".to_string()));
        let (text, style) = status_display(&app);
        assert!(text.contains("detector exited"));
        assert_eq!(style.fg, Some(Color::Red));
    }
}
