//! Shared theme utilities for the parkwatch views.

use parkwatch_core::{PipelineStatus, ZoneState};
use ratatui::style::Color;

use crate::app::ConnectionState;

/// Zone state color, matching the frame overlay (green free, red occupied).
pub fn zone_state_color(state: ZoneState) -> Color {
    match state {
        ZoneState::Free => Color::Green,
        ZoneState::Occupied => Color::Red,
    }
}

/// Short marker shown before each zone on the board.
pub fn zone_state_icon(state: ZoneState) -> &'static str {
    match state {
        ZoneState::Free => "[ ]",
        ZoneState::Occupied => "[X]",
    }
}

/// Color for the lot fill level.
///
/// Traffic-light pattern: green below half full, yellow up to 90%,
/// red when (nearly) full.
pub fn occupancy_color(ratio: f64) -> Color {
    if ratio >= 0.9 {
        Color::Red
    } else if ratio >= 0.5 {
        Color::Yellow
    } else {
        Color::Green
    }
}

/// Header border color for the connection state.
pub fn connection_color(state: &ConnectionState) -> Color {
    match state {
        ConnectionState::Local | ConnectionState::Connected => Color::Green,
        ConnectionState::Connecting => Color::Yellow,
        ConnectionState::Disconnected { .. } => Color::Red,
    }
}

/// Color for the producer status in the local view.
pub fn pipeline_status_color(status: &PipelineStatus) -> Color {
    match status {
        PipelineStatus::Starting => Color::Yellow,
        PipelineStatus::Running => Color::Green,
        PipelineStatus::Ended => Color::DarkGray,
        PipelineStatus::Failed(_) => Color::Red,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_state_color() {
        assert_eq!(zone_state_color(ZoneState::Free), Color::Green);
        assert_eq!(zone_state_color(ZoneState::Occupied), Color::Red);
    }

    #[test]
    fn test_occupancy_color_thresholds() {
        assert_eq!(occupancy_color(0.0), Color::Green);
        assert_eq!(occupancy_color(0.49), Color::Green);
        assert_eq!(occupancy_color(0.5), Color::Yellow);
        assert_eq!(occupancy_color(0.89), Color::Yellow);
        assert_eq!(occupancy_color(0.9), Color::Red);
        assert_eq!(occupancy_color(1.0), Color::Red);
    }

    #[test]
    fn test_pipeline_status_color() {
        assert_eq!(pipeline_status_color(&PipelineStatus::Running), Color::Green);
        assert_eq!(
            pipeline_status_color(&PipelineStatus::Failed("boom".to_string())),
            Color::Red
        );
    }

    #[test]
    fn test_connection_color() {
        assert_eq!(connection_color(&ConnectionState::Local), Color::Green);
        assert_eq!(connection_color(&ConnectionState::Connecting), Color::Yellow);
    }
}
