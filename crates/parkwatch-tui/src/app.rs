//! Application state for the parkwatch views.
//!
//! One `App` backs both the local view (fed from a [`StateSnapshot`]) and
//! the networked board (fed from pushed occupancy maps).
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parkwatch_core::{OccupancyMap, PipelineStatus, RenderedFrame, StateSnapshot, ZoneId, ZoneState};

// ============================================================================
// Connection State
// ============================================================================

/// Where the view's data comes from and whether it is flowing.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConnectionState {
    /// Reading the store in-process; never disconnects.
    Local,

    /// Connected to daemon and receiving updates.
    Connected,

    /// Lost connection, attempting reconnect.
    Disconnected {
        /// When the connection was lost.
        since: DateTime<Utc>,
        /// Number of reconnection attempts.
        retry_count: u32,
    },

    /// Initial connection in progress.
    #[default]
    Connecting,
}

// ============================================================================
// Application
// ============================================================================

/// View state shared by the local view and the board.
#[derive(Debug, Clone)]
pub struct App {
    /// Data source and link state.
    pub state: ConnectionState,

    /// Latest zone states, in registry order.
    pub occupancy: OccupancyMap,

    /// Latest annotated frame (local view only).
    pub frame: Option<Arc<RenderedFrame>>,

    /// Pipeline status (local view only).
    pub status: Option<PipelineStatus>,

    /// Store version of the shown occupancy (local view only).
    pub version: u64,

    /// Number of occupancy updates applied since start.
    pub updates: u64,

    /// When the occupancy last changed.
    pub last_update: Option<DateTime<Utc>>,

    /// Flag indicating the application should quit.
    pub should_quit: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Creates an App for the networked board, in the Connecting state.
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Connecting,
            occupancy: OccupancyMap::default(),
            frame: None,
            status: None,
            version: 0,
            updates: 0,
            last_update: None,
            should_quit: false,
        }
    }

    /// Creates an App for the in-process view.
    pub fn local() -> Self {
        Self {
            state: ConnectionState::Local,
            ..Self::new()
        }
    }

    /// Replaces the zone states with a pushed update.
    ///
    /// The daemon only pushes on change (plus once on connect), so every
    /// call counts as an update.
    pub fn apply_update(&mut self, occupancy: OccupancyMap) {
        self.occupancy = occupancy;
        self.state = ConnectionState::Connected;
        self.updates = self.updates.saturating_add(1);
        self.last_update = Some(Utc::now());
    }

    /// Copies a store snapshot into the view.
    ///
    /// Occupancy is only replaced when the store version moved, so the
    /// update counter and timestamp track real changes, not redraws.
    pub fn apply_snapshot(&mut self, snapshot: StateSnapshot) {
        if snapshot.version != self.version || self.last_update.is_none() {
            self.occupancy = snapshot.occupancy;
            self.version = snapshot.version;
            self.updates = self.updates.saturating_add(1);
            self.last_update = Some(snapshot.updated_at);
        }
        self.frame = snapshot.frame;
        self.status = Some(snapshot.status);
    }

    /// Marks the connection as established.
    pub fn mark_connected(&mut self) {
        self.state = ConnectionState::Connected;
    }

    /// Marks the connection as disconnected and increments retry count.
    ///
    /// The last known zone states stay on screen while disconnected.
    pub fn mark_disconnected(&mut self) {
        match &self.state {
            ConnectionState::Disconnected { since, retry_count } => {
                self.state = ConnectionState::Disconnected {
                    since: *since,
                    retry_count: retry_count.saturating_add(1),
                };
            }
            ConnectionState::Connected | ConnectionState::Connecting => {
                self.state = ConnectionState::Disconnected {
                    since: Utc::now(),
                    retry_count: 1,
                };
            }
            ConnectionState::Local => {}
        }
    }

    /// Sets the quit flag to true, signaling the application should exit.
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Zones in registry order with their state.
    pub fn zones(&self) -> impl Iterator<Item = (&ZoneId, ZoneState)> {
        self.occupancy.iter()
    }

    pub fn zone_count(&self) -> usize {
        self.occupancy.len()
    }

    pub fn occupied_count(&self) -> usize {
        self.occupancy.occupied_count()
    }

    pub fn free_count(&self) -> usize {
        self.occupancy.free_count()
    }

    /// Share of zones occupied, 0.0 when there are no zones.
    pub fn occupancy_ratio(&self) -> f64 {
        let total = self.zone_count();
        if total == 0 {
            return 0.0;
        }
        self.occupied_count() as f64 / total as f64
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parkwatch_core::{Point, StateStore, ZoneRegistry};

    fn registry() -> ZoneRegistry {
        let rect = |x: i32| {
            vec![
                Point::new(x, 0),
                Point::new(x + 10, 0),
                Point::new(x + 10, 10),
                Point::new(x, 10),
            ]
        };
        ZoneRegistry::from_polygons(vec![rect(0), rect(20), rect(40), rect(60)]).unwrap()
    }

    fn map(occupied: &[usize]) -> OccupancyMap {
        OccupancyMap::from_entries((1..=4).map(|n| {
            let state = if occupied.contains(&n) {
                ZoneState::Occupied
            } else {
                ZoneState::Free
            };
            (ZoneId::numbered(n), state)
        }))
    }

    #[test]
    fn test_app_new_is_connecting() {
        let app = App::new();
        assert_eq!(app.state, ConnectionState::Connecting);
        assert_eq!(app.zone_count(), 0);
        assert!(app.last_update.is_none());
    }

    #[test]
    fn test_apply_update_marks_connected() {
        let mut app = App::new();
        app.apply_update(map(&[2]));
        assert_eq!(app.state, ConnectionState::Connected);
        assert_eq!(app.occupied_count(), 1);
        assert_eq!(app.free_count(), 3);
        assert_eq!(app.updates, 1);
        assert!(app.last_update.is_some());
    }

    #[test]
    fn test_mark_disconnected_increments_retry() {
        let mut app = App::new();
        app.apply_update(map(&[]));
        app.mark_disconnected();
        app.mark_disconnected();
        match app.state {
            ConnectionState::Disconnected { retry_count, .. } => assert_eq!(retry_count, 2),
            other => panic!("Expected Disconnected, got {other:?}"),
        }
        // Last known states are kept
        assert_eq!(app.zone_count(), 4);
    }

    #[test]
    fn test_local_never_disconnects() {
        let mut app = App::local();
        app.mark_disconnected();
        assert_eq!(app.state, ConnectionState::Local);
    }

    #[test]
    fn test_apply_snapshot_counts_only_version_changes() {
        let zones = registry();
        let store = StateStore::new(&zones);
        let mut app = App::local();

        app.apply_snapshot(store.snapshot());
        app.apply_snapshot(store.snapshot());
        assert_eq!(app.updates, 1);
        assert_eq!(app.zone_count(), 4);
        assert_eq!(app.status, Some(PipelineStatus::Starting));
    }

    #[test]
    fn test_occupancy_ratio() {
        let mut app = App::new();
        assert_eq!(app.occupancy_ratio(), 0.0);
        app.apply_update(map(&[1, 3]));
        assert!((app.occupancy_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zones_in_registry_order() {
        let mut app = App::new();
        app.apply_update(map(&[4]));
        let ids: Vec<String> = app.zones().map(|(id, _)| id.to_string()).collect();
        assert_eq!(ids, ["Zone 1", "Zone 2", "Zone 3", "Zone 4"]);
    }
}
