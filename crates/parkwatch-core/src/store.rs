//! Shared state store: the latest occupancy map and annotated frame.
//!
//! The store is written by the producer and read concurrently by the
//! broadcast hub, new subscribers and the local view. Every read returns a
//! consistent snapshot; a reader never sees the map from one frame paired
//! with a version from another.
//!
//! Occupancy and frame are deliberately decoupled: the frame is refreshed
//! every cycle, while the occupancy map (and its version) only moves when
//! the map actually changes.
//!
//! # Panic-Free Guarantees
//!
//! The inner mutex is never held across a call that can panic. A poisoned
//! lock is recovered rather than propagated, since the guarded data is
//! always left in a valid state between field assignments.

use crate::frame::RenderedFrame;
use crate::occupancy::OccupancyMap;
use crate::registry::ZoneRegistry;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Lifecycle of the frame producer, as seen by readers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PipelineStatus {
    /// No frame processed yet
    #[default]
    Starting,

    /// Frames are flowing
    Running,

    /// The frame source ended (end of file after retry, or live device lost)
    Ended,

    /// The detector failed; the producer has stopped
    Failed(String),
}

impl PipelineStatus {
    /// True once the producer has stopped for any reason.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Failed(_))
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => f.write_str("starting"),
            Self::Running => f.write_str("running"),
            Self::Ended => f.write_str("ended"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Point-in-time copy of the store contents.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub occupancy: OccupancyMap,
    pub frame: Option<Arc<RenderedFrame>>,

    /// Incremented on every occupancy change; 0 means the initial all-free map
    pub version: u64,

    pub status: PipelineStatus,

    /// When occupancy last changed
    pub updated_at: DateTime<Utc>,
}

/// Thread-safe, cheaply cloneable handle to the shared state.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<Mutex<StateSnapshot>>,
}

impl StateStore {
    /// Creates a store with every zone free, no frame and version 0.
    pub fn new(zones: &ZoneRegistry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StateSnapshot {
                occupancy: OccupancyMap::all_free(zones),
                frame: None,
                version: 0,
                status: PipelineStatus::Starting,
                updated_at: Utc::now(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StateSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Full copy of the current state.
    pub fn snapshot(&self) -> StateSnapshot {
        self.lock().clone()
    }

    /// Current occupancy map and its version.
    pub fn occupancy(&self) -> (OccupancyMap, u64) {
        let state = self.lock();
        (state.occupancy.clone(), state.version)
    }

    /// Latest annotated frame, if any.
    pub fn frame(&self) -> Option<Arc<RenderedFrame>> {
        self.lock().frame.clone()
    }

    pub fn status(&self) -> PipelineStatus {
        self.lock().status.clone()
    }

    /// Atomically replaces occupancy and frame, returning the new version.
    pub fn replace(&self, occupancy: OccupancyMap, frame: Arc<RenderedFrame>) -> u64 {
        let mut state = self.lock();
        state.version = state.version.saturating_add(1);
        state.occupancy = occupancy;
        state.frame = Some(frame);
        state.updated_at = Utc::now();
        if state.status == PipelineStatus::Starting {
            state.status = PipelineStatus::Running;
        }
        state.version
    }

    /// Replaces only the frame; occupancy and version are untouched.
    pub fn refresh_frame(&self, frame: Arc<RenderedFrame>) {
        let mut state = self.lock();
        state.frame = Some(frame);
        if state.status == PipelineStatus::Starting {
            state.status = PipelineStatus::Running;
        }
    }

    pub fn set_status(&self, status: PipelineStatus) {
        self.lock().status = status;
    }
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("StateStore")
            .field("version", &state.version)
            .field("zones", &state.occupancy.len())
            .field("status", &state.status)
            .finish()
    }
}
