//! Change-gated occupancy publishing.
//!
//! Every cycle the producer hands the freshly computed map and annotated
//! frame to [`ChangePublisher::publish`]:
//!
//! - same map as last time: only the frame is refreshed in the store, so
//!   the local view keeps moving; nothing is broadcast and the version
//!   stays put
//! - different map: the store swaps map and frame atomically (bumping the
//!   version), and the whole new map is broadcast once
//!
//! A steady scene therefore produces no network traffic at all.

use std::sync::Arc;

use tracing::{debug, warn};

use parkwatch_core::{OccupancyMap, RenderedFrame, StateStore};

use crate::hub::HubHandle;

/// Destination for occupancy changes.
///
/// Implemented by [`HubHandle`]; tests substitute a recorder.
pub trait OccupancySink: Send {
    /// Delivers a changed map. Must not block.
    fn broadcast(&self, occupancy: &OccupancyMap, version: u64);
}

impl OccupancySink for HubHandle {
    fn broadcast(&self, occupancy: &OccupancyMap, version: u64) {
        if !self.send_update(occupancy.clone(), version) {
            warn!(version, "Broadcast hub is gone; update not delivered");
        }
    }
}

/// A sink that discards everything (local-only operation).
impl OccupancySink for () {
    fn broadcast(&self, _occupancy: &OccupancyMap, _version: u64) {}
}

/// Result of one publish call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Map equal to the previous one; frame refreshed only
    Unchanged,
    /// Map replaced and broadcast at this version
    Changed { version: u64 },
}

pub struct ChangePublisher<S: OccupancySink> {
    store: StateStore,
    sink: S,
    last: OccupancyMap,
}

impl<S: OccupancySink> ChangePublisher<S> {
    /// Starts from whatever map the store currently holds.
    pub fn new(store: StateStore, sink: S) -> Self {
        let (last, _) = store.occupancy();
        Self { store, sink, last }
    }

    pub fn publish(&mut self, occupancy: OccupancyMap, frame: RenderedFrame) -> PublishOutcome {
        let frame = Arc::new(frame);

        if occupancy == self.last {
            self.store.refresh_frame(frame);
            return PublishOutcome::Unchanged;
        }

        let version = self.store.replace(occupancy.clone(), frame);
        debug!(
            version,
            occupied = occupancy.occupied_count(),
            total = occupancy.len(),
            "Occupancy changed"
        );
        self.sink.broadcast(&occupancy, version);
        self.last = occupancy;
        PublishOutcome::Changed { version }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }
}
