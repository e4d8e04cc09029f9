//! parkwatch core - shared types for parking zone occupancy
//!
//! This crate provides the domain types shared between the daemon
//! (parkwatchd) and the terminal front ends (parkwatch-tui): zone
//! geometry, occupancy assignment, frame annotation and the shared
//! state store.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or unchecked indexing.

pub mod detection;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod occupancy;
pub mod overlay;
pub mod registry;
pub mod store;
pub mod zone;

// Re-exports for convenience
pub use detection::{BoundingBox, Detection};
pub use error::{ConfigError, ConfigResult};
pub use frame::{Frame, FrameError, RenderedFrame};
pub use geometry::{Point, Polygon};
pub use occupancy::{assign, OccupancyMap, ZoneState};
pub use overlay::{annotate, draw_marker, draw_path, FREE_COLOR, MARKER_COLOR, OCCUPIED_COLOR};
pub use registry::{ZoneEntry, ZoneFile, ZoneRegistry};
pub use store::{PipelineStatus, StateSnapshot, StateStore};
pub use zone::{Zone, ZoneId};
