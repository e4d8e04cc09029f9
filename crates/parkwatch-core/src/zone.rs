//! Zone identity and definition.

use crate::geometry::{Point, Polygon};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Unique, human-readable identifier for a parking zone.
///
/// Zones loaded without an explicit id are named by their 1-based position
/// in the configuration ("Zone 1", "Zone 2", ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(String);

impl ZoneId {
    /// Creates a new ZoneId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Default identifier for the zone at 1-based position `n`.
    pub fn numbered(n: usize) -> Self {
        Self(format!("Zone {n}"))
    }

    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ZoneId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ZoneId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for ZoneId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Zone
// ============================================================================

/// A named polygonal parking space in image-pixel coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub id: ZoneId,
    pub polygon: Polygon,
}

impl Zone {
    pub fn new(id: impl Into<ZoneId>, polygon: Polygon) -> Self {
        Self {
            id: id.into(),
            polygon,
        }
    }

    /// True if `point` lies inside the zone or on its boundary.
    pub fn contains(&self, point: Point) -> bool {
        self.polygon.contains(point)
    }
}
