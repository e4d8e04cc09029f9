//! Zone registry: the validated, ordered set of parking zones.
//!
//! Zones are loaded once at startup from a TOML file and never change while
//! the daemon runs. Order matters: when zones overlap, the earlier zone wins
//! (see [`ZoneRegistry::zone_for_point`]).
//!
//! # File format
//!
//! ```toml
//! [[zones]]
//! id = "Bay A"            # optional, defaults to "Zone {n}"
//! points = [[50, 50], [150, 50], [150, 100], [50, 100]]
//! ```

use crate::error::{ConfigError, ConfigResult};
use crate::geometry::{Point, Polygon};
use crate::zone::{Zone, ZoneId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// Minimum number of vertices for a zone polygon.
pub const MIN_ZONE_POINTS: usize = 3;

// ============================================================================
// File Representation
// ============================================================================

/// On-disk zone configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneFile {
    #[serde(default)]
    pub zones: Vec<ZoneEntry>,
}

/// One `[[zones]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub points: Vec<Point>,
}

impl ZoneFile {
    /// Parses a zone file from TOML text without validating geometry.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Renders the zone file as TOML text.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

impl From<&ZoneRegistry> for ZoneFile {
    fn from(registry: &ZoneRegistry) -> Self {
        Self {
            zones: registry
                .iter()
                .map(|zone| ZoneEntry {
                    id: Some(zone.id.to_string()),
                    points: zone.polygon.vertices().to_vec(),
                })
                .collect(),
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Ordered, validated collection of zones.
///
/// Invariants upheld by every constructor:
/// - every polygon has at least [`MIN_ZONE_POINTS`] vertices
/// - no two consecutive vertices are equal (including last -> first)
/// - zone ids are unique
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneRegistry {
    zones: Vec<Zone>,
}

impl ZoneRegistry {
    /// Builds a registry from already-identified zones, validating each.
    pub fn new(zones: Vec<Zone>) -> ConfigResult<Self> {
        let mut seen = HashSet::with_capacity(zones.len());
        for zone in &zones {
            validate_polygon(&zone.id, zone.polygon.vertices())?;
            if !seen.insert(zone.id.clone()) {
                return Err(ConfigError::DuplicateZoneId(zone.id.clone()));
            }
        }

        if zones.is_empty() {
            warn!("Zone registry is empty; occupancy will always be an empty map");
        }

        Ok(Self { zones })
    }

    /// Builds a registry from bare polygons, naming them "Zone 1", "Zone 2", ...
    pub fn from_polygons(polygons: Vec<Vec<Point>>) -> ConfigResult<Self> {
        let zones = polygons
            .into_iter()
            .enumerate()
            .map(|(i, points)| Zone::new(ZoneId::numbered(i + 1), Polygon::new(points)))
            .collect();
        Self::new(zones)
    }

    /// Builds a registry from a parsed zone file.
    pub fn from_file(file: ZoneFile) -> ConfigResult<Self> {
        let zones = file
            .zones
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                let id = entry
                    .id
                    .map(ZoneId::from)
                    .unwrap_or_else(|| ZoneId::numbered(i + 1));
                Zone::new(id, Polygon::new(entry.points))
            })
            .collect();
        Self::new(zones)
    }

    /// Parses and validates zone configuration from TOML text.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        Self::from_file(ZoneFile::from_toml_str(text)?)
    }

    /// Reads, parses and validates a zone file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let registry = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), zones = registry.len(), "Loaded zone registry");
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Zone> {
        self.zones.get(index)
    }

    /// Registry position of the zone with this id.
    pub fn position(&self, id: &ZoneId) -> Option<usize> {
        self.zones.iter().position(|z| &z.id == id)
    }

    /// Index of the first zone (in registry order) containing `point`.
    ///
    /// Overlapping zones resolve to the earliest one; later zones never see
    /// a point an earlier zone already claimed.
    pub fn zone_for_point(&self, point: Point) -> Option<usize> {
        self.zones.iter().position(|z| z.contains(point))
    }
}

impl<'a> IntoIterator for &'a ZoneRegistry {
    type Item = &'a Zone;
    type IntoIter = std::slice::Iter<'a, Zone>;

    fn into_iter(self) -> Self::IntoIter {
        self.zones.iter()
    }
}

fn validate_polygon(zone: &ZoneId, points: &[Point]) -> ConfigResult<()> {
    if points.len() < MIN_ZONE_POINTS {
        return Err(ConfigError::TooFewPoints {
            zone: zone.clone(),
            count: points.len(),
            min: MIN_ZONE_POINTS,
        });
    }

    let successors = points.iter().skip(1).chain(points.first());
    for (index, (current, next)) in points.iter().zip(successors).enumerate() {
        if current == next {
            return Err(ConfigError::DuplicateConsecutivePoint {
                zone: zone.clone(),
                index,
                x: current.x,
                y: current.y,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn square(x: i32, y: i32, size: i32) -> Vec<Point> {
        vec![
            Point::new(x, y),
            Point::new(x + size, y),
            Point::new(x + size, y + size),
            Point::new(x, y + size),
        ]
    }

    #[test]
    fn test_from_polygons_assigns_numbered_ids() {
        let registry =
            ZoneRegistry::from_polygons(vec![square(0, 0, 10), square(20, 0, 10)]).unwrap();
        let ids: Vec<_> = registry.iter().map(|z| z.id.as_str()).collect();
        assert_eq!(ids, vec!["Zone 1", "Zone 2"]);
    }

    #[test]
    fn test_too_few_points_rejected() {
        let err = ZoneRegistry::from_polygons(vec![vec![Point::new(0, 0), Point::new(1, 1)]])
            .unwrap_err();
        assert!(matches!(err, ConfigError::TooFewPoints { count: 2, .. }));
    }

    #[test]
    fn test_duplicate_consecutive_point_rejected() {
        let err = ZoneRegistry::from_polygons(vec![vec![
            Point::new(0, 0),
            Point::new(0, 0),
            Point::new(5, 5),
        ]])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DuplicateConsecutivePoint { index: 0, .. }
        ));
    }

    #[test]
    fn test_closing_duplicate_rejected() {
        let err = ZoneRegistry::from_polygons(vec![vec![
            Point::new(0, 0),
            Point::new(5, 0),
            Point::new(5, 5),
            Point::new(0, 0),
        ]])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DuplicateConsecutivePoint { index: 3, .. }
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let text = r#"
            [[zones]]
            id = "A"
            points = [[0, 0], [10, 0], [10, 10]]

            [[zones]]
            id = "A"
            points = [[20, 0], [30, 0], [30, 10]]
        "#;
        let err = ZoneRegistry::from_toml_str(text).unwrap_err();
        assert_eq!(err, ConfigError::DuplicateZoneId(ZoneId::new("A")));
    }

    #[test]
    fn test_toml_mixed_ids() {
        let text = r#"
            [[zones]]
            points = [[50, 50], [150, 50], [150, 100], [50, 100]]

            [[zones]]
            id = "Accessible"
            points = [[200, 50], [300, 50], [300, 100], [200, 100]]
        "#;
        let registry = ZoneRegistry::from_toml_str(text).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(0).unwrap().id.as_str(), "Zone 1");
        assert_eq!(registry.get(1).unwrap().id.as_str(), "Accessible");
        assert_eq!(registry.position(&ZoneId::new("Accessible")), Some(1));
        assert!(registry.position(&ZoneId::new("Zone 2")).is_none());
    }

    #[test]
    fn test_empty_file_is_empty_registry() {
        let registry = ZoneRegistry::from_toml_str("").unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = ZoneRegistry::from_toml_str("[[zones]]\npoints = \"nope\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_zone_for_point_first_match_wins() {
        let registry =
            ZoneRegistry::from_polygons(vec![square(0, 0, 20), square(10, 10, 20)]).unwrap();
        assert_eq!(registry.zone_for_point(Point::new(15, 15)), Some(0));
        assert_eq!(registry.zone_for_point(Point::new(25, 25)), Some(1));
        assert_eq!(registry.zone_for_point(Point::new(100, 100)), None);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ZoneRegistry::load(Path::new("/nonexistent/zones.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[zones]]\npoints = [[0, 0], [4, 0], [4, 4], [0, 4]]").unwrap();
        let registry = ZoneRegistry::load(file.path()).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_zone_file_round_trips_through_registry() {
        let registry = ZoneRegistry::from_polygons(vec![square(5, 5, 10)]).unwrap();
        let text = ZoneFile::from(&registry).to_toml_string().unwrap();
        assert!(text.contains("Zone 1"));
        assert_eq!(ZoneRegistry::from_toml_str(&text).unwrap(), registry);
    }
}
