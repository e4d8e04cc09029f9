//! Occupancy assignment: which zones currently hold a vehicle.
//!
//! Each detection is reduced to its box center, and the center is tested
//! against zones in registry order. The first zone containing the center is
//! marked occupied and no further zones are considered for that detection.
//! Detections outside every zone are ignored.

use crate::detection::Detection;
use crate::registry::ZoneRegistry;
use crate::zone::ZoneId;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Occupancy of one zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneState {
    #[default]
    Free,
    Occupied,
}

impl ZoneState {
    pub fn is_occupied(&self) -> bool {
        matches!(self, Self::Occupied)
    }

    /// Wire label: "free" or "occupied".
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Occupied => "occupied",
        }
    }

    /// Capitalized label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Occupied => "Occupied",
        }
    }
}

impl fmt::Display for ZoneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Zone id to state, in registry order.
///
/// Serializes as a JSON object (`{"Zone 1": "free", ...}`) whose key order
/// follows the zone registry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OccupancyMap {
    entries: Vec<(ZoneId, ZoneState)>,
}

impl OccupancyMap {
    /// Map with every registered zone free.
    pub fn all_free(zones: &ZoneRegistry) -> Self {
        Self {
            entries: zones.iter().map(|z| (z.id.clone(), ZoneState::Free)).collect(),
        }
    }

    /// Builds a map from pairs. A repeated id overwrites the earlier state
    /// but keeps its original position.
    pub fn from_entries(entries: impl IntoIterator<Item = (ZoneId, ZoneState)>) -> Self {
        let mut map = Self::default();
        for (id, state) in entries {
            map.insert(id, state);
        }
        map
    }

    fn insert(&mut self, id: ZoneId, state: ZoneState) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, slot)) => *slot = state,
            None => self.entries.push((id, state)),
        }
    }

    fn mark_occupied(&mut self, index: usize) {
        if let Some((_, state)) = self.entries.get_mut(index) {
            *state = ZoneState::Occupied;
        }
    }

    pub fn get(&self, id: &ZoneId) -> Option<ZoneState> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, state)| *state)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ZoneId, ZoneState)> {
        self.entries.iter().map(|(id, state)| (id, *state))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn occupied_count(&self) -> usize {
        self.entries.iter().filter(|(_, s)| s.is_occupied()).count()
    }

    pub fn free_count(&self) -> usize {
        self.len() - self.occupied_count()
    }
}

impl Serialize for OccupancyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, state) in &self.entries {
            map.serialize_entry(id, state)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OccupancyMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OccupancyVisitor;

        impl<'de> Visitor<'de> for OccupancyVisitor {
            type Value = OccupancyMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of zone id to \"free\" or \"occupied\"")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = OccupancyMap::default();
                while let Some((id, state)) = access.next_entry::<ZoneId, ZoneState>()? {
                    map.insert(id, state);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OccupancyVisitor)
    }
}

/// Computes the occupancy map for one frame's detections.
///
/// Every registered zone appears in the result. A zone is occupied iff at
/// least one detection's center falls inside it (boundary inclusive) and no
/// earlier zone also contains that center.
pub fn assign(detections: &[Detection], zones: &ZoneRegistry) -> OccupancyMap {
    let mut map = OccupancyMap::all_free(zones);
    for detection in detections {
        if let Some(index) = zones.zone_for_point(detection.center()) {
            map.mark_occupied(index);
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BoundingBox;
    use crate::geometry::Point;

    fn rect(x1: i32, y1: i32, x2: i32, y2: i32) -> Vec<Point> {
        vec![
            Point::new(x1, y1),
            Point::new(x2, y1),
            Point::new(x2, y2),
            Point::new(x1, y2),
        ]
    }

    fn det(x1: i32, y1: i32, x2: i32, y2: i32) -> Detection {
        Detection::new(BoundingBox::new(x1, y1, x2, y2), 0.9, 2)
    }

    fn two_zones() -> ZoneRegistry {
        ZoneRegistry::from_polygons(vec![rect(50, 50, 150, 100), rect(200, 50, 300, 100)]).unwrap()
    }

    #[test]
    fn test_single_detection_occupies_first_zone() {
        let map = assign(&[det(90, 60, 110, 80)], &two_zones());
        assert_eq!(map.get(&"Zone 1".into()), Some(ZoneState::Occupied));
        assert_eq!(map.get(&"Zone 2".into()), Some(ZoneState::Free));
    }

    #[test]
    fn test_no_detections_all_free() {
        let map = assign(&[], &two_zones());
        assert_eq!(map.len(), 2);
        assert_eq!(map.occupied_count(), 0);
    }

    #[test]
    fn test_detection_outside_all_zones_ignored() {
        let map = assign(&[det(400, 400, 420, 420)], &two_zones());
        assert_eq!(map, OccupancyMap::all_free(&two_zones()));
    }

    #[test]
    fn test_center_on_boundary_counts() {
        // Center (150, 75) sits on Zone 1's right edge
        let map = assign(&[det(140, 70, 160, 80)], &two_zones());
        assert_eq!(map.get(&"Zone 1".into()), Some(ZoneState::Occupied));
    }

    #[test]
    fn test_overlap_goes_to_first_zone_only() {
        let zones =
            ZoneRegistry::from_polygons(vec![rect(0, 0, 100, 100), rect(50, 0, 150, 100)]).unwrap();
        let map = assign(&[det(70, 40, 80, 60)], &zones);
        assert_eq!(map.get(&"Zone 1".into()), Some(ZoneState::Occupied));
        assert_eq!(map.get(&"Zone 2".into()), Some(ZoneState::Free));
    }

    #[test]
    fn test_two_detections_same_zone() {
        let map = assign(&[det(60, 55, 70, 65), det(120, 80, 140, 90)], &two_zones());
        assert_eq!(map.occupied_count(), 1);
    }

    #[test]
    fn test_empty_registry_yields_empty_map() {
        let zones = ZoneRegistry::default();
        assert!(assign(&[det(0, 0, 10, 10)], &zones).is_empty());
    }

    #[test]
    fn test_serializes_in_registry_order() {
        let map = OccupancyMap::from_entries(vec![
            (ZoneId::new("b"), ZoneState::Occupied),
            (ZoneId::new("a"), ZoneState::Free),
        ]);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"b":"occupied","a":"free"}"#);
    }

    #[test]
    fn test_deserialize_map() {
        let map: OccupancyMap =
            serde_json::from_str(r#"{"Zone 1":"free","Zone 2":"occupied"}"#).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&"Zone 2".into()), Some(ZoneState::Occupied));
        let ids: Vec<_> = map.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["Zone 1", "Zone 2"]);
    }

    #[test]
    fn test_deserialize_rejects_unknown_state() {
        let result: Result<OccupancyMap, _> = serde_json::from_str(r#"{"Zone 1":"maybe"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_entries_overwrites_in_place() {
        let map = OccupancyMap::from_entries(vec![
            (ZoneId::new("a"), ZoneState::Free),
            (ZoneId::new("b"), ZoneState::Free),
            (ZoneId::new("a"), ZoneState::Occupied),
        ]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.iter().next(), Some((&ZoneId::new("a"), ZoneState::Occupied)));
    }
}
