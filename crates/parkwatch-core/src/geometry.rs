//! Integer plane geometry for zone containment tests.
//!
//! Coordinates are image pixels: x grows to the right, y grows downward.
//! All arithmetic is widened to `i64` so cross products of `i32`
//! coordinates cannot overflow.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A pixel coordinate.
///
/// Serializes as a two-element array `[x, y]`, which is the form used in
/// zone files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (i32, i32) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A simple polygon given by its vertices in order.
///
/// The closing edge from the last vertex back to the first is implicit.
/// Vertex count and degenerate edges are validated by
/// [`ZoneRegistry`](crate::ZoneRegistry), not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Iterates the edges as `(from, to)` pairs, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let closing = self.vertices.last().copied();
        closing
            .into_iter()
            .chain(self.vertices.iter().copied())
            .zip(self.vertices.iter().copied())
    }

    /// Tests whether `point` lies inside the polygon or on its boundary.
    ///
    /// Boundary points (on an edge or at a vertex) count as inside. The
    /// interior test is an even-odd ray cast toward +x evaluated with exact
    /// integer comparisons.
    pub fn contains(&self, point: Point) -> bool {
        if self.vertices.len() < 3 {
            return false;
        }

        let px = i64::from(point.x);
        let py = i64::from(point.y);
        let mut inside = false;

        for (a, b) in self.edges() {
            if on_segment(a, b, point) {
                return true;
            }

            let (ax, ay) = (i64::from(a.x), i64::from(a.y));
            let (bx, by) = (i64::from(b.x), i64::from(b.y));

            // Half-open rule on y so a vertex shared by two edges counts once
            if (ay > py) != (by > py) {
                // px < ax + (py - ay) * (bx - ax) / (by - ay), without division
                let dy = by - ay;
                let lhs = (px - ax) * dy;
                let rhs = (py - ay) * (bx - ax);
                let crosses = if dy > 0 { lhs < rhs } else { lhs > rhs };
                if crosses {
                    inside = !inside;
                }
            }
        }

        inside
    }
}

impl From<Vec<Point>> for Polygon {
    fn from(vertices: Vec<Point>) -> Self {
        Self::new(vertices)
    }
}

/// True if `p` lies on the closed segment `a`-`b`.
fn on_segment(a: Point, b: Point, p: Point) -> bool {
    let (ax, ay) = (i64::from(a.x), i64::from(a.y));
    let (bx, by) = (i64::from(b.x), i64::from(b.y));
    let (px, py) = (i64::from(p.x), i64::from(p.y));

    let cross = (bx - ax) * (py - ay) - (by - ay) * (px - ax);
    cross == 0 && ax.min(bx) <= px && px <= ax.max(bx) && ay.min(by) <= py && py <= ay.max(by)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> Polygon {
        Polygon::new(vec![
            Point::new(50, 50),
            Point::new(150, 50),
            Point::new(150, 100),
            Point::new(50, 100),
        ])
    }

    #[test]
    fn test_interior_point() {
        assert!(rect().contains(Point::new(100, 70)));
    }

    #[test]
    fn test_exterior_points() {
        let r = rect();
        assert!(!r.contains(Point::new(151, 70)));
        assert!(!r.contains(Point::new(49, 70)));
        assert!(!r.contains(Point::new(100, 49)));
        assert!(!r.contains(Point::new(100, 101)));
        assert!(!r.contains(Point::new(-5, -5)));
    }

    #[test]
    fn test_boundary_counts_as_inside() {
        let r = rect();
        assert!(r.contains(Point::new(100, 50)));
        assert!(r.contains(Point::new(150, 75)));
        assert!(r.contains(Point::new(50, 100)));
    }

    #[test]
    fn test_vertices_count_as_inside() {
        let r = rect();
        for v in r.vertices().to_vec() {
            assert!(r.contains(v), "vertex {v} should be inside");
        }
    }

    #[test]
    fn test_concave_polygon() {
        // U shape opening upward
        let u = Polygon::new(vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 30),
            Point::new(20, 30),
            Point::new(20, 0),
            Point::new(30, 0),
            Point::new(30, 40),
            Point::new(0, 40),
        ]);
        assert!(u.contains(Point::new(5, 10)));
        assert!(u.contains(Point::new(25, 10)));
        assert!(u.contains(Point::new(15, 35)));
        assert!(!u.contains(Point::new(15, 10)));
        assert!(u.contains(Point::new(15, 30)));
    }

    #[test]
    fn test_triangle_diagonal_edge() {
        let t = Polygon::new(vec![Point::new(0, 0), Point::new(10, 0), Point::new(0, 10)]);
        assert!(t.contains(Point::new(5, 5)));
        assert!(t.contains(Point::new(2, 2)));
        assert!(!t.contains(Point::new(6, 6)));
    }

    #[test]
    fn test_ray_through_vertex_is_not_double_counted() {
        // Diamond with vertices level with the test point
        let d = Polygon::new(vec![
            Point::new(10, 0),
            Point::new(20, 10),
            Point::new(10, 20),
            Point::new(0, 10),
        ]);
        assert!(d.contains(Point::new(10, 10)));
        assert!(!d.contains(Point::new(-1, 10)));
        assert!(!d.contains(Point::new(21, 10)));
    }

    #[test]
    fn test_degenerate_polygon_contains_nothing() {
        let line = Polygon::new(vec![Point::new(0, 0), Point::new(10, 10)]);
        assert!(!line.contains(Point::new(5, 5)));
    }

    #[test]
    fn test_edges_include_closing_edge() {
        let edges: Vec<_> = rect().edges().collect();
        assert_eq!(edges.len(), 4);
        assert_eq!(edges[0], (Point::new(50, 100), Point::new(50, 50)));
    }

    #[test]
    fn test_point_serializes_as_pair() {
        let json = serde_json::to_string(&Point::new(3, 4)).unwrap();
        assert_eq!(json, "[3,4]");
        let back: Point = serde_json::from_str("[7,-2]").unwrap();
        assert_eq!(back, Point::new(7, -2));
    }
}
