//! Vehicle detections as returned by the detection oracle.

use crate::geometry::Point;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in pixel coordinates.
///
/// `(x1, y1)` is the top-left corner and `(x2, y2)` the bottom-right. The
/// oracle is trusted to return `x1 <= x2` and `y1 <= y2`; nothing here
/// depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Center point using floor division on each axis.
    ///
    /// `(x1 + x2) / 2` rounds toward negative infinity, so a box spanning
    /// `-3..0` has center x `-2`, not `-1`.
    pub fn center(&self) -> Point {
        Point::new(floor_mid(self.x1, self.x2), floor_mid(self.y1, self.y2))
    }

    pub fn width(&self) -> i32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> i32 {
        self.y2.saturating_sub(self.y1)
    }
}

fn floor_mid(a: i32, b: i32) -> i32 {
    let sum = i64::from(a) + i64::from(b);
    // The mean of two i32 values always fits back into i32
    i32::try_from(sum.div_euclid(2)).unwrap_or(a)
}

/// A single detected vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(flatten)]
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class: u32,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f32, class: u32) -> Self {
        Self {
            bbox,
            confidence,
            class,
        }
    }

    pub fn center(&self) -> Point {
        self.bbox.center()
    }
}
