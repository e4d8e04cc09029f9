//! Frame annotation: zone outlines and detection markers.
//!
//! Free zones are outlined in green, occupied zones in red. Each detection
//! center gets a filled red dot. Drawing clips silently at the frame edges.

use crate::detection::Detection;
use crate::frame::{Frame, RenderedFrame};
use crate::geometry::Point;
use crate::occupancy::{OccupancyMap, ZoneState};
use crate::registry::ZoneRegistry;
use chrono::Utc;

/// Outline color for a free zone.
pub const FREE_COLOR: [u8; 3] = [0, 255, 0];

/// Outline color for an occupied zone.
pub const OCCUPIED_COLOR: [u8; 3] = [255, 0, 0];

/// Color of detection center markers.
pub const MARKER_COLOR: [u8; 3] = [255, 0, 0];

/// Marker radius in pixels.
pub const MARKER_RADIUS: i64 = 5;

/// Outline thickness in pixels.
const OUTLINE_THICKNESS: i64 = 2;

/// Draws zones and detection centers onto `frame`.
///
/// Zones missing from `occupancy` are drawn as free.
pub fn annotate(
    mut frame: Frame,
    zones: &ZoneRegistry,
    occupancy: &OccupancyMap,
    detections: &[Detection],
    index: u64,
) -> RenderedFrame {
    for zone in zones {
        let color = match occupancy.get(&zone.id).unwrap_or_default() {
            ZoneState::Free => FREE_COLOR,
            ZoneState::Occupied => OCCUPIED_COLOR,
        };
        for (a, b) in zone.polygon.edges() {
            draw_line(&mut frame, a, b, color);
        }
    }

    for detection in detections {
        fill_circle(&mut frame, detection.center(), MARKER_RADIUS, MARKER_COLOR);
    }

    RenderedFrame {
        index,
        image: frame,
        detections: detections.len(),
        captured_at: Utc::now(),
    }
}

/// Draws the segments joining `points`, closing the loop when `closed`.
pub fn draw_path(frame: &mut Frame, points: &[Point], closed: bool, color: [u8; 3]) {
    for pair in points.windows(2) {
        if let [a, b] = pair {
            draw_line(frame, *a, *b, color);
        }
    }
    if closed && points.len() > 2 {
        if let (Some(first), Some(last)) = (points.first(), points.last()) {
            draw_line(frame, *last, *first, color);
        }
    }
}

/// Draws a filled marker dot of [`MARKER_RADIUS`].
pub fn draw_marker(frame: &mut Frame, center: Point, color: [u8; 3]) {
    fill_circle(frame, center, MARKER_RADIUS, color);
}

/// Bresenham line, thickened by stamping a small square at each step.
///
/// The segment is clipped to the frame first, so the step count is bounded
/// by the frame size whatever the zone coordinates are.
fn draw_line(frame: &mut Frame, from: Point, to: Point, color: [u8; 3]) {
    let bounds = (
        -OUTLINE_THICKNESS,
        -OUTLINE_THICKNESS,
        i64::from(frame.width()),
        i64::from(frame.height()),
    );
    let from = (i64::from(from.x), i64::from(from.y));
    let to = (i64::from(to.x), i64::from(to.y));
    let Some(((mut x, mut y), (x1, y1))) = clip_segment(from, to, bounds) else {
        return;
    };

    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        stamp(frame, x, y, color);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

type Endpoint = (i64, i64);

/// Liang-Barsky clip of `from -> to` against `(xmin, ymin, xmax, ymax)`.
///
/// Segments already inside are returned untouched; `None` when nothing of
/// the segment is inside.
fn clip_segment(
    from: Endpoint,
    to: Endpoint,
    (xmin, ymin, xmax, ymax): (i64, i64, i64, i64),
) -> Option<(Endpoint, Endpoint)> {
    let inside = |(x, y): Endpoint| (xmin..=xmax).contains(&x) && (ymin..=ymax).contains(&y);
    if inside(from) && inside(to) {
        return Some((from, to));
    }

    let (x0, y0) = (from.0 as f64, from.1 as f64);
    let (dx, dy) = ((to.0 - from.0) as f64, (to.1 - from.1) as f64);
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);

    for (p, q) in [
        (-dx, x0 - xmin as f64),
        (dx, xmax as f64 - x0),
        (-dy, y0 - ymin as f64),
        (dy, ymax as f64 - y0),
    ] {
        if p == 0.0 {
            // Parallel to this edge and outside it
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    let at = |t: f64| ((x0 + t * dx).round() as i64, (y0 + t * dy).round() as i64);
    Some((at(t0), at(t1)))
}

fn stamp(frame: &mut Frame, x: i64, y: i64, color: [u8; 3]) {
    for oy in 0..OUTLINE_THICKNESS {
        for ox in 0..OUTLINE_THICKNESS {
            frame.put_pixel(x + ox, y + oy, color);
        }
    }
}

fn fill_circle(frame: &mut Frame, center: Point, radius: i64, color: [u8; 3]) {
    let (cx, cy) = (i64::from(center.x), i64::from(center.y));
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                frame.put_pixel(cx + dx, cy + dy, color);
            }
        }
    }
}
