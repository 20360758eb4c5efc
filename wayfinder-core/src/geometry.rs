//! Spherical helpers shared by the planner, the synthesizer and the tracker.
//!
//! Points follow the `geo` convention: `x` is longitude, `y` is latitude.

use geo::{Bearing, Coord, Distance, Haversine, Point};

use crate::Meters;

/// Mean earth radius used for the local tangent-plane projection
const EARTH_RADIUS: Meters = 6_371_008.8;

pub fn is_valid_coordinate(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}

/// Great-circle distance in meters
pub fn distance(a: Point<f64>, b: Point<f64>) -> Meters {
    Haversine.distance(a, b)
}

/// Initial bearing from `a` to `b` in degrees clockwise from north, in `[0, 360)`
pub fn bearing(a: Point<f64>, b: Point<f64>) -> f64 {
    Haversine.bearing(a, b).rem_euclid(360.0)
}

/// Normalizes an angle in degrees to `(-180, 180]`
pub fn normalize_angle(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
}

/// Position of a point relative to a segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProjection {
    /// Position of the foot of the perpendicular along the segment, clamped to `[0, 1]`
    pub fraction: f64,
    /// Distance from the point to the closest point of the segment
    pub cross_track: Meters,
}

/// Projects `point` onto the segment `start -> end`.
///
/// Works in a local equirectangular frame centred on `start`, which is
/// accurate to centimetres over campus-sized segments.
pub fn project_onto_segment(
    point: Point<f64>,
    start: Point<f64>,
    end: Point<f64>,
) -> SegmentProjection {
    let mid_lat = (start.y() + end.y()) / 2.0;
    let p = to_local(point, start, mid_lat);
    let d = to_local(end, start, mid_lat);

    let len2 = d.x * d.x + d.y * d.y;
    if len2 < f64::EPSILON {
        return SegmentProjection {
            fraction: 0.0,
            cross_track: p.x.hypot(p.y),
        };
    }

    let fraction = ((p.x * d.x + p.y * d.y) / len2).clamp(0.0, 1.0);
    let closest = d * fraction;
    let offset = p - closest;

    SegmentProjection {
        fraction,
        cross_track: offset.x.hypot(offset.y),
    }
}

fn to_local(point: Point<f64>, origin: Point<f64>, ref_lat: f64) -> Coord<f64> {
    Coord {
        x: (point.x() - origin.x()).to_radians() * ref_lat.to_radians().cos() * EARTH_RADIUS,
        y: (point.y() - origin.y()).to_radians() * EARTH_RADIUS,
    }
}
