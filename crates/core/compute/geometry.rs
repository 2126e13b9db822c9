//! Pure geometry for the search grid.
//!
//! Distances, meter/degree conversion, hexagonal candidate lattices and
//! greedy circle packing. Nothing in here performs I/O.
//!
//! Every function takes a [`DistanceMetric`]: `Haversine` treats coordinates
//! as lon/lat degrees on a spherical earth, `Euclidean` treats them as planar
//! meters (one coordinate unit is one meter).

use crate::compute::index::CircleIndex;
use gridcrawl_types::bounds::Bounds;
use gridcrawl_types::cell::Circle;
use gridcrawl_types::geo::{DistanceMetric, Point};

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Meridional circumference used for latitude deltas.
const MERIDIAN_CIRCUMFERENCE_METERS: f64 = 40_008_000.0;

/// Equatorial circumference used for longitude deltas.
const EQUATOR_CIRCUMFERENCE_METERS: f64 = 40_075_000.0;

/// cos(lat) reaches zero at the poles.
const MAX_SAFE_LATITUDE: f64 = 89.9;

/// Relative padding applied to search envelopes.
const ENVELOPE_SLACK: f64 = 1.0 + 1e-6;

/// Lattice row spacing, in radii.
pub const HEX_ROW_SPACING: f64 = 1.5;
/// Lattice column spacing, in radii (about sqrt 3).
pub const HEX_COL_SPACING: f64 = 1.73;
/// Odd-row shift, in radii (about sqrt 3 / 2).
pub const HEX_ROW_OFFSET: f64 = 0.866;

/// A meter offset expressed in coordinate degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegreeDelta {
    pub lat: f64,
    pub lng: f64,
}

/// How two circles that exactly touch are judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPolicy {
    /// `distance == r1 + r2` is not a conflict (packing)
    Accept,
    /// `distance == r1 + r2` is a conflict (store validation)
    Reject,
}

/// Radius schedule used to generate subdivision candidates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackSchedule {
    /// First radius is `parent_radius / start_divisor`
    pub start_divisor: f64,
    /// Each further pass multiplies the radius by this factor
    pub shrink_factor: f64,
}

impl Default for PackSchedule {
    fn default() -> Self {
        Self {
            start_divisor: 2.5,
            shrink_factor: 0.85,
        }
    }
}

/// Great-circle distance in meters on a sphere of radius 6 371 000 m.
#[inline]
pub fn haversine_distance(p1: &Point, p2: &Point) -> f64 {
    let lat1_rad = p1.lat().to_radians();
    let lat2_rad = p2.lat().to_radians();
    let delta_lat = (p2.lat() - p1.lat()).to_radians();
    let delta_lon = (p2.lon() - p1.lon()).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Distance between two points in meters.
///
/// ```
/// use gridcrawl::compute::geometry::distance;
/// use gridcrawl::{DistanceMetric, Point};
///
/// let d = distance(&Point::new(0.0, 0.0), &Point::new(3.0, 4.0), DistanceMetric::Euclidean);
/// assert_eq!(d, 5.0);
/// ```
#[inline]
pub fn distance(p1: &Point, p2: &Point, metric: DistanceMetric) -> f64 {
    match metric {
        DistanceMetric::Haversine => haversine_distance(p1, p2),
        DistanceMetric::Euclidean => (p2.x() - p1.x()).hypot(p2.y() - p1.y()),
    }
}

/// Convert a distance in meters into coordinate deltas at a latitude.
///
/// The latitude delta is linear. The longitude delta is divided by
/// `cos(latitude)`, so the same distance spans more degrees of longitude
/// toward the poles. Latitude is clamped to ±89.9° for the cosine.
pub fn meters_to_degrees(meters: f64, at_latitude: f64, metric: DistanceMetric) -> DegreeDelta {
    match metric {
        DistanceMetric::Haversine => {
            let safe_lat = at_latitude.abs().min(MAX_SAFE_LATITUDE);
            DegreeDelta {
                lat: meters * 360.0 / MERIDIAN_CIRCUMFERENCE_METERS,
                lng: meters * 360.0
                    / (EQUATOR_CIRCUMFERENCE_METERS * safe_lat.to_radians().cos()),
            }
        }
        DistanceMetric::Euclidean => DegreeDelta {
            lat: meters,
            lng: meters,
        },
    }
}

/// Box guaranteed to contain every point within `meters` of `center`.
///
/// Degrees are derived from the haversine sphere itself rather than the
/// circumference constants, and the longitude half-width is taken at
/// whichever edge of the box lies closest to a pole.
pub fn reach_bounds(center: &Point, meters: f64, metric: DistanceMetric) -> Bounds {
    let (lat_delta, lng_delta) = match metric {
        DistanceMetric::Haversine => {
            let angular = (meters / EARTH_RADIUS_METERS).to_degrees() * ENVELOPE_SLACK;
            let poleward = (center.lat().abs() + angular).min(MAX_SAFE_LATITUDE);
            (angular, angular / poleward.to_radians().cos())
        }
        DistanceMetric::Euclidean => (meters * ENVELOPE_SLACK, meters * ENVELOPE_SLACK),
    };
    Bounds::new(
        center.x() - lng_delta,
        center.y() - lat_delta,
        center.x() + lng_delta,
        center.y() + lat_delta,
    )
}

/// Whether two circles are too close under the given clearance and touch policy.
#[inline]
pub fn circles_conflict(
    a: &Circle,
    b: &Circle,
    metric: DistanceMetric,
    clearance: f64,
    policy: TouchPolicy,
) -> bool {
    let d = distance(&a.center, &b.center, metric);
    let limit = a.radius + b.radius + clearance;
    match policy {
        TouchPolicy::Accept => d < limit,
        TouchPolicy::Reject => d <= limit,
    }
}

/// Lay a hexagonal lattice of candidate centers over `bounds`.
///
/// Rows are `1.5 * radius` apart, columns `1.73 * radius` apart and every odd
/// row is shifted east by `0.866 * radius`. Points come out row-major, south
/// to north, then west to east. The output is a pure function of the inputs.
pub fn generate_hex_grid(bounds: &Bounds, radius: f64, metric: DistanceMetric) -> Vec<Point> {
    HexLattice::new(bounds, radius, metric).collect()
}

/// Lazy form of [`generate_hex_grid`], yielding the same points in the same
/// order without holding the lattice in memory.
#[derive(Debug, Clone)]
pub struct HexLattice {
    bounds: Bounds,
    radius: f64,
    metric: DistanceMetric,
    row_step: f64,
    row: usize,
    col: usize,
    /// Start and step of the current row, `None` once past the north edge
    current: Option<(f64, f64, f64)>,
}

impl HexLattice {
    pub fn new(bounds: &Bounds, radius: f64, metric: DistanceMetric) -> Self {
        let valid = radius.is_finite() && radius > 0.0;
        let row_step = if valid {
            meters_to_degrees(HEX_ROW_SPACING * radius, bounds.min_y(), metric).lat
        } else {
            0.0
        };

        let mut lattice = Self {
            bounds: *bounds,
            radius,
            metric,
            row_step,
            row: 0,
            col: 0,
            current: None,
        };
        if valid {
            lattice.current = lattice.row_layout(0);
        }
        lattice
    }

    /// `(y, x_start, col_step)` of a row, `None` past the north edge.
    fn row_layout(&self, row: usize) -> Option<(f64, f64, f64)> {
        let y = self.bounds.min_y() + row as f64 * self.row_step;
        if y > self.bounds.max_y() {
            return None;
        }

        let delta = meters_to_degrees(self.radius, y, self.metric);
        let x_start = if row % 2 == 1 {
            self.bounds.min_x() + HEX_ROW_OFFSET * delta.lng
        } else {
            self.bounds.min_x()
        };
        Some((y, x_start, HEX_COL_SPACING * delta.lng))
    }
}

impl Iterator for HexLattice {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        loop {
            let (y, x_start, col_step) = self.current?;
            let x = x_start + self.col as f64 * col_step;
            if x <= self.bounds.max_x() {
                self.col += 1;
                return Some(Point::new(x, y));
            }

            self.row += 1;
            self.col = 0;
            self.current = self.row_layout(self.row);
        }
    }
}

/// Candidate circles for subdividing a parent cell, largest first.
///
/// Starting at `parent_radius / start_divisor`, a hex lattice is laid over the
/// parent and only circles lying entirely inside it are kept. The radius then
/// shrinks by `shrink_factor` until it drops below `min_radius`.
pub fn generate_pack_candidates(
    parent_center: &Point,
    parent_radius: f64,
    min_radius: f64,
    metric: DistanceMetric,
    schedule: PackSchedule,
) -> Vec<Circle> {
    let shrink_ok = schedule.shrink_factor > 0.0 && schedule.shrink_factor < 1.0;
    if !(min_radius > 0.0 && parent_radius > 0.0 && shrink_ok && schedule.start_divisor > 0.0) {
        return Vec::new();
    }

    let area = reach_bounds(parent_center, parent_radius, metric);
    let mut candidates = Vec::new();
    let mut radius = parent_radius / schedule.start_divisor;

    while radius >= min_radius {
        for center in generate_hex_grid(&area, radius, metric) {
            if distance(parent_center, &center, metric) + radius <= parent_radius {
                candidates.push(Circle::new(center, radius));
            }
        }
        radius *= schedule.shrink_factor;
    }

    candidates.sort_by(|a, b| b.radius.total_cmp(&a.radius));
    candidates
}

/// Greedy sequential packing.
///
/// A candidate is accepted when its distance to every obstacle and every
/// previously accepted circle is at least the sum of the radii. Rejected
/// candidates are never reconsidered.
pub fn pack_circles(
    candidates: &[Circle],
    obstacles: &[Circle],
    metric: DistanceMetric,
) -> Vec<Circle> {
    let mut index = CircleIndex::new(metric);
    for obstacle in obstacles {
        index.insert(*obstacle, None);
    }

    let mut accepted = Vec::new();
    for candidate in candidates {
        if !(candidate.radius.is_finite() && candidate.radius > 0.0) {
            continue;
        }
        if index
            .first_conflict(candidate, 0.0, TouchPolicy::Accept)
            .is_none()
        {
            index.insert(*candidate, None);
            accepted.push(*candidate);
        }
    }
    accepted
}
