//! Wrapped geometric types from the `geo` crate.
//!
//! `Point` wraps `geo::Point`. `DistanceMetric` selects how meters map onto
//! coordinates.

use serde::{Deserialize, Serialize};

/// How distances and meter offsets are measured.
///
/// - **Haversine**: spherical earth, coordinates are lon/lat degrees
/// - **Euclidean**: planar, one coordinate unit is one meter (synthetic test geometry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Haversine,
    Euclidean,
}

/// A geographic point with longitude/latitude coordinates.
///
/// # Examples
///
/// ```
/// use gridcrawl_types::geo::Point;
///
/// let brussels = Point::new(4.3517, 50.8503);
/// assert_eq!(brussels.lon(), 4.3517);
/// assert_eq!(brussels.lat(), 50.8503);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    inner: geo::Point<f64>,
}

impl Point {
    /// Create a new point from x (longitude) and y (latitude) coordinates.
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            inner: geo::Point::new(x, y),
        }
    }

    /// Get the x coordinate (longitude).
    #[inline]
    pub fn x(&self) -> f64 {
        self.inner.x()
    }

    /// Get the y coordinate (latitude).
    #[inline]
    pub fn y(&self) -> f64 {
        self.inner.y()
    }

    #[inline]
    pub fn lon(&self) -> f64 {
        self.x()
    }

    #[inline]
    pub fn lat(&self) -> f64 {
        self.y()
    }

    /// Access the inner `geo::Point`.
    #[inline]
    pub fn inner(&self) -> &geo::Point<f64> {
        &self.inner
    }

    /// Convert into the inner `geo::Point`.
    #[inline]
    pub fn into_inner(self) -> geo::Point<f64> {
        self.inner
    }
}

impl From<geo::Point<f64>> for Point {
    fn from(point: geo::Point<f64>) -> Self {
        Self { inner: point }
    }
}

impl From<Point> for geo::Point<f64> {
    fn from(point: Point) -> Self {
        point.inner
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl From<Point> for (f64, f64) {
    fn from(point: Point) -> Self {
        (point.x(), point.y())
    }
}
