//! Validation for coordinates, radii and boundary polygons.

use crate::error::{GridError, Result};
use gridcrawl_types::geo::{DistanceMetric, Point};

/// Validates a point has a finite longitude in [-180, 180] and latitude in [-90, 90].
///
/// # Examples
///
/// ```
/// use gridcrawl::compute::validation::validate_geographic_point;
/// use gridcrawl::Point;
///
/// assert!(validate_geographic_point(&Point::new(4.35, 50.85)).is_ok());
/// assert!(validate_geographic_point(&Point::new(200.0, 40.0)).is_err());
/// assert!(validate_geographic_point(&Point::new(-74.0, 95.0)).is_err());
/// ```
pub fn validate_geographic_point(point: &Point) -> Result<()> {
    let (x, y) = (point.x(), point.y());

    if !x.is_finite() {
        return Err(GridError::InvalidInput(format!(
            "Longitude must be finite, got: {}",
            x
        )));
    }

    if !y.is_finite() {
        return Err(GridError::InvalidInput(format!(
            "Latitude must be finite, got: {}",
            y
        )));
    }

    if !(-180.0..=180.0).contains(&x) {
        return Err(GridError::InvalidInput(format!(
            "Longitude out of range [-180.0, 180.0]: {}",
            x
        )));
    }

    if !(-90.0..=90.0).contains(&y) {
        return Err(GridError::InvalidInput(format!(
            "Latitude out of range [-90.0, 90.0]: {}",
            y
        )));
    }

    Ok(())
}

/// Validates a point under the given metric. Planar points only need to be finite.
pub fn validate_point(point: &Point, metric: DistanceMetric) -> Result<()> {
    match metric {
        DistanceMetric::Haversine => validate_geographic_point(point),
        DistanceMetric::Euclidean => {
            if point.x().is_finite() && point.y().is_finite() {
                Ok(())
            } else {
                Err(GridError::InvalidInput(format!(
                    "Coordinates must be finite, got: ({}, {})",
                    point.x(),
                    point.y()
                )))
            }
        }
    }
}

/// Validates that a radius is a finite, strictly positive number of meters.
pub fn validate_radius(radius: f64) -> Result<()> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(GridError::InvalidInput(format!(
            "Radius must be a positive number of meters, got: {}",
            radius
        )))
    }
}

/// Validates all exterior and interior ring coordinates of a polygon.
pub fn validate_polygon(polygon: &geo::Polygon, metric: DistanceMetric) -> Result<()> {
    for (idx, coord) in polygon.exterior().coords().enumerate() {
        validate_point(&Point::new(coord.x, coord.y), metric).map_err(|e| {
            GridError::InvalidInput(format!("Exterior ring point at index {}: {}", idx, e))
        })?;
    }

    for (ring_idx, interior) in polygon.interiors().iter().enumerate() {
        for (idx, coord) in interior.coords().enumerate() {
            validate_point(&Point::new(coord.x, coord.y), metric).map_err(|e| {
                GridError::InvalidInput(format!(
                    "Interior ring {} point at index {}: {}",
                    ring_idx, idx, e
                ))
            })?;
        }
    }

    Ok(())
}
