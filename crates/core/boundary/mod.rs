//! Country boundaries and candidate validation.
//!
//! [`BoundaryProvider`] is the engine's single batched validity predicate:
//! given candidate centers and a radius it returns the ones whose circle lies
//! inside the country and clear of every stored cell. [`PolygonBoundary`]
//! answers it in-process from country polygons and a [`GridStore`]; an
//! adapter over a spatial database can implement the same trait.

use crate::compute::geojson::countries_from_geojson;
use crate::compute::geometry::reach_bounds;
use crate::compute::validation::{validate_polygon, validate_radius};
use crate::config::GridConfig;
use crate::error::{GridError, Result};
use crate::storage::GridStore;
use geo::{BoundingRect, Contains, Coord, LineString, MultiPolygon, Polygon};
use gridcrawl_types::bounds::Bounds;
use gridcrawl_types::cell::{CellId, Circle, country_key};
use gridcrawl_types::geo::{DistanceMetric, Point};
use rustc_hash::FxHashMap;
use std::f64::consts::PI;
use std::sync::Arc;

/// Supplies country extents, candidate validation and obstacle lookups.
///
/// Failures are returned as-is; the engine does not retry them.
pub trait BoundaryProvider: Send + Sync {
    /// Bounding box of a country. Fails with `CountryNotFound`.
    fn bounds(&self, country: &str) -> Result<Bounds>;

    /// Candidates whose `radius` circle is fully inside `country` and does
    /// not touch or overlap any stored cell.
    ///
    /// Stops after `limit` survivors when a limit is given. An empty result is
    /// a normal outcome.
    fn validate_points(
        &self,
        candidates: &[Point],
        radius: f64,
        country: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Point>>;

    /// Stored cells within `search_radius` meters of `center`.
    fn obstacles(
        &self,
        center: &Point,
        search_radius: f64,
        exclude: Option<CellId>,
    ) -> Result<Vec<Circle>>;
}

struct CountryShape {
    polygon: MultiPolygon,
    bounds: Bounds,
}

/// In-process provider backed by country polygons and a grid store.
pub struct PolygonBoundary<S> {
    countries: FxHashMap<String, CountryShape>,
    store: Arc<S>,
    metric: DistanceMetric,
    clearance: f64,
    segments: usize,
}

impl<S: GridStore> PolygonBoundary<S> {
    pub fn new(store: Arc<S>, config: &GridConfig) -> Self {
        Self {
            countries: FxHashMap::default(),
            store,
            metric: config.metric,
            clearance: config.overlap_clearance,
            segments: config.circle_segments.max(8),
        }
    }

    /// Register a country boundary. Codes are case-insensitive.
    pub fn insert_country(&mut self, code: &str, polygon: MultiPolygon) -> Result<()> {
        for part in &polygon.0 {
            validate_polygon(part, self.metric)?;
        }
        let rect = polygon.bounding_rect().ok_or_else(|| {
            GridError::InvalidInput(format!("Boundary for {} has no coordinates", code))
        })?;

        self.countries.insert(
            country_key(code),
            CountryShape {
                polygon,
                bounds: Bounds::from_rect(rect),
            },
        );
        Ok(())
    }

    pub fn with_country(mut self, code: &str, polygon: MultiPolygon) -> Result<Self> {
        self.insert_country(code, polygon)?;
        Ok(self)
    }

    /// Register every country found in a GeoJSON document.
    ///
    /// Returns the number of countries loaded.
    pub fn load_geojson(&mut self, geojson: &str) -> Result<usize> {
        let countries = countries_from_geojson(geojson)?;
        let loaded = countries.len();
        for (code, polygon) in countries {
            self.insert_country(&code, polygon)?;
        }
        log::info!("Loaded {} country boundaries", loaded);
        Ok(loaded)
    }

    pub fn country_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.countries.keys().cloned().collect();
        codes.sort();
        codes
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn country(&self, code: &str) -> Result<&CountryShape> {
        self.countries
            .get(&country_key(code))
            .ok_or_else(|| GridError::CountryNotFound(code.to_string()))
    }

    /// Box around the polygon circumscribing a `radius` circle at `center`.
    fn buffer_reach(&self, center: &Point, radius: f64) -> Bounds {
        let vertex_radius = radius / (PI / self.segments as f64).cos();
        reach_bounds(center, vertex_radius, self.metric)
    }
}

impl CountryShape {
    /// Whether a buffered circle lies entirely inside the country.
    ///
    /// The circle is replaced by a polygon circumscribing it, so a `true`
    /// answer also holds for the exact circle.
    fn contains_buffer(&self, center: &Point, reach: &Bounds, segments: usize) -> bool {
        let buffer = buffered_circle(center, reach, segments);
        self.polygon.0.iter().any(|part| part.contains(&buffer))
    }
}

impl<S: GridStore> BoundaryProvider for PolygonBoundary<S> {
    fn bounds(&self, country: &str) -> Result<Bounds> {
        Ok(self.country(country)?.bounds)
    }

    fn validate_points(
        &self,
        candidates: &[Point],
        radius: f64,
        country: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Point>> {
        validate_radius(radius)?;
        let shape = self.country(country)?;
        let limit = limit.unwrap_or(usize::MAX);

        let mut survivors = Vec::new();
        for candidate in candidates {
            if survivors.len() >= limit {
                break;
            }
            let reach = self.buffer_reach(candidate, radius);
            if !shape.bounds.contains_bounds(&reach) {
                continue;
            }
            // index lookup first, polygon containment is the expensive test
            if self.store.conflicts(candidate, radius, self.clearance)? {
                continue;
            }
            if shape.contains_buffer(candidate, &reach, self.segments) {
                survivors.push(*candidate);
            }
        }
        Ok(survivors)
    }

    fn obstacles(
        &self,
        center: &Point,
        search_radius: f64,
        exclude: Option<CellId>,
    ) -> Result<Vec<Circle>> {
        self.store.obstacles(center, search_radius, exclude)
    }
}

/// Polygon whose vertices trace the ellipse inscribed in `reach`.
fn buffered_circle(center: &Point, reach: &Bounds, segments: usize) -> Polygon {
    let half_width = reach.width() / 2.0;
    let half_height = reach.height() / 2.0;

    let mut ring: Vec<Coord> = (0..segments)
        .map(|k| {
            let theta = 2.0 * PI * k as f64 / segments as f64;
            Coord {
                x: center.x() + half_width * theta.cos(),
                y: center.y() + half_height * theta.sin(),
            }
        })
        .collect();
    if let Some(first) = ring.first().copied() {
        ring.push(first);
    }

    Polygon::new(LineString::from(ring), vec![])
}
