//! Grid cells and the circles they are built from.

use crate::geo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned identity of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(pub u64);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CellId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A circle: a center and a radius in meters.
///
/// Used for candidates (never persisted), obstacles and packed children.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point,
    /// Radius in meters
    pub radius: f64,
}

impl Circle {
    #[inline]
    pub fn new(center: Point, radius: f64) -> Self {
        Self { center, radius }
    }
}

/// Pagination state of the place search for one cell.
///
/// Written by the crawl side only; the grid engine never touches it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlProgress {
    pub current_page: u32,
    pub next_page_token: Option<String>,
    pub total_results: u64,
}

/// Canonical form of a country code: trimmed and uppercased.
pub fn country_key(code: &str) -> String {
    code.trim().to_uppercase()
}

/// A persisted circular search region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    /// Country the cell was generated for, see [`country_key`]
    pub country: String,
    pub center: Point,
    /// Radius in meters, strictly positive
    pub radius: f64,
    /// 0 for the initial pass, parent level + 1 after a subdivision
    pub level: u32,
    pub is_processed: bool,
    pub crawl_progress: Option<CrawlProgress>,
}

impl Cell {
    /// Create an unprocessed cell with no crawl progress.
    pub fn new(id: CellId, country: &str, center: Point, radius: f64, level: u32) -> Self {
        Self {
            id,
            country: country_key(country),
            center,
            radius,
            level,
            is_processed: false,
            crawl_progress: None,
        }
    }

    /// The cell's footprint as a plain circle.
    #[inline]
    pub fn circle(&self) -> Circle {
        Circle::new(self.center, self.radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cell_is_unprocessed() {
        let cell = Cell::new(CellId(7), " bel", Point::new(4.0, 50.0), 1_000.0, 2);
        assert_eq!(cell.country, "BEL");
        assert!(!cell.is_processed);
        assert!(cell.crawl_progress.is_none());
        assert_eq!(cell.circle(), Circle::new(Point::new(4.0, 50.0), 1_000.0));
    }

    #[test]
    fn test_cell_id_display() {
        assert_eq!(CellId(42).to_string(), "42");
        assert_eq!(CellId::from(3), CellId(3));
    }
}
