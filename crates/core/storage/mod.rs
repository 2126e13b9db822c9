//! Grid storage abstraction.
//!
//! The engine never owns cells. It reads and writes them through
//! [`GridStore`], so the same generator and subdivider can run against the
//! in-process [`MemoryGridStore`] or an adapter over an external spatial
//! database. Implementations use interior mutability; every method takes
//! `&self` so one store can be shared by the engine and a boundary provider.

use crate::error::Result;
use gridcrawl_types::bounds::Bounds;
use gridcrawl_types::cell::{Cell, CellId, Circle, CrawlProgress};
use gridcrawl_types::geo::Point;
use serde::Serialize;
use std::collections::BTreeMap;

mod memory;
#[cfg(feature = "snapshot")]
pub mod snapshot;

pub use memory::MemoryGridStore;

/// Durable set of placed cells.
pub trait GridStore: Send + Sync {
    /// Insert circles as new unprocessed cells of `country` at `level`.
    ///
    /// No overlap check is performed; callers validate first.
    fn insert_cells(&self, country: &str, circles: &[Circle], level: u32) -> Result<Vec<CellId>>;

    /// Delete a cell. Returns `false` if it did not exist.
    fn delete_cell(&self, id: CellId) -> Result<bool>;

    /// Delete `parent` and insert `children` at `level` as one unit. The
    /// children belong to the parent's country.
    ///
    /// Returns `None` without touching anything if the parent is gone.
    fn replace_cell(
        &self,
        parent: CellId,
        children: &[Circle],
        level: u32,
    ) -> Result<Option<Vec<CellId>>>;

    fn get_cell(&self, id: CellId) -> Result<Option<Cell>>;

    /// Smallest radius among a country's live cells, `None` when it has none.
    fn min_radius(&self, country: &str) -> Result<Option<f64>>;

    /// Deepest level among a country's live cells.
    fn max_level(&self, country: &str) -> Result<Option<u32>>;

    /// Live cells of one country.
    fn country_count(&self, country: &str) -> Result<usize>;

    /// Cells whose circle comes within `search_radius` meters of `center`.
    fn obstacles(
        &self,
        center: &Point,
        search_radius: f64,
        exclude: Option<CellId>,
    ) -> Result<Vec<Circle>>;

    /// Whether a circle at `center` would come within `clearance` meters of
    /// any live cell of any country. Touching counts as a conflict.
    fn conflicts(&self, center: &Point, radius: f64, clearance: f64) -> Result<bool>;

    /// Cells whose footprint intersects a viewport.
    fn cells_in_bounds(&self, bounds: &Bounds) -> Result<Vec<Cell>>;

    /// Cells covering a point.
    fn cells_containing(&self, point: &Point) -> Result<Vec<Cell>>;

    /// All live cells ordered by id.
    fn cells(&self) -> Result<Vec<Cell>>;

    fn next_unprocessed(&self) -> Result<Option<CellId>>;

    /// Fails with [`GridError::CellNotFound`](crate::GridError::CellNotFound)
    /// for a missing cell.
    fn mark_processed(&self, id: CellId) -> Result<()>;

    fn update_progress(&self, id: CellId, progress: CrawlProgress) -> Result<()>;

    fn count(&self) -> Result<usize>;

    /// Remove every cell.
    fn clear(&self) -> Result<()>;

    fn stats(&self) -> Result<GridStats>;
}

/// Grid statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GridStats {
    /// Live cells
    pub cell_count: usize,
    /// Cells the crawl loop has finished
    pub processed_count: usize,
    /// Live cells per level
    pub cells_per_level: BTreeMap<u32, usize>,
    /// Live cells per country code
    pub cells_per_country: BTreeMap<String, usize>,
    pub min_radius: Option<f64>,
    pub max_radius: Option<f64>,
    /// Mutating operations since the store was created
    pub operations_count: u64,
}

impl GridStats {
    pub fn unprocessed_count(&self) -> usize {
        self.cell_count - self.processed_count
    }
}
