//! In-memory grid store.

use super::{GridStats, GridStore};
use crate::compute::geometry::{TouchPolicy, distance};
use crate::compute::index::CircleIndex;
use crate::compute::validation::{validate_point, validate_radius};
use crate::error::{GridError, Result};
use gridcrawl_types::bounds::Bounds;
use gridcrawl_types::cell::{Cell, CellId, Circle, CrawlProgress, country_key};
use gridcrawl_types::geo::{DistanceMetric, Point};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
#[cfg(feature = "snapshot")]
use std::path::Path;

/// Grid store keeping every cell in memory, indexed by an R*-tree.
///
/// All reads and writes go through one `RwLock`, so `replace_cell` is atomic
/// with respect to every other call.
pub struct MemoryGridStore {
    metric: DistanceMetric,
    inner: RwLock<GridInner>,
}

struct GridInner {
    cells: FxHashMap<CellId, Cell>,
    index: CircleIndex,
    unprocessed: BTreeSet<CellId>,
    next_id: u64,
    operations_count: u64,
}

impl GridInner {
    fn empty(metric: DistanceMetric) -> Self {
        Self {
            cells: FxHashMap::default(),
            index: CircleIndex::new(metric),
            unprocessed: BTreeSet::new(),
            next_id: 1,
            operations_count: 0,
        }
    }

    fn insert(&mut self, country: &str, circles: &[Circle], level: u32) -> Vec<CellId> {
        let mut ids = Vec::with_capacity(circles.len());
        for circle in circles {
            let id = CellId(self.next_id);
            self.next_id += 1;
            self.cells.insert(
                id,
                Cell::new(id, country, circle.center, circle.radius, level),
            );
            self.index.insert(*circle, Some(id));
            self.unprocessed.insert(id);
            ids.push(id);
        }
        self.operations_count += 1;
        ids
    }

    fn remove(&mut self, id: CellId) -> Option<Cell> {
        let cell = self.cells.remove(&id)?;
        self.index.remove(&cell.circle(), Some(id));
        self.unprocessed.remove(&id);
        self.operations_count += 1;
        Some(cell)
    }

    fn of_country<'a>(&'a self, country: &str) -> impl Iterator<Item = &'a Cell> + use<'a> {
        let key = country_key(country);
        self.cells.values().filter(move |cell| cell.country == key)
    }

    fn lookup(&self, hits: Vec<(Circle, Option<CellId>)>) -> Vec<Cell> {
        let mut cells: Vec<Cell> = hits
            .into_iter()
            .filter_map(|(_, id)| id.and_then(|id| self.cells.get(&id).cloned()))
            .collect();
        cells.sort_by_key(|cell| cell.id);
        cells
    }
}

impl MemoryGridStore {
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            metric,
            inner: RwLock::new(GridInner::empty(metric)),
        }
    }

    /// Rebuild a store from previously persisted cells.
    ///
    /// New ids continue after both `next_id` and the largest loaded id.
    pub fn from_cells(cells: Vec<Cell>, next_id: u64, metric: DistanceMetric) -> Self {
        let highest = cells.iter().map(|cell| cell.id.0).max().unwrap_or(0);
        let index = CircleIndex::bulk_load(
            cells.iter().map(|cell| (cell.circle(), Some(cell.id))),
            metric,
        );
        let unprocessed = cells
            .iter()
            .filter(|cell| !cell.is_processed)
            .map(|cell| cell.id)
            .collect();
        let cells = cells.into_iter().map(|cell| (cell.id, cell)).collect();

        Self {
            metric,
            inner: RwLock::new(GridInner {
                cells,
                index,
                unprocessed,
                next_id: next_id.max(highest + 1),
                operations_count: 0,
            }),
        }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Write every cell to a snapshot file, replacing it atomically.
    #[cfg(feature = "snapshot")]
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let data = {
            let inner = self.inner.read();
            let mut cells: Vec<Cell> = inner.cells.values().cloned().collect();
            cells.sort_by_key(|cell| cell.id);
            super::snapshot::SnapshotData {
                next_id: inner.next_id,
                cells,
            }
        };
        super::snapshot::SnapshotFile::new(path).save(&data)
    }

    /// Load a store from a snapshot file. A missing file yields an empty store.
    #[cfg(feature = "snapshot")]
    pub fn load_snapshot<P: AsRef<Path>>(path: P, metric: DistanceMetric) -> Result<Self> {
        let data = super::snapshot::SnapshotFile::new(path).load()?;
        log::debug!("Loaded {} cells from snapshot", data.cells.len());
        Ok(Self::from_cells(data.cells, data.next_id, metric))
    }

    fn check_circles(&self, circles: &[Circle]) -> Result<()> {
        for circle in circles {
            validate_point(&circle.center, self.metric)?;
            validate_radius(circle.radius)?;
        }
        Ok(())
    }
}

impl Default for MemoryGridStore {
    fn default() -> Self {
        Self::new(DistanceMetric::default())
    }
}

impl GridStore for MemoryGridStore {
    fn insert_cells(&self, country: &str, circles: &[Circle], level: u32) -> Result<Vec<CellId>> {
        self.check_circles(circles)?;
        Ok(self.inner.write().insert(country, circles, level))
    }

    fn delete_cell(&self, id: CellId) -> Result<bool> {
        Ok(self.inner.write().remove(id).is_some())
    }

    fn replace_cell(
        &self,
        parent: CellId,
        children: &[Circle],
        level: u32,
    ) -> Result<Option<Vec<CellId>>> {
        self.check_circles(children)?;

        let mut inner = self.inner.write();
        let Some(removed) = inner.remove(parent) else {
            return Ok(None);
        };
        Ok(Some(inner.insert(&removed.country, children, level)))
    }

    fn get_cell(&self, id: CellId) -> Result<Option<Cell>> {
        Ok(self.inner.read().cells.get(&id).cloned())
    }

    fn min_radius(&self, country: &str) -> Result<Option<f64>> {
        Ok(self
            .inner
            .read()
            .of_country(country)
            .map(|cell| cell.radius)
            .min_by(f64::total_cmp))
    }

    fn max_level(&self, country: &str) -> Result<Option<u32>> {
        Ok(self.inner.read().of_country(country).map(|cell| cell.level).max())
    }

    fn country_count(&self, country: &str) -> Result<usize> {
        Ok(self.inner.read().of_country(country).count())
    }

    fn obstacles(
        &self,
        center: &Point,
        search_radius: f64,
        exclude: Option<CellId>,
    ) -> Result<Vec<Circle>> {
        let inner = self.inner.read();
        let reach = search_radius + inner.index.max_radius();
        let mut found: Vec<(Circle, Option<CellId>)> = inner
            .index
            .within(center, reach)
            .into_iter()
            .filter(|(_, id)| exclude.is_none() || *id != exclude)
            .filter(|(circle, _)| {
                distance(center, &circle.center, self.metric) - circle.radius <= search_radius
            })
            .collect();
        found.sort_by_key(|(_, id)| *id);
        Ok(found.into_iter().map(|(circle, _)| circle).collect())
    }

    fn conflicts(&self, center: &Point, radius: f64, clearance: f64) -> Result<bool> {
        let candidate = Circle::new(*center, radius);
        Ok(self
            .inner
            .read()
            .index
            .first_conflict(&candidate, clearance, TouchPolicy::Reject)
            .is_some())
    }

    fn cells_in_bounds(&self, bounds: &Bounds) -> Result<Vec<Cell>> {
        let inner = self.inner.read();
        let hits = inner.index.intersecting(bounds);
        Ok(inner.lookup(hits))
    }

    fn cells_containing(&self, point: &Point) -> Result<Vec<Cell>> {
        let inner = self.inner.read();
        let hits = inner.index.containing(point);
        Ok(inner.lookup(hits))
    }

    fn cells(&self) -> Result<Vec<Cell>> {
        let inner = self.inner.read();
        let mut cells: Vec<Cell> = inner.cells.values().cloned().collect();
        cells.sort_by_key(|cell| cell.id);
        Ok(cells)
    }

    fn next_unprocessed(&self) -> Result<Option<CellId>> {
        Ok(self.inner.read().unprocessed.first().copied())
    }

    fn mark_processed(&self, id: CellId) -> Result<()> {
        let mut inner = self.inner.write();
        let cell = inner.cells.get_mut(&id).ok_or(GridError::CellNotFound(id))?;
        cell.is_processed = true;
        inner.unprocessed.remove(&id);
        inner.operations_count += 1;
        Ok(())
    }

    fn update_progress(&self, id: CellId, progress: CrawlProgress) -> Result<()> {
        let mut inner = self.inner.write();
        let cell = inner.cells.get_mut(&id).ok_or(GridError::CellNotFound(id))?;
        cell.crawl_progress = Some(progress);
        inner.operations_count += 1;
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.inner.read().cells.len())
    }

    fn clear(&self) -> Result<()> {
        let mut inner = self.inner.write();
        let removed = inner.cells.len();
        inner.cells.clear();
        inner.index.clear();
        inner.unprocessed.clear();
        inner.operations_count += 1;
        log::debug!("Cleared {} cells", removed);
        Ok(())
    }

    fn stats(&self) -> Result<GridStats> {
        let inner = self.inner.read();
        let mut stats = GridStats {
            cell_count: inner.cells.len(),
            processed_count: inner.cells.len() - inner.unprocessed.len(),
            operations_count: inner.operations_count,
            ..Default::default()
        };

        for cell in inner.cells.values() {
            *stats.cells_per_level.entry(cell.level).or_insert(0) += 1;
            *stats
                .cells_per_country
                .entry(cell.country.clone())
                .or_insert(0) += 1;
            stats.min_radius = Some(stats.min_radius.map_or(cell.radius, |r| r.min(cell.radius)));
            stats.max_radius = Some(stats.max_radius.map_or(cell.radius, |r| r.max(cell.radius)));
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planar() -> MemoryGridStore {
        MemoryGridStore::new(DistanceMetric::Euclidean)
    }

    fn circle(x: f64, y: f64, r: f64) -> Circle {
        Circle::new(Point::new(x, y), r)
    }

    #[test]
    fn test_insert_and_get() {
        let store = planar();
        let ids = store
            .insert_cells("TST", &[circle(0.0, 0.0, 5.0), circle(20.0, 0.0, 3.0)], 0)
            .unwrap();
        assert_eq!(ids, vec![CellId(1), CellId(2)]);
        assert_eq!(store.count().unwrap(), 2);

        let cell = store.get_cell(CellId(2)).unwrap().unwrap();
        assert_eq!(cell.radius, 3.0);
        assert_eq!(cell.level, 0);
        assert!(!cell.is_processed);
        assert!(cell.crawl_progress.is_none());

        assert_eq!(store.min_radius("TST").unwrap(), Some(3.0));
        assert_eq!(store.max_level("TST").unwrap(), Some(0));
    }

    #[test]
    fn test_empty_store() {
        let store = planar();
        assert_eq!(store.min_radius("TST").unwrap(), None);
        assert_eq!(store.max_level("TST").unwrap(), None);
        assert_eq!(store.next_unprocessed().unwrap(), None);
        assert!(store.get_cell(CellId(1)).unwrap().is_none());
    }

    #[test]
    fn test_invalid_circle_rejected_without_partial_insert() {
        let store = planar();
        let result = store.insert_cells("TST", &[circle(0.0, 0.0, 5.0), circle(9.0, 9.0, -1.0)], 0);
        assert!(matches!(result, Err(GridError::InvalidInput(_))));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_delete() {
        let store = planar();
        let ids = store.insert_cells("TST", &[circle(0.0, 0.0, 5.0)], 0).unwrap();
        assert!(store.delete_cell(ids[0]).unwrap());
        assert!(!store.delete_cell(ids[0]).unwrap());
        assert!(!store.conflicts(&Point::new(0.0, 0.0), 1.0, 0.0).unwrap());
    }

    #[test]
    fn test_conflicts_reject_touching() {
        let store = planar();
        store.insert_cells("TST", &[circle(0.0, 0.0, 5.0)], 0).unwrap();
        assert!(store.conflicts(&Point::new(10.0, 0.0), 5.0, 0.0).unwrap());
        assert!(!store.conflicts(&Point::new(10.5, 0.0), 5.0, 0.0).unwrap());
        assert!(store.conflicts(&Point::new(10.5, 0.0), 5.0, 1.0).unwrap());
    }

    #[test]
    fn test_replace_cell() {
        let store = planar();
        let parent = store.insert_cells("TST", &[circle(0.0, 0.0, 10.0)], 0).unwrap()[0];

        let children = [circle(-4.0, 0.0, 3.0), circle(4.0, 0.0, 3.0)];
        let ids = store.replace_cell(parent, &children, 1).unwrap().unwrap();
        assert_eq!(ids.len(), 2);
        assert!(store.get_cell(parent).unwrap().is_none());
        assert_eq!(store.max_level("TST").unwrap(), Some(1));

        // parent already gone
        assert!(store.replace_cell(parent, &children, 1).unwrap().is_none());
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.get_cell(ids[0]).unwrap().unwrap().country, "TST");
    }

    #[test]
    fn test_radius_and_level_scoped_by_country() {
        let store = planar();
        store.insert_cells("TST", &[circle(0.0, 0.0, 8.0)], 0).unwrap();
        store.insert_cells("TST", &[circle(20.0, 0.0, 3.0)], 2).unwrap();
        store.insert_cells("oth", &[circle(100.0, 0.0, 5.0)], 0).unwrap();

        assert_eq!(store.min_radius("TST").unwrap(), Some(3.0));
        assert_eq!(store.max_level("TST").unwrap(), Some(2));
        assert_eq!(store.min_radius("OTH").unwrap(), Some(5.0));
        assert_eq!(store.max_level(" oth ").unwrap(), Some(0));
        assert_eq!(store.min_radius("NON").unwrap(), None);

        assert_eq!(store.country_count("TST").unwrap(), 2);
        assert_eq!(store.country_count("OTH").unwrap(), 1);
        assert_eq!(store.count().unwrap(), 3);

        let stats = store.stats().unwrap();
        assert_eq!(stats.cells_per_country.get("TST"), Some(&2));
        assert_eq!(stats.cells_per_country.get("OTH"), Some(&1));
    }

    #[test]
    fn test_obstacles_exclude_and_reach() {
        let store = planar();
        let ids = store
            .insert_cells(
                "TST",
                &[
                    circle(0.0, 0.0, 10.0),
                    circle(25.0, 0.0, 5.0),
                    circle(100.0, 0.0, 75.0),
                    circle(500.0, 0.0, 5.0),
                ],
                0,
            )
            .unwrap();

        let found = store.obstacles(&Point::new(0.0, 0.0), 30.0, Some(ids[0])).unwrap();
        // the big circle's edge is 25m away even though its center is 100m out
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|c| c.center.x() != 0.0));
        assert!(found.iter().all(|c| c.center.x() != 500.0));
    }

    #[test]
    fn test_processing_queue() {
        let store = planar();
        let ids = store
            .insert_cells("TST", &[circle(0.0, 0.0, 1.0), circle(10.0, 0.0, 1.0)], 0)
            .unwrap();

        assert_eq!(store.next_unprocessed().unwrap(), Some(ids[0]));
        store.mark_processed(ids[0]).unwrap();
        assert_eq!(store.next_unprocessed().unwrap(), Some(ids[1]));

        let progress = CrawlProgress {
            current_page: 2,
            next_page_token: Some("abc".into()),
            total_results: 40,
        };
        store.update_progress(ids[1], progress.clone()).unwrap();
        let cell = store.get_cell(ids[1]).unwrap().unwrap();
        assert_eq!(cell.crawl_progress, Some(progress));

        assert!(matches!(
            store.mark_processed(CellId(99)),
            Err(GridError::CellNotFound(CellId(99)))
        ));

        let stats = store.stats().unwrap();
        assert_eq!(stats.cell_count, 2);
        assert_eq!(stats.processed_count, 1);
        assert_eq!(stats.unprocessed_count(), 1);
    }

    #[test]
    fn test_point_and_viewport_queries() {
        let store = planar();
        store
            .insert_cells("TST", &[circle(0.0, 0.0, 5.0), circle(20.0, 0.0, 5.0)], 0)
            .unwrap();

        let hits = store.cells_containing(&Point::new(18.0, 1.0)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].center.x(), 20.0);

        let all = store.cells_in_bounds(&Bounds::new(-10.0, -10.0, 30.0, 10.0)).unwrap();
        assert_eq!(all.len(), 2);
        assert!(store.cells_in_bounds(&Bounds::new(40.0, 40.0, 50.0, 50.0)).unwrap().is_empty());
    }

    #[test]
    fn test_clear_keeps_id_sequence() {
        let store = planar();
        store.insert_cells("TST", &[circle(0.0, 0.0, 1.0)], 0).unwrap();
        store.clear().unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(store.min_radius("TST").unwrap(), None);

        let ids = store.insert_cells("TST", &[circle(0.0, 0.0, 1.0)], 0).unwrap();
        assert_eq!(ids, vec![CellId(2)]);
    }

    #[test]
    fn test_stats_per_level() {
        let store = planar();
        store
            .insert_cells("TST", &[circle(0.0, 0.0, 8.0), circle(30.0, 0.0, 8.0)], 0)
            .unwrap();
        store.insert_cells("TST", &[circle(15.0, 20.0, 2.0)], 1).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.cell_count, 3);
        assert_eq!(stats.cells_per_level.get(&0), Some(&2));
        assert_eq!(stats.cells_per_level.get(&1), Some(&1));
        assert_eq!(stats.min_radius, Some(2.0));
        assert_eq!(stats.max_radius, Some(8.0));
    }

    #[test]
    fn test_from_cells_continues_ids() {
        let mut cell = Cell::new(CellId(7), "TST", Point::new(0.0, 0.0), 2.0, 3);
        cell.is_processed = true;
        let store = MemoryGridStore::from_cells(vec![cell], 1, DistanceMetric::Euclidean);

        assert_eq!(store.next_unprocessed().unwrap(), None);
        assert!(store.conflicts(&Point::new(3.0, 0.0), 1.0, 0.0).unwrap());
        let ids = store.insert_cells("TST", &[circle(50.0, 0.0, 1.0)], 4).unwrap();
        assert_eq!(ids, vec![CellId(8)]);
    }
}
