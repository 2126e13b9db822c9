//! Cell subdivision.
//!
//! A saturated cell is replaced by smaller circles greedily packed inside it,
//! clear of every neighbouring cell. The parent delete and the child insert
//! go through [`GridStore::replace_cell`], so a failure never leaves both the
//! parent and a partial set of children behind.

use crate::boundary::BoundaryProvider;
use crate::compute::geometry::{
    PackSchedule, TouchPolicy, circles_conflict, generate_pack_candidates, pack_circles,
};
use crate::config::GridConfig;
use crate::engine::cancel::CancelToken;
use crate::error::{GridError, Result};
use crate::storage::GridStore;
use gridcrawl_types::cell::{CellId, Circle};

/// Replaces saturated cells with packed children.
pub struct Subdivider<'a, B: ?Sized, S: ?Sized> {
    boundary: &'a B,
    store: &'a S,
    config: &'a GridConfig,
    cancel: CancelToken,
}

impl<'a, B, S> Subdivider<'a, B, S>
where
    B: BoundaryProvider + ?Sized,
    S: GridStore + ?Sized,
{
    pub fn new(boundary: &'a B, store: &'a S, config: &'a GridConfig) -> Self {
        Self {
            boundary,
            store,
            config,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Split a cell and return the number of children stored.
    ///
    /// A missing cell is a no-op returning zero, so retrying a split is
    /// harmless. Zero children is also a valid outcome: the parent is
    /// removed and its area counts as exhausted.
    pub fn split_cell(&self, id: CellId) -> Result<usize> {
        self.cancel.check()?;
        let Some(cell) = self.store.get_cell(id)? else {
            log::warn!("Cell {} not found, nothing to split", id);
            return Ok(0);
        };

        self.cancel.check()?;
        let search_radius = cell.radius * self.config.obstacle_search_factor;
        let obstacles = self
            .boundary
            .obstacles(&cell.center, search_radius, Some(id))?;

        let schedule = PackSchedule {
            start_divisor: self.config.pack_start_divisor,
            shrink_factor: self.config.pack_shrink_factor,
        };
        let candidates = generate_pack_candidates(
            &cell.center,
            cell.radius,
            self.config.min_radius,
            self.config.metric,
            schedule,
        );
        let children = pack_circles(&candidates, &obstacles, self.config.metric);

        self.verify_children(id, &children, &obstacles)?;

        self.cancel.check()?;
        match self.store.replace_cell(id, &children, cell.level + 1)? {
            Some(ids) => {
                log::info!(
                    "Split cell {} ({:.0}m, level {}) into {} children from {} candidates",
                    id,
                    cell.radius,
                    cell.level,
                    ids.len(),
                    candidates.len()
                );
                Ok(ids.len())
            }
            None => {
                log::warn!("Cell {} vanished before its children were stored", id);
                Ok(0)
            }
        }
    }

    /// Brute-force recheck of the packing before anything is written.
    fn verify_children(&self, id: CellId, children: &[Circle], obstacles: &[Circle]) -> Result<()> {
        let metric = self.config.metric;
        for (i, child) in children.iter().enumerate() {
            let hits_obstacle = obstacles
                .iter()
                .any(|obstacle| circles_conflict(child, obstacle, metric, 0.0, TouchPolicy::Accept));
            let hits_sibling = children[i + 1..]
                .iter()
                .any(|other| circles_conflict(child, other, metric, 0.0, TouchPolicy::Accept));

            if hits_obstacle || hits_sibling {
                return Err(GridError::InvariantViolation(format!(
                    "Child at ({}, {}) r={} of cell {} overlaps an existing circle",
                    child.center.x(),
                    child.center.y(),
                    child.radius,
                    id
                )));
            }
        }
        Ok(())
    }
}
