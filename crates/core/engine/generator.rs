//! Descending-radius grid generation.
//!
//! The generator covers a country level by level. Each level lays a hex
//! lattice over the country bounds at the current radius, keeps the centers
//! the boundary provider accepts and stores them. It then searches downward for
//! the next radius at which at least one more circle fits:
//!
//! ```text
//! Idle -> Resuming | StartingFresh -> GeneratingLevel -> ProbingNextRadius
//!                                           ^                   |
//!                                           +-------------------+
//!                                    (until radius < min_radius) -> Done
//! ```
//!
//! Lattices are streamed to the boundary provider in batches of
//! `validation_batch` candidates, so memory stays flat however fine a level
//! gets.
//!
//! Only persisted cells drive resumption, and only those of the country being
//! generated. A run interrupted at any point can be started again and
//! continues strictly below that country's smallest stored radius.

use crate::boundary::BoundaryProvider;
use crate::compute::geometry::{HexLattice, TouchPolicy};
use crate::compute::index::CircleIndex;
use crate::config::GridConfig;
use crate::engine::cancel::CancelToken;
use crate::error::{GridError, Result};
use crate::storage::GridStore;
use gridcrawl_types::bounds::Bounds;
use gridcrawl_types::cell::Circle;
use gridcrawl_types::geo::Point;
use serde::Serialize;

/// Where a generation run currently is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeneratorState {
    Idle,
    /// Existing cells found; continuing below their smallest radius.
    Resuming { from_radius: f64 },
    StartingFresh,
    GeneratingLevel { radius: f64, level: u32 },
    /// Searching below `after` for the next radius that fits anything.
    ProbingNextRadius { after: f64 },
    Done,
}

/// Cells placed by one level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelReport {
    pub level: u32,
    pub radius: f64,
    pub placed: usize,
}

/// Outcome of a generation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationReport {
    /// Cells present before the run plus cells it inserted
    pub total_cells: usize,
    pub new_cells: usize,
    /// One entry per generated level, including empty ones
    pub levels: Vec<LevelReport>,
    /// Radius that ended the loop (below `min_radius`)
    pub final_radius: f64,
}

/// Runs the adaptive generation loop for one country.
pub struct GridGenerator<'a, B: ?Sized, S: ?Sized> {
    boundary: &'a B,
    store: &'a S,
    config: &'a GridConfig,
    cancel: CancelToken,
    state: GeneratorState,
}

impl<'a, B, S> GridGenerator<'a, B, S>
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
            state: GeneratorState::Idle,
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> GeneratorState {
        self.state
    }

    /// Generate or resume the grid for `country`.
    pub fn run(&mut self, country: &str) -> Result<GenerationReport> {
        self.config.validate().map_err(GridError::InvalidConfig)?;
        self.state = GeneratorState::Idle;

        self.cancel.check()?;
        let bounds = self.boundary.bounds(country)?;

        self.cancel.check()?;
        let existing_cells = self.store.country_count(country)?;
        self.cancel.check()?;
        let existing_min = self.store.min_radius(country)?;

        let (mut radius, mut level) = match existing_min {
            Some(min) => {
                self.state = GeneratorState::Resuming { from_radius: min };
                self.cancel.check()?;
                let level = self.store.max_level(country)?.map_or(0, |l| l + 1);
                let radius = (min - 1.0).floor();
                log::info!(
                    "Resuming {} below {:.0}m ({} existing cells, next level {})",
                    country,
                    min,
                    existing_cells,
                    level
                );
                (radius, level)
            }
            None => {
                self.state = GeneratorState::StartingFresh;
                log::info!(
                    "Starting fresh grid for {} at {:.0}m",
                    country,
                    self.config.max_radius
                );
                (self.config.max_radius, 0)
            }
        };

        let mut report = GenerationReport::default();

        while radius >= self.config.min_radius {
            self.state = GeneratorState::GeneratingLevel { radius, level };
            let placed = self.generate_level(&bounds, radius, level, country)?;
            report.new_cells += placed;
            report.levels.push(LevelReport {
                level,
                radius,
                placed,
            });
            level += 1;

            self.state = GeneratorState::ProbingNextRadius { after: radius };
            radius = match self.next_viable_radius(&bounds, radius, country)? {
                Some(next) => next,
                None => {
                    let fallback = (radius * self.config.fallback_factor).floor();
                    log::warn!(
                        "No viable radius below {:.0}m, falling back to {:.0}m",
                        radius,
                        fallback
                    );
                    fallback
                }
            };
        }

        report.total_cells = existing_cells + report.new_cells;
        report.final_radius = radius;
        self.state = GeneratorState::Done;

        log::info!(
            "Grid for {} done: {} new cells over {} levels, {} total",
            country,
            report.new_cells,
            report.levels.len(),
            report.total_cells
        );
        Ok(report)
    }

    fn generate_level(
        &self,
        bounds: &Bounds,
        radius: f64,
        level: u32,
        country: &str,
    ) -> Result<usize> {
        let mut lattice = HexLattice::new(bounds, radius, self.config.metric);
        let mut batch = Vec::new();
        let mut index = CircleIndex::new(self.config.metric);
        let mut circles = Vec::new();
        let mut candidates = 0;

        loop {
            batch.clear();
            batch.extend(lattice.by_ref().take(self.config.validation_batch));
            if batch.is_empty() {
                break;
            }
            candidates += batch.len();

            self.cancel.check()?;
            let valid = self
                .boundary
                .validate_points(&batch, radius, country, None)?;
            self.thin_into(&mut index, &mut circles, &valid, radius);
        }

        if circles.is_empty() {
            log::debug!(
                "Level {} at {:.0}m: none of {} candidates fit",
                level,
                radius,
                candidates
            );
            return Ok(0);
        }

        self.cancel.check()?;
        self.store.insert_cells(country, &circles, level)?;
        log::info!(
            "Level {} at {:.0}m: placed {} of {} candidates",
            level,
            radius,
            circles.len(),
            candidates
        );
        Ok(circles.len())
    }

    /// Keep survivors that clear every circle already kept at this level.
    ///
    /// Validation only checks stored cells, and lattice neighbours at one
    /// radius are closer than two radii.
    fn thin_into(
        &self,
        index: &mut CircleIndex,
        kept: &mut Vec<Circle>,
        valid: &[Point],
        radius: f64,
    ) {
        for center in valid {
            let circle = Circle::new(*center, radius);
            if index
                .first_conflict(&circle, self.config.overlap_clearance, TouchPolicy::Reject)
                .is_none()
            {
                index.insert(circle, None);
                kept.push(circle);
            }
        }
    }

    /// Whether at least one lattice candidate at `radius` validates. Stops at
    /// the first batch with a survivor.
    fn fits_anything(&self, bounds: &Bounds, radius: f64, country: &str) -> Result<bool> {
        let mut lattice = HexLattice::new(bounds, radius, self.config.metric);
        let mut batch = Vec::new();

        loop {
            batch.clear();
            batch.extend(lattice.by_ref().take(self.config.validation_batch));
            if batch.is_empty() {
                return Ok(false);
            }

            self.cancel.check()?;
            if !self
                .boundary
                .validate_points(&batch, radius, country, Some(1))?
                .is_empty()
            {
                return Ok(true);
            }
        }
    }

    /// First radius below `radius` at which at least one candidate validates.
    ///
    /// Steps down coarsely first. When no coarse radius fits, every
    /// whole-meter radius the coarse pass jumped over is tried, down to just
    /// above the fallback radius, or down to `min_radius` when the fallback
    /// is below it. Every radius between two placed levels has then been
    /// tried against the final store, so resuming a finished run adds
    /// nothing.
    fn next_viable_radius(
        &self,
        bounds: &Bounds,
        radius: f64,
        country: &str,
    ) -> Result<Option<f64>> {
        let min_radius = self.config.min_radius;
        let step = self
            .config
            .probe_min_step
            .max(((radius - min_radius) / self.config.probe_step_divisor).floor());

        let mut tried = Vec::new();
        let mut candidate = radius - 1.0;
        while candidate >= min_radius {
            let fits = self.fits_anything(bounds, candidate, country)?;
            log::debug!(
                "Trying {:.0}m: {}",
                candidate,
                if fits { "fits" } else { "empty" }
            );
            if fits {
                return Ok(Some(candidate));
            }
            tried.push(candidate);
            candidate -= step;
        }

        let fallback = (radius * self.config.fallback_factor).floor();
        let floor = if fallback >= min_radius {
            fallback + 1.0
        } else {
            min_radius
        };

        let mut candidate = radius - 1.0;
        while candidate >= floor {
            if !tried.contains(&candidate) && self.fits_anything(bounds, candidate, country)? {
                log::debug!("Trying {:.0}m in unit steps: fits", candidate);
                return Ok(Some(candidate));
            }
            candidate -= 1.0;
        }
        Ok(None)
    }
}
