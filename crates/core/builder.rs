//! Engine facade and builder.
//!
//! [`GridEngine`] bundles a boundary provider, a grid store, the
//! configuration and a cancellation token, and exposes the two entry points
//! surrounding tooling calls: [`GridEngine::generate_grid`] and
//! [`GridEngine::split_cell`].

use crate::boundary::{BoundaryProvider, PolygonBoundary};
use crate::config::{DistanceMetric, GridConfig};
use crate::engine::{
    CancelToken, CrawlSummary, Crawler, GenerationReport, GridGenerator, PlaceSearch, Subdivider,
};
use crate::error::{GridError, Result};
use crate::storage::{GridStore, MemoryGridStore};
use gridcrawl_types::cell::CellId;
use std::sync::Arc;

/// Generation and subdivision over explicitly supplied collaborators.
pub struct GridEngine<B: ?Sized, S: ?Sized> {
    boundary: Arc<B>,
    store: Arc<S>,
    config: GridConfig,
    cancel: CancelToken,
}

impl<B, S> GridEngine<B, S>
where
    B: BoundaryProvider + ?Sized,
    S: GridStore + ?Sized,
{
    /// Generate or resume the grid for a country.
    ///
    /// Returns the number of cells present afterwards, counting cells that
    /// already existed when the run resumed.
    pub fn generate_grid(&self, country: &str) -> Result<usize> {
        Ok(self.generate(country)?.total_cells)
    }

    /// Like [`generate_grid`](Self::generate_grid) but with per-level detail.
    pub fn generate(&self, country: &str) -> Result<GenerationReport> {
        GridGenerator::new(self.boundary.as_ref(), self.store.as_ref(), &self.config)
            .with_cancel_token(self.cancel.clone())
            .run(country)
    }

    /// Replace a saturated cell with packed children and return their count.
    pub fn split_cell(&self, id: CellId) -> Result<usize> {
        Subdivider::new(self.boundary.as_ref(), self.store.as_ref(), &self.config)
            .with_cancel_token(self.cancel.clone())
            .split_cell(id)
    }

    /// Crawl unprocessed cells through `search`, splitting saturated ones.
    pub fn crawl<P>(&self, search: &P, max_cells: Option<usize>) -> Result<CrawlSummary>
    where
        P: PlaceSearch + ?Sized,
    {
        Crawler::new(
            self.boundary.as_ref(),
            self.store.as_ref(),
            search,
            &self.config,
        )
        .with_cancel_token(self.cancel.clone())
        .run(max_cells)
    }

    pub fn boundary(&self) -> &Arc<B> {
        &self.boundary
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Token that cancels every operation started through this engine.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}

/// Builder for a [`GridEngine`].
#[derive(Debug, Default)]
pub struct EngineBuilder {
    config: GridConfig,
    cancel: Option<CancelToken>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the whole configuration.
    pub fn config(mut self, config: GridConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the first-level and smallest radius, in meters.
    pub fn radii(mut self, max_radius: f64, min_radius: f64) -> Self {
        self.config.max_radius = max_radius;
        self.config.min_radius = min_radius;
        self
    }

    pub fn metric(mut self, metric: DistanceMetric) -> Self {
        self.config.metric = metric;
        self
    }

    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Build over caller-supplied collaborators.
    pub fn build<B, S>(self, boundary: Arc<B>, store: Arc<S>) -> Result<GridEngine<B, S>>
    where
        B: BoundaryProvider + ?Sized,
        S: GridStore + ?Sized,
    {
        self.config.validate().map_err(GridError::InvalidConfig)?;
        Ok(GridEngine {
            boundary,
            store,
            config: self.config,
            cancel: self.cancel.unwrap_or_default(),
        })
    }

    /// Build over a memory store and polygon boundaries loaded from GeoJSON.
    pub fn build_in_memory(
        self,
        store: Arc<MemoryGridStore>,
        boundaries_geojson: &str,
    ) -> Result<GridEngine<PolygonBoundary<MemoryGridStore>, MemoryGridStore>> {
        if store.metric() != self.config.metric {
            return Err(GridError::InvalidConfig(format!(
                "Store metric {:?} does not match configured metric {:?}",
                store.metric(),
                self.config.metric
            )));
        }
        let mut boundary = PolygonBoundary::new(store.clone(), &self.config);
        boundary.load_geojson(boundaries_geojson)?;
        self.build(Arc::new(boundary), store)
    }
}
