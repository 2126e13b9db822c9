//! Adaptive circular search grids.
//!
//! Covers a country with non-overlapping circles sized for a search API's
//! per-query result cap, then refines the grid where results are dense.
//!
//! ## Features
//! - **Hex candidates**: close-packed lattice over the country bounds at a given radius
//! - **Descending radius generation**: level by level, probing for the next radius that
//!   still fits, resumable from the smallest persisted radius
//! - **Subdivision**: a saturated cell is replaced by smaller circles greedily packed
//!   inside it, clear of its neighbours
//! - **Pluggable collaborators**: boundary validation and cell storage sit behind the
//!   [`BoundaryProvider`] and [`GridStore`] traits
//! - **Persistence**: snapshot files for the in-memory store (with `snapshot` feature)
//!
//! ```rust
//! use gridcrawl::prelude::*;
//! use std::sync::Arc;
//!
//! let boundaries = r#"{"type":"FeatureCollection","features":[
//!     {"type":"Feature","properties":{"iso_a3":"SQR"},
//!      "geometry":{"type":"Polygon","coordinates":[[[0,0],[60,0],[60,60],[0,60],[0,0]]]}}
//! ]}"#;
//!
//! // planar meters keep the example small
//! let store = Arc::new(MemoryGridStore::new(DistanceMetric::Euclidean));
//! let engine = EngineBuilder::new()
//!     .radii(12.0, 3.0)
//!     .metric(DistanceMetric::Euclidean)
//!     .build_in_memory(store.clone(), boundaries)?;
//!
//! let total = engine.generate_grid("SQR")?;
//! assert_eq!(store.count()?, total);
//!
//! if let Some(id) = store.next_unprocessed()? {
//!     engine.split_cell(id)?;
//! }
//! # Ok::<(), gridcrawl::GridError>(())
//! ```

pub mod boundary;
pub mod builder;
pub mod compute;
pub mod config;
pub mod engine;
pub mod error;
pub mod storage;

pub use boundary::{BoundaryProvider, PolygonBoundary};
pub use builder::{EngineBuilder, GridEngine};
pub use config::GridConfig;
pub use engine::{
    CancelToken, CellOutcome, CrawlSummary, Crawler, GenerationReport, GeneratorState,
    GridGenerator, LevelReport, PlaceSearch, SearchPage, Subdivider,
};
pub use error::{BoxError, GridError, Result};
pub use storage::{GridStats, GridStore, MemoryGridStore};

#[cfg(feature = "snapshot")]
pub use storage::snapshot::{SnapshotData, SnapshotFile};

pub use geo::{MultiPolygon, Rect};
pub use gridcrawl_types::bounds::Bounds;
pub use gridcrawl_types::cell::{Cell, CellId, Circle, CrawlProgress};
pub use gridcrawl_types::geo::{DistanceMetric, Point};

// Re-export validation and GeoJSON utilities
pub use compute::geojson;
pub use compute::validation;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{EngineBuilder, GridConfig, GridEngine, GridError, Result};

    pub use crate::{BoundaryProvider, GridStore, MemoryGridStore, PolygonBoundary};

    pub use crate::{Bounds, Cell, CellId, Circle, DistanceMetric, Point};

    pub use crate::{CancelToken, PlaceSearch, SearchPage};

    pub use crate::{geojson, validation};
}
