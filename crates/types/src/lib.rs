//! # gridcrawl-types
//!
//! Value types shared by the gridcrawl grid engine and its collaborators.
//!
//! - **Geographic primitives**: `Point`, `DistanceMetric`
//! - **Areas**: `Bounds`
//! - **Grid cells**: `Circle`, `Cell`, `CellId`, `CrawlProgress`
//!
//! All types are serializable with Serde and built on top of the `geo` crate's
//! geometric primitives.
//!
//! ## Examples
//!
//! ```rust
//! use gridcrawl_types::bounds::Bounds;
//! use gridcrawl_types::cell::Circle;
//! use gridcrawl_types::geo::Point;
//!
//! let belgium = Bounds::new(2.54, 49.49, 6.40, 51.50);
//! let circle = Circle::new(Point::new(4.35, 50.85), 25_000.0);
//! assert!(belgium.contains_point(&circle.center));
//! ```

pub mod bounds;
pub mod cell;
pub mod geo;
