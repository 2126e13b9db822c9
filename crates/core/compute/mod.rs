//! Pure computation: geometry, circle indexing, GeoJSON conversion and input
//! validation.

pub mod geojson;
pub mod geometry;
pub mod index;
pub mod validation;
