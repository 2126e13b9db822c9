//! Generation, subdivision and crawl workflows.

pub mod cancel;
pub mod crawl;
pub mod generator;
pub mod subdivide;

pub use cancel::CancelToken;
pub use crawl::{CellOutcome, CrawlSummary, Crawler, PlaceSearch, SearchPage};
pub use generator::{GenerationReport, GeneratorState, GridGenerator, LevelReport};
pub use subdivide::Subdivider;
