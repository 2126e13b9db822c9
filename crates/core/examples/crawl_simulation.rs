use gridcrawl::compute::geometry::distance;
use gridcrawl::prelude::*;
use std::sync::Arc;

const BOUNDARIES: &str = r#"{"type":"FeatureCollection","features":[
    {"type":"Feature","properties":{"code":"SIM"},
     "geometry":{"type":"Polygon","coordinates":[[[0,0],[2000,0],[2000,2000],[0,2000],[0,0]]]}}
]}"#;

/// Search API stand-in: places on a lattice that gets denser towards the center.
struct LatticeSearch {
    places: Vec<Point>,
    page_size: usize,
}

impl LatticeSearch {
    fn new() -> Self {
        let mut places = Vec::new();
        for i in 0..100 {
            for j in 0..100 {
                let x = i as f64 * 20.0;
                let y = j as f64 * 20.0;
                let from_center = (x - 1000.0).hypot(y - 1000.0);
                // keep every place near the center, one in sixteen elsewhere
                if from_center < 300.0 || (i % 4 == 0 && j % 4 == 0) {
                    places.push(Point::new(x, y));
                }
            }
        }
        Self {
            places,
            page_size: 20,
        }
    }
}

impl PlaceSearch for LatticeSearch {
    fn search(&self, cell: &Cell, page_token: Option<&str>) -> Result<SearchPage> {
        let offset = match page_token {
            Some(token) => token.parse::<usize>().map_err(GridError::collaborator)?,
            None => 0,
        };
        let total = self
            .places
            .iter()
            .filter(|p| distance(&cell.center, p, DistanceMetric::Euclidean) <= cell.radius)
            .count();
        let end = (offset + self.page_size).min(total);
        Ok(SearchPage {
            result_count: end.saturating_sub(offset) as u64,
            next_page_token: (end < total).then(|| end.to_string()),
        })
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let store = Arc::new(MemoryGridStore::new(DistanceMetric::Euclidean));
    let mut config = GridConfig::default()
        .with_radii(250.0, 10.0)
        .with_metric(DistanceMetric::Euclidean)
        .with_result_cap(60);
    config.overlap_clearance = 0.5;

    let engine = EngineBuilder::new()
        .config(config)
        .build_in_memory(store.clone(), BOUNDARIES)?;

    let total = engine.generate_grid("SIM")?;
    println!("Generated {} cells", total);

    let search = LatticeSearch::new();
    let summary = engine.crawl(&search, None)?;
    println!(
        "Crawled: {} cells processed, {} split into {} children, {} results",
        summary.cells_processed, summary.cells_split, summary.children_created, summary.results
    );

    let stats = store.stats()?;
    println!(
        "Final grid: {} cells over {} levels",
        stats.cell_count,
        stats.cells_per_level.len()
    );

    Ok(())
}
