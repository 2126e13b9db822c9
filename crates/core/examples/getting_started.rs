use gridcrawl::prelude::*;
use gridcrawl::{GridStats, geojson};
use std::sync::Arc;

// A rough box around Luxembourg
const BOUNDARIES: &str = r#"{"type":"FeatureCollection","features":[
    {"type":"Feature","properties":{"iso_a3":"LUX"},
     "geometry":{"type":"Polygon","coordinates":[[
        [5.74,49.45],[6.52,49.45],[6.52,50.18],[5.74,50.18],[5.74,49.45]
     ]]}}
]}"#;

fn print_stats(stats: &GridStats) {
    println!(
        "   {} cells, radii {:.0}m..{:.0}m",
        stats.cell_count,
        stats.min_radius.unwrap_or(0.0),
        stats.max_radius.unwrap_or(0.0)
    );
    for (level, count) in &stats.cells_per_level {
        println!("     level {:>2}: {} cells", level, count);
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug to see detailed logs)
    env_logger::init();

    println!("=== gridcrawl - Getting Started ===\n");

    let store = Arc::new(MemoryGridStore::default());
    let engine = EngineBuilder::new()
        .radii(10_000.0, 1_500.0)
        .build_in_memory(store.clone(), BOUNDARIES)?;

    // === GENERATION ===
    println!("1. Generating the grid");
    println!("----------------------");
    let report = engine.generate("LUX")?;
    for level in &report.levels {
        println!(
            "   level {}: radius {:.0}m placed {}",
            level.level, level.radius, level.placed
        );
    }
    print_stats(&store.stats()?);
    println!();

    // === RESUME ===
    println!("2. Resuming");
    println!("-----------");
    let again = engine.generate_grid("LUX")?;
    println!("   Second run reports {} cells\n", again);

    // === SUBDIVISION ===
    println!("3. Splitting the largest cell");
    println!("-----------------------------");
    if let Some(largest) = store
        .cells()?
        .into_iter()
        .max_by(|a, b| a.radius.total_cmp(&b.radius))
    {
        let children = engine.split_cell(largest.id)?;
        println!(
            "   Cell {} ({:.0}m) became {} children",
            largest.id, largest.radius, children
        );
    }
    print_stats(&store.stats()?);
    println!();

    // === EXPORT ===
    println!("4. GeoJSON export");
    println!("-----------------");
    let collection = geojson::cells_to_feature_collection(&store.cells()?)?;
    println!("   {} bytes of GeoJSON", collection.len());

    Ok(())
}
