use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use gridcrawl::geojson::cells_to_feature_collection;
use gridcrawl::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Snapshot file holding the grid
    #[arg(short, long, global = true, default_value = "grid.snapshot")]
    snapshot: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate or resume the grid for a country
    Generate {
        #[command(flatten)]
        engine: EngineArgs,

        /// Country code as found in the boundaries file
        #[arg(short, long)]
        country: String,

        /// Discard any existing cells first
        #[arg(long)]
        fresh: bool,
    },
    /// Replace a cell with packed children
    Split {
        #[command(flatten)]
        engine: EngineArgs,

        /// Id of the cell to split
        cell: u64,
    },
    /// Print grid statistics as JSON
    Stats,
    /// Write the grid as a GeoJSON FeatureCollection
    Export {
        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct EngineArgs {
    /// GeoJSON FeatureCollection of country boundaries
    #[arg(short, long)]
    boundaries: PathBuf,

    /// Engine configuration, JSON or TOML by extension
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    max_radius: Option<f64>,

    #[arg(long)]
    min_radius: Option<f64>,

    #[arg(long, value_enum)]
    metric: Option<MetricArg>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MetricArg {
    /// lon/lat degrees on a spherical earth
    Haversine,
    /// planar coordinates in meters
    Euclidean,
}

impl From<MetricArg> for DistanceMetric {
    fn from(metric: MetricArg) -> Self {
        match metric {
            MetricArg::Haversine => DistanceMetric::Haversine,
            MetricArg::Euclidean => DistanceMetric::Euclidean,
        }
    }
}

fn load_config(args: &EngineArgs) -> anyhow::Result<GridConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            match path.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => GridConfig::from_toml(&text)?,
                _ => GridConfig::from_json(&text)?,
            }
        }
        None => GridConfig::default(),
    };

    if let Some(max_radius) = args.max_radius {
        config.max_radius = max_radius;
    }
    if let Some(min_radius) = args.min_radius {
        config.min_radius = min_radius;
    }
    if let Some(metric) = args.metric {
        config.metric = metric.into();
    }
    Ok(config)
}

fn open_engine(
    args: &EngineArgs,
    config: GridConfig,
    store: Arc<MemoryGridStore>,
) -> anyhow::Result<GridEngine<PolygonBoundary<MemoryGridStore>, MemoryGridStore>> {
    let boundaries = std::fs::read_to_string(&args.boundaries)
        .with_context(|| format!("reading boundaries {}", args.boundaries.display()))?;
    let engine = EngineBuilder::new()
        .config(config)
        .build_in_memory(store, &boundaries)?;
    Ok(engine)
}

fn open_store(snapshot: &Path, metric: DistanceMetric) -> anyhow::Result<Arc<MemoryGridStore>> {
    let store = MemoryGridStore::load_snapshot(snapshot, metric)
        .with_context(|| format!("loading snapshot {}", snapshot.display()))?;
    info!(
        "Opened {} with {} cells",
        snapshot.display(),
        store.count()?
    );
    Ok(Arc::new(store))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gridcrawl=info,gridcrawl_cli=info,info".into()),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Generate {
            engine,
            country,
            fresh,
        } => {
            let config = load_config(&engine)?;
            let store = open_store(&args.snapshot, config.metric)?;
            if fresh {
                info!("Discarding {} existing cells", store.count()?);
                store.clear()?;
            }

            let engine = open_engine(&engine, config, store.clone())?;
            let report = engine.generate(&country)?;
            for level in &report.levels {
                info!(
                    "Level {}: radius {:.0}m, {} cells",
                    level.level, level.radius, level.placed
                );
            }
            store.save_snapshot(&args.snapshot)?;
            info!(
                "Grid for {} has {} cells ({} new)",
                country, report.total_cells, report.new_cells
            );
        }
        Command::Split { engine, cell } => {
            let config = load_config(&engine)?;
            let store = open_store(&args.snapshot, config.metric)?;
            if store.get_cell(CellId(cell))?.is_none() {
                bail!("cell {} is not in {}", cell, args.snapshot.display());
            }

            let engine = open_engine(&engine, config, store.clone())?;
            let children = engine.split_cell(CellId(cell))?;
            store.save_snapshot(&args.snapshot)?;
            info!("Cell {} split into {} children", cell, children);
        }
        Command::Stats => {
            let store = open_store(&args.snapshot, DistanceMetric::default())?;
            println!("{}", serde_json::to_string_pretty(&store.stats()?)?);
        }
        Command::Export { output } => {
            let store = open_store(&args.snapshot, DistanceMetric::default())?;
            let collection = cells_to_feature_collection(&store.cells()?)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, collection)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!("Exported grid to {}", path.display());
                }
                None => println!("{}", collection),
            }
        }
    }

    Ok(())
}
