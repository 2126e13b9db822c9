use geo::{MultiPolygon, polygon};
use gridcrawl::prelude::*;
use gridcrawl::{SnapshotData, SnapshotFile};
use std::sync::Arc;
use tempfile::TempDir;

fn planar_config() -> GridConfig {
    GridConfig::default()
        .with_radii(20.0, 4.0)
        .with_metric(DistanceMetric::Euclidean)
        .with_probe_step(1.0, 1_000_000.0)
}

fn engine_over(
    store: Arc<MemoryGridStore>,
) -> GridEngine<PolygonBoundary<MemoryGridStore>, MemoryGridStore> {
    let config = planar_config();
    let boundary = PolygonBoundary::new(store.clone(), &config)
        .with_country(
            "TST",
            MultiPolygon::new(vec![polygon![
                (x: 0.0, y: 0.0),
                (x: 100.0, y: 0.0),
                (x: 100.0, y: 100.0),
                (x: 0.0, y: 100.0),
                (x: 0.0, y: 0.0),
            ]]),
        )
        .unwrap();
    EngineBuilder::new()
        .config(config)
        .build(Arc::new(boundary), store)
        .unwrap()
}

#[test]
fn test_snapshot_preserves_grid() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("grid.snapshot");

    let store = Arc::new(MemoryGridStore::new(DistanceMetric::Euclidean));
    let engine = engine_over(store.clone());
    let total = engine.generate_grid("TST").unwrap();
    assert!(total > 0);

    let first = store.next_unprocessed().unwrap().unwrap();
    store.mark_processed(first).unwrap();
    store.save_snapshot(&path).unwrap();

    let loaded = MemoryGridStore::load_snapshot(&path, DistanceMetric::Euclidean).unwrap();
    assert_eq!(loaded.cells().unwrap(), store.cells().unwrap());
    assert!(loaded.get_cell(first).unwrap().unwrap().is_processed);
    assert_ne!(loaded.next_unprocessed().unwrap(), Some(first));
    assert_eq!(loaded.stats().unwrap().processed_count, 1);
}

#[test]
fn test_generation_resumes_from_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("grid.snapshot");

    let store = Arc::new(MemoryGridStore::new(DistanceMetric::Euclidean));
    let total = engine_over(store.clone()).generate_grid("TST").unwrap();
    store.save_snapshot(&path).unwrap();

    let restored = Arc::new(
        MemoryGridStore::load_snapshot(&path, DistanceMetric::Euclidean).unwrap(),
    );
    let report = engine_over(restored.clone()).generate("TST").unwrap();
    assert_eq!(report.new_cells, 0);
    assert_eq!(report.total_cells, total);

    // ids keep counting past the restored cells
    let max_id = restored.cells().unwrap().iter().map(|c| c.id).max().unwrap();
    let fresh = restored
        .insert_cells("TST", &[Circle::new(Point::new(500.0, 500.0), 1.0)], 0)
        .unwrap();
    assert!(fresh[0] > max_id);
}

#[test]
fn test_missing_snapshot_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let file = SnapshotFile::new(temp_dir.path().join("absent.snapshot"));

    assert!(!file.exists());
    assert_eq!(file.load().unwrap(), SnapshotData::default());
}

#[test]
fn test_foreign_file_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("foreign.snapshot");
    std::fs::write(&path, b"this is definitely not a grid snapshot").unwrap();

    let result = MemoryGridStore::load_snapshot(&path, DistanceMetric::Euclidean);
    assert!(matches!(result, Err(GridError::InvalidFormat)));
}
