use geo::{MultiPolygon, polygon};
use gridcrawl::compute::geometry::distance;
use gridcrawl::prelude::*;
use std::sync::Arc;

fn planar_setup(
    max: f64,
    min: f64,
) -> GridEngine<PolygonBoundary<MemoryGridStore>, MemoryGridStore> {
    let config = GridConfig::default()
        .with_radii(max, min)
        .with_metric(DistanceMetric::Euclidean);
    let store = Arc::new(MemoryGridStore::new(DistanceMetric::Euclidean));
    let boundary = PolygonBoundary::new(store.clone(), &config)
        .with_country(
            "TST",
            MultiPolygon::new(vec![polygon![
                (x: 0.0, y: 0.0),
                (x: 400.0, y: 0.0),
                (x: 400.0, y: 400.0),
                (x: 0.0, y: 400.0),
                (x: 0.0, y: 0.0),
            ]]),
        )
        .unwrap();
    EngineBuilder::new()
        .config(config)
        .build(Arc::new(boundary), store)
        .unwrap()
}

fn assert_no_overlap(cells: &[Cell], metric: DistanceMetric) {
    for (i, a) in cells.iter().enumerate() {
        for b in &cells[i + 1..] {
            let d = distance(&a.center, &b.center, metric);
            assert!(
                d >= a.radius + b.radius - 1e-6,
                "cells {} and {} overlap",
                a.id,
                b.id
            );
        }
    }
}

#[test]
fn test_split_replaces_exactly_one_parent() {
    let engine = planar_setup(100.0, 5.0);
    let store = engine.store();
    let parent = store
        .insert_cells("TST", &[Circle::new(Point::new(200.0, 200.0), 100.0)], 0)
        .unwrap()[0];

    let created = engine.split_cell(parent).unwrap();
    assert!(created > 0);
    assert!(store.get_cell(parent).unwrap().is_none());
    assert_eq!(store.count().unwrap(), created);

    let parent_center = Point::new(200.0, 200.0);
    for cell in store.cells().unwrap() {
        assert_eq!(cell.level, 1);
        assert!(!cell.is_processed);
        let d = distance(&parent_center, &cell.center, DistanceMetric::Euclidean);
        assert!(d + cell.radius <= 100.0 + 1e-9);
    }
}

#[test]
fn test_largest_children_first() {
    let engine = planar_setup(100.0, 5.0);
    let store = engine.store();
    let parent = store
        .insert_cells("TST", &[Circle::new(Point::new(200.0, 200.0), 100.0)], 0)
        .unwrap()[0];

    engine.split_cell(parent).unwrap();
    let stats = store.stats().unwrap();
    // the first pack radius is parent / 2.5
    assert_eq!(stats.max_radius, Some(40.0));
    assert!(stats.min_radius.unwrap() >= 5.0);
}

#[test]
fn test_split_after_generation_keeps_grid_valid() {
    let engine = planar_setup(60.0, 6.0);
    engine.generate_grid("TST").unwrap();

    let store = engine.store();
    let before = store.count().unwrap();
    let target = store
        .cells()
        .unwrap()
        .into_iter()
        .max_by(|a, b| a.radius.total_cmp(&b.radius))
        .unwrap();

    let created = engine.split_cell(target.id).unwrap();
    assert_eq!(store.count().unwrap(), before - 1 + created);

    let cells = store.cells().unwrap();
    assert_no_overlap(&cells, DistanceMetric::Euclidean);
    for cell in cells.iter().filter(|c| c.level == target.level + 1) {
        let d = distance(&target.center, &cell.center, DistanceMetric::Euclidean);
        if d < target.radius {
            assert!(d + cell.radius <= target.radius + 1e-9);
        }
    }
}

#[test]
fn test_split_is_at_most_once() {
    let engine = planar_setup(100.0, 5.0);
    let store = engine.store();
    let parent = store
        .insert_cells("TST", &[Circle::new(Point::new(200.0, 200.0), 50.0)], 0)
        .unwrap()[0];

    let created = engine.split_cell(parent).unwrap();
    assert_eq!(engine.split_cell(parent).unwrap(), 0);
    assert_eq!(store.count().unwrap(), created);
}

#[test]
fn test_min_radius_parent_vanishes() {
    let engine = planar_setup(100.0, 5.0);
    let store = engine.store();
    let parent = store
        .insert_cells("TST", &[Circle::new(Point::new(200.0, 200.0), 5.0)], 3)
        .unwrap()[0];

    assert_eq!(engine.split_cell(parent).unwrap(), 0);
    assert!(store.get_cell(parent).unwrap().is_none());
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn test_spherical_split() {
    let config = GridConfig::default().with_radii(50_000.0, 100.0);
    let store = Arc::new(MemoryGridStore::default());
    let boundary = PolygonBoundary::new(store.clone(), &config);
    let engine = EngineBuilder::new()
        .config(config)
        .build(Arc::new(boundary), store.clone())
        .unwrap();

    let center = Point::new(4.35, 50.85);
    let parent = store
        .insert_cells("TST", &[Circle::new(center, 2_000.0)], 0)
        .unwrap()[0];
    // a neighbour just east of the parent
    let east = store
        .insert_cells("TST", &[Circle::new(Point::new(4.40, 50.85), 1_500.0)], 0)
        .unwrap()[0];

    let created = engine.split_cell(parent).unwrap();
    assert!(created > 0);
    assert!(store.get_cell(east).unwrap().is_some());

    let cells = store.cells().unwrap();
    assert_no_overlap(&cells, DistanceMetric::Haversine);
    for cell in cells.iter().filter(|c| c.id != east) {
        let d = distance(&center, &cell.center, DistanceMetric::Haversine);
        assert!(d + cell.radius <= 2_000.0 + 1e-6);
    }
}
