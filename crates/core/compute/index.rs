//! R*-tree index over circles.
//!
//! Circles are indexed by their center. Queries first select centers inside a
//! conservative lon/lat envelope and then apply the exact distance test, so
//! the index never misses a conflict that a linear scan would find.

use crate::compute::geometry::{TouchPolicy, circles_conflict, distance, reach_bounds};
use gridcrawl_types::bounds::Bounds;
use gridcrawl_types::cell::{CellId, Circle};
use gridcrawl_types::geo::{DistanceMetric, Point};
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};

/// Payload stored next to each indexed center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedCircle {
    pub radius: f64,
    pub id: Option<CellId>,
}

type Entry = GeomWithData<[f64; 2], IndexedCircle>;

/// Spatial index of circles for overlap and neighbourhood queries.
pub struct CircleIndex {
    tree: RTree<Entry>,
    metric: DistanceMetric,
    /// Largest radius ever inserted; widens every search envelope.
    max_radius: f64,
}

impl CircleIndex {
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            tree: RTree::new(),
            metric,
            max_radius: 0.0,
        }
    }

    /// Build an index in one pass from existing circles.
    pub fn bulk_load<I>(circles: I, metric: DistanceMetric) -> Self
    where
        I: IntoIterator<Item = (Circle, Option<CellId>)>,
    {
        let mut max_radius: f64 = 0.0;
        let entries: Vec<Entry> = circles
            .into_iter()
            .map(|(circle, id)| {
                max_radius = max_radius.max(circle.radius);
                make_entry(&circle, id)
            })
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
            metric,
            max_radius,
        }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Largest radius inserted since the last clear.
    pub fn max_radius(&self) -> f64 {
        self.max_radius
    }

    pub fn insert(&mut self, circle: Circle, id: Option<CellId>) {
        self.max_radius = self.max_radius.max(circle.radius);
        self.tree.insert(make_entry(&circle, id));
    }

    /// Remove an exact circle/id pair. Returns whether it was present.
    pub fn remove(&mut self, circle: &Circle, id: Option<CellId>) -> bool {
        self.tree.remove(&make_entry(circle, id)).is_some()
    }

    pub fn clear(&mut self) {
        self.tree = RTree::new();
        self.max_radius = 0.0;
    }

    /// First indexed circle in conflict with `circle`, if any.
    pub fn first_conflict(
        &self,
        circle: &Circle,
        clearance: f64,
        policy: TouchPolicy,
    ) -> Option<(Circle, Option<CellId>)> {
        let reach = circle.radius + clearance + self.max_radius;
        self.candidates(&circle.center, reach)
            .map(|entry| (entry_circle(entry), entry.data.id))
            .find(|(other, _)| circles_conflict(circle, other, self.metric, clearance, policy))
    }

    /// Circles whose centers lie within `reach` meters of `center`.
    pub fn within(&self, center: &Point, reach: f64) -> Vec<(Circle, Option<CellId>)> {
        self.candidates(center, reach)
            .map(|entry| (entry_circle(entry), entry.data.id))
            .filter(|(other, _)| distance(center, &other.center, self.metric) <= reach)
            .collect()
    }

    /// Circles containing `point` (edge included).
    pub fn containing(&self, point: &Point) -> Vec<(Circle, Option<CellId>)> {
        self.candidates(point, self.max_radius)
            .map(|entry| (entry_circle(entry), entry.data.id))
            .filter(|(other, _)| distance(point, &other.center, self.metric) <= other.radius)
            .collect()
    }

    /// Circles whose bounding box intersects `bounds`.
    pub fn intersecting(&self, bounds: &Bounds) -> Vec<(Circle, Option<CellId>)> {
        let poleward = Point::new(
            bounds.center().x(),
            bounds.min_y().abs().max(bounds.max_y().abs()),
        );
        let pad = reach_bounds(&poleward, self.max_radius, self.metric);
        let search = bounds.expand_xy(pad.width() / 2.0, pad.height() / 2.0);
        let envelope = AABB::from_corners(
            [search.min_x(), search.min_y()],
            [search.max_x(), search.max_y()],
        );

        self.tree
            .locate_in_envelope(&envelope)
            .map(|entry| (entry_circle(entry), entry.data.id))
            .filter(|(circle, _)| {
                reach_bounds(&circle.center, circle.radius, self.metric).intersects(bounds)
            })
            .collect()
    }

    fn candidates<'a>(
        &'a self,
        center: &Point,
        reach: f64,
    ) -> impl Iterator<Item = &'a Entry> + use<'a> {
        let area = reach_bounds(center, reach, self.metric);
        let envelope = AABB::from_corners(
            [area.min_x(), area.min_y()],
            [area.max_x(), area.max_y()],
        );
        self.tree.locate_in_envelope(&envelope)
    }
}

#[inline]
fn make_entry(circle: &Circle, id: Option<CellId>) -> Entry {
    GeomWithData::new(
        [circle.center.x(), circle.center.y()],
        IndexedCircle {
            radius: circle.radius,
            id,
        },
    )
}

#[inline]
fn entry_circle(entry: &Entry) -> Circle {
    let [x, y] = *entry.geom();
    Circle::new(Point::new(x, y), entry.data.radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planar() -> CircleIndex {
        CircleIndex::new(DistanceMetric::Euclidean)
    }

    #[test]
    fn test_insert_and_conflict() {
        let mut index = planar();
        index.insert(Circle::new(Point::new(0.0, 0.0), 5.0), Some(CellId(1)));
        assert_eq!(index.len(), 1);

        let touching = Circle::new(Point::new(10.0, 0.0), 5.0);
        assert!(index.first_conflict(&touching, 0.0, TouchPolicy::Accept).is_none());

        let hit = index.first_conflict(&touching, 0.0, TouchPolicy::Reject);
        assert_eq!(hit.map(|(_, id)| id), Some(Some(CellId(1))));

        let far = Circle::new(Point::new(100.0, 0.0), 5.0);
        assert!(index.first_conflict(&far, 1.0, TouchPolicy::Reject).is_none());
    }

    #[test]
    fn test_large_neighbour_found_from_small_query() {
        let mut index = planar();
        index.insert(Circle::new(Point::new(0.0, 0.0), 1_000.0), None);
        // small circle deep inside the big one's footprint but far from its center
        let small = Circle::new(Point::new(900.0, 0.0), 1.0);
        assert!(index.first_conflict(&small, 0.0, TouchPolicy::Accept).is_some());
    }

    #[test]
    fn test_remove() {
        let mut index = planar();
        let c = Circle::new(Point::new(1.0, 1.0), 2.0);
        index.insert(c, Some(CellId(9)));
        assert!(!index.remove(&c, Some(CellId(8))));
        assert!(index.remove(&c, Some(CellId(9))));
        assert!(index.is_empty());
    }

    #[test]
    fn test_within_and_containing() {
        let index = CircleIndex::bulk_load(
            vec![
                (Circle::new(Point::new(0.0, 0.0), 3.0), Some(CellId(1))),
                (Circle::new(Point::new(10.0, 0.0), 3.0), Some(CellId(2))),
                (Circle::new(Point::new(50.0, 0.0), 3.0), Some(CellId(3))),
            ],
            DistanceMetric::Euclidean,
        );

        let near: Vec<Option<CellId>> = index
            .within(&Point::new(0.0, 0.0), 10.0)
            .into_iter()
            .map(|(_, id)| id)
            .collect();
        assert_eq!(near.len(), 2);
        assert!(near.contains(&Some(CellId(2))));

        let hits = index.containing(&Point::new(11.0, 1.0));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1, Some(CellId(2)));
    }

    #[test]
    fn test_intersecting_viewport() {
        let index = CircleIndex::bulk_load(
            vec![
                (Circle::new(Point::new(0.0, 0.0), 3.0), Some(CellId(1))),
                (Circle::new(Point::new(12.0, 0.0), 3.0), Some(CellId(2))),
            ],
            DistanceMetric::Euclidean,
        );
        // viewport touches the second circle's footprint only
        let hits = index.intersecting(&Bounds::new(9.5, -1.0, 20.0, 1.0));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1, Some(CellId(2)));
    }

    #[test]
    fn test_spherical_conflict_matches_linear_scan() {
        let metric = DistanceMetric::Haversine;
        let circles: Vec<Circle> = (0..40)
            .map(|i| Circle::new(Point::new(4.0 + i as f64 * 0.01, 50.0), 300.0 + i as f64))
            .collect();
        let index = CircleIndex::bulk_load(circles.iter().map(|c| (*c, None)), metric);

        for i in 0..80 {
            let query = Circle::new(Point::new(4.0 + i as f64 * 0.005, 50.003), 250.0);
            let linear = circles
                .iter()
                .any(|c| circles_conflict(&query, c, metric, 0.0, TouchPolicy::Accept));
            let indexed = index
                .first_conflict(&query, 0.0, TouchPolicy::Accept)
                .is_some();
            assert_eq!(linear, indexed, "query {}", i);
        }
    }
}
