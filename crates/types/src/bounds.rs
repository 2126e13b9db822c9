use crate::geo::Point;
use geo::Rect;
use serde::{Deserialize, Serialize};

/// An axis-aligned lon/lat box, usually a country envelope.
///
/// Wraps `geo::Rect`, which normalises the corners so `min_*` is never
/// greater than `max_*`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// The underlying geometric rectangle
    pub rect: Rect,
}

impl Bounds {
    /// Create a new box from minimum and maximum coordinates.
    ///
    /// # Examples
    ///
    /// ```
    /// use gridcrawl_types::bounds::Bounds;
    ///
    /// let bounds = Bounds::new(2.54, 49.49, 6.40, 51.50);
    /// assert_eq!(bounds.min_x(), 2.54);
    /// ```
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            rect: Rect::new(
                geo::coord! { x: min_x, y: min_y },
                geo::coord! { x: max_x, y: max_y },
            ),
        }
    }

    /// Create bounds from a `geo::Rect`.
    pub fn from_rect(rect: Rect) -> Self {
        Self { rect }
    }

    pub fn min_x(&self) -> f64 {
        self.rect.min().x
    }

    pub fn min_y(&self) -> f64 {
        self.rect.min().y
    }

    pub fn max_x(&self) -> f64 {
        self.rect.max().x
    }

    pub fn max_y(&self) -> f64 {
        self.rect.max().y
    }

    /// Get the center point of the box.
    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x() + self.max_x()) / 2.0,
            (self.min_y() + self.max_y()) / 2.0,
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x() - self.min_x()
    }

    pub fn height(&self) -> f64 {
        self.max_y() - self.min_y()
    }

    /// Check if a point lies inside the box (edges included).
    pub fn contains_point(&self, point: &Point) -> bool {
        point.x() >= self.min_x()
            && point.x() <= self.max_x()
            && point.y() >= self.min_y()
            && point.y() <= self.max_y()
    }

    /// Check if `other` lies entirely inside this box.
    pub fn contains_bounds(&self, other: &Bounds) -> bool {
        other.min_x() >= self.min_x()
            && other.max_x() <= self.max_x()
            && other.min_y() >= self.min_y()
            && other.max_y() <= self.max_y()
    }

    /// Check if this box intersects with another.
    pub fn intersects(&self, other: &Bounds) -> bool {
        !(self.max_x() < other.min_x()
            || self.min_x() > other.max_x()
            || self.max_y() < other.min_y()
            || self.min_y() > other.max_y())
    }

    /// Grow the box by separate x and y amounts on each side.
    pub fn expand_xy(&self, dx: f64, dy: f64) -> Self {
        Self::new(
            self.min_x() - dx,
            self.min_y() - dy,
            self.max_x() + dx,
            self.max_y() + dy,
        )
    }
}

impl From<Rect> for Bounds {
    fn from(rect: Rect) -> Self {
        Self::from_rect(rect)
    }
}
