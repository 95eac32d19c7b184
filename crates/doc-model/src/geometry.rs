use serde::{Deserialize, Serialize};

/// Point in page space. Origin is the top-left corner of the page, y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Axis-aligned rectangle in page space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bound {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bound {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Smallest bound covering every point. Empty input yields a zero bound.
    pub fn enclosing(points: &[Point]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for point in points.iter().skip(1) {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }

        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn top_center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.top())
    }

    pub fn bottom_center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.bottom())
    }

    pub fn left_middle(&self) -> Point {
        Point::new(self.left(), self.y + self.height / 2.0)
    }

    pub fn right_middle(&self) -> Point {
        Point::new(self.right(), self.y + self.height / 2.0)
    }

    /// Whether `other` lies entirely inside this bound (edges inclusive).
    pub fn contains_bound(&self, other: &Bound) -> bool {
        other.left() >= self.left()
            && other.right() <= self.right()
            && other.top() >= self.top()
            && other.bottom() <= self.bottom()
    }

    pub fn contains_point(&self, point: &Point) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }

    /// True when the vertical extents share more than a touching edge.
    pub fn overlaps_vertically(&self, other: &Bound) -> bool {
        self.top() < other.bottom() && other.top() < self.bottom()
    }

    pub fn union(&self, other: &Bound) -> Bound {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Bound::new(left, top, right - left, bottom - top)
    }

    /// Multiply every coordinate by the per-axis ratio.
    pub fn scaled(&self, ratio_x: f64, ratio_y: f64) -> Bound {
        Bound::new(self.x * ratio_x, self.y * ratio_y, self.width * ratio_x, self.height * ratio_y)
    }
}

/// Page dimensions as reported by a feed. Each feed carries its own size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}
