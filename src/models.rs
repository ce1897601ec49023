/// A point in image space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Four corners of a document outline.
///
/// Straight out of contour approximation the order is arbitrary. After
/// [`crate::rectify::order_points`] it is top-left, top-right, bottom-right,
/// bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrilateral {
    pub corners: [Point2D; 4],
}

impl Quadrilateral {
    pub fn new(corners: [Point2D; 4]) -> Self {
        Self { corners }
    }

    /// The full frame of a `width` x `height` image, already in canonical order.
    pub fn full_frame(width: u32, height: u32) -> Self {
        let right = width.saturating_sub(1) as f64;
        let bottom = height.saturating_sub(1) as f64;
        Self::new([
            Point2D::new(0.0, 0.0),
            Point2D::new(right, 0.0),
            Point2D::new(right, bottom),
            Point2D::new(0.0, bottom),
        ])
    }

    pub fn scaled(&self, ratio: ScaleRatio) -> Self {
        Self::new(self.corners.map(|p| p.scaled(ratio.get())))
    }

    /// Enclosed area, independent of winding direction.
    pub fn area(&self) -> f64 {
        polygon_area(&self.corners)
    }
}

/// Factor mapping working-resolution coordinates back to the original image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleRatio(f64);

impl ScaleRatio {
    pub const IDENTITY: ScaleRatio = ScaleRatio(1.0);

    pub fn new(ratio: f64) -> Self {
        Self(ratio)
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

/// Closed boundary traced from an edge map.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<Point2D>,
}

impl Contour {
    pub fn new(points: Vec<Point2D>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Area enclosed by the closed polygon through all points.
    pub fn area(&self) -> f64 {
        polygon_area(&self.points)
    }

    /// Length of the closed boundary.
    pub fn perimeter(&self) -> f64 {
        let n = self.points.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|i| self.points[i].distance(&self.points[(i + 1) % n]))
            .sum()
    }

    /// Top-most point, left-most among equals.
    pub fn anchor(&self) -> Option<Point2D> {
        self.points.iter().copied().min_by(|a, b| {
            a.y.total_cmp(&b.y).then_with(|| a.x.total_cmp(&b.x))
        })
    }
}

/// Axis-aligned box in integer pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Shoelace area of a closed polygon.
pub fn polygon_area(points: &[Point2D]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let j = (i + 1) % n;
            points[i].x * points[j].y - points[j].x * points[i].y
        })
        .sum();
    twice.abs() / 2.0
}
