//! Small geometry kit shared by positioning and routing.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// Axis-aligned rectangle identified by its center and full extent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_bounds(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            x: (left + right) / 2.0,
            y: (top + bottom) / 2.0,
            width: right - left,
            height: bottom - top,
        }
    }

    pub fn left(&self) -> f64 {
        self.x - self.width / 2.0
    }

    pub fn right(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn top(&self) -> f64 {
        self.y - self.height / 2.0
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left() && p.x <= self.right() && p.y >= self.top() && p.y <= self.bottom()
    }

    pub fn contains_with_tolerance(&self, p: Point, tol: f64) -> bool {
        p.x >= self.left() - tol
            && p.x <= self.right() + tol
            && p.y >= self.top() - tol
            && p.y <= self.bottom() + tol
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }

    pub fn expand(&self, by: f64) -> Rect {
        Rect::new(self.x, self.y, self.width + 2.0 * by, self.height + 2.0 * by)
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_bounds(
            self.left().min(other.left()),
            self.top().min(other.top()),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }
}

/// Point on the rectangle border hit by the ray from the center towards `point`.
///
/// The ray must not be degenerate; callers guard against a zero-length
/// direction and skip the intersection (the edge degrades to its raw
/// endpoint) rather than treating it as an error.
pub fn intersect_rect(rect: Rect, point: Point) -> Option<Point> {
    let dx = point.x - rect.x;
    let dy = point.y - rect.y;
    let mut w = rect.width / 2.0;
    let mut h = rect.height / 2.0;

    if dx == 0.0 && dy == 0.0 {
        return None;
    }

    let (sx, sy) = if dy.abs() * w > dx.abs() * h {
        if dy < 0.0 {
            h = -h;
        }
        (h * dx / dy, h)
    } else {
        if dx < 0.0 {
            w = -w;
        }
        (w, w * dy / dx)
    };

    Some(Point::new(rect.x + sx, rect.y + sy))
}

/// Cubic Bezier segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bezier {
    pub p0: Point,
    pub p1: Point,
    pub p2: Point,
    pub p3: Point,
}

impl Bezier {
    /// Degenerate straight segment expressed as a cubic.
    pub fn line(a: Point, b: Point) -> Self {
        Self {
            p0: a,
            p1: a.lerp(b, 1.0 / 3.0),
            p2: a.lerp(b, 2.0 / 3.0),
            p3: b,
        }
    }

    pub fn eval(&self, t: f64) -> Point {
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        Point::new(
            a * self.p0.x + b * self.p1.x + c * self.p2.x + d * self.p3.x,
            a * self.p0.y + b * self.p1.y + c * self.p2.y + d * self.p3.y,
        )
    }

    /// Tangent direction at `t` (not normalized).
    pub fn derivative(&self, t: f64) -> Point {
        let mt = 1.0 - t;
        Point::new(
            3.0 * mt * mt * (self.p1.x - self.p0.x)
                + 6.0 * mt * t * (self.p2.x - self.p1.x)
                + 3.0 * t * t * (self.p3.x - self.p2.x),
            3.0 * mt * mt * (self.p1.y - self.p0.y)
                + 6.0 * mt * t * (self.p2.y - self.p1.y)
                + 3.0 * t * t * (self.p3.y - self.p2.y),
        )
    }

    /// De Casteljau split at `t` into the `[0, t]` and `[t, 1]` halves.
    pub fn split(&self, t: f64) -> (Bezier, Bezier) {
        let p01 = self.p0.lerp(self.p1, t);
        let p12 = self.p1.lerp(self.p2, t);
        let p23 = self.p2.lerp(self.p3, t);
        let p012 = p01.lerp(p12, t);
        let p123 = p12.lerp(p23, t);
        let mid = p012.lerp(p123, t);
        (
            Bezier {
                p0: self.p0,
                p1: p01,
                p2: p012,
                p3: mid,
            },
            Bezier {
                p0: mid,
                p1: p123,
                p2: p23,
                p3: self.p3,
            },
        )
    }
}

/// Intersection of segment `a1-a2` with the horizontal line `y`, if crossed.
pub fn segment_at_y(a1: Point, a2: Point, y: f64) -> Option<Point> {
    let dy = a2.y - a1.y;
    if dy == 0.0 {
        return None;
    }
    let t = (y - a1.y) / dy;
    if !(0.0..=1.0).contains(&t) {
        return None;
    }
    Some(a1.lerp(a2, t))
}
