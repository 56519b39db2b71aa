//! Shape-preserving cubic interpolation (Fritsch–Carlson) as Bezier segments.
//!
//! Tangents come from the secant slopes. Where neighbouring secants change
//! sign or one is flat the tangent is zero, and the limiter keeps
//! `alpha^2 + beta^2 <= 9` so no segment overshoots its end values.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// One cubic Bezier piece between two consecutive data points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CubicSegment {
    pub from: Point,
    pub c1: Point,
    pub c2: Point,
    pub to: Point,
}

impl CubicSegment {
    pub fn point_at(&self, t: f64) -> Point {
        let u = 1.0 - t;
        let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
        Point {
            x: a * self.from.x + b * self.c1.x + c * self.c2.x + d * self.to.x,
            y: a * self.from.y + b * self.c1.y + c * self.c2.y + d * self.to.y,
        }
    }

    /// Apply an affine per-axis map; Bezier curves are invariant under it.
    pub fn map(&self, f: impl Fn(Point) -> Point) -> Self {
        Self {
            from: f(self.from),
            c1: f(self.c1),
            c2: f(self.c2),
            to: f(self.to),
        }
    }
}

/// Limited tangents at each point. `points` must have strictly increasing x.
pub fn tangents(points: &[Point]) -> Vec<f64> {
    let n = points.len();
    if n < 2 {
        return vec![0.0; n];
    }
    let secants: Vec<f64> = points
        .windows(2)
        .map(|w| (w[1].y - w[0].y) / (w[1].x - w[0].x))
        .collect();

    let mut m = vec![0.0; n];
    m[0] = secants[0];
    m[n - 1] = secants[n - 2];
    for k in 1..n - 1 {
        let (prev, next) = (secants[k - 1], secants[k]);
        m[k] = if prev * next <= 0.0 { 0.0 } else { (prev + next) / 2.0 };
    }

    for (k, &d) in secants.iter().enumerate() {
        if d == 0.0 {
            m[k] = 0.0;
            m[k + 1] = 0.0;
            continue;
        }
        let alpha = m[k] / d;
        let beta = m[k + 1] / d;
        let s = alpha * alpha + beta * beta;
        if s > 9.0 {
            let tau = 3.0 / s.sqrt();
            m[k] = tau * alpha * d;
            m[k + 1] = tau * beta * d;
        }
    }
    m
}

pub fn monotone_segments(points: &[Point]) -> Vec<CubicSegment> {
    let m = tangents(points);
    points
        .windows(2)
        .enumerate()
        .map(|(k, w)| {
            let (p0, p1) = (w[0], w[1]);
            let h = (p1.x - p0.x) / 3.0;
            CubicSegment {
                from: p0,
                c1: Point::new(p0.x + h, p0.y + m[k] * h),
                c2: Point::new(p1.x - h, p1.y - m[k + 1] * h),
                to: p1,
            }
        })
        .collect()
}
