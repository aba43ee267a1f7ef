//! Parametric shape generators for drag gestures.
//!
//! Each generator is a pure function `(center, size) → ordered point
//! sequence`; the sequence is replayed as press–move–release by the
//! input layer. Point counts are fixed constants: more points give a
//! smoother stroke, fewer a faster one.

use std::f64::consts::PI;

use crate::errors::{DeskPilotError, DeskPilotResult};
use crate::facade::types::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Circle,
    Square,
    Triangle,
    Star,
    Heart,
    Spiral,
}

impl ShapeKind {
    pub fn parse(s: &str) -> DeskPilotResult<Self> {
        let kind = match s.to_ascii_lowercase().as_str() {
            "circle" => ShapeKind::Circle,
            "square" => ShapeKind::Square,
            "triangle" => ShapeKind::Triangle,
            "star" => ShapeKind::Star,
            "heart" => ShapeKind::Heart,
            "spiral" => ShapeKind::Spiral,
            other => {
                return Err(DeskPilotError::InvalidArguments(format!(
                    "unknown shape '{other}' (expected circle|square|triangle|star|heart|spiral)"
                )))
            }
        };
        Ok(kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Circle => "circle",
            ShapeKind::Square => "square",
            ShapeKind::Triangle => "triangle",
            ShapeKind::Star => "star",
            ShapeKind::Heart => "heart",
            ShapeKind::Spiral => "spiral",
        }
    }
}

/// Samples per full revolution for the round shapes.
const CIRCLE_STEPS: usize = 64;
const HEART_STEPS: usize = 80;
const SPIRAL_TURNS: f64 = 3.0;
const SPIRAL_STEPS: usize = 120;
/// Interpolated points per polygon edge.
const EDGE_STEPS: usize = 12;

pub fn generate(kind: ShapeKind, center: Point, size: f64) -> Vec<Point> {
    match kind {
        ShapeKind::Circle => circle(center, size),
        ShapeKind::Square => polygon(center, &square_corners(size)),
        ShapeKind::Triangle => polygon(center, &triangle_corners(size)),
        ShapeKind::Star => polygon(center, &star_corners(size)),
        ShapeKind::Heart => heart(center, size),
        ShapeKind::Spiral => spiral(center, size),
    }
}

fn circle(center: Point, radius: f64) -> Vec<Point> {
    (0..=CIRCLE_STEPS)
        .map(|i| {
            let t = 2.0 * PI * i as f64 / CIRCLE_STEPS as f64;
            at(center, radius * t.cos(), radius * t.sin())
        })
        .collect()
}

fn square_corners(half: f64) -> Vec<(f64, f64)> {
    vec![(-half, -half), (half, -half), (half, half), (-half, half)]
}

fn triangle_corners(size: f64) -> Vec<(f64, f64)> {
    // Equilateral, apex up; screen Y grows downward.
    vec![
        (0.0, -size),
        (size * (PI / 6.0).cos(), size * 0.5),
        (-size * (PI / 6.0).cos(), size * 0.5),
    ]
}

fn star_corners(size: f64) -> Vec<(f64, f64)> {
    // Five-pointed star: alternate outer and inner vertices, apex up.
    let inner = size * 0.4;
    (0..10)
        .map(|i| {
            let r = if i % 2 == 0 { size } else { inner };
            let t = -PI / 2.0 + PI * i as f64 / 5.0;
            (r * t.cos(), r * t.sin())
        })
        .collect()
}

/// Close the corner loop and interpolate along each edge so the drag
/// moves in small steps rather than corner-to-corner jumps.
fn polygon(center: Point, corners: &[(f64, f64)]) -> Vec<Point> {
    let n = corners.len();
    let mut points = Vec::with_capacity(n * EDGE_STEPS + 1);
    for i in 0..n {
        let (x0, y0) = corners[i];
        let (x1, y1) = corners[(i + 1) % n];
        for s in 0..EDGE_STEPS {
            let f = s as f64 / EDGE_STEPS as f64;
            points.push(at(center, x0 + (x1 - x0) * f, y0 + (y1 - y0) * f));
        }
    }
    points.push(at(center, corners[0].0, corners[0].1));
    points
}

fn heart(center: Point, size: f64) -> Vec<Point> {
    // Classic parametric heart, scaled so its width is roughly 2*size.
    // Y is negated because screen coordinates grow downward.
    let scale = size / 16.0;
    (0..=HEART_STEPS)
        .map(|i| {
            let t = 2.0 * PI * i as f64 / HEART_STEPS as f64;
            let x = 16.0 * t.sin().powi(3);
            let y = 13.0 * t.cos()
                - 5.0 * (2.0 * t).cos()
                - 2.0 * (3.0 * t).cos()
                - (4.0 * t).cos();
            at(center, x * scale, -y * scale)
        })
        .collect()
}

fn spiral(center: Point, size: f64) -> Vec<Point> {
    // Archimedean spiral winding outward from the center.
    (0..=SPIRAL_STEPS)
        .map(|i| {
            let f = i as f64 / SPIRAL_STEPS as f64;
            let t = 2.0 * PI * SPIRAL_TURNS * f;
            let r = size * f;
            at(center, r * t.cos(), r * t.sin())
        })
        .collect()
}

fn at(center: Point, dx: f64, dy: f64) -> Point {
    Point {
        x: center.x + dx.round() as i32,
        y: center.y + dy.round() as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENTER: Point = Point { x: 500, y: 400 };

    #[test]
    fn circle_is_deterministic() {
        let a = generate(ShapeKind::Circle, CENTER, 120.0);
        let b = generate(ShapeKind::Circle, CENTER, 120.0);
        assert_eq!(a, b);
    }

    #[test]
    fn circle_is_closed_and_on_radius() {
        let pts = generate(ShapeKind::Circle, CENTER, 100.0);
        assert_eq!(pts.first(), pts.last());
        for p in &pts {
            let dx = (p.x - CENTER.x) as f64;
            let dy = (p.y - CENTER.y) as f64;
            let r = (dx * dx + dy * dy).sqrt();
            assert!((r - 100.0).abs() < 1.5, "point off radius: {r}");
        }
    }

    #[test]
    fn polygons_are_closed() {
        for kind in [ShapeKind::Square, ShapeKind::Triangle, ShapeKind::Star] {
            let pts = generate(kind, CENTER, 80.0);
            assert_eq!(pts.first(), pts.last(), "{kind:?} not closed");
            assert!(pts.len() > 10);
        }
    }

    #[test]
    fn spiral_winds_outward() {
        let pts = generate(ShapeKind::Spiral, CENTER, 150.0);
        assert_eq!(pts[0], CENTER);
        let dist = |p: &Point| {
            let dx = (p.x - CENTER.x) as f64;
            let dy = (p.y - CENTER.y) as f64;
            (dx * dx + dy * dy).sqrt()
        };
        assert!(dist(pts.last().unwrap()) > dist(&pts[SPIRAL_STEPS / 2]));
    }

    #[test]
    fn unknown_shape_name_is_rejected() {
        assert!(ShapeKind::parse("hexagon").is_err());
        assert_eq!(ShapeKind::parse("Heart").unwrap(), ShapeKind::Heart);
    }
}
