use std::sync::OnceLock;

use egui::{pos2, Pos2, Rect, Vec2};

use super::color::Color;

/// Default style for a newly inserted shape.
pub const DEFAULT_SHAPE_FILL: Color = Color::from_rgb(0xd7, 0x38, 0x5e);
pub const DEFAULT_SHAPE_STROKE: Color = Color::BLACK;
pub const DEFAULT_STROKE_WIDTH: f32 = 1.0;

/// Geometry of a shape object, in local coordinates centered on the origin.
///
/// The sized variants carry their own dimensions; the parametric variants
/// (`Polygon`, `Star`, `Heart`) share fixed outlines computed once per
/// process and are sized through the object's scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeKind {
    Rect { width: f32, height: f32 },
    Circle { radius: f32 },
    Triangle { width: f32, height: f32 },
    Line { length: f32 },
    Polygon,
    Star,
    Heart,
}

impl ShapeKind {
    pub fn default_rect() -> Self {
        ShapeKind::Rect { width: 100.0, height: 100.0 }
    }

    pub fn default_circle() -> Self {
        ShapeKind::Circle { radius: 50.0 }
    }

    pub fn default_triangle() -> Self {
        ShapeKind::Triangle { width: 100.0, height: 100.0 }
    }

    pub fn default_line() -> Self {
        ShapeKind::Line { length: 150.0 }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ShapeKind::Rect { .. } => "Rectangle",
            ShapeKind::Circle { .. } => "Circle",
            ShapeKind::Triangle { .. } => "Triangle",
            ShapeKind::Line { .. } => "Line",
            ShapeKind::Polygon => "Polygon",
            ShapeKind::Star => "Star",
            ShapeKind::Heart => "Heart",
        }
    }

    /// Bounding box in local (unscaled, unrotated) coordinates.
    pub fn local_bounds(&self) -> Rect {
        match *self {
            ShapeKind::Rect { width, height } | ShapeKind::Triangle { width, height } => {
                Rect::from_center_size(Pos2::ZERO, Vec2::new(width, height))
            }
            ShapeKind::Circle { radius } => {
                Rect::from_center_size(Pos2::ZERO, Vec2::splat(radius * 2.0))
            }
            ShapeKind::Line { length } => {
                Rect::from_center_size(Pos2::ZERO, Vec2::new(length, 0.0))
            }
            ShapeKind::Polygon => outline_bounds(polygon_outline()),
            ShapeKind::Star => outline_bounds(star_outline()),
            ShapeKind::Heart => outline_bounds(heart_outline()),
        }
    }

    /// Outline for the polygonal kinds. `None` for the analytic kinds
    /// (rect, circle, triangle, line), which callers draw directly.
    pub fn fixed_outline(&self) -> Option<&'static [Pos2]> {
        match self {
            ShapeKind::Polygon => Some(polygon_outline()),
            ShapeKind::Star => Some(star_outline()),
            ShapeKind::Heart => Some(heart_outline()),
            _ => None,
        }
    }
}

/// Irregular hexagon outline, centered.
pub fn polygon_outline() -> &'static [Pos2] {
    static OUTLINE: OnceLock<Vec<Pos2>> = OnceLock::new();
    OUTLINE.get_or_init(|| {
        centered(vec![
            pos2(0.0, 0.0),
            pos2(50.0, 0.0),
            pos2(75.0, 50.0),
            pos2(50.0, 100.0),
            pos2(0.0, 100.0),
            pos2(-25.0, 50.0),
        ])
    })
}

/// Five-point star outline (outer radius 50, inner 25), centered.
pub fn star_outline() -> &'static [Pos2] {
    static OUTLINE: OnceLock<Vec<Pos2>> = OnceLock::new();
    OUTLINE.get_or_init(|| {
        let points = (0..10)
            .map(|i| {
                let radius = if i % 2 == 0 { 50.0_f32 } else { 25.0 };
                let angle = i as f32 * std::f32::consts::PI / 5.0;
                pos2(radius * angle.sin(), radius * angle.cos())
            })
            .collect();
        centered(points)
    })
}

/// Heart curve control points: start, then two cubic segments.
pub const HEART_START: Pos2 = Pos2 { x: 0.0, y: -28.0 };
pub const HEART_CUBICS: [[Pos2; 3]; 2] = [
    [
        Pos2 { x: -28.0, y: -28.0 },
        Pos2 { x: -28.0, y: 28.0 },
        Pos2 { x: 0.0, y: 56.0 },
    ],
    [
        Pos2 { x: 28.0, y: 28.0 },
        Pos2 { x: 28.0, y: -28.0 },
        Pos2 { x: 0.0, y: -28.0 },
    ],
];

const HEART_SEGMENTS: usize = 24;

/// Heart outline, flattened from the cubic segments and centered.
pub fn heart_outline() -> &'static [Pos2] {
    static OUTLINE: OnceLock<Vec<Pos2>> = OnceLock::new();
    OUTLINE.get_or_init(|| {
        let mut points = vec![HEART_START];
        let mut from = HEART_START;
        for [c1, c2, to] in HEART_CUBICS {
            for step in 1..=HEART_SEGMENTS {
                let t = step as f32 / HEART_SEGMENTS as f32;
                points.push(cubic_point(from, c1, c2, to, t));
            }
            from = to;
        }
        // The last flattened point closes onto the start
        points.pop();
        centered(points)
    })
}

fn cubic_point(p0: Pos2, p1: Pos2, p2: Pos2, p3: Pos2, t: f32) -> Pos2 {
    let u = 1.0 - t;
    let w0 = u * u * u;
    let w1 = 3.0 * u * u * t;
    let w2 = 3.0 * u * t * t;
    let w3 = t * t * t;
    pos2(
        w0 * p0.x + w1 * p1.x + w2 * p2.x + w3 * p3.x,
        w0 * p0.y + w1 * p1.y + w2 * p2.y + w3 * p3.y,
    )
}

/// Recenter a point list on its bounding-box center.
fn centered(points: Vec<Pos2>) -> Vec<Pos2> {
    let bounds = outline_bounds(&points);
    let center = bounds.center();
    points.into_iter().map(|p| p - center.to_vec2()).collect()
}

pub(crate) fn outline_bounds(points: &[Pos2]) -> Rect {
    let mut min = pos2(f32::INFINITY, f32::INFINITY);
    let mut max = pos2(f32::NEG_INFINITY, f32::NEG_INFINITY);
    for p in points {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    Rect::from_min_max(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_has_ten_centered_vertices() {
        let outline = star_outline();
        assert_eq!(outline.len(), 10);
        let bounds = outline_bounds(outline);
        assert!(bounds.center().to_vec2().length() < 0.001);
        // Alternating outer/inner radii survive recentering up to the shift
        assert!(bounds.width() > 90.0 && bounds.width() < 101.0);
    }

    #[test]
    fn polygon_is_the_fixed_hexagon() {
        let outline = polygon_outline();
        assert_eq!(outline.len(), 6);
        let bounds = outline_bounds(outline);
        assert_eq!(bounds.width(), 100.0);
        assert_eq!(bounds.height(), 100.0);
    }

    #[test]
    fn heart_outline_is_closed_and_symmetric() {
        let outline = heart_outline();
        assert_eq!(outline.len(), 2 * 24);
        let bounds = outline_bounds(outline);
        // Symmetric about the vertical axis
        assert!((bounds.min.x + bounds.max.x).abs() < 0.01);
    }

    #[test]
    fn outlines_are_shared_instances() {
        assert_eq!(star_outline().as_ptr(), star_outline().as_ptr());
        assert_eq!(heart_outline().as_ptr(), heart_outline().as_ptr());
    }

    #[test]
    fn line_bounds_have_no_height() {
        let bounds = ShapeKind::default_line().local_bounds();
        assert_eq!(bounds.width(), 150.0);
        assert_eq!(bounds.height(), 0.0);
    }
}
