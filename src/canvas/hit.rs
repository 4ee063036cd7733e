//! Pointer hit-testing in document space.
//!
//! Objects are tested against their actual geometry, not just their bounding
//! boxes: concave shapes (star, heart) only hit inside the outline. Text
//! sizes depend on font layout, so callers supply a size source instead of
//! this module measuring anything itself.

use egui::{pos2, Pos2, Vec2};

use crate::scene::{ObjectId, ObjectKind, SceneDocument, SceneObject, ShapeAttrs, ShapeKind};

/// Grab margin around hairline geometry, in local units.
const LINE_SLOP: f32 = 4.0;

/// Map a document-space point into the object's local frame: centered on
/// the geometry, unrotated, unscaled.
pub fn to_local(object: &SceneObject, local_size: Vec2, point: Pos2) -> Pos2 {
    let scaled = local_size * object.scale;
    let center = object.center_for(scaled);
    let v = point - center;
    let (sin, cos) = (-object.rotation_degrees.to_radians()).sin_cos();
    let rotated = Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos);
    let sx = if object.scale.x.abs() < f32::EPSILON { 1.0 } else { object.scale.x };
    let sy = if object.scale.y.abs() < f32::EPSILON { 1.0 } else { object.scale.y };
    pos2(rotated.x / sx, rotated.y / sy)
}

/// Whether `point` (document space) falls on the object.
pub fn hit_object(object: &SceneObject, local_size: Vec2, point: Pos2) -> bool {
    let p = to_local(object, local_size, point);
    match &object.kind {
        ObjectKind::Text(_) | ObjectKind::Image(_) => {
            p.x.abs() <= local_size.x * 0.5 && p.y.abs() <= local_size.y * 0.5
        }
        ObjectKind::Shape(attrs) => shape_contains(attrs, p),
    }
}

fn shape_contains(attrs: &ShapeAttrs, p: Pos2) -> bool {
    match attrs.kind {
        ShapeKind::Rect { width, height } => {
            p.x.abs() <= width * 0.5 && p.y.abs() <= height * 0.5
        }
        ShapeKind::Circle { radius } => p.to_vec2().length_sq() <= radius * radius,
        ShapeKind::Triangle { width, height } => {
            let half_w = width * 0.5;
            let half_h = height * 0.5;
            point_in_polygon(
                &[
                    pos2(0.0, -half_h),
                    pos2(half_w, half_h),
                    pos2(-half_w, half_h),
                ],
                p,
            )
        }
        ShapeKind::Line { length } => {
            let grab = (attrs.stroke_width * 0.5).max(LINE_SLOP);
            p.x.abs() <= length * 0.5 + grab && p.y.abs() <= grab
        }
        ShapeKind::Polygon | ShapeKind::Star | ShapeKind::Heart => attrs
            .kind
            .fixed_outline()
            .is_some_and(|outline| point_in_polygon(outline, p)),
    }
}

/// Even-odd containment test.
pub fn point_in_polygon(points: &[Pos2], p: Pos2) -> bool {
    if points.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (a, b) = (points[i], points[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let t = (p.y - a.y) / (b.y - a.y);
            if p.x < a.x + t * (b.x - a.x) {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Frontmost selectable object under the pointer, if any. `local_size`
/// supplies each object's unscaled bounds (text needs layout for this).
pub fn topmost_hit<F>(doc: &SceneDocument, point: Pos2, mut local_size: F) -> Option<ObjectId>
where
    F: FnMut(&SceneObject) -> Vec2,
{
    doc.objects()
        .iter()
        .rev()
        .find(|object| object.locks.selectable && hit_object(object, local_size(object), point))
        .map(|object| object.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ImageAttrs, ImageSource, LockFlags, ObjectKind, TextAttrs};
    use egui::vec2;

    fn shape_at(kind: ShapeKind, position: Pos2) -> SceneObject {
        SceneObject::new(ObjectKind::Shape(ShapeAttrs::new(kind)), position)
    }

    fn size_of(object: &SceneObject) -> Vec2 {
        match &object.kind {
            ObjectKind::Shape(attrs) => attrs.kind.local_bounds().size(),
            ObjectKind::Image(attrs) => attrs.natural_size,
            ObjectKind::Text(_) => vec2(120.0, 30.0),
        }
    }

    #[test]
    fn circle_hits_by_distance() {
        let object = shape_at(ShapeKind::default_circle(), pos2(100.0, 100.0));
        let size = size_of(&object);
        assert!(hit_object(&object, size, pos2(100.0, 100.0)));
        assert!(hit_object(&object, size, pos2(140.0, 100.0)));
        // Inside the bounding box but outside the disc
        assert!(!hit_object(&object, size, pos2(140.0, 140.0)));
    }

    #[test]
    fn star_concave_gap_misses() {
        let object = shape_at(ShapeKind::Star, pos2(0.0, 0.0));
        let size = size_of(&object);
        // Dead center is inside
        assert!(hit_object(&object, size, pos2(0.0, 0.0)));
        // Between two arms near the top corners of the bounding box
        assert!(!hit_object(&object, size, pos2(40.0, -45.0)));
    }

    #[test]
    fn rotation_moves_the_hit_region() {
        let mut object = shape_at(
            ShapeKind::Rect { width: 100.0, height: 10.0 },
            pos2(0.0, 0.0),
        );
        let size = size_of(&object);
        assert!(hit_object(&object, size, pos2(45.0, 0.0)));
        assert!(!hit_object(&object, size, pos2(0.0, 45.0)));

        object.rotation_degrees = 90.0;
        assert!(!hit_object(&object, size, pos2(45.0, 0.0)));
        assert!(hit_object(&object, size, pos2(0.0, 45.0)));
    }

    #[test]
    fn scale_grows_the_hit_region() {
        let mut object = SceneObject::new(
            ObjectKind::Image(ImageAttrs::new(
                ImageSource::DataUrl("data:x".to_owned()),
                vec2(100.0, 100.0),
            )),
            pos2(0.0, 0.0),
        );
        let size = size_of(&object);
        assert!(!hit_object(&object, size, pos2(80.0, 0.0)));
        object.scale = vec2(2.0, 2.0);
        assert!(hit_object(&object, size, pos2(80.0, 0.0)));
    }

    #[test]
    fn line_has_grab_margin() {
        let object = shape_at(ShapeKind::default_line(), pos2(0.0, 0.0));
        let size = size_of(&object);
        assert!(hit_object(&object, size, pos2(0.0, 3.0)));
        assert!(!hit_object(&object, size, pos2(0.0, 10.0)));
    }

    #[test]
    fn topmost_object_wins_and_locks_are_respected() {
        let mut doc = SceneDocument::default();
        let below = doc.add_object(shape_at(ShapeKind::default_rect(), pos2(400.0, 300.0)));
        let above = doc.add_object(shape_at(ShapeKind::default_rect(), pos2(400.0, 300.0)));

        assert_eq!(
            topmost_hit(&doc, pos2(400.0, 300.0), size_of),
            Some(above)
        );

        if let Some(object) = doc.object_mut(above) {
            object.locks = LockFlags::frozen();
        }
        assert_eq!(
            topmost_hit(&doc, pos2(400.0, 300.0), size_of),
            Some(below)
        );
    }

    #[test]
    fn anchored_text_offsets_its_bounds() {
        use crate::scene::{HAnchor, VAnchor};
        let mut object = SceneObject::new(ObjectKind::Text(TextAttrs::default()), pos2(0.0, 0.0));
        object.anchor = (HAnchor::Left, VAnchor::Top);
        let size = vec2(120.0, 30.0);
        // Bounds extend right and down from the anchor
        assert!(hit_object(&object, size, pos2(60.0, 15.0)));
        assert!(!hit_object(&object, size, pos2(-10.0, 15.0)));
    }
}
