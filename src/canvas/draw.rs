//! Paints the document into the canvas widget through egui.
//!
//! Analytic kinds (rect, circle, triangle, line, hexagon, text) go through
//! epaint shapes directly. Concave shapes and images are rasterized once
//! with the same tiny-skia paths the export path uses, cached as textures,
//! and drawn as rotated quads, so the on-screen result matches a flattened
//! export up to filtering.

use std::sync::Arc;

use egui::emath::Rot2;
use egui::epaint::TextShape;
use egui::text::{LayoutJob, TextFormat};
use egui::{
    Align, Color32, Context, FontId, Galley, Painter, Pos2, Rect, Shape, Stroke, Vec2,
};

use crate::assets::fonts::SharedFontLibrary;
use crate::assets::textures::{image_version, shape_version, source_version, TextureCache, TextureKey};
use crate::assets::AssetGallery;
use crate::error::EditorResult;
use crate::render;
use crate::scene::{
    BackgroundImage, FontStyle, FontWeight, ImageAttrs, ObjectKind, SceneDocument, SceneObject,
    ShapeAttrs, ShapeKind, TextAlign, TextAttrs,
};
use crate::viewport::Viewport;

/// Supersampling factor for shape rasters, so texture quads stay crisp when
/// zoomed or scaled up moderately.
const SHAPE_RASTER_SCALE: f32 = 2.0;

/// Side length of a square scale handle, in screen pixels.
pub const HANDLE_SIZE: f32 = 8.0;

/// Distance from the top edge to the rotate knob, in screen pixels.
pub const ROTATE_OFFSET: f32 = 24.0;

const SELECTION_ACCENT: Color32 = Color32::from_rgb(0x4a, 0x90, 0xd9);

/// Grab points of a selected object, in unit coordinates (`-1..=1` across
/// the object's bounds). Corner order matches [`ScreenGeometry::corners`].
pub const CORNER_UNITS: [Vec2; 4] = [
    Vec2::new(-1.0, -1.0),
    Vec2::new(1.0, -1.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(-1.0, 1.0),
];

/// An object's oriented bounds on screen.
#[derive(Debug, Clone, Copy)]
pub struct ScreenGeometry {
    pub center: Pos2,
    pub half: Vec2,
    /// Clockwise, radians.
    pub rotation: f32,
}

impl ScreenGeometry {
    /// A point on the bounds, addressed in unit coordinates.
    pub fn point_at(&self, unit: Vec2) -> Pos2 {
        self.center + Rot2::from_angle(self.rotation) * (unit * self.half)
    }

    pub fn corners(&self) -> [Pos2; 4] {
        CORNER_UNITS.map(|unit| self.point_at(unit))
    }

    pub fn rotate_knob(&self) -> Pos2 {
        self.point_at(Vec2::new(0.0, -1.0))
            + Rot2::from_angle(self.rotation) * Vec2::new(0.0, -ROTATE_OFFSET)
    }
}

/// Screen-space bounds of an object given its local (unscaled) size.
pub fn geometry(viewport: &Viewport, canvas: Vec2, object: &SceneObject, local_size: Vec2) -> ScreenGeometry {
    let scaled = local_size * object.scale;
    let center = object.center_for(scaled);
    ScreenGeometry {
        center: viewport.doc_to_screen(canvas, center),
        // Lines have zero local height; leave the marquee a sliver to grab
        half: (scaled * viewport.zoom() / 2.0).max(Vec2::splat(1.0)),
        rotation: object.rotation_degrees.to_radians(),
    }
}

/// Local bounds of an object before scale and rotation. Text measures
/// through the galley it will be painted with.
pub fn object_local_size(
    ctx: &Context,
    fonts: &SharedFontLibrary,
    zoom: f32,
    object: &SceneObject,
) -> Vec2 {
    match &object.kind {
        ObjectKind::Text(attrs) => text_galley(ctx, fonts, attrs, zoom).size() / zoom,
        ObjectKind::Shape(attrs) => attrs.kind.local_bounds().size(),
        ObjectKind::Image(attrs) => attrs.natural_size,
    }
}

/// Shape the text content at screen scale. egui caches the galley per frame,
/// so repeated calls with the same attrs are cheap.
pub fn text_galley(
    ctx: &Context,
    fonts: &SharedFontLibrary,
    attrs: &TextAttrs,
    zoom: f32,
) -> Arc<Galley> {
    let color = attrs.fill.to_color32();
    let format = TextFormat {
        font_id: FontId::new(attrs.font_size * zoom, fonts.egui_family(&attrs.font_family)),
        extra_letter_spacing: attrs.letter_spacing_px() * zoom,
        line_height: Some(attrs.font_size * attrs.line_height.max(0.1) * zoom),
        color,
        italics: attrs.style == FontStyle::Italic,
        underline: if attrs.underline {
            Stroke::new((zoom * 1.5).max(1.0), color)
        } else {
            Stroke::NONE
        },
        ..TextFormat::default()
    };
    let mut job = LayoutJob::default();
    job.append(&attrs.content, 0.0, format);
    job.halign = match attrs.align {
        TextAlign::Left => Align::LEFT,
        TextAlign::Center => Align::Center,
        TextAlign::Right => Align::RIGHT,
    };
    ctx.fonts(|f| f.layout_job(job))
}

/// Paint the whole document clipped to the canvas page.
pub fn paint_document(
    painter: &Painter,
    viewport: &Viewport,
    doc: &SceneDocument,
    fonts: &SharedFontLibrary,
    gallery: &AssetGallery,
    textures: &mut TextureCache,
) {
    let canvas = doc.size();
    let page = viewport.canvas_rect(canvas);
    let painter = painter.with_clip_rect(page.intersect(painter.clip_rect()));

    painter.rect_filled(page, 0.0, Color32::WHITE);
    if !doc.background_color.is_transparent() {
        painter.rect_filled(page, 0.0, doc.background_color.to_color32());
    }
    if let Some(background) = &doc.background {
        paint_background(&painter, viewport, canvas, background, gallery, textures);
    }
    for object in doc.objects() {
        paint_object(&painter, viewport, canvas, object, fonts, gallery, textures);
    }
}

fn paint_background(
    painter: &Painter,
    viewport: &Viewport,
    canvas: Vec2,
    background: &BackgroundImage,
    gallery: &AssetGallery,
    textures: &mut TextureCache,
) {
    let source = background.source.clone();
    let result = textures.get_or_create(
        TextureKey::Background,
        source_version(&background.source),
        move || color_image(&source, gallery),
        painter.ctx(),
    );
    let texture = match result {
        Ok(texture) => texture,
        Err(err) => {
            log::debug!("Background texture unavailable: {err}");
            return;
        }
    };

    let scale = background.applied_scale(canvas) * viewport.zoom();
    let size = Vec2::new(
        background.natural_size.x.max(1.0) * scale.x,
        background.natural_size.y.max(1.0) * scale.y,
    );
    let rect = Rect::from_center_size(viewport.canvas_rect(canvas).center(), size);
    textured_quad(painter, texture, rect, 0.0, 1.0);
}

fn paint_object(
    painter: &Painter,
    viewport: &Viewport,
    canvas: Vec2,
    object: &SceneObject,
    fonts: &SharedFontLibrary,
    gallery: &AssetGallery,
    textures: &mut TextureCache,
) {
    if object.opacity <= 0.0 {
        return;
    }
    match &object.kind {
        ObjectKind::Text(attrs) => paint_text(painter, viewport, canvas, object, attrs, fonts),
        ObjectKind::Shape(attrs) => {
            paint_shape(painter, viewport, canvas, object, attrs, textures)
        }
        ObjectKind::Image(attrs) => {
            paint_image(painter, viewport, canvas, object, attrs, gallery, textures)
        }
    }
}

fn paint_text(
    painter: &Painter,
    viewport: &Viewport,
    canvas: Vec2,
    object: &SceneObject,
    attrs: &TextAttrs,
    fonts: &SharedFontLibrary,
) {
    let galley = text_galley(painter.ctx(), fonts, attrs, viewport.zoom());
    if galley.is_empty() {
        return;
    }
    let local = galley.size() / viewport.zoom();
    let geo = geometry(viewport, canvas, object, local);

    // The galley anchor depends on halign: left rows anchor at min-x,
    // centered rows at the midline, right rows at max-x
    let anchor_unit = match attrs.align {
        TextAlign::Left => Vec2::new(-1.0, -1.0),
        TextAlign::Center => Vec2::new(0.0, -1.0),
        TextAlign::Right => Vec2::new(1.0, -1.0),
    };
    let mut shape = TextShape::new(geo.point_at(anchor_unit), galley, attrs.fill.to_color32());
    shape.angle = geo.rotation;
    shape.opacity_factor = object.opacity;

    if attrs.weight == FontWeight::Bold {
        // Synthetic bold: second strike one device pixel to the right
        let offset = (attrs.font_size * viewport.zoom() / 24.0).round().max(1.0);
        let mut strike = shape.clone();
        strike.pos += Rot2::from_angle(geo.rotation) * Vec2::new(offset, 0.0);
        painter.add(Shape::Text(strike));
    }
    painter.add(Shape::Text(shape));
}

fn paint_shape(
    painter: &Painter,
    viewport: &Viewport,
    canvas: Vec2,
    object: &SceneObject,
    attrs: &ShapeAttrs,
    textures: &mut TextureCache,
) {
    let local = attrs.kind.local_bounds().size();
    let geo = geometry(viewport, canvas, object, local);
    let opacity = object.opacity;
    let fill = attrs
        .fill
        .map(|c| c.to_color32().gamma_multiply(opacity))
        .unwrap_or(Color32::TRANSPARENT);
    let stroke_width =
        attrs.stroke_width * viewport.zoom() * (object.scale.x + object.scale.y) / 2.0;
    let stroke = if attrs.stroke_width > 0.0 && !attrs.stroke.is_transparent() {
        Stroke::new(stroke_width, attrs.stroke.to_color32().gamma_multiply(opacity))
    } else {
        Stroke::NONE
    };

    let to_screen = |local_point: Pos2| -> Pos2 {
        geo.center
            + Rot2::from_angle(geo.rotation)
                * (local_point.to_vec2() * object.scale * viewport.zoom())
    };

    match attrs.kind {
        ShapeKind::Rect { .. } => {
            painter.add(Shape::convex_polygon(geo.corners().to_vec(), fill, stroke));
        }
        ShapeKind::Triangle { width, height } => {
            let points = vec![
                to_screen(Pos2::new(0.0, -height / 2.0)),
                to_screen(Pos2::new(width / 2.0, height / 2.0)),
                to_screen(Pos2::new(-width / 2.0, height / 2.0)),
            ];
            painter.add(Shape::convex_polygon(points, fill, stroke));
        }
        ShapeKind::Line { length } => {
            let a = to_screen(Pos2::new(-length / 2.0, 0.0));
            let b = to_screen(Pos2::new(length / 2.0, 0.0));
            let stroke = Stroke::new(
                stroke_width.max(1.0),
                attrs.stroke.to_color32().gamma_multiply(opacity),
            );
            painter.line_segment([a, b], stroke);
        }
        ShapeKind::Circle { radius } => {
            if (object.scale.x - object.scale.y).abs() < 1e-3 {
                let r = radius * object.scale.x * viewport.zoom();
                painter.circle(geo.center, r, fill, stroke);
            } else {
                // Anisotropic scale turns it into an ellipse; sample it
                let points = (0..48)
                    .map(|i| {
                        let angle = i as f32 / 48.0 * std::f32::consts::TAU;
                        to_screen(Pos2::new(radius * angle.cos(), radius * angle.sin()))
                    })
                    .collect();
                painter.add(Shape::convex_polygon(points, fill, stroke));
            }
        }
        ShapeKind::Polygon => {
            let points = crate::scene::shape::polygon_outline()
                .iter()
                .map(|p| to_screen(*p))
                .collect();
            painter.add(Shape::convex_polygon(points, fill, stroke));
        }
        // Concave outlines cannot go through convex_polygon; draw the
        // cached raster as a rotated quad instead
        ShapeKind::Star | ShapeKind::Heart => {
            let raster_attrs = attrs.clone();
            let result = textures.get_or_create(
                TextureKey::Object(object.id),
                shape_version(attrs),
                move || shape_raster(&raster_attrs),
                painter.ctx(),
            );
            match result {
                Ok(texture) => {
                    let rect = Rect::from_center_size(geo.center, geo.half * 2.0);
                    textured_quad(painter, texture, rect, geo.rotation, opacity);
                }
                Err(err) => log::debug!("Shape raster unavailable: {err}"),
            }
        }
    }
}

fn paint_image(
    painter: &Painter,
    viewport: &Viewport,
    canvas: Vec2,
    object: &SceneObject,
    attrs: &ImageAttrs,
    gallery: &AssetGallery,
    textures: &mut TextureCache,
) {
    let filtered = attrs.clone();
    let result = textures.get_or_create(
        TextureKey::Object(object.id),
        image_version(attrs),
        move || filtered_image(&filtered, gallery),
        painter.ctx(),
    );
    let texture = match result {
        Ok(texture) => texture,
        Err(err) => {
            log::debug!("Image texture unavailable for {}: {err}", object.id);
            return;
        }
    };

    let geo = geometry(viewport, canvas, object, attrs.natural_size);
    let rect = Rect::from_center_size(geo.center, geo.half * 2.0);
    textured_quad(painter, texture, rect, geo.rotation, object.opacity);

    if attrs.stroke_width > 0.0 && !attrs.stroke.is_transparent() {
        let width = attrs.stroke_width * viewport.zoom() * (object.scale.x + object.scale.y) / 2.0;
        let stroke = Stroke::new(width, attrs.stroke.to_color32().gamma_multiply(object.opacity));
        painter.add(Shape::closed_line(geo.corners().to_vec(), stroke));
    }
}

/// Axis-aligned quad rotated about its center, textured edge to edge.
fn textured_quad(painter: &Painter, texture: egui::TextureId, rect: Rect, rotation: f32, opacity: f32) {
    let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
    let mut mesh = egui::Mesh::with_texture(texture);
    mesh.add_rect_with_uv(rect, uv, Color32::WHITE.gamma_multiply(opacity));
    if rotation != 0.0 {
        mesh.rotate(Rot2::from_angle(rotation), rect.center());
    }
    painter.add(Shape::mesh(mesh));
}

/// Selection outline without grab points, for pinned or secondary objects.
pub fn paint_marquee(painter: &Painter, geo: &ScreenGeometry) {
    let stroke = Stroke::new(1.5, SELECTION_ACCENT);
    painter.add(Shape::closed_line(geo.corners().to_vec(), stroke));
}

/// Selection marquee with corner scale handles and the rotate knob.
pub fn paint_selection(painter: &Painter, geo: &ScreenGeometry) {
    paint_marquee(painter, geo);
    let stroke = Stroke::new(1.5, SELECTION_ACCENT);

    let top_center = geo.point_at(Vec2::new(0.0, -1.0));
    let knob = geo.rotate_knob();
    painter.line_segment([top_center, knob], stroke);
    painter.circle(knob, HANDLE_SIZE / 2.0 + 1.0, Color32::WHITE, stroke);

    for corner in geo.corners() {
        let rect = Rect::from_center_size(corner, Vec2::splat(HANDLE_SIZE));
        painter.rect_filled(rect, 1.0, Color32::WHITE);
        painter.rect_stroke(rect, 1.0, Stroke::new(1.0, SELECTION_ACCENT));
    }
}

/// A grabbable part of the selection overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Handle {
    /// Corner scale handle; `unit` names the dragged corner.
    Scale { unit: Vec2 },
    Rotate,
}

/// The handle under the pointer, if any. The rotate knob wins ties since it
/// sits outside the bounds.
pub fn handle_at(geo: &ScreenGeometry, pointer: Pos2) -> Option<Handle> {
    let grab = HANDLE_SIZE;
    if (geo.rotate_knob() - pointer).length() <= grab {
        return Some(Handle::Rotate);
    }
    for unit in CORNER_UNITS {
        if (geo.point_at(unit) - pointer).length() <= grab {
            return Some(Handle::Scale { unit });
        }
    }
    None
}

/// Rasterize star and heart outlines with the export path's geometry,
/// supersampled for quad scaling.
fn shape_raster(attrs: &ShapeAttrs) -> EditorResult<egui::ColorImage> {
    let bounds = attrs.kind.local_bounds();
    let margin = attrs.stroke_width.max(1.0);
    let width = ((bounds.width() + margin * 2.0) * SHAPE_RASTER_SCALE).ceil().max(1.0) as u32;
    let height = ((bounds.height() + margin * 2.0) * SHAPE_RASTER_SCALE).ceil().max(1.0) as u32;
    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or_else(|| crate::error::EditorError::ResourceLoad {
            what: "shape raster".to_owned(),
            detail: format!("cannot allocate {width}x{height}"),
        })?;

    let Some(path) = render::shape_path(&attrs.kind) else {
        return Ok(egui::ColorImage::new([1, 1], Color32::TRANSPARENT));
    };
    let transform = tiny_skia::Transform::from_translate(width as f32 / 2.0, height as f32 / 2.0)
        .pre_concat(tiny_skia::Transform::from_scale(
            SHAPE_RASTER_SCALE,
            SHAPE_RASTER_SCALE,
        ));

    if let Some(fill) = attrs.fill.filter(|c| !c.is_transparent()) {
        let mut paint = tiny_skia::Paint::default();
        paint.set_color_rgba8(fill.r, fill.g, fill.b, fill.a);
        paint.anti_alias = true;
        pixmap.fill_path(&path, &paint, tiny_skia::FillRule::Winding, transform, None);
    }
    if attrs.stroke_width > 0.0 && !attrs.stroke.is_transparent() {
        let mut paint = tiny_skia::Paint::default();
        paint.set_color_rgba8(attrs.stroke.r, attrs.stroke.g, attrs.stroke.b, attrs.stroke.a);
        paint.anti_alias = true;
        let stroke = tiny_skia::Stroke { width: attrs.stroke_width, ..tiny_skia::Stroke::default() };
        pixmap.stroke_path(&path, &paint, &stroke, transform, None);
    }

    Ok(egui::ColorImage::from_rgba_premultiplied(
        [width as usize, height as usize],
        pixmap.data(),
    ))
}

/// Decode an image source and apply its filter, ready for upload.
fn filtered_image(attrs: &ImageAttrs, gallery: &AssetGallery) -> EditorResult<egui::ColorImage> {
    let (mut rgba, width, height) = render::resolve_rgba(&attrs.source, gallery)?;
    render::apply_filter(&mut rgba, width, height, attrs.filter, attrs.filter_intensity);
    Ok(egui::ColorImage::from_rgba_unmultiplied(
        [width as usize, height as usize],
        &rgba,
    ))
}

fn color_image(source: &crate::scene::ImageSource, gallery: &AssetGallery) -> EditorResult<egui::ColorImage> {
    let (rgba, width, height) = render::resolve_rgba(source, gallery)?;
    Ok(egui::ColorImage::from_rgba_unmultiplied(
        [width as usize, height as usize],
        &rgba,
    ))
}
