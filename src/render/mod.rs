//! CPU flatten of a document into raster pixels.
//!
//! The interactive canvas paints through egui; exports and save previews
//! instead composite every layer into a tiny-skia pixmap so the output is
//! identical on every machine, GPU or not. Layer order follows the document:
//! background color, background image, then objects bottom to top.

pub mod text;

use base64::Engine as _;
use egui::Vec2;
use tiny_skia::{
    FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform,
};

use crate::assets::fonts::SharedFontLibrary;
use crate::assets::AssetGallery;
use crate::error::{EditorError, EditorResult};
use crate::scene::{
    fit_scale, BackgroundImage, Color, FitMode, FontStyle, ImageAttrs, ImageFilterKind,
    ImageSource, ObjectKind, SceneDocument, SceneObject, ShapeAttrs, ShapeKind, TextAttrs,
};

/// Horizontal skew applied to synthetic italics. Negative leans the top of
/// the glyph block to the right in y-down pixel space.
const ITALIC_SKEW: f32 = -0.21;

/// Box-blur radius in pixels at full filter intensity.
const MAX_BLUR_RADIUS: f32 = 8.0;

/// Rasterize the document at its canvas resolution.
///
/// Per-object failures (a gallery asset that was removed, an undecodable
/// embedded image) skip that object with a diagnostic rather than failing
/// the whole export.
pub fn flatten(
    doc: &SceneDocument,
    fonts: &SharedFontLibrary,
    gallery: &AssetGallery,
) -> EditorResult<Pixmap> {
    let mut pixmap = Pixmap::new(doc.width, doc.height).ok_or_else(|| EditorError::ResourceLoad {
        what: "render target".to_owned(),
        detail: format!("cannot allocate a {}x{} surface", doc.width, doc.height),
    })?;

    if !doc.background_color.is_transparent() {
        let c = doc.background_color;
        pixmap.fill(tiny_skia::Color::from_rgba8(c.r, c.g, c.b, c.a));
    }
    if let Some(background) = &doc.background {
        draw_background(&mut pixmap, background, doc.size(), gallery);
    }
    for object in doc.objects() {
        draw_object(&mut pixmap, object, fonts, gallery);
    }
    Ok(pixmap)
}

/// [`flatten`], PNG-encoded.
pub fn flatten_png(
    doc: &SceneDocument,
    fonts: &SharedFontLibrary,
    gallery: &AssetGallery,
) -> EditorResult<Vec<u8>> {
    let pixmap = flatten(doc, fonts, gallery)?;
    pixmap.encode_png().map_err(|err| EditorError::ResourceLoad {
        what: "png encoder".to_owned(),
        detail: err.to_string(),
    })
}

fn draw_object(
    pixmap: &mut Pixmap,
    object: &SceneObject,
    fonts: &SharedFontLibrary,
    gallery: &AssetGallery,
) {
    if object.opacity <= 0.0 {
        return;
    }
    match &object.kind {
        ObjectKind::Text(attrs) => draw_text(pixmap, object, attrs, fonts),
        ObjectKind::Shape(attrs) => draw_shape(pixmap, object, attrs),
        ObjectKind::Image(attrs) => draw_image(pixmap, object, attrs, gallery),
    }
}

/// Canvas transform for an object's local, origin-centered coordinates.
fn object_transform(object: &SceneObject, local_size: Vec2) -> Transform {
    let scaled = Vec2::new(
        local_size.x * object.scale.x,
        local_size.y * object.scale.y,
    );
    let center = object.center_for(scaled);
    Transform::from_translate(center.x, center.y)
        .pre_concat(Transform::from_rotate(object.rotation_degrees))
        .pre_concat(Transform::from_scale(object.scale.x, object.scale.y))
}

fn draw_shape(pixmap: &mut Pixmap, object: &SceneObject, attrs: &ShapeAttrs) {
    let Some(path) = shape_path(&attrs.kind) else {
        return;
    };
    let transform = object_transform(object, attrs.kind.local_bounds().size());

    // A line has no interior; everything else fills then strokes
    if !matches!(attrs.kind, ShapeKind::Line { .. }) {
        if let Some(fill) = attrs.fill.filter(|c| !c.is_transparent()) {
            pixmap.fill_path(
                &path,
                &solid_paint(fill, object.opacity),
                FillRule::Winding,
                transform,
                None,
            );
        }
    }
    if attrs.stroke_width > 0.0 && !attrs.stroke.is_transparent() {
        let stroke = Stroke { width: attrs.stroke_width, ..Stroke::default() };
        pixmap.stroke_path(
            &path,
            &solid_paint(attrs.stroke, object.opacity),
            &stroke,
            transform,
            None,
        );
    }
}

/// Local-space path for a shape, centered on the origin. The parametric
/// kinds use the same flattened outlines the hit-tester walks, so painted
/// and clickable geometry agree exactly.
pub(crate) fn shape_path(kind: &ShapeKind) -> Option<tiny_skia::Path> {
    match *kind {
        ShapeKind::Rect { width, height } => {
            let rect = tiny_skia::Rect::from_xywh(-width / 2.0, -height / 2.0, width, height)?;
            Some(PathBuilder::from_rect(rect))
        }
        ShapeKind::Circle { radius } => PathBuilder::from_circle(0.0, 0.0, radius),
        ShapeKind::Triangle { width, height } => {
            let mut pb = PathBuilder::new();
            pb.move_to(0.0, -height / 2.0);
            pb.line_to(width / 2.0, height / 2.0);
            pb.line_to(-width / 2.0, height / 2.0);
            pb.close();
            pb.finish()
        }
        ShapeKind::Line { length } => {
            let mut pb = PathBuilder::new();
            pb.move_to(-length / 2.0, 0.0);
            pb.line_to(length / 2.0, 0.0);
            pb.finish()
        }
        ShapeKind::Polygon | ShapeKind::Star | ShapeKind::Heart => {
            outline_path(kind.fixed_outline()?)
        }
    }
}

fn outline_path(points: &[egui::Pos2]) -> Option<tiny_skia::Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x, first.y);
    for point in rest {
        pb.line_to(point.x, point.y);
    }
    pb.close();
    pb.finish()
}

fn draw_text(
    pixmap: &mut Pixmap,
    object: &SceneObject,
    attrs: &TextAttrs,
    fonts: &SharedFontLibrary,
) {
    let Some(face) = fonts.face_for(&attrs.font_family) else {
        log::warn!(
            "No face available for {:?}; skipping text object {}",
            attrs.font_family,
            object.id
        );
        return;
    };
    let Some((block, layout)) = text::rasterize_text(&face, attrs) else {
        return;
    };

    let mut transform = object_transform(object, layout.size);
    if attrs.style == FontStyle::Italic {
        transform = transform.pre_concat(Transform::from_skew(ITALIC_SKEW, 0.0));
    }
    // The block is padded symmetrically, so its center is the layout center
    transform = transform.pre_concat(Transform::from_translate(
        -(block.width() as f32) / 2.0,
        -(block.height() as f32) / 2.0,
    ));

    let paint = PixmapPaint {
        opacity: object.opacity,
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    pixmap.draw_pixmap(0, 0, block.as_ref(), &paint, transform, None);
}

fn draw_image(
    pixmap: &mut Pixmap,
    object: &SceneObject,
    attrs: &ImageAttrs,
    gallery: &AssetGallery,
) {
    let (mut rgba, width, height) = match resolve_rgba(&attrs.source, gallery) {
        Ok(resolved) => resolved,
        Err(err) => {
            log::warn!("Skipping image object {}: {err}", object.id);
            return;
        }
    };
    apply_filter(&mut rgba, width, height, attrs.filter, attrs.filter_intensity);
    let Some(source) = pixmap_from_rgba(rgba, width, height) else {
        return;
    };

    let natural = Vec2::new(attrs.natural_size.x.max(1.0), attrs.natural_size.y.max(1.0));
    // Stored documents can disagree with the decoded pixel size; normalize
    // so the drawn bounds stay natural_size times the object scale
    let transform = object_transform(object, natural)
        .pre_concat(Transform::from_scale(
            natural.x / width.max(1) as f32,
            natural.y / height.max(1) as f32,
        ))
        .pre_concat(Transform::from_translate(
            -(width as f32) / 2.0,
            -(height as f32) / 2.0,
        ));
    let paint = PixmapPaint {
        opacity: object.opacity,
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    pixmap.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);

    if attrs.stroke_width > 0.0 && !attrs.stroke.is_transparent() {
        if let Some(rect) =
            tiny_skia::Rect::from_xywh(-natural.x / 2.0, -natural.y / 2.0, natural.x, natural.y)
        {
            let border = PathBuilder::from_rect(rect);
            let stroke = Stroke { width: attrs.stroke_width, ..Stroke::default() };
            pixmap.stroke_path(
                &border,
                &solid_paint(attrs.stroke, object.opacity),
                &stroke,
                object_transform(object, natural),
                None,
            );
        }
    }
}

fn draw_background(
    pixmap: &mut Pixmap,
    background: &BackgroundImage,
    canvas: Vec2,
    gallery: &AssetGallery,
) {
    let (rgba, width, height) = match resolve_rgba(&background.source, gallery) {
        Ok(resolved) => resolved,
        Err(err) => {
            log::warn!("Skipping background image: {err}");
            return;
        }
    };
    let Some(source) = pixmap_from_rgba(rgba, width, height) else {
        return;
    };

    // Scale against the decoded dimensions rather than the recorded natural
    // size, so a stale record still fills the canvas correctly
    let decoded = Vec2::new(width.max(1) as f32, height.max(1) as f32);
    let scale = match background.fit {
        FitMode::Stretch => Vec2::new(canvas.x / decoded.x, canvas.y / decoded.y),
        mode => Vec2::splat(fit_scale(mode, decoded, canvas) * background.scale_pct / 100.0),
    };
    let transform = Transform::from_translate(canvas.x / 2.0, canvas.y / 2.0)
        .pre_concat(Transform::from_scale(scale.x, scale.y))
        .pre_concat(Transform::from_translate(-decoded.x / 2.0, -decoded.y / 2.0));
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    pixmap.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
}

fn solid_paint(color: Color, opacity: f32) -> Paint<'static> {
    let alpha = (color.a as f32 * opacity.clamp(0.0, 1.0)).round() as u8;
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, alpha);
    paint.anti_alias = true;
    paint
}

/// Straight-alpha RGBA pixels for an image source.
pub(crate) fn resolve_rgba(
    source: &ImageSource,
    gallery: &AssetGallery,
) -> EditorResult<(Vec<u8>, u32, u32)> {
    match source {
        ImageSource::Asset(id) => {
            let record = gallery.get(*id).ok_or_else(|| EditorError::ResourceLoad {
                what: "gallery asset".to_owned(),
                detail: format!("asset {id} is no longer in the gallery"),
            })?;
            Ok((record.rgba.clone(), record.width, record.height))
        }
        ImageSource::DataUrl(url) => decode_data_url(url),
    }
}

/// Decode a `data:<mime>;base64,<payload>` URL into straight-alpha RGBA.
pub(crate) fn decode_data_url(url: &str) -> EditorResult<(Vec<u8>, u32, u32)> {
    let (_, payload) = url.split_once(";base64,").ok_or(EditorError::Parse {
        context: "data url",
        detail: "missing base64 payload".to_owned(),
    })?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|err| EditorError::Parse {
            context: "data url",
            detail: err.to_string(),
        })?;
    let decoded = image::load_from_memory(&bytes).map_err(|err| EditorError::ResourceLoad {
        what: "embedded image".to_owned(),
        detail: err.to_string(),
    })?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok((rgba.into_raw(), width, height))
}

/// Premultiply straight-alpha RGBA into a tiny-skia pixmap.
fn pixmap_from_rgba(mut rgba: Vec<u8>, width: u32, height: u32) -> Option<Pixmap> {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u32;
        if a < 255 {
            px[0] = (px[0] as u32 * a / 255) as u8;
            px[1] = (px[1] as u32 * a / 255) as u8;
            px[2] = (px[2] as u32 * a / 255) as u8;
        }
    }
    Pixmap::from_vec(rgba, tiny_skia::IntSize::from_wh(width, height)?)
}

/// Apply an image filter in place on straight-alpha RGBA pixels.
pub(crate) fn apply_filter(
    rgba: &mut [u8],
    width: u32,
    height: u32,
    filter: ImageFilterKind,
    intensity: f32,
) {
    match filter {
        ImageFilterKind::None => {}
        ImageFilterKind::Grayscale => {
            for px in rgba.chunks_exact_mut(4) {
                let value = ((px[0] as u32 + px[1] as u32 + px[2] as u32) / 3) as u8;
                px[0] = value;
                px[1] = value;
                px[2] = value;
            }
        }
        ImageFilterKind::Sepia => {
            for px in rgba.chunks_exact_mut(4) {
                let (r, g, b) = (px[0] as f32, px[1] as f32, px[2] as f32);
                px[0] = (0.393 * r + 0.769 * g + 0.189 * b).min(255.0) as u8;
                px[1] = (0.349 * r + 0.686 * g + 0.168 * b).min(255.0) as u8;
                px[2] = (0.272 * r + 0.534 * g + 0.131 * b).min(255.0) as u8;
            }
        }
        ImageFilterKind::Invert => {
            for px in rgba.chunks_exact_mut(4) {
                px[0] = 255 - px[0];
                px[1] = 255 - px[1];
                px[2] = 255 - px[2];
            }
        }
        ImageFilterKind::Blur => {
            let radius = (intensity.clamp(0.0, 1.0) * MAX_BLUR_RADIUS).round() as usize;
            box_blur(rgba, width as usize, height as usize, radius);
        }
        ImageFilterKind::Brightness => {
            // Intensity 0.5 is neutral, matching the stored -1..=1 range
            let delta = ((intensity.clamp(0.0, 1.0) * 2.0 - 1.0) * 255.0).round() as i32;
            for px in rgba.chunks_exact_mut(4) {
                px[0] = (px[0] as i32 + delta).clamp(0, 255) as u8;
                px[1] = (px[1] as i32 + delta).clamp(0, 255) as u8;
                px[2] = (px[2] as i32 + delta).clamp(0, 255) as u8;
            }
        }
    }
}

/// Two-pass box blur with edge-truncated windows.
fn box_blur(rgba: &mut [u8], width: usize, height: usize, radius: usize) {
    if radius == 0 || width == 0 || height == 0 {
        return;
    }
    let mut scratch = vec![0u8; rgba.len()];
    for y in 0..height {
        blur_line(rgba, &mut scratch, width, 4, y * width * 4, radius);
    }
    for x in 0..width {
        blur_line(&scratch, rgba, height, width * 4, x * 4, radius);
    }
}

/// Sliding-window average along one axis. `stride` is the byte distance
/// between successive pixels of the line starting at `base`.
fn blur_line(src: &[u8], dst: &mut [u8], len: usize, stride: usize, base: usize, radius: usize) {
    let mut sum = [0u32; 4];
    let mut count = 0u32;
    for k in 0..=radius.min(len - 1) {
        let p = base + k * stride;
        for c in 0..4 {
            sum[c] += src[p + c] as u32;
        }
        count += 1;
    }
    for j in 0..len {
        let p = base + j * stride;
        for c in 0..4 {
            dst[p + c] = (sum[c] / count) as u8;
        }
        let entering = j + radius + 1;
        if entering < len {
            let p = base + entering * stride;
            for c in 0..4 {
                sum[c] += src[p + c] as u32;
            }
            count += 1;
        }
        if j >= radius {
            let p = base + (j - radius) * stride;
            for c in 0..4 {
                sum[c] -= src[p + c] as u32;
            }
            count -= 1;
        }
    }
}
