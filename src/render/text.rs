//! CPU text layout and rasterization over fontdue faces.
//!
//! The interactive canvas shapes text through egui's galley machinery; this
//! module exists for the flatten path, where every glyph is rasterized into
//! the export pixmap without a GPU or a text atlas in sight.

use egui::Vec2;
use tiny_skia::Pixmap;

use crate::scene::{Color, FontWeight, TextAlign, TextAttrs};

/// Transparent margin around the rasterized block so bearings and synthetic
/// bold strikes never clip at the pixmap edge.
const GLYPH_PAD: f32 = 2.0;

/// Baseline-to-underline gap as a fraction of the font size.
const UNDERLINE_DROP: f32 = 0.08;

pub struct LaidLine {
    pub text: String,
    pub width: f32,
}

/// Measured text block: one entry per `\n`-separated line, plus the metrics
/// needed to place baselines.
pub struct TextLayout {
    pub lines: Vec<LaidLine>,
    /// Tight block size in local (unscaled) pixels.
    pub size: Vec2,
    /// Baseline-to-baseline distance: font size times the line-height factor.
    pub line_advance: f32,
    pub ascent: f32,
}

/// Lay out the text content without rasterizing anything.
pub fn layout_text(face: &fontdue::Font, attrs: &TextAttrs) -> TextLayout {
    let spacing = attrs.letter_spacing_px();
    let mut lines = Vec::new();
    let mut max_width = 0.0_f32;
    for raw in attrs.content.split('\n') {
        let width = line_width(face, raw, attrs.font_size, spacing);
        max_width = max_width.max(width);
        lines.push(LaidLine { text: raw.to_owned(), width });
    }

    let ascent = face
        .horizontal_line_metrics(attrs.font_size)
        .map(|m| m.ascent)
        .unwrap_or(attrs.font_size * 0.8);
    let line_advance = attrs.font_size * attrs.line_height.max(0.1);
    let height = line_advance * lines.len().max(1) as f32;

    TextLayout {
        lines,
        size: Vec2::new(max_width, height),
        line_advance,
        ascent,
    }
}

/// Local bounds of a text object before scale and rotation.
pub fn measure_text(face: &fontdue::Font, attrs: &TextAttrs) -> Vec2 {
    layout_text(face, attrs).size
}

fn line_width(face: &fontdue::Font, text: &str, px: f32, spacing: f32) -> f32 {
    let mut width = 0.0_f32;
    let mut glyphs = 0usize;
    for ch in text.chars() {
        width += face.metrics(ch, px).advance_width + spacing;
        glyphs += 1;
    }
    if glyphs > 0 {
        // No spacing after the final glyph
        width -= spacing;
    }
    width.max(0.0)
}

/// Rasterize the full text block into a fresh premultiplied pixmap. The
/// block is padded by [`GLYPH_PAD`] on every side, so the pixmap center
/// still coincides with the layout center.
pub fn rasterize_text(face: &fontdue::Font, attrs: &TextAttrs) -> Option<(Pixmap, TextLayout)> {
    let layout = layout_text(face, attrs);
    let width = (layout.size.x + GLYPH_PAD * 2.0).ceil().max(1.0) as u32;
    let height = (layout.size.y + GLYPH_PAD * 2.0).ceil().max(1.0) as u32;
    let mut pixmap = Pixmap::new(width, height)?;

    let spacing = attrs.letter_spacing_px();
    // Synthetic bold: strike the glyph again shifted right, heavier with size
    let bold_shift = match attrs.weight {
        FontWeight::Bold => (attrs.font_size / 24.0).round().max(1.0) as i32,
        FontWeight::Normal => 0,
    };

    for (index, line) in layout.lines.iter().enumerate() {
        let baseline = GLYPH_PAD + index as f32 * layout.line_advance + layout.ascent;
        let start_x = GLYPH_PAD
            + match attrs.align {
                TextAlign::Left => 0.0,
                TextAlign::Center => (layout.size.x - line.width) / 2.0,
                TextAlign::Right => layout.size.x - line.width,
            };

        let mut pen = start_x;
        for ch in line.text.chars() {
            let (metrics, coverage) = face.rasterize(ch, attrs.font_size);
            if metrics.width > 0 && metrics.height > 0 {
                let x0 = (pen + metrics.xmin as f32).round() as i32;
                let y0 = baseline.round() as i32 - metrics.ymin - metrics.height as i32;
                blend_glyph(&mut pixmap, x0, y0, &metrics, &coverage, attrs.fill);
                if bold_shift > 0 {
                    blend_glyph(&mut pixmap, x0 + bold_shift, y0, &metrics, &coverage, attrs.fill);
                }
            }
            pen += metrics.advance_width + spacing;
        }

        if attrs.underline && line.width > 0.0 {
            draw_underline(&mut pixmap, start_x, baseline, line.width, attrs);
        }
    }

    Some((pixmap, layout))
}

/// Source-over blend of a coverage bitmap into a premultiplied RGBA pixmap.
fn blend_glyph(
    pixmap: &mut Pixmap,
    x0: i32,
    y0: i32,
    metrics: &fontdue::Metrics,
    coverage: &[u8],
    color: Color,
) {
    let pw = pixmap.width() as i32;
    let ph = pixmap.height() as i32;
    let data = pixmap.data_mut();
    for row in 0..metrics.height {
        let py = y0 + row as i32;
        if py < 0 || py >= ph {
            continue;
        }
        for col in 0..metrics.width {
            let px = x0 + col as i32;
            if px < 0 || px >= pw {
                continue;
            }
            let cov = coverage[row * metrics.width + col] as u32;
            if cov == 0 {
                continue;
            }
            let sa = cov * color.a as u32 / 255;
            let idx = ((py * pw + px) * 4) as usize;
            let inv = 255 - sa;
            data[idx] = (color.r as u32 * sa / 255 + data[idx] as u32 * inv / 255) as u8;
            data[idx + 1] = (color.g as u32 * sa / 255 + data[idx + 1] as u32 * inv / 255) as u8;
            data[idx + 2] = (color.b as u32 * sa / 255 + data[idx + 2] as u32 * inv / 255) as u8;
            data[idx + 3] = (sa + data[idx + 3] as u32 * inv / 255) as u8;
        }
    }
}

fn draw_underline(pixmap: &mut Pixmap, start_x: f32, baseline: f32, width: f32, attrs: &TextAttrs) {
    let thickness = (attrs.font_size / 15.0).max(1.0);
    let Some(rect) = tiny_skia::Rect::from_xywh(
        start_x,
        baseline + attrs.font_size * UNDERLINE_DROP,
        width,
        thickness,
    ) else {
        return;
    };
    let mut paint = tiny_skia::Paint::default();
    paint.set_color_rgba8(attrs.fill.r, attrs.fill.g, attrs.fill.b, attrs.fill.a);
    paint.anti_alias = true;
    pixmap.fill_rect(rect, &paint, tiny_skia::Transform::identity(), None);
}
