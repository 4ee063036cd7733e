//! Conversion between the in-memory document and the stored settings
//! payload.
//!
//! Encoding is an explicit projection: wire records carry only the
//! attribute set readers of stored templates rely on, never a full model
//! dump. Decoding is tolerant of everything older builds are known to have
//! written: settings serialized to a string, the nested snapshot serialized
//! to a string inside it, absent dimensions, absent snapshots and malformed
//! object entries. Problems are collected into a [`DecodeReport`] instead
//! of aborting; the caller decides whether warnings are acceptable.

use std::fmt;

use egui::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EditorError, EditorResult};
use crate::scene::{
    color, shape, AssetId, BackgroundImage, Color, EditableFieldDescriptor, FieldId, FieldKind,
    FitMode, FontStyle, FontWeight, HAnchor, ImageAttrs, ImageFilterKind, ImageSource, LockFlags,
    ObjectKind, SceneDocument, SceneObject, ShapeAttrs, ShapeKind, TextAlign, TextAttrs, VAnchor,
};

/// Hard cap on the serialized settings payload, checked before any store
/// transfer is dispatched.
pub const MAX_DOCUMENT_BYTES: usize = 15 * 1024 * 1024;

/// Serialized form of the heart path, kept for readers that consume the
/// raw payload.
const HEART_PATH_DATA: &str = "M 0 -28 C -28 -28 -28 28 0 56 C 28 28 28 -28 0 -28 Z";

/// One recoverable problem found while decoding a stored template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeWarning {
    /// The settings payload arrived as a JSON string and needed a second
    /// parse pass.
    StringEncodedSettings,
    /// The nested scene snapshot arrived as a JSON string.
    StringEncodedSnapshot,
    /// The settings payload could not be parsed at all.
    MalformedSettings(String),
    /// Canvas dimensions were absent or unusable; defaults substituted.
    DefaultedDimensions,
    /// No scene snapshot was stored; an empty canvas was substituted.
    MissingSnapshot,
    /// The scene snapshot could not be parsed; an empty canvas was
    /// substituted.
    MalformedSnapshot(String),
    /// One object entry was skipped.
    SkippedObject { index: usize, detail: String },
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeWarning::StringEncodedSettings => {
                write!(f, "Template settings were stored as text and re-parsed")
            }
            DecodeWarning::StringEncodedSnapshot => {
                write!(f, "Canvas data was stored as text and re-parsed")
            }
            DecodeWarning::MalformedSettings(detail) => {
                write!(f, "Template settings could not be read ({detail}); starting empty")
            }
            DecodeWarning::DefaultedDimensions => {
                write!(f, "Canvas size missing; using 800 x 600")
            }
            DecodeWarning::MissingSnapshot => {
                write!(f, "Template has no canvas data; starting empty")
            }
            DecodeWarning::MalformedSnapshot(detail) => {
                write!(f, "Canvas data could not be read ({detail}); starting empty")
            }
            DecodeWarning::SkippedObject { index, detail } => {
                write!(f, "Skipped unreadable object {index}: {detail}")
            }
        }
    }
}

impl DecodeWarning {
    /// Warnings that mean stored content was lost, not merely re-parsed.
    /// Public sessions refuse templates with any of these.
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            DecodeWarning::StringEncodedSettings | DecodeWarning::StringEncodedSnapshot
        )
    }
}

#[derive(Debug, Default)]
pub struct DecodeReport {
    pub warnings: Vec<DecodeWarning>,
}

impl DecodeReport {
    fn warn(&mut self, warning: DecodeWarning) {
        log::warn!("decode: {warning}");
        self.warnings.push(warning);
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn has_structural_loss(&self) -> bool {
        self.warnings.iter().any(DecodeWarning::is_structural)
    }
}

/// Resolves session-local asset references into a portable `src` string at
/// encode time.
pub trait SourceResolver {
    fn data_url(&self, asset: AssetId) -> Option<String>;
}

/// Resolver for documents that are known to carry no asset references.
pub struct NoAssets;

impl SourceResolver for NoAssets {
    fn data_url(&self, _asset: AssetId) -> Option<String> {
        None
    }
}

// ---------------------------------------------------------------------------
// Wire records (encode side)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TemplateSettings {
    width: u32,
    height: u32,
    #[serde(rename = "canvasJSON")]
    canvas_json: SceneSnapshot,
    editable_fields: Vec<FieldRecord>,
    bg_image_fit: FitMode,
    bg_image_scale: f32,
}

#[derive(Debug, Serialize)]
struct SceneSnapshot {
    version: String,
    objects: Vec<ObjectRecord>,
    background: String,
    #[serde(rename = "backgroundImage", skip_serializing_if = "Option::is_none")]
    background_image: Option<BackgroundRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BackgroundRecord {
    src: String,
    width: f32,
    height: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct FieldRecord {
    id: FieldId,
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "defaultText", default)]
    default_content: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct FilterRecord {
    #[serde(rename = "type")]
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    blur: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    brightness: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PointRecord {
    x: f32,
    y: f32,
}

/// The flat per-object record. Every stored attribute is optional so that
/// partially written entries still decode; unknown extra attributes are
/// ignored. The small enumerated attributes stay raw strings here because
/// older writers used several spellings for them.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ObjectRecord {
    #[serde(rename = "type")]
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field_id: Option<FieldId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    editable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selectable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lock_movement_x: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lock_movement_y: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    font_size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fill: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    opacity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    left: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scale_x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scale_y: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    angle: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin_x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin_y: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stroke_width: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stroke: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text_align: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    font_weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    font_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    underline: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line_height: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    char_spacing: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    radius: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    points: Option<Vec<PointRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filters: Option<Vec<FilterRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    x1: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    y1: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    x2: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    y2: Option<f32>,
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Serialize the document to the settings payload string that is stored
/// with the template.
pub fn encode_settings(doc: &SceneDocument, resolver: &dyn SourceResolver) -> EditorResult<String> {
    let objects = doc
        .objects()
        .iter()
        .map(|object| encode_object(object, resolver))
        .collect();

    let background_image = doc.background.as_ref().and_then(|bg| {
        let src = resolve_src(&bg.source, resolver)?;
        Some(BackgroundRecord {
            src,
            width: bg.natural_size.x,
            height: bg.natural_size.y,
        })
    });

    let settings = TemplateSettings {
        width: doc.width,
        height: doc.height,
        canvas_json: SceneSnapshot {
            version: env!("CARGO_PKG_VERSION").to_owned(),
            objects,
            background: doc.background_color.to_hex_string(),
            background_image,
        },
        editable_fields: doc
            .editable_fields()
            .iter()
            .map(|field| FieldRecord {
                id: field.id.clone(),
                kind: match field.kind {
                    FieldKind::Text => "text".to_owned(),
                },
                default_content: field.default_content.clone(),
            })
            .collect(),
        bg_image_fit: doc
            .background
            .as_ref()
            .map(|bg| bg.fit)
            .unwrap_or_default(),
        bg_image_scale: doc
            .background
            .as_ref()
            .map(|bg| bg.scale_pct)
            .unwrap_or(100.0),
    };

    serde_json::to_string(&settings).map_err(|err| EditorError::Parse {
        context: "settings",
        detail: err.to_string(),
    })
}

/// Reject documents whose serialized form exceeds [`MAX_DOCUMENT_BYTES`].
pub fn ensure_within_cap(serialized: &str) -> EditorResult<()> {
    let len = serialized.len();
    if len > MAX_DOCUMENT_BYTES {
        return Err(EditorError::Validation(format!(
            "Design is too large to save ({:.1} MB, limit {} MB). \
             Remove or shrink embedded images and try again.",
            len as f64 / (1024.0 * 1024.0),
            MAX_DOCUMENT_BYTES / (1024 * 1024),
        )));
    }
    Ok(())
}

fn resolve_src(source: &ImageSource, resolver: &dyn SourceResolver) -> Option<String> {
    match source {
        ImageSource::DataUrl(url) => Some(url.clone()),
        ImageSource::Asset(id) => {
            let url = resolver.data_url(*id);
            if url.is_none() {
                log::warn!("encode: asset {id} is no longer in the gallery, dropping its pixels");
            }
            url
        }
    }
}

fn encode_object(object: &SceneObject, resolver: &dyn SourceResolver) -> ObjectRecord {
    let mut record = ObjectRecord {
        id: Some(object.id.to_string()),
        field_id: object.field_id.clone(),
        editable: Some(object.locks.content_editable),
        selectable: Some(object.locks.selectable),
        lock_movement_x: Some(!object.locks.movable),
        lock_movement_y: Some(!object.locks.movable),
        left: Some(object.position.x),
        top: Some(object.position.y),
        scale_x: Some(object.scale.x),
        scale_y: Some(object.scale.y),
        angle: Some(object.rotation_degrees),
        opacity: Some(object.opacity),
        origin_x: Some(anchor_h_str(object.anchor.0).to_owned()),
        origin_y: Some(anchor_v_str(object.anchor.1).to_owned()),
        ..ObjectRecord::default()
    };

    match &object.kind {
        ObjectKind::Text(attrs) => {
            record.kind = "i-text".to_owned();
            record.text = Some(attrs.content.clone());
            record.font_family = Some(attrs.font_family.clone());
            record.font_size = Some(attrs.font_size);
            record.fill = Some(attrs.fill.to_hex_string());
            record.text_align = Some(align_str(attrs.align).to_owned());
            record.font_weight = Some(
                match attrs.weight {
                    FontWeight::Normal => "normal",
                    FontWeight::Bold => "bold",
                }
                .to_owned(),
            );
            record.font_style = Some(
                match attrs.style {
                    FontStyle::Normal => "normal",
                    FontStyle::Italic => "italic",
                }
                .to_owned(),
            );
            record.underline = Some(attrs.underline);
            record.line_height = Some(attrs.line_height);
            record.char_spacing = Some(attrs.letter_spacing);
        }
        ObjectKind::Shape(attrs) => {
            record.fill = Some(match attrs.fill {
                Some(fill) => fill.to_hex_string(),
                None => Color::TRANSPARENT.to_hex_string(),
            });
            record.stroke = Some(attrs.stroke.to_hex_string());
            record.stroke_width = Some(attrs.stroke_width);
            match attrs.kind {
                ShapeKind::Rect { width, height } => {
                    record.kind = "rect".to_owned();
                    record.width = Some(width);
                    record.height = Some(height);
                }
                ShapeKind::Circle { radius } => {
                    record.kind = "circle".to_owned();
                    record.radius = Some(radius);
                }
                ShapeKind::Triangle { width, height } => {
                    record.kind = "triangle".to_owned();
                    record.width = Some(width);
                    record.height = Some(height);
                }
                ShapeKind::Line { length } => {
                    record.kind = "line".to_owned();
                    record.fill = None;
                    record.x1 = Some(-length / 2.0);
                    record.y1 = Some(0.0);
                    record.x2 = Some(length / 2.0);
                    record.y2 = Some(0.0);
                }
                ShapeKind::Polygon => {
                    record.kind = "polygon".to_owned();
                    record.points = Some(points_of(shape::polygon_outline()));
                }
                ShapeKind::Star => {
                    record.kind = "polygon".to_owned();
                    record.points = Some(points_of(shape::star_outline()));
                }
                ShapeKind::Heart => {
                    record.kind = "path".to_owned();
                    record.path = Some(Value::String(HEART_PATH_DATA.to_owned()));
                }
            }
        }
        ObjectKind::Image(attrs) => {
            record.kind = "image".to_owned();
            record.src = resolve_src(&attrs.source, resolver);
            record.width = Some(attrs.natural_size.x);
            record.height = Some(attrs.natural_size.y);
            if attrs.stroke_width > 0.0 {
                record.stroke = Some(attrs.stroke.to_hex_string());
                record.stroke_width = Some(attrs.stroke_width);
            }
            record.filters = encode_filters(attrs);
        }
    }

    record
}

fn points_of(outline: &[egui::Pos2]) -> Vec<PointRecord> {
    outline.iter().map(|p| PointRecord { x: p.x, y: p.y }).collect()
}

fn encode_filters(attrs: &ImageAttrs) -> Option<Vec<FilterRecord>> {
    let record = match attrs.filter {
        ImageFilterKind::None => return None,
        ImageFilterKind::Grayscale => FilterRecord {
            kind: "Grayscale".to_owned(),
            blur: None,
            brightness: None,
        },
        ImageFilterKind::Sepia => FilterRecord {
            kind: "Sepia".to_owned(),
            blur: None,
            brightness: None,
        },
        ImageFilterKind::Invert => FilterRecord {
            kind: "Invert".to_owned(),
            blur: None,
            brightness: None,
        },
        ImageFilterKind::Blur => FilterRecord {
            kind: "Blur".to_owned(),
            blur: Some(attrs.filter_intensity * 0.5),
            brightness: None,
        },
        ImageFilterKind::Brightness => FilterRecord {
            kind: "Brightness".to_owned(),
            blur: None,
            brightness: Some(attrs.filter_intensity * 2.0 - 1.0),
        },
    };
    Some(vec![record])
}

fn anchor_h_str(anchor: HAnchor) -> &'static str {
    match anchor {
        HAnchor::Left => "left",
        HAnchor::Center => "center",
        HAnchor::Right => "right",
    }
}

fn anchor_v_str(anchor: VAnchor) -> &'static str {
    match anchor {
        VAnchor::Top => "top",
        VAnchor::Center => "center",
        VAnchor::Bottom => "bottom",
    }
}

fn align_str(align: TextAlign) -> &'static str {
    match align {
        TextAlign::Left => "left",
        TextAlign::Center => "center",
        TextAlign::Right => "right",
    }
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Rebuild a document from a stored settings payload.
///
/// Never fails: anything unreadable degrades to defaults and is reported.
pub fn decode_document(settings: &Value) -> (SceneDocument, DecodeReport) {
    let mut report = DecodeReport::default();

    // Pass 1: the whole settings blob may itself be a JSON string.
    let parsed;
    let settings = match settings {
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(value) => {
                report.warn(DecodeWarning::StringEncodedSettings);
                parsed = value;
                &parsed
            }
            Err(err) => {
                report.warn(DecodeWarning::MalformedSettings(err.to_string()));
                return (SceneDocument::default(), report);
            }
        },
        other => other,
    };

    let width = dimension(settings.get("width"));
    let height = dimension(settings.get("height"));
    if width.is_none() || height.is_none() {
        report.warn(DecodeWarning::DefaultedDimensions);
    }
    let mut doc = SceneDocument::new(
        width.unwrap_or(crate::scene::DEFAULT_CANVAS_WIDTH),
        height.unwrap_or(crate::scene::DEFAULT_CANVAS_HEIGHT),
    );

    let bg_fit = match settings.get("bgImageFit").and_then(Value::as_str) {
        Some("contain") => FitMode::Contain,
        _ => FitMode::Cover,
    };
    let bg_scale = settings
        .get("bgImageScale")
        .and_then(Value::as_f64)
        .map(|v| v as f32)
        .unwrap_or(100.0);

    for field in settings
        .get("editableFields")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        match serde_json::from_value::<FieldRecord>(field.clone()) {
            Ok(record) => doc.register_field(EditableFieldDescriptor {
                id: record.id,
                kind: FieldKind::Text,
                default_content: record.default_content,
            }),
            Err(err) => log::debug!("decode: skipping malformed field record: {err}"),
        }
    }

    // Pass 2: the snapshot may also be a JSON string.
    let snapshot_parsed;
    let snapshot = match settings.get("canvasJSON") {
        None | Some(Value::Null) => {
            report.warn(DecodeWarning::MissingSnapshot);
            return (doc, report);
        }
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(value) => {
                report.warn(DecodeWarning::StringEncodedSnapshot);
                snapshot_parsed = value;
                &snapshot_parsed
            }
            Err(err) => {
                report.warn(DecodeWarning::MalformedSnapshot(err.to_string()));
                return (doc, report);
            }
        },
        Some(other) => other,
    };
    if !snapshot.is_object() {
        report.warn(DecodeWarning::MalformedSnapshot("not an object".to_owned()));
        return (doc, report);
    }

    if let Some(background) = snapshot.get("background").and_then(Value::as_str) {
        doc.background_color = color::parse_lenient(background);
    }

    if let Some(bg) = snapshot.get("backgroundImage") {
        match serde_json::from_value::<BackgroundRecord>(bg.clone()) {
            Ok(record) => {
                doc.background = Some(BackgroundImage {
                    source: ImageSource::DataUrl(record.src),
                    natural_size: Vec2::new(record.width.max(1.0), record.height.max(1.0)),
                    fit: bg_fit,
                    scale_pct: bg_scale,
                });
            }
            Err(err) => log::debug!("decode: skipping malformed background image: {err}"),
        }
    }

    for (index, entry) in snapshot
        .get("objects")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .enumerate()
    {
        match decode_object(entry) {
            Ok(object) => {
                doc.add_object(object);
            }
            Err(detail) => report.warn(DecodeWarning::SkippedObject { index, detail }),
        }
    }

    (doc, report)
}

/// Positive integral dimension from whatever representation the writer used.
fn dimension(value: Option<&Value>) -> Option<u32> {
    let value = value?;
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if n >= 1.0 && n <= u32::MAX as f64 {
        Some(n.round() as u32)
    } else {
        None
    }
}

fn decode_object(entry: &Value) -> Result<SceneObject, String> {
    let record: ObjectRecord =
        serde_json::from_value(entry.clone()).map_err(|err| err.to_string())?;

    let kind = match record.kind.as_str() {
        "i-text" | "text" | "textbox" => ObjectKind::Text(TextAttrs {
            content: record.text.clone().unwrap_or_default(),
            font_family: record
                .font_family
                .clone()
                .unwrap_or_else(|| crate::scene::DEFAULT_FONT_FAMILY.to_owned()),
            font_size: record.font_size.unwrap_or(24.0),
            fill: record
                .fill
                .as_deref()
                .map(color::parse_lenient)
                .unwrap_or(Color::BLACK),
            align: match record.text_align.as_deref() {
                Some("center") => TextAlign::Center,
                Some("right") => TextAlign::Right,
                _ => TextAlign::Left,
            },
            weight: match record.font_weight.as_deref() {
                Some("bold") | Some("700") => FontWeight::Bold,
                _ => FontWeight::Normal,
            },
            style: match record.font_style.as_deref() {
                Some("italic") => FontStyle::Italic,
                _ => FontStyle::Normal,
            },
            underline: record.underline.unwrap_or(false),
            line_height: record.line_height.unwrap_or(1.2),
            letter_spacing: record.char_spacing.unwrap_or(0.0),
        }),
        "rect" | "circle" | "triangle" | "line" | "polygon" | "path" => {
            ObjectKind::Shape(decode_shape(&record)?)
        }
        "image" => {
            let src = record.src.clone().ok_or("image entry has no source")?;
            let mut attrs = ImageAttrs::new(
                ImageSource::DataUrl(src),
                Vec2::new(
                    record.width.unwrap_or(100.0).max(1.0),
                    record.height.unwrap_or(100.0).max(1.0),
                ),
            );
            if let Some(stroke) = record.stroke.as_deref() {
                attrs.stroke = color::parse_lenient(stroke);
                attrs.stroke_width = record.stroke_width.unwrap_or(0.0);
            }
            if let Some((filter, intensity)) = decode_filter(record.filters.as_deref()) {
                attrs.filter = filter;
                attrs.filter_intensity = intensity;
            }
            ObjectKind::Image(attrs)
        }
        other => return Err(format!("unknown object type {other:?}")),
    };

    let mut object = SceneObject::new(kind, egui::pos2(
        record.left.unwrap_or(0.0),
        record.top.unwrap_or(0.0),
    ));
    if let Some(id) = record.id.as_deref().and_then(|raw| raw.parse().ok()) {
        object.id = id;
    }
    object.anchor = (
        match record.origin_x.as_deref() {
            Some("center") => HAnchor::Center,
            Some("right") => HAnchor::Right,
            _ => HAnchor::Left,
        },
        match record.origin_y.as_deref() {
            Some("center") => VAnchor::Center,
            Some("bottom") => VAnchor::Bottom,
            _ => VAnchor::Top,
        },
    );
    object.scale = Vec2::new(record.scale_x.unwrap_or(1.0), record.scale_y.unwrap_or(1.0));
    object.rotation_degrees = record.angle.unwrap_or(0.0);
    object.opacity = record.opacity.unwrap_or(1.0).clamp(0.0, 1.0);
    object.locks = LockFlags {
        selectable: record.selectable.unwrap_or(true),
        movable: !(record.lock_movement_x.unwrap_or(false)
            || record.lock_movement_y.unwrap_or(false)),
        content_editable: record.editable.unwrap_or(true),
    };
    object.field_id = record.field_id;

    Ok(object)
}

fn decode_shape(record: &ObjectRecord) -> Result<ShapeAttrs, String> {
    let kind = match record.kind.as_str() {
        "rect" => ShapeKind::Rect {
            width: record.width.unwrap_or(100.0),
            height: record.height.unwrap_or(100.0),
        },
        "circle" => ShapeKind::Circle {
            radius: record.radius.unwrap_or(50.0),
        },
        "triangle" => ShapeKind::Triangle {
            width: record.width.unwrap_or(100.0),
            height: record.height.unwrap_or(100.0),
        },
        "line" => {
            let x1 = record.x1.unwrap_or(0.0);
            let y1 = record.y1.unwrap_or(0.0);
            let x2 = record.x2.unwrap_or(150.0);
            let y2 = record.y2.unwrap_or(0.0);
            ShapeKind::Line {
                length: ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt().max(1.0),
            }
        }
        // The star is the only polygon written with ten vertices
        "polygon" => match record.points.as_ref().map(Vec::len) {
            Some(10) => ShapeKind::Star,
            _ => ShapeKind::Polygon,
        },
        "path" => ShapeKind::Heart,
        other => return Err(format!("unknown shape type {other:?}")),
    };

    let fill = record
        .fill
        .as_deref()
        .map(color::parse_lenient)
        .filter(|c| !c.is_transparent());

    Ok(ShapeAttrs {
        kind,
        fill,
        stroke: record
            .stroke
            .as_deref()
            .map(color::parse_lenient)
            .unwrap_or(Color::BLACK),
        stroke_width: record.stroke_width.unwrap_or(1.0),
    })
}

fn decode_filter(filters: Option<&[FilterRecord]>) -> Option<(ImageFilterKind, f32)> {
    let record = filters?.first()?;
    let filter = match record.kind.as_str() {
        "Grayscale" => (ImageFilterKind::Grayscale, 0.5),
        "Sepia" => (ImageFilterKind::Sepia, 0.5),
        "Invert" => (ImageFilterKind::Invert, 0.5),
        "Blur" => (
            ImageFilterKind::Blur,
            (record.blur.unwrap_or(0.25) / 0.5).clamp(0.0, 1.0),
        ),
        "Brightness" => (
            ImageFilterKind::Brightness,
            ((record.brightness.unwrap_or(0.0) + 1.0) / 2.0).clamp(0.0, 1.0),
        ),
        _ => return None,
    };
    Some(filter)
}
