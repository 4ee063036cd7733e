use std::fmt;

use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::color::Color;
use super::shape::ShapeKind;

/// Stable identity of a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for ObjectId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Links a text object to its editable-field registration. Stored documents
/// from older builds used millisecond timestamps here, so any string is a
/// valid id; new ids are uuid-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(String);

impl FieldId {
    pub fn generate() -> Self {
        Self(format!("text_{}", Uuid::new_v4().simple()))
    }

    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a session-local gallery asset. Never serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetId(Uuid);

impl AssetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Horizontal anchor of an object's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HAnchor {
    Left,
    Center,
    Right,
}

/// Vertical anchor of an object's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VAnchor {
    Top,
    Center,
    Bottom,
}

/// Per-object permission switches. All permissive while authoring; the
/// public lock pass rewrites them before a customer session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockFlags {
    pub selectable: bool,
    pub movable: bool,
    pub content_editable: bool,
}

impl Default for LockFlags {
    fn default() -> Self {
        Self {
            selectable: true,
            movable: true,
            content_editable: true,
        }
    }
}

impl LockFlags {
    /// Everything off: invisible to selection and edits.
    pub fn frozen() -> Self {
        Self {
            selectable: false,
            movable: false,
            content_editable: false,
        }
    }

    /// Content editable in place but pinned to its position.
    pub fn pinned_editable() -> Self {
        Self {
            selectable: true,
            movable: false,
            content_editable: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    Normal,
    Italic,
}

/// Style and content of a text object.
#[derive(Debug, Clone, PartialEq)]
pub struct TextAttrs {
    pub content: String,
    pub font_family: String,
    pub font_size: f32,
    pub fill: Color,
    pub align: TextAlign,
    pub weight: FontWeight,
    pub style: FontStyle,
    pub underline: bool,
    /// Multiplier on the font size.
    pub line_height: f32,
    /// Legacy unit: thousandths of an em.
    pub letter_spacing: f32,
}

pub const TEXT_PLACEHOLDER: &str = "Double click to edit";
pub const DEFAULT_FONT_FAMILY: &str = "Poppins";

impl Default for TextAttrs {
    fn default() -> Self {
        Self {
            content: TEXT_PLACEHOLDER.to_owned(),
            font_family: DEFAULT_FONT_FAMILY.to_owned(),
            font_size: 24.0,
            fill: Color::BLACK,
            align: TextAlign::Left,
            weight: FontWeight::Normal,
            style: FontStyle::Normal,
            underline: false,
            line_height: 1.2,
            letter_spacing: 0.0,
        }
    }
}

impl TextAttrs {
    /// Letter spacing converted to pixels at this font size.
    pub fn letter_spacing_px(&self) -> f32 {
        self.letter_spacing / 1000.0 * self.font_size
    }
}

/// Style of a shape object. `fill: None` renders as a transparent interior
/// while the outline keeps hit-testing by area.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeAttrs {
    pub kind: ShapeKind,
    pub fill: Option<Color>,
    pub stroke: Color,
    pub stroke_width: f32,
}

impl ShapeAttrs {
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            fill: Some(super::shape::DEFAULT_SHAPE_FILL),
            stroke: super::shape::DEFAULT_SHAPE_STROKE,
            stroke_width: super::shape::DEFAULT_STROKE_WIDTH,
        }
    }
}

/// Where an image object's pixels come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// Decoded upload in this session's gallery.
    Asset(AssetId),
    /// Base64 data URI carried by a stored document.
    DataUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFilterKind {
    None,
    Grayscale,
    Sepia,
    Invert,
    Blur,
    Brightness,
}

impl ImageFilterKind {
    pub const ALL: [ImageFilterKind; 6] = [
        ImageFilterKind::None,
        ImageFilterKind::Grayscale,
        ImageFilterKind::Sepia,
        ImageFilterKind::Invert,
        ImageFilterKind::Blur,
        ImageFilterKind::Brightness,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ImageFilterKind::None => "None",
            ImageFilterKind::Grayscale => "Grayscale",
            ImageFilterKind::Sepia => "Sepia",
            ImageFilterKind::Invert => "Invert",
            ImageFilterKind::Blur => "Blur",
            ImageFilterKind::Brightness => "Brightness",
        }
    }

    /// Whether the intensity slider has any effect for this filter.
    pub fn uses_intensity(&self) -> bool {
        matches!(self, ImageFilterKind::Blur | ImageFilterKind::Brightness)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageAttrs {
    pub source: ImageSource,
    pub natural_size: Vec2,
    pub filter: ImageFilterKind,
    /// 0..=1, meaningful for blur and brightness.
    pub filter_intensity: f32,
    pub stroke: Color,
    pub stroke_width: f32,
}

impl ImageAttrs {
    pub fn new(source: ImageSource, natural_size: Vec2) -> Self {
        Self {
            source,
            natural_size,
            filter: ImageFilterKind::None,
            filter_intensity: 0.5,
            stroke: Color::TRANSPARENT,
            stroke_width: 0.0,
        }
    }
}

/// The kind-specific half of a scene object. Every dispatch on object kind
/// is an exhaustive match on this enum.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Text(TextAttrs),
    Shape(ShapeAttrs),
    Image(ImageAttrs),
}

impl ObjectKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ObjectKind::Text(_) => "Text",
            ObjectKind::Shape(_) => "Shape",
            ObjectKind::Image(_) => "Image",
        }
    }

    pub fn as_text(&self) -> Option<&TextAttrs> {
        match self {
            ObjectKind::Text(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn as_shape(&self) -> Option<&ShapeAttrs> {
        match self {
            ObjectKind::Shape(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageAttrs> {
        match self {
            ObjectKind::Image(attrs) => Some(attrs),
            _ => None,
        }
    }
}

/// One object in the document. Position is the location of the anchor point
/// in canvas coordinates; z-order is the object's index in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub id: ObjectId,
    pub position: Pos2,
    pub anchor: (HAnchor, VAnchor),
    pub scale: Vec2,
    pub rotation_degrees: f32,
    pub opacity: f32,
    pub locks: LockFlags,
    /// Present on text objects registered as customer-editable fields.
    pub field_id: Option<FieldId>,
    pub kind: ObjectKind,
}

impl SceneObject {
    pub fn new(kind: ObjectKind, position: Pos2) -> Self {
        Self {
            id: ObjectId::new(),
            position,
            anchor: (HAnchor::Center, VAnchor::Center),
            scale: Vec2::splat(1.0),
            rotation_degrees: 0.0,
            opacity: 1.0,
            locks: LockFlags::default(),
            field_id: None,
            kind,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, ObjectKind::Text(_))
    }

    pub fn is_editable_field(&self) -> bool {
        self.field_id.is_some() && self.is_text()
    }

    /// Center of the object's bounds in canvas coordinates, given the
    /// scaled size of those bounds. Rotation is about the anchor point, so
    /// the anchor-to-center offset rotates with the object.
    pub fn center_for(&self, scaled_size: Vec2) -> Pos2 {
        let off_x = match self.anchor.0 {
            HAnchor::Left => scaled_size.x / 2.0,
            HAnchor::Center => 0.0,
            HAnchor::Right => -scaled_size.x / 2.0,
        };
        let off_y = match self.anchor.1 {
            VAnchor::Top => scaled_size.y / 2.0,
            VAnchor::Center => 0.0,
            VAnchor::Bottom => -scaled_size.y / 2.0,
        };
        let (sin, cos) = self.rotation_degrees.to_radians().sin_cos();
        Pos2::new(
            self.position.x + off_x * cos - off_y * sin,
            self.position.y + off_x * sin + off_y * cos,
        )
    }
}

/// Partial update applied to an object. Only the populated fields change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectPatch {
    pub position: Option<Pos2>,
    pub scale: Option<Vec2>,
    pub rotation_degrees: Option<f32>,
    pub opacity: Option<f32>,
    pub kind: Option<KindPatch>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum KindPatch {
    Text(TextPatch),
    Shape(ShapePatch),
    Image(ImagePatch),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextPatch {
    pub content: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    pub fill: Option<Color>,
    pub align: Option<TextAlign>,
    pub weight: Option<FontWeight>,
    pub style: Option<FontStyle>,
    pub underline: Option<bool>,
    pub line_height: Option<f32>,
    pub letter_spacing: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapePatch {
    pub kind: Option<ShapeKind>,
    /// Outer option: whether to touch the fill; inner: the new fill.
    pub fill: Option<Option<Color>>,
    pub stroke: Option<Color>,
    pub stroke_width: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImagePatch {
    pub filter: Option<ImageFilterKind>,
    pub filter_intensity: Option<f32>,
    pub stroke: Option<Color>,
    pub stroke_width: Option<f32>,
}

impl ObjectPatch {
    pub fn is_empty(&self) -> bool {
        *self == ObjectPatch::default()
    }

    pub fn move_to(position: Pos2) -> Self {
        Self { position: Some(position), ..Default::default() }
    }

    pub fn text(patch: TextPatch) -> Self {
        Self { kind: Some(KindPatch::Text(patch)), ..Default::default() }
    }

    pub fn shape(patch: ShapePatch) -> Self {
        Self { kind: Some(KindPatch::Shape(patch)), ..Default::default() }
    }

    pub fn image(patch: ImagePatch) -> Self {
        Self { kind: Some(KindPatch::Image(patch)), ..Default::default() }
    }

    /// Whether any populated field would alter placement rather than content.
    pub fn touches_placement(&self) -> bool {
        self.position.is_some() || self.scale.is_some() || self.rotation_degrees.is_some()
    }

    /// Merge this patch into an object. Kind-mismatched patches leave the
    /// object untouched and report `false`.
    pub fn apply_to(&self, object: &mut SceneObject) -> bool {
        if let Some(kind_patch) = &self.kind {
            let compatible = matches!(
                (&object.kind, kind_patch),
                (ObjectKind::Text(_), KindPatch::Text(_))
                    | (ObjectKind::Shape(_), KindPatch::Shape(_))
                    | (ObjectKind::Image(_), KindPatch::Image(_))
            );
            if !compatible {
                return false;
            }
        }

        if let Some(position) = self.position {
            object.position = position;
        }
        if let Some(scale) = self.scale {
            object.scale = scale;
        }
        if let Some(rotation) = self.rotation_degrees {
            object.rotation_degrees = rotation;
        }
        if let Some(opacity) = self.opacity {
            object.opacity = opacity.clamp(0.0, 1.0);
        }

        match (&mut object.kind, &self.kind) {
            (ObjectKind::Text(attrs), Some(KindPatch::Text(patch))) => {
                if let Some(content) = &patch.content {
                    attrs.content = content.clone();
                }
                if let Some(family) = &patch.font_family {
                    attrs.font_family = family.clone();
                }
                if let Some(size) = patch.font_size {
                    attrs.font_size = size.max(1.0);
                }
                if let Some(fill) = patch.fill {
                    attrs.fill = fill;
                }
                if let Some(align) = patch.align {
                    attrs.align = align;
                }
                if let Some(weight) = patch.weight {
                    attrs.weight = weight;
                }
                if let Some(style) = patch.style {
                    attrs.style = style;
                }
                if let Some(underline) = patch.underline {
                    attrs.underline = underline;
                }
                if let Some(line_height) = patch.line_height {
                    attrs.line_height = line_height.max(0.1);
                }
                if let Some(spacing) = patch.letter_spacing {
                    attrs.letter_spacing = spacing;
                }
            }
            (ObjectKind::Shape(attrs), Some(KindPatch::Shape(patch))) => {
                if let Some(kind) = patch.kind {
                    attrs.kind = kind;
                }
                if let Some(fill) = patch.fill {
                    attrs.fill = fill;
                }
                if let Some(stroke) = patch.stroke {
                    attrs.stroke = stroke;
                }
                if let Some(width) = patch.stroke_width {
                    attrs.stroke_width = width.max(0.0);
                }
            }
            (ObjectKind::Image(attrs), Some(KindPatch::Image(patch))) => {
                if let Some(filter) = patch.filter {
                    attrs.filter = filter;
                }
                if let Some(intensity) = patch.filter_intensity {
                    attrs.filter_intensity = intensity.clamp(0.0, 1.0);
                }
                if let Some(stroke) = patch.stroke {
                    attrs.stroke = stroke;
                }
                if let Some(width) = patch.stroke_width {
                    attrs.stroke_width = width.max(0.0);
                }
            }
            _ => {}
        }
        true
    }
}
