//! Insertion tools.
//!
//! Each tool builds a [`Command`] for the session to execute; tools never
//! touch the document directly. Pointer interaction (select, drag, resize)
//! lives with the canvas surface, not here.

use egui::vec2;

use crate::assets::{encode_data_url, validate_image_upload, AssetRecord};
use crate::command::Command;
use crate::error::{EditorError, EditorResult};
use crate::scene::{
    BackgroundImage, Color, EditableFieldDescriptor, FieldId, FieldKind, FitMode, ImageAttrs,
    ImageSource, ObjectKind, SceneDocument, SceneObject, ShapeAttrs, TextAttrs, TEXT_PLACEHOLDER,
};

/// Largest accepted canvas edge, in pixels.
pub const MAX_CANVAS_DIM: u32 = 8192;

/// Which side panel is active and how canvas clicks are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolMode {
    #[default]
    Select,
    Text,
    Shape,
    Image,
    Canvas,
}

impl ToolMode {
    pub const ALL: [ToolMode; 5] = [
        ToolMode::Select,
        ToolMode::Text,
        ToolMode::Shape,
        ToolMode::Image,
        ToolMode::Canvas,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ToolMode::Select => "Select",
            ToolMode::Text => "Text",
            ToolMode::Shape => "Shapes",
            ToolMode::Image => "Images",
            ToolMode::Canvas => "Canvas",
        }
    }

    pub fn is_select(&self) -> bool {
        matches!(self, ToolMode::Select)
    }

    pub fn is_canvas(&self) -> bool {
        matches!(self, ToolMode::Canvas)
    }
}

/// New text box at the canvas center, registered as a customer-editable
/// field. The placeholder doubles as the field's default content.
pub fn place_text(doc: &SceneDocument) -> Command {
    let field_id = FieldId::generate();
    let mut object = SceneObject::new(ObjectKind::Text(TextAttrs::default()), doc.center());
    object.field_id = Some(field_id.clone());
    Command::AddObject {
        object,
        field: Some(EditableFieldDescriptor {
            id: field_id,
            kind: FieldKind::Text,
            default_content: TEXT_PLACEHOLDER.to_owned(),
        }),
    }
}

/// New shape at the canvas center with the style picked in the panel.
pub fn place_shape(doc: &SceneDocument, attrs: ShapeAttrs) -> Command {
    Command::add_object(SceneObject::new(ObjectKind::Shape(attrs), doc.center()))
}

/// Place a gallery image at the canvas center, scaled down so it covers at
/// most half the canvas in each direction. The object carries its own copy
/// of the pixels, so removing the gallery entry later does not break it.
pub fn place_image(doc: &SceneDocument, record: &AssetRecord) -> Command {
    let natural = vec2(record.width as f32, record.height as f32);
    let canvas = doc.size();
    let factor = (canvas.x * 0.5 / natural.x)
        .min(canvas.y * 0.5 / natural.y)
        .min(1.0);

    let source = if record.bytes.is_empty() {
        ImageSource::Asset(record.id)
    } else {
        ImageSource::DataUrl(record.data_url())
    };
    let mut object = SceneObject::new(
        ObjectKind::Image(ImageAttrs::new(source, natural)),
        doc.center(),
    );
    object.scale = vec2(factor, factor);
    Command::add_object(object)
}

/// Validate an upload and turn it into a background-image command.
pub fn set_background_from_upload(
    name: &str,
    bytes: Vec<u8>,
    fit: FitMode,
    scale_pct: f32,
) -> EditorResult<Command> {
    let upload = validate_image_upload(name, &bytes)?;
    let background = BackgroundImage {
        source: ImageSource::DataUrl(encode_data_url(upload.mime, &bytes)),
        natural_size: vec2(upload.width as f32, upload.height as f32),
        fit,
        scale_pct: scale_pct.clamp(50.0, 150.0),
    };
    Ok(Command::SetBackground {
        background: Some(background),
        prev: None,
    })
}

pub fn remove_background() -> Command {
    Command::SetBackground {
        background: None,
        prev: None,
    }
}

/// Text-field edit state for the canvas settings panel. Dimensions stay as
/// strings until applied so partial input never bounces.
#[derive(Debug, Clone)]
pub struct CanvasSettingsDraft {
    pub width: String,
    pub height: String,
    pub background_color: Color,
}

impl CanvasSettingsDraft {
    pub fn from_document(doc: &SceneDocument) -> Self {
        Self {
            width: doc.width.to_string(),
            height: doc.height.to_string(),
            background_color: doc.background_color,
        }
    }

    pub fn to_command(&self) -> EditorResult<Command> {
        let width = parse_dimension("width", &self.width)?;
        let height = parse_dimension("height", &self.height)?;
        Ok(Command::ApplyCanvasSettings {
            width,
            height,
            background_color: self.background_color,
            prev: None,
        })
    }
}

fn parse_dimension(which: &str, raw: &str) -> EditorResult<u32> {
    let value: u32 = raw
        .trim()
        .parse()
        .map_err(|_| EditorError::Validation(format!("Canvas {which} must be a whole number")))?;
    if value == 0 || value > MAX_CANVAS_DIM {
        return Err(EditorError::Validation(format!(
            "Canvas {which} must be between 1 and {MAX_CANVAS_DIM}"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::HAnchor;

    #[test]
    fn placed_text_registers_a_field() {
        let mut doc = SceneDocument::default();
        let mut cmd = place_text(&doc);
        cmd.execute(&mut doc).unwrap();

        assert_eq!(doc.objects().len(), 1);
        assert_eq!(doc.editable_fields().len(), 1);
        let object = &doc.objects()[0];
        assert!(object.is_editable_field());
        assert_eq!(object.position, doc.center());
        assert_eq!(object.anchor.0, HAnchor::Center);
    }

    #[test]
    fn placed_image_takes_at_most_half_the_canvas() {
        let doc = SceneDocument::default(); // 800x600
        let record = AssetRecord {
            id: crate::scene::AssetId::new(),
            name: "photo.png".to_owned(),
            width: 2000,
            height: 500,
            rgba: Vec::new(),
            bytes: vec![1],
            mime: "image/png",
        };
        let cmd = place_image(&doc, &record);
        let Command::AddObject { object, .. } = cmd else {
            panic!("expected AddObject");
        };
        // 800*0.5/2000 = 0.2 wins over 600*0.5/500 = 0.6
        assert!((object.scale.x - 0.2).abs() < 1e-6);
        assert_eq!(object.scale.x, object.scale.y);
    }

    #[test]
    fn small_image_is_not_upscaled() {
        let doc = SceneDocument::default();
        let record = AssetRecord {
            id: crate::scene::AssetId::new(),
            name: "icon.png".to_owned(),
            width: 10,
            height: 10,
            rgba: Vec::new(),
            bytes: vec![1],
            mime: "image/png",
        };
        let Command::AddObject { object, .. } = place_image(&doc, &record) else {
            panic!("expected AddObject");
        };
        assert_eq!(object.scale.x, 1.0);
    }

    #[test]
    fn canvas_draft_rejects_bad_dimensions() {
        let mut draft = CanvasSettingsDraft::from_document(&SceneDocument::default());
        draft.width = "0".to_owned();
        assert!(draft.to_command().is_err());
        draft.width = "abc".to_owned();
        assert!(draft.to_command().is_err());
        draft.width = "1200".to_owned();
        assert!(draft.to_command().is_ok());
    }
}
