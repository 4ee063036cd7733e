pub mod color;
pub mod object;
pub mod shape;

use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};

pub use color::Color;
pub use object::{
    AssetId, FieldId, FontStyle, FontWeight, HAnchor, ImageAttrs, ImageFilterKind, ImagePatch,
    ImageSource, KindPatch, LockFlags, ObjectId, ObjectKind, ObjectPatch, SceneObject, ShapeAttrs,
    ShapePatch, TextAlign, TextAttrs, TextPatch, VAnchor, DEFAULT_FONT_FAMILY, TEXT_PLACEHOLDER,
};
pub use shape::ShapeKind;

pub const DEFAULT_CANVAS_WIDTH: u32 = 800;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 600;

/// How a background image is fitted to the canvas before the user's
/// percentage adjustment is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Scale up until both canvas dimensions are covered.
    Cover,
    /// Scale down until the whole image is visible.
    Contain,
    /// Per-axis scale to exactly the canvas bounds. Used for the customer
    /// preview backdrop; never written to stored documents.
    Stretch,
}

impl Default for FitMode {
    fn default() -> Self {
        FitMode::Cover
    }
}

impl FitMode {
    pub fn label(&self) -> &'static str {
        match self {
            FitMode::Cover => "Cover",
            FitMode::Contain => "Contain",
            FitMode::Stretch => "Stretch",
        }
    }
}

/// Uniform scale that fits `natural` into `canvas` under the given mode.
pub fn fit_scale(mode: FitMode, natural: Vec2, canvas: Vec2) -> f32 {
    let w = natural.x.max(1.0);
    let h = natural.y.max(1.0);
    match mode {
        FitMode::Cover => (canvas.x / w).max(canvas.y / h),
        FitMode::Contain => (canvas.x / w).min(canvas.y / h),
        // Not uniform; callers use applied_scale for the per-axis form
        FitMode::Stretch => (canvas.x / w).max(canvas.y / h),
    }
}

/// The canvas background image. Fit mode and percentage are stored; the
/// applied scale is always derived from the current canvas dimensions, so
/// canvas resizes pick it up without a rewrite pass.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundImage {
    pub source: ImageSource,
    pub natural_size: Vec2,
    pub fit: FitMode,
    /// User adjustment, 50..=150 percent.
    pub scale_pct: f32,
}

impl BackgroundImage {
    pub fn applied_scale(&self, canvas: Vec2) -> Vec2 {
        let pct = self.scale_pct / 100.0;
        match self.fit {
            FitMode::Stretch => Vec2::new(
                canvas.x / self.natural_size.x.max(1.0),
                canvas.y / self.natural_size.y.max(1.0),
            ),
            mode => Vec2::splat(fit_scale(mode, self.natural_size, canvas) * pct),
        }
    }
}

/// Registration of a text object the customer may edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditableFieldDescriptor {
    pub id: FieldId,
    pub kind: FieldKind,
    pub default_content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
}

/// Everything captured when an object leaves the document, enough to put it
/// back exactly where it was.
#[derive(Debug, Clone)]
pub struct RemovedObject {
    pub index: usize,
    pub object: SceneObject,
    /// Field registration the object carried, with its registry position.
    pub field: Option<(usize, EditableFieldDescriptor)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderDirection {
    Front,
    Back,
    Forward,
    Backward,
}

/// The canonical document: canvas dimensions, background, objects in
/// z-order (index 0 paints first) and the editable-field registry.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDocument {
    pub width: u32,
    pub height: u32,
    pub background_color: Color,
    pub background: Option<BackgroundImage>,
    objects: Vec<SceneObject>,
    editable_fields: Vec<EditableFieldDescriptor>,
}

impl Default for SceneDocument {
    fn default() -> Self {
        Self::new(DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT)
    }
}

impl SceneDocument {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            background_color: Color::WHITE,
            background: None,
            objects: Vec::new(),
            editable_fields: Vec::new(),
        }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    pub fn center(&self) -> Pos2 {
        Pos2::new(self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    pub fn object_index(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| o.id == id)
    }

    /// Insert at the top of the z-order, returning the object's id.
    pub fn add_object(&mut self, object: SceneObject) -> ObjectId {
        let id = object.id;
        self.objects.push(object);
        id
    }

    /// Reinsert a previously removed object at its old position.
    pub fn restore_object(&mut self, removed: RemovedObject) {
        let index = removed.index.min(self.objects.len());
        self.objects.insert(index, removed.object);
        if let Some((field_index, descriptor)) = removed.field {
            let field_index = field_index.min(self.editable_fields.len());
            self.editable_fields.insert(field_index, descriptor);
        }
    }

    /// Remove an object, capturing what is needed to restore it. Unknown
    /// ids are a no-op.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<RemovedObject> {
        let Some(index) = self.object_index(id) else {
            log::debug!("remove_object: no object {id}");
            return None;
        };
        let object = self.objects.remove(index);
        let field = object.field_id.as_ref().and_then(|field_id| {
            let pos = self.editable_fields.iter().position(|f| &f.id == field_id)?;
            Some((pos, self.editable_fields.remove(pos)))
        });
        Some(RemovedObject { index, object, field })
    }

    /// Remove several objects as one step. Ids that are not present are
    /// skipped. Each entry's index is captured against the document as it
    /// stood at that removal, so restores must replay them in reverse.
    pub fn remove_objects(&mut self, ids: &[ObjectId]) -> Vec<RemovedObject> {
        ids.iter().filter_map(|&id| self.remove_object(id)).collect()
    }

    /// Merge a patch into an object, returning the pre-update snapshot.
    ///
    /// Unknown ids and kind-mismatched patches are no-ops (diagnostic
    /// only). The object's locks filter the patch: the movement lock drops
    /// placement fields, the content lock drops attribute and opacity
    /// fields. A patch that loses everything to the locks reports `None`.
    pub fn update_object(&mut self, id: ObjectId, patch: &ObjectPatch) -> Option<SceneObject> {
        let Some(index) = self.object_index(id) else {
            log::debug!("update_object: no object {id}");
            return None;
        };
        let object = &mut self.objects[index];

        let mut patch = patch.clone();
        if patch.touches_placement() && !object.locks.movable {
            log::debug!("update_object: {id} is movement-locked, dropping placement fields");
            patch.position = None;
            patch.scale = None;
            patch.rotation_degrees = None;
        }
        if !object.locks.content_editable && (patch.kind.is_some() || patch.opacity.is_some()) {
            log::debug!("update_object: {id} is content-locked, dropping content fields");
            patch.kind = None;
            patch.opacity = None;
        }
        if patch.is_empty() {
            return None;
        }

        let prev = object.clone();
        if !patch.apply_to(object) {
            log::debug!("update_object: patch kind does not match object {id}");
            return None;
        }
        Some(prev)
    }

    /// Move an object within the z-order. Returns the (from, to) indices,
    /// or `None` when the move would not change anything.
    pub fn reorder(&mut self, id: ObjectId, direction: ReorderDirection) -> Option<(usize, usize)> {
        let Some(from) = self.object_index(id) else {
            log::debug!("reorder: no object {id}");
            return None;
        };
        let top = self.objects.len() - 1;
        let to = match direction {
            ReorderDirection::Front => top,
            ReorderDirection::Back => 0,
            ReorderDirection::Forward => (from + 1).min(top),
            ReorderDirection::Backward => from.saturating_sub(1),
        };
        if to == from {
            return None;
        }
        let object = self.objects.remove(from);
        self.objects.insert(to, object);
        Some((from, to))
    }

    /// Used by undo to put an object back at an exact index.
    pub fn move_object_to(&mut self, id: ObjectId, index: usize) {
        if let Some(from) = self.object_index(id) {
            let object = self.objects.remove(from);
            self.objects.insert(index.min(self.objects.len()), object);
        }
    }

    pub fn editable_fields(&self) -> &[EditableFieldDescriptor] {
        &self.editable_fields
    }

    pub fn has_field(&self, id: &FieldId) -> bool {
        self.editable_fields.iter().any(|f| &f.id == id)
    }

    pub fn register_field(&mut self, descriptor: EditableFieldDescriptor) {
        if !self.has_field(&descriptor.id) {
            self.editable_fields.push(descriptor);
        }
    }

    /// Swap the canvas settings in one step, returning the previous values.
    pub fn apply_canvas_settings(
        &mut self,
        width: u32,
        height: u32,
        background_color: Color,
    ) -> (u32, u32, Color) {
        let prev = (self.width, self.height, self.background_color);
        self.width = width;
        self.height = height;
        self.background_color = background_color;
        prev
    }

    pub fn set_background(&mut self, background: Option<BackgroundImage>) -> Option<BackgroundImage> {
        std::mem::replace(&mut self.background, background)
    }

    /// Customization lock pass: field-backed text keeps selection and text
    /// editing but cannot move; every other object is frozen entirely.
    pub fn apply_public_locks(&mut self) {
        for object in &mut self.objects {
            object.locks = if object.is_editable_field() {
                LockFlags::pinned_editable()
            } else {
                LockFlags::frozen()
            };
        }
    }

    /// Drop stored locks from field objects. Stored movement locks are an
    /// artifact of public sessions and never bind the template's author.
    pub fn clear_field_locks(&mut self) {
        for object in &mut self.objects {
            if object.field_id.is_some() {
                object.locks = LockFlags::default();
            }
        }
    }

    /// Font families referenced by text objects, deduplicated.
    pub fn referenced_fonts(&self) -> Vec<String> {
        let mut fonts: Vec<String> = Vec::new();
        for object in &self.objects {
            if let ObjectKind::Text(attrs) = &object.kind {
                if !fonts.iter().any(|f| f == &attrs.font_family) {
                    fonts.push(attrs.font_family.clone());
                }
            }
        }
        fonts
    }
}
