mod history;

pub use history::CommandHistory;

use crate::error::EditorResult;
use crate::scene::{
    BackgroundImage, Color, EditableFieldDescriptor, ObjectId, ObjectPatch, RemovedObject,
    ReorderDirection, SceneDocument, SceneObject,
};

/// An invertible document mutation.
///
/// Commands capture whatever they need for an exact inverse while they
/// execute: removals keep the removed objects with their z-indices, updates
/// keep the pre-update snapshot. Re-executing a command after an undo
/// recaptures against the current document, so redo stays exact too.
#[derive(Debug, Clone)]
pub enum Command {
    /// Insert an object at the top of the z-order, optionally registering
    /// an editable-field descriptor with it.
    AddObject {
        object: SceneObject,
        field: Option<EditableFieldDescriptor>,
    },
    /// Remove a batch of objects as a single undoable step.
    RemoveObjects {
        ids: Vec<ObjectId>,
        removed: Vec<RemovedObject>,
    },
    /// Merge a patch into one object.
    ///
    /// `prev` is normally captured at execution. Interactions that mutate
    /// the document live (dragging) pre-fill it with the snapshot taken
    /// when the gesture started, so the whole gesture undoes as one step.
    UpdateObject {
        id: ObjectId,
        patch: ObjectPatch,
        prev: Option<Box<SceneObject>>,
    },
    /// Move an object within the z-order.
    Reorder {
        id: ObjectId,
        direction: ReorderDirection,
        moved: Option<(usize, usize)>,
    },
    /// Replace the background image (`None` removes it).
    SetBackground {
        background: Option<BackgroundImage>,
        prev: Option<Option<BackgroundImage>>,
    },
    /// Swap canvas dimensions and background color in one step.
    ApplyCanvasSettings {
        width: u32,
        height: u32,
        background_color: Color,
        prev: Option<(u32, u32, Color)>,
    },
}

impl Command {
    pub fn add_object(object: SceneObject) -> Self {
        Command::AddObject { object, field: None }
    }

    pub fn remove_objects(ids: Vec<ObjectId>) -> Self {
        Command::RemoveObjects { ids, removed: Vec::new() }
    }

    pub fn update_object(id: ObjectId, patch: ObjectPatch) -> Self {
        Command::UpdateObject { id, patch, prev: None }
    }

    pub fn reorder(id: ObjectId, direction: ReorderDirection) -> Self {
        Command::Reorder { id, direction, moved: None }
    }

    /// Apply the command to the document, capturing undo state.
    pub fn execute(&mut self, doc: &mut SceneDocument) -> EditorResult<()> {
        match self {
            Command::AddObject { object, field } => {
                doc.add_object(object.clone());
                if let Some(descriptor) = field {
                    doc.register_field(descriptor.clone());
                }
            }
            Command::RemoveObjects { ids, removed } => {
                *removed = doc.remove_objects(ids);
            }
            Command::UpdateObject { id, patch, prev } => {
                let captured = doc.update_object(*id, patch);
                if prev.is_none() {
                    *prev = captured.map(Box::new);
                }
            }
            Command::Reorder { id, direction, moved } => {
                *moved = doc.reorder(*id, *direction);
            }
            Command::SetBackground { background, prev } => {
                let old = doc.set_background(background.clone());
                if prev.is_none() {
                    *prev = Some(old);
                }
            }
            Command::ApplyCanvasSettings { width, height, background_color, prev } => {
                let old = doc.apply_canvas_settings(*width, *height, *background_color);
                if prev.is_none() {
                    *prev = Some(old);
                }
            }
        }
        Ok(())
    }

    /// Revert the command using the state captured at execution.
    pub fn undo(&self, doc: &mut SceneDocument) {
        match self {
            Command::AddObject { object, .. } => {
                doc.remove_object(object.id);
            }
            Command::RemoveObjects { removed, .. } => {
                // Unwind in reverse capture order; each index is then valid
                // against the document it was captured from
                for entry in removed.iter().rev() {
                    doc.restore_object(entry.clone());
                }
            }
            Command::UpdateObject { id, prev, .. } => {
                if let (Some(prev), Some(object)) = (prev, doc.object_mut(*id)) {
                    *object = prev.as_ref().clone();
                }
            }
            Command::Reorder { id, moved, .. } => {
                if let Some((from, _)) = moved {
                    doc.move_object_to(*id, *from);
                }
            }
            Command::SetBackground { prev, .. } => {
                if let Some(prev) = prev {
                    doc.set_background(prev.clone());
                }
            }
            Command::ApplyCanvasSettings { prev, .. } => {
                if let Some((width, height, color)) = prev {
                    doc.apply_canvas_settings(*width, *height, *color);
                }
            }
        }
    }

    /// Whether executing this command changed the document. No-ops (removing
    /// nothing, patching an unknown object, reordering the frontmost object
    /// frontward) stay out of the history.
    pub fn can_undo(&self) -> bool {
        match self {
            Command::AddObject { .. } => true,
            Command::RemoveObjects { removed, .. } => !removed.is_empty(),
            Command::UpdateObject { prev, .. } => prev.is_some(),
            Command::Reorder { moved, .. } => moved.is_some(),
            Command::SetBackground { prev, .. } => prev.is_some(),
            Command::ApplyCanvasSettings { prev, .. } => prev.is_some(),
        }
    }
}
