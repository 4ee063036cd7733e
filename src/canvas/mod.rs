//! The interactive canvas: paints the document through the viewport and
//! turns pointer input into selection changes, drag gestures and in-place
//! text editing.
//!
//! Gestures mutate the document directly while the pointer is down, then
//! land in history as a single undoable step on release.

pub mod draw;
pub mod hit;

use egui::{Context, Key, Pos2, Sense, Ui, Vec2};

use crate::assets::fonts::SharedFontLibrary;
use crate::assets::textures::TextureCache;
use crate::scene::{ObjectId, ObjectKind, ObjectPatch, SceneObject, TextPatch};
use crate::session::EditorSession;
use crate::tools::{self, ToolMode};

use draw::{Handle, ScreenGeometry};

/// Smallest per-axis scale a handle drag can reach.
const MIN_DRAG_SCALE: f32 = 0.05;

/// One drag interaction, from press to release. `before` is the snapshot
/// that becomes the undo state when the gesture commits.
struct DragGesture {
    id: ObjectId,
    mode: DragMode,
    before: SceneObject,
    moved: bool,
}

enum DragMode {
    /// Doc-space offset from the pointer to the object's anchor.
    Move { grab: Vec2 },
    Scale {
        start_center: Pos2,
        start_dist: f32,
        start_scale: Vec2,
    },
    Rotate {
        start_center: Pos2,
        start_angle: f32,
        start_rotation: f32,
    },
}

struct TextEditState {
    id: ObjectId,
    buffer: String,
    before: SceneObject,
}

/// Canvas widget state that outlives a frame.
#[derive(Default)]
pub struct CanvasSurface {
    drag: Option<DragGesture>,
    editing: Option<TextEditState>,
}

impl CanvasSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ui(&mut self, ui: &mut Ui, session: &mut EditorSession, textures: &mut TextureCache) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        session.viewport.set_container(response.rect);
        if session.pending_fit {
            let size = session.document().size();
            session.viewport.zoom_to_fit(size);
            session.pending_fit = false;
        }

        let canvas = session.document().size();
        let zoom = session.viewport.zoom();
        let ctx = ui.ctx().clone();
        let fonts = session.fonts.clone();

        draw::paint_document(
            &painter,
            &session.viewport,
            session.document(),
            &fonts,
            &session.gallery,
            textures,
        );

        // Overlay selected objects; only the primary movable one gets handles
        let mut primary_geometry: Option<(ObjectId, ScreenGeometry)> = None;
        for id in session.selection().to_vec() {
            let Some(object) = session.document().object(id) else {
                continue;
            };
            let local = draw::object_local_size(&ctx, &fonts, zoom, object);
            let geo = draw::geometry(&session.viewport, canvas, object, local);
            if session.primary_selection() == Some(id) && object.locks.movable {
                draw::paint_selection(&painter, &geo);
                primary_geometry = Some((id, geo));
            } else {
                draw::paint_marquee(&painter, &geo);
            }
        }

        let shift = ui.input(|i| i.modifiers.shift);
        if response.drag_started() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.begin_gesture(session, &ctx, &fonts, canvas, zoom, pos, primary_geometry, shift);
            }
        }
        if response.dragged() && response.drag_delta() != Vec2::ZERO {
            if let Some(pos) = response.interact_pointer_pos() {
                self.update_gesture(session, canvas, pos);
            }
        }
        if response.drag_stopped() {
            self.end_gesture(session);
        }
        if response.double_clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.begin_text_edit(session, &ctx, &fonts, canvas, zoom, pos);
            }
        }
        if response.clicked() && !session.is_restricted() {
            self.place_with_tool(session);
        }

        // Delete keys act on the selection unless a text field has focus
        let typing = ui.ctx().memory(|m| m.focused().is_some());
        if !typing
            && self.editing.is_none()
            && !session.selection().is_empty()
            && ui.input(|i| i.key_pressed(Key::Delete) || i.key_pressed(Key::Backspace))
        {
            session.delete_selection();
        }

        self.text_edit_window(&ctx, session);
    }

    #[allow(clippy::too_many_arguments)]
    fn begin_gesture(
        &mut self,
        session: &mut EditorSession,
        ctx: &Context,
        fonts: &SharedFontLibrary,
        canvas: Vec2,
        zoom: f32,
        pos: Pos2,
        primary_geometry: Option<(ObjectId, ScreenGeometry)>,
        shift: bool,
    ) {
        if !session.tool().is_select() {
            return;
        }
        let pointer_doc = session.viewport.screen_to_doc(canvas, pos);

        if let Some((id, geo)) = primary_geometry {
            if let Some(handle) = draw::handle_at(&geo, pos) {
                let Some(object) = session.document().object(id) else {
                    return;
                };
                let local = draw::object_local_size(ctx, fonts, zoom, object);
                let center = object.center_for(local * object.scale);
                let mode = match handle {
                    Handle::Rotate => DragMode::Rotate {
                        start_center: center,
                        start_angle: (pointer_doc - center).angle(),
                        start_rotation: object.rotation_degrees,
                    },
                    Handle::Scale { .. } => {
                        let start_dist = (pointer_doc - center).length();
                        if start_dist < 1.0 {
                            return;
                        }
                        DragMode::Scale {
                            start_center: center,
                            start_dist,
                            start_scale: object.scale,
                        }
                    }
                };
                self.drag = Some(DragGesture { id, mode, before: object.clone(), moved: false });
                return;
            }
        }

        let hit = hit::topmost_hit(session.document(), pointer_doc, |object| {
            draw::object_local_size(ctx, fonts, zoom, object)
        });
        match hit {
            Some(id) => {
                session.select(id, shift);
                let Some(object) = session.document().object(id) else {
                    return;
                };
                if object.locks.movable && session.is_selected(id) {
                    self.drag = Some(DragGesture {
                        id,
                        mode: DragMode::Move { grab: object.position - pointer_doc },
                        before: object.clone(),
                        moved: false,
                    });
                }
            }
            None => {
                if !shift {
                    session.clear_selection();
                }
            }
        }
    }

    fn update_gesture(&mut self, session: &mut EditorSession, canvas: Vec2, pos: Pos2) {
        let pointer_doc = session.viewport.screen_to_doc(canvas, pos);
        let Some(gesture) = &mut self.drag else {
            return;
        };
        let patch = match gesture.mode {
            DragMode::Move { grab } => ObjectPatch::move_to(pointer_doc + grab),
            DragMode::Scale { start_center, start_dist, start_scale } => {
                let factor = ((pointer_doc - start_center).length() / start_dist).max(MIN_DRAG_SCALE);
                ObjectPatch {
                    scale: Some(Vec2::new(
                        (start_scale.x * factor).max(MIN_DRAG_SCALE),
                        (start_scale.y * factor).max(MIN_DRAG_SCALE),
                    )),
                    ..Default::default()
                }
            }
            DragMode::Rotate { start_center, start_angle, start_rotation } => {
                let angle = (pointer_doc - start_center).angle();
                ObjectPatch {
                    rotation_degrees: Some(
                        start_rotation + (angle - start_angle).to_degrees(),
                    ),
                    ..Default::default()
                }
            }
        };
        if session.document_mut().update_object(gesture.id, &patch).is_some() {
            gesture.moved = true;
        }
    }

    fn end_gesture(&mut self, session: &mut EditorSession) {
        let Some(gesture) = self.drag.take() else {
            return;
        };
        if !gesture.moved {
            return;
        }
        let Some(after) = session.document().object(gesture.id).cloned() else {
            return;
        };
        let patch = placement_patch(&gesture.before, &after);
        if !patch.is_empty() {
            session.finish_gesture(gesture.id, gesture.before, patch);
        }
    }

    fn begin_text_edit(
        &mut self,
        session: &mut EditorSession,
        ctx: &Context,
        fonts: &SharedFontLibrary,
        canvas: Vec2,
        zoom: f32,
        pos: Pos2,
    ) {
        let pointer_doc = session.viewport.screen_to_doc(canvas, pos);
        let Some(id) = hit::topmost_hit(session.document(), pointer_doc, |object| {
            draw::object_local_size(ctx, fonts, zoom, object)
        }) else {
            return;
        };
        let Some(object) = session.document().object(id) else {
            return;
        };
        let ObjectKind::Text(attrs) = &object.kind else {
            return;
        };
        if !object.locks.content_editable {
            return;
        }
        self.editing = Some(TextEditState {
            id,
            buffer: attrs.content.clone(),
            before: object.clone(),
        });
        self.drag = None;
        session.select(id, false);
    }

    fn place_with_tool(&mut self, session: &mut EditorSession) {
        let command = match session.tool() {
            ToolMode::Text => tools::place_text(session.document()),
            ToolMode::Shape => tools::place_shape(session.document(), session.shape_draft.clone()),
            _ => return,
        };
        let count_before = session.document().objects().len();
        session.apply(command);
        if session.document().objects().len() > count_before {
            if let Some(id) = session.document().objects().last().map(|o| o.id) {
                session.select(id, false);
            }
            session.set_tool(ToolMode::Select);
        }
    }

    /// Floating editor for the text object being edited. Escape reverts,
    /// Done (or closing the window) commits one history entry.
    fn text_edit_window(&mut self, ctx: &Context, session: &mut EditorSession) {
        let Some(id) = self.editing.as_ref().map(|state| state.id) else {
            return;
        };
        if session.document().object(id).is_none() {
            self.editing = None;
            return;
        }

        let mut open = true;
        let mut done = false;
        let mut live: Option<String> = None;
        if let Some(state) = self.editing.as_mut() {
            egui::Window::new("Edit text")
                .id(egui::Id::new(("canvas-text-edit", id)))
                .collapsible(false)
                .resizable(false)
                .open(&mut open)
                .show(ctx, |ui| {
                    let response = ui.text_edit_multiline(&mut state.buffer);
                    if response.changed() {
                        live = Some(state.buffer.clone());
                    }
                    if ui.button("Done").clicked() {
                        done = true;
                    }
                });
        }
        if let Some(content) = live {
            session
                .document_mut()
                .update_object(id, &ObjectPatch::text(TextPatch {
                    content: Some(content),
                    ..Default::default()
                }));
        }

        if ctx.input(|i| i.key_pressed(Key::Escape)) {
            if let Some(state) = self.editing.take() {
                if let Some(text) = state.before.kind.as_text() {
                    session.document_mut().update_object(id, &ObjectPatch::text(TextPatch {
                        content: Some(text.content.clone()),
                        ..Default::default()
                    }));
                }
            }
            return;
        }
        if done || !open {
            if let Some(state) = self.editing.take() {
                let changed = state
                    .before
                    .kind
                    .as_text()
                    .is_some_and(|text| text.content != state.buffer);
                if changed {
                    let patch = ObjectPatch::text(TextPatch {
                        content: Some(state.buffer.clone()),
                        ..Default::default()
                    });
                    session.finish_gesture(id, state.before, patch);
                }
            }
        }
    }
}

/// The placement fields that differ between two snapshots of an object.
fn placement_patch(before: &SceneObject, after: &SceneObject) -> ObjectPatch {
    ObjectPatch {
        position: (after.position != before.position).then_some(after.position),
        scale: (after.scale != before.scale).then_some(after.scale),
        rotation_degrees: (after.rotation_degrees != before.rotation_degrees)
            .then_some(after.rotation_degrees),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ShapeAttrs, ShapeKind};

    fn object_at(position: Pos2) -> SceneObject {
        SceneObject::new(
            ObjectKind::Shape(ShapeAttrs::new(ShapeKind::default_rect())),
            position,
        )
    }

    #[test]
    fn placement_patch_picks_only_changed_fields() {
        let before = object_at(Pos2::new(10.0, 10.0));
        let mut after = before.clone();
        after.position = Pos2::new(25.0, 40.0);
        after.rotation_degrees = 30.0;

        let patch = placement_patch(&before, &after);
        assert_eq!(patch.position, Some(Pos2::new(25.0, 40.0)));
        assert_eq!(patch.rotation_degrees, Some(30.0));
        assert_eq!(patch.scale, None);
        assert!(patch.kind.is_none());
    }

    #[test]
    fn placement_patch_of_identical_snapshots_is_empty() {
        let object = object_at(Pos2::new(5.0, 5.0));
        assert!(placement_patch(&object, &object.clone()).is_empty());
    }
}
