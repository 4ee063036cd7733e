//! Properties of the selected object.
//!
//! Every control applies its change through an `update_object` command the
//! moment it fires, so each edit is individually undoable. Restricted
//! sessions see only the text controls the customer is allowed to use.

use egui::{ComboBox, Slider, Ui};

use crate::assets::fonts::{BUILTIN_FAMILIES, PUBLIC_FAMILIES};
use crate::command::Command;
use crate::scene::{
    Color, FontStyle, FontWeight, ImageAttrs, ImageFilterKind, ImagePatch, ObjectId, ObjectKind,
    ObjectPatch, ReorderDirection, SceneObject, ShapeAttrs, ShapePatch, TextAlign, TextAttrs,
    TextPatch,
};
use crate::session::EditorSession;

pub fn properties_panel(ctx: &egui::Context, session: &mut EditorSession) {
    egui::SidePanel::right("properties-panel")
        .resizable(true)
        .default_width(250.0)
        .show(ctx, |ui| {
            ui.heading("Properties");
            let Some(id) = session.primary_selection() else {
                ui.small("Nothing selected");
                return;
            };
            let Some(object) = session.document().object(id) else {
                return;
            };
            let object = object.clone();
            ui.label(object.kind.kind_name());
            ui.separator();

            egui::ScrollArea::vertical().show(ui, |ui| {
                match &object.kind {
                    ObjectKind::Text(attrs) => text_properties(ui, session, attrs),
                    ObjectKind::Shape(attrs) if !session.is_restricted() => {
                        shape_properties(ui, session, attrs)
                    }
                    ObjectKind::Image(attrs) if !session.is_restricted() => {
                        image_properties(ui, session, attrs)
                    }
                    _ => {
                        ui.small("This object cannot be changed");
                    }
                }

                if !session.is_restricted() {
                    ui.separator();
                    placement_properties(ui, session, &object);
                    ui.separator();
                    order_buttons(ui, session, id);
                }

                if !session.is_restricted() || object.is_text() {
                    ui.separator();
                    if ui.button("Delete").clicked() {
                        session.delete_selection();
                    }
                }
            });
        });
}

fn text_properties(ui: &mut Ui, session: &mut EditorSession, attrs: &TextAttrs) {
    if !session.is_restricted() || attrs_editable(session) {
        let mut content = attrs.content.clone();
        if ui.text_edit_multiline(&mut content).changed() {
            apply_text(session, TextPatch { content: Some(content), ..Default::default() });
        }
    }

    let families = family_menu(session);
    ComboBox::from_label("Font")
        .selected_text(attrs.font_family.clone())
        .show_ui(ui, |ui| {
            for family in families {
                if ui
                    .selectable_label(attrs.font_family == family, &family)
                    .clicked()
                {
                    session.fonts.ensure(&family);
                    apply_text(session, TextPatch {
                        font_family: Some(family),
                        ..Default::default()
                    });
                }
            }
        });

    let mut size = attrs.font_size;
    if ui.add(Slider::new(&mut size, 8.0..=144.0).text("Size")).changed() {
        apply_text(session, TextPatch { font_size: Some(size), ..Default::default() });
    }

    ui.horizontal(|ui| {
        ui.label("Color");
        let mut fill = attrs.fill.to_color32();
        if ui.color_edit_button_srgba(&mut fill).changed() {
            apply_text(session, TextPatch {
                fill: Some(Color::from_color32(fill)),
                ..Default::default()
            });
        }
    });

    ui.horizontal(|ui| {
        for (align, label) in [
            (TextAlign::Left, "Left"),
            (TextAlign::Center, "Center"),
            (TextAlign::Right, "Right"),
        ] {
            if ui.selectable_label(attrs.align == align, label).clicked() {
                apply_text(session, TextPatch { align: Some(align), ..Default::default() });
            }
        }
    });

    ui.horizontal(|ui| {
        let bold = attrs.weight == FontWeight::Bold;
        if ui.selectable_label(bold, "Bold").clicked() {
            let weight = if bold { FontWeight::Normal } else { FontWeight::Bold };
            apply_text(session, TextPatch { weight: Some(weight), ..Default::default() });
        }
        let italic = attrs.style == FontStyle::Italic;
        if ui.selectable_label(italic, "Italic").clicked() {
            let style = if italic { FontStyle::Normal } else { FontStyle::Italic };
            apply_text(session, TextPatch { style: Some(style), ..Default::default() });
        }
        if ui.selectable_label(attrs.underline, "Underline").clicked() {
            apply_text(session, TextPatch {
                underline: Some(!attrs.underline),
                ..Default::default()
            });
        }
    });

    let mut line_height = attrs.line_height;
    if ui
        .add(Slider::new(&mut line_height, 0.5..=3.0).text("Line height"))
        .changed()
    {
        apply_text(session, TextPatch {
            line_height: Some(line_height),
            ..Default::default()
        });
    }

    let mut spacing = attrs.letter_spacing;
    if ui
        .add(Slider::new(&mut spacing, -200.0..=1000.0).text("Letter spacing"))
        .changed()
    {
        apply_text(session, TextPatch {
            letter_spacing: Some(spacing),
            ..Default::default()
        });
    }
}

fn shape_properties(ui: &mut Ui, session: &mut EditorSession, attrs: &ShapeAttrs) {
    ui.horizontal(|ui| {
        let mut filled = attrs.fill.is_some();
        if ui.checkbox(&mut filled, "Fill").changed() {
            let fill = filled.then_some(Color::from_rgb(128, 128, 128));
            apply_shape(session, ShapePatch { fill: Some(fill), ..Default::default() });
        }
        if let Some(fill) = attrs.fill {
            let mut color = fill.to_color32();
            if ui.color_edit_button_srgba(&mut color).changed() {
                apply_shape(session, ShapePatch {
                    fill: Some(Some(Color::from_color32(color))),
                    ..Default::default()
                });
            }
        }
    });

    ui.horizontal(|ui| {
        ui.label("Border");
        let mut stroke = attrs.stroke.to_color32();
        if ui.color_edit_button_srgba(&mut stroke).changed() {
            apply_shape(session, ShapePatch {
                stroke: Some(Color::from_color32(stroke)),
                ..Default::default()
            });
        }
    });

    let mut width = attrs.stroke_width;
    if ui
        .add(Slider::new(&mut width, 0.0..=20.0).text("Border width"))
        .changed()
    {
        apply_shape(session, ShapePatch { stroke_width: Some(width), ..Default::default() });
    }
}

fn image_properties(ui: &mut Ui, session: &mut EditorSession, attrs: &ImageAttrs) {
    ComboBox::from_label("Filter")
        .selected_text(attrs.filter.label())
        .show_ui(ui, |ui| {
            for filter in ImageFilterKind::ALL {
                if ui
                    .selectable_label(attrs.filter == filter, filter.label())
                    .clicked()
                {
                    apply_image(session, ImagePatch { filter: Some(filter), ..Default::default() });
                }
            }
        });

    let mut intensity = attrs.filter_intensity;
    if ui
        .add_enabled(
            attrs.filter.uses_intensity(),
            Slider::new(&mut intensity, 0.0..=1.0).text("Intensity"),
        )
        .changed()
    {
        apply_image(session, ImagePatch {
            filter_intensity: Some(intensity),
            ..Default::default()
        });
    }

    ui.horizontal(|ui| {
        ui.label("Border");
        let mut stroke = attrs.stroke.to_color32();
        if ui.color_edit_button_srgba(&mut stroke).changed() {
            apply_image(session, ImagePatch {
                stroke: Some(Color::from_color32(stroke)),
                ..Default::default()
            });
        }
    });

    let mut width = attrs.stroke_width;
    if ui
        .add(Slider::new(&mut width, 0.0..=20.0).text("Border width"))
        .changed()
    {
        apply_image(session, ImagePatch { stroke_width: Some(width), ..Default::default() });
    }
}

fn placement_properties(ui: &mut Ui, session: &mut EditorSession, object: &SceneObject) {
    let mut opacity = object.opacity;
    if ui.add(Slider::new(&mut opacity, 0.0..=1.0).text("Opacity")).changed() {
        session.update_selected(ObjectPatch { opacity: Some(opacity), ..Default::default() });
    }

    ui.horizontal(|ui| {
        ui.label("Rotation");
        let mut rotation = object.rotation_degrees;
        if ui
            .add(egui::DragValue::new(&mut rotation).speed(1.0).suffix("°"))
            .changed()
        {
            session.update_selected(ObjectPatch {
                rotation_degrees: Some(rotation),
                ..Default::default()
            });
        }
    });
}

fn order_buttons(ui: &mut Ui, session: &mut EditorSession, id: ObjectId) {
    ui.label("Order");
    ui.horizontal(|ui| {
        for (direction, label) in [
            (ReorderDirection::Front, "Front"),
            (ReorderDirection::Forward, "Up"),
            (ReorderDirection::Backward, "Down"),
            (ReorderDirection::Back, "Back"),
        ] {
            if ui.button(label).clicked() {
                session.apply(Command::reorder(id, direction));
            }
        }
    });
}

/// Family menu for the current mode. Customizers get the reduced builtin
/// list plus anything they installed themselves.
fn family_menu(session: &EditorSession) -> Vec<String> {
    let mut families = session.fonts.families();
    if session.is_restricted() {
        families.retain(|family| {
            PUBLIC_FAMILIES.contains(&family.as_str())
                || !BUILTIN_FAMILIES.contains(&family.as_str())
        });
    }
    families
}

fn attrs_editable(session: &EditorSession) -> bool {
    session
        .primary_selection()
        .and_then(|id| session.document().object(id))
        .is_some_and(|object| object.locks.content_editable)
}

fn apply_text(session: &mut EditorSession, patch: TextPatch) {
    session.update_selected(ObjectPatch::text(patch));
}

fn apply_shape(session: &mut EditorSession, patch: ShapePatch) {
    session.update_selected(ObjectPatch::shape(patch));
}

fn apply_image(session: &mut EditorSession, patch: ImagePatch) {
    session.update_selected(ObjectPatch::image(patch));
}
