//! Panels around the canvas: the left tool rail, the top bar and the
//! right-hand property editors.
//!
//! Panels read the session and push changes back as commands; none of them
//! touch the document directly. The public customization screen shows only
//! the top bar and the properties panel.

pub mod assets_panel;
pub mod canvas_panel;
pub mod properties;

use egui::{Button, Context, Ui};

use crate::assets::textures::TextureCache;
use crate::command::Command;
use crate::session::EditorSession;
use crate::tools::{self, ToolMode};

/// Left rail: mode switch, the active tool's controls and the listing form.
pub fn tool_panel(ctx: &Context, session: &mut EditorSession, textures: &mut TextureCache) {
    egui::SidePanel::left("tool-panel")
        .resizable(true)
        .default_width(230.0)
        .show(ctx, |ui| {
            ui.heading("Tools");
            for mode in ToolMode::ALL {
                let selected = session.tool() == mode;
                if ui.selectable_label(selected, mode.label()).clicked() {
                    session.set_tool(mode);
                }
            }
            ui.separator();

            match session.tool() {
                ToolMode::Select => {
                    ui.small("Click an object to select it. Drag corners to resize, the knob to rotate.");
                }
                ToolMode::Text => text_tool(ui, session),
                ToolMode::Shape => shape_tool(ui, session),
                ToolMode::Image => assets_panel::ui(ui, session, textures),
                ToolMode::Canvas => canvas_panel::ui(ui, session),
            }

            ui.separator();
            listing_details(ui, session);
        });
}

/// Top strip: history, zoom and persistence controls.
pub fn top_bar(ctx: &Context, session: &mut EditorSession) {
    egui::TopBottomPanel::top("top-bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if ui.add_enabled(session.can_undo(), Button::new("Undo")).clicked() {
                session.undo();
            }
            if ui.add_enabled(session.can_redo(), Button::new("Redo")).clicked() {
                session.redo();
            }
            ui.separator();

            if ui.button("-").clicked() {
                session.viewport.zoom_out();
            }
            ui.label(format!("{:.0}%", session.viewport.zoom() * 100.0));
            if ui.button("+").clicked() {
                session.viewport.zoom_in();
            }
            if ui.button("100%").clicked() {
                session.viewport.reset_zoom();
            }
            if ui.button("Fit").clicked() {
                session.pending_fit = true;
            }
            ui.separator();

            if !session.is_restricted() {
                let label = if session.is_saving() { "Saving..." } else { "Save" };
                if ui.add_enabled(!session.is_saving(), Button::new(label)).clicked() {
                    session.begin_save();
                }
                if session.is_saving() {
                    ui.spinner();
                }
            }
            if ui.button("Export PNG").clicked() {
                export_png(session);
            }
        });
    });
}

/// Flatten the canvas and write the PNG next to the executable.
fn export_png(session: &mut EditorSession) {
    match session.export_png() {
        Ok((name, bytes)) => match std::fs::write(name, &bytes) {
            Ok(()) => session.notices.success(format!("Exported {name}")),
            Err(err) => session.notices.error(format!("Could not write {name}: {err}")),
        },
        Err(err) => session.notices.error(format!("Export failed: {err}")),
    }
}

fn text_tool(ui: &mut Ui, session: &mut EditorSession) {
    ui.strong("Text");
    if ui.button("Add text box").clicked() {
        let command = tools::place_text(session.document());
        insert_and_select(session, command);
    }
    ui.small("Or click the canvas to place one there.");
}

fn shape_tool(ui: &mut Ui, session: &mut EditorSession) {
    use crate::scene::ShapeKind;

    ui.strong("Shapes");
    let presets = [
        ShapeKind::default_rect(),
        ShapeKind::default_circle(),
        ShapeKind::default_triangle(),
        ShapeKind::default_line(),
        ShapeKind::Polygon,
        ShapeKind::Star,
        ShapeKind::Heart,
    ];
    for preset in presets {
        if ui
            .selectable_label(
                session.shape_draft.kind.label() == preset.label(),
                preset.label(),
            )
            .clicked()
        {
            session.shape_draft.kind = preset;
            let command = tools::place_shape(session.document(), session.shape_draft.clone());
            insert_and_select(session, command);
        }
    }

    ui.add_space(4.0);
    ui.strong("Style");
    let draft = &mut session.shape_draft;
    ui.horizontal(|ui| {
        let mut filled = draft.fill.is_some();
        if ui.checkbox(&mut filled, "Fill").changed() {
            draft.fill = filled.then_some(crate::scene::Color::from_rgb(128, 128, 128));
        }
        if let Some(fill) = &mut draft.fill {
            let mut color = fill.to_color32();
            if ui.color_edit_button_srgba(&mut color).changed() {
                *fill = crate::scene::Color::from_color32(color);
            }
        }
    });
    ui.horizontal(|ui| {
        ui.label("Border");
        let mut stroke = draft.stroke.to_color32();
        if ui.color_edit_button_srgba(&mut stroke).changed() {
            draft.stroke = crate::scene::Color::from_color32(stroke);
        }
    });
    ui.add(egui::Slider::new(&mut draft.stroke_width, 0.0..=20.0).text("Border width"));
    ui.small("Style applies to the next shape. Click the canvas to place there.");
}

/// Marketplace form saved alongside the design. Plain field edits, not
/// commands.
fn listing_details(ui: &mut Ui, session: &mut EditorSession) {
    if session.is_restricted() {
        return;
    }
    ui.collapsing("Listing details", |ui| {
        let metadata = &mut session.metadata;
        ui.horizontal(|ui| {
            ui.label("Name");
            ui.text_edit_singleline(&mut metadata.name);
        });
        ui.horizontal(|ui| {
            ui.label("Price per card");
            ui.add(egui::DragValue::new(&mut metadata.price_per_card).range(0.0..=1_000_000.0));
        });
        ui.horizontal(|ui| {
            ui.label("Quantity");
            ui.add(egui::DragValue::new(&mut metadata.quantity_available).range(0..=1_000_000));
        });
        ui.horizontal(|ui| {
            ui.label("City");
            ui.text_edit_singleline(&mut metadata.city);
        });
        ui.horizontal(|ui| {
            ui.label("Design time");
            ui.text_edit_singleline(&mut metadata.design_time);
        });
        let mut formats = metadata.format.join(", ");
        ui.horizontal(|ui| {
            ui.label("Formats");
            if ui.text_edit_singleline(&mut formats).changed() {
                metadata.format = formats
                    .split(',')
                    .map(|s| s.trim().to_owned())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
        });
        ui.label("Description");
        ui.text_edit_multiline(&mut metadata.description);
    });
}

/// Run an insertion command and select whatever it added.
pub(crate) fn insert_and_select(session: &mut EditorSession, command: Command) {
    let before = session.document().objects().len();
    session.apply(command);
    if session.document().objects().len() > before {
        if let Some(id) = session.document().objects().last().map(|o| o.id) {
            session.select(id, false);
        }
    }
}
