//! Canvas settings: dimensions, background color and the background image.
//!
//! Dimensions and color live in a draft and land in one command on Apply,
//! so half-typed numbers never hit the document. Background image tweaks
//! apply immediately.

use egui::{ComboBox, Slider, Ui};

use crate::command::Command;
use crate::scene::{Color, FitMode};
use crate::session::EditorSession;
use crate::tools::{self, CanvasSettingsDraft};

pub fn ui(ui: &mut Ui, session: &mut EditorSession) {
    ui.strong("Canvas");

    {
        let draft = &mut session.canvas_draft;
        ui.horizontal(|ui| {
            ui.label("Width");
            ui.text_edit_singleline(&mut draft.width);
        });
        ui.horizontal(|ui| {
            ui.label("Height");
            ui.text_edit_singleline(&mut draft.height);
        });
        ui.horizontal(|ui| {
            ui.label("Background");
            let mut color = draft.background_color.to_color32();
            if ui.color_edit_button_srgba(&mut color).changed() {
                draft.background_color = Color::from_color32(color);
            }
        });
    }

    ui.horizontal(|ui| {
        if ui.button("Apply").clicked() {
            match session.canvas_draft.to_command() {
                Ok(command) => session.apply(command),
                Err(err) => session.notices.error(err.to_string()),
            }
        }
        if ui.button("Revert").clicked() {
            session.canvas_draft = CanvasSettingsDraft::from_document(session.document());
        }
    });

    ui.separator();
    ui.strong("Background image");
    match session.document().background.clone() {
        Some(mut background) => {
            let mut changed = false;
            ComboBox::from_label("Fit")
                .selected_text(background.fit.label())
                .show_ui(ui, |ui| {
                    for fit in [FitMode::Cover, FitMode::Contain] {
                        if ui
                            .selectable_label(background.fit == fit, fit.label())
                            .clicked()
                        {
                            background.fit = fit;
                            changed = true;
                        }
                    }
                });
            if ui
                .add(Slider::new(&mut background.scale_pct, 50.0..=150.0).text("Scale %"))
                .changed()
            {
                changed = true;
            }
            if changed {
                session.apply(Command::SetBackground {
                    background: Some(background),
                    prev: None,
                });
            }
            if ui.button("Remove background").clicked() {
                session.apply(tools::remove_background());
            }
        }
        None => {
            ui.small("Drop a JPEG or PNG on the window to use it as the background.");
        }
    }
}
