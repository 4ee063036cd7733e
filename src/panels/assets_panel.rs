//! The session's image gallery.
//!
//! Uploads arrive as dropped files; the panel lists them with thumbnails
//! and turns them into image objects. Placed objects carry their own copy
//! of the pixels, so removing a gallery entry never breaks the document.

use egui::load::SizedTexture;
use egui::{vec2, ColorImage, Ui};

use crate::assets::textures::{TextureCache, TextureKey};
use crate::scene::AssetId;
use crate::session::EditorSession;
use crate::tools;

const THUMB_EDGE: f32 = 48.0;

enum GalleryAction {
    Insert(AssetId),
    Remove(AssetId, String),
}

pub fn ui(ui: &mut Ui, session: &mut EditorSession, textures: &mut TextureCache) {
    ui.strong("Images");
    ui.small("Drop JPEG or PNG files on the window to add them.");
    if session.gallery.is_empty() {
        return;
    }

    let mut action = None;
    egui::ScrollArea::vertical().show(ui, |ui| {
        for record in session.gallery.iter() {
            ui.horizontal(|ui| {
                let thumbnail = textures.get_or_create(
                    TextureKey::Asset(record.id),
                    0,
                    || {
                        Ok(ColorImage::from_rgba_unmultiplied(
                            [record.width as usize, record.height as usize],
                            &record.rgba,
                        ))
                    },
                    ui.ctx(),
                );
                if let Ok(texture) = thumbnail {
                    let scale = THUMB_EDGE / record.width.max(record.height).max(1) as f32;
                    let size = vec2(record.width as f32, record.height as f32) * scale;
                    ui.image(SizedTexture::new(texture, size));
                }

                ui.vertical(|ui| {
                    ui.label(&record.name);
                    ui.small(format!("{} x {}", record.width, record.height));
                    ui.horizontal(|ui| {
                        if ui.button("Insert").clicked() {
                            action = Some(GalleryAction::Insert(record.id));
                        }
                        if ui.button("Remove").clicked() {
                            action = Some(GalleryAction::Remove(record.id, record.name.clone()));
                        }
                    });
                });
            });
            ui.separator();
        }
    });

    match action {
        Some(GalleryAction::Insert(id)) => {
            let command = session
                .gallery
                .get(id)
                .map(|record| tools::place_image(session.document(), record));
            if let Some(command) = command {
                super::insert_and_select(session, command);
            }
        }
        Some(GalleryAction::Remove(id, name)) => {
            if session.gallery.remove(id) {
                textures.invalidate(TextureKey::Asset(id));
                session.notices.info(format!("Removed {name}"));
            }
        }
        None => {}
    }

    ui.small("Drop a TTF or OTF file to add its font to the text menu.");
}
