//! The eframe shell.
//!
//! One window hosts both flows: the authoring editor and the public
//! customization screen. The shell owns the cross-session pieces (store
//! handle, font library, texture cache) and routes dropped files; panels
//! and the canvas do everything else through the active session.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::assets::fonts::{DirectoryFontFetcher, SharedFontLibrary};
use crate::assets::textures::TextureCache;
use crate::canvas::CanvasSurface;
use crate::panels;
use crate::public::PublicSession;
use crate::remote::memory::MemoryStore;
use crate::remote::{TemplateId, TemplateStore};
use crate::scene::FitMode;
use crate::session::notify::{NoticeLevel, NotificationQueue};
use crate::session::EditorSession;
use crate::tools::{self, ToolMode};
use crate::util::time;

enum Screen {
    Author(EditorSession),
    Public(PublicSession),
}

enum Jump {
    Edit(TemplateId),
    Customize(TemplateId),
    New,
}

pub struct CardStudioApp {
    screen: Screen,
    store: Arc<dyn TemplateStore>,
    fonts: SharedFontLibrary,
    textures: TextureCache,
    canvas: CanvasSurface,
    /// Template id typed into the open strip; persisted across runs.
    open_field: String,
}

impl CardStudioApp {
    /// Standalone app over an in-process store. Embedders with a real
    /// backend use [`Self::with_store`].
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        Self::with_store(cc, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(cc: &eframe::CreationContext<'_>, store: Arc<dyn TemplateStore>) -> Self {
        let fonts = SharedFontLibrary::new(Arc::new(DirectoryFontFetcher::system()));
        let open_field = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();
        let session = EditorSession::new(store.clone(), fonts.clone());
        Self {
            screen: Screen::Author(session),
            store,
            fonts,
            textures: TextureCache::new(128),
            canvas: CanvasSurface::new(),
            open_field,
        }
    }

    fn poll(&mut self) {
        match &mut self.screen {
            Screen::Author(session) => session.poll_transfers(),
            Screen::Public(public) => public.poll(),
        }
    }

    fn active_session_mut(&mut self) -> Option<&mut EditorSession> {
        match &mut self.screen {
            Screen::Author(session) => Some(session),
            Screen::Public(public) => public.session_mut(),
        }
    }

    /// Bottom strip for moving between a fresh design, editing an existing
    /// template and previewing it as a customer.
    fn open_strip(&mut self, ctx: &egui::Context) {
        let mut jump = None;
        egui::TopBottomPanel::bottom("open-strip").show(ctx, |ui| {
            ui.horizontal(|ui| {
                match &self.screen {
                    Screen::Author(session) => {
                        ui.label("Authoring");
                        if let Some(id) = session.template_id() {
                            ui.monospace(id.as_str());
                        }
                    }
                    Screen::Public(public) => {
                        ui.label("Customizing");
                        ui.monospace(public.template_id().as_str());
                    }
                }
                ui.separator();
                ui.label("Template id");
                ui.text_edit_singleline(&mut self.open_field);
                let id = self.open_field.trim().to_owned();
                let has_id = !id.is_empty();
                if ui.add_enabled(has_id, egui::Button::new("Edit")).clicked() {
                    jump = Some(Jump::Edit(TemplateId::from_raw(id.clone())));
                }
                if ui
                    .add_enabled(has_id, egui::Button::new("Customize"))
                    .clicked()
                {
                    jump = Some(Jump::Customize(TemplateId::from_raw(id)));
                }
                if ui.button("New card").clicked() {
                    jump = Some(Jump::New);
                }
            });
        });

        match jump {
            Some(Jump::Edit(id)) => {
                let mut session = EditorSession::new(self.store.clone(), self.fonts.clone());
                session.request_template(id);
                self.open(Screen::Author(session));
            }
            Some(Jump::Customize(id)) => {
                let public = PublicSession::open(self.store.clone(), self.fonts.clone(), id);
                self.open(Screen::Public(public));
            }
            Some(Jump::New) => {
                let session = EditorSession::new(self.store.clone(), self.fonts.clone());
                self.open(Screen::Author(session));
            }
            None => {}
        }
    }

    fn open(&mut self, screen: Screen) {
        self.screen = screen;
        self.textures.clear();
        self.canvas = CanvasSurface::new();
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        for file in dropped {
            if let Some((name, bytes)) = read_dropped(&file) {
                self.route_dropped_file(name, bytes);
            }
        }
    }

    /// Fonts install in either mode; images feed the background or the
    /// gallery while authoring and are refused while customizing.
    fn route_dropped_file(&mut self, name: String, bytes: Vec<u8>) {
        let lower = name.to_lowercase();
        if lower.ends_with(".ttf") || lower.ends_with(".otf") {
            let stem = Path::new(&name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| name.clone());
            let outcome = self.fonts.install_custom(&stem, bytes);
            if let Some(session) = self.active_session_mut() {
                match outcome {
                    Ok(()) => session.notices.success(format!("Added font {stem}")),
                    Err(err) => session.notices.error(err.to_string()),
                }
            }
            return;
        }

        match &mut self.screen {
            Screen::Author(session) => {
                if session.tool().is_canvas() {
                    match tools::set_background_from_upload(&name, bytes, FitMode::Cover, 100.0) {
                        Ok(command) => session.apply(command),
                        Err(err) => session.notices.error(err.to_string()),
                    }
                } else {
                    match session.gallery.add_upload(&name, bytes) {
                        Ok(_) => {
                            session.set_tool(ToolMode::Image);
                            session.notices.success(format!("Added {name}"));
                        }
                        Err(err) => session.notices.error(err.to_string()),
                    }
                }
            }
            Screen::Public(public) => {
                if let Some(session) = public.session_mut() {
                    session
                        .notices
                        .warning("Only fonts can be added while customizing");
                }
            }
        }
    }
}

impl eframe::App for CardStudioApp {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, &self.open_field);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.textures.begin_frame();
        self.fonts.sync_egui(ctx);
        self.poll();
        self.handle_dropped_files(ctx);
        self.open_strip(ctx);

        let mut reset_to_author = false;
        match &mut self.screen {
            Screen::Author(session) => {
                panels::top_bar(ctx, session);
                panels::tool_panel(ctx, session, &mut self.textures);
                panels::properties::properties_panel(ctx, session);
                egui::CentralPanel::default().show(ctx, |ui| {
                    self.canvas.ui(ui, session, &mut self.textures);
                });
                draw_notices(ctx, &mut session.notices);
            }
            Screen::Public(public) => {
                if public.is_loading() {
                    let id = public.template_id().clone();
                    egui::CentralPanel::default().show(ctx, |ui| {
                        ui.vertical_centered(|ui| {
                            ui.add_space(120.0);
                            ui.spinner();
                            ui.label(format!("Loading {id}"));
                        });
                    });
                } else if let Some(err) = public.failure() {
                    let message = err.to_string();
                    egui::CentralPanel::default().show(ctx, |ui| {
                        ui.vertical_centered(|ui| {
                            ui.add_space(120.0);
                            ui.heading("This design cannot be customized");
                            ui.label(message);
                            if ui.button("Back to the editor").clicked() {
                                reset_to_author = true;
                            }
                        });
                    });
                } else if let Some(session) = public.session_mut() {
                    panels::top_bar(ctx, session);
                    panels::properties::properties_panel(ctx, session);
                    egui::CentralPanel::default().show(ctx, |ui| {
                        self.canvas.ui(ui, session, &mut self.textures);
                    });
                    draw_notices(ctx, &mut session.notices);
                }
            }
        }
        if reset_to_author {
            let session = EditorSession::new(self.store.clone(), self.fonts.clone());
            self.open(Screen::Author(session));
        }

        let busy = match &self.screen {
            Screen::Author(session) => session.is_saving() || session.is_loading(),
            Screen::Public(public) => public.is_loading(),
        };
        if busy {
            ctx.request_repaint_after(Duration::from_millis(100));
        } else {
            // Keep transfers, font arrivals and toast aging moving without
            // waiting for input.
            ctx.request_repaint_after(Duration::from_secs(1));
        }
    }
}

fn read_dropped(file: &egui::DroppedFile) -> Option<(String, Vec<u8>)> {
    let name = file
        .path
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.name.clone());
    let bytes = if let Some(bytes) = &file.bytes {
        bytes.to_vec()
    } else if let Some(path) = &file.path {
        match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::warn!("could not read dropped file {name}: {err}");
                return None;
            }
        }
    } else {
        return None;
    };
    Some((name, bytes))
}

fn draw_notices(ctx: &egui::Context, notices: &mut NotificationQueue) {
    notices.prune(time::timestamp_secs());
    if notices.is_empty() {
        return;
    }
    egui::Area::new(egui::Id::new("notice-toasts"))
        .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-12.0, 40.0))
        .interactable(false)
        .show(ctx, |ui| {
            for notice in notices.items() {
                let color = match notice.level {
                    NoticeLevel::Info => egui::Color32::LIGHT_GRAY,
                    NoticeLevel::Success => egui::Color32::from_rgb(110, 200, 110),
                    NoticeLevel::Warning => egui::Color32::from_rgb(235, 180, 60),
                    NoticeLevel::Error => egui::Color32::from_rgb(235, 90, 90),
                };
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.colored_label(color, &notice.message);
                });
            }
        });
}
