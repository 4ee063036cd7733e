//! The editing session: one open document plus everything that operates on
//! it.
//!
//! All scene mutations happen synchronously on the UI thread through
//! [`EditorSession::apply`]. Store and font work runs on worker threads and
//! re-enters through [`EditorSession::poll_transfers`] once per frame; a
//! torn-down session just drops its receivers and late completions vanish.

pub mod notify;

use std::sync::Arc;

use crate::assets::fonts::SharedFontLibrary;
use crate::assets::AssetGallery;
use crate::codec;
use crate::command::{Command, CommandHistory};
use crate::error::EditorResult;
use crate::remote::{
    self, PendingTransfer, SaveOutcome, SavePayload, TemplateId, TemplateMetadata, TemplateRecord,
    TemplateStore, TransferPoll,
};
use crate::render;
use crate::scene::{ObjectId, ObjectPatch, SceneDocument, SceneObject, ShapeAttrs, ShapeKind};
use crate::tools::{CanvasSettingsDraft, ToolMode};
use crate::viewport::Viewport;

use notify::NotificationQueue;

pub struct EditorSession {
    doc: SceneDocument,
    history: CommandHistory,
    selection: Vec<ObjectId>,
    tool: ToolMode,
    restricted: bool,
    template_id: Option<TemplateId>,
    store: Arc<dyn TemplateStore>,
    pending_save: Option<PendingTransfer<SaveOutcome>>,
    pending_load: Option<PendingTransfer<TemplateRecord>>,
    /// Set after a template install; the canvas fits the viewport on its
    /// next frame and clears it.
    pub pending_fit: bool,
    pub gallery: AssetGallery,
    pub fonts: SharedFontLibrary,
    pub viewport: Viewport,
    pub notices: NotificationQueue,
    pub metadata: TemplateMetadata,
    pub canvas_draft: CanvasSettingsDraft,
    /// Style the next inserted shape will carry.
    pub shape_draft: ShapeAttrs,
}

impl EditorSession {
    /// Fresh authoring session over an empty document.
    pub fn new(store: Arc<dyn TemplateStore>, fonts: SharedFontLibrary) -> Self {
        Self::build(store, fonts, false)
    }

    /// Restricted session for public customization. The caller installs the
    /// fetched template afterwards; until then the document is empty.
    pub fn restricted(store: Arc<dyn TemplateStore>, fonts: SharedFontLibrary) -> Self {
        Self::build(store, fonts, true)
    }

    fn build(store: Arc<dyn TemplateStore>, fonts: SharedFontLibrary, restricted: bool) -> Self {
        let doc = SceneDocument::default();
        let canvas_draft = CanvasSettingsDraft::from_document(&doc);
        Self {
            doc,
            history: CommandHistory::new(),
            selection: Vec::new(),
            tool: ToolMode::Select,
            restricted,
            template_id: None,
            store,
            pending_save: None,
            pending_load: None,
            pending_fit: true,
            gallery: AssetGallery::new(),
            fonts,
            viewport: Viewport::new(),
            notices: NotificationQueue::new(),
            metadata: TemplateMetadata::default(),
            canvas_draft,
            shape_draft: ShapeAttrs::new(ShapeKind::default_rect()),
        }
    }

    pub fn document(&self) -> &SceneDocument {
        &self.doc
    }

    /// Direct document access for live pointer gestures. Anything routed
    /// through here must end in [`Self::finish_gesture`] so the step lands
    /// in the history.
    pub fn document_mut(&mut self) -> &mut SceneDocument {
        &mut self.doc
    }

    pub fn is_restricted(&self) -> bool {
        self.restricted
    }

    pub fn template_id(&self) -> Option<&TemplateId> {
        self.template_id.as_ref()
    }

    pub fn tool(&self) -> ToolMode {
        self.tool
    }

    /// Mode switches change pointer behavior and the visible panel, never
    /// the document.
    pub fn set_tool(&mut self, tool: ToolMode) {
        self.tool = tool;
    }

    // -- selection ----------------------------------------------------------

    pub fn selection(&self) -> &[ObjectId] {
        &self.selection
    }

    pub fn primary_selection(&self) -> Option<ObjectId> {
        self.selection.last().copied()
    }

    pub fn is_selected(&self, id: ObjectId) -> bool {
        self.selection.contains(&id)
    }

    /// Select an object, extending the selection when `additive`. Objects
    /// whose locks exclude selection are ignored.
    pub fn select(&mut self, id: ObjectId, additive: bool) {
        let Some(object) = self.doc.object(id) else {
            return;
        };
        if !object.locks.selectable {
            return;
        }
        if additive {
            if let Some(pos) = self.selection.iter().position(|s| *s == id) {
                self.selection.remove(pos);
            } else {
                self.selection.push(id);
            }
        } else {
            self.selection.clear();
            self.selection.push(id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    fn prune_selection(&mut self) {
        let doc = &self.doc;
        self.selection.retain(|id| doc.object(*id).is_some());
    }

    // -- commands -----------------------------------------------------------

    /// Execute a command against the document, recording it for undo. Errors
    /// surface as notifications; the document is unchanged on error.
    pub fn apply(&mut self, command: Command) {
        if !self.permitted(&command) {
            log::debug!("session: command not permitted here");
            return;
        }
        if let Err(err) = self.history.execute(command, &mut self.doc) {
            self.notices.error(err.to_string());
        }
        self.prune_selection();
    }

    /// Commit a finished pointer gesture as one undoable step. The document
    /// already holds the final state; `before` is the snapshot taken when
    /// the gesture started.
    pub fn finish_gesture(&mut self, id: ObjectId, before: SceneObject, patch: ObjectPatch) {
        self.apply(Command::UpdateObject {
            id,
            patch,
            prev: Some(Box::new(before)),
        });
    }

    /// Patch the primary selected object.
    pub fn update_selected(&mut self, patch: ObjectPatch) {
        if let Some(id) = self.primary_selection() {
            self.apply(Command::update_object(id, patch));
        }
    }

    /// Restricted sessions are guarded twice: this gate refuses structural
    /// commands outright, and [`SceneDocument::update_object`] then drops
    /// from a passing patch whatever the target's locks forbid.
    fn permitted(&self, command: &Command) -> bool {
        if !self.restricted {
            return true;
        }
        match command {
            Command::UpdateObject { .. } => true,
            Command::RemoveObjects { ids, .. } => ids
                .iter()
                .all(|id| self.doc.object(*id).is_some_and(|o| o.is_editable_field())),
            _ => false,
        }
    }

    pub fn undo(&mut self) {
        if self.history.undo(&mut self.doc) {
            self.prune_selection();
        }
    }

    pub fn redo(&mut self) {
        if self.history.redo(&mut self.doc) {
            self.prune_selection();
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Remove the current selection as one undoable step. Restricted
    /// sessions may only delete their own field objects.
    pub fn delete_selection(&mut self) {
        let mut ids: Vec<ObjectId> = self.selection.clone();
        if self.restricted {
            ids.retain(|id| self.doc.object(*id).is_some_and(|o| o.is_editable_field()));
        }
        if ids.is_empty() {
            return;
        }

        let notice = if ids.len() > 1 {
            format!("Deleted {} objects", ids.len())
        } else {
            let kind = self
                .doc
                .object(ids[0])
                .map(|o| o.kind.kind_name())
                .unwrap_or("object");
            format!("Deleted {kind}")
        };

        self.apply(Command::remove_objects(ids));
        self.selection.clear();
        self.notices.info(notice);
    }

    // -- persistence --------------------------------------------------------

    pub fn is_saving(&self) -> bool {
        self.pending_save.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    /// Encode, size-check and dispatch a save. The size cap is enforced
    /// before any store call; an oversized document never leaves the
    /// machine. Create vs update is decided by whether the session already
    /// has a template id.
    pub fn begin_save(&mut self) {
        if self.restricted {
            log::debug!("session: save is not available in restricted mode");
            return;
        }
        if self.pending_save.is_some() {
            self.notices.info("A save is already in progress");
            return;
        }

        self.clear_selection();
        let payload = match self.build_save_payload() {
            Ok(payload) => payload,
            Err(err) => {
                self.notices.error(err.to_string());
                return;
            }
        };

        self.pending_save = Some(remote::spawn_save(
            self.store.clone(),
            self.template_id.clone(),
            payload,
        ));
    }

    fn build_save_payload(&self) -> EditorResult<SavePayload> {
        let settings = codec::encode_settings(&self.doc, &self.gallery)?;
        codec::ensure_within_cap(&settings)?;
        let preview_png = render::flatten_png(&self.doc, &self.fonts, &self.gallery)?;
        Ok(SavePayload {
            kind: remote::EDITABLE_KIND.to_owned(),
            metadata: self.effective_metadata(),
            settings,
            preview_png,
        })
    }

    /// Listing metadata with the marketplace's fallbacks applied, so a
    /// design saved before the form is filled in still lists correctly.
    fn effective_metadata(&self) -> TemplateMetadata {
        let mut metadata = self.metadata.clone();
        if metadata.name.trim().is_empty() {
            metadata.name = "Untitled Card".to_owned();
        }
        if metadata.price_per_card <= 0.0 {
            metadata.price_per_card = 500.0;
        }
        if metadata.quantity_available == 0 {
            metadata.quantity_available = 100;
        }
        if metadata.design_time.trim().is_empty() {
            metadata.design_time = "7-10 days".to_owned();
        }
        if metadata.description.trim().is_empty() {
            metadata.description = "Customizable wedding card".to_owned();
        }
        if metadata.format.is_empty() {
            metadata.format = vec!["PNG".to_owned()];
        }
        metadata
    }

    /// Start fetching a template for authoring.
    pub fn request_template(&mut self, id: TemplateId) {
        self.pending_load = Some(remote::spawn_load(self.store.clone(), id));
    }

    /// Replace the session document with a fetched template. Decode is
    /// fail-soft: warnings surface as notifications and the session
    /// continues on whatever could be read.
    pub fn install_template(&mut self, record: TemplateRecord) {
        let (mut doc, report) = codec::decode_document(&record.settings);
        for warning in &report.warnings {
            self.notices.warning(warning.to_string());
        }

        if self.restricted {
            doc.apply_public_locks();
        } else {
            doc.clear_field_locks();
        }

        self.fonts.ensure_referenced(&doc);
        self.canvas_draft = CanvasSettingsDraft::from_document(&doc);
        self.doc = doc;
        self.template_id = Some(record.id);
        self.metadata = record.metadata;
        self.history.clear();
        self.selection.clear();
        self.pending_fit = true;
    }

    /// Drive in-flight transfers. Call once per frame.
    pub fn poll_transfers(&mut self) {
        if let Some(transfer) = &mut self.pending_save {
            match transfer.poll() {
                TransferPoll::Pending => {}
                TransferPoll::Done(result) => {
                    self.pending_save = None;
                    match result {
                        Ok(SaveOutcome::Created(id)) => {
                            self.template_id = Some(id);
                            self.notices.success("Card created successfully");
                        }
                        Ok(SaveOutcome::Updated) => {
                            self.notices.success("Card updated successfully");
                        }
                        Err(err) => {
                            self.notices.error(format!("Failed to save card: {err}"));
                        }
                    }
                }
            }
        }

        if let Some(transfer) = &mut self.pending_load {
            match transfer.poll() {
                TransferPoll::Pending => {}
                TransferPoll::Done(result) => {
                    self.pending_load = None;
                    match result {
                        Ok(record) => self.install_template(record),
                        Err(err) => {
                            self.notices
                                .error(format!("Failed to load card details: {err}"));
                        }
                    }
                }
            }
        }
    }

    /// Flatten the canvas and hand back a named PNG for download.
    pub fn export_png(&self) -> EditorResult<(&'static str, Vec<u8>)> {
        let name = if self.restricted {
            "customized-wedding-card.png"
        } else {
            "wedding-card.png"
        };
        let bytes = render::flatten_png(&self.doc, &self.fonts, &self.gallery)?;
        Ok((name, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::memory::MemoryStore;
    use crate::scene::{ObjectKind, TextAttrs};
    use crate::tools;

    fn test_fonts() -> SharedFontLibrary {
        struct NoFonts;
        impl crate::assets::fonts::FontFetcher for NoFonts {
            fn fetch(&self, _family: &str) -> Result<Vec<u8>, String> {
                Err("unavailable".to_owned())
            }
        }
        SharedFontLibrary::new(Arc::new(NoFonts))
    }

    fn authoring_session() -> EditorSession {
        EditorSession::new(Arc::new(MemoryStore::new()), test_fonts())
    }

    #[test]
    fn delete_selection_reports_kind() {
        let mut session = authoring_session();
        session.apply(tools::place_text(&SceneDocument::default()));
        let id = session.document().objects()[0].id;
        session.select(id, false);
        session.delete_selection();

        assert!(session.document().objects().is_empty());
        let messages: Vec<_> = session
            .notices
            .items()
            .iter()
            .map(|n| n.message.clone())
            .collect();
        assert!(messages.iter().any(|m| m == "Deleted Text"));
    }

    #[test]
    fn restricted_session_refuses_inserts() {
        let mut session =
            EditorSession::restricted(Arc::new(MemoryStore::new()), test_fonts());
        session.apply(tools::place_text(&SceneDocument::default()));
        assert!(session.document().objects().is_empty());
    }

    #[test]
    fn restricted_delete_skips_non_text() {
        let mut session =
            EditorSession::restricted(Arc::new(MemoryStore::new()), test_fonts());
        // Install objects directly; restricted apply would refuse them.
        let doc = session.document_mut();
        let shape = SceneObject::new(
            ObjectKind::Shape(ShapeAttrs::new(ShapeKind::default_rect())),
            egui::pos2(10.0, 10.0),
        );
        let shape_id = doc.add_object(shape);
        let text = SceneObject::new(ObjectKind::Text(TextAttrs::default()), egui::pos2(5.0, 5.0));
        let text_id = doc.add_object(text);

        session.selection = vec![shape_id, text_id];
        session.delete_selection();

        let doc = session.document();
        assert!(doc.object(shape_id).is_some());
        assert!(doc.object(text_id).is_none());
    }

    #[test]
    fn metadata_fallbacks_fill_blanks() {
        let mut session = authoring_session();
        session.metadata.name = "  ".to_owned();
        session.metadata.city = "Karachi".to_owned();
        let effective = session.effective_metadata();
        assert_eq!(effective.name, "Untitled Card");
        assert_eq!(effective.city, "Karachi");
        assert_eq!(effective.format, vec!["PNG".to_owned()]);
        assert_eq!(effective.price_per_card, 500.0);
    }

    #[test]
    fn undo_restores_deleted_selection() {
        let mut session = authoring_session();
        session.apply(tools::place_text(&SceneDocument::default()));
        let id = session.document().objects()[0].id;
        session.select(id, false);
        session.delete_selection();
        assert!(session.document().objects().is_empty());

        session.undo();
        assert_eq!(session.document().objects().len(), 1);
        assert_eq!(session.document().objects()[0].id, id);
    }
}
