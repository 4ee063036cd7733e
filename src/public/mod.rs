//! The customer-facing customization flow.
//!
//! [`PublicSession`] wraps a restricted [`EditorSession`] behind a load
//! gate. Authoring decode is tolerant; this path is strict: a missing
//! record, a product that is not customizable or settings with structural
//! loss move the session to [`PublicSession::failure`] and stay there. The
//! embedding page shows the error and navigates away; there is no degraded
//! public editor.

use std::sync::Arc;

use egui::vec2;

use crate::assets::fonts::SharedFontLibrary;
use crate::codec;
use crate::error::SessionError;
use crate::remote::{
    self, PendingTransfer, StoreError, TemplateId, TemplateRecord, TemplateStore, TransferPoll,
    EDITABLE_KIND,
};
use crate::scene::{BackgroundImage, FitMode, ImageSource};
use crate::session::EditorSession;

enum PublicState {
    Loading(PendingTransfer<TemplateRecord>),
    Ready(Box<EditorSession>),
    Failed(SessionError),
}

pub struct PublicSession {
    id: TemplateId,
    store: Arc<dyn TemplateStore>,
    fonts: SharedFontLibrary,
    state: PublicState,
}

impl PublicSession {
    /// Start fetching the template. The session is unusable until
    /// [`Self::poll`] reports it ready.
    pub fn open(store: Arc<dyn TemplateStore>, fonts: SharedFontLibrary, id: TemplateId) -> Self {
        let transfer = remote::spawn_fetch_public(store.clone(), id.clone());
        Self {
            id,
            store,
            fonts,
            state: PublicState::Loading(transfer),
        }
    }

    pub fn template_id(&self) -> &TemplateId {
        &self.id
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, PublicState::Loading(_))
    }

    pub fn failure(&self) -> Option<&SessionError> {
        match &self.state {
            PublicState::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn session(&self) -> Option<&EditorSession> {
        match &self.state {
            PublicState::Ready(session) => Some(session),
            _ => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut EditorSession> {
        match &mut self.state {
            PublicState::Ready(session) => Some(session),
            _ => None,
        }
    }

    /// Drive the fetch and, once open, the inner session. Call once per
    /// frame.
    pub fn poll(&mut self) {
        let outcome = match &mut self.state {
            PublicState::Loading(transfer) => transfer.poll(),
            PublicState::Ready(session) => {
                session.poll_transfers();
                return;
            }
            PublicState::Failed(_) => return,
        };
        match outcome {
            TransferPoll::Pending => {}
            TransferPoll::Done(Ok(record)) => {
                self.state = match self.open_record(record) {
                    Ok(session) => PublicState::Ready(Box::new(session)),
                    Err(err) => {
                        log::warn!("public template {} rejected: {err}", self.id);
                        PublicState::Failed(err)
                    }
                };
            }
            TransferPoll::Done(Err(err)) => {
                log::warn!("public template {} fetch failed: {err}", self.id);
                self.state = PublicState::Failed(fetch_failure(err));
            }
        }
    }

    /// Strict admission: the product must be customizable and its settings
    /// must decode without losing stored content. Re-parse warnings are
    /// acceptable, dropped objects are not.
    fn open_record(&self, record: TemplateRecord) -> Result<EditorSession, SessionError> {
        if record.kind != EDITABLE_KIND {
            return Err(SessionError::NotCustomizable);
        }
        let (_, report) = codec::decode_document(&record.settings);
        if let Some(problem) = report.warnings.iter().find(|w| w.is_structural()) {
            return Err(SessionError::InvalidSettings(problem.to_string()));
        }

        let mut session = EditorSession::restricted(self.store.clone(), self.fonts.clone());
        let front = record.front_image.clone();
        session.install_template(record);
        if let Some(bytes) = front {
            install_backdrop(&mut session, &bytes);
        }
        Ok(session)
    }
}

fn fetch_failure(err: StoreError) -> SessionError {
    match err {
        StoreError::NotFound => SessionError::TemplateNotFound,
        other => SessionError::StoreUnavailable(other.to_string()),
    }
}

/// Stretch the card-front render over the canvas, covering whatever
/// background the stored document carried. A front that fails to decode
/// degrades to the stored background instead of failing the session.
fn install_backdrop(session: &mut EditorSession, bytes: &[u8]) {
    match image::load_from_memory(bytes) {
        Ok(decoded) => {
            let rgba = decoded.to_rgba8();
            let (width, height) = rgba.dimensions();
            let asset = session
                .gallery
                .add_raw("card-front", rgba.into_raw(), width, height);
            session.document_mut().set_background(Some(BackgroundImage {
                source: ImageSource::Asset(asset),
                natural_size: vec2(width as f32, height as f32),
                fit: FitMode::Stretch,
                scale_pct: 100.0,
            }));
        }
        Err(err) => {
            log::warn!("card front image could not be decoded: {err}");
            session.notices.warning("Card preview could not be shown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::memory::MemoryStore;
    use crate::remote::{SavePayload, TemplateMetadata};
    use std::time::{Duration, Instant};

    fn test_fonts() -> SharedFontLibrary {
        struct NoFonts;
        impl crate::assets::fonts::FontFetcher for NoFonts {
            fn fetch(&self, _family: &str) -> Result<Vec<u8>, String> {
                Err("offline".to_owned())
            }
        }
        SharedFontLibrary::new(Arc::new(NoFonts))
    }

    fn wait(session: &mut PublicSession) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while session.is_loading() {
            assert!(Instant::now() < deadline, "fetch never settled");
            session.poll();
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    const CLEAN_SETTINGS: &str = r##"{
        "width": 400,
        "height": 300,
        "canvasJSON": {"version": "5.3.0", "objects": [], "background": "#ffffff"},
        "editableFields": []
    }"##;

    fn open(store: &Arc<MemoryStore>, id: TemplateId) -> PublicSession {
        let store: Arc<dyn TemplateStore> = store.clone();
        let mut session = PublicSession::open(store, test_fonts(), id);
        wait(&mut session);
        session
    }

    #[test]
    fn editable_template_opens_restricted() {
        let store = Arc::new(MemoryStore::new());
        let id = store.seed("card-1", "editable", CLEAN_SETTINGS);
        let mut public = open(&store, id);
        let session = public.session_mut().unwrap();
        assert!(session.is_restricted());
        assert_eq!(session.document().width, 400);
        assert_eq!(session.document().height, 300);
    }

    #[test]
    fn non_editable_kind_is_terminal() {
        let store = Arc::new(MemoryStore::new());
        let id = store.seed("card-2", "simple", CLEAN_SETTINGS);
        let public = open(&store, id);
        assert_eq!(public.failure(), Some(&SessionError::NotCustomizable));
    }

    #[test]
    fn missing_template_is_terminal() {
        let store = Arc::new(MemoryStore::new());
        let public = open(&store, TemplateId::from_raw("card-404"));
        assert_eq!(public.failure(), Some(&SessionError::TemplateNotFound));
    }

    #[test]
    fn settings_without_canvas_data_are_refused() {
        let store = Arc::new(MemoryStore::new());
        let id = store.seed("card-3", "editable", r#"{"width": 400, "height": 300}"#);
        let public = open(&store, id);
        assert!(matches!(
            public.failure(),
            Some(SessionError::InvalidSettings(_))
        ));
    }

    #[test]
    fn string_encoded_settings_still_open() {
        // The whole settings object stored as one JSON string: a re-parse
        // warning, not content loss.
        let encoded = serde_json::to_string(CLEAN_SETTINGS).unwrap();
        let store = Arc::new(MemoryStore::new());
        let id = store.seed("card-4", "editable", encoded);
        let mut public = open(&store, id);
        let session = public.session_mut().unwrap();
        assert_eq!(session.document().width, 400);
    }

    #[test]
    fn transport_failure_is_terminal() {
        let store = Arc::new(MemoryStore::new());
        let id = store.seed("card-5", "editable", CLEAN_SETTINGS);
        store.fail_next(StoreError::Transport("offline".to_owned()));
        let public = open(&store, id);
        assert!(matches!(
            public.failure(),
            Some(SessionError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn front_image_becomes_a_stretched_backdrop() {
        let store = Arc::new(MemoryStore::new());
        let mut png = std::io::Cursor::new(Vec::new());
        image::RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255]))
            .write_to(&mut png, image::ImageFormat::Png)
            .unwrap();
        let id = store
            .create_template(&SavePayload {
                kind: "editable".to_owned(),
                metadata: TemplateMetadata::default(),
                settings: CLEAN_SETTINGS.to_owned(),
                preview_png: png.into_inner(),
            })
            .unwrap();

        let mut public = open(&store, id);
        let session = public.session_mut().unwrap();
        let background = session.document().background.as_ref().unwrap();
        assert_eq!(background.fit, FitMode::Stretch);
        assert_eq!(background.natural_size, vec2(2.0, 3.0));
        assert!(matches!(background.source, ImageSource::Asset(_)));
    }
}
