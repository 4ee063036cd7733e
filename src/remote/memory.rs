//! In-process template store, used by tests and the offline demo profile.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{SavePayload, StoreError, TemplateId, TemplateMetadata, TemplateRecord, TemplateStore};

struct StoredTemplate {
    kind: String,
    settings: String,
    metadata: TemplateMetadata,
    preview_png: Vec<u8>,
}

#[derive(Default)]
pub struct MemoryStore {
    templates: Mutex<HashMap<TemplateId, StoredTemplate>>,
    next_id: AtomicUsize,
    load_calls: AtomicUsize,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    fail_next: Mutex<Option<StoreError>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a template directly, bypassing the save path. Lets tests store
    /// settings the editor itself would never produce.
    pub fn seed(
        &self,
        id: impl Into<String>,
        kind: impl Into<String>,
        settings: impl Into<String>,
    ) -> TemplateId {
        let id = TemplateId::from_raw(id);
        self.templates.lock().insert(
            id.clone(),
            StoredTemplate {
                kind: kind.into(),
                settings: settings.into(),
                metadata: TemplateMetadata::default(),
                preview_png: Vec::new(),
            },
        );
        id
    }

    /// Make the next store call fail with the given error.
    pub fn fail_next(&self, err: StoreError) {
        *self.fail_next.lock() = Some(err);
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn stored_settings(&self, id: &TemplateId) -> Option<String> {
        self.templates.lock().get(id).map(|t| t.settings.clone())
    }

    fn take_failure(&self) -> Result<(), StoreError> {
        match self.fail_next.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn record_for(&self, id: &TemplateId) -> Result<TemplateRecord, StoreError> {
        let templates = self.templates.lock();
        let stored = templates.get(id).ok_or(StoreError::NotFound)?;
        let settings = serde_json::from_str(&stored.settings)
            .map_err(|err| StoreError::BadResponse(err.to_string()))?;
        Ok(TemplateRecord {
            id: id.clone(),
            kind: stored.kind.clone(),
            settings,
            front_image: (!stored.preview_png.is_empty()).then(|| stored.preview_png.clone()),
            metadata: stored.metadata.clone(),
        })
    }
}

impl TemplateStore for MemoryStore {
    fn load_template(&self, id: &TemplateId) -> Result<TemplateRecord, StoreError> {
        self.take_failure()?;
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        self.record_for(id)
    }

    fn create_template(&self, payload: &SavePayload) -> Result<TemplateId, StoreError> {
        self.take_failure()?;
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = TemplateId::from_raw(format!("tmpl-{n}"));
        self.templates.lock().insert(
            id.clone(),
            StoredTemplate {
                kind: payload.kind.clone(),
                settings: payload.settings.clone(),
                metadata: payload.metadata.clone(),
                preview_png: payload.preview_png.clone(),
            },
        );
        Ok(id)
    }

    fn update_template(&self, id: &TemplateId, payload: &SavePayload) -> Result<(), StoreError> {
        self.take_failure()?;
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let mut templates = self.templates.lock();
        let stored = templates.get_mut(id).ok_or(StoreError::NotFound)?;
        stored.kind = payload.kind.clone();
        stored.settings = payload.settings.clone();
        stored.metadata = payload.metadata.clone();
        stored.preview_png = payload.preview_png.clone();
        Ok(())
    }

    fn fetch_public(&self, id: &TemplateId) -> Result<TemplateRecord, StoreError> {
        self.take_failure()?;
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        self.record_for(id)
    }
}
