//! Template persistence.
//!
//! [`TemplateStore`] is the blocking interface to wherever templates live.
//! Store calls run on worker threads; the UI holds a [`PendingTransfer`] and
//! polls it once per frame, so a slow or dead backend never blocks a frame.

pub mod memory;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::channel::oneshot;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Backend identity of a template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("template not found")]
    NotFound,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("the request timed out")]
    TimedOut,
    #[error("malformed response: {0}")]
    BadResponse(String),
}

/// Listing details entered alongside the design.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateMetadata {
    pub name: String,
    pub price_per_card: f64,
    pub quantity_available: u32,
    pub city: String,
    pub format: Vec<String>,
    pub design_time: String,
    pub description: String,
}

/// Product kind the editor reads and writes. Anything else is a fixed
/// design sold as-is and never opens in the customizer.
pub const EDITABLE_KIND: &str = "editable";

/// A template as the store returns it.
#[derive(Debug, Clone)]
pub struct TemplateRecord {
    pub id: TemplateId,
    /// Product kind; see [`EDITABLE_KIND`].
    pub kind: String,
    /// The stored settings document, parsed but not yet decoded.
    pub settings: serde_json::Value,
    /// Encoded bytes of the card front, shown behind public customization.
    pub front_image: Option<Vec<u8>>,
    pub metadata: TemplateMetadata,
}

/// What the editor uploads on save.
#[derive(Debug, Clone)]
pub struct SavePayload {
    pub kind: String,
    pub metadata: TemplateMetadata,
    /// Encoded settings JSON, already checked against the size cap.
    pub settings: String,
    /// Flattened PNG preview of the current canvas.
    pub preview_png: Vec<u8>,
}

/// Blocking store interface. Implementations are called from worker threads
/// only, never from the UI thread.
pub trait TemplateStore: Send + Sync + 'static {
    fn load_template(&self, id: &TemplateId) -> Result<TemplateRecord, StoreError>;
    fn create_template(&self, payload: &SavePayload) -> Result<TemplateId, StoreError>;
    fn update_template(&self, id: &TemplateId, payload: &SavePayload) -> Result<(), StoreError>;
    /// The customer-facing read path. Same data as [`Self::load_template`]
    /// but without any owner authorization.
    fn fetch_public(&self, id: &TemplateId) -> Result<TemplateRecord, StoreError>;
}

pub const SAVE_DEADLINE: Duration = Duration::from_secs(120);
pub const LOAD_DEADLINE: Duration = Duration::from_secs(30);

pub enum TransferPoll<T> {
    Pending,
    Done(Result<T, StoreError>),
}

/// A store call in flight on a worker thread.
pub struct PendingTransfer<T> {
    rx: oneshot::Receiver<Result<T, StoreError>>,
    started: Instant,
    deadline: Duration,
    label: &'static str,
}

impl<T> PendingTransfer<T> {
    /// Non-blocking check. Returns `Done` exactly once per outcome; the
    /// caller drops the transfer afterwards. A worker that outlives the
    /// deadline reports [`StoreError::TimedOut`]; its late result lands in a
    /// dropped channel and disappears.
    pub fn poll(&mut self) -> TransferPoll<T> {
        match self.rx.try_recv() {
            Ok(Some(result)) => TransferPoll::Done(result),
            Ok(None) => {
                if self.started.elapsed() > self.deadline {
                    log::warn!("{} timed out after {:?}", self.label, self.deadline);
                    TransferPoll::Done(Err(StoreError::TimedOut))
                } else {
                    TransferPoll::Pending
                }
            }
            Err(oneshot::Canceled) => TransferPoll::Done(Err(StoreError::Transport(
                "worker exited without a result".to_owned(),
            ))),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

fn spawn_transfer<T, F>(label: &'static str, deadline: Duration, job: F) -> PendingTransfer<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let result = job();
        if tx.send(result).is_err() {
            log::debug!("{label}: result arrived after the transfer was dropped");
        }
    });
    PendingTransfer {
        rx,
        started: Instant::now(),
        deadline,
        label,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Created(TemplateId),
    Updated,
}

/// Create or update depending on whether the session already has an id.
pub fn spawn_save(
    store: Arc<dyn TemplateStore>,
    target: Option<TemplateId>,
    payload: SavePayload,
) -> PendingTransfer<SaveOutcome> {
    spawn_transfer("template save", SAVE_DEADLINE, move || match target {
        Some(id) => store
            .update_template(&id, &payload)
            .map(|_| SaveOutcome::Updated),
        None => store.create_template(&payload).map(SaveOutcome::Created),
    })
}

pub fn spawn_load(
    store: Arc<dyn TemplateStore>,
    id: TemplateId,
) -> PendingTransfer<TemplateRecord> {
    spawn_transfer("template load", LOAD_DEADLINE, move || {
        store.load_template(&id)
    })
}

pub fn spawn_fetch_public(
    store: Arc<dyn TemplateStore>,
    id: TemplateId,
) -> PendingTransfer<TemplateRecord> {
    spawn_transfer("public template fetch", LOAD_DEADLINE, move || {
        store.fetch_public(&id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_reports_worker_result() {
        let mut transfer = spawn_transfer("test", Duration::from_secs(5), || Ok(7u32));
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match transfer.poll() {
                TransferPoll::Done(result) => {
                    assert_eq!(result.unwrap(), 7);
                    break;
                }
                TransferPoll::Pending => {
                    assert!(Instant::now() < deadline);
                    std::thread::sleep(Duration::from_millis(2));
                }
            }
        }
    }

    #[test]
    fn deadline_converts_to_timeout() {
        let mut transfer: PendingTransfer<()> =
            spawn_transfer("test", Duration::ZERO, || {
                std::thread::sleep(Duration::from_secs(60));
                Ok(())
            });
        std::thread::sleep(Duration::from_millis(10));
        match transfer.poll() {
            TransferPoll::Done(Err(StoreError::TimedOut)) => {}
            _ => panic!("expected timeout"),
        }
    }
}
