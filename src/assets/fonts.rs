//! Font loading and sharing.
//!
//! Families are fetched lazily on first use. Each family occupies one slot in
//! a shared table; a slot moves from pending to ready (or failed) exactly once
//! per fetch, so repeated requests while a fetch is in flight do nothing. Text
//! whose family is not ready yet falls back to the interface font and is
//! re-rendered when the real face lands.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{EditorError, EditorResult};
use crate::scene::SceneDocument;

/// Families offered out of the box, in menu order.
pub const BUILTIN_FAMILIES: [&str; 11] = [
    "Poppins",
    "Dancing Script",
    "Great Vibes",
    "Pacifico",
    "Montserrat",
    "Roboto",
    "Arial",
    "Times New Roman",
    "Courier New",
    "Georgia",
    "Verdana",
];

/// How many of [`BUILTIN_FAMILIES`] are fetched eagerly at startup.
pub const PRELOAD_COUNT: usize = 6;

/// The reduced family menu shown to card customizers.
pub const PUBLIC_FAMILIES: [&str; 6] = [
    "Poppins",
    "Arial",
    "Times New Roman",
    "Courier New",
    "Georgia",
    "Verdana",
];

/// Source of font bytes, by family name.
pub trait FontFetcher: Send + Sync + 'static {
    fn fetch(&self, family: &str) -> Result<Vec<u8>, String>;
}

/// Loaded face data: raw bytes for the UI font atlas, a parsed face for
/// measurement and flattening.
#[derive(Clone)]
pub struct FontAssets {
    bytes: Arc<Vec<u8>>,
    face: Arc<fontdue::Font>,
}

impl FontAssets {
    fn parse(bytes: Vec<u8>) -> Result<Self, String> {
        let face = fontdue::Font::from_bytes(bytes.as_slice(), fontdue::FontSettings::default())
            .map_err(|err| err.to_string())?;
        Ok(Self {
            bytes: Arc::new(bytes),
            face: Arc::new(face),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStatus {
    Missing,
    Pending,
    Ready,
    Failed,
}

enum FontSlot {
    Pending,
    Ready(FontAssets),
    Failed(String),
}

struct FontLibrary {
    fetcher: Arc<dyn FontFetcher>,
    slots: HashMap<String, FontSlot>,
    custom: Vec<String>,
    fallback: Option<Arc<fontdue::Font>>,
    egui_dirty: bool,
}

/// Handle to the font table, cloneable across the session and fetch workers.
#[derive(Clone)]
pub struct SharedFontLibrary(Arc<Mutex<FontLibrary>>);

impl SharedFontLibrary {
    pub fn new(fetcher: Arc<dyn FontFetcher>) -> Self {
        let shared = Self(Arc::new(Mutex::new(FontLibrary {
            fetcher,
            slots: HashMap::new(),
            custom: Vec::new(),
            fallback: seed_fallback(),
            egui_dirty: false,
        })));
        for family in &BUILTIN_FAMILIES[..PRELOAD_COUNT] {
            shared.ensure(family);
        }
        shared
    }

    /// Request a family. No-op if it is already loaded or in flight; a failed
    /// family is retried.
    pub fn ensure(&self, family: &str) {
        let fetcher = {
            let mut lib = self.0.lock();
            if matches!(
                lib.slots.get(family),
                Some(FontSlot::Pending | FontSlot::Ready(_))
            ) {
                return;
            }
            lib.slots.insert(family.to_owned(), FontSlot::Pending);
            lib.fetcher.clone()
        };

        let weak = Arc::downgrade(&self.0);
        let family = family.to_owned();
        std::thread::spawn(move || {
            let outcome = fetcher
                .fetch(&family)
                .and_then(FontAssets::parse);
            // If the session is gone the result has nowhere to go.
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mut lib = shared.lock();
            match outcome {
                Ok(assets) => {
                    log::debug!("font ready: {family}");
                    lib.slots.insert(family, FontSlot::Ready(assets));
                    lib.egui_dirty = true;
                }
                Err(detail) => {
                    log::warn!("font fetch failed for {family}: {detail}");
                    lib.slots.insert(family, FontSlot::Failed(detail));
                }
            }
        });
    }

    /// Request every family a document references.
    pub fn ensure_referenced(&self, document: &SceneDocument) {
        for family in document.referenced_fonts() {
            self.ensure(&family);
        }
    }

    /// Install a user-provided face under the given family name. The bytes
    /// are parsed up front so a corrupt file is rejected immediately.
    pub fn install_custom(&self, name: &str, bytes: Vec<u8>) -> EditorResult<()> {
        let assets = FontAssets::parse(bytes).map_err(|detail| EditorError::ResourceLoad {
            what: format!("font {name}"),
            detail,
        })?;
        let mut lib = self.0.lock();
        lib.slots.insert(name.to_owned(), FontSlot::Ready(assets));
        if !BUILTIN_FAMILIES.contains(&name) && !lib.custom.iter().any(|c| c == name) {
            lib.custom.push(name.to_owned());
        }
        lib.egui_dirty = true;
        Ok(())
    }

    /// Builtin families followed by installed custom ones, in menu order.
    pub fn families(&self) -> Vec<String> {
        let lib = self.0.lock();
        BUILTIN_FAMILIES
            .iter()
            .map(|family| (*family).to_owned())
            .chain(lib.custom.iter().cloned())
            .collect()
    }

    pub fn status(&self, family: &str) -> FontStatus {
        match self.0.lock().slots.get(family) {
            None => FontStatus::Missing,
            Some(FontSlot::Pending) => FontStatus::Pending,
            Some(FontSlot::Ready(_)) => FontStatus::Ready,
            Some(FontSlot::Failed(_)) => FontStatus::Failed,
        }
    }

    pub fn is_ready(&self, family: &str) -> bool {
        self.status(family) == FontStatus::Ready
    }

    /// The parsed face for a family, or the fallback face while it loads.
    pub fn face_for(&self, family: &str) -> Option<Arc<fontdue::Font>> {
        let lib = self.0.lock();
        if let Some(FontSlot::Ready(assets)) = lib.slots.get(family) {
            return Some(assets.face.clone());
        }
        lib.fallback.clone()
    }

    /// The text style to hand egui for a family: the real family once its
    /// atlas entry exists, the interface font until then.
    pub fn egui_family(&self, family: &str) -> egui::FontFamily {
        if self.is_ready(family) {
            egui::FontFamily::Name(family.into())
        } else {
            egui::FontFamily::Proportional
        }
    }

    /// Rebuild egui's font definitions if any face landed since the last call.
    /// Cheap when nothing changed; call once per frame.
    pub fn sync_egui(&self, ctx: &egui::Context) {
        let mut lib = self.0.lock();
        if !lib.egui_dirty {
            return;
        }
        lib.egui_dirty = false;

        let mut defs = egui::FontDefinitions::default();
        let base_chain = defs
            .families
            .get(&egui::FontFamily::Proportional)
            .cloned()
            .unwrap_or_default();
        for (family, slot) in &lib.slots {
            let FontSlot::Ready(assets) = slot else {
                continue;
            };
            defs.font_data.insert(
                family.clone(),
                Arc::new(egui::FontData::from_owned(assets.bytes.as_ref().clone())),
            );
            let mut chain = base_chain.clone();
            chain.insert(0, family.clone());
            defs.families
                .insert(egui::FontFamily::Name(family.as_str().into()), chain);
        }
        ctx.set_fonts(defs);
    }
}

/// Parse the interface font shipped with egui so text always has a face to
/// measure and flatten with, even before any fetch completes.
fn seed_fallback() -> Option<Arc<fontdue::Font>> {
    let defs = egui::FontDefinitions::default();
    let data = defs.font_data.get("Ubuntu-Light")?;
    fontdue::Font::from_bytes(data.font.as_ref(), fontdue::FontSettings::default())
        .ok()
        .map(Arc::new)
}

/// Fetcher that scans font directories on disk.
pub struct DirectoryFontFetcher {
    dirs: Vec<PathBuf>,
}

impl DirectoryFontFetcher {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// The usual system and per-user font locations.
    pub fn system() -> Self {
        let mut dirs = vec![
            PathBuf::from("/usr/share/fonts"),
            PathBuf::from("/usr/local/share/fonts"),
        ];
        if let Some(home) = std::env::var_os("HOME") {
            let home = PathBuf::from(home);
            dirs.push(home.join(".local/share/fonts"));
            dirs.push(home.join(".fonts"));
        }
        Self { dirs }
    }

    fn search_dir(dir: &Path, want: &str, depth: u8) -> Option<PathBuf> {
        let entries = std::fs::read_dir(dir).ok()?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                if depth > 0 {
                    if let Some(hit) = Self::search_dir(&path, want, depth - 1) {
                        return Some(hit);
                    }
                }
                continue;
            }
            let is_font = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    ext.eq_ignore_ascii_case("ttf") || ext.eq_ignore_ascii_case("otf")
                });
            if !is_font {
                continue;
            }
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            let stem = normalize(stem);
            if stem == want || stem == format!("{want}regular") {
                return Some(path);
            }
        }
        None
    }
}

impl FontFetcher for DirectoryFontFetcher {
    fn fetch(&self, family: &str) -> Result<Vec<u8>, String> {
        let want = normalize(family);
        for dir in &self.dirs {
            if let Some(path) = Self::search_dir(dir, &want, 3) {
                return std::fs::read(&path).map_err(|err| err.to_string());
            }
        }
        Err(format!("no font file found for {family}"))
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    struct FailingFetcher {
        calls: AtomicUsize,
    }

    impl FontFetcher for FailingFetcher {
        fn fetch(&self, _family: &str) -> Result<Vec<u8>, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err("offline".to_owned())
        }
    }

    fn wait_for(shared: &SharedFontLibrary, family: &str, status: FontStatus) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while shared.status(family) != status {
            assert!(Instant::now() < deadline, "timed out waiting for {family}");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn normalizes_family_names() {
        assert_eq!(normalize("Dancing Script"), "dancingscript");
        assert_eq!(normalize("Times New Roman"), "timesnewroman");
    }

    #[test]
    fn failed_fetch_keeps_fallback_face() {
        let fetcher = Arc::new(FailingFetcher {
            calls: AtomicUsize::new(0),
        });
        let shared = SharedFontLibrary::new(fetcher);
        wait_for(&shared, "Poppins", FontStatus::Failed);
        assert!(shared.face_for("Poppins").is_some());
        assert_eq!(shared.egui_family("Poppins"), egui::FontFamily::Proportional);
    }

    #[test]
    fn pending_family_is_not_refetched() {
        struct BlockingFetcher {
            calls: AtomicUsize,
            gate: Mutex<()>,
        }
        impl FontFetcher for BlockingFetcher {
            fn fetch(&self, _family: &str) -> Result<Vec<u8>, String> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let _held = self.gate.lock();
                Err("gated".to_owned())
            }
        }

        let fetcher = Arc::new(BlockingFetcher {
            calls: AtomicUsize::new(0),
            gate: Mutex::new(()),
        });
        let gate = fetcher.gate.lock();
        let shared = SharedFontLibrary(Arc::new(Mutex::new(FontLibrary {
            fetcher: fetcher.clone(),
            slots: HashMap::new(),
            custom: Vec::new(),
            fallback: None,
            egui_dirty: false,
        })));

        shared.ensure("Roboto");
        shared.ensure("Roboto");
        shared.ensure("Roboto");
        drop(gate);
        wait_for(&shared, "Roboto", FontStatus::Failed);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn custom_font_rejects_garbage() {
        let shared = SharedFontLibrary::new(Arc::new(FailingFetcher {
            calls: AtomicUsize::new(0),
        }));
        assert!(shared.install_custom("MyFont", vec![0, 1, 2, 3]).is_err());
        assert!(!shared.families().contains(&"MyFont".to_owned()));
    }
}
