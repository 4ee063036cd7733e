use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use egui::{ColorImage, Context, TextureHandle, TextureId, TextureOptions};

use crate::error::EditorResult;
use crate::scene::{AssetId, ImageAttrs, ImageSource, ObjectId, ShapeAttrs};

/// What a cached texture belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKey {
    /// Raster form of a scene object (images, and shapes epaint cannot fill).
    Object(ObjectId),
    /// Gallery thumbnail.
    Asset(AssetId),
    /// The canvas background image.
    Background,
}

/// Caches GPU textures by (key, version), evicting least-recently-used
/// entries once the cache grows past its limit.
pub struct TextureCache {
    textures: HashMap<(TextureKey, u64), TextureHandle>,
    last_used: HashMap<(TextureKey, u64), u64>,
    current_frame: u64,
    max_entries: usize,
}

impl TextureCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            textures: HashMap::new(),
            last_used: HashMap::new(),
            current_frame: 0,
            max_entries,
        }
    }

    /// Advance the LRU clock. Call once at the start of each frame.
    pub fn begin_frame(&mut self) {
        self.current_frame += 1;
    }

    /// Returns the cached texture for (key, version), running `generator`
    /// and uploading its image on a miss.
    pub fn get_or_create<F>(
        &mut self,
        key: TextureKey,
        version: u64,
        generator: F,
        ctx: &Context,
    ) -> EditorResult<TextureId>
    where
        F: FnOnce() -> EditorResult<ColorImage>,
    {
        let cache_key = (key, version);

        if let Some(handle) = self.textures.get(&cache_key) {
            self.last_used.insert(cache_key, self.current_frame);
            return Ok(handle.id());
        }

        let image = generator()?;
        let name = format!("{key:?}_v{version}");
        let handle = ctx.load_texture(&name, image, TextureOptions::LINEAR);

        self.textures.insert(cache_key, handle.clone());
        self.last_used.insert(cache_key, self.current_frame);
        self.prune_if_needed();

        Ok(handle.id())
    }

    /// Drop every cached version for a key. Used when the underlying pixels
    /// change but the version hash cannot see it (gallery removal).
    pub fn invalidate(&mut self, key: TextureKey) {
        let stale: Vec<(TextureKey, u64)> = self
            .textures
            .keys()
            .filter(|(k, _)| *k == key)
            .cloned()
            .collect();
        for cache_key in stale {
            self.textures.remove(&cache_key);
            self.last_used.remove(&cache_key);
        }
    }

    fn prune_if_needed(&mut self) {
        if self.textures.len() <= self.max_entries {
            return;
        }

        let mut entries: Vec<((TextureKey, u64), u64)> =
            self.last_used.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort_by_key(|(_, frame)| *frame);

        let to_remove = entries.len() - self.max_entries;
        for (cache_key, _) in entries.iter().take(to_remove) {
            self.textures.remove(cache_key);
            self.last_used.remove(cache_key);
        }
    }

    pub fn clear(&mut self) {
        self.textures.clear();
        self.last_used.clear();
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    #[cfg(test)]
    fn get(&self, key: TextureKey, version: u64) -> Option<&TextureHandle> {
        self.textures.get(&(key, version))
    }
}

/// Version hash for a shape's raster form.
pub fn shape_version(attrs: &ShapeAttrs) -> u64 {
    let mut hasher = std::hash::DefaultHasher::new();
    attrs.kind.label().hash(&mut hasher);
    let bounds = attrs.kind.local_bounds();
    bounds.width().to_bits().hash(&mut hasher);
    bounds.height().to_bits().hash(&mut hasher);
    attrs.fill.map(|c| c.to_hex_string()).hash(&mut hasher);
    attrs.stroke.to_hex_string().hash(&mut hasher);
    attrs.stroke_width.to_bits().hash(&mut hasher);
    hasher.finish()
}

/// Version hash for an image source. Data URLs are hashed by length and
/// prefix; a source never changes in place, so that is enough to tell two
/// sources apart.
pub fn source_version(source: &ImageSource) -> u64 {
    let mut hasher = std::hash::DefaultHasher::new();
    hash_source(source, &mut hasher);
    hasher.finish()
}

/// Version hash for an image object's raster form.
pub fn image_version(attrs: &ImageAttrs) -> u64 {
    let mut hasher = std::hash::DefaultHasher::new();
    hash_source(&attrs.source, &mut hasher);
    attrs.filter.label().hash(&mut hasher);
    attrs.filter_intensity.to_bits().hash(&mut hasher);
    hasher.finish()
}

fn hash_source(source: &ImageSource, hasher: &mut std::hash::DefaultHasher) {
    match source {
        ImageSource::Asset(id) => id.hash(hasher),
        ImageSource::DataUrl(url) => {
            url.len().hash(hasher);
            url.as_bytes().iter().take(256).for_each(|b| b.hash(hasher));
        }
    }
}
