pub mod fonts;
pub mod textures;

use base64::Engine as _;

use crate::codec::SourceResolver;
use crate::error::{EditorError, EditorResult};
use crate::scene::AssetId;

/// Upload limit for gallery assets and background images.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// The portable `data:` form of an encoded image.
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{mime};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// A validated, decoded upload.
pub struct DecodedUpload {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub mime: &'static str,
}

/// Validate an upload by size and content (magic bytes, not file name) and
/// decode it to RGBA.
pub fn validate_image_upload(name: &str, bytes: &[u8]) -> EditorResult<DecodedUpload> {
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(EditorError::Validation(format!(
            "{name} is larger than the {} MB image limit",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }

    let format = image::guess_format(bytes).map_err(|_| {
        EditorError::Validation(format!("{name} is not a recognized image"))
    })?;
    let mime = match format {
        image::ImageFormat::Png => "image/png",
        image::ImageFormat::Jpeg => "image/jpeg",
        _ => {
            return Err(EditorError::Validation(
                "Only JPEG and PNG images are supported".to_owned(),
            ));
        }
    };

    let decoded = image::load_from_memory_with_format(bytes, format).map_err(|err| {
        EditorError::ResourceLoad {
            what: name.to_owned(),
            detail: err.to_string(),
        }
    })?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(DecodedUpload {
        rgba: rgba.into_raw(),
        width,
        height,
        mime,
    })
}

/// One uploaded image, kept for this session only.
pub struct AssetRecord {
    pub id: AssetId,
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Decoded RGBA pixels.
    pub rgba: Vec<u8>,
    /// The original encoded bytes, kept for the portable `src` form.
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

impl AssetRecord {
    pub fn data_url(&self) -> String {
        encode_data_url(self.mime, &self.bytes)
    }
}

/// Session-scoped upload gallery. Assets here are never serialized with the
/// document; objects placed from the gallery carry their own pixel source.
#[derive(Default)]
pub struct AssetGallery {
    assets: Vec<AssetRecord>,
}

impl AssetGallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_upload(&mut self, name: &str, bytes: Vec<u8>) -> EditorResult<AssetId> {
        let upload = validate_image_upload(name, &bytes)?;
        let id = AssetId::new();
        log::info!(
            "gallery: added {name} ({}x{}, {} bytes)",
            upload.width,
            upload.height,
            bytes.len()
        );
        self.assets.push(AssetRecord {
            id,
            name: name.to_owned(),
            width: upload.width,
            height: upload.height,
            rgba: upload.rgba,
            bytes,
            mime: upload.mime,
        });
        Ok(id)
    }

    /// Register pixels produced inside the app (not an upload).
    pub fn add_raw(&mut self, name: &str, rgba: Vec<u8>, width: u32, height: u32) -> AssetId {
        let id = AssetId::new();
        self.assets.push(AssetRecord {
            id,
            name: name.to_owned(),
            width,
            height,
            rgba,
            bytes: Vec::new(),
            mime: "image/png",
        });
        id
    }

    pub fn remove(&mut self, id: AssetId) -> bool {
        let before = self.assets.len();
        self.assets.retain(|a| a.id != id);
        before != self.assets.len()
    }

    pub fn get(&self, id: AssetId) -> Option<&AssetRecord> {
        self.assets.iter().find(|a| a.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetRecord> {
        self.assets.iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl SourceResolver for AssetGallery {
    fn data_url(&self, asset: AssetId) -> Option<String> {
        let record = self.get(asset)?;
        if record.bytes.is_empty() {
            return None;
        }
        Some(record.data_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Smallest valid 1x1 PNG
    fn tiny_png() -> Vec<u8> {
        let mut out = Vec::new();
        let img = image::RgbaImage::from_pixel(1, 1, image::Rgba([255, 0, 0, 255]));
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn upload_validates_by_content() {
        let mut gallery = AssetGallery::new();
        assert!(gallery.add_upload("fake.png", b"not an image".to_vec()).is_err());
        let id = gallery.add_upload("card.png", tiny_png()).unwrap();
        let record = gallery.get(id).unwrap();
        assert_eq!((record.width, record.height), (1, 1));
        assert_eq!(record.mime, "image/png");
    }

    #[test]
    fn oversize_upload_is_rejected() {
        let mut gallery = AssetGallery::new();
        let blob = vec![0u8; MAX_UPLOAD_BYTES + 1];
        let err = gallery.add_upload("big.png", blob).unwrap_err();
        assert!(matches!(err, EditorError::Validation(_)));
    }

    #[test]
    fn data_url_wraps_original_bytes() {
        let mut gallery = AssetGallery::new();
        let id = gallery.add_upload("card.png", tiny_png()).unwrap();
        let url = gallery.data_url(id).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }
}
