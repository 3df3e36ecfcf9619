use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use prodmatch_core::{Error, Result};

pub const SUPPORTED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// An image ready to be sent for extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageInput {
    /// Accepts only the supported mime types; anything else is rejected
    /// before any upstream call.
    pub fn new(bytes: Vec<u8>, mime_type: &str) -> Result<Self> {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        if !SUPPORTED_MIME_TYPES.contains(&mime_type.as_str()) {
            return Err(Error::extraction(
                format!("invalid file type '{mime_type}', expected one of: {}", SUPPORTED_MIME_TYPES.join(", ")),
                None,
            ));
        }
        if bytes.is_empty() {
            return Err(Error::extraction("image is empty", None));
        }
        Ok(Self { bytes, mime_type })
    }

    /// Read an image file, taking its type from the content rather than the
    /// file name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| Error::extraction(format!("failed to read image {}: {e}", path.display()), None))?;
        let mime_type = sniff_mime(&bytes).unwrap_or("application/octet-stream");
        Self::new(bytes, mime_type)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// Mime type from the leading magic bytes, for the formats we accept.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}
