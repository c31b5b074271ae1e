use crate::errors::{JournalError, JournalResult};
use base64::Engine;

/// Screenshot ingestion: raw upload bytes to an embeddable data URL.
/// Re-encoding and compression happen client-side before upload.
#[derive(Debug, Clone, Copy)]
pub struct ImageIngest {
    pub max_bytes: usize,
    pub max_per_entry: usize,
}

impl ImageIngest {
    pub const DEFAULT_MAX_PER_ENTRY: usize = 12;

    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            max_per_entry: Self::DEFAULT_MAX_PER_ENTRY,
        }
    }

    pub fn to_data_url(&self, bytes: &[u8]) -> JournalResult<String> {
        if bytes.is_empty() {
            return Err(JournalError::Validation("empty image".into()));
        }
        if bytes.len() > self.max_bytes {
            return Err(JournalError::Validation(format!(
                "image too large: {} bytes (max {})",
                bytes.len(),
                self.max_bytes
            )));
        }
        let mime = sniff_mime(bytes).ok_or_else(|| JournalError::Validation("not a supported image".into()))?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(format!("data:{mime};base64,{encoded}"))
    }
}

/// Identify an image by its magic bytes.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}
