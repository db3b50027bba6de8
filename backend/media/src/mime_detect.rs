//! MIME type detection for uploaded test-kit photos.
//!
//! Only JPEG and PNG are accepted; everything else is rejected before the
//! image leaves the machine.

use std::path::Path;

use nitrilens_core::AnalysisError;

pub const IMAGE_JPEG: &str = "image/jpeg";
pub const IMAGE_PNG: &str = "image/png";

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

/// Detect MIME type by file extension.
pub fn detect_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => Some(IMAGE_JPEG),
        "png" => Some(IMAGE_PNG),
        _ => None,
    }
}

/// Detect MIME type from the leading bytes of the image.
pub fn sniff_image_type(data: &[u8]) -> Result<&'static str, AnalysisError> {
    if data.starts_with(PNG_MAGIC) {
        Ok(IMAGE_PNG)
    } else if data.starts_with(JPEG_MAGIC) {
        Ok(IMAGE_JPEG)
    } else if data.is_empty() {
        Err(AnalysisError::UnsupportedImage("empty upload".to_string()))
    } else {
        Err(AnalysisError::UnsupportedImage(
            "content is neither JPEG nor PNG".to_string(),
        ))
    }
}

/// Whether a declared Content-Type is one we accept.
pub fn is_supported(mime: &str) -> bool {
    let essence = mime.split(';').next().unwrap_or("").trim();
    matches!(
        essence.to_ascii_lowercase().as_str(),
        "image/jpeg" | "image/jpg" | "image/png"
    )
}
