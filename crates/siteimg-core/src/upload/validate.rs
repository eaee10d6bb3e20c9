//! Upload validation: size cap, content-type allow-list, magic-byte check.

use super::UploadError;

/// Maximum accepted upload size: 5 MB.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Content types accepted for slot images.
pub const ALLOWED_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/svg+xml",
    "image/gif",
];

/// Maps a file extension to its content type, if it is an accepted image type.
pub fn content_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Validates an upload body against the claimed content type.
///
/// Checks the size cap, the allow-list, and that the leading bytes look
/// like the claimed format (a `.png` file that is really an executable is
/// rejected here rather than served to site visitors).
pub fn validate_upload(bytes: &[u8], content_type: &str) -> Result<(), UploadError> {
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge { size: bytes.len() });
    }
    if !ALLOWED_TYPES.contains(&content_type) {
        return Err(UploadError::UnsupportedType(content_type.to_string()));
    }
    if !magic_matches(bytes, content_type) {
        return Err(UploadError::ContentMismatch(content_type.to_string()));
    }
    Ok(())
}

/// True if the leading bytes are plausible for the claimed content type.
fn magic_matches(bytes: &[u8], content_type: &str) -> bool {
    match content_type {
        "image/jpeg" => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
        "image/png" => bytes.starts_with(&[0x89, b'P', b'N', b'G']),
        "image/gif" => bytes.starts_with(b"GIF8"),
        "image/webp" => {
            bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP"
        }
        // SVG is text; accept anything that starts like an XML document.
        "image/svg+xml" => {
            let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]);
            let head = head.trim_start();
            head.starts_with("<svg") || head.starts_with("<?xml")
        }
        _ => false,
    }
}
