//! Upload flow: validate an image file, store it, upsert the override row.
//!
//! This is the write path behind the management surface. It never touches
//! the resolver's cache: a running resolver keeps serving whatever it
//! already cached, and only a fresh process (or a key never resolved)
//! picks up the new URL.
//!
//! Access control is deliberately absent here; deployments must put their
//! own in front of this path.

mod validate;

pub use validate::{content_type_for_extension, validate_upload, ALLOWED_TYPES, MAX_UPLOAD_BYTES};

use std::path::Path;

use thiserror::Error;

use crate::store::{object_path_for_slot, sanitize_slot_key, RestStore, StoreError};

/// Upload failure, worded for the operator running the command.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("slot key '{0}' is empty after sanitizing; use letters, digits, '-' or '_'")]
    BadSlotKey(String),
    #[error("invalid file type '{0}'. Allowed: JPEG, PNG, WebP, SVG, GIF")]
    UnsupportedType(String),
    #[error("file too large ({size} bytes). Maximum size is 5MB")]
    TooLarge { size: usize },
    #[error("file content does not look like {0}")]
    ContentMismatch(String),
    #[error("cannot read file: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a completed upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub slot_key: String,
    pub object_path: String,
    pub public_url: String,
}

/// Uploads `file_path` as the new image for `slot_key`.
///
/// Validates type and size, stores the object under a timestamped path
/// derived from the slot key, and upserts the override row with the
/// object's public URL (plus label/section when given).
pub async fn upload_image(
    store: &RestStore,
    slot_key: &str,
    file_path: &Path,
    label: Option<&str>,
    section: Option<&str>,
) -> Result<UploadOutcome, UploadError> {
    let key = sanitize_slot_key(slot_key);
    if key.is_empty() {
        return Err(UploadError::BadSlotKey(slot_key.to_string()));
    }

    let ext = file_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let content_type = content_type_for_extension(&ext)
        .ok_or_else(|| UploadError::UnsupportedType(ext.clone()))?;

    let bytes = std::fs::read(file_path)?;
    validate_upload(&bytes, content_type)?;

    let object_path = object_path_for_slot(&key, &ext);
    store.upload_object(&object_path, bytes, content_type).await?;

    let public_url = store.public_url(&object_path);
    store
        .upsert_override(&key, &public_url, label, section)
        .await?;

    tracing::info!("uploaded '{}' for slot '{}'", object_path, key);
    Ok(UploadOutcome {
        slot_key: key,
        object_path,
        public_url,
    })
}
