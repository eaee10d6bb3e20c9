//! Storage path derivation for uploaded images.
//!
//! Uploaded files land under `{slot_key}/{slot_key}-{unix_millis}.{ext}` so
//! successive uploads for the same slot never collide and old objects remain
//! addressable. Slot keys are sanitized before use as a path segment.

use std::time::{SystemTime, UNIX_EPOCH};

/// Maximum length for a sanitized slot key used in a storage path.
const KEY_MAX: usize = 64;

/// Sanitizes a slot key for use as a storage path segment.
///
/// - Lowercases ASCII letters
/// - Replaces anything outside `[a-z0-9_-]` with `_`
/// - Collapses consecutive underscores
/// - Trims leading/trailing `_` and `-`
/// - Limits length to 64 bytes
pub fn sanitize_slot_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len().min(KEY_MAX));
    let mut prev_underscore = false;
    for c in key.chars() {
        let mapped = match c {
            'a'..='z' | '0'..='9' | '-' | '_' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '_',
        };
        if mapped == '_' {
            if prev_underscore {
                continue;
            }
            prev_underscore = true;
        } else {
            prev_underscore = false;
        }
        if out.len() >= KEY_MAX {
            break;
        }
        out.push(mapped);
    }
    out.trim_matches(|c| c == '_' || c == '-').to_string()
}

/// Derives the storage object path for an upload happening now.
pub fn object_path_for_slot(slot_key: &str, ext: &str) -> String {
    object_path_at(slot_key, ext, unix_millis())
}

/// Like [`object_path_for_slot`] but with an explicit timestamp (testable).
pub fn object_path_at(slot_key: &str, ext: &str, millis: u128) -> String {
    let key = sanitize_slot_key(slot_key);
    format!("{key}/{key}-{millis}.{ext}")
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
