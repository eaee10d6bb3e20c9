//! Slot model: a named placeholder for one image, with a fallback URL.
//!
//! Slots are declared by callers at resolution time; the resolver keeps no
//! registry of valid keys. A slot key doubles as the storage record key, so
//! it must stay stable across releases.

/// One image slot as declared by a caller: stable key plus the URL to fall
/// back on when no override exists (or the store is unreachable).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub key: String,
    pub default_url: String,
}

impl Slot {
    pub fn new(key: impl Into<String>, default_url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            default_url: default_url.into(),
        }
    }
}
