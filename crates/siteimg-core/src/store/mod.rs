//! Access to the hosted override table and object store.
//!
//! The resolver only needs the read path, expressed as the [`OverrideStore`]
//! trait so tests can substitute an in-memory store. The write path (object
//! upload + row upsert) is specific to the REST backend and lives on
//! [`RestStore`] directly; the resolver never writes.

mod object_path;
mod rest;

pub use object_path::{object_path_for_slot, sanitize_slot_key};
pub use rest::RestStore;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// One row of the override table. The resolver uses `slot_key` and
/// `image_url`; the remaining metadata exists for the management surface.
#[derive(Debug, Clone, Deserialize)]
pub struct OverrideRecord {
    pub slot_key: String,
    pub image_url: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Store access failure. The resolver swallows all of these and degrades to
/// caller-supplied defaults; the CLI surfaces them to the operator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transport: {0}")]
    Transport(#[from] curl::Error),
    #[error("store returned HTTP {status}: {body}")]
    Http { status: u32, body: String },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("store misconfigured: {0}")]
    Config(String),
    #[error("store worker failed: {0}")]
    Worker(String),
}

/// Read path of the override table. Implemented by [`RestStore`] for the
/// hosted backend and by in-memory mocks in resolver tests.
#[async_trait]
pub trait OverrideStore: Send + Sync {
    /// Fetch the override URL for one slot key. `Ok(None)` means no row.
    async fn fetch_one(&self, slot_key: &str) -> Result<Option<String>, StoreError>;

    /// Fetch every override row (the batch path deliberately pulls the whole
    /// table; the system has few slots).
    async fn fetch_all(&self) -> Result<Vec<OverrideRecord>, StoreError>;
}
