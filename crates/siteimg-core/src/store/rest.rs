//! REST client for the hosted override table and object store.
//!
//! Speaks the PostgREST-style dialect of the hosted backend: the table is
//! queried under `/rest/v1/{table}` and objects live under
//! `/storage/v1/object/{bucket}`. Uses the curl crate in blocking mode;
//! async callers go through `spawn_blocking`.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::{SiteimgConfig, TimeoutConfig};

use super::{OverrideRecord, OverrideStore, StoreError};

/// Client for the hosted store. Reads authenticate with the anon key,
/// writes with the service-role key (required, checked before any request).
#[derive(Debug, Clone)]
pub struct RestStore {
    base_url: String,
    api_key: String,
    service_key: Option<String>,
    table: String,
    bucket: String,
    timeouts: TimeoutConfig,
}

impl RestStore {
    /// Build a client from loaded config. Fails if the store URL or anon key
    /// is missing so callers get one clear error instead of per-request 401s.
    pub fn from_config(cfg: &SiteimgConfig) -> Result<Self, StoreError> {
        if cfg.store_url.trim().is_empty() {
            return Err(StoreError::Config(
                "store_url is empty; set it in config.toml or SITEIMG_STORE_URL".to_string(),
            ));
        }
        if cfg.api_key.trim().is_empty() {
            return Err(StoreError::Config(
                "api_key is empty; set it in config.toml or SITEIMG_API_KEY".to_string(),
            ));
        }
        Ok(Self {
            base_url: cfg.store_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            service_key: cfg.service_key.clone(),
            table: cfg.table.clone(),
            bucket: cfg.bucket.clone(),
            timeouts: cfg.timeouts(),
        })
    }

    /// Public (unauthenticated) URL for an uploaded object.
    pub fn public_url(&self, object_path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, object_path
        )
    }

    /// Every override row with metadata, ordered by section (management view).
    pub async fn list_overrides(&self) -> Result<Vec<OverrideRecord>, StoreError> {
        let this = self.clone();
        run_blocking(move || {
            let url = format!(
                "{}/rest/v1/{}?select=*&order=section",
                this.base_url, this.table
            );
            let body = this.request(Request::get(&url, &this.api_key))?;
            Ok(serde_json::from_slice(&body)?)
        })
        .await
    }

    /// Insert or update the override row for a slot (at most one row per
    /// slot key; the table upserts on conflict).
    pub async fn upsert_override(
        &self,
        slot_key: &str,
        image_url: &str,
        label: Option<&str>,
        section: Option<&str>,
    ) -> Result<(), StoreError> {
        let this = self.clone();
        let mut row = serde_json::json!({
            "slot_key": slot_key,
            "image_url": image_url,
        });
        if let Some(label) = label {
            row["label"] = serde_json::Value::from(label);
        }
        if let Some(section) = section {
            row["section"] = serde_json::Value::from(section);
        }
        run_blocking(move || {
            let key = this.write_key()?.to_string();
            let url = format!(
                "{}/rest/v1/{}?on_conflict=slot_key",
                this.base_url, this.table
            );
            let body = serde_json::to_vec(&serde_json::Value::Array(vec![row]))?;
            this.request(
                Request::post(&url, &key, body)
                    .content_type("application/json")
                    .header("Prefer: resolution=merge-duplicates,return=minimal"),
            )?;
            Ok(())
        })
        .await
    }

    /// Upload an object body to the bucket at `object_path`, replacing any
    /// existing object at that path.
    pub async fn upload_object(
        &self,
        object_path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let this = self.clone();
        let content_type = content_type.to_string();
        let object_path = object_path.to_string();
        run_blocking(move || {
            let key = this.write_key()?.to_string();
            let url = format!(
                "{}/storage/v1/object/{}/{}",
                this.base_url, this.bucket, object_path
            );
            this.request(
                Request::post(&url, &key, bytes)
                    .content_type(&content_type)
                    .header("x-upsert: true")
                    .header("cache-control: max-age=3600"),
            )?;
            Ok(())
        })
        .await
    }

    fn write_key(&self) -> Result<&str, StoreError> {
        self.service_key.as_deref().ok_or_else(|| {
            StoreError::Config(
                "service key required for writes; set SITEIMG_SERVICE_KEY".to_string(),
            )
        })
    }

    /// Performs one HTTP request and returns the response body.
    /// Blocking; callers bridge through `run_blocking`.
    fn request(&self, req: Request) -> Result<Vec<u8>, StoreError> {
        let mut easy = curl::easy::Easy::new();
        easy.url(&req.url)?;
        easy.connect_timeout(Duration::from_secs(self.timeouts.connect_secs))?;
        easy.timeout(Duration::from_secs(self.timeouts.request_secs))?;
        easy.follow_location(true)?;

        let mut list = curl::easy::List::new();
        list.append(&format!("apikey: {}", req.auth_key))?;
        list.append(&format!("Authorization: Bearer {}", req.auth_key))?;
        list.append("Accept: application/json")?;
        if let Some(ct) = &req.content_type {
            list.append(&format!("Content-Type: {}", ct))?;
        }
        for h in &req.headers {
            list.append(h)?;
        }
        easy.http_headers(list)?;

        if let Some(body) = &req.body {
            easy.post(true)?;
            easy.post_fields_copy(body)?;
        }

        let mut buf = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                buf.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let status = easy.response_code()?;
        if !(200..300).contains(&status) {
            return Err(StoreError::Http {
                status,
                body: String::from_utf8_lossy(&buf).into_owned(),
            });
        }
        Ok(buf)
    }
}

#[async_trait]
impl OverrideStore for RestStore {
    async fn fetch_one(&self, slot_key: &str) -> Result<Option<String>, StoreError> {
        let this = self.clone();
        let key = slot_key.to_string();
        run_blocking(move || {
            let url = format!(
                "{}/rest/v1/{}?select=image_url&slot_key=eq.{}",
                this.base_url,
                this.table,
                escape_query_value(&key)
            );
            let body = this.request(Request::get(&url, &this.api_key))?;
            let rows: Vec<ImageUrlRow> = serde_json::from_slice(&body)?;
            Ok(rows.into_iter().next().map(|r| r.image_url))
        })
        .await
    }

    async fn fetch_all(&self) -> Result<Vec<OverrideRecord>, StoreError> {
        let this = self.clone();
        run_blocking(move || {
            let url = format!(
                "{}/rest/v1/{}?select=slot_key,image_url",
                this.base_url, this.table
            );
            let body = this.request(Request::get(&url, &this.api_key))?;
            Ok(serde_json::from_slice(&body)?)
        })
        .await
    }
}

#[derive(serde::Deserialize)]
struct ImageUrlRow {
    image_url: String,
}

/// One request's worth of parameters, owned so it can cross into the
/// blocking closure.
struct Request {
    url: String,
    auth_key: String,
    content_type: Option<String>,
    headers: Vec<String>,
    body: Option<Vec<u8>>,
}

impl Request {
    fn get(url: &str, auth_key: &str) -> Self {
        Self {
            url: url.to_string(),
            auth_key: auth_key.to_string(),
            content_type: None,
            headers: Vec::new(),
            body: None,
        }
    }

    fn post(url: &str, auth_key: &str, body: Vec<u8>) -> Self {
        Self {
            body: Some(body),
            ..Self::get(url, auth_key)
        }
    }

    fn content_type(mut self, ct: &str) -> Self {
        self.content_type = Some(ct.to_string());
        self
    }

    fn header(mut self, h: &str) -> Self {
        self.headers.push(h.to_string());
        self
    }
}

/// Percent-encode a slot key for use as a query-string value.
fn escape_query_value(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Run blocking curl work off the async runtime.
async fn run_blocking<T, F>(f: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
}
