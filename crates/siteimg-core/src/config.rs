use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Transport timeouts for store requests (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connect timeout in seconds.
    pub connect_secs: u64,
    /// Whole-request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 15,
            request_secs: 30,
        }
    }
}

/// Global configuration loaded from `~/.config/siteimg/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteimgConfig {
    /// Base URL of the hosted store, e.g. `https://abc.supabase.co`.
    pub store_url: String,
    /// Anonymous (read) API key for the override table.
    pub api_key: String,
    /// Service-role key for writes (upload, upsert). Optional in the file;
    /// usually supplied via `SITEIMG_SERVICE_KEY` instead.
    #[serde(default)]
    pub service_key: Option<String>,
    /// Table holding override rows.
    #[serde(default = "default_table")]
    pub table: String,
    /// Object-store bucket holding uploaded images.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Optional transport timeouts; if missing, built-in defaults are used.
    #[serde(default)]
    pub timeouts: Option<TimeoutConfig>,
}

fn default_table() -> String {
    "site_images".to_string()
}

fn default_bucket() -> String {
    "site-images".to_string()
}

impl Default for SiteimgConfig {
    fn default() -> Self {
        Self {
            store_url: String::new(),
            api_key: String::new(),
            service_key: None,
            table: default_table(),
            bucket: default_bucket(),
            timeouts: None,
        }
    }
}

impl SiteimgConfig {
    /// Effective timeouts (config section or defaults).
    pub fn timeouts(&self) -> TimeoutConfig {
        self.timeouts.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("siteimg")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
///
/// Environment variables override file values so secrets don't have to live
/// on disk: `SITEIMG_STORE_URL`, `SITEIMG_API_KEY`, `SITEIMG_SERVICE_KEY`.
pub fn load_or_init() -> Result<SiteimgConfig> {
    let path = config_path()?;
    let mut cfg = if !path.exists() {
        let default_cfg = SiteimgConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        default_cfg
    } else {
        let data = fs::read_to_string(&path)?;
        toml::from_str(&data)?
    };
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Apply `SITEIMG_*` environment overrides to a loaded config.
pub fn apply_env_overrides(cfg: &mut SiteimgConfig) {
    if let Ok(v) = std::env::var("SITEIMG_STORE_URL") {
        cfg.store_url = v;
    }
    if let Ok(v) = std::env::var("SITEIMG_API_KEY") {
        cfg.api_key = v;
    }
    if let Ok(v) = std::env::var("SITEIMG_SERVICE_KEY") {
        cfg.service_key = Some(v);
    }
}
