//! Settings structures for card-search configuration

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Main settings structure, loaded from settings.yml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub extension: ExtensionSettings,
    pub catalog: CatalogSettings,
    pub host: HostSettings,
    pub search: SearchPolicy,
    pub outgoing: OutgoingSettings,
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Merge with environment variables (CARD_SEARCH_* prefix)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("CARD_SEARCH_FIND_COUNT") {
            if let Ok(count) = val.parse() {
                self.extension.find_count = count;
            }
        }
        if let Ok(val) = std::env::var("CARD_SEARCH_NSFW") {
            self.extension.nsfw = val.parse().unwrap_or(false);
        }
        if let Ok(val) = std::env::var("CARD_SEARCH_HOST_URL") {
            self.host.base_url = val;
        }
    }
}

/// User-facing search preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtensionSettings {
    /// Page size requested from the catalog
    pub find_count: u32,
    /// Include NSFW results in every search
    pub nsfw: bool,
}

impl Default for ExtensionSettings {
    fn default() -> Self {
        Self {
            find_count: 10,
            nsfw: false,
        }
    }
}

/// Remote catalog endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Search endpoint (GET)
    pub search_url: String,
    /// Per-item download endpoint (POST)
    pub download_url: String,
    /// Image host used when the download endpoint fails
    pub image_host: String,
    /// Public website, used for "view on catalog" links
    pub site_url: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            search_url: "https://api.chub.ai/search".to_string(),
            download_url: "https://api.chub.ai/api/characters/download".to_string(),
            image_host: "https://avatars.charhub.io".to_string(),
            site_url: "https://chub.ai".to_string(),
        }
    }
}

impl CatalogSettings {
    /// Backup image location for a catalog entry
    pub fn avatar_url(&self, full_path: &str) -> String {
        format!(
            "{}/avatars/{}/avatar.webp",
            self.image_host.trim_end_matches('/'),
            full_path
        )
    }

    /// Public page for a catalog entry; absolute URLs pass through
    pub fn page_url(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else {
            format!(
                "{}/characters/{}",
                self.site_url.trim_end_matches('/'),
                path_or_url.trim_start_matches('/')
            )
        }
    }
}

/// Host application endpoints that ingest imported content
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// Base URL of the host application
    pub base_url: String,
    /// Primary import path
    pub import_path: String,
    /// Legacy import path, tried when the primary fails
    pub legacy_import_path: String,
    /// Headers sent with every host request (CSRF tokens and the like)
    pub headers: HashMap<String, String>,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            import_path: "/api/content/importURL".to_string(),
            legacy_import_path: "/api/content/importUUID".to_string(),
            headers: HashMap::new(),
        }
    }
}

impl HostSettings {
    /// Resolve a host path against the base URL
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let base = Url::parse(&self.base_url)?;
        Ok(base.join(path)?)
    }
}

/// Batching and debounce policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchPolicy {
    /// Maximum concurrent per-item fetches
    pub batch_size: usize,
    /// Quiet period before typed input triggers a search
    pub input_debounce_ms: u64,
    /// Quiet period before a scroll triggers "load more"
    pub scroll_debounce_ms: u64,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            batch_size: 20,
            input_debounce_ms: 250,
            scroll_debounce_ms: 25,
        }
    }
}

impl SearchPolicy {
    pub fn input_debounce(&self) -> Duration {
        Duration::from_millis(self.input_debounce_ms)
    }

    pub fn scroll_debounce(&self) -> Duration {
        Duration::from_millis(self.scroll_debounce_ms)
    }
}

/// Outgoing request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingSettings {
    /// Default request timeout in seconds
    pub request_timeout: f64,
    /// Pool max size
    pub pool_maxsize: usize,
    /// Verify SSL certificates
    pub verify_ssl: bool,
    /// User agent override
    pub useragent: Option<String>,
    /// Proxy settings
    pub proxies: ProxySettings,
    /// Extra headers to send
    pub extra_headers: HashMap<String, String>,
}

impl Default for OutgoingSettings {
    fn default() -> Self {
        Self {
            request_timeout: Self::DEFAULT_TIMEOUT_SECS,
            pool_maxsize: 20,
            verify_ssl: true,
            useragent: None,
            proxies: ProxySettings::default(),
            extra_headers: HashMap::new(),
        }
    }
}

impl OutgoingSettings {
    const DEFAULT_TIMEOUT_SECS: f64 = 15.0;

    /// Request timeout. Negative, zero or non-finite values fall back to
    /// the default.
    pub fn timeout(&self) -> Duration {
        let secs = self.request_timeout;
        if secs.is_finite() && secs > 0.0 {
            Duration::from_secs_f64(secs)
        } else {
            Duration::from_secs_f64(Self::DEFAULT_TIMEOUT_SECS)
        }
    }
}

/// Proxy settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub http: Option<String>,
    pub https: Option<String>,
    pub all: Option<String>,
}
