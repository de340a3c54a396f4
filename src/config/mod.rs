use std::collections::BTreeMap;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::fetch::{DEFAULT_MAX_SPAN_DAYS, DEFAULT_WORKERS};

pub mod loader;
pub mod validator;

pub use loader::{CACHE_DIR_ENV, WORKERS_ENV};
pub use validator::validate_settings;

/// Application name used for the cache directory and cache namespaces.
pub const APP_NAME: &str = "nsehistory";

pub const DEFAULT_BASE_URL: &str = "https://www.nseindia.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub stock_history: String,
    pub derivatives: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            stock_history: "/api/historical/cm/equity".to_string(),
            derivatives: "/api/historical/fo/derivatives".to_string(),
        }
    }
}

/// Runtime knobs for the history client. Every field has a default, so a config file
/// only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub endpoints: Endpoints,
    pub headers: BTreeMap<String, String>,
    pub cache_dir: Option<PathBuf>,
    pub workers: usize,
    pub max_span_days: u32,
    pub ssl_verify: bool,
    pub show_progress: bool,
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoints: Endpoints::default(),
            headers: default_headers(),
            cache_dir: None,
            workers: DEFAULT_WORKERS,
            max_span_days: DEFAULT_MAX_SPAN_DAYS,
            ssl_verify: true,
            show_progress: false,
            request_timeout_secs: None,
        }
    }
}

impl Settings {
    /// Cache root in effect: the configured directory or the platform default.
    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(default_cache_dir)
    }
}

/// Per-user cache directory for the app, or `./.cache/nsehistory` when the platform
/// does not expose one.
pub fn default_cache_dir() -> PathBuf {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".cache").join(APP_NAME))
}

fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "Referer".to_string(),
            "https://www.nseindia.com/get-quotes/equity?symbol=SBIN".to_string(),
        ),
        ("X-Requested-With".to_string(), "XMLHttpRequest".to_string()),
        (
            "User-Agent".to_string(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/80.0.3987.132 Safari/537.36".to_string(),
        ),
        ("Accept".to_string(), "*/*".to_string()),
        (
            "Accept-Language".to_string(),
            "en-GB,en-US;q=0.9,en;q=0.8".to_string(),
        ),
        ("Cache-Control".to_string(), "no-cache".to_string()),
    ])
}
