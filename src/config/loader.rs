use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Context, HistoryError, Result};

use super::{validator, Settings};

pub const CACHE_DIR_ENV: &str = "NSEHISTORY_CACHE_DIR";
pub const WORKERS_ENV: &str = "NSEHISTORY_WORKERS";

impl Settings {
    /// Read settings from a JSON file; absent keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings at {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse settings at {}", path.display()))?;
        Ok(settings)
    }

    /// Defaults, overlaid with `path` when given and then with environment overrides.
    /// The result is validated before it is returned.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        settings.apply_env_overrides(|key| std::env::var(key).ok())?;
        validator::validate_settings(&settings)?;
        Ok(settings)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(CACHE_DIR_ENV).filter(|value| !value.trim().is_empty()) {
            self.cache_dir = Some(PathBuf::from(dir));
        }

        if let Some(raw) = lookup(WORKERS_ENV) {
            self.workers = raw.trim().parse().map_err(|_| {
                HistoryError::message(format!("{WORKERS_ENV} must be a positive integer, got `{raw}`"))
            })?;
        }

        Ok(())
    }
}
