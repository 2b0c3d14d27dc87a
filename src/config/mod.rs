//! Configuration module for card-search
//!
//! Handles loading settings from YAML files and environment variables,
//! and the key-value store contract used for user preferences.

mod settings;
mod store;

pub use settings::*;
pub use store::{merge_defaults, MemoryStore, SettingsStore};

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable pointing at a settings file
pub const SETTINGS_PATH_ENV: &str = "CARD_SEARCH_SETTINGS_PATH";

/// Load settings from an explicit path, the environment, the default
/// locations, or fall back to defaults. Environment overrides apply last.
pub fn load(explicit: Option<&Path>) -> Result<Settings> {
    if let Some(path) = explicit {
        info!("Loading settings from: {}", path.display());
        let mut settings = Settings::from_file(path)?;
        settings.merge_env();
        return Ok(settings);
    }

    if let Ok(path) = std::env::var(SETTINGS_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            info!("Loading settings from: {}", path.display());
            let mut settings = Settings::from_file(&path)?;
            settings.merge_env();
            return Ok(settings);
        }
    }

    for path in default_paths() {
        if path.exists() {
            info!("Loading settings from: {}", path.display());
            let mut settings = Settings::from_file(&path)?;
            settings.merge_env();
            return Ok(settings);
        }
    }

    info!("No settings file found, using defaults");
    let mut settings = Settings::default();
    settings.merge_env();
    Ok(settings)
}

fn default_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("settings.yml"),
        PathBuf::from("config/settings.yml"),
    ];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("card-search/settings.yml"));
    }
    paths
}
