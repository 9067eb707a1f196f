// Configuration Storage Service
// Extractor tunables, config file read/write and version backup

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

const ENV_MAX_LENGTH: &str = "REASONING_LENS_MAX_LENGTH";
const ENV_DISABLE_CACHE: &str = "REASONING_LENS_DISABLE_CACHE";
const BACKUPS_KEPT: usize = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractorConfig {
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "default_eviction_ratio")]
    pub eviction_ratio: f64,
    #[serde(default = "default_cache_key_prefix_chars")]
    pub cache_key_prefix_chars: usize,
    #[serde(default = "default_true")]
    pub resection_enabled: bool,
    #[serde(default = "default_streaming_partial_threshold")]
    pub streaming_partial_threshold: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_length: 10_000,
            cache_enabled: true,
            cache_ttl_secs: 30 * 60,
            cache_capacity: 100,
            eviction_ratio: 0.2,
            cache_key_prefix_chars: 500,
            resection_enabled: true,
            streaming_partial_threshold: 200,
        }
    }
}

fn default_true() -> bool { true }
fn default_max_length() -> usize { 10_000 }
fn default_cache_ttl_secs() -> u64 { 30 * 60 }
fn default_cache_capacity() -> usize { 100 }
fn default_eviction_ratio() -> f64 { 0.2 }
fn default_cache_key_prefix_chars() -> usize { 500 }
fn default_streaming_partial_threshold() -> usize { 200 }

pub(crate) fn env_truthy(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE") | Ok("yes") | Ok("YES")
    )
}

impl ExtractorConfig {
    /// Apply `REASONING_LENS_*` environment overrides on top of this config.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var(ENV_MAX_LENGTH) {
            match raw.trim().parse::<usize>() {
                Ok(v) if v > 0 => self.max_length = v,
                _ => warn!(value = %raw, "[config] ignoring invalid {}", ENV_MAX_LENGTH),
            }
        }
        if env_truthy(ENV_DISABLE_CACHE) {
            self.cache_enabled = false;
        }
        self
    }
}

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("reasoning-lens"))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Load configuration from file; a missing file yields defaults.
    pub fn load(&self) -> Result<ExtractorConfig, ConfigError> {
        if !self.config_file.exists() {
            return Ok(ExtractorConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)?;
        let config = serde_json::from_str(&content).map_err(ConfigError::Parse)?;
        info!(path = %self.config_file.display(), "[config] loaded");
        Ok(config)
    }

    /// Save configuration, backing up the previous file first.
    pub fn save(&self, config: &ExtractorConfig) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir)?;

        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config).map_err(ConfigError::Serialize)?;
        fs::write(&self.config_file, content)?;
        info!(path = %self.config_file.display(), "[config] saved");
        Ok(())
    }

    fn create_backup(&self) -> Result<(), ConfigError> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir)?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));
        fs::copy(&self.config_file, &backup_file)?;

        self.cleanup_old_backups(&backup_dir, BACKUPS_KEPT)
    }

    /// Remove old backups, keeping only the most recent `keep`
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), ConfigError> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Names embed the timestamp, so lexical order is age order.
        entries.sort_by_key(|e| e.file_name());

        for entry in entries.iter().take(entries.len() - keep) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }
}
