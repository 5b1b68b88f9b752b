//! Application configuration management.
//!
//! This module handles loading and saving the client configuration, which
//! includes the backend URL, the token storage backend, timeouts and the
//! last used username.
//!
//! Configuration is stored at `~/.config/offora/config.json`. The
//! `OFFORA_API_URL` environment variable overrides the configured URL.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{ClientOptions, DEFAULT_API_URL, DEFAULT_REFRESH_PATH};
use crate::auth::{FileTokenStore, KeyringTokenStore, TokenStore, DEFAULT_REFRESH_TIMEOUT};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "offora";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the backend base URL
pub const API_URL_ENV: &str = "OFFORA_API_URL";

/// Where the credential pair is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenStorage {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api_url: Option<String>,
    pub last_username: Option<String>,
    pub token_storage: TokenStorage,
    pub request_timeout_secs: Option<u64>,
    pub refresh_timeout_secs: Option<u64>,
    pub refresh_path: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Backend URL: environment, then config file, then the local default.
    pub fn api_base_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn client_options(&self) -> ClientOptions {
        let defaults = ClientOptions::default();
        ClientOptions {
            request_timeout: self
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            refresh_timeout: self
                .refresh_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REFRESH_TIMEOUT),
            refresh_path: self
                .refresh_path
                .clone()
                .unwrap_or_else(|| DEFAULT_REFRESH_PATH.to_string()),
        }
    }

    /// Token store selected by `token_storage`.
    pub fn token_store(&self) -> Result<Arc<dyn TokenStore>> {
        Ok(match self.token_storage {
            TokenStorage::File => Arc::new(FileTokenStore::new(self.cache_dir()?)),
            TokenStorage::Keyring => Arc::new(KeyringTokenStore::new()),
        })
    }
}
