//! Durable storage for the credential pair.
//!
//! The pair is stored as a single JSON entry named [`TOKEN_ENTRY`]. A missing
//! entry means logged-out; a corrupt or half-empty entry is treated the same.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::CredentialPair;

/// Name of the persisted entry holding the serialized pair.
pub const TOKEN_ENTRY: &str = "authTokens";

/// Persists one credential pair.
pub trait TokenStore: Send + Sync {
    /// Overwrite any previously saved pair.
    fn save(&self, pair: &CredentialPair) -> Result<()>;

    /// Last saved pair, or `None` when absent or unreadable.
    fn load(&self) -> Option<CredentialPair>;

    /// Remove the saved pair. Succeeds when nothing is stored.
    fn clear(&self) -> Result<()>;
}

/// Parse a stored entry, rejecting anything that is not a complete pair.
pub(crate) fn parse_entry(contents: &str) -> Option<CredentialPair> {
    match serde_json::from_str::<CredentialPair>(contents) {
        Ok(pair) if pair.is_complete() => Some(pair),
        Ok(_) => {
            warn!("Stored credential pair is incomplete, ignoring");
            None
        }
        Err(e) => {
            warn!(error = %e, "Stored credential pair is malformed, ignoring");
            None
        }
    }
}

/// Token store backed by a JSON file in the cache directory.
pub struct FileTokenStore {
    cache_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn path(&self) -> PathBuf {
        self.cache_dir.join(format!("{}.json", TOKEN_ENTRY))
    }
}

impl TokenStore for FileTokenStore {
    fn save(&self, pair: &CredentialPair) -> Result<()> {
        let path = self.path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create token directory")?;
        }
        let contents = serde_json::to_string_pretty(pair)?;

        // Write-then-rename so a crash never leaves half a pair on disk.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).context("Failed to write token file")?;
        std::fs::rename(&tmp, &path).context("Failed to replace token file")?;
        debug!(path = %path.display(), "Saved credential pair");
        Ok(())
    }

    fn load(&self) -> Option<CredentialPair> {
        let path = self.path();
        if !path.exists() {
            return None;
        }
        match std::fs::read_to_string(&path) {
            Ok(contents) => parse_entry(&contents),
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Failed to read token file");
                None
            }
        }
    }

    fn clear(&self) -> Result<()> {
        let path = self.path();
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove token file")?;
        }
        Ok(())
    }
}

/// In-process store, one per test or per ephemeral client.
#[derive(Default)]
pub struct MemoryTokenStore {
    entry: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with raw contents, e.g. to simulate corrupt storage.
    pub fn with_raw(contents: impl Into<String>) -> Self {
        Self {
            entry: Mutex::new(Some(contents.into())),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.entry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn save(&self, pair: &CredentialPair) -> Result<()> {
        *self.slot() = Some(serde_json::to_string(pair)?);
        Ok(())
    }

    fn load(&self) -> Option<CredentialPair> {
        self.slot().as_deref().and_then(parse_entry)
    }

    fn clear(&self) -> Result<()> {
        *self.slot() = None;
        Ok(())
    }
}
