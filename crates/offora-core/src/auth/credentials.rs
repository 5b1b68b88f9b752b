use anyhow::{Context, Result};
use keyring::Entry;
use tracing::warn;

use super::store::{parse_entry, TOKEN_ENTRY};
use super::{CredentialPair, TokenStore};

const SERVICE_NAME: &str = "offora";

/// Token store backed by the OS keychain.
pub struct KeyringTokenStore {
    service: String,
}

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Use a different keychain service name (one per backend, for example).
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, TOKEN_ENTRY).context("Failed to create keyring entry")
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringTokenStore {
    /// Store the serialized pair in the OS keychain
    fn save(&self, pair: &CredentialPair) -> Result<()> {
        let contents = serde_json::to_string(pair)?;
        self.entry()?
            .set_password(&contents)
            .context("Failed to store tokens in keychain")?;
        Ok(())
    }

    fn load(&self) -> Option<CredentialPair> {
        let entry = match self.entry() {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Keychain unavailable");
                return None;
            }
        };
        match entry.get_password() {
            Ok(contents) => parse_entry(&contents),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read tokens from keychain");
                None
            }
        }
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete tokens from keychain"),
        }
    }
}
