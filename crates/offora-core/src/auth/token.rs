//! Credential pair and the principal decoded from its access token.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AuthError;

/// Access + refresh token pair as issued by `/api/login/` and the refresh
/// endpoint. Both fields are always present; a pair with only one half
/// cannot be constructed from storage or from the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access: String,
    pub refresh: String,
}

impl CredentialPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    /// True when neither token is blank.
    pub fn is_complete(&self) -> bool {
        !self.access.trim().is_empty() && !self.refresh.trim().is_empty()
    }
}

/// Identity carried in the access token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub username: String,
    pub is_vendor: bool,
    pub user_id: Option<i64>,
    pub exp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct AccessClaims {
    username: String,
    #[serde(default)]
    is_vendor: bool,
    #[serde(default)]
    user_id: Option<i64>,
    exp: i64,
}

impl Principal {
    /// Decode the principal from a JWT access token without verifying the
    /// signature. The backend verifies; the client only needs the claims.
    pub fn decode(access_token: &str) -> Result<Self, AuthError> {
        let mut parts = access_token.split('.');
        let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => {
                return Err(AuthError::InvalidCredential(
                    "access token is not a three-part JWT".to_string(),
                ))
            }
        };

        // Some issuers keep the padding; the URL-safe engine rejects it.
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthError::InvalidCredential(format!("payload encoding: {e}")))?;

        let claims: AccessClaims = serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::InvalidCredential(format!("payload claims: {e}")))?;

        let exp = DateTime::<Utc>::from_timestamp(claims.exp, 0).ok_or_else(|| {
            AuthError::InvalidCredential(format!("exp out of range: {}", claims.exp))
        })?;

        Ok(Self {
            username: claims.username,
            is_vendor: claims.is_vendor,
            user_id: claims.user_id,
            exp,
        })
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.exp
    }

    /// Seconds left on the access token, clamped at zero (for display).
    pub fn seconds_until_expiry(&self) -> i64 {
        (self.exp - Utc::now()).num_seconds().max(0)
    }

    pub fn role_display(&self) -> &'static str {
        if self.is_vendor {
            "vendor"
        } else {
            "customer"
        }
    }
}
