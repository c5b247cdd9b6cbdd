//! Signed session token and its decoded expiry.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::errors::ClientError;

#[derive(Debug, Deserialize)]
struct Claims {
    exp: f64,
}

/// A token with a parseable expiry. Constructing one is the only way to hold a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    expires_at: DateTime<Utc>,
}

impl Credential {
    /// Decode the `exp` claim of a JWT. The signature is the backend's business.
    pub fn parse(token: &str) -> Result<Self, ClientError> {
        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| ClientError::Decode("token has no payload segment".to_string()))?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| ClientError::Decode(format!("token payload is not base64: {}", e)))?;

        let claims: Claims = serde_json::from_slice(&bytes)?;
        let expires_at = DateTime::from_timestamp(claims.exp.floor() as i64, 0)
            .ok_or_else(|| ClientError::Decode(format!("token expiry {} out of range", claims.exp)))?;

        Ok(Self {
            token: token.to_string(),
            expires_at,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// One-way transform applied to every secret before it leaves the client.
pub fn hash_password(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}
