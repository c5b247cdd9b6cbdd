//! Content fingerprints for by-value change detection.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// SHA-256 of a value's canonical JSON form.
///
/// Values pass through [`serde_json::Value`] first, so object keys are hashed in
/// sorted order whatever order they arrived in.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Self {
        let canonical = serde_json::to_value(value).unwrap_or_else(|e| {
            tracing::debug!("Fingerprinting unserializable value as null: {}", e);
            Value::Null
        });
        let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
        Self(Sha256::digest(&bytes).into())
    }
}

impl std::fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fingerprint({})", &hex::encode(self.0)[..12])
    }
}
