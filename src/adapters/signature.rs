//! Model artifact integrity: Ed25519-signed manifest verification.
//!
//! A signed model directory holds, next to the model file:
//! - `manifest.json`: SHA-256 digests of every bound artifact file
//! - `model.sig`: 64-byte Ed25519 signature over the raw manifest bytes
//!
//! The `sign_model` binary produces both files.
//!
//! # Policy
//!
//! - Signature present: verified against the configured public key, and the
//!   model file must be bound by the manifest with a matching digest.
//! - Signature absent: the model loads with a warning, unless signing is
//!   required, in which case loading fails.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::pipeline::ModelError;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "model.sig";

/// Only manifest layout understood by the verifier.
pub const MANIFEST_VERSION: u32 = 1;

/// Clock skew allowance for `created_at` in the future (seconds).
const MAX_FUTURE_SKEW_SECS: i64 = 300;

/// Signed list of artifact digests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    pub version: u32,
    /// Unix timestamp (seconds) when the manifest was created
    pub created_at: i64,
    /// Random 16-byte nonce, base64
    pub nonce_b64: String,
    /// File name (relative to the manifest) to lowercase hex SHA-256
    pub files: BTreeMap<String, String>,
}

/// How strictly a model artifact's signature is checked.
#[derive(Debug, Clone, Default)]
pub struct SignaturePolicy {
    /// Refuse to load artifacts without a valid signature
    pub require_signed: bool,
    /// Base64 Ed25519 public key used for verification
    pub verifying_key_b64: Option<String>,
}

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[must_use]
pub fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Decode a base64 Ed25519 public key.
///
/// # Errors
/// Returns `ModelError::Signature` on bad base64 or key bytes.
pub fn verifying_key_from_b64(b64: &str) -> Result<VerifyingKey, ModelError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|_| ModelError::Signature("invalid public key base64".into()))?;
    let key: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| ModelError::Signature("invalid public key length (expected 32 bytes)".into()))?;
    VerifyingKey::from_bytes(&key).map_err(|_| ModelError::Signature("invalid verifying key".into()))
}

// Digests are compared without early exit.
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Verify the signed manifest bound to `model_path`.
///
/// Returns the manifest when verification ran, `None` when the artifact is
/// unsigned and the policy allows it.
///
/// # Errors
/// Returns `ModelError::Signature` when verification fails or a required
/// signature is missing.
pub fn verify_artifact(
    model_path: &Path,
    policy: &SignaturePolicy,
) -> Result<Option<ModelManifest>, ModelError> {
    let base_dir = model_path.parent().unwrap_or_else(|| Path::new("."));
    let sig_path = base_dir.join(SIGNATURE_FILE);
    let manifest_path = base_dir.join(MANIFEST_FILE);

    if !sig_path.exists() || !manifest_path.exists() {
        if policy.require_signed {
            tracing::error!("Model signature not found at {:?}", sig_path);
            return Err(ModelError::Signature(format!(
                "signed model required but {SIGNATURE_FILE}/{MANIFEST_FILE} not found in {base_dir:?}"
            )));
        }
        tracing::warn!("Loading UNSIGNED model from {:?}", model_path);
        return Ok(None);
    }

    let Some(key_b64) = policy.verifying_key_b64.as_deref() else {
        if policy.require_signed {
            return Err(ModelError::Signature(
                "signed model required but no verifying key is configured".into(),
            ));
        }
        tracing::warn!("Model is signed but no verifying key is configured; skipping verification");
        return Ok(None);
    };
    let public_key = verifying_key_from_b64(key_b64)?;

    let sig_bytes = fs::read(&sig_path)?;
    let sig_array: [u8; 64] = sig_bytes
        .as_slice()
        .try_into()
        .map_err(|_| ModelError::Signature("invalid signature length (expected 64 bytes)".into()))?;
    let signature = Signature::from_bytes(&sig_array);

    let manifest_bytes = fs::read(&manifest_path)?;
    public_key
        .verify(&manifest_bytes, &signature)
        .map_err(|_| ModelError::Signature("invalid model signature".into()))?;

    let manifest: ModelManifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| ModelError::Signature(format!("invalid {MANIFEST_FILE} format: {e}")))?;
    if manifest.version != MANIFEST_VERSION {
        return Err(ModelError::Signature(format!(
            "unsupported manifest version: {}",
            manifest.version
        )));
    }
    if manifest.created_at > unix_now() + MAX_FUTURE_SKEW_SECS {
        return Err(ModelError::Signature(
            "manifest created_at is in the future".into(),
        ));
    }

    let model_name = model_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ModelError::Signature("model path has no file name".into()))?;
    if !manifest.files.contains_key(model_name) {
        return Err(ModelError::Signature(format!(
            "{MANIFEST_FILE} does not bind {model_name}"
        )));
    }

    for (rel, expected_hex) in &manifest.files {
        let bytes = fs::read(base_dir.join(rel)).map_err(|e| {
            ModelError::Signature(format!("manifest references unreadable file {rel}: {e}"))
        })?;
        if !constant_time_eq_str(&sha256_hex(&bytes), expected_hex) {
            return Err(ModelError::Signature(format!("file hash mismatch for {rel}")));
        }
    }

    tracing::info!("Model signature and hashes verified");
    Ok(Some(manifest))
}
