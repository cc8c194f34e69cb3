//! Runtime configuration from environment variables.

use std::path::PathBuf;

use crate::adapters::signature::{verifying_key_from_b64, SignaturePolicy};
use crate::HeartcheckError;

pub const DEFAULT_MODEL_PATH: &str = "models/final_model.json";
pub const DEFAULT_LOG_FILE: &str = "heartcheck.log";

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    /// File when stdout is a terminal (the TUI owns it), stdout otherwise
    #[default]
    Auto,
    File,
    Stdout,
}

impl LogMode {
    fn parse(value: &str) -> Self {
        match value.trim() {
            "file" => Self::File,
            "stdout" => Self::Stdout,
            _ => Self::Auto,
        }
    }

    /// Resolve `Auto` against whether stdout is interactive.
    #[must_use]
    pub fn use_file(self, interactive: bool) -> bool {
        match self {
            Self::File => true,
            Self::Stdout => false,
            Self::Auto => interactive,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path to the exported classifier pipeline
    pub model_path: PathBuf,

    /// Signature requirements for the model artifact
    pub signature: SignaturePolicy,

    pub log_mode: LogMode,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            signature: SignaturePolicy::default(),
            log_mode: LogMode::Auto,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            model_path: lookup("HEARTCHECK_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            signature: SignaturePolicy {
                require_signed: lookup("HEARTCHECK_REQUIRE_SIGNED_MODEL")
                    .is_some_and(|v| parse_bool(&v)),
                verifying_key_b64: lookup("HEARTCHECK_MODEL_PUBKEY_B64")
                    .filter(|v| !v.trim().is_empty()),
            },
            log_mode: lookup("HEARTCHECK_LOG_MODE")
                .map(|v| LogMode::parse(&v))
                .unwrap_or_default(),
            log_file: lookup("HEARTCHECK_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_file),
        }
    }

    /// Reject settings that can never lead to a usable session.
    ///
    /// # Errors
    /// Returns `HeartcheckError::Config` when signing is required without a
    /// verifying key, or when the configured key is not a valid Ed25519 key.
    pub fn validate(&self) -> Result<(), HeartcheckError> {
        match &self.signature.verifying_key_b64 {
            Some(b64) => verifying_key_from_b64(b64)
                .map(|_| ())
                .map_err(|e| HeartcheckError::Config(format!("HEARTCHECK_MODEL_PUBKEY_B64: {e}"))),
            None if self.signature.require_signed => Err(HeartcheckError::Config(
                "HEARTCHECK_REQUIRE_SIGNED_MODEL is set but HEARTCHECK_MODEL_PUBKEY_B64 is missing"
                    .into(),
            )),
            None => Ok(()),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "yes" | "YES")
}
