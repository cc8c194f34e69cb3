//! # Heartcheck
//!
//! Heart disease risk prediction from thirteen clinical measurements.
//!
//! This crate provides:
//! - Encoding of form answers into the classifier's training schema
//! - Inference against a pre-trained pipeline loaded once at startup
//! - Terminal UI for entering measurements and reading the verdict
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (PatientRecord, encoder, Verdict)
//! - `ports`: Trait definitions for external operations (Classifier)
//! - `adapters`: Concrete implementations (JSON pipeline, signatures, log sanitizing)
//! - `application`: Use cases orchestrating domain and ports
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use domain::{PatientRecord, RiskLevel, Verdict};

/// Result type for Heartcheck operations
pub type Result<T> = std::result::Result<T, HeartcheckError>;

/// Main error type for Heartcheck
#[derive(Debug, thiserror::Error)]
pub enum HeartcheckError {
    #[error("Cannot load model: {0}")]
    Load(#[from] adapters::ModelError),

    #[error("Prediction error: {0}")]
    Prediction(#[from] ports::ClassifierError),

    #[error("Session halted: {0}")]
    SessionHalted(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
