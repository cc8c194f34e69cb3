//! Adapters layer: Concrete implementations of ports.
//!
//! - `pipeline`: JSON-exported preprocessing + linear classifier pipeline
//! - `signature`: Ed25519-signed manifest verification for model artifacts
//! - `sanitize`: clinical value filtering for logs

pub mod pipeline;
pub mod sanitize;
pub mod signature;

pub use pipeline::{ModelError, PipelineModel};
