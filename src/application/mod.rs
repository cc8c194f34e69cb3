//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the prediction flow of the application.

mod inference;
mod session;

pub use inference::{DiagnosticReport, InferenceService, PREPROCESSOR_STEP};
pub use session::Session;
