//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, the classifier trait defines the boundary
//! between the application and whatever artifact format backs the model.

mod classifier;

pub use classifier::{Classifier, ClassifierError, StepDescription};
