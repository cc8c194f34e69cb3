//! Classifier port: Trait for the pre-trained risk model.
//!
//! This trait abstracts the model artifact format from the application logic.

use crate::domain::FeatureFrame;

/// Errors raised by a classifier while scoring or introspecting.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifierError {
    #[error("Feature names mismatch: expected {expected:?}, got {got:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        got: Vec<String>,
    },

    #[error("Column {0:?} is missing from the input")]
    MissingColumn(String),

    #[error("Shape error: {0}")]
    Shape(String),

    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("Classifier failure: {0}")]
    Internal(String),
}

/// Identity of a named pipeline step, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDescription {
    /// Step name inside the pipeline (e.g. `preprocessor`)
    pub name: String,
    /// Step type (e.g. `column_transformer`)
    pub kind: String,
    /// One line per sub-component, human-readable
    pub details: Vec<String>,
}

impl std::fmt::Display for StepDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.kind, self.details.join(", "))
    }
}

/// Trait for a loaded binary classifier.
///
/// Implementations are read-only after loading and may be shared across
/// sessions behind an `Arc`.
pub trait Classifier: Send + Sync {
    /// Predict the class label for one row (0 = low risk, 1 = high risk).
    ///
    /// # Errors
    /// Returns `ClassifierError::SchemaMismatch` if the frame's columns differ
    /// from the training schema, or another variant on internal failure.
    fn predict(&self, frame: &FeatureFrame) -> Result<u8, ClassifierError>;

    /// Class probabilities for one row, ordered by class label.
    ///
    /// Returns `None` when the model has no probability estimation.
    fn predict_proba(&self, frame: &FeatureFrame) -> Option<Result<Vec<f64>, ClassifierError>>;

    /// Column names seen during training, if the artifact records them.
    fn feature_names_in(&self) -> Option<&[String]>;

    /// Describe a named pipeline step.
    fn named_step(&self, name: &str) -> Option<StepDescription>;

    /// Output feature names produced by a named step.
    ///
    /// # Errors
    /// Returns `ClassifierError::Unsupported` if the step cannot report them.
    fn feature_names_out(&self, step: &str) -> Result<Vec<String>, ClassifierError>;
}
