//! Single-row named-column input handed to a classifier.

use serde::{Deserialize, Serialize};

/// One row of named feature values.
///
/// Column names travel with the values so a classifier can reject input whose
/// schema differs from the one it was trained on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFrame {
    columns: Vec<String>,
    values: Vec<f64>,
}

#[allow(clippy::len_without_is_empty)]
impl FeatureFrame {
    /// Build a frame from parallel column and value lists.
    ///
    /// # Errors
    /// Returns an error if the lists have different lengths.
    pub fn new(columns: Vec<String>, values: Vec<f64>) -> Result<Self, String> {
        if columns.len() != values.len() {
            return Err(format!(
                "Frame has {} columns but {} values",
                columns.len(),
                values.len()
            ));
        }
        Ok(Self { columns, values })
    }

    // Callers in this crate always pass equal-length lists.
    pub(crate) fn from_parts(columns: Vec<String>, values: Vec<f64>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Look up a value by column name.
    #[must_use]
    pub fn value(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i])
    }

    /// Iterate `(column, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}
