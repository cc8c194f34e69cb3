//! Verdict types.
//!
//! Represents the human-readable outcome of a heart disease prediction.

use serde::{Deserialize, Serialize};

/// Risk classification for heart disease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Classifier label 0
    Low,
    /// Classifier label 1
    High,
}

impl RiskLevel {
    /// Map a binary class label to a risk level.
    #[must_use]
    pub fn from_label(label: u8) -> Self {
        if label == 1 {
            Self::High
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "Low risk of heart disease",
            Self::High => "High risk of heart disease",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Outcome of one prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub risk: RiskLevel,

    /// Positive-class probability, absent when the model cannot estimate it
    pub probability: Option<f64>,
}

impl Verdict {
    #[must_use]
    pub fn from_prediction(label: u8, probability: Option<f64>) -> Self {
        Self {
            risk: RiskLevel::from_label(label),
            probability,
        }
    }

    /// Probability with two decimals, e.g. `0.82`.
    #[must_use]
    pub fn probability_text(&self) -> Option<String> {
        self.probability.map(|p| format!("{p:.2}"))
    }

    /// Message shown to the user.
    #[must_use]
    pub fn message(&self) -> String {
        match self.probability_text() {
            Some(p) => format!("{} (probability = {p})", self.risk.description()),
            None => self.risk.description().to_string(),
        }
    }

    /// High risk is rendered in the error style, low risk in the success style.
    #[must_use]
    pub fn is_alert(&self) -> bool {
        self.risk == RiskLevel::High
    }
}
