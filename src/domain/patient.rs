//! Patient record types for heart disease risk prediction.
//!
//! Based on the UCI Cleveland heart disease attributes the classifier was
//! trained on.

use serde::{Deserialize, Serialize};

use super::frame::FeatureFrame;

/// Column names in the exact order the classifier was trained with.
pub const FEATURE_NAMES: [&str; 13] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal",
];

/// Number of columns in a patient record.
pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// Encoded clinical measurements for a single prediction.
///
/// Categorical answers are already mapped to their numeric codes. A record is
/// built fresh for every prediction and dropped once the verdict is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Age in years (1-120)
    pub age: i64,

    /// Sex: 1 = male, 0 = female
    pub sex: i64,

    /// Chest pain type (1-4)
    pub cp: i64,

    /// Resting blood pressure in mmHg (50-250)
    pub trestbps: i64,

    /// Serum cholesterol in mg/dL (100-600)
    pub chol: i64,

    /// Fasting blood sugar > 120 mg/dL: 1 = yes, 0 = no
    pub fbs: i64,

    /// Resting ECG result (0-2)
    pub restecg: i64,

    /// Maximum heart rate achieved (50-220)
    pub thalach: i64,

    /// Exercise induced angina: 1 = yes, 0 = no
    pub exang: i64,

    /// ST depression induced by exercise relative to rest (0.0-10.0)
    pub oldpeak: f64,

    /// Slope of the peak exercise ST segment (1-3)
    pub slope: i64,

    /// Number of major vessels colored by fluoroscopy (0-4)
    pub ca: i64,

    /// Thalassemia: 3 = normal, 6 = fixed defect, 7 = reversible defect
    pub thal: i64,
}

impl PatientRecord {
    /// Values in `FEATURE_NAMES` order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.age as f64,
            self.sex as f64,
            self.cp as f64,
            self.trestbps as f64,
            self.chol as f64,
            self.fbs as f64,
            self.restecg as f64,
            self.thalach as f64,
            self.exang as f64,
            self.oldpeak,
            self.slope as f64,
            self.ca as f64,
            self.thal as f64,
        ]
    }

    /// Single-row frame with the training column names attached.
    #[must_use]
    pub fn to_frame(&self) -> FeatureFrame {
        FeatureFrame::from_parts(
            FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect(),
            self.to_vec(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PatientRecord {
        PatientRecord {
            age: 63,
            sex: 1,
            cp: 1,
            trestbps: 145,
            chol: 233,
            fbs: 1,
            restecg: 2,
            thalach: 150,
            exang: 0,
            oldpeak: 2.3,
            slope: 3,
            ca: 0,
            thal: 6,
        }
    }

    #[test]
    fn test_to_vec_preserves_column_order() {
        let v = record().to_vec();
        assert_eq!(v.len(), FEATURE_COUNT);
        assert!((v[0] - 63.0).abs() < f64::EPSILON);
        assert!((v[4] - 233.0).abs() < f64::EPSILON);
        assert!((v[9] - 2.3).abs() < f64::EPSILON);
        assert!((v[12] - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_to_frame_carries_training_names() {
        let frame = record().to_frame();
        assert_eq!(frame.columns(), FEATURE_NAMES.map(String::from).as_slice());
        assert_eq!(frame.value("chol"), Some(233.0));
        assert_eq!(frame.value("thal"), Some(6.0));
    }
}
