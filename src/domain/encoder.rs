//! Feature encoder: raw form answers to the trained numeric encoding.
//!
//! The form widgets already clamp numbers and restrict choices, so this is a
//! pure mapping. Categorical codes are explicit lookups kept here so they can
//! be audited and tested without the UI.

use serde::{Deserialize, Serialize};

use super::patient::PatientRecord;

/// Sex as presented in the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Choices in form order.
    pub const CHOICES: [Sex; 2] = [Sex::Male, Sex::Female];

    /// Training code: Male = 1, Female = 0.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::Male => 1,
            Self::Female => 0,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Male" => Some(Self::Male),
            "Female" => Some(Self::Female),
            _ => None,
        }
    }
}

/// Yes/No answer as presented in the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YesNo {
    No,
    Yes,
}

impl YesNo {
    /// Choices in form order.
    pub const CHOICES: [YesNo; 2] = [YesNo::No, YesNo::Yes];

    /// Training code: Yes = 1, No = 0.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::No => 0,
            Self::Yes => 1,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::No => "No",
            Self::Yes => "Yes",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "No" => Some(Self::No),
            "Yes" => Some(Self::Yes),
            _ => None,
        }
    }
}

/// Form state before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPatientInput {
    pub age: i64,
    pub sex: Sex,
    pub cp: i64,
    pub trestbps: i64,
    pub chol: i64,
    pub fbs: YesNo,
    pub restecg: i64,
    pub thalach: i64,
    pub exang: YesNo,
    pub oldpeak: f64,
    pub slope: i64,
    pub ca: i64,
    pub thal: i64,
}

impl Default for RawPatientInput {
    /// Initial values shown when the form opens.
    fn default() -> Self {
        Self {
            age: 50,
            sex: Sex::Male,
            cp: 1,
            trestbps: 120,
            chol: 200,
            fbs: YesNo::No,
            restecg: 0,
            thalach: 150,
            exang: YesNo::No,
            oldpeak: 1.0,
            slope: 1,
            ca: 0,
            thal: 3,
        }
    }
}

/// Map form answers to the record the classifier expects.
#[must_use]
pub fn encode(input: &RawPatientInput) -> PatientRecord {
    PatientRecord {
        age: input.age,
        sex: input.sex.code(),
        cp: input.cp,
        trestbps: input.trestbps,
        chol: input.chol,
        fbs: input.fbs.code(),
        restecg: input.restecg,
        thalach: input.thalach,
        exang: input.exang.code(),
        oldpeak: input.oldpeak,
        slope: input.slope,
        ca: input.ca,
        thal: input.thal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::patient::{FEATURE_COUNT, FEATURE_NAMES};

    #[test]
    fn test_categorical_lookup() {
        assert_eq!(Sex::Male.code(), 1);
        assert_eq!(Sex::Female.code(), 0);
        assert_eq!(YesNo::Yes.code(), 1);
        assert_eq!(YesNo::No.code(), 0);
        assert_eq!(Sex::from_label("Female"), Some(Sex::Female));
        assert_eq!(YesNo::from_label("maybe"), None);
    }

    #[test]
    fn test_male_no_no_scenario() {
        let input = RawPatientInput {
            sex: Sex::Male,
            fbs: YesNo::No,
            exang: YesNo::No,
            ..RawPatientInput::default()
        };
        let record = encode(&input);
        assert_eq!(record.sex, 1);
        assert_eq!(record.fbs, 0);
        assert_eq!(record.exang, 0);
    }

    #[test]
    fn test_every_categorical_combination_encodes_to_binary() {
        for sex in Sex::CHOICES {
            for fbs in YesNo::CHOICES {
                for exang in YesNo::CHOICES {
                    let input = RawPatientInput {
                        sex,
                        fbs,
                        exang,
                        ..RawPatientInput::default()
                    };
                    let frame = encode(&input).to_frame();
                    assert_eq!(frame.len(), FEATURE_COUNT);
                    assert_eq!(frame.columns()[1], FEATURE_NAMES[1]);
                    for col in ["sex", "fbs", "exang"] {
                        let v = frame.value(col).unwrap();
                        assert!(v == 0.0 || v == 1.0, "{col} encoded as {v}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_encoding_is_idempotent() {
        let input = RawPatientInput {
            sex: Sex::Female,
            exang: YesNo::Yes,
            oldpeak: 3.4,
            ..RawPatientInput::default()
        };
        assert_eq!(encode(&input), encode(&input));
    }

    #[test]
    fn test_boundary_values_pass_through() {
        for (age, oldpeak) in [(1, 0.0), (120, 10.0)] {
            let input = RawPatientInput {
                age,
                oldpeak,
                ..RawPatientInput::default()
            };
            let record = encode(&input);
            assert_eq!(record.age, age);
            assert!((record.oldpeak - oldpeak).abs() < f64::EPSILON);
        }
    }
}
