//! Inference service: Turns an encoded patient record into a verdict.
//!
//! This service coordinates:
//! - Label prediction
//! - Optional positive-class probability extraction
//! - Verdict construction
//! - Best-effort diagnostics after a failed prediction

use std::sync::Arc;

use crate::domain::{PatientRecord, Verdict};
use crate::ports::{Classifier, ClassifierError};
use crate::HeartcheckError;

/// Name of the preprocessing step inspected by diagnostics.
pub const PREPROCESSOR_STEP: &str = "preprocessor";

/// Developer-facing introspection shown after a prediction error.
///
/// Every field is independently best-effort: a failure while collecting one
/// item is recorded as text and never hides the others.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticReport {
    /// Column names the classifier was trained with
    pub feature_names_in: Option<Vec<String>>,
    /// Identity of the preprocessing step, if the pipeline has one
    pub preprocessor: Option<String>,
    /// Output feature names of the preprocessing step, or why they are unavailable
    pub preprocessor_features_out: Result<Vec<String>, String>,
}

/// Service for running single-record inference.
///
/// Holds the classifier loaded at startup. The classifier is never mutated,
/// so the same `Arc` can back any number of services.
pub struct InferenceService<C>
where
    C: Classifier,
{
    classifier: Arc<C>,
}

impl<C> Clone for InferenceService<C>
where
    C: Classifier,
{
    fn clone(&self) -> Self {
        Self {
            classifier: Arc::clone(&self.classifier),
        }
    }
}

impl<C> InferenceService<C>
where
    C: Classifier,
{
    /// Create a new inference service.
    pub fn new(classifier: Arc<C>) -> Self {
        Self { classifier }
    }

    /// Run the classifier on one record.
    ///
    /// 1. Predict the class label
    /// 2. If the classifier estimates probabilities, take the positive class
    /// 3. Map both to a verdict
    ///
    /// # Errors
    /// Returns `HeartcheckError::Prediction` if either call fails. Nothing is
    /// retried and no partial verdict is produced.
    pub fn predict(&self, record: &PatientRecord) -> Result<Verdict, HeartcheckError> {
        let frame = record.to_frame();

        let label = self.classifier.predict(&frame)?;
        if label > 1 {
            return Err(ClassifierError::Internal(format!(
                "expected a binary label, got {label}"
            ))
            .into());
        }

        let probability = match self.classifier.predict_proba(&frame) {
            Some(proba) => Some(positive_class_probability(&proba?)?),
            None => None,
        };

        let verdict = Verdict::from_prediction(label, probability);
        tracing::info!(
            risk = %verdict.risk,
            has_probability = verdict.probability.is_some(),
            "Prediction complete"
        );
        Ok(verdict)
    }

    /// Collect diagnostic information about the loaded classifier.
    ///
    /// Never fails; problems are reported inside the returned report.
    #[must_use]
    pub fn diagnostics(&self) -> DiagnosticReport {
        let feature_names_in = self.classifier.feature_names_in().map(<[String]>::to_vec);
        let preprocessor = self
            .classifier
            .named_step(PREPROCESSOR_STEP)
            .map(|step| step.to_string());
        let preprocessor_features_out = if preprocessor.is_some() {
            self.classifier
                .feature_names_out(PREPROCESSOR_STEP)
                .map_err(|e| e.to_string())
        } else {
            Err(format!("pipeline has no {PREPROCESSOR_STEP:?} step"))
        };

        if let Err(reason) = &preprocessor_features_out {
            tracing::debug!("Preprocessor output names unavailable: {reason}");
        }

        DiagnosticReport {
            feature_names_in,
            preprocessor,
            preprocessor_features_out,
        }
    }
}

/// Pick the positive-class mass from a probability row.
///
/// Binary output yields index 1. Any other width falls back to the first
/// element so a single figure can still be displayed.
fn positive_class_probability(proba: &[f64]) -> Result<f64, ClassifierError> {
    let p = match proba {
        [_, positive] => *positive,
        [first, ..] => *first,
        [] => {
            return Err(ClassifierError::Shape(
                "predict_proba returned no probabilities".into(),
            ))
        }
    };
    if !(0.0..=1.0).contains(&p) {
        return Err(ClassifierError::Internal(format!(
            "probability {p} is outside [0, 1]"
        )));
    }
    Ok(p)
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted classifier for application-level tests.

    use super::*;
    use crate::domain::FeatureFrame;
    use crate::ports::StepDescription;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct MockClassifier {
        pub label: Result<u8, ClassifierError>,
        pub proba: Option<Result<Vec<f64>, ClassifierError>>,
        pub feature_names: Option<Vec<String>>,
        pub has_preprocessor: bool,
        pub predict_calls: AtomicUsize,
    }

    impl MockClassifier {
        pub fn new(label: u8, proba: Option<Vec<f64>>) -> Self {
            Self {
                label: Ok(label),
                proba: proba.map(Ok),
                feature_names: None,
                has_preprocessor: false,
                predict_calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(err: ClassifierError) -> Self {
            Self {
                label: Err(err),
                ..Self::new(0, None)
            }
        }
    }

    impl Classifier for MockClassifier {
        fn predict(&self, _frame: &FeatureFrame) -> Result<u8, ClassifierError> {
            self.predict_calls.fetch_add(1, Ordering::SeqCst);
            self.label.clone()
        }

        fn predict_proba(&self, _frame: &FeatureFrame) -> Option<Result<Vec<f64>, ClassifierError>> {
            self.proba.clone()
        }

        fn feature_names_in(&self) -> Option<&[String]> {
            self.feature_names.as_deref()
        }

        fn named_step(&self, name: &str) -> Option<StepDescription> {
            (self.has_preprocessor && name == PREPROCESSOR_STEP).then(|| StepDescription {
                name: name.to_string(),
                kind: "column_transformer".into(),
                details: vec!["num: standard_scaler [age]".into()],
            })
        }

        fn feature_names_out(&self, _step: &str) -> Result<Vec<String>, ClassifierError> {
            Err(ClassifierError::Unsupported(
                "get_feature_names_out not available".into(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockClassifier;
    use super::*;
    use crate::domain::{encode, RawPatientInput, RiskLevel};

    fn record() -> PatientRecord {
        encode(&RawPatientInput::default())
    }

    #[test]
    fn test_high_risk_with_probability() {
        let svc = InferenceService::new(Arc::new(MockClassifier::new(1, Some(vec![0.18, 0.82]))));
        let verdict = svc.predict(&record()).expect("prediction");
        assert_eq!(verdict.risk, RiskLevel::High);
        assert_eq!(verdict.probability, Some(0.82));
        assert_eq!(verdict.probability_text().as_deref(), Some("0.82"));
    }

    #[test]
    fn test_low_risk_without_probability() {
        let svc = InferenceService::new(Arc::new(MockClassifier::new(0, None)));
        let verdict = svc.predict(&record()).expect("prediction");
        assert_eq!(verdict.risk, RiskLevel::Low);
        assert_eq!(verdict.probability, None);
        assert_eq!(verdict.message(), "Low risk of heart disease");
    }

    #[test]
    fn test_non_binary_probability_uses_first_element() {
        let svc =
            InferenceService::new(Arc::new(MockClassifier::new(0, Some(vec![0.6, 0.3, 0.1]))));
        let verdict = svc.predict(&record()).expect("prediction");
        assert_eq!(verdict.probability, Some(0.6));
    }

    #[test]
    fn test_schema_error_is_surfaced() {
        let err = ClassifierError::SchemaMismatch {
            expected: vec!["age".into()],
            got: vec!["Age".into()],
        };
        let svc = InferenceService::new(Arc::new(MockClassifier::failing(err.clone())));
        match svc.predict(&record()) {
            Err(HeartcheckError::Prediction(e)) => assert_eq!(e, err),
            other => panic!("expected prediction error, got {other:?}"),
        }
    }

    #[test]
    fn test_probability_failure_yields_no_partial_result() {
        let mock = MockClassifier {
            proba: Some(Err(ClassifierError::Internal("boom".into()))),
            ..MockClassifier::new(1, None)
        };
        let svc = InferenceService::new(Arc::new(mock));
        let err = svc.predict(&record()).unwrap_err();
        assert_eq!(err.to_string(), "Prediction error: Classifier failure: boom");
    }

    #[test]
    fn test_rejects_non_binary_label() {
        let svc = InferenceService::new(Arc::new(MockClassifier::new(2, None)));
        assert!(matches!(
            svc.predict(&record()),
            Err(HeartcheckError::Prediction(ClassifierError::Internal(_)))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_probability() {
        let svc = InferenceService::new(Arc::new(MockClassifier::new(1, Some(vec![-0.2, 1.2]))));
        assert!(svc.predict(&record()).is_err());
    }

    #[test]
    fn test_diagnostics_survive_failing_introspection() {
        let mock = MockClassifier {
            feature_names: Some(vec!["age".into(), "sex".into()]),
            has_preprocessor: true,
            ..MockClassifier::new(0, None)
        };
        let report = InferenceService::new(Arc::new(mock)).diagnostics();
        assert_eq!(report.feature_names_in.as_ref().map(Vec::len), Some(2));
        assert_eq!(
            report.preprocessor.as_deref(),
            Some("column_transformer(num: standard_scaler [age])")
        );
        assert!(report
            .preprocessor_features_out
            .unwrap_err()
            .contains("get_feature_names_out"));
    }

    #[test]
    fn test_diagnostics_without_preprocessor() {
        let report = InferenceService::new(Arc::new(MockClassifier::new(0, None))).diagnostics();
        assert!(report.feature_names_in.is_none());
        assert!(report.preprocessor.is_none());
        assert!(report.preprocessor_features_out.is_err());
    }
}
