//! Session: load the classifier once, then serve predictions.
//!
//! A session that failed to load its model is halted for its whole lifetime.
//! It keeps the load error message and refuses every later prediction.

use std::sync::Arc;

use crate::adapters::PipelineModel;
use crate::application::inference::{DiagnosticReport, InferenceService};
use crate::config::AppConfig;
use crate::domain::{encode, FeatureFrame, RawPatientInput, Verdict};
use crate::ports::Classifier;
use crate::HeartcheckError;

/// Lifecycle state of a session.
enum SessionState<C: Classifier> {
    /// Model loaded; predictions allowed
    Ready(InferenceService<C>),
    /// Model failed to load; holds the message shown to the user
    Halted(String),
}

/// One user's interaction with the loaded model.
pub struct Session<C: Classifier = PipelineModel> {
    state: SessionState<C>,
}

impl Session<PipelineModel> {
    /// Load the configured model artifact and start a session.
    ///
    /// A load failure does not return an error: it produces a halted session
    /// so the UI can show the message and stop.
    #[must_use]
    pub fn start(config: &AppConfig) -> Self {
        match PipelineModel::load(&config.model_path, &config.signature) {
            Ok(model) => Self::with_classifier(Arc::new(model)),
            Err(e) => {
                let err = HeartcheckError::from(e);
                tracing::error!("{err}");
                Self::halted(err.to_string())
            }
        }
    }
}

impl<C: Classifier> Session<C> {
    /// Start a session around an already loaded classifier.
    pub fn with_classifier(classifier: Arc<C>) -> Self {
        Self {
            state: SessionState::Ready(InferenceService::new(classifier)),
        }
    }

    /// A session that will never serve predictions.
    pub fn halted(message: impl Into<String>) -> Self {
        Self {
            state: SessionState::Halted(message.into()),
        }
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        matches!(self.state, SessionState::Halted(_))
    }

    /// The load error that halted this session.
    #[must_use]
    pub fn halt_reason(&self) -> Option<&str> {
        match &self.state {
            SessionState::Halted(msg) => Some(msg.as_str()),
            SessionState::Ready(_) => None,
        }
    }

    /// Encoded single-row frame for the input preview.
    #[must_use]
    pub fn preview(&self, input: &RawPatientInput) -> FeatureFrame {
        encode(input).to_frame()
    }

    /// Encode the form answers and run inference.
    ///
    /// # Errors
    /// Returns `HeartcheckError::SessionHalted` if the model never loaded, or
    /// `HeartcheckError::Prediction` if the classifier fails.
    pub fn predict(&self, input: &RawPatientInput) -> Result<Verdict, HeartcheckError> {
        match &self.state {
            SessionState::Ready(service) => service.predict(&encode(input)),
            SessionState::Halted(msg) => Err(HeartcheckError::SessionHalted(msg.clone())),
        }
    }

    /// Diagnostics for the loaded classifier; `None` when halted.
    #[must_use]
    pub fn diagnostics(&self) -> Option<DiagnosticReport> {
        match &self.state {
            SessionState::Ready(service) => Some(service.diagnostics()),
            SessionState::Halted(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::pipeline::fixtures::{constant_model_json, logit};
    use crate::application::inference::mock::MockClassifier;
    use crate::domain::{RiskLevel, Sex, YesNo};
    use crate::ports::ClassifierError;
    use std::sync::atomic::Ordering;

    fn config_for(path: std::path::PathBuf) -> AppConfig {
        AppConfig {
            model_path: path,
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_missing_artifact_halts_session() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::start(&config_for(dir.path().join("final_model.json")));

        assert!(session.is_halted());
        let reason = session.halt_reason().unwrap();
        assert!(reason.starts_with("Cannot load model: model file not found"));
        assert!(matches!(
            session.predict(&RawPatientInput::default()),
            Err(HeartcheckError::SessionHalted(_))
        ));
        assert!(session.diagnostics().is_none());
    }

    #[test]
    fn test_corrupt_artifact_halts_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("final_model.json");
        std::fs::write(&path, b"\x80\x04pickle").unwrap();
        let session = Session::start(&config_for(path));
        assert!(session.is_halted());
    }

    #[test]
    fn test_loaded_artifact_serves_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("final_model.json");
        std::fs::write(&path, constant_model_json("logistic_regression", logit(0.82))).unwrap();

        let session = Session::start(&config_for(path));
        assert!(!session.is_halted());
        let verdict = session.predict(&RawPatientInput::default()).unwrap();
        assert_eq!(verdict.risk, RiskLevel::High);
        assert_eq!(verdict.probability_text().as_deref(), Some("0.82"));
    }

    #[test]
    fn test_prediction_error_keeps_session_usable() {
        let mock = Arc::new(MockClassifier::failing(ClassifierError::SchemaMismatch {
            expected: vec!["age".into()],
            got: vec!["AGE".into()],
        }));
        let session = Session::with_classifier(Arc::clone(&mock));

        assert!(matches!(
            session.predict(&RawPatientInput::default()),
            Err(HeartcheckError::Prediction(_))
        ));
        assert!(!session.is_halted());
        assert!(session.predict(&RawPatientInput::default()).is_err());
        assert_eq!(mock.predict_calls.load(Ordering::SeqCst), 2);
        assert!(session.diagnostics().is_some());
    }

    #[test]
    fn test_preview_matches_encoding() {
        let session = Session::<MockClassifier>::halted("no model");
        let input = RawPatientInput {
            sex: Sex::Female,
            fbs: YesNo::Yes,
            ..RawPatientInput::default()
        };
        let frame = session.preview(&input);
        assert_eq!(frame.value("sex"), Some(0.0));
        assert_eq!(frame.value("fbs"), Some(1.0));
        assert_eq!(frame.len(), 13);
    }
}
