//! Pipeline adapter: Implementation of Classifier over an exported model.
//!
//! The training side exports a scikit-learn style pipeline as JSON: an
//! optional `column_transformer` preprocessing step followed by a linear
//! classifier. This module loads that export once, validates its structure,
//! and scores single rows against it.
//!
//! # Schema
//!
//! Input frames must carry exactly the columns recorded in
//! `feature_names_in`, in the same order. Any difference is reported as
//! `ClassifierError::SchemaMismatch` and no score is produced.
//!
//! # Probability estimation
//!
//! - `logistic_regression`: sigmoid of the decision value, `[1 - p, p]`
//! - `linear_svc`: label only, `predict_proba` returns `None`

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::adapters::signature::{self, SignaturePolicy};
use crate::domain::FeatureFrame;
use crate::ports::{Classifier, ClassifierError, StepDescription};

/// Only export format this adapter understands.
const SUPPORTED_FORMAT_VERSION: u32 = 1;

/// Tolerance when matching a value against a one-hot category.
const CATEGORY_EPSILON: f64 = 1e-9;

/// Error type for model loading.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model file not found at {0:?}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid model file: {0}")]
    Format(String),

    #[error("invalid model structure: {0}")]
    Invalid(String),

    #[error("signature verification failed: {0}")]
    Signature(String),
}

/// What a one-hot encoder does with a category it never saw in training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    #[default]
    Error,
    Ignore,
}

/// Per-column-group transformation inside the preprocessor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformerKind {
    StandardScaler {
        mean: Vec<f64>,
        scale: Vec<f64>,
    },
    OneHot {
        categories: Vec<Vec<f64>>,
        #[serde(default)]
        handle_unknown: HandleUnknown,
    },
    Passthrough,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transformer {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(flatten)]
    pub kind: TransformerKind,
}

impl Transformer {
    fn kind_name(&self) -> &'static str {
        match self.kind {
            TransformerKind::StandardScaler { .. } => "standard_scaler",
            TransformerKind::OneHot { .. } => "one_hot",
            TransformerKind::Passthrough => "passthrough",
        }
    }

    fn output_width(&self) -> usize {
        match &self.kind {
            TransformerKind::OneHot { categories, .. } => categories.iter().map(Vec::len).sum(),
            _ => self.columns.len(),
        }
    }

    fn output_names(&self) -> Vec<String> {
        match &self.kind {
            TransformerKind::OneHot { categories, .. } => self
                .columns
                .iter()
                .zip(categories)
                .flat_map(|(col, cats)| {
                    cats.iter()
                        .map(move |c| format!("{}__{}_{}", self.name, col, format_category(*c)))
                })
                .collect(),
            _ => self
                .columns
                .iter()
                .map(|col| format!("{}__{}", self.name, col))
                .collect(),
        }
    }
}

/// One named pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedStep {
    pub name: String,
    #[serde(flatten)]
    pub kind: StepKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    ColumnTransformer { transformers: Vec<Transformer> },
    LogisticRegression { coef: Vec<f64>, intercept: f64 },
    LinearSvc { coef: Vec<f64>, intercept: f64 },
}

impl StepKind {
    fn type_name(&self) -> &'static str {
        match self {
            Self::ColumnTransformer { .. } => "column_transformer",
            Self::LogisticRegression { .. } => "logistic_regression",
            Self::LinearSvc { .. } => "linear_svc",
        }
    }

    fn is_estimator(&self) -> bool {
        !matches!(self, Self::ColumnTransformer { .. })
    }
}

/// Pipeline as written by the training export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedPipeline {
    pub format_version: u32,
    pub feature_names_in: Vec<String>,
    pub steps: Vec<ExportedStep>,
}

/// A loaded, validated pipeline. Read-only after construction.
#[derive(Debug, Clone)]
pub struct PipelineModel {
    export: ExportedPipeline,
}

impl PipelineModel {
    /// Load a pipeline export from disk, verifying its signed manifest
    /// according to `policy`.
    ///
    /// # Errors
    /// Returns error if the file is missing, unreadable, fails signature
    /// verification, or does not describe a valid pipeline.
    pub fn load(path: &Path, policy: &SignaturePolicy) -> Result<Self, ModelError> {
        if !path.is_file() {
            return Err(ModelError::NotFound(path.to_path_buf()));
        }

        signature::verify_artifact(path, policy)?;

        let content = std::fs::read_to_string(path)?;
        let model = Self::from_json(&content)?;

        tracing::info!(
            "Loaded model from {:?} (n_features_in={}, steps=[{}])",
            path,
            model.export.feature_names_in.len(),
            model
                .export
                .steps
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(model)
    }

    /// Parse and validate a pipeline export.
    ///
    /// # Errors
    /// Returns `ModelError::Format` on malformed JSON and
    /// `ModelError::Invalid` on inconsistent parameters.
    pub fn from_json(content: &str) -> Result<Self, ModelError> {
        let export: ExportedPipeline =
            serde_json::from_str(content).map_err(|e| ModelError::Format(e.to_string()))?;
        Self::from_export(export)
    }

    /// Validate an already-parsed export.
    ///
    /// # Errors
    /// Returns `ModelError::Invalid` on inconsistent parameters.
    pub fn from_export(export: ExportedPipeline) -> Result<Self, ModelError> {
        validate(&export)?;
        Ok(Self { export })
    }

    fn preprocessor(&self) -> Option<&[Transformer]> {
        self.export.steps.iter().find_map(|s| match &s.kind {
            StepKind::ColumnTransformer { transformers } => Some(transformers.as_slice()),
            _ => None,
        })
    }

    fn estimator(&self) -> &StepKind {
        // validate() guarantees the last step is an estimator.
        &self.export.steps[self.export.steps.len() - 1].kind
    }

    fn check_schema(&self, frame: &FeatureFrame) -> Result<(), ClassifierError> {
        if frame.columns() != self.export.feature_names_in.as_slice() {
            return Err(ClassifierError::SchemaMismatch {
                expected: self.export.feature_names_in.clone(),
                got: frame.columns().to_vec(),
            });
        }
        Ok(())
    }

    fn transform(&self, frame: &FeatureFrame) -> Result<Vec<f64>, ClassifierError> {
        self.check_schema(frame)?;

        let Some(transformers) = self.preprocessor() else {
            return Ok(frame.values().to_vec());
        };

        let mut out = Vec::new();
        for t in transformers {
            for (j, col) in t.columns.iter().enumerate() {
                let x = frame
                    .value(col)
                    .ok_or_else(|| ClassifierError::MissingColumn(col.clone()))?;
                match &t.kind {
                    TransformerKind::StandardScaler { mean, scale } => {
                        // Zero-variance columns are left unscaled.
                        let s = if scale[j] == 0.0 { 1.0 } else { scale[j] };
                        out.push((x - mean[j]) / s);
                    }
                    TransformerKind::OneHot {
                        categories,
                        handle_unknown,
                    } => {
                        let cats = &categories[j];
                        let hit = cats.iter().position(|c| (c - x).abs() < CATEGORY_EPSILON);
                        if hit.is_none() && *handle_unknown == HandleUnknown::Error {
                            return Err(ClassifierError::Internal(format!(
                                "Found unknown categories [{}] in column {col:?} during transform",
                                format_category(x)
                            )));
                        }
                        out.extend((0..cats.len()).map(|k| if Some(k) == hit { 1.0 } else { 0.0 }));
                    }
                    TransformerKind::Passthrough => out.push(x),
                }
            }
        }
        Ok(out)
    }

    fn decision_function(&self, frame: &FeatureFrame) -> Result<f64, ClassifierError> {
        let x = self.transform(frame)?;
        let (coef, intercept) = match self.estimator() {
            StepKind::LogisticRegression { coef, intercept }
            | StepKind::LinearSvc { coef, intercept } => (coef, *intercept),
            StepKind::ColumnTransformer { .. } => {
                return Err(ClassifierError::Internal(
                    "final pipeline step is not an estimator".into(),
                ))
            }
        };

        if x.len() != coef.len() {
            return Err(ClassifierError::Shape(format!(
                "X has {} features, but {} is expecting {} features as input",
                x.len(),
                self.estimator().type_name(),
                coef.len()
            )));
        }

        let z = x.iter().zip(coef).map(|(a, b)| a * b).sum::<f64>() + intercept;
        if !z.is_finite() {
            return Err(ClassifierError::Internal(
                "decision value is not finite".into(),
            ));
        }
        Ok(z)
    }
}

impl Classifier for PipelineModel {
    fn predict(&self, frame: &FeatureFrame) -> Result<u8, ClassifierError> {
        let z = self.decision_function(frame)?;
        Ok(u8::from(z > 0.0))
    }

    fn predict_proba(&self, frame: &FeatureFrame) -> Option<Result<Vec<f64>, ClassifierError>> {
        match self.estimator() {
            StepKind::LogisticRegression { .. } => Some(self.decision_function(frame).map(|z| {
                let p = sigmoid(z);
                vec![1.0 - p, p]
            })),
            _ => None,
        }
    }

    fn feature_names_in(&self) -> Option<&[String]> {
        Some(&self.export.feature_names_in)
    }

    fn named_step(&self, name: &str) -> Option<StepDescription> {
        let step = self.export.steps.iter().find(|s| s.name == name)?;
        let details = match &step.kind {
            StepKind::ColumnTransformer { transformers } => transformers
                .iter()
                .map(|t| format!("{}: {} [{}]", t.name, t.kind_name(), t.columns.join(", ")))
                .collect(),
            StepKind::LogisticRegression { coef, intercept }
            | StepKind::LinearSvc { coef, intercept } => vec![
                format!("n_features_in={}", coef.len()),
                format!("intercept={intercept:.4}"),
            ],
        };
        Some(StepDescription {
            name: step.name.clone(),
            kind: step.kind.type_name().to_string(),
            details,
        })
    }

    fn feature_names_out(&self, step: &str) -> Result<Vec<String>, ClassifierError> {
        let found = self
            .export
            .steps
            .iter()
            .find(|s| s.name == step)
            .ok_or_else(|| ClassifierError::Unsupported(format!("no step named {step:?}")))?;
        match &found.kind {
            StepKind::ColumnTransformer { transformers } => {
                Ok(transformers.iter().flat_map(Transformer::output_names).collect())
            }
            other => Err(ClassifierError::Unsupported(format!(
                "{} does not provide output feature names",
                other.type_name()
            ))),
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

// Integral categories print without a fractional part (`cp_4`, not `cp_4.0`).
fn format_category(c: f64) -> String {
    if c.fract() == 0.0 && c.abs() < 1e15 {
        format!("{}", c as i64)
    } else {
        format!("{c}")
    }
}

fn validate(export: &ExportedPipeline) -> Result<(), ModelError> {
    if export.format_version != SUPPORTED_FORMAT_VERSION {
        return Err(ModelError::Invalid(format!(
            "unsupported format_version {} (expected {SUPPORTED_FORMAT_VERSION})",
            export.format_version
        )));
    }

    let names = &export.feature_names_in;
    if names.is_empty() {
        return Err(ModelError::Invalid("feature_names_in is empty".into()));
    }
    let unique: HashSet<&str> = names.iter().map(String::as_str).collect();
    if unique.len() != names.len() {
        return Err(ModelError::Invalid(
            "feature_names_in contains duplicates".into(),
        ));
    }

    let Some((last, rest)) = export.steps.split_last() else {
        return Err(ModelError::Invalid("pipeline has no steps".into()));
    };
    if !last.kind.is_estimator() {
        return Err(ModelError::Invalid(format!(
            "final step {:?} is not a classifier",
            last.name
        )));
    }
    if rest.iter().any(|s| s.kind.is_estimator()) {
        return Err(ModelError::Invalid(
            "only the final step may be a classifier".into(),
        ));
    }
    if rest.len() > 1 {
        return Err(ModelError::Invalid(
            "at most one preprocessing step is supported".into(),
        ));
    }

    let mut width = names.len();
    if let Some(step) = rest.first() {
        let StepKind::ColumnTransformer { transformers } = &step.kind else {
            return Err(ModelError::Invalid(format!(
                "step {:?} is not a column_transformer",
                step.name
            )));
        };
        width = 0;
        for t in transformers {
            for col in &t.columns {
                if !unique.contains(col.as_str()) {
                    return Err(ModelError::Invalid(format!(
                        "transformer {:?} references unknown column {col:?}",
                        t.name
                    )));
                }
            }
            let n = t.columns.len();
            match &t.kind {
                TransformerKind::StandardScaler { mean, scale } => {
                    if mean.len() != n || scale.len() != n {
                        return Err(ModelError::Invalid(format!(
                            "transformer {:?}: mean/scale lengths do not match columns",
                            t.name
                        )));
                    }
                }
                TransformerKind::OneHot { categories, .. } => {
                    if categories.len() != n || categories.iter().any(Vec::is_empty) {
                        return Err(ModelError::Invalid(format!(
                            "transformer {:?}: categories do not match columns",
                            t.name
                        )));
                    }
                }
                TransformerKind::Passthrough => {}
            }
            width += t.output_width();
        }
    }

    match &last.kind {
        StepKind::LogisticRegression { coef, .. } | StepKind::LinearSvc { coef, .. } => {
            if coef.len() != width {
                return Err(ModelError::Invalid(format!(
                    "classifier expects {} inputs but preprocessing yields {width}",
                    coef.len()
                )));
            }
        }
        StepKind::ColumnTransformer { .. } => {}
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Model exports shared by tests across the crate.

    use crate::domain::FEATURE_NAMES;

    /// A pipeline with no preprocessing whose decision value is the intercept,
    /// so the label and probability are fully determined by `intercept`.
    pub fn constant_model_json(estimator: &str, intercept: f64) -> String {
        serde_json::json!({
            "format_version": 1,
            "feature_names_in": FEATURE_NAMES,
            "steps": [
                {
                    "name": "classifier",
                    "type": estimator,
                    "coef": vec![0.0; FEATURE_NAMES.len()],
                    "intercept": intercept,
                }
            ]
        })
        .to_string()
    }

    /// Intercept whose sigmoid is `p`.
    pub fn logit(p: f64) -> f64 {
        (p / (1.0 - p)).ln()
    }

    /// A realistic pipeline with scaling, one-hot encoding and passthrough.
    pub fn heart_pipeline_json() -> String {
        serde_json::json!({
            "format_version": 1,
            "feature_names_in": FEATURE_NAMES,
            "steps": [
                {
                    "name": "preprocessor",
                    "type": "column_transformer",
                    "transformers": [
                        {
                            "name": "num",
                            "kind": "standard_scaler",
                            "columns": ["age", "trestbps", "chol", "thalach", "oldpeak"],
                            "mean": [54.4, 131.7, 246.7, 149.6, 1.04],
                            "scale": [9.0, 17.6, 51.7, 22.9, 1.16]
                        },
                        {
                            "name": "cat",
                            "kind": "one_hot",
                            "columns": ["cp", "restecg", "slope", "thal"],
                            "categories": [[1, 2, 3, 4], [0, 1, 2], [1, 2, 3], [3, 6, 7]]
                        },
                        {
                            "name": "remainder",
                            "kind": "passthrough",
                            "columns": ["sex", "fbs", "exang", "ca"]
                        }
                    ]
                },
                {
                    "name": "classifier",
                    "type": "logistic_regression",
                    "coef": [
                        0.10, 0.25, 0.05, -0.55, 0.50,
                        -0.60, -0.20, -0.45, 0.85,
                        -0.25, 0.10, 0.15,
                        -0.40, 0.30, 0.10,
                        -0.70, 0.15, 0.55,
                        0.70, -0.05, 0.55, 0.75
                    ],
                    "intercept": -0.9
                }
            ]
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{constant_model_json, heart_pipeline_json, logit};
    use super::*;
    use crate::domain::{encode, RawPatientInput, FEATURE_NAMES};

    fn frame() -> FeatureFrame {
        encode(&RawPatientInput::default()).to_frame()
    }

    #[test]
    fn test_logistic_probability_and_label() {
        let model =
            PipelineModel::from_json(&constant_model_json("logistic_regression", logit(0.82)))
                .expect("valid model");
        assert_eq!(model.predict(&frame()).unwrap(), 1);
        let proba = model.predict_proba(&frame()).unwrap().unwrap();
        assert_eq!(proba.len(), 2);
        assert!((proba[1] - 0.82).abs() < 1e-9);
        assert!((proba[0] + proba[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_svc_has_no_probability() {
        let model = PipelineModel::from_json(&constant_model_json("linear_svc", -1.0))
            .expect("valid model");
        assert_eq!(model.predict(&frame()).unwrap(), 0);
        assert!(model.predict_proba(&frame()).is_none());
    }

    #[test]
    fn test_schema_mismatch_on_reordered_columns() {
        let model = PipelineModel::from_json(&heart_pipeline_json()).expect("valid model");
        let mut columns: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        columns.swap(0, 1);
        let bad = FeatureFrame::new(columns, frame().values().to_vec()).unwrap();

        match model.predict(&bad) {
            Err(ClassifierError::SchemaMismatch { expected, got }) => {
                assert_eq!(expected[0], "age");
                assert_eq!(got[0], "sex");
            }
            other => panic!("expected schema mismatch, got {other:?}"),
        }
        assert!(matches!(
            model.predict_proba(&bad),
            Some(Err(ClassifierError::SchemaMismatch { .. }))
        ));
    }

    #[test]
    fn test_full_pipeline_scores_default_input() {
        let model = PipelineModel::from_json(&heart_pipeline_json()).expect("valid model");
        let label = model.predict(&frame()).unwrap();
        let proba = model.predict_proba(&frame()).unwrap().unwrap();
        assert!(label <= 1);
        assert!((0.0..=1.0).contains(&proba[1]));
        assert_eq!(label == 1, proba[1] > 0.5);
    }

    #[test]
    fn test_unknown_category_is_an_error() {
        let model = PipelineModel::from_json(&heart_pipeline_json()).expect("valid model");
        let record = crate::domain::PatientRecord {
            thal: 5,
            ..encode(&RawPatientInput::default())
        };
        let err = model.predict(&record.to_frame()).unwrap_err();
        assert!(err.to_string().contains("unknown categories [5]"));
    }

    #[test]
    fn test_unknown_category_is_ignored_when_configured() {
        let mut json: serde_json::Value =
            serde_json::from_str(&heart_pipeline_json()).expect("fixture is json");
        json["steps"][0]["transformers"][1]["handle_unknown"] = "ignore".into();
        let model = PipelineModel::from_json(&json.to_string()).expect("valid model");

        let record = crate::domain::PatientRecord {
            thal: 5,
            ..encode(&RawPatientInput::default())
        };
        let x = model.transform(&record.to_frame()).expect("unknown category ignored");
        assert_eq!(x.len(), 22);
        // thal block follows 5 scaled, 4 cp, 3 restecg and 3 slope columns
        assert_eq!(&x[15..18], &[0.0, 0.0, 0.0]);
        assert!(model.predict(&record.to_frame()).is_ok());
    }

    #[test]
    fn test_feature_names_out_for_preprocessor() {
        let model = PipelineModel::from_json(&heart_pipeline_json()).expect("valid model");
        let names = model.feature_names_out("preprocessor").unwrap();
        assert_eq!(names.len(), 22);
        assert_eq!(names[0], "num__age");
        assert_eq!(names[5], "cat__cp_1");
        assert_eq!(names[21], "remainder__ca");
        assert!(matches!(
            model.feature_names_out("classifier"),
            Err(ClassifierError::Unsupported(_))
        ));
    }

    #[test]
    fn test_named_step_description() {
        let model = PipelineModel::from_json(&heart_pipeline_json()).expect("valid model");
        let step = model.named_step("preprocessor").unwrap();
        assert_eq!(step.kind, "column_transformer");
        assert_eq!(step.details.len(), 3);
        assert!(step.details[0].starts_with("num: standard_scaler"));
        assert!(model.named_step("missing").is_none());
    }

    #[test]
    fn test_rejects_width_mismatch() {
        let json = serde_json::json!({
            "format_version": 1,
            "feature_names_in": ["a", "b"],
            "steps": [{"name": "classifier", "type": "logistic_regression", "coef": [1.0], "intercept": 0.0}]
        })
        .to_string();
        let err = PipelineModel::from_json(&json).unwrap_err();
        assert!(matches!(err, ModelError::Invalid(_)));
    }

    #[test]
    fn test_rejects_unknown_transformer_column() {
        let json = serde_json::json!({
            "format_version": 1,
            "feature_names_in": ["a"],
            "steps": [
                {"name": "preprocessor", "type": "column_transformer", "transformers": [
                    {"name": "num", "kind": "passthrough", "columns": ["z"]}
                ]},
                {"name": "classifier", "type": "linear_svc", "coef": [1.0], "intercept": 0.0}
            ]
        })
        .to_string();
        let err = PipelineModel::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("unknown column \"z\""));
    }

    #[test]
    fn test_rejects_garbage() {
        let err = PipelineModel::from_json("not json").unwrap_err();
        assert!(matches!(err, ModelError::Format(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("final_model.json");
        let err = PipelineModel::load(&path, &SignaturePolicy::default()).unwrap_err();
        assert!(matches!(err, ModelError::NotFound(_)));
    }

    #[test]
    fn test_load_unsigned_file_when_not_required() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("final_model.json");
        std::fs::write(&path, heart_pipeline_json()).unwrap();
        let model = PipelineModel::load(&path, &SignaturePolicy::default()).expect("loads");
        assert_eq!(model.feature_names_in().unwrap().len(), 13);
    }

    #[test]
    fn test_shipped_model_is_valid() {
        let model = PipelineModel::from_json(include_str!("../../../models/final_model.json"))
            .expect("shipped model parses");
        let record = crate::domain::encode(&crate::domain::RawPatientInput::default());
        let label = model.predict(&record.to_frame()).expect("predicts");
        assert!(label <= 1);
        let proba = model.predict_proba(&record.to_frame()).unwrap().unwrap();
        assert!((proba[0] + proba[1] - 1.0).abs() < 1e-9);
    }
}
