//! Domain layer: Core types and pure logic.
//!
//! Nothing in here touches the filesystem, the terminal or the model artifact.

mod encoder;
mod frame;
mod patient;
mod verdict;

pub use encoder::{encode, RawPatientInput, Sex, YesNo};
pub use frame::FeatureFrame;
pub use patient::{PatientRecord, FEATURE_COUNT, FEATURE_NAMES};
pub use verdict::{RiskLevel, Verdict};
