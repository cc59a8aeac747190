//! Record types: patients, assessments and the coded values they use.

pub mod assessment;
pub mod codes;
pub(crate) mod lenient;
pub mod patient;

pub use assessment::{
    Assessment, AssessmentInput, AssessmentPatch, AssessmentRecord, AssessmentSummary,
    PatientHistory,
};
pub use codes::{
    AssessmentRound, ComplianceStatus, Diagnosis, MedicationStatus, PatientType, SpacerType,
};
pub use lenient::parse_assessment_date;
pub use patient::{Patient, PatientDetails};

use crate::{RecordError, RecordResult};
use serde::de::DeserializeOwned;
use serde_json::Value;

fn error_path(path: String) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path
    }
}

/// Decode a request body, reporting the path of the first field that does not fit.
///
/// # Errors
///
/// Returns `RecordError::SchemaMismatch` naming the failing field.
pub fn parse_json<T: DeserializeOwned>(body: Value) -> RecordResult<T> {
    serde_path_to_error::deserialize::<_, T>(body).map_err(|err| {
        let path = error_path(err.path().to_string());
        RecordError::SchemaMismatch {
            path,
            message: err.into_inner().to_string(),
        }
    })
}

/// Decode a stored YAML record.
///
/// # Errors
///
/// Returns `RecordError::YamlDeserialization` when the file does not match the record type.
pub(crate) fn parse_yaml<T: DeserializeOwned>(yaml_text: &str) -> RecordResult<T> {
    let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
    serde_path_to_error::deserialize::<_, T>(deserializer).map_err(|err| {
        let path = error_path(err.path().to_string());
        let source = err.into_inner();
        tracing::debug!("stored record schema mismatch at {path}: {source}");
        RecordError::YamlDeserialization(source)
    })
}
