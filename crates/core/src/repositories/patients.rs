//! Patient record files.
//!
//! Patients live at `patients/<s1>/<s2>/<key>/patient.yaml`, where `key` is derived from the
//! hospital number so the number itself never appears in a path.

use super::shared::{load_all, read_record};
use crate::config::CoreConfig;
use crate::constants::{PATIENTS_DIR_NAME, PATIENT_YAML_FILENAME};
use crate::model::Patient;
use crate::RecordResult;
use icr_uuid::PatientKey;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub(crate) struct PatientRepository {
    cfg: Arc<CoreConfig>,
}

impl PatientRepository {
    pub(crate) fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    /// Path of the patient file relative to the data directory.
    pub(crate) fn relative_path(hospital_number: &str) -> PathBuf {
        PatientKey::for_hospital_number(hospital_number)
            .sharded_dir(Path::new(PATIENTS_DIR_NAME))
            .join(PATIENT_YAML_FILENAME)
    }

    /// The stored patient and its raw file text, if any.
    pub(crate) fn load(&self, hospital_number: &str) -> RecordResult<Option<(Patient, String)>> {
        read_record(&self.cfg.data_dir().join(Self::relative_path(hospital_number)))
    }

    pub(crate) fn list(&self) -> Vec<Patient> {
        load_all(&self.cfg.patients_dir(), PATIENT_YAML_FILENAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PatientDetails;
    use crate::NonEmptyText;
    use chrono::Utc;
    use std::fs;
    use tempfile::TempDir;

    fn test_cfg(data_dir: &Path) -> Arc<CoreConfig> {
        Arc::new(
            CoreConfig::new(data_dir.to_path_buf(), "records@example.org")
                .expect("CoreConfig::new should succeed"),
        )
    }

    #[test]
    fn relative_path_hides_hospital_number() {
        let path = PatientRepository::relative_path("HN-0001");
        let rendered = path.to_string_lossy();
        assert!(rendered.starts_with("patients/"));
        assert!(rendered.ends_with("/patient.yaml"));
        assert!(!rendered.contains("HN-0001"));
        assert_eq!(path, PatientRepository::relative_path("HN-0001"));
    }

    #[test]
    fn load_returns_none_then_stored_patient() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let repo = PatientRepository::new(test_cfg(temp_dir.path()));
        assert!(repo.load("HN1").unwrap().is_none());

        let patient = Patient::new(
            NonEmptyText::new("HN1").unwrap(),
            PatientDetails::default(),
            "nurse",
            Utc::now(),
        );
        let full = temp_dir.path().join(PatientRepository::relative_path("HN1"));
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(&full, serde_yaml::to_string(&patient).unwrap()).unwrap();

        let (loaded, raw) = repo.load("HN1").unwrap().expect("patient should exist");
        assert_eq!(loaded, patient);
        assert!(raw.contains("hospitalNumber: HN1"));
    }

    #[test]
    fn list_skips_invalid_yaml() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let repo = PatientRepository::new(test_cfg(temp_dir.path()));

        let bad = temp_dir.path().join(PatientRepository::relative_path("HN-BAD"));
        fs::create_dir_all(bad.parent().unwrap()).unwrap();
        fs::write(&bad, "hospitalNumber: [unclosed").unwrap();

        assert!(repo.list().is_empty(), "should skip unparsable patient files");
    }
}
