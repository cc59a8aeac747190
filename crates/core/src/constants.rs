//! Constants used throughout the ICR core crate.
//!
//! Path and filename constants live here so storage layout changes happen in one place.

/// Default directory for record storage when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "patient_data";

/// Default email recorded on audit commits.
pub const DEFAULT_COMMIT_EMAIL: &str = "records@icr.invalid";

/// Directory name for patient records.
pub const PATIENTS_DIR_NAME: &str = "patients";

/// Directory name for assessment records.
pub const ASSESSMENTS_DIR_NAME: &str = "assessments";

/// Filename for patient YAML files.
pub const PATIENT_YAML_FILENAME: &str = "patient.yaml";

/// Filename for assessment YAML files.
pub const ASSESSMENT_YAML_FILENAME: &str = "assessment.yaml";

/// Maximum number of rows returned by the quick assessment list.
pub const QUICK_LIST_LIMIT: usize = 100;

/// Number of recent assessments returned alongside a patient lookup.
pub const PATIENT_HISTORY_LIMIT: usize = 5;

/// Window, in days, counted as "recent" on the dashboard.
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// Content of the `.gitignore` written when the record repository is created.
pub const DEFAULT_GITIGNORE: &str = ".DS_Store\n*.tmp\n";
