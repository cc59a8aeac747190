//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services. Core
//! code never reads environment variables during request handling.

use crate::constants::{ASSESSMENTS_DIR_NAME, DEFAULT_DATA_DIR, PATIENTS_DIR_NAME};
use crate::{NonEmptyText, RecordError, RecordResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    commit_email: NonEmptyText,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidInput` if `commit_email` is blank, multi-line or has no `@`.
    pub fn new(data_dir: PathBuf, commit_email: impl AsRef<str>) -> RecordResult<Self> {
        let commit_email = NonEmptyText::single_line(commit_email)
            .ok()
            .filter(|email| email.as_str().contains('@'))
            .ok_or_else(|| {
                RecordError::InvalidInput("commit email must be a single-line address".into())
            })?;

        Ok(Self {
            data_dir,
            commit_email,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn patients_dir(&self) -> PathBuf {
        self.data_dir.join(PATIENTS_DIR_NAME)
    }

    pub fn assessments_dir(&self) -> PathBuf {
        self.data_dir.join(ASSESSMENTS_DIR_NAME)
    }

    pub fn commit_email(&self) -> &str {
        self.commit_email.as_str()
    }
}

/// Resolve the record storage directory, creating it when missing.
///
/// `override_dir` normally comes from `ICR_DATA_DIR`; without it [`DEFAULT_DATA_DIR`] relative
/// to the working directory is used.
pub fn resolve_data_dir(override_dir: Option<PathBuf>) -> RecordResult<PathBuf> {
    let dir = override_dir
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

    if dir.exists() && !dir.is_dir() {
        return Err(RecordError::InvalidInput(format!(
            "data directory is not a directory: {}",
            dir.display()
        )));
    }

    std::fs::create_dir_all(&dir).map_err(RecordError::StorageDirCreation)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn new_rejects_blank_or_malformed_email() {
        let dir = PathBuf::from("/tmp/records");
        assert!(CoreConfig::new(dir.clone(), "  ").is_err());
        assert!(CoreConfig::new(dir.clone(), "records").is_err());
        assert!(CoreConfig::new(dir.clone(), "a@b\nc").is_err());
        assert!(CoreConfig::new(dir, "records@clinic.example").is_ok());
    }

    #[test]
    fn derived_dirs_sit_under_data_dir() {
        let cfg = CoreConfig::new(PathBuf::from("/srv/icr"), "records@clinic.example")
            .expect("CoreConfig::new should succeed");
        assert_eq!(cfg.patients_dir(), PathBuf::from("/srv/icr/patients"));
        assert_eq!(cfg.assessments_dir(), PathBuf::from("/srv/icr/assessments"));
        assert_eq!(cfg.commit_email(), "records@clinic.example");
    }

    #[test]
    fn resolve_data_dir_creates_missing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let target = temp_dir.path().join("nested").join("records");
        let resolved = resolve_data_dir(Some(target.clone())).expect("should resolve");
        assert_eq!(resolved, target);
        assert!(target.is_dir(), "data directory should be created");
    }

    #[test]
    fn resolve_data_dir_rejects_regular_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let file = temp_dir.path().join("not-a-dir");
        std::fs::write(&file, "x").expect("should write file");
        let err = resolve_data_dir(Some(file)).expect_err("should reject file path");
        assert!(matches!(err, RecordError::InvalidInput(_)));
    }
}
