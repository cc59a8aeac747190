//! Assessment service.
//!
//! ## Storage
//!
//! ```text
//! <data_dir>/
//!   .git/
//!   patients/<s1>/<s2>/<patient-key>/patient.yaml
//!   assessments/<s1>/<s2>/<assessment-id>/assessment.yaml
//! ```
//!
//! A create or update writes the assessment and, when it changed, the patient file in one
//! commit. Deletes remove the assessment file in a commit and leave the patient in place.
//!
//! Writes are serialised through a single lock held for the whole read-modify-commit cycle.
//! Reads take no lock; they may see the previous version of a record while a write is running.

use super::patients::PatientRepository;
use super::shared::{load_all, read_record, to_yaml};
use crate::config::CoreConfig;
use crate::constants::{ASSESSMENTS_DIR_NAME, ASSESSMENT_YAML_FILENAME, PATIENT_HISTORY_LIMIT, QUICK_LIST_LIMIT};
use crate::identity::CallerIdentity;
use crate::listing::{self, AssessmentFilter, SortSpec};
use crate::model::{
    Assessment, AssessmentInput, AssessmentPatch, AssessmentRecord, AssessmentSummary, Patient,
    PatientDetails, PatientHistory, PatientType,
};
use crate::reporting::{self, DashboardStats, ExportRow, ReportSummary};
use crate::versioned_files::{
    CommitAction, CommitAuthor, CommitDomain, CommitMessage, FileToRemove, FileToWrite,
    VersionedFileService,
};
use crate::{NonEmptyText, RecordError, RecordResult};
use chrono::{DateTime, Utc};
use icr_uuid::AssessmentId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Patient state to write alongside an assessment.
struct PatientChange {
    patient: Patient,
    yaml: String,
    old_yaml: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AssessmentService {
    cfg: Arc<CoreConfig>,
    patients: PatientRepository,
    write_lock: Arc<Mutex<()>>,
}

impl AssessmentService {
    /// Open the record store, creating its repository on first use.
    ///
    /// # Errors
    ///
    /// Returns a git or file error if the repository cannot be opened or initialised.
    pub fn new(cfg: Arc<CoreConfig>) -> RecordResult<Self> {
        let author = CommitAuthor::from_identity(&CallerIdentity::unknown(), cfg.commit_email());
        VersionedFileService::ensure_store(cfg.data_dir(), &author)?;

        Ok(Self {
            patients: PatientRepository::new(cfg.clone()),
            cfg,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn lock(&self) -> RecordResult<MutexGuard<'_, ()>> {
        self.write_lock.lock().map_err(|_| RecordError::LockPoisoned)
    }

    fn author(&self, caller: &CallerIdentity) -> CommitAuthor {
        CommitAuthor::from_identity(caller, self.cfg.commit_email())
    }

    fn relative_path(id: &AssessmentId) -> PathBuf {
        id.sharded_dir(Path::new(ASSESSMENTS_DIR_NAME))
            .join(ASSESSMENT_YAML_FILENAME)
    }

    /// Malformed ids cannot name a stored assessment, so they are reported as not found.
    fn parse_id(id: &str) -> RecordResult<AssessmentId> {
        AssessmentId::parse(id.trim()).map_err(|_| RecordError::NotFound("assessment"))
    }

    fn load(&self, id: &AssessmentId) -> RecordResult<Option<(Assessment, String)>> {
        read_record(&self.cfg.data_dir().join(Self::relative_path(id)))
    }

    fn load_existing(&self, id: &AssessmentId) -> RecordResult<(Assessment, String)> {
        self.load(id)?.ok_or(RecordError::NotFound("assessment"))
    }

    /// Create or update the patient for `hospital_number`. `None` when nothing changed.
    fn upsert_patient(
        &self,
        hospital_number: &NonEmptyText,
        details: PatientDetails,
        caller: &CallerIdentity,
        now: DateTime<Utc>,
    ) -> RecordResult<(Patient, Option<PatientChange>)> {
        match self.patients.load(hospital_number.as_str())? {
            Some((mut patient, old_yaml)) => {
                if !patient.apply_details(details, now) {
                    return Ok((patient, None));
                }
                let yaml = to_yaml(&patient)?;
                Ok((
                    patient.clone(),
                    Some(PatientChange {
                        patient,
                        yaml,
                        old_yaml: Some(old_yaml),
                    }),
                ))
            }
            None => {
                let patient = Patient::new(hospital_number.clone(), details, caller.username(), now);
                let yaml = to_yaml(&patient)?;
                Ok((
                    patient.clone(),
                    Some(PatientChange {
                        patient,
                        yaml,
                        old_yaml: None,
                    }),
                ))
            }
        }
    }

    fn commit_assessment(
        &self,
        caller: &CallerIdentity,
        action: CommitAction,
        assessment: &Assessment,
        old_yaml: Option<&str>,
        patient_change: Option<&PatientChange>,
    ) -> RecordResult<()> {
        let summary = match action {
            CommitAction::Create => "Assessment recorded",
            CommitAction::Update => "Assessment updated",
            CommitAction::Delete => "Assessment deleted",
        };
        let mut msg = CommitMessage::new(CommitDomain::Assessment, action, summary)?
            .with_trailer("Assessment-Id", assessment.id.to_string())?;

        let yaml = to_yaml(assessment)?;
        let assessment_path = Self::relative_path(&assessment.id);
        let patient_path;
        let mut files = vec![FileToWrite {
            relative_path: &assessment_path,
            content: &yaml,
            old_content: old_yaml,
        }];
        if let Some(change) = patient_change {
            patient_path = PatientRepository::relative_path(change.patient.hospital_number.as_str());
            msg = msg.with_trailer("Patient-Key", change.patient.key().to_string())?;
            files.push(FileToWrite {
                relative_path: &patient_path,
                content: &change.yaml,
                old_content: change.old_yaml.as_deref(),
            });
        }

        VersionedFileService::write_and_commit_files(
            self.cfg.data_dir(),
            &self.author(caller),
            &msg,
            &files,
        )?;
        Ok(())
    }

    /// Record a new assessment, creating or updating its patient.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidInput` when the hospital number is missing.
    pub fn create_assessment(
        &self,
        caller: &CallerIdentity,
        input: AssessmentInput,
    ) -> RecordResult<AssessmentRecord> {
        let hospital_number = input.hospital_number()?;
        let details = input.patient_details();

        let _guard = self.lock()?;
        let now = Utc::now();
        let (patient, patient_change) =
            self.upsert_patient(&hospital_number, details, caller, now)?;
        let assessment = Assessment::create(AssessmentId::new(), hospital_number, input, caller, now);

        self.commit_assessment(
            caller,
            CommitAction::Create,
            &assessment,
            None,
            patient_change.as_ref(),
        )?;
        tracing::info!("created assessment {}", assessment.id);

        Ok(AssessmentRecord {
            assessment,
            patient: Some(patient),
        })
    }

    /// Apply an update to a stored assessment.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` for an unknown id.
    pub fn update_assessment(
        &self,
        caller: &CallerIdentity,
        id: &str,
        patch: AssessmentPatch,
    ) -> RecordResult<AssessmentRecord> {
        let id = Self::parse_id(id)?;

        let _guard = self.lock()?;
        let (mut assessment, old_yaml) = self.load_existing(&id)?;
        let now = Utc::now();
        let details = patch.patient_details();
        let (patient, patient_change) =
            self.upsert_patient(&assessment.hospital_number, details, caller, now)?;
        assessment.apply_patch(patch, caller, now);

        self.commit_assessment(
            caller,
            CommitAction::Update,
            &assessment,
            Some(&old_yaml),
            patient_change.as_ref(),
        )?;
        tracing::info!("updated assessment {}", assessment.id);

        Ok(AssessmentRecord {
            assessment,
            patient: Some(patient),
        })
    }

    /// # Errors
    ///
    /// Returns `RecordError::NotFound` for an unknown id.
    pub fn get_assessment(&self, id: &str) -> RecordResult<AssessmentRecord> {
        let id = Self::parse_id(id)?;
        let (assessment, _) = self.load_existing(&id)?;
        let patient = self
            .patients
            .load(assessment.hospital_number.as_str())?
            .map(|(patient, _)| patient);
        Ok(AssessmentRecord {
            assessment,
            patient,
        })
    }

    fn remove(&self, caller: &CallerIdentity, found: &[(AssessmentId, String)]) -> RecordResult<()> {
        let paths: Vec<PathBuf> = found.iter().map(|(id, _)| Self::relative_path(id)).collect();
        let files: Vec<FileToRemove> = paths
            .iter()
            .zip(found)
            .map(|(path, (_, old))| FileToRemove {
                relative_path: path,
                old_content: old,
            })
            .collect();

        let mut msg = if let [(id, _)] = found {
            CommitMessage::new(CommitDomain::Assessment, CommitAction::Delete, "Assessment deleted")?
                .with_trailer("Assessment-Id", id.to_string())?
        } else {
            CommitMessage::new(
                CommitDomain::Assessment,
                CommitAction::Delete,
                format!("{} assessments deleted", found.len()),
            )?
        };
        if found.len() > 1 {
            for (id, _) in found {
                msg = msg.with_trailer("Assessment-Id", id.to_string())?;
            }
        }

        VersionedFileService::remove_and_commit_files(
            self.cfg.data_dir(),
            &self.author(caller),
            &msg,
            &files,
        )?;
        Ok(())
    }

    /// Delete one assessment. History keeps the removed file.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` for an unknown id.
    pub fn delete_assessment(&self, caller: &CallerIdentity, id: &str) -> RecordResult<()> {
        let id = Self::parse_id(id)?;

        let _guard = self.lock()?;
        let (_, old_yaml) = self.load_existing(&id)?;
        self.remove(caller, &[(id, old_yaml)])?;
        tracing::info!("deleted assessment {}", id);
        Ok(())
    }

    /// Delete every listed assessment that exists, in one commit. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidInput` for an empty id list.
    pub fn bulk_delete(&self, caller: &CallerIdentity, ids: &[String]) -> RecordResult<usize> {
        if ids.is_empty() {
            return Err(RecordError::InvalidInput("ids must not be empty".into()));
        }

        let _guard = self.lock()?;
        let mut found: Vec<(AssessmentId, String)> = Vec::new();
        for raw in ids {
            let Ok(id) = Self::parse_id(raw) else {
                continue;
            };
            if found.iter().any(|(seen, _)| *seen == id) {
                continue;
            }
            if let Some((_, old_yaml)) = self.load(&id)? {
                found.push((id, old_yaml));
            }
        }

        if found.is_empty() {
            return Ok(0);
        }
        self.remove(caller, &found)?;
        tracing::info!("bulk deleted {} assessments", found.len());
        Ok(found.len())
    }

    /// Every stored assessment joined with its patient, unordered.
    pub fn list_all(&self) -> Vec<AssessmentRecord> {
        let patients: HashMap<String, Patient> = self
            .patients
            .list()
            .into_iter()
            .map(|p| (p.hospital_number.as_str().to_string(), p))
            .collect();

        load_all::<Assessment>(&self.cfg.assessments_dir(), ASSESSMENT_YAML_FILENAME)
            .into_iter()
            .map(|assessment| {
                let patient = patients.get(assessment.hospital_number.as_str()).cloned();
                AssessmentRecord {
                    assessment,
                    patient,
                }
            })
            .collect()
    }

    /// Newest first, at most 100 rows.
    pub fn quick_list(
        &self,
        search: Option<&str>,
        patient_type: Option<PatientType>,
    ) -> Vec<AssessmentRecord> {
        let filter = AssessmentFilter {
            search: search
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            patient_type,
            ..AssessmentFilter::default()
        };
        listing::select(self.list_all(), &filter, SortSpec::default(), Some(QUICK_LIST_LIMIT))
    }

    pub fn admin_list(&self, filter: &AssessmentFilter, sort: SortSpec) -> Vec<AssessmentRecord> {
        listing::select(self.list_all(), filter, sort, None)
    }

    /// Patient details and their five most recent assessments.
    ///
    /// # Errors
    ///
    /// `RecordError::InvalidInput` for a blank hospital number, `RecordError::NotFound` when no
    /// patient has it.
    pub fn find_patient(&self, hospital_number: Option<&str>) -> RecordResult<PatientHistory> {
        let hospital_number = NonEmptyText::optional(hospital_number)
            .ok_or_else(|| RecordError::InvalidInput("hn is required".into()))?;

        let (patient, _) = self
            .patients
            .load(hospital_number.as_str())?
            .ok_or(RecordError::NotFound("patient"))?;

        let mut own: Vec<Assessment> =
            load_all::<Assessment>(&self.cfg.assessments_dir(), ASSESSMENT_YAML_FILENAME)
                .into_iter()
                .filter(|a| a.hospital_number == hospital_number)
                .collect();
        own.sort_by(|a, b| b.assessment_date.cmp(&a.assessment_date));

        Ok(PatientHistory {
            patient,
            assessments: own
                .iter()
                .take(PATIENT_HISTORY_LIMIT)
                .map(AssessmentSummary::from)
                .collect(),
        })
    }

    pub fn stats(&self, now: DateTime<Utc>) -> DashboardStats {
        let records = self.list_all();
        reporting::dashboard_stats(&records, self.patients.list().len(), now)
    }

    pub fn reports(&self, filter: &AssessmentFilter) -> ReportSummary {
        let records = listing::select(self.list_all(), filter, SortSpec::default(), None);
        reporting::report_summary(&records)
    }

    /// Export rows for `ids`, in the order given. Unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidInput` for an empty selection.
    pub fn export_rows(&self, ids: &[String]) -> RecordResult<Vec<ExportRow>> {
        if ids.is_empty() {
            return Err(RecordError::InvalidInput(
                "select at least one assessment to export".into(),
            ));
        }

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_assessment(id) {
                Ok(record) => records.push(record),
                Err(RecordError::NotFound(_)) => {
                    tracing::warn!("export skipped unknown assessment {}", id.trim());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(reporting::export_rows(&records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{parse_json, Diagnosis};
    use serde_json::{json, Value};
    use std::fs;
    use tempfile::TempDir;

    fn test_cfg(data_dir: &Path) -> Arc<CoreConfig> {
        Arc::new(
            CoreConfig::new(data_dir.to_path_buf(), "records@example.org")
                .expect("CoreConfig::new should succeed"),
        )
    }

    fn service(temp_dir: &TempDir) -> AssessmentService {
        AssessmentService::new(test_cfg(temp_dir.path())).expect("service should open store")
    }

    fn create(svc: &AssessmentService, body: Value) -> AssessmentRecord {
        let input: AssessmentInput = parse_json(body).expect("input should parse");
        svc.create_assessment(&CallerIdentity::new("pharm1"), input)
            .expect("create should succeed")
    }

    fn commit_count(dir: &Path) -> usize {
        let repo = git2::Repository::open(dir).expect("repo should open");
        let mut walk = repo.revwalk().unwrap();
        walk.push_head().unwrap();
        walk.count()
    }

    fn head_message(dir: &Path) -> String {
        let repo = git2::Repository::open(dir).expect("repo should open");
        let commit = repo.head().unwrap().peel_to_commit().unwrap();
        commit.message().unwrap_or_default().to_string()
    }

    #[test]
    fn create_then_get_round_trips_with_patient() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let svc = service(&temp_dir);

        let created = create(
            &svc,
            json!({
                "hospitalNumber": "HN100",
                "firstName": "Suda",
                "primaryDiagnosis": "ASTHMA",
                "asthmaData": { "controlLevel": "WELL" },
                "medications": [{ "name": "Budesonide", "dose": "200mcg" }],
                "techniqueSteps": { "inhale": { "TURBO": { "status": "incorrect", "note": "slow" } } }
            }),
        );

        let id = created.assessment.id.to_string();
        let fetched = svc.get_assessment(&id).expect("assessment should load");
        assert_eq!(fetched, created);
        assert_eq!(fetched.assessment.assessed_by, "pharm1");
        assert_eq!(fetched.patient.as_ref().unwrap().first_name.as_deref(), Some("Suda"));
        assert_eq!(fetched.assessment.inhaler_devices, vec!["TURBO".to_string()]);

        assert_eq!(commit_count(temp_dir.path()), 2);
        let message = head_message(temp_dir.path());
        assert!(message.starts_with("assessment:create: Assessment recorded"));
        assert!(message.contains("Author-Name: pharm1"));
        assert!(!message.contains("HN100"), "commit message should not carry the hospital number");
    }

    #[test]
    fn create_requires_hospital_number() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let svc = service(&temp_dir);
        let input: AssessmentInput = parse_json(json!({ "firstName": "X" })).unwrap();
        let err = svc
            .create_assessment(&CallerIdentity::unknown(), input)
            .expect_err("missing hospital number should fail");
        assert!(err.is_client_error());
        assert_eq!(commit_count(temp_dir.path()), 1, "should not commit anything");
    }

    #[test]
    fn second_assessment_upserts_patient() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let svc = service(&temp_dir);

        create(&svc, json!({ "hospitalNumber": "HN1", "firstName": "A", "age": 30 }));
        let second = create(&svc, json!({ "hospitalNumber": "HN1", "age": "31" }));

        let patient = second.patient.expect("patient should be attached");
        assert_eq!(patient.first_name.as_deref(), Some("A"));
        assert_eq!(patient.age, Some(31));
        assert_eq!(patient.created_by, "pharm1");
        assert_eq!(svc.patients.list().len(), 1);

        let third = create(&svc, json!({ "hospitalNumber": "HN1", "firstName": "", "age": null }));
        let patient = third.patient.expect("patient should be attached");
        assert_eq!(
            patient.first_name.as_deref(),
            Some("A"),
            "blank name on a later create should keep the stored one"
        );
        assert_eq!(patient.age, Some(31));
    }

    #[test]
    fn update_applies_patch_and_attributes_caller() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let svc = service(&temp_dir);
        let created = create(
            &svc,
            json!({ "hospitalNumber": "HN2", "note": "x", "techniqueCorrect": true }),
        );
        let id = created.assessment.id.to_string();

        let patch: AssessmentPatch =
            parse_json(json!({ "note": null, "lastName": "Chai" })).unwrap();
        let updated = svc
            .update_assessment(&CallerIdentity::new("pharm2"), &id, patch)
            .expect("update should succeed");

        assert_eq!(updated.assessment.note, None);
        assert_eq!(updated.assessment.technique_correct, None);
        assert_eq!(updated.assessment.assessed_by, "pharm2");
        assert_eq!(updated.patient.unwrap().last_name.as_deref(), Some("Chai"));
        assert_eq!(svc.get_assessment(&id).unwrap().assessment.note, None);
        assert!(head_message(temp_dir.path()).contains("Patient-Key: "));
    }

    #[test]
    fn unknown_or_malformed_ids_are_not_found() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let svc = service(&temp_dir);
        let unknown = AssessmentId::new().to_string();

        for id in [unknown.as_str(), "not-an-id", "../../etc"] {
            assert!(matches!(svc.get_assessment(id), Err(RecordError::NotFound(_))));
            assert!(matches!(
                svc.delete_assessment(&CallerIdentity::unknown(), id),
                Err(RecordError::NotFound(_))
            ));
            assert!(matches!(
                svc.update_assessment(&CallerIdentity::unknown(), id, AssessmentPatch::default()),
                Err(RecordError::NotFound(_))
            ));
        }
    }

    #[test]
    fn delete_removes_file_but_keeps_history() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let svc = service(&temp_dir);
        let created = create(&svc, json!({ "hospitalNumber": "HN3" }));
        let id = created.assessment.id.to_string();

        svc.delete_assessment(&CallerIdentity::new("admin"), &id)
            .expect("delete should succeed");

        assert!(matches!(svc.get_assessment(&id), Err(RecordError::NotFound(_))));
        assert!(!temp_dir
            .path()
            .join(AssessmentService::relative_path(&created.assessment.id))
            .exists());
        assert_eq!(commit_count(temp_dir.path()), 3);
        assert!(head_message(temp_dir.path()).starts_with("assessment:delete:"));
        assert_eq!(svc.patients.list().len(), 1, "patient should remain");
    }

    #[test]
    fn bulk_delete_counts_only_existing() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let svc = service(&temp_dir);
        let a = create(&svc, json!({ "hospitalNumber": "HN4" })).assessment.id.to_string();
        let b = create(&svc, json!({ "hospitalNumber": "HN5" })).assessment.id.to_string();
        let before = commit_count(temp_dir.path());

        let ids = vec![a.clone(), "bogus".to_string(), b, a, AssessmentId::new().to_string()];
        let deleted = svc
            .bulk_delete(&CallerIdentity::new("admin"), &ids)
            .expect("bulk delete should succeed");

        assert_eq!(deleted, 2);
        assert!(svc.list_all().is_empty());
        assert_eq!(commit_count(temp_dir.path()), before + 1, "should use a single commit");

        let none = svc
            .bulk_delete(&CallerIdentity::new("admin"), &["bogus".to_string()])
            .unwrap();
        assert_eq!(none, 0);
        assert_eq!(commit_count(temp_dir.path()), before + 1);
        assert!(svc.bulk_delete(&CallerIdentity::unknown(), &[]).is_err());
    }

    #[test]
    fn find_patient_returns_recent_history() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let svc = service(&temp_dir);
        for day in 1..=7 {
            create(
                &svc,
                json!({ "hospitalNumber": "HN6", "assessmentDate": format!("2024-01-0{day}") }),
            );
        }
        create(&svc, json!({ "hospitalNumber": "HN7" }));

        let history = svc.find_patient(Some(" HN6 ")).expect("patient should exist");
        assert_eq!(history.patient.hospital_number.as_str(), "HN6");
        assert_eq!(history.assessments.len(), 5);
        assert_eq!(
            history.assessments[0].assessment_date.format("%Y-%m-%d").to_string(),
            "2024-01-07"
        );

        assert!(matches!(svc.find_patient(Some("  ")), Err(RecordError::InvalidInput(_))));
        assert!(matches!(svc.find_patient(None), Err(RecordError::InvalidInput(_))));
        assert!(matches!(svc.find_patient(Some("HN404")), Err(RecordError::NotFound(_))));
    }

    #[test]
    fn listing_and_reporting_use_stored_records() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let svc = service(&temp_dir);
        let a = create(
            &svc,
            json!({ "hospitalNumber": "HN8", "firstName": "Niran", "primaryDiagnosis": "COPD",
                    "copdData": { "stage": "STAGE_B" }, "patientType": "ADULT" }),
        );
        let b = create(
            &svc,
            json!({ "hospitalNumber": "HN9", "primaryDiagnosis": "ASTHMA",
                    "asthmaData": { "controlLevel": "UNCONTROLLED" }, "patientType": "CHILD" }),
        );

        assert_eq!(svc.quick_list(Some("niran"), None).len(), 1);
        assert_eq!(svc.quick_list(None, Some(PatientType::Child)).len(), 1);

        let filter = AssessmentFilter {
            diagnosis: Some(Diagnosis::Copd),
            ..AssessmentFilter::default()
        };
        assert_eq!(svc.admin_list(&filter, SortSpec::default()).len(), 1);

        let stats = svc.stats(Utc::now());
        assert_eq!(stats.total_assessments, 2);
        assert_eq!(stats.total_patients, 2);
        assert_eq!(stats.recent_assessments, 2);

        let report = svc.reports(&AssessmentFilter::default());
        assert_eq!(report.copd_stage.stage_b, 1);
        assert_eq!(report.asthma_control.uncontrolled, 1);

        let ids = vec![b.assessment.id.to_string(), "missing".into(), a.assessment.id.to_string()];
        let rows = svc.export_rows(&ids).expect("export should succeed");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].hospital_number, "HN9");
        assert_eq!(rows[1].full_name, "Niran");
        assert!(svc.export_rows(&[]).is_err());
    }

    #[test]
    fn list_all_skips_corrupt_assessment_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let svc = service(&temp_dir);
        create(&svc, json!({ "hospitalNumber": "HN10" }));

        let bad = temp_dir
            .path()
            .join(AssessmentService::relative_path(&AssessmentId::new()));
        fs::create_dir_all(bad.parent().unwrap()).unwrap();
        fs::write(&bad, "id: [").unwrap();

        assert_eq!(svc.list_all().len(), 1);
    }
}
