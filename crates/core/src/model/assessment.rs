//! Assessment records and the request shapes that create and update them.

use super::codes::{
    AssessmentRound, ComplianceStatus, Diagnosis, MedicationStatus, PatientType, SpacerType,
};
use super::lenient;
use super::patient::{Patient, PatientDetails};
use crate::identity::CallerIdentity;
use crate::technique::{normalize, RawTechniqueInput, TechniqueMatrix};
use crate::{NonEmptyText, RecordError, RecordResult};
use chrono::{DateTime, Utc};
use icr_uuid::AssessmentId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// A stored assessment.
///
/// Condition-specific sections (`asthmaData`, `copdData`, `arData`) and the medication list are
/// kept exactly as submitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    #[schema(value_type = String)]
    pub id: AssessmentId,
    #[schema(value_type = String)]
    pub hospital_number: NonEmptyText,
    pub assessment_round: Option<AssessmentRound>,
    pub assessment_date: DateTime<Utc>,
    pub assessed_by: String,

    #[serde(default)]
    pub alcohol: bool,
    pub alcohol_amount: Option<String>,
    #[serde(default)]
    pub smoking: bool,
    pub smoking_amount: Option<String>,

    pub primary_diagnosis: Option<Diagnosis>,
    #[serde(default)]
    pub secondary_diagnoses: Vec<String>,
    pub note: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub asthma_data: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub copd_data: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub ar_data: Option<Value>,

    pub compliance_status: Option<ComplianceStatus>,
    pub compliance_percent: Option<f64>,
    pub cannot_assess_reason: Option<String>,
    #[serde(default)]
    pub non_compliance_reasons: Vec<String>,
    pub less_than_detail: Option<String>,
    pub more_than_detail: Option<String>,
    pub non_compliance_other: Option<String>,

    #[serde(default)]
    pub has_side_effects: bool,
    #[serde(default)]
    pub side_effects: Vec<String>,
    pub side_effects_other: Option<String>,
    pub side_effects_management: Option<String>,
    pub drps: Option<String>,

    pub medication_status: Option<MedicationStatus>,
    pub unopened_medication: Option<String>,

    pub technique_correct: Option<bool>,
    #[serde(default)]
    pub inhaler_devices: Vec<String>,
    #[serde(default)]
    pub technique_steps: TechniqueMatrix,
    pub spacer_type: Option<SpacerType>,
    #[schema(value_type = Object)]
    #[serde(default = "empty_list")]
    pub medications: Value,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn empty_list() -> Value {
    Value::Array(Vec::new())
}

/// Body of a create request.
///
/// Every field is optional on the wire; `hospitalNumber` is checked separately so the caller
/// gets a plain "required" message rather than a schema error.
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentInput {
    #[serde(default, deserialize_with = "lenient::text")]
    pub hospital_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub age: Option<u32>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub height: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional")]
    pub patient_type: Option<PatientType>,

    #[serde(default, deserialize_with = "lenient::optional")]
    pub assessment_round: Option<AssessmentRound>,
    #[serde(default, deserialize_with = "lenient::date_time")]
    pub assessment_date: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "lenient::yes_no")]
    pub alcohol: Option<bool>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub alcohol_amount: Option<String>,
    #[serde(default, deserialize_with = "lenient::yes_no")]
    pub smoking: Option<bool>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub smoking_amount: Option<String>,

    #[serde(default, deserialize_with = "lenient::optional")]
    pub primary_diagnosis: Option<Diagnosis>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub secondary_diagnoses: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub note: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional")]
    #[schema(value_type = Option<Object>)]
    pub asthma_data: Option<Value>,
    #[serde(default, deserialize_with = "lenient::optional")]
    #[schema(value_type = Option<Object>)]
    pub copd_data: Option<Value>,
    #[serde(default, deserialize_with = "lenient::optional")]
    #[schema(value_type = Option<Object>)]
    pub ar_data: Option<Value>,

    #[serde(default, deserialize_with = "lenient::optional")]
    pub compliance_status: Option<ComplianceStatus>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub compliance_percent: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub cannot_assess_reason: Option<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub non_compliance_reasons: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub less_than_detail: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub more_than_detail: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub non_compliance_other: Option<String>,

    #[serde(default, deserialize_with = "lenient::yes_no")]
    pub has_side_effects: Option<bool>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub side_effects: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub side_effects_other: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub side_effects_management: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub drps: Option<String>,

    #[serde(default, deserialize_with = "lenient::optional")]
    pub medication_status: Option<MedicationStatus>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub unopened_medication: Option<String>,

    #[serde(default, deserialize_with = "lenient::yes_no")]
    pub technique_correct: Option<bool>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub technique_steps: Option<RawTechniqueInput>,
    #[serde(default, deserialize_with = "lenient::optional")]
    pub spacer_type: Option<SpacerType>,
    #[serde(default, deserialize_with = "lenient::optional")]
    #[schema(value_type = Option<Object>)]
    pub medications: Option<Value>,
}

impl AssessmentInput {
    /// The trimmed hospital number.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidInput` when it is missing or blank.
    pub fn hospital_number(&self) -> RecordResult<NonEmptyText> {
        NonEmptyText::optional(self.hospital_number.as_deref())
            .ok_or_else(|| RecordError::InvalidInput("hospitalNumber is required".into()))
    }

    pub fn patient_details(&self) -> PatientDetails {
        PatientDetails {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            age: self.age,
            height: self.height,
            patient_type: self.patient_type,
        }
    }
}

/// Body of an update request.
///
/// Field-level rules:
/// - missing: keep the stored value;
/// - `null` or blank on a `nullable_*` field: clear it;
/// - `primaryDiagnosis`, `complianceStatus`, `medicationStatus` and `assessmentDate` ignore
///   blanks, so a half-filled form cannot wipe them;
/// - the technique grid and `techniqueCorrect` are always replaced by what was sent.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentPatch {
    #[serde(default, deserialize_with = "lenient::text")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub age: Option<u32>,

    #[serde(default, deserialize_with = "lenient::nullable")]
    pub assessment_round: Option<Option<AssessmentRound>>,
    #[serde(default, deserialize_with = "lenient::date_time")]
    pub assessment_date: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "lenient::yes_no")]
    pub alcohol: Option<bool>,
    #[serde(default, deserialize_with = "lenient::nullable_text")]
    pub alcohol_amount: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::yes_no")]
    pub smoking: Option<bool>,
    #[serde(default, deserialize_with = "lenient::nullable_text")]
    pub smoking_amount: Option<Option<String>>,

    #[serde(default, deserialize_with = "lenient::optional")]
    pub primary_diagnosis: Option<Diagnosis>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub secondary_diagnoses: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::nullable_text")]
    pub note: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::nullable")]
    pub asthma_data: Option<Option<Value>>,
    #[serde(default, deserialize_with = "lenient::nullable")]
    pub copd_data: Option<Option<Value>>,
    #[serde(default, deserialize_with = "lenient::nullable")]
    pub ar_data: Option<Option<Value>>,

    #[serde(default, deserialize_with = "lenient::optional")]
    pub compliance_status: Option<ComplianceStatus>,
    #[serde(default, deserialize_with = "lenient::nullable_number")]
    pub compliance_percent: Option<Option<f64>>,
    #[serde(default, deserialize_with = "lenient::nullable_text")]
    pub cannot_assess_reason: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub non_compliance_reasons: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::nullable_text")]
    pub less_than_detail: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::nullable_text")]
    pub more_than_detail: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::nullable_text")]
    pub non_compliance_other: Option<Option<String>>,

    #[serde(default, deserialize_with = "lenient::yes_no")]
    pub has_side_effects: Option<bool>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub side_effects: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::nullable_text")]
    pub side_effects_other: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::nullable_text")]
    pub side_effects_management: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::nullable_text")]
    pub drps: Option<Option<String>>,

    #[serde(default, deserialize_with = "lenient::optional")]
    pub medication_status: Option<MedicationStatus>,
    #[serde(default, deserialize_with = "lenient::nullable_text")]
    pub unopened_medication: Option<Option<String>>,

    #[serde(default, deserialize_with = "lenient::yes_no")]
    pub technique_correct: Option<bool>,
    #[serde(default)]
    pub technique_steps: Option<RawTechniqueInput>,
    #[serde(default, deserialize_with = "lenient::nullable")]
    pub spacer_type: Option<Option<SpacerType>>,
    #[serde(default, deserialize_with = "lenient::nullable")]
    pub medications: Option<Option<Value>>,
}

impl AssessmentPatch {
    /// Name and age changes to carry over to the patient record.
    pub fn patient_details(&self) -> PatientDetails {
        PatientDetails {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            age: self.age,
            ..PatientDetails::default()
        }
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

impl Assessment {
    /// Build a new assessment from a create request.
    pub fn create(
        id: AssessmentId,
        hospital_number: NonEmptyText,
        input: AssessmentInput,
        caller: &CallerIdentity,
        now: DateTime<Utc>,
    ) -> Self {
        let technique = normalize(input.technique_steps.as_ref());

        Self {
            id,
            hospital_number,
            assessment_round: input.assessment_round,
            assessment_date: input.assessment_date.unwrap_or(now),
            assessed_by: caller.username().to_string(),
            alcohol: input.alcohol.unwrap_or(false),
            alcohol_amount: input.alcohol_amount,
            smoking: input.smoking.unwrap_or(false),
            smoking_amount: input.smoking_amount,
            primary_diagnosis: input.primary_diagnosis,
            secondary_diagnoses: input.secondary_diagnoses.unwrap_or_default(),
            note: input.note,
            asthma_data: input.asthma_data,
            copd_data: input.copd_data,
            ar_data: input.ar_data,
            compliance_status: input.compliance_status,
            compliance_percent: Some(input.compliance_percent.unwrap_or(0.0)),
            cannot_assess_reason: input.cannot_assess_reason,
            non_compliance_reasons: input.non_compliance_reasons.unwrap_or_default(),
            less_than_detail: input.less_than_detail,
            more_than_detail: input.more_than_detail,
            non_compliance_other: input.non_compliance_other,
            has_side_effects: input.has_side_effects.unwrap_or(false),
            side_effects: input.side_effects.unwrap_or_default(),
            side_effects_other: input.side_effects_other,
            side_effects_management: input.side_effects_management,
            drps: input.drps,
            medication_status: input.medication_status,
            unopened_medication: input.unopened_medication,
            technique_correct: input.technique_correct,
            inhaler_devices: technique.devices,
            technique_steps: technique.matrix,
            spacer_type: input.spacer_type,
            medications: input.medications.unwrap_or_else(empty_list),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an update request in place. The caller becomes `assessedBy`.
    pub fn apply_patch(&mut self, patch: AssessmentPatch, caller: &CallerIdentity, now: DateTime<Utc>) {
        let technique = normalize(patch.technique_steps.as_ref());

        set(&mut self.assessment_round, patch.assessment_round);
        set(&mut self.assessment_date, patch.assessment_date);
        set(&mut self.alcohol, patch.alcohol);
        set(&mut self.alcohol_amount, patch.alcohol_amount);
        set(&mut self.smoking, patch.smoking);
        set(&mut self.smoking_amount, patch.smoking_amount);

        if patch.primary_diagnosis.is_some() {
            self.primary_diagnosis = patch.primary_diagnosis;
        }
        set(&mut self.secondary_diagnoses, patch.secondary_diagnoses);
        set(&mut self.note, patch.note);
        set(&mut self.asthma_data, patch.asthma_data);
        set(&mut self.copd_data, patch.copd_data);
        set(&mut self.ar_data, patch.ar_data);

        if patch.compliance_status.is_some() {
            self.compliance_status = patch.compliance_status;
        }
        set(&mut self.compliance_percent, patch.compliance_percent);
        set(&mut self.cannot_assess_reason, patch.cannot_assess_reason);
        set(&mut self.non_compliance_reasons, patch.non_compliance_reasons);
        set(&mut self.less_than_detail, patch.less_than_detail);
        set(&mut self.more_than_detail, patch.more_than_detail);
        set(&mut self.non_compliance_other, patch.non_compliance_other);

        set(&mut self.has_side_effects, patch.has_side_effects);
        set(&mut self.side_effects, patch.side_effects);
        set(&mut self.side_effects_other, patch.side_effects_other);
        set(&mut self.side_effects_management, patch.side_effects_management);
        set(&mut self.drps, patch.drps);

        if patch.medication_status.is_some() {
            self.medication_status = patch.medication_status;
        }
        set(&mut self.unopened_medication, patch.unopened_medication);

        self.technique_correct = patch.technique_correct;
        self.technique_steps = technique.matrix;
        self.inhaler_devices = technique.devices;
        set(&mut self.spacer_type, patch.spacer_type);
        if let Some(medications) = patch.medications {
            self.medications = medications.unwrap_or_else(empty_list);
        }

        self.assessed_by = caller.username().to_string();
        self.updated_at = now;
    }
}

/// An assessment joined with its patient, as returned by the API.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRecord {
    #[serde(flatten)]
    pub assessment: Assessment,
    pub patient: Option<Patient>,
}

/// Short form of an assessment shown in a patient's history.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentSummary {
    #[schema(value_type = String)]
    pub id: AssessmentId,
    pub assessment_date: DateTime<Utc>,
    pub assessment_round: Option<AssessmentRound>,
    pub primary_diagnosis: Option<Diagnosis>,
    pub compliance_percent: Option<f64>,
    pub assessed_by: String,
}

impl From<&Assessment> for AssessmentSummary {
    fn from(a: &Assessment) -> Self {
        Self {
            id: a.id,
            assessment_date: a.assessment_date,
            assessment_round: a.assessment_round,
            primary_diagnosis: a.primary_diagnosis,
            compliance_percent: a.compliance_percent,
            assessed_by: a.assessed_by.clone(),
        }
    }
}

/// A patient and their most recent assessments.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientHistory {
    #[serde(flatten)]
    pub patient: Patient,
    pub assessments: Vec<AssessmentSummary>,
}
