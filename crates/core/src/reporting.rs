//! Dashboard statistics, report distributions and export rows.
//!
//! Everything here is a pure function over loaded records; the service layer decides which
//! records go in.

use crate::constants::RECENT_WINDOW_DAYS;
use crate::model::{AssessmentRecord, Diagnosis};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisCount {
    /// `None` counts assessments with no primary diagnosis.
    pub diagnosis: Option<Diagnosis>,
    pub label: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_assessments: usize,
    pub total_patients: usize,
    pub recent_assessments: usize,
    /// Most frequent first.
    pub diagnosis_breakdown: Vec<DiagnosisCount>,
}

/// Headline numbers for the management dashboard.
///
/// `recent_assessments` counts assessments dated within the last seven days of `now`.
pub fn dashboard_stats(
    records: &[AssessmentRecord],
    total_patients: usize,
    now: DateTime<Utc>,
) -> DashboardStats {
    let since = now - Duration::days(RECENT_WINDOW_DAYS);
    let recent_assessments = records
        .iter()
        .filter(|r| r.assessment.assessment_date >= since)
        .count();

    let mut counts: BTreeMap<Option<Diagnosis>, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.assessment.primary_diagnosis).or_default() += 1;
    }
    let mut diagnosis_breakdown: Vec<DiagnosisCount> = counts
        .into_iter()
        .map(|(diagnosis, count)| DiagnosisCount {
            diagnosis,
            label: diagnosis.map_or("-", Diagnosis::label).to_string(),
            count,
        })
        .collect();
    diagnosis_breakdown.sort_by(|a, b| b.count.cmp(&a.count));

    DashboardStats {
        total_assessments: records.len(),
        total_patients,
        recent_assessments,
        diagnosis_breakdown,
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AsthmaControlDistribution {
    pub well_controlled: usize,
    pub partly_controlled: usize,
    pub uncontrolled: usize,
    pub not_applicable: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CopdStageDistribution {
    pub stage_a: usize,
    pub stage_b: usize,
    pub stage_c: usize,
    pub stage_d: usize,
    pub not_applicable: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_assessments: usize,
    pub asthma_control: AsthmaControlDistribution,
    pub copd_stage: CopdStageDistribution,
}

fn section_code(section: Option<&Value>, key: &str) -> Option<String> {
    section
        .and_then(|s| s.get(key))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_ascii_uppercase())
}

pub fn asthma_control(records: &[AssessmentRecord]) -> AsthmaControlDistribution {
    let mut dist = AsthmaControlDistribution::default();
    for record in records {
        match section_code(record.assessment.asthma_data.as_ref(), "controlLevel").as_deref() {
            Some("WELL") => dist.well_controlled += 1,
            Some("PARTLY") => dist.partly_controlled += 1,
            Some("UNCONTROLLED") => dist.uncontrolled += 1,
            _ => dist.not_applicable += 1,
        }
    }
    dist
}

pub fn copd_stage(records: &[AssessmentRecord]) -> CopdStageDistribution {
    let mut dist = CopdStageDistribution::default();
    for record in records {
        let code = section_code(record.assessment.copd_data.as_ref(), "stage");
        let stage = code.as_deref().map(|c| c.strip_prefix("STAGE_").unwrap_or(c));
        match stage {
            Some("A") => dist.stage_a += 1,
            Some("B") => dist.stage_b += 1,
            Some("C") => dist.stage_c += 1,
            Some("D") => dist.stage_d += 1,
            _ => dist.not_applicable += 1,
        }
    }
    dist
}

pub fn report_summary(records: &[AssessmentRecord]) -> ReportSummary {
    ReportSummary {
        total_assessments: records.len(),
        asthma_control: asthma_control(records),
        copd_stage: copd_stage(records),
    }
}

/// One row of an assessment export, already rendered as display text.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    /// 1-based position in the export.
    pub index: usize,
    pub hospital_number: String,
    pub full_name: String,
    pub age: String,
    pub patient_type: String,
    pub assessment_date: String,
    pub assessment_round: String,
    pub primary_diagnosis: String,
    pub compliance_percent: f64,
    pub assessed_by: String,
    pub created_at: String,
}

const MISSING: &str = "-";

pub fn export_rows(records: &[AssessmentRecord]) -> Vec<ExportRow> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let a = &record.assessment;
            let patient = record.patient.as_ref();
            ExportRow {
                index: i + 1,
                hospital_number: a.hospital_number.to_string(),
                full_name: patient
                    .and_then(|p| p.full_name())
                    .unwrap_or_else(|| MISSING.to_string()),
                age: patient
                    .and_then(|p| p.age)
                    .map_or_else(|| MISSING.to_string(), |age| age.to_string()),
                patient_type: patient
                    .and_then(|p| p.patient_type)
                    .map_or(MISSING, |t| t.label())
                    .to_string(),
                assessment_date: a.assessment_date.format("%Y-%m-%d").to_string(),
                assessment_round: a.assessment_round.map_or(MISSING, |r| r.label()).to_string(),
                primary_diagnosis: a.primary_diagnosis.map_or(MISSING, Diagnosis::label).to_string(),
                compliance_percent: a.compliance_percent.unwrap_or(0.0),
                assessed_by: a.assessed_by.clone(),
                created_at: a.created_at.format("%Y-%m-%d %H:%M").to_string(),
            }
        })
        .collect()
}
