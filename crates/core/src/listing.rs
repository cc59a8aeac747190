//! Filtering and ordering of assessment listings.
//!
//! Listings always start newest first. A requested sort is applied on top of that order and is
//! stable, so rows that compare equal keep their newest-first position.

use crate::model::{AssessmentRecord, Diagnosis, PatientType};
use crate::{RecordError, RecordResult};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use utoipa::ToSchema;

/// Criteria shared by the admin list, reports and the CLI.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssessmentFilter {
    /// Case-insensitive substring of hospital number, first name or last name.
    pub search: Option<String>,
    pub diagnosis: Option<Diagnosis>,
    /// Inclusive, from the start of this day (UTC).
    pub date_from: Option<NaiveDate>,
    /// Inclusive, through the end of this day (UTC).
    pub date_to: Option<NaiveDate>,
    pub patient_type: Option<PatientType>,
}

impl AssessmentFilter {
    /// Build a filter from raw query values. Blank values mean "no filter".
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidInput` for an unknown diagnosis or patient type, or a date
    /// that is not `YYYY-MM-DD`.
    pub fn from_query(
        search: Option<&str>,
        diagnosis: Option<&str>,
        date_from: Option<&str>,
        date_to: Option<&str>,
        patient_type: Option<&str>,
    ) -> RecordResult<Self> {
        Ok(Self {
            search: non_blank(search).map(str::to_string),
            diagnosis: parse_diagnosis_filter(diagnosis)?,
            date_from: non_blank(date_from).map(parse_day).transpose()?,
            date_to: non_blank(date_to).map(parse_day).transpose()?,
            patient_type: non_blank(patient_type)
                .map(|s| {
                    PatientType::from_wire(s).ok_or_else(|| {
                        RecordError::InvalidInput(format!("unknown patient type '{s}'"))
                    })
                })
                .transpose()?,
        })
    }

    pub fn matches(&self, record: &AssessmentRecord) -> bool {
        let assessment = &record.assessment;

        if let Some(search) = &self.search {
            let needle = search.trim().to_lowercase();
            let found = match &record.patient {
                Some(patient) => patient.matches_search(&needle),
                None => assessment
                    .hospital_number
                    .as_str()
                    .to_lowercase()
                    .contains(&needle),
            };
            if !found {
                return false;
            }
        }

        if self.diagnosis.is_some() && assessment.primary_diagnosis != self.diagnosis {
            return false;
        }

        if let Some(from) = self.date_from {
            if assessment.assessment_date < start_of_day(from) {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if assessment.assessment_date > end_of_day(to) {
                return false;
            }
        }

        if let Some(wanted) = self.patient_type {
            let actual = record.patient.as_ref().and_then(|p| p.patient_type);
            if actual != Some(wanted) {
                return false;
            }
        }

        true
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// `all` or blank means every diagnosis.
pub fn parse_diagnosis_filter(value: Option<&str>) -> RecordResult<Option<Diagnosis>> {
    match non_blank(value) {
        None | Some("all") => Ok(None),
        Some(code) => Diagnosis::from_wire(code)
            .map(Some)
            .ok_or_else(|| RecordError::InvalidInput(format!("unknown diagnosis '{code}'"))),
    }
}

fn parse_day(value: &str) -> RecordResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| RecordError::InvalidInput(format!("invalid date '{value}', expected YYYY-MM-DD")))
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    DateTime::<Utc>::from_naive_utc_and_offset(day.and_time(NaiveTime::MIN), Utc)
}

fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    DateTime::<Utc>::from_naive_utc_and_offset(day.and_time(last), Utc)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    AssessmentDate,
    HospitalNumber,
    CompliancePercent,
}

impl SortField {
    pub fn from_query(value: &str) -> RecordResult<Self> {
        match value.trim() {
            "assessmentDate" => Ok(Self::AssessmentDate),
            "hospitalNumber" => Ok(Self::HospitalNumber),
            "compliancePercent" => Ok(Self::CompliancePercent),
            other => Err(RecordError::InvalidInput(format!("unknown sort field '{other}'"))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn from_query(value: &str) -> RecordResult<Self> {
        match value.trim() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(RecordError::InvalidInput(format!("unknown sort order '{other}'"))),
        }
    }
}

/// Requested ordering. The default is newest first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Missing values fall back to `assessmentDate` and `desc`.
    pub fn from_query(field: Option<&str>, order: Option<&str>) -> RecordResult<Self> {
        Ok(Self {
            field: non_blank(field)
                .map(SortField::from_query)
                .transpose()?
                .unwrap_or_default(),
            direction: non_blank(order)
                .map(SortDirection::from_query)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

fn compare(a: &AssessmentRecord, b: &AssessmentRecord, field: SortField) -> Ordering {
    let (a, b) = (&a.assessment, &b.assessment);
    match field {
        SortField::AssessmentDate => a.assessment_date.cmp(&b.assessment_date),
        SortField::HospitalNumber => a.hospital_number.as_str().cmp(b.hospital_number.as_str()),
        SortField::CompliancePercent => a
            .compliance_percent
            .unwrap_or(0.0)
            .total_cmp(&b.compliance_percent.unwrap_or(0.0)),
    }
}

/// Order records newest first, then by `spec`.
pub fn sort_records(records: &mut [AssessmentRecord], spec: SortSpec) {
    records.sort_by(|a, b| compare(b, a, SortField::AssessmentDate));
    records.sort_by(|a, b| {
        let ordering = compare(a, b, spec.field);
        match spec.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

/// Filter, order and optionally cap a listing.
pub fn select(
    records: Vec<AssessmentRecord>,
    filter: &AssessmentFilter,
    sort: SortSpec,
    limit: Option<usize>,
) -> Vec<AssessmentRecord> {
    let mut selected: Vec<AssessmentRecord> =
        records.into_iter().filter(|r| filter.matches(r)).collect();
    sort_records(&mut selected, sort);
    if let Some(limit) = limit {
        selected.truncate(limit);
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::CallerIdentity;
    use crate::model::{parse_json, Assessment, AssessmentInput, Patient, PatientDetails};
    use crate::{AssessmentId, NonEmptyText};
    use chrono::TimeZone;
    use serde_json::json;

    fn record(hn: &str, date: &str, body: serde_json::Value, name: Option<&str>) -> AssessmentRecord {
        let mut body = body;
        body["hospitalNumber"] = json!(hn);
        body["assessmentDate"] = json!(date);
        let input: AssessmentInput = parse_json(body).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let assessment = Assessment::create(
            AssessmentId::new(),
            NonEmptyText::new(hn).unwrap(),
            input.clone(),
            &CallerIdentity::new("staff"),
            now,
        );
        let patient = name.map(|first| {
            Patient::new(
                NonEmptyText::new(hn).unwrap(),
                PatientDetails {
                    first_name: Some(first.to_string()),
                    patient_type: input.patient_type,
                    ..PatientDetails::default()
                },
                "staff",
                now,
            )
        });
        AssessmentRecord {
            assessment,
            patient,
        }
    }

    fn sample() -> Vec<AssessmentRecord> {
        vec![
            record("HN-B", "2024-03-01", json!({ "primaryDiagnosis": "COPD", "compliancePercent": 80 }), Some("Anong")),
            record("HN-A", "2024-03-03T10:00:00Z", json!({ "primaryDiagnosis": "ASTHMA", "patientType": "CHILD" }), Some("Boon")),
            record("HN-C", "2024-03-02", json!({ "primaryDiagnosis": "ASTHMA", "compliancePercent": 50 }), None),
        ]
    }

    fn hns(records: &[AssessmentRecord]) -> Vec<&str> {
        records.iter().map(|r| r.assessment.hospital_number.as_str()).collect()
    }

    #[test]
    fn default_order_is_newest_first() {
        let out = select(sample(), &AssessmentFilter::default(), SortSpec::default(), None);
        assert_eq!(hns(&out), vec!["HN-A", "HN-C", "HN-B"]);
    }

    #[test]
    fn missing_compliance_sorts_as_zero() {
        let spec = SortSpec::from_query(Some("compliancePercent"), Some("asc")).unwrap();
        let out = select(sample(), &AssessmentFilter::default(), spec, None);
        assert_eq!(hns(&out), vec!["HN-A", "HN-C", "HN-B"]);
    }

    #[test]
    fn sorts_by_hospital_number_desc() {
        let spec = SortSpec::from_query(Some("hospitalNumber"), None).unwrap();
        let out = select(sample(), &AssessmentFilter::default(), spec, None);
        assert_eq!(hns(&out), vec!["HN-C", "HN-B", "HN-A"]);
    }

    #[test]
    fn date_range_is_inclusive_of_whole_days() {
        let filter =
            AssessmentFilter::from_query(None, Some("all"), Some("2024-03-02"), Some("2024-03-03"), None)
                .unwrap();
        let out = select(sample(), &filter, SortSpec::default(), None);
        assert_eq!(hns(&out), vec!["HN-A", "HN-C"]);
    }

    #[test]
    fn search_uses_patient_names_and_hospital_number() {
        let filter = AssessmentFilter::from_query(Some("boo"), None, None, None, None).unwrap();
        assert_eq!(hns(&select(sample(), &filter, SortSpec::default(), None)), vec!["HN-A"]);

        let filter = AssessmentFilter::from_query(Some("hn-c"), None, None, None, None).unwrap();
        assert_eq!(hns(&select(sample(), &filter, SortSpec::default(), None)), vec!["HN-C"]);
    }

    #[test]
    fn diagnosis_and_type_filters() {
        let filter = AssessmentFilter::from_query(None, Some("ASTHMA"), None, None, Some("CHILD")).unwrap();
        assert_eq!(hns(&select(sample(), &filter, SortSpec::default(), None)), vec!["HN-A"]);
    }

    #[test]
    fn limit_caps_results() {
        let out = select(sample(), &AssessmentFilter::default(), SortSpec::default(), Some(2));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn bad_query_values_are_invalid_input() {
        assert!(AssessmentFilter::from_query(None, Some("FLU"), None, None, None).is_err());
        assert!(AssessmentFilter::from_query(None, None, Some("03/02/2024"), None, None).is_err());
        assert!(SortSpec::from_query(Some("name"), None).is_err());
        assert!(SortSpec::from_query(None, Some("up")).is_err());
    }
}
