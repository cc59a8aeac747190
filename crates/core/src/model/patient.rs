//! Patient records, keyed by hospital number.

use super::codes::PatientType;
use crate::NonEmptyText;
use chrono::{DateTime, Utc};
use icr_uuid::PatientKey;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[schema(value_type = String)]
    pub hospital_number: NonEmptyText,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<u32>,
    pub height: Option<f64>,
    pub patient_type: Option<PatientType>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Patient fields that arrive alongside an assessment.
///
/// `None` means "not provided"; it never clears a stored value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PatientDetails {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<u32>,
    pub height: Option<f64>,
    pub patient_type: Option<PatientType>,
}

impl Patient {
    pub fn new(
        hospital_number: NonEmptyText,
        details: PatientDetails,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            hospital_number,
            first_name: details.first_name,
            last_name: details.last_name,
            age: details.age,
            height: details.height,
            patient_type: details.patient_type,
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the fields that were provided. Returns whether anything changed.
    pub fn apply_details(&mut self, details: PatientDetails, now: DateTime<Utc>) -> bool {
        let before = self.clone();

        if let Some(first_name) = details.first_name {
            self.first_name = Some(first_name);
        }
        if let Some(last_name) = details.last_name {
            self.last_name = Some(last_name);
        }
        if let Some(age) = details.age {
            self.age = Some(age);
        }
        if let Some(height) = details.height {
            self.height = Some(height);
        }
        if let Some(patient_type) = details.patient_type {
            self.patient_type = Some(patient_type);
        }

        let changed = *self != before;
        if changed {
            self.updated_at = now;
        }
        changed
    }

    pub fn key(&self) -> PatientKey {
        PatientKey::for_hospital_number(self.hospital_number.as_str())
    }

    /// "First Last", or `None` when neither name is recorded.
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    /// Case-insensitive substring match on hospital number, first name or last name.
    pub fn matches_search(&self, needle_lowercase: &str) -> bool {
        let fields = [
            Some(self.hospital_number.as_str()),
            self.first_name.as_deref(),
            self.last_name.as_deref(),
        ];
        fields
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(needle_lowercase))
    }
}
