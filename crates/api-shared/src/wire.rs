//! Request and response bodies that only exist at the API boundary.

use icr_core::reporting::ExportRow;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Body of every non-2xx JSON response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoginRes {
    pub success: bool,
    pub username: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SuccessRes {
    pub success: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeleteRes {
    pub success: bool,
    pub message: String,
}

/// A selection of assessment ids, used by bulk delete and export.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IdsReq {
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BulkDeleteRes {
    pub success: bool,
    pub deleted: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct ExportRes {
    pub rows: Vec<ExportRow>,
}

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuickListQuery {
    /// Substring of hospital number, first name or last name.
    pub search: Option<String>,
    /// `ADULT` or `CHILD`.
    #[serde(rename = "type")]
    pub patient_type: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AdminListQuery {
    pub search: Option<String>,
    /// Diagnosis code, or `all`.
    pub diagnosis: Option<String>,
    /// `YYYY-MM-DD`, inclusive.
    pub date_from: Option<String>,
    /// `YYYY-MM-DD`, inclusive.
    pub date_to: Option<String>,
    pub patient_type: Option<String>,
    /// `assessmentDate`, `hospitalNumber` or `compliancePercent`.
    pub sort: Option<String>,
    /// `asc` or `desc`.
    pub order: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PatientSearchQuery {
    /// Hospital number.
    pub hn: Option<String>,
}
