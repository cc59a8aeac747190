//! # ICR Core
//!
//! Record handling for the inhaler counselling record.
//!
//! This crate owns everything below the transport layer:
//! - inhaler technique normalisation ([`technique`])
//! - patient and assessment records ([`model`]) stored as YAML under a git repository
//! - listing, filtering and sorting ([`listing`])
//! - dashboard statistics, report distributions and export rows ([`reporting`])
//!
//! **No API concerns**: cookies, passwords and HTTP status codes belong in `api-shared` and
//! `api-rest`. Core receives the caller as a [`CallerIdentity`] value.

pub mod config;
pub mod constants;
pub mod error;
pub mod identity;
pub mod listing;
pub mod model;
pub mod reporting;
pub mod repositories;
pub mod technique;

pub(crate) mod versioned_files;

pub use config::{resolve_data_dir, CoreConfig};
pub use error::{RecordError, RecordResult};
pub use icr_types::{NonEmptyText, TextError};
pub use icr_uuid::{AssessmentId, PatientKey};
pub use identity::CallerIdentity;
pub use listing::{AssessmentFilter, SortDirection, SortField, SortSpec};
pub use model::{
    parse_json, Assessment, AssessmentInput, AssessmentPatch, AssessmentRecord,
    AssessmentSummary, Diagnosis, Patient, PatientHistory,
};
pub use reporting::{DashboardStats, ExportRow, ReportSummary};
pub use repositories::assessments::AssessmentService;
pub use technique::{normalize, NormalizedTechnique, RawTechniqueInput, TechniqueMatrix};
