//! Record identifiers and sharded-path utilities.
//!
//! ICR stores every record under a sharded directory derived from a 32-character lowercase hex
//! key:
//!
//! `parent_dir/<k[0..2]>/<k[2..4]>/<k>/`
//!
//! Two kinds of key exist:
//! - [`AssessmentId`]: a random v4 UUID in canonical (simple, lowercase) form. This is the
//!   identifier clients see in URLs.
//! - [`PatientKey`]: derived from the hospital number with SHA-256, so the hospital number never
//!   appears in a path and any string is safe to use as one.
//!
//! Example:
//! `records/assessments/55/0e/550e8400e29b41d4a716446655440000/assessment.yaml`

mod service;

pub use service::{AssessmentId, PatientKey, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
