//! Record repositories.
//!
//! [`assessments::AssessmentService`] is the entry point for transports. Patient files are
//! managed through it, since a patient only changes as part of an assessment write.

pub mod assessments;
pub(crate) mod patients;
pub(crate) mod shared;
