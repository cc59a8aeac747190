//! Coded values used on assessment forms.
//!
//! Wire values are the SCREAMING_SNAKE_CASE codes the form posts. Labels are the short forms
//! used in tables and exports.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatientType {
    Adult,
    Child,
}

impl PatientType {
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "ADULT" => Some(Self::Adult),
            "CHILD" => Some(Self::Child),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Adult => "adult",
            Self::Child => "child",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssessmentRound {
    PreCounseling,
    PostCounseling,
}

impl AssessmentRound {
    pub const fn label(self) -> &'static str {
        match self {
            Self::PreCounseling => "Pre",
            Self::PostCounseling => "Post",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Diagnosis {
    Asthma,
    Copd,
    Acod,
    Bronchiectasis,
    AllergicRhinitis,
    Gerd,
}

impl Diagnosis {
    pub const ALL: [Diagnosis; 6] = [
        Diagnosis::Asthma,
        Diagnosis::Copd,
        Diagnosis::Acod,
        Diagnosis::Bronchiectasis,
        Diagnosis::AllergicRhinitis,
        Diagnosis::Gerd,
    ];

    pub const fn as_wire(self) -> &'static str {
        match self {
            Self::Asthma => "ASTHMA",
            Self::Copd => "COPD",
            Self::Acod => "ACOD",
            Self::Bronchiectasis => "BRONCHIECTASIS",
            Self::AllergicRhinitis => "ALLERGIC_RHINITIS",
            Self::Gerd => "GERD",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_wire() == s)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Asthma => "Asthma",
            Self::Copd => "COPD",
            Self::Acod => "ACOD",
            Self::Bronchiectasis => "Bronchiectasis",
            Self::AllergicRhinitis => "AR",
            Self::Gerd => "GERD",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    GoodCompliance,
    FirstUse,
    CannotAssess,
    NonCompliance,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MedicationStatus {
    NoRemaining,
    HasRemaining,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpacerType {
    MouthPiece,
    Volumetric,
    Cone,
    #[serde(rename = "NONE")]
    NoSpacer,
}
