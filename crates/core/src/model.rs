//! Admission and consultation records as the remote store returns them.
//!
//! The store owns these records; the workflow only holds transient copies. Status values the
//! workflow does not know about decode to `Other` rather than failing the whole load.

use crate::constants::{ADMISSIONS_TABLE, CONSULTATIONS_TABLE};
use crate::DischargeError;
use chrono::{DateTime, NaiveDate, Utc};
use discharge_types::Mrn;
use serde::{Deserialize, Serialize};

// ============================================================================
// STATUSES
// ============================================================================

/// Lifecycle of an admission. The workflow only moves `Active` to `Discharged`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdmissionStatus {
    Active,
    Discharged,
    #[serde(other)]
    Other,
}

impl AdmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionStatus::Active => "Active",
            AdmissionStatus::Discharged => "Discharged",
            AdmissionStatus::Other => "Other",
        }
    }
}

/// Lifecycle of a consultation request. The workflow only moves `Active` to `Completed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsultationStatus {
    Active,
    Completed,
    #[serde(other)]
    Other,
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationStatus::Active => "Active",
            ConsultationStatus::Completed => "Completed",
            ConsultationStatus::Other => "Other",
        }
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// One inpatient stay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Admission {
    pub mrn: Mrn,
    #[serde(default)]
    pub patient_name: String,
    pub admission_date: NaiveDate,
    #[serde(default)]
    pub admission_time: Option<String>,
    pub status: AdmissionStatus,
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub discharge_date: Option<String>,
    #[serde(default)]
    pub discharge_time: Option<String>,
    #[serde(default)]
    pub discharge_note: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One consultation request addressed to a specialty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Consultation {
    pub mrn: Mrn,
    #[serde(default)]
    pub patient_name: String,
    pub created_at: DateTime<Utc>,
    pub status: ConsultationStatus,
    #[serde(default)]
    pub consultation_specialty: String,
    #[serde(default)]
    pub requesting_department: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

// ============================================================================
// UNIFIED ACTIVE VIEW
// ============================================================================

/// Which table a record belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Admission,
    Consultation,
}

impl RecordKind {
    /// Name of the remote table holding records of this kind.
    pub fn table(&self) -> &'static str {
        match self {
            RecordKind::Admission => ADMISSIONS_TABLE,
            RecordKind::Consultation => CONSULTATIONS_TABLE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Admission => "admission",
            RecordKind::Consultation => "consultation",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordKind {
    type Err = DischargeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admission" => Ok(RecordKind::Admission),
            "consultation" => Ok(RecordKind::Consultation),
            other => Err(DischargeError::InvalidInput(format!(
                "unknown record kind: {other} (expected admission or consultation)"
            ))),
        }
    }
}

/// Identifies a record in the active list.
///
/// The MRN alone is not enough because admissions and consultations may share one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub kind: RecordKind,
    pub mrn: Mrn,
}

impl RecordKey {
    pub fn new(kind: RecordKind, mrn: Mrn) -> Self {
        Self { kind, mrn }
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.mrn)
    }
}

/// An entry of the unified active list: either an admission or a consultation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActiveRecord {
    Admission(Admission),
    Consultation(Consultation),
}

impl ActiveRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            ActiveRecord::Admission(_) => RecordKind::Admission,
            ActiveRecord::Consultation(_) => RecordKind::Consultation,
        }
    }

    pub fn mrn(&self) -> &Mrn {
        match self {
            ActiveRecord::Admission(a) => &a.mrn,
            ActiveRecord::Consultation(c) => &c.mrn,
        }
    }

    pub fn patient_name(&self) -> &str {
        match self {
            ActiveRecord::Admission(a) => &a.patient_name,
            ActiveRecord::Consultation(c) => &c.patient_name,
        }
    }

    /// The admission specialty, or the consultation specialty for consultations.
    pub fn specialty(&self) -> &str {
        match self {
            ActiveRecord::Admission(a) => &a.specialty,
            ActiveRecord::Consultation(c) => &c.consultation_specialty,
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.kind(), self.mrn().clone())
    }

    pub fn matches_key(&self, key: &RecordKey) -> bool {
        self.kind() == key.kind && self.mrn() == &key.mrn
    }
}
