//! Constants used throughout the discharge core crate.
//!
//! Table and column names live here so the in-memory store, the HTTP adapter and the workflow
//! agree on the schema the remote backend exposes.

/// Table holding inpatient admissions.
pub const ADMISSIONS_TABLE: &str = "admissions";

/// Table holding consultation requests.
pub const CONSULTATIONS_TABLE: &str = "consultations";

pub const FIELD_MRN: &str = "mrn";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_SPECIALTY: &str = "specialty";
pub const FIELD_CONSULTATION_SPECIALTY: &str = "consultation_specialty";
pub const FIELD_ADMISSION_DATE: &str = "admission_date";
pub const FIELD_CREATED_AT: &str = "created_at";
pub const FIELD_UPDATED_AT: &str = "updated_at";
pub const FIELD_DISCHARGE_DATE: &str = "discharge_date";
pub const FIELD_DISCHARGE_TIME: &str = "discharge_time";
pub const FIELD_DISCHARGE_NOTE: &str = "discharge_note";

/// Specialties used when a deployment configures none.
pub const DEFAULT_SPECIALTIES: &[&str] = &[
    "Cardiology",
    "Neurology",
    "Hematology",
    "Nephrology",
    "Gastroenterology",
    "Pulmonology",
    "Endocrinology",
    "Infectious Diseases",
];
