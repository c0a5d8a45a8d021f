//! Discharge command.
//!
//! Moves a selected record to its terminal status: admissions become `Discharged` with the
//! discharge date, time and note recorded; consultations become `Completed` and carry no
//! discharge fields. The update is keyed by MRN on the record's own table.

use crate::constants::{
    FIELD_DISCHARGE_DATE, FIELD_DISCHARGE_NOTE, FIELD_DISCHARGE_TIME, FIELD_MRN, FIELD_STATUS,
    FIELD_UPDATED_AT,
};
use crate::model::{ActiveRecord, AdmissionStatus, ConsultationStatus, RecordKind};
use crate::store::{Filter, Patch, RecordStore};
use crate::{DischargeError, DischargeResult};
use chrono::{DateTime, SecondsFormat, Utc};
use discharge_types::NonEmptyText;
use serde::{Deserialize, Serialize};

/// Discharge form fields as entered. Date and time are required, the note is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DischargeForm {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl DischargeForm {
    pub fn new(date: impl Into<String>, time: impl Into<String>, note: Option<String>) -> Self {
        Self {
            date: date.into(),
            time: time.into(),
            note,
        }
    }

    /// Checks that date and time are present.
    ///
    /// # Errors
    ///
    /// Returns [`DischargeError::Validation`] naming the missing fields.
    pub fn validate(&self) -> DischargeResult<ValidatedDischarge> {
        let date = NonEmptyText::new(&self.date);
        let time = NonEmptyText::new(&self.time);

        match (date, time) {
            (Ok(date), Ok(time)) => Ok(ValidatedDischarge {
                date,
                time,
                note: self.note.clone().unwrap_or_default(),
            }),
            (Err(_), Err(_)) => Err(DischargeError::Validation(
                "discharge date and time are required".into(),
            )),
            (Err(_), Ok(_)) => Err(DischargeError::Validation(
                "discharge date is required".into(),
            )),
            (Ok(_), Err(_)) => Err(DischargeError::Validation(
                "discharge time is required".into(),
            )),
        }
    }
}

/// A discharge form that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedDischarge {
    pub date: NonEmptyText,
    pub time: NonEmptyText,
    pub note: String,
}

/// Builds the status patch for `kind`.
///
/// Only admissions receive discharge fields.
pub fn discharge_patch(
    kind: RecordKind,
    discharge: &ValidatedDischarge,
    now: DateTime<Utc>,
) -> Patch {
    let updated_at = now.to_rfc3339_opts(SecondsFormat::Millis, true);

    match kind {
        RecordKind::Admission => Patch::new()
            .set(FIELD_STATUS, AdmissionStatus::Discharged.as_str())
            .set(FIELD_DISCHARGE_DATE, discharge.date.as_str())
            .set(FIELD_DISCHARGE_TIME, discharge.time.as_str())
            .set(FIELD_DISCHARGE_NOTE, discharge.note.as_str())
            .set(FIELD_UPDATED_AT, updated_at),
        RecordKind::Consultation => Patch::new()
            .set(FIELD_STATUS, ConsultationStatus::Completed.as_str())
            .set(FIELD_UPDATED_AT, updated_at),
    }
}

/// Writes the terminal status of `record` to the store.
///
/// # Errors
///
/// Returns [`DischargeError::RemoteWrite`] if the store rejects the update.
pub async fn discharge_record<S>(
    store: &S,
    record: &ActiveRecord,
    discharge: &ValidatedDischarge,
    now: DateTime<Utc>,
) -> DischargeResult<()>
where
    S: RecordStore + ?Sized,
{
    let kind = record.kind();
    let filter = Filter::new().eq(FIELD_MRN, record.mrn().as_str());
    let patch = discharge_patch(kind, discharge, now);

    store
        .update(kind.table(), &filter, &patch)
        .await
        .map_err(DischargeError::RemoteWrite)?;

    tracing::info!(kind = %kind, mrn = %record.mrn(), "recorded discharge");
    Ok(())
}
