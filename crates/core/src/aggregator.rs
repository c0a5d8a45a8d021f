//! Active record aggregation.
//!
//! Loads active admissions and active consultations concurrently and merges them into one list,
//! admissions first. Either read failing fails the whole load.

use crate::constants::{
    ADMISSIONS_TABLE, CONSULTATIONS_TABLE, FIELD_ADMISSION_DATE, FIELD_CREATED_AT, FIELD_STATUS,
};
use crate::model::{ActiveRecord, Admission, AdmissionStatus, Consultation, ConsultationStatus};
use crate::store::{Filter, Order, RecordStore, StoreError};
use crate::{DischargeError, DischargeResult};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Fetches every active admission and active consultation.
///
/// Admissions are ordered by admission date and consultations by creation time, both most recent
/// first, and admissions precede consultations in the returned list.
///
/// # Errors
///
/// Returns [`DischargeError::RemoteRead`] if either fetch fails or a returned row cannot be
/// decoded. No partial list is returned.
pub async fn load_active_records<S>(store: &S) -> DischargeResult<Vec<ActiveRecord>>
where
    S: RecordStore + ?Sized,
{
    let admissions_filter = Filter::new().eq(FIELD_STATUS, AdmissionStatus::Active.as_str());
    let admissions_order = Order::descending(FIELD_ADMISSION_DATE);
    let consultations_filter =
        Filter::new().eq(FIELD_STATUS, ConsultationStatus::Active.as_str());
    let consultations_order = Order::descending(FIELD_CREATED_AT);

    let (admission_rows, consultation_rows) = tokio::try_join!(
        store.select(ADMISSIONS_TABLE, &admissions_filter, Some(&admissions_order)),
        store.select(
            CONSULTATIONS_TABLE,
            &consultations_filter,
            Some(&consultations_order)
        ),
    )
    .map_err(DischargeError::RemoteRead)?;

    let admissions: Vec<Admission> = decode_rows(admission_rows)?;
    let consultations: Vec<Consultation> = decode_rows(consultation_rows)?;

    tracing::info!(
        admissions = admissions.len(),
        consultations = consultations.len(),
        "loaded active records"
    );

    Ok(admissions
        .into_iter()
        .map(ActiveRecord::Admission)
        .chain(consultations.into_iter().map(ActiveRecord::Consultation))
        .collect())
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> DischargeResult<Vec<T>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row)
                .map_err(|e| DischargeError::RemoteRead(StoreError::Decode(e.to_string())))
        })
        .collect()
}
