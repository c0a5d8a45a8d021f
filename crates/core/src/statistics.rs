//! Daily discharge statistics per specialty.
//!
//! For each configured specialty two counts are issued: admissions discharged today and
//! consultations completed today. All counts run concurrently; a specialty's result is assembled
//! once both of its counts resolve, and the first failing count fails the whole computation.

use crate::clock::DayWindow;
use crate::constants::{
    ADMISSIONS_TABLE, CONSULTATIONS_TABLE, FIELD_CONSULTATION_SPECIALTY, FIELD_SPECIALTY,
    FIELD_STATUS, FIELD_UPDATED_AT,
};
use crate::model::{AdmissionStatus, ConsultationStatus};
use crate::store::{Filter, RecordStore};
use crate::{DischargeError, DischargeResult};
use discharge_types::Specialty;
use futures_util::future::try_join_all;
use serde::Serialize;

/// Same-day activity for one specialty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SpecialtyStatistic {
    pub specialty: Specialty,
    pub admissions_discharged: u64,
    pub consultations_completed: u64,
}

impl SpecialtyStatistic {
    pub fn has_activity(&self) -> bool {
        self.admissions_discharged > 0 || self.consultations_completed > 0
    }
}

/// Computes today's discharge statistics for `specialties`.
///
/// Results keep the order of `specialties`. Specialties with no discharged admission and no
/// completed consultation inside `window` are left out.
///
/// # Errors
///
/// Returns [`DischargeError::RemoteCount`] if any count fails.
pub async fn compute_daily_statistics<S>(
    store: &S,
    specialties: &[Specialty],
    window: &DayWindow,
) -> DischargeResult<Vec<SpecialtyStatistic>>
where
    S: RecordStore + ?Sized,
{
    let start = window.start_rfc3339();
    let end = window.end_rfc3339();

    let per_specialty = specialties
        .iter()
        .map(|specialty| count_specialty(store, specialty, &start, &end));

    let statistics = try_join_all(per_specialty).await?;

    let active: Vec<SpecialtyStatistic> = statistics
        .into_iter()
        .filter(SpecialtyStatistic::has_activity)
        .collect();

    tracing::info!(
        date = %window.date,
        specialties = specialties.len(),
        reported = active.len(),
        "computed daily discharge statistics"
    );

    Ok(active)
}

async fn count_specialty<S>(
    store: &S,
    specialty: &Specialty,
    start: &str,
    end: &str,
) -> DischargeResult<SpecialtyStatistic>
where
    S: RecordStore + ?Sized,
{
    let admissions = Filter::new()
        .eq(FIELD_SPECIALTY, specialty.as_str())
        .eq(FIELD_STATUS, AdmissionStatus::Discharged.as_str())
        .gte(FIELD_UPDATED_AT, start)
        .lte(FIELD_UPDATED_AT, end);

    let consultations = Filter::new()
        .eq(FIELD_CONSULTATION_SPECIALTY, specialty.as_str())
        .eq(FIELD_STATUS, ConsultationStatus::Completed.as_str())
        .gte(FIELD_UPDATED_AT, start)
        .lte(FIELD_UPDATED_AT, end);

    let (admissions_discharged, consultations_completed) = tokio::try_join!(
        store.count(ADMISSIONS_TABLE, &admissions),
        store.count(CONSULTATIONS_TABLE, &consultations),
    )
    .map_err(DischargeError::RemoteCount)?;

    Ok(SpecialtyStatistic {
        specialty: specialty.clone(),
        admissions_discharged,
        consultations_completed,
    })
}
