//! Request and response bodies of the REST API.

use discharge_core::{ActiveRecord, DischargeOutcome, SpecialtyStatistic};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
    /// Backend the panel reads from and writes to (`memory` or `rest`).
    pub store: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecordsQuery {
    /// Matches patient name (case-insensitive) or MRN (case-sensitive).
    pub search: Option<String>,
    /// Exact specialty; empty means all specialties.
    pub specialty: Option<String>,
}

/// One entry of the active list, flattened across admissions and consultations.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordRes {
    pub kind: String,
    pub mrn: String,
    pub patient_name: String,
    pub specialty: String,
    pub admission_date: Option<String>,
    pub admission_time: Option<String>,
    pub created_at: Option<String>,
    pub requesting_department: Option<String>,
}

impl From<&ActiveRecord> for RecordRes {
    fn from(record: &ActiveRecord) -> Self {
        let mut res = RecordRes {
            kind: record.kind().to_string(),
            mrn: record.mrn().to_string(),
            patient_name: record.patient_name().to_string(),
            specialty: record.specialty().to_string(),
            admission_date: None,
            admission_time: None,
            created_at: None,
            requesting_department: None,
        };
        match record {
            ActiveRecord::Admission(a) => {
                res.admission_date = Some(a.admission_date.to_string());
                res.admission_time = a.admission_time.clone();
            }
            ActiveRecord::Consultation(c) => {
                res.created_at = Some(c.created_at.to_rfc3339());
                res.requesting_department = c.requesting_department.clone();
            }
        }
        res
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordsRes {
    /// Records passing the search and specialty filter, in list order.
    pub records: Vec<RecordRes>,
    /// Size of the unfiltered active list.
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatisticRes {
    pub specialty: String,
    pub admissions_discharged: u64,
    pub consultations_completed: u64,
}

impl From<&SpecialtyStatistic> for StatisticRes {
    fn from(stat: &SpecialtyStatistic) -> Self {
        StatisticRes {
            specialty: stat.specialty.to_string(),
            admissions_discharged: stat.admissions_discharged,
            consultations_completed: stat.consultations_completed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatisticsRes {
    pub statistics: Vec<StatisticRes>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DischargeReq {
    /// `admission` or `consultation`.
    pub kind: String,
    pub mrn: String,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DischargeRes {
    pub kind: String,
    pub mrn: String,
    pub message: String,
}

impl From<DischargeOutcome> for DischargeRes {
    fn from(outcome: DischargeOutcome) -> Self {
        DischargeRes {
            kind: outcome.key.kind.to_string(),
            mrn: outcome.key.mrn.to_string(),
            message: outcome.message,
        }
    }
}
