use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum DischargeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to parse configuration YAML: {0}")]
    ConfigYaml(String),
    #[error("failed to read configuration file: {0}")]
    ConfigRead(std::io::Error),

    #[error("failed to load active records: {0}")]
    RemoteRead(#[source] StoreError),
    #[error("failed to count discharges: {0}")]
    RemoteCount(#[source] StoreError),
    #[error("failed to record discharge: {0}")]
    RemoteWrite(#[source] StoreError),

    #[error("{0}")]
    Validation(String),
    #[error("no record selected")]
    NoSelection,
    #[error("record not found in the active list: {0}")]
    RecordNotFound(String),

    #[error("local midnight does not exist on {0}")]
    InvalidDayWindow(chrono::NaiveDate),
}

pub type DischargeResult<T> = std::result::Result<T, DischargeError>;
