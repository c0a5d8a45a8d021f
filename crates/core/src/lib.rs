//! # Discharge Core
//!
//! Core logic of the discharge management panel:
//! - Aggregating active admissions and consultations into one tagged list
//! - Computing today's discharge statistics per configured specialty
//! - Recording a discharge or consultation completion through the store gateway
//! - Search and specialty filtering over the loaded list
//!
//! Persistence stays behind [`store::RecordStore`]; user-visible outcomes go through
//! [`notify::Notifier`].
//!
//! **No API concerns**: HTTP servers, remote backend adapters and command-line parsing belong in
//! `api-rest`, `discharge-store` and `discharge-cli`.

pub mod aggregator;
pub mod clock;
pub mod config;
pub mod constants;
pub mod discharge;
pub mod error;
pub mod model;
pub mod notify;
pub mod panel;
pub mod search;
pub mod statistics;
pub mod store;

pub use clock::{Clock, DayWindow, FixedClock, SystemClock};
pub use config::CoreConfig;
pub use discharge::DischargeForm;
pub use discharge_types::{Mrn, NonEmptyText, Specialty, TextError};
pub use error::{DischargeError, DischargeResult};
pub use model::{ActiveRecord, Admission, Consultation, RecordKey, RecordKind};
pub use notify::{Notifier, RecordingNotifier, TracingNotifier};
pub use panel::{DischargeOutcome, DischargePanel};
pub use search::SearchFilter;
pub use statistics::SpecialtyStatistic;
pub use store::{InMemoryStore, RecordStore, StoreError, StoreResult};
