//! Discharge panel state.
//!
//! [`DischargePanel`] holds what the discharge screen shows: the active list, today's statistics,
//! the loading flag, the selected record and the form. Every remote failure is reported through
//! the notifier once and leaves the panel usable; retrying means calling the operation again.
//!
//! - a failed active-record load leaves the list empty
//! - a failed statistics refresh keeps the previous statistics
//! - a failed discharge changes nothing locally

use crate::aggregator::load_active_records;
use crate::clock::{Clock, SystemClock};
use crate::config::CoreConfig;
use crate::discharge::{discharge_record, DischargeForm};
use crate::model::{ActiveRecord, RecordKey, RecordKind};
use crate::notify::Notifier;
use crate::search::SearchFilter;
use crate::statistics::{compute_daily_statistics, SpecialtyStatistic};
use crate::store::RecordStore;
use crate::{DischargeError, DischargeResult};
use std::sync::Arc;

/// Outcome of a confirmed discharge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DischargeOutcome {
    pub key: RecordKey,
    pub message: String,
}

pub struct DischargePanel<S, N, C = SystemClock> {
    store: S,
    notifier: N,
    clock: C,
    cfg: Arc<CoreConfig>,
    records: Vec<ActiveRecord>,
    statistics: Vec<SpecialtyStatistic>,
    loading: bool,
    selected: Option<RecordKey>,
    form: DischargeForm,
}

impl<S, N> DischargePanel<S, N, SystemClock>
where
    S: RecordStore,
    N: Notifier,
{
    pub fn new(cfg: Arc<CoreConfig>, store: S, notifier: N) -> Self {
        Self::with_clock(cfg, store, notifier, SystemClock)
    }
}

impl<S, N, C> DischargePanel<S, N, C>
where
    S: RecordStore,
    N: Notifier,
    C: Clock,
{
    pub fn with_clock(cfg: Arc<CoreConfig>, store: S, notifier: N, clock: C) -> Self {
        Self {
            store,
            notifier,
            clock,
            cfg,
            records: Vec::new(),
            statistics: Vec::new(),
            loading: false,
            selected: None,
            form: DischargeForm::default(),
        }
    }

    // ========================================================================
    // LOADING
    // ========================================================================

    /// Loads the active list and today's statistics concurrently.
    ///
    /// Each half succeeds or fails on its own; the first error is returned after both have been
    /// applied.
    pub async fn initial_load(&mut self) -> DischargeResult<()> {
        self.loading = true;

        let specialties = self.cfg.specialties().to_vec();
        let (records, statistics) = {
            let store = &self.store;
            let clock = &self.clock;
            let statistics = async {
                let window = clock.today()?;
                compute_daily_statistics(store, &specialties, &window).await
            };
            tokio::join!(load_active_records(store), statistics)
        };

        let records = self.apply_records(records);
        let statistics = self.apply_statistics(statistics);
        self.loading = false;

        records.and(statistics)
    }

    /// Reloads the active list.
    ///
    /// # Errors
    ///
    /// Returns [`DischargeError::RemoteRead`] after notifying; the list is then empty.
    pub async fn load_active_records(&mut self) -> DischargeResult<()> {
        self.loading = true;
        let result = load_active_records(&self.store).await;
        let result = self.apply_records(result);
        self.loading = false;
        result
    }

    /// Recomputes today's statistics.
    ///
    /// # Errors
    ///
    /// Returns [`DischargeError::RemoteCount`] after notifying; the previous statistics are kept.
    pub async fn refresh_statistics(&mut self) -> DischargeResult<()> {
        let window = match self.clock.today() {
            Ok(window) => window,
            Err(e) => return self.apply_statistics(Err(e)),
        };
        let result =
            compute_daily_statistics(&self.store, self.cfg.specialties(), &window).await;
        self.apply_statistics(result)
    }

    fn apply_records(
        &mut self,
        result: DischargeResult<Vec<ActiveRecord>>,
    ) -> DischargeResult<()> {
        match result {
            Ok(records) => {
                self.records = records;
                self.drop_stale_selection();
                Ok(())
            }
            Err(e) => {
                self.records.clear();
                self.drop_stale_selection();
                self.fail(e)
            }
        }
    }

    fn apply_statistics(
        &mut self,
        result: DischargeResult<Vec<SpecialtyStatistic>>,
    ) -> DischargeResult<()> {
        match result {
            Ok(statistics) => {
                self.statistics = statistics;
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    fn drop_stale_selection(&mut self) {
        if let Some(key) = &self.selected {
            if !self.records.iter().any(|r| r.matches_key(key)) {
                self.selected = None;
            }
        }
    }

    // ========================================================================
    // SELECTION AND FORM
    // ========================================================================

    /// Arms the discharge command for the record identified by `key`.
    ///
    /// # Errors
    ///
    /// Returns [`DischargeError::RecordNotFound`] after notifying if the record is not in the
    /// active list. The current selection is left as it was.
    pub fn select(&mut self, key: RecordKey) -> DischargeResult<()> {
        if !self.records.iter().any(|r| r.matches_key(&key)) {
            return self.fail(DischargeError::RecordNotFound(key.to_string()));
        }
        self.selected = Some(key);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn set_form(&mut self, form: DischargeForm) {
        self.form = form;
    }

    pub fn form(&self) -> &DischargeForm {
        &self.form
    }

    // ========================================================================
    // DISCHARGE
    // ========================================================================

    /// Discharges the selected record using the current form.
    ///
    /// On success the record leaves the active list, the selection and form are cleared and the
    /// statistics are recomputed. A failing statistics refresh is notified but does not undo the
    /// discharge.
    ///
    /// # Errors
    ///
    /// - [`DischargeError::NoSelection`] if nothing is selected or the selection left the list
    /// - [`DischargeError::Validation`] if date or time is missing
    /// - [`DischargeError::RemoteWrite`] if the store rejects the update
    ///
    /// In every error case nothing is written and local state is unchanged.
    pub async fn submit_discharge(&mut self) -> DischargeResult<DischargeOutcome> {
        let record = match self.selected_record() {
            Some(record) => record.clone(),
            None => return self.fail(DischargeError::NoSelection),
        };

        let discharge = match self.form.validate() {
            Ok(discharge) => discharge,
            Err(e) => return self.fail(e),
        };

        let now = self.clock.now();
        if let Err(e) = discharge_record(&self.store, &record, &discharge, now).await {
            return self.fail(e);
        }

        let key = record.key();
        let message = match key.kind {
            RecordKind::Admission => format!("Patient {} discharged", record.patient_name()),
            RecordKind::Consultation => {
                format!("Consultation for {} completed", record.patient_name())
            }
        };
        self.notifier.notify_success(&message);

        self.records.retain(|r| !r.matches_key(&key));
        self.selected = None;
        self.form = DischargeForm::default();

        // The discharge stands even if the refresh fails; the failure is already notified.
        let _ = self.refresh_statistics().await;

        Ok(DischargeOutcome { key, message })
    }

    fn fail<T>(&self, error: DischargeError) -> DischargeResult<T> {
        tracing::warn!("discharge panel operation failed: {error}");
        self.notifier.notify_failure(&error.to_string());
        Err(error)
    }

    // ========================================================================
    // VIEW
    // ========================================================================

    pub fn records(&self) -> &[ActiveRecord] {
        &self.records
    }

    /// Active records passing `filter`. Never touches the store.
    pub fn visible_records(&self, filter: &SearchFilter) -> Vec<&ActiveRecord> {
        filter.apply(&self.records)
    }

    pub fn statistics(&self) -> &[SpecialtyStatistic] {
        &self.statistics
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn selected(&self) -> Option<&RecordKey> {
        self.selected.as_ref()
    }

    /// The selected record, if it is still in the active list.
    pub fn selected_record(&self) -> Option<&ActiveRecord> {
        let key = self.selected.as_ref()?;
        self.records.iter().find(|r| r.matches_key(key))
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::constants::{ADMISSIONS_TABLE, CONSULTATIONS_TABLE, FIELD_DISCHARGE_NOTE};
    use crate::notify::RecordingNotifier;
    use crate::store::memory::StoreOperation;
    use crate::store::InMemoryStore;
    use chrono::{DateTime, Utc};
    use discharge_types::{Mrn, Specialty};
    use serde_json::json;

    type TestPanel = DischargePanel<Arc<InMemoryStore>, Arc<RecordingNotifier>, FixedClock>;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T10:05:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn test_cfg() -> Arc<CoreConfig> {
        Arc::new(
            CoreConfig::new(vec![
                Specialty::new("Neurology").unwrap(),
                Specialty::new("Hematology").unwrap(),
            ])
            .expect("CoreConfig::new should succeed"),
        )
    }

    fn seeded_store() -> Arc<InMemoryStore> {
        let store = InMemoryStore::new();
        store.insert(
            ADMISSIONS_TABLE,
            json!({"mrn": "A1", "patient_name": "John Doe", "admission_date": "2024-02-20", "status": "Active", "specialty": "Neurology"}),
        );
        store.insert(
            CONSULTATIONS_TABLE,
            json!({"mrn": "C1", "patient_name": "Jane Roe", "created_at": "2024-02-28T09:00:00Z", "status": "Active", "consultation_specialty": "Hematology"}),
        );
        Arc::new(store)
    }

    fn panel(store: Arc<InMemoryStore>) -> (TestPanel, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let panel = DischargePanel::with_clock(
            test_cfg(),
            store,
            notifier.clone(),
            FixedClock::utc(now()),
        );
        (panel, notifier)
    }

    fn key(kind: RecordKind, mrn: &str) -> RecordKey {
        RecordKey::new(kind, Mrn::new(mrn).unwrap())
    }

    async fn loaded(store: Arc<InMemoryStore>) -> (TestPanel, Arc<RecordingNotifier>) {
        let (mut panel, notifier) = panel(store);
        panel
            .initial_load()
            .await
            .expect("initial load should succeed");
        (panel, notifier)
    }

    #[tokio::test]
    async fn test_initial_load_populates_list_and_clears_loading() {
        let (panel, notifier) = loaded(seeded_store()).await;

        assert_eq!(panel.records().len(), 2);
        assert!(panel.statistics().is_empty());
        assert!(!panel.is_loading());
        assert!(notifier.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_failed_load_leaves_empty_list_and_notifies() {
        let store = seeded_store();
        let (mut panel, notifier) = loaded(store.clone()).await;
        store.fail(StoreOperation::Select, ADMISSIONS_TABLE);

        let err = panel
            .load_active_records()
            .await
            .expect_err("load should fail");

        assert!(matches!(err, DischargeError::RemoteRead(_)));
        assert!(panel.records().is_empty(), "no partial list is kept");
        assert!(!panel.is_loading());
        assert_eq!(notifier.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_discharge_admission_scenario() {
        let store = seeded_store();
        let (mut panel, notifier) = loaded(store.clone()).await;

        panel
            .select(key(RecordKind::Admission, "A1"))
            .expect("A1 should be selectable");
        panel.set_form(DischargeForm::new("2024-03-01", "10:00", Some("stable".into())));

        let outcome = panel
            .submit_discharge()
            .await
            .expect("discharge should succeed");

        assert_eq!(outcome.key, key(RecordKind::Admission, "A1"));
        let updates = store.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(
            updates[0].patch.get("status"),
            Some(&json!("Discharged"))
        );
        assert_eq!(
            updates[0].patch.get("discharge_date"),
            Some(&json!("2024-03-01"))
        );
        assert_eq!(updates[0].patch.get("discharge_time"), Some(&json!("10:00")));
        assert_eq!(updates[0].patch.get("discharge_note"), Some(&json!("stable")));

        assert!(panel.records().iter().all(|r| r.mrn().as_str() != "A1"));
        assert!(panel
            .visible_records(&SearchFilter::new("A1", None))
            .is_empty());
        assert_eq!(panel.selected(), None);
        assert_eq!(panel.form(), &DischargeForm::default());
        assert_eq!(notifier.successes().len(), 1);
    }

    #[tokio::test]
    async fn test_discharge_consultation_scenario() {
        let store = seeded_store();
        let (mut panel, _notifier) = loaded(store.clone()).await;

        panel.select(key(RecordKind::Consultation, "C1")).unwrap();
        panel.set_form(DischargeForm::new("2024-03-01", "10:00", Some("n/a".into())));
        panel.submit_discharge().await.expect("discharge should succeed");

        let updates = store.updates();
        assert_eq!(updates[0].table, CONSULTATIONS_TABLE);
        assert_eq!(updates[0].patch.get("status"), Some(&json!("Completed")));
        assert!(!updates[0].patch.contains(FIELD_DISCHARGE_NOTE));
        assert!(panel.records().iter().all(|r| r.mrn().as_str() != "C1"));
    }

    #[tokio::test]
    async fn test_discharge_refreshes_statistics() {
        let store = seeded_store();
        let (mut panel, _notifier) = loaded(store).await;

        panel.select(key(RecordKind::Admission, "A1")).unwrap();
        panel.set_form(DischargeForm::new("2024-03-01", "10:00", None));
        panel.submit_discharge().await.unwrap();

        let stats = panel.statistics();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].specialty.as_str(), "Neurology");
        assert_eq!(stats[0].admissions_discharged, 1);
        assert_eq!(stats[0].consultations_completed, 0);
    }

    #[tokio::test]
    async fn test_missing_date_is_rejected_without_write() {
        let store = seeded_store();
        let (mut panel, notifier) = loaded(store.clone()).await;

        panel.select(key(RecordKind::Admission, "A1")).unwrap();
        panel.set_form(DischargeForm::new("", "10:00", None));

        let err = panel
            .submit_discharge()
            .await
            .expect_err("submit should fail");

        assert!(matches!(err, DischargeError::Validation(_)));
        assert!(store.updates().is_empty(), "no write may be attempted");
        assert_eq!(panel.records().len(), 2);
        assert_eq!(panel.selected(), Some(&key(RecordKind::Admission, "A1")));
        assert_eq!(notifier.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_resubmit_after_success_is_a_precondition_failure() {
        let store = seeded_store();
        let (mut panel, _notifier) = loaded(store.clone()).await;

        panel.select(key(RecordKind::Admission, "A1")).unwrap();
        panel.set_form(DischargeForm::new("2024-03-01", "10:00", None));
        panel.submit_discharge().await.unwrap();

        panel.set_form(DischargeForm::new("2024-03-01", "10:00", None));
        let err = panel
            .submit_discharge()
            .await
            .expect_err("second submit should fail");

        assert!(matches!(err, DischargeError::NoSelection));
        assert_eq!(store.updates().len(), 1);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_list_and_selection() {
        let store = seeded_store();
        let (mut panel, notifier) = loaded(store.clone()).await;
        store.fail(StoreOperation::Update, ADMISSIONS_TABLE);

        panel.select(key(RecordKind::Admission, "A1")).unwrap();
        panel.set_form(DischargeForm::new("2024-03-01", "10:00", None));

        let err = panel
            .submit_discharge()
            .await
            .expect_err("submit should fail");

        assert!(matches!(err, DischargeError::RemoteWrite(_)));
        assert_eq!(panel.records().len(), 2);
        assert_eq!(panel.selected(), Some(&key(RecordKind::Admission, "A1")));
        assert_eq!(
            panel.form(),
            &DischargeForm::new("2024-03-01", "10:00", None)
        );
        assert_eq!(notifier.failures().len(), 1);
        assert!(notifier.successes().is_empty());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_stale_statistics() {
        let store = seeded_store();
        store.insert(
            ADMISSIONS_TABLE,
            json!({"mrn": "A7", "admission_date": "2024-02-01", "status": "Discharged", "specialty": "Neurology", "updated_at": "2024-03-01T09:00:00Z"}),
        );
        let (mut panel, notifier) = loaded(store.clone()).await;
        assert_eq!(panel.statistics().len(), 1);

        store.fail(StoreOperation::Count, CONSULTATIONS_TABLE);
        let err = panel
            .refresh_statistics()
            .await
            .expect_err("refresh should fail");

        assert!(matches!(err, DischargeError::RemoteCount(_)));
        assert_eq!(panel.statistics().len(), 1, "stale statistics are kept");
        assert_eq!(notifier.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_select_rejects_record_not_in_list() {
        let (mut panel, notifier) = loaded(seeded_store()).await;

        let err = panel
            .select(key(RecordKind::Consultation, "A1"))
            .expect_err("kind must match as well as mrn");
        assert!(matches!(err, DischargeError::RecordNotFound(_)));
        assert_eq!(panel.selected(), None);
        assert_eq!(notifier.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_selecting_discharged_record_again_is_notified() {
        let store = seeded_store();
        let (mut panel, notifier) = loaded(store.clone()).await;

        panel.select(key(RecordKind::Admission, "A1")).unwrap();
        panel.set_form(DischargeForm::new("2024-03-01", "10:00", None));
        panel.submit_discharge().await.unwrap();

        let err = panel
            .select(key(RecordKind::Admission, "A1"))
            .expect_err("discharged record is no longer selectable");

        assert!(matches!(err, DischargeError::RecordNotFound(_)));
        assert_eq!(store.updates().len(), 1);
        assert_eq!(notifier.failures().len(), 1);
        assert_eq!(notifier.successes().len(), 1);
    }

    #[tokio::test]
    async fn test_initial_load_keeps_statistics_when_list_fails() {
        let store = seeded_store();
        store.insert(
            ADMISSIONS_TABLE,
            json!({"mrn": "A7", "admission_date": "2024-02-01", "status": "Discharged", "specialty": "Neurology", "updated_at": "2024-03-01T09:00:00Z"}),
        );
        store.fail(StoreOperation::Select, ADMISSIONS_TABLE);
        let (mut panel, notifier) = panel(store);

        let err = panel
            .initial_load()
            .await
            .expect_err("initial load should report the list failure");

        assert!(matches!(err, DischargeError::RemoteRead(_)));
        assert!(panel.records().is_empty());
        assert_eq!(panel.statistics().len(), 1);
        assert_eq!(panel.statistics()[0].admissions_discharged, 1);
        assert!(!panel.is_loading());
        assert_eq!(notifier.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_initial_load_keeps_list_when_counts_fail() {
        let store = seeded_store();
        store.fail(StoreOperation::Count, ADMISSIONS_TABLE);
        let (mut panel, notifier) = panel(store);

        let err = panel
            .initial_load()
            .await
            .expect_err("initial load should report the count failure");

        assert!(matches!(err, DischargeError::RemoteCount(_)));
        assert_eq!(panel.records().len(), 2);
        assert!(panel.statistics().is_empty());
        assert!(!panel.is_loading());
        assert_eq!(notifier.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_shared_mrn_only_removes_discharged_kind() {
        let store = seeded_store();
        store.insert(
            CONSULTATIONS_TABLE,
            json!({"mrn": "A1", "patient_name": "John Doe", "created_at": "2024-02-29T09:00:00Z", "status": "Active", "consultation_specialty": "Neurology"}),
        );
        let (mut panel, _notifier) = loaded(store).await;

        panel.select(key(RecordKind::Admission, "A1")).unwrap();
        panel.set_form(DischargeForm::new("2024-03-01", "10:00", None));
        panel.submit_discharge().await.unwrap();

        let remaining: Vec<String> = panel.records().iter().map(|r| r.key().to_string()).collect();
        assert_eq!(remaining, vec!["consultation A1", "consultation C1"]);
    }
}
