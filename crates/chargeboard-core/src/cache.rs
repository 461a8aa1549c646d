//! Refreshable in-memory analytical cache
//!
//! One `parking_lot::RwLock<Arc<Vec<T>>>` per collection. A refresh loads each
//! collection on the blocking pool with no lock held, then swaps the new
//! `Arc` in under a brief write lock. Readers only clone the `Arc`, so they
//! never wait on a load and keep a consistent snapshot for as long as they
//! hold it.

use crate::error::{CoreError, DegradedState, LoadError, RefreshReport};
use crate::event::{DataEvent, EventBus};
use crate::models::{
    Alert, DailyCharges, Fault, MonthlySuccess, MultiAttemptGroup, PdcDailyDuration, Session,
    SiteDailyDuration, SuspiciousTransaction, VehicleCharge,
};
use crate::source::{Batch, Collection, RecordStore};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

type Loader<T> = fn(&dyn RecordStore) -> Result<Batch<T>, CoreError>;

/// Snapshot holder for every collection of the KPI database
///
/// Constructed explicitly and shared as `Arc<AnalyticalCache>`.
pub struct AnalyticalCache {
    store: Arc<dyn RecordStore>,

    sessions: RwLock<Arc<Vec<Session>>>,
    alerts: RwLock<Arc<Vec<Alert>>>,
    faults: RwLock<Arc<Vec<Fault>>>,
    suspicious: RwLock<Arc<Vec<SuspiciousTransaction>>>,
    multi_attempts: RwLock<Arc<Vec<MultiAttemptGroup>>>,
    vehicle_charges: RwLock<Arc<Vec<VehicleCharge>>>,
    monthly_success: RwLock<Arc<Vec<MonthlySuccess>>>,
    daily_charges: RwLock<Arc<Vec<DailyCharges>>>,
    site_durations: RwLock<Arc<Vec<SiteDailyDuration>>>,
    pdc_durations: RwLock<Arc<Vec<PdcDailyDuration>>>,

    /// End of the last completed pass, `None` before the first one
    last_update: RwLock<Option<DateTime<Utc>>>,

    degraded_state: RwLock<DegradedState>,

    event_bus: EventBus,

    /// At most one refresh in flight
    refresh_gate: tokio::sync::Mutex<()>,
}

impl AnalyticalCache {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_event_bus(store, EventBus::default_capacity())
    }

    pub fn with_event_bus(store: Arc<dyn RecordStore>, event_bus: EventBus) -> Self {
        Self {
            store,
            sessions: RwLock::default(),
            alerts: RwLock::default(),
            faults: RwLock::default(),
            suspicious: RwLock::default(),
            multi_attempts: RwLock::default(),
            vehicle_charges: RwLock::default(),
            monthly_success: RwLock::default(),
            daily_charges: RwLock::default(),
            site_durations: RwLock::default(),
            pdc_durations: RwLock::default(),
            last_update: RwLock::new(None),
            degraded_state: RwLock::new(DegradedState::Healthy),
            event_bus,
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn degraded_state(&self) -> DegradedState {
        self.degraded_state.read().clone()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        *self.last_update.read()
    }

    /// Reload every collection from the store
    ///
    /// A collection that fails keeps its previous snapshot; the failure is
    /// logged and recorded in the report. `last_update` advances once every
    /// collection has been attempted, whatever the individual outcomes.
    pub async fn refresh(&self) -> RefreshReport {
        let _gate = self.refresh_gate.lock().await;
        let started = Instant::now();
        let mut report = RefreshReport::new();

        info!("Starting cache refresh");
        self.event_bus.publish(DataEvent::RefreshStarted);

        self.refresh_collection(Collection::Sessions, |s| s.load_sessions(), &self.sessions, &mut report)
            .await;
        self.refresh_collection(Collection::Alerts, |s| s.load_alerts(), &self.alerts, &mut report)
            .await;
        self.refresh_collection(Collection::Faults, |s| s.load_faults(), &self.faults, &mut report)
            .await;
        self.refresh_collection(
            Collection::Suspicious,
            |s| s.load_suspicious(),
            &self.suspicious,
            &mut report,
        )
        .await;
        self.refresh_collection(
            Collection::MultiAttempts,
            |s| s.load_multi_attempts(),
            &self.multi_attempts,
            &mut report,
        )
        .await;
        self.refresh_collection(
            Collection::VehicleCharges,
            |s| s.load_vehicle_charges(),
            &self.vehicle_charges,
            &mut report,
        )
        .await;
        self.refresh_collection(
            Collection::MonthlySuccess,
            |s| s.load_monthly_success(),
            &self.monthly_success,
            &mut report,
        )
        .await;
        self.refresh_collection(
            Collection::DailyCharges,
            |s| s.load_daily_charges(),
            &self.daily_charges,
            &mut report,
        )
        .await;
        self.refresh_collection(
            Collection::SiteDurations,
            |s| s.load_site_durations(),
            &self.site_durations,
            &mut report,
        )
        .await;
        self.refresh_collection(
            Collection::PdcDurations,
            |s| s.load_pdc_durations(),
            &self.pdc_durations,
            &mut report,
        )
        .await;

        let finished_at = Utc::now();
        report.finished_at = Some(finished_at);
        *self.last_update.write() = Some(finished_at);
        *self.degraded_state.write() = DegradedState::from_report(&report);

        let failed = report.failed_collections().len();
        self.event_bus.publish(DataEvent::RefreshCompleted {
            loaded: Collection::ALL.len() - failed,
            failed,
            at: finished_at,
        });

        info!(
            records_loaded = report.records_loaded,
            records_skipped = report.records_skipped,
            failed_collections = failed,
            connection_failed = report.connection_failed,
            subscribers = self.event_bus.subscriber_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Cache refresh complete"
        );

        report
    }

    async fn refresh_collection<T: Send + Sync + 'static>(
        &self,
        collection: Collection,
        load: Loader<T>,
        slot: &RwLock<Arc<Vec<T>>>,
        report: &mut RefreshReport,
    ) {
        let store = Arc::clone(&self.store);
        let outcome = tokio::task::spawn_blocking(move || load(store.as_ref()))
            .await
            .unwrap_or_else(|e| Err(CoreError::load(collection, format!("load task failed: {}", e))));

        let batch = match outcome {
            Ok(batch) => batch,
            Err(e) => {
                self.record_failure(collection, e, report);
                return;
            }
        };

        let skipped = batch.skipped.len();
        if let Some(first) = batch.skipped.first() {
            warn!(
                collection = %collection,
                skipped,
                first_error = %first,
                "Skipped undecodable rows"
            );
            report.add_warning(
                collection.name(),
                format!("{} rows skipped, first: {}", skipped, first),
            );
        }

        let records = batch.records.len();
        *slot.write() = Arc::new(batch.records);
        report.record_loaded(collection, records, skipped);

        debug!(collection = %collection, records, "Snapshot swapped");
        self.event_bus
            .publish(DataEvent::CollectionUpdated { collection, records });
    }

    fn record_failure(&self, collection: Collection, e: CoreError, report: &mut RefreshReport) {
        if e.is_connection() {
            report.connection_failed = true;
            error!(collection = %collection, error = %e, "Record store unreachable, keeping stale snapshot");
        } else {
            warn!(collection = %collection, error = %e, "Collection load failed, keeping stale snapshot");
        }

        report.add_error(LoadError::from_core_error(collection.name(), &e));
        report.record_failed(collection);
        self.event_bus.publish(DataEvent::CollectionFailed {
            collection,
            message: e.to_string(),
        });
    }

    // ===================
    // Snapshot accessors
    // ===================

    pub fn sessions(&self) -> Arc<Vec<Session>> {
        Arc::clone(&self.sessions.read())
    }

    pub fn alerts(&self) -> Arc<Vec<Alert>> {
        Arc::clone(&self.alerts.read())
    }

    pub fn faults(&self) -> Arc<Vec<Fault>> {
        Arc::clone(&self.faults.read())
    }

    pub fn suspicious(&self) -> Arc<Vec<SuspiciousTransaction>> {
        Arc::clone(&self.suspicious.read())
    }

    pub fn multi_attempts(&self) -> Arc<Vec<MultiAttemptGroup>> {
        Arc::clone(&self.multi_attempts.read())
    }

    pub fn vehicle_charges(&self) -> Arc<Vec<VehicleCharge>> {
        Arc::clone(&self.vehicle_charges.read())
    }

    pub fn monthly_success(&self) -> Arc<Vec<MonthlySuccess>> {
        Arc::clone(&self.monthly_success.read())
    }

    pub fn daily_charges(&self) -> Arc<Vec<DailyCharges>> {
        Arc::clone(&self.daily_charges.read())
    }

    pub fn site_durations(&self) -> Arc<Vec<SiteDailyDuration>> {
        Arc::clone(&self.site_durations.read())
    }

    pub fn pdc_durations(&self) -> Arc<Vec<PdcDailyDuration>> {
        Arc::clone(&self.pdc_durations.read())
    }
}
