//! In-memory record store
//!
//! Serves fixed tables with switchable per-collection failures. Used by the
//! test suites and the benchmarks to drive the cache without a database.

use super::{Batch, Collection, RecordStore};
use crate::error::CoreError;
use crate::models::{
    Alert, DailyCharges, Fault, MonthlySuccess, MultiAttemptGroup, PdcDailyDuration, Session,
    SiteDailyDuration, SuspiciousTransaction, VehicleCharge,
};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct Tables {
    sessions: Vec<Session>,
    alerts: Vec<Alert>,
    faults: Vec<Fault>,
    suspicious: Vec<SuspiciousTransaction>,
    multi_attempts: Vec<MultiAttemptGroup>,
    vehicle_charges: Vec<VehicleCharge>,
    monthly_success: Vec<MonthlySuccess>,
    daily_charges: Vec<DailyCharges>,
    site_durations: Vec<SiteDailyDuration>,
    pdc_durations: Vec<PdcDailyDuration>,
}

/// Record store backed by plain vectors
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    failing: RwLock<HashSet<Collection>>,
    unreachable: AtomicBool,
    loads: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions(self, sessions: Vec<Session>) -> Self {
        self.set_sessions(sessions);
        self
    }

    pub fn with_alerts(self, alerts: Vec<Alert>) -> Self {
        self.set_alerts(alerts);
        self
    }

    pub fn with_faults(self, faults: Vec<Fault>) -> Self {
        self.tables.write().faults = faults;
        self
    }

    pub fn with_suspicious(self, suspicious: Vec<SuspiciousTransaction>) -> Self {
        self.tables.write().suspicious = suspicious;
        self
    }

    pub fn with_multi_attempts(self, groups: Vec<MultiAttemptGroup>) -> Self {
        self.tables.write().multi_attempts = groups;
        self
    }

    pub fn with_monthly_success(self, months: Vec<MonthlySuccess>) -> Self {
        self.tables.write().monthly_success = months;
        self
    }

    pub fn with_daily_charges(self, daily: Vec<DailyCharges>) -> Self {
        self.tables.write().daily_charges = daily;
        self
    }

    pub fn with_vehicle_charges(self, charges: Vec<VehicleCharge>) -> Self {
        self.tables.write().vehicle_charges = charges;
        self
    }

    pub fn with_site_durations(self, rows: Vec<SiteDailyDuration>) -> Self {
        self.tables.write().site_durations = rows;
        self
    }

    pub fn with_pdc_durations(self, rows: Vec<PdcDailyDuration>) -> Self {
        self.tables.write().pdc_durations = rows;
        self
    }

    /// Replace the session table served by subsequent loads
    pub fn set_sessions(&self, sessions: Vec<Session>) {
        self.tables.write().sessions = sessions;
    }

    /// Replace the alert table served by subsequent loads
    pub fn set_alerts(&self, alerts: Vec<Alert>) {
        self.tables.write().alerts = alerts;
    }

    /// Make loads of `collection` fail (or succeed again)
    pub fn set_failing(&self, collection: Collection, failing: bool) {
        let mut guard = self.failing.write();
        if failing {
            guard.insert(collection);
        } else {
            guard.remove(&collection);
        }
    }

    /// Make every load fail with a connection error
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Number of load calls served so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn serve<T: Clone>(
        &self,
        collection: Collection,
        pick: impl FnOnce(&Tables) -> &Vec<T>,
    ) -> Result<Batch<T>, CoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);

        if self.unreachable.load(Ordering::SeqCst) {
            return Err(CoreError::connection("in-memory store marked unreachable"));
        }
        if self.failing.read().contains(&collection) {
            return Err(CoreError::load(collection, "simulated load failure"));
        }

        let tables = self.tables.read();
        Ok(Batch::new(pick(&tables).clone()))
    }
}

impl RecordStore for InMemoryStore {
    fn load_sessions(&self) -> Result<Batch<Session>, CoreError> {
        self.serve(Collection::Sessions, |t| &t.sessions)
    }

    fn load_alerts(&self) -> Result<Batch<Alert>, CoreError> {
        self.serve(Collection::Alerts, |t| &t.alerts)
    }

    fn load_faults(&self) -> Result<Batch<Fault>, CoreError> {
        self.serve(Collection::Faults, |t| &t.faults)
    }

    fn load_suspicious(&self) -> Result<Batch<SuspiciousTransaction>, CoreError> {
        self.serve(Collection::Suspicious, |t| &t.suspicious)
    }

    fn load_multi_attempts(&self) -> Result<Batch<MultiAttemptGroup>, CoreError> {
        self.serve(Collection::MultiAttempts, |t| &t.multi_attempts)
    }

    fn load_vehicle_charges(&self) -> Result<Batch<VehicleCharge>, CoreError> {
        self.serve(Collection::VehicleCharges, |t| &t.vehicle_charges)
    }

    fn load_monthly_success(&self) -> Result<Batch<MonthlySuccess>, CoreError> {
        self.serve(Collection::MonthlySuccess, |t| &t.monthly_success)
    }

    fn load_daily_charges(&self) -> Result<Batch<DailyCharges>, CoreError> {
        self.serve(Collection::DailyCharges, |t| &t.daily_charges)
    }

    fn load_site_durations(&self) -> Result<Batch<SiteDailyDuration>, CoreError> {
        self.serve(Collection::SiteDurations, |t| &t.site_durations)
    }

    fn load_pdc_durations(&self) -> Result<Batch<PdcDailyDuration>, CoreError> {
        self.serve(Collection::PdcDurations, |t| &t.pdc_durations)
    }
}
