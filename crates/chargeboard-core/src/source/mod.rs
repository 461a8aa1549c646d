//! Record store boundary
//!
//! The cache only ever asks a store for full snapshots of a collection.
//! Column-to-field mapping is the store's business.

mod memory;
mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteRecordStore;

use crate::error::CoreError;
use crate::models::{
    Alert, DailyCharges, Fault, MonthlySuccess, MultiAttemptGroup, PdcDailyDuration, Session,
    SiteDailyDuration, SuspiciousTransaction, VehicleCharge,
};
use serde::Serialize;
use std::fmt;

/// Every collection held by the analytical cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Sessions,
    Alerts,
    Faults,
    Suspicious,
    MultiAttempts,
    VehicleCharges,
    MonthlySuccess,
    DailyCharges,
    SiteDurations,
    PdcDurations,
}

impl Collection {
    /// Refresh order
    pub const ALL: [Collection; 10] = [
        Collection::Sessions,
        Collection::Alerts,
        Collection::Faults,
        Collection::Suspicious,
        Collection::MultiAttempts,
        Collection::VehicleCharges,
        Collection::MonthlySuccess,
        Collection::DailyCharges,
        Collection::SiteDurations,
        Collection::PdcDurations,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Sessions => "sessions",
            Collection::Alerts => "alerts",
            Collection::Faults => "faults",
            Collection::Suspicious => "suspicious",
            Collection::MultiAttempts => "multi_attempts",
            Collection::VehicleCharges => "vehicle_charges",
            Collection::MonthlySuccess => "monthly_success",
            Collection::DailyCharges => "daily_charges",
            Collection::SiteDurations => "site_durations",
            Collection::PdcDurations => "pdc_durations",
        }
    }

    /// Source table in the KPI database
    pub fn table_name(self) -> &'static str {
        match self {
            Collection::Sessions => "kpi_sessions",
            Collection::Alerts => "kpi_alertes",
            Collection::Faults => "kpi_defauts_log",
            Collection::Suspicious => "kpi_suspicious_under_1kwh",
            Collection::MultiAttempts => "kpi_multi_attempts_hour",
            Collection::VehicleCharges => "kpi_charges_mac",
            Collection::MonthlySuccess => "kpi_evo",
            Collection::DailyCharges => "kpi_charges_daily_by_site",
            Collection::SiteDurations => "kpi_durations_site_daily",
            Collection::PdcDurations => "kpi_durations_pdc_daily",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered records of one collection plus the rows dropped while decoding
#[derive(Debug)]
pub struct Batch<T> {
    pub records: Vec<T>,
    pub skipped: Vec<CoreError>,
}

impl<T> Batch<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            records,
            skipped: Vec::new(),
        }
    }
}

impl<T> Default for Batch<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Bulk loader for every record collection
///
/// Loads are blocking and may be slow; the cache runs them on the blocking
/// thread pool and never holds a lock across them.
pub trait RecordStore: Send + Sync + 'static {
    fn load_sessions(&self) -> Result<Batch<Session>, CoreError>;
    fn load_alerts(&self) -> Result<Batch<Alert>, CoreError>;
    fn load_faults(&self) -> Result<Batch<Fault>, CoreError>;
    fn load_suspicious(&self) -> Result<Batch<SuspiciousTransaction>, CoreError>;
    fn load_multi_attempts(&self) -> Result<Batch<MultiAttemptGroup>, CoreError>;
    fn load_vehicle_charges(&self) -> Result<Batch<VehicleCharge>, CoreError>;
    fn load_monthly_success(&self) -> Result<Batch<MonthlySuccess>, CoreError>;
    fn load_daily_charges(&self) -> Result<Batch<DailyCharges>, CoreError>;
    fn load_site_durations(&self) -> Result<Batch<SiteDailyDuration>, CoreError>;
    fn load_pdc_durations(&self) -> Result<Batch<PdcDailyDuration>, CoreError>;
}
