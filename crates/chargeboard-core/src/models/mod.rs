//! Data models for chargeboard

pub mod records;
pub mod session;
pub mod stats;

pub use records::{
    Alert, DailyCharges, Fault, MonthlySuccess, MultiAttemptGroup, PdcDailyDuration,
    SiteDailyDuration, SuspiciousTransaction, VehicleCharge,
};
pub use session::{Moment, Outcome, Session, DOWNSTREAM_NO_CODE, NO_CODE};
pub use stats::{CodeFamily, CodeOccurrence, KpiSummary, MomentCount, PdcStats, SiteStats};
