//! Secondary record collections loaded alongside sessions

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Recurring-fault signal from `kpi_alertes`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub site: String,
    pub pdc: String,
    pub error_type: String,
    pub detected_at: DateTime<Utc>,
    /// Occurrences over the 12 hours preceding detection
    pub occurrences_12h: i64,
    pub moment: String,
    pub evi_code: Option<i64>,
    pub downstream_code: Option<i64>,
}

/// Equipment fault interval from `kpi_defauts_log`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fault {
    pub site: String,
    pub started_at: DateTime<Utc>,
    /// `None` while the fault is still active
    pub ended_at: Option<DateTime<Utc>>,
    pub label: String,
    pub equipment: String,
}

impl Fault {
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Transaction delivering less than 1 kWh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousTransaction {
    pub id: String,
    pub site: String,
    pub pdc: String,
    pub mac_address: String,
    pub vehicle: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub energy_kwh: f64,
    pub soc_start: Option<f64>,
    pub soc_end: Option<f64>,
}

/// Repeated attempts by one vehicle within an hour bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiAttemptGroup {
    pub site: String,
    pub hour: String,
    pub mac: String,
    pub vehicle: String,
    pub attempts: i64,
    /// Comma-separated PDC list as aggregated upstream
    pub pdcs: String,
    pub first_attempt: DateTime<Utc>,
    pub last_attempt: DateTime<Utc>,
    pub session_ids: String,
    pub soc_start_min: Option<f64>,
    pub soc_start_max: Option<f64>,
    pub soc_end_min: Option<f64>,
    pub soc_end_max: Option<f64>,
}

/// Charge with vehicle identity from `kpi_charges_mac`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleCharge {
    pub id: String,
    pub site: String,
    pub mac_address: String,
    pub vehicle: String,
    pub start_time: DateTime<Utc>,
    pub soc_start: Option<f64>,
    pub soc_end: Option<f64>,
    pub is_ok: bool,
}

/// Monthly success rate from `kpi_evo`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySuccess {
    pub month: String,
    pub success_rate: f64,
}

/// Charges per site, day and status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCharges {
    pub site: String,
    pub day: NaiveDate,
    pub status: String,
    pub count: i64,
}

/// Cumulated charge duration per site and day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteDailyDuration {
    pub site: String,
    pub day: NaiveDate,
    pub duration_min: f64,
}

/// Cumulated charge duration per PDC and day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdcDailyDuration {
    pub site: String,
    pub pdc: String,
    pub day: NaiveDate,
    pub duration_min: f64,
}
