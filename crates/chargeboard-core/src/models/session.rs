//! Charging session model and the charging-phase vocabulary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Code value meaning "no code" in both code families
pub const NO_CODE: i64 = 0;

/// Additional "no code" sentinel used by the downstream (PC) code family
pub const DOWNSTREAM_NO_CODE: i64 = 8192;

/// Outcome of a charging attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    #[default]
    Ok,
    Error,
}

impl Outcome {
    /// Map the source state flag (0 = good, anything else = error)
    pub fn from_flag(flag: i64) -> Self {
        if flag == 0 {
            Outcome::Ok
        } else {
            Outcome::Error
        }
    }
}

/// Charging phase during which an error occurred
///
/// Variants are declared in the canonical display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Moment {
    #[serde(rename = "Init")]
    Init,
    #[serde(rename = "Lock Connector")]
    LockConnector,
    #[serde(rename = "CableCheck")]
    CableCheck,
    #[serde(rename = "Charge")]
    Charge,
    #[serde(rename = "Fin de charge")]
    EndOfCharge,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Moment {
    /// Canonical ordering used by every moment breakdown
    pub const ALL: [Moment; 6] = [
        Moment::Init,
        Moment::LockConnector,
        Moment::CableCheck,
        Moment::Charge,
        Moment::EndOfCharge,
        Moment::Unknown,
    ];

    /// Label as stored in the source tables
    pub fn label(self) -> &'static str {
        match self {
            Moment::Init => "Init",
            Moment::LockConnector => "Lock Connector",
            Moment::CableCheck => "CableCheck",
            Moment::Charge => "Charge",
            Moment::EndOfCharge => "Fin de charge",
            Moment::Unknown => "Unknown",
        }
    }

    /// Map a numeric EVI status step to its charging phase
    ///
    /// Total over all integers: step 3 and negative steps are `Unknown`.
    pub fn from_step(step: i64) -> Self {
        match step {
            0 => Moment::EndOfCharge,
            1..=2 => Moment::Init,
            4..=6 => Moment::LockConnector,
            7 => Moment::CableCheck,
            8 => Moment::Charge,
            s if s > 8 => Moment::EndOfCharge,
            _ => Moment::Unknown,
        }
    }
}

impl fmt::Display for Moment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One charging attempt from `kpi_sessions`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,

    /// `None` when the source row carried no start time
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,

    pub site: String,
    pub pdc: String,
    pub outcome: Outcome,

    /// Only meaningful when `outcome` is `Error`
    pub error_type: String,
    /// Phase label, empty for successful sessions
    pub moment: String,
    pub moment_detail: String,

    pub evi_error_code: Option<i64>,
    pub evi_status_step: Option<i64>,
    pub downstream_code: Option<i64>,

    pub energy_kwh: Option<f64>,
    pub mean_power_kw: Option<f64>,
    pub max_power_kw: Option<f64>,
    pub soc_start: Option<f64>,
    pub soc_end: Option<f64>,

    pub mac_address: String,
    pub charge_900v: bool,
}

impl Session {
    pub fn is_error(&self) -> bool {
        self.outcome == Outcome::Error
    }
}
