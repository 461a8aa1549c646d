//! SQLite-backed record store for the KPI tables
//!
//! Tables and column names follow the upstream KPI pipeline. A fresh
//! read-only connection is opened for every load so a refresh never shares a
//! connection with a previous pass.
//!
//! Timestamps are accepted as TEXT (RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff]`,
//! `YYYY-MM-DD`) or as INTEGER/REAL unix seconds, and are read as UTC.

use super::{Batch, Collection, RecordStore};
use crate::error::CoreError;
use crate::models::{
    Alert, DailyCharges, Fault, Moment, MonthlySuccess, MultiAttemptGroup, Outcome,
    PdcDailyDuration, Session, SiteDailyDuration, SuspiciousTransaction, VehicleCharge,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use std::path::PathBuf;
use tracing::debug;

const SESSIONS_SQL: &str = r#"
    SELECT ID, "Datetime start", "Datetime end", COALESCE(Site, "Name Project"),
           PDC, "State of charge(0:good, 1:error)", type_erreur, moment, moment_avancee,
           "EVI Error Code", "EVI Status during error", "Downstream Code PC", "Energy (Kwh)",
           "Mean Power (Kw)", "Max Power (Kw)", "SOC Start", "SOC End", "MAC Address", charge_900V
    FROM kpi_sessions"#;

const ALERTS_SQL: &str = r#"
    SELECT Site, PDC, type_erreur, detection, occurrences_12h, moment, evi_code, downstream_code_pc
    FROM kpi_alertes ORDER BY detection DESC"#;

const FAULTS_SQL: &str = r#"
    SELECT site, date_debut, date_fin, defaut, eqp
    FROM kpi_defauts_log ORDER BY date_debut DESC"#;

const SUSPICIOUS_SQL: &str = r#"
    SELECT ID, Site, PDC, "MAC Address", Vehicle, "Datetime start", "Datetime end",
           "Energy (Kwh)", "SOC Start", "SOC End"
    FROM kpi_suspicious_under_1kwh"#;

const MULTI_ATTEMPTS_SQL: &str = r#"
    SELECT Site, Heure, MAC, Vehicle, tentatives, "PDC(s)", "1ère tentative",
           "Dernière tentative", "ID(s)", "SOC start min", "SOC start max",
           "SOC end min", "SOC end max"
    FROM kpi_multi_attempts_hour"#;

const VEHICLE_CHARGES_SQL: &str = r#"
    SELECT ID, Site, "MAC Address", Vehicle, "Datetime start", "SOC Start", "SOC End", is_ok
    FROM kpi_charges_mac"#;

const MONTHLY_SUCCESS_SQL: &str = "SELECT mois, tr FROM kpi_evo ORDER BY mois";

const DAILY_CHARGES_SQL: &str = "SELECT Site, day, Status, Nb FROM kpi_charges_daily_by_site";

const SITE_DURATIONS_SQL: &str = "SELECT Site, day, dur_min FROM kpi_durations_site_daily";

const PDC_DURATIONS_SQL: &str = "SELECT Site, PDC, day, dur_min FROM kpi_durations_pdc_daily";

/// Read-only record store over a SQLite KPI database
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    path: PathBuf,
}

impl SqliteRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn connect(&self) -> Result<Connection, CoreError> {
        if !self.path.exists() {
            return Err(CoreError::connection(format!(
                "database not found: {}",
                self.path.display()
            )));
        }

        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| CoreError::Connection {
            message: format!("cannot open {}", self.path.display()),
            source: Some(e),
        })
    }

    /// Run one collection query, skipping rows that fail to decode
    fn load<T>(
        &self,
        collection: Collection,
        sql: &str,
        decode: impl Fn(&Row<'_>) -> Result<T, String>,
    ) -> Result<Batch<T>, CoreError> {
        let conn = self.connect()?;
        let query_error = |e: rusqlite::Error| CoreError::Load {
            collection,
            message: e.to_string(),
            source: Some(e),
        };

        let mut stmt = conn.prepare(sql).map_err(query_error)?;
        let mut rows = stmt.query([]).map_err(query_error)?;

        let mut batch = Batch::default();
        let mut index = 0usize;
        while let Some(row) = rows.next().map_err(query_error)? {
            match decode(row) {
                Ok(record) => batch.records.push(record),
                Err(message) => {
                    debug!(%collection, row = index, %message, "Skipping undecodable row");
                    batch.skipped.push(CoreError::Scan {
                        collection,
                        row: index,
                        message,
                    });
                }
            }
            index += 1;
        }

        debug!(
            %collection,
            loaded = batch.records.len(),
            skipped = batch.skipped.len(),
            "Collection loaded from SQLite"
        );
        Ok(batch)
    }
}

impl RecordStore for SqliteRecordStore {
    fn load_sessions(&self) -> Result<Batch<Session>, CoreError> {
        self.load(Collection::Sessions, SESSIONS_SQL, |row| {
            let outcome = Outcome::from_flag(opt_i64(row, 5)?.unwrap_or(0));
            let evi_status_step = opt_i64(row, 10)?;
            let mut moment = text(row, 7)?;
            if moment.is_empty() && outcome == Outcome::Error {
                if let Some(step) = evi_status_step {
                    moment = Moment::from_step(step).label().to_string();
                }
            }

            Ok(Session {
                id: required_text(row, 0)?,
                start_time: opt_timestamp(row, 1)?,
                end_time: opt_timestamp(row, 2)?,
                site: text(row, 3)?,
                pdc: text(row, 4)?,
                outcome,
                error_type: text(row, 6)?,
                moment,
                moment_detail: text(row, 8)?,
                evi_error_code: opt_i64(row, 9)?,
                evi_status_step,
                downstream_code: opt_i64(row, 11)?,
                energy_kwh: opt_f64(row, 12)?,
                mean_power_kw: opt_f64(row, 13)?,
                max_power_kw: opt_f64(row, 14)?,
                soc_start: opt_f64(row, 15)?,
                soc_end: opt_f64(row, 16)?,
                mac_address: text(row, 17)?,
                charge_900v: opt_i64(row, 18)?.unwrap_or(0) != 0,
            })
        })
    }

    fn load_alerts(&self) -> Result<Batch<Alert>, CoreError> {
        self.load(Collection::Alerts, ALERTS_SQL, |row| {
            Ok(Alert {
                site: text(row, 0)?,
                pdc: text(row, 1)?,
                error_type: text(row, 2)?,
                detected_at: timestamp(row, 3)?,
                occurrences_12h: opt_i64(row, 4)?.unwrap_or(0),
                moment: text(row, 5)?,
                evi_code: opt_i64(row, 6)?,
                downstream_code: opt_i64(row, 7)?,
            })
        })
    }

    fn load_faults(&self) -> Result<Batch<Fault>, CoreError> {
        self.load(Collection::Faults, FAULTS_SQL, |row| {
            Ok(Fault {
                site: text(row, 0)?,
                started_at: timestamp(row, 1)?,
                ended_at: opt_timestamp(row, 2)?,
                label: text(row, 3)?,
                equipment: text(row, 4)?,
            })
        })
    }

    fn load_suspicious(&self) -> Result<Batch<SuspiciousTransaction>, CoreError> {
        self.load(Collection::Suspicious, SUSPICIOUS_SQL, |row| {
            Ok(SuspiciousTransaction {
                id: required_text(row, 0)?,
                site: text(row, 1)?,
                pdc: text(row, 2)?,
                mac_address: text(row, 3)?,
                vehicle: text(row, 4)?,
                start_time: timestamp(row, 5)?,
                end_time: opt_timestamp(row, 6)?,
                energy_kwh: opt_f64(row, 7)?.unwrap_or(0.0),
                soc_start: opt_f64(row, 8)?,
                soc_end: opt_f64(row, 9)?,
            })
        })
    }

    fn load_multi_attempts(&self) -> Result<Batch<MultiAttemptGroup>, CoreError> {
        self.load(Collection::MultiAttempts, MULTI_ATTEMPTS_SQL, |row| {
            Ok(MultiAttemptGroup {
                site: text(row, 0)?,
                hour: text(row, 1)?,
                mac: text(row, 2)?,
                vehicle: text(row, 3)?,
                attempts: opt_i64(row, 4)?.unwrap_or(0),
                pdcs: text(row, 5)?,
                first_attempt: timestamp(row, 6)?,
                last_attempt: timestamp(row, 7)?,
                session_ids: text(row, 8)?,
                soc_start_min: opt_f64(row, 9)?,
                soc_start_max: opt_f64(row, 10)?,
                soc_end_min: opt_f64(row, 11)?,
                soc_end_max: opt_f64(row, 12)?,
            })
        })
    }

    fn load_vehicle_charges(&self) -> Result<Batch<VehicleCharge>, CoreError> {
        self.load(Collection::VehicleCharges, VEHICLE_CHARGES_SQL, |row| {
            Ok(VehicleCharge {
                id: required_text(row, 0)?,
                site: text(row, 1)?,
                mac_address: text(row, 2)?,
                vehicle: text(row, 3)?,
                start_time: timestamp(row, 4)?,
                soc_start: opt_f64(row, 5)?,
                soc_end: opt_f64(row, 6)?,
                is_ok: opt_i64(row, 7)?.unwrap_or(0) != 0,
            })
        })
    }

    fn load_monthly_success(&self) -> Result<Batch<MonthlySuccess>, CoreError> {
        self.load(Collection::MonthlySuccess, MONTHLY_SUCCESS_SQL, |row| {
            Ok(MonthlySuccess {
                month: required_text(row, 0)?,
                success_rate: opt_f64(row, 1)?.unwrap_or(0.0),
            })
        })
    }

    fn load_daily_charges(&self) -> Result<Batch<DailyCharges>, CoreError> {
        self.load(Collection::DailyCharges, DAILY_CHARGES_SQL, |row| {
            Ok(DailyCharges {
                site: text(row, 0)?,
                day: day(row, 1)?,
                status: text(row, 2)?,
                count: opt_i64(row, 3)?.unwrap_or(0),
            })
        })
    }

    fn load_site_durations(&self) -> Result<Batch<SiteDailyDuration>, CoreError> {
        self.load(Collection::SiteDurations, SITE_DURATIONS_SQL, |row| {
            Ok(SiteDailyDuration {
                site: text(row, 0)?,
                day: day(row, 1)?,
                duration_min: opt_f64(row, 2)?.unwrap_or(0.0),
            })
        })
    }

    fn load_pdc_durations(&self) -> Result<Batch<PdcDailyDuration>, CoreError> {
        self.load(Collection::PdcDurations, PDC_DURATIONS_SQL, |row| {
            Ok(PdcDailyDuration {
                site: text(row, 0)?,
                pdc: text(row, 1)?,
                day: day(row, 2)?,
                duration_min: opt_f64(row, 3)?.unwrap_or(0.0),
            })
        })
    }
}

// ===================
// Column decoding
// ===================

/// Nullable text column, NULL read as empty and numbers rendered as text
fn text(row: &Row<'_>, idx: usize) -> Result<String, String> {
    let value = row
        .get_ref(idx)
        .map_err(|e| format!("column {}: {}", idx, e))?;

    match value {
        ValueRef::Null => Ok(String::new()),
        ValueRef::Integer(n) => Ok(n.to_string()),
        ValueRef::Real(x) => Ok(x.to_string()),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|s| s.trim().to_string())
            .map_err(|e| format!("column {}: {}", idx, e)),
        ValueRef::Blob(_) => Err(format!("column {}: blob is not text", idx)),
    }
}

fn required_text(row: &Row<'_>, idx: usize) -> Result<String, String> {
    let value = text(row, idx)?;
    if value.is_empty() {
        return Err(format!("column {}: missing identifier", idx));
    }
    Ok(value)
}

fn opt_i64(row: &Row<'_>, idx: usize) -> Result<Option<i64>, String> {
    row.get::<_, Option<i64>>(idx)
        .map_err(|e| format!("column {}: {}", idx, e))
}

fn opt_f64(row: &Row<'_>, idx: usize) -> Result<Option<f64>, String> {
    row.get::<_, Option<f64>>(idx)
        .map_err(|e| format!("column {}: {}", idx, e))
}

fn opt_timestamp(row: &Row<'_>, idx: usize) -> Result<Option<DateTime<Utc>>, String> {
    let value = row
        .get_ref(idx)
        .map_err(|e| format!("column {}: {}", idx, e))?;

    match value {
        ValueRef::Null => Ok(None),
        ValueRef::Integer(secs) => DateTime::from_timestamp(secs, 0)
            .map(Some)
            .ok_or_else(|| format!("column {}: timestamp out of range", idx)),
        ValueRef::Real(secs) => DateTime::from_timestamp(secs.trunc() as i64, 0)
            .map(Some)
            .ok_or_else(|| format!("column {}: timestamp out of range", idx)),
        ValueRef::Text(bytes) => {
            let raw = std::str::from_utf8(bytes).map_err(|e| format!("column {}: {}", idx, e))?;
            if raw.trim().is_empty() {
                return Ok(None);
            }
            parse_timestamp(raw)
                .map(Some)
                .ok_or_else(|| format!("column {}: unparseable timestamp '{}'", idx, raw))
        }
        ValueRef::Blob(_) => Err(format!("column {}: blob is not a timestamp", idx)),
    }
}

fn timestamp(row: &Row<'_>, idx: usize) -> Result<DateTime<Utc>, String> {
    opt_timestamp(row, idx)?.ok_or_else(|| format!("column {}: missing timestamp", idx))
}

fn day(row: &Row<'_>, idx: usize) -> Result<NaiveDate, String> {
    timestamp(row, idx).map(|ts| ts.date_naive())
}

/// Parse the timestamp spellings found in the KPI tables, as UTC
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];
    for format in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_timestamp_formats() {
        let ts = parse_timestamp("2024-05-02 13:45:10").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 5, 2));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (13, 45, 10));

        assert!(parse_timestamp("2024-05-02 13:45:10.250").is_some());
        assert!(parse_timestamp("2024-05-02T13:45:10").is_some());

        let offset = parse_timestamp("2024-05-02T15:45:10+02:00").unwrap();
        assert_eq!(offset, ts);

        let midnight = parse_timestamp("2024-05-02").unwrap();
        assert_eq!(midnight.hour(), 0);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2024-13-40").is_none());
    }

    #[test]
    fn test_missing_database_is_connection_error() {
        let store = SqliteRecordStore::new("/nonexistent/chargeboard/kpi.db");
        let err = store.load_sessions().unwrap_err();
        assert!(err.is_connection());
    }
}
