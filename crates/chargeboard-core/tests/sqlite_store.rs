//! SqliteRecordStore against a real KPI database file

use chargeboard_core::{AnalyticalCache, Collection, CoreError, RecordStore, SqliteRecordStore};
use chargeboard_core::models::Outcome;
use chrono::{NaiveDate, TimeZone, Utc};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const SCHEMA: &str = r#"
CREATE TABLE kpi_sessions (
    ID TEXT, "Datetime start" TEXT, "Datetime end" TEXT, Site TEXT, "Name Project" TEXT,
    PDC TEXT, "State of charge(0:good, 1:error)" INTEGER, type_erreur TEXT, moment TEXT,
    moment_avancee TEXT, "EVI Error Code" INTEGER, "EVI Status during error" INTEGER,
    "Downstream Code PC" INTEGER, "Energy (Kwh)" REAL, "Mean Power (Kw)" REAL,
    "Max Power (Kw)" REAL, "SOC Start" REAL, "SOC End" REAL, "MAC Address" TEXT,
    charge_900V INTEGER
);
CREATE TABLE kpi_alertes (
    Site TEXT, PDC TEXT, type_erreur TEXT, detection TEXT, occurrences_12h INTEGER,
    moment TEXT, evi_code INTEGER, downstream_code_pc INTEGER
);
CREATE TABLE kpi_defauts_log (site TEXT, date_debut TEXT, date_fin TEXT, defaut TEXT, eqp TEXT);
CREATE TABLE kpi_suspicious_under_1kwh (
    ID TEXT, Site TEXT, PDC TEXT, "MAC Address" TEXT, Vehicle TEXT, "Datetime start" TEXT,
    "Datetime end" TEXT, "Energy (Kwh)" REAL, "SOC Start" REAL, "SOC End" REAL
);
CREATE TABLE kpi_multi_attempts_hour (
    Site TEXT, Heure TEXT, MAC TEXT, Vehicle TEXT, tentatives INTEGER, "PDC(s)" TEXT,
    "1ère tentative" TEXT, "Dernière tentative" TEXT, "ID(s)" TEXT, "SOC start min" REAL,
    "SOC start max" REAL, "SOC end min" REAL, "SOC end max" REAL
);
CREATE TABLE kpi_charges_mac (
    ID TEXT, Site TEXT, "MAC Address" TEXT, Vehicle TEXT, "Datetime start" TEXT,
    "SOC Start" REAL, "SOC End" REAL, is_ok INTEGER
);
CREATE TABLE kpi_evo (mois TEXT, tr REAL);
CREATE TABLE kpi_charges_daily_by_site (Site TEXT, day TEXT, Status TEXT, Nb INTEGER);
CREATE TABLE kpi_durations_site_daily (Site TEXT, day TEXT, dur_min REAL);
CREATE TABLE kpi_durations_pdc_daily (Site TEXT, PDC TEXT, day TEXT, dur_min REAL);
"#;

const ROWS: &str = r#"
INSERT INTO kpi_sessions VALUES
    ('s1', '2024-06-03 08:00:00', '2024-06-03 08:45:00', 'Lyon', NULL, 'Lyon-1', 0,
     NULL, NULL, NULL, 0, NULL, 0, 32.5, 40.0, 60.0, 20, 80, '0x1a2b3c4d5e6f', 0),
    ('s2', '2024-06-03 09:00:00', NULL, NULL, 'Annecy', 7, 1,
     'Erreur_EVI', '', NULL, 1234, 7, 8192, 0.2, NULL, NULL, NULL, NULL, 'aa:bb', 1),
    (NULL, '2024-06-03 10:00:00', NULL, 'Lyon', NULL, 'Lyon-2', 0,
     NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, 0),
    ('s4', 'not a date', NULL, 'Lyon', NULL, 'Lyon-2', 0,
     NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, 0);
INSERT INTO kpi_alertes VALUES
    ('Lyon', 'Lyon-1', 'Erreur_EVI', '2024-06-02T07:00:00Z', 4, 'Charge', 1234, NULL);
INSERT INTO kpi_defauts_log VALUES
    ('Lyon', '2024-06-01 00:00:00', NULL, 'Power module', 'PM1'),
    ('Annecy', '2024-05-01 00:00:00', '2024-05-01 06:00:00', 'Cooling', 'FAN');
INSERT INTO kpi_suspicious_under_1kwh VALUES
    ('s2', 'Annecy', '7', 'AA:BB', 'Zoe', '2024-06-03 09:00:00', NULL, 0.2, NULL, NULL);
INSERT INTO kpi_multi_attempts_hour VALUES
    ('Lyon', '2024-06-03 08:00', 'AA:BB', 'Zoe', 3, 'Lyon-1,Lyon-2',
     '2024-06-03 08:01:00', '2024-06-03 08:40:00', 's1,s2,s3', 10, 12, 11, 13);
INSERT INTO kpi_charges_mac VALUES
    ('s1', 'Lyon', 'AA:BB', 'Zoe', '2024-06-03 08:00:00', 20, 80, 1);
INSERT INTO kpi_evo VALUES ('2024-05', 91.5), ('2024-06', 93.25);
INSERT INTO kpi_charges_daily_by_site VALUES ('Lyon', '2024-06-03', 'ok', 12);
INSERT INTO kpi_durations_site_daily VALUES ('Lyon', '2024-06-03', 540.5);
INSERT INTO kpi_durations_pdc_daily VALUES ('Lyon', 'Lyon-1', '2024-06-03', 300.0);
"#;

fn create_kpi_db(dir: &Path) -> PathBuf {
    let path = dir.join("kpi.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    conn.execute_batch(ROWS).unwrap();
    path
}

fn store() -> (TempDir, SqliteRecordStore) {
    let dir = tempfile::tempdir().unwrap();
    let path = create_kpi_db(dir.path());
    (dir, SqliteRecordStore::new(path))
}

#[test]
fn test_sessions_decode_and_skip_bad_rows() {
    let (_dir, store) = store();
    let batch = store.load_sessions().unwrap();

    assert_eq!(batch.records.len(), 2);
    assert_eq!(batch.skipped.len(), 2);
    assert!(batch
        .skipped
        .iter()
        .all(|e| matches!(e, CoreError::Scan { collection: Collection::Sessions, .. })));

    let ok = &batch.records[0];
    assert_eq!(ok.id, "s1");
    assert_eq!(ok.outcome, Outcome::Ok);
    assert_eq!(ok.start_time, Some(Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap()));
    assert_eq!(ok.end_time, Some(Utc.with_ymd_and_hms(2024, 6, 3, 8, 45, 0).unwrap()));
    assert_eq!(ok.energy_kwh, Some(32.5));
    assert!(!ok.charge_900v);
}

#[test]
fn test_session_site_falls_back_to_project_name() {
    let (_dir, store) = store();
    let batch = store.load_sessions().unwrap();

    let err = batch.records.iter().find(|s| s.id == "s2").unwrap();
    assert_eq!(err.site, "Annecy");
    assert_eq!(err.pdc, "7");
    assert_eq!(err.outcome, Outcome::Error);
    // Empty moment derived from EVI status step 7
    assert_eq!(err.moment, "CableCheck");
    assert_eq!(err.evi_error_code, Some(1234));
    assert_eq!(err.downstream_code, Some(8192));
    assert!(err.charge_900v);
}

#[test]
fn test_secondary_collections() {
    let (_dir, store) = store();

    let alerts = store.load_alerts().unwrap().records;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].occurrences_12h, 4);
    assert_eq!(alerts[0].downstream_code, None);

    let faults = store.load_faults().unwrap().records;
    assert_eq!(faults.len(), 2);
    assert!(faults[0].is_active());
    assert!(!faults[1].is_active());

    let attempts = store.load_multi_attempts().unwrap().records;
    assert_eq!(attempts[0].attempts, 3);
    assert_eq!(attempts[0].pdcs, "Lyon-1,Lyon-2");

    let months = store.load_monthly_success().unwrap().records;
    let labels: Vec<_> = months.iter().map(|m| m.month.as_str()).collect();
    assert_eq!(labels, vec!["2024-05", "2024-06"]);

    let daily = store.load_daily_charges().unwrap().records;
    assert_eq!(daily[0].day, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
    assert_eq!(daily[0].count, 12);

    assert_eq!(store.load_suspicious().unwrap().records.len(), 1);
    assert!(store.load_vehicle_charges().unwrap().records[0].is_ok);
    assert_eq!(store.load_site_durations().unwrap().records[0].duration_min, 540.5);
    assert_eq!(store.load_pdc_durations().unwrap().records[0].pdc, "Lyon-1");
}

#[test]
fn test_missing_table_is_load_error() {
    let (dir, store) = store();
    let conn = Connection::open(dir.path().join("kpi.db")).unwrap();
    conn.execute_batch("DROP TABLE kpi_alertes").unwrap();

    let err = store.load_alerts().unwrap_err();
    assert!(matches!(err, CoreError::Load { collection: Collection::Alerts, .. }));
    assert!(store.load_sessions().is_ok());
}

#[tokio::test]
async fn test_cache_over_sqlite_survives_missing_table() {
    let (dir, store) = store();
    let cache = AnalyticalCache::new(Arc::new(store));

    let first = cache.refresh().await;
    assert!(first.failed_collections().is_empty());
    assert_eq!(first.records_skipped, 2);
    assert_eq!(cache.alerts().len(), 1);

    let conn = Connection::open(dir.path().join("kpi.db")).unwrap();
    conn.execute_batch("DROP TABLE kpi_alertes").unwrap();
    drop(conn);

    let second = cache.refresh().await;
    assert_eq!(second.failed_collections(), vec![Collection::Alerts]);
    assert_eq!(cache.alerts().len(), 1);
    assert_eq!(cache.sessions().len(), 2);
    assert!(cache.degraded_state().is_degraded());
}
