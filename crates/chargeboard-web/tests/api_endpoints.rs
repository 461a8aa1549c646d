//! Integration tests for the JSON API and the SSE endpoint

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use chargeboard_core::models::{Fault, Outcome, Session};
use chargeboard_core::{
    AnalyticalCache, DateRangeResolver, InMemoryStore, RecordStore, RefreshScheduler,
};
use chargeboard_web::{create_router, AppState};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const JUNE: &str = "date_mode=full_month&focus_year=2024&focus_month=6";

fn session(id: &str, site: &str, outcome: Outcome, evi: Option<i64>, mac: &str) -> Session {
    let error = outcome == Outcome::Error;
    Session {
        id: id.to_string(),
        start_time: Some(Utc.with_ymd_and_hms(2024, 6, 12, 14, 0, 0).unwrap()),
        site: site.to_string(),
        pdc: format!("{}-{}", site, id),
        outcome,
        error_type: if error { "X".to_string() } else { String::new() },
        moment: if error { "Charge".to_string() } else { String::new() },
        evi_error_code: evi,
        mac_address: mac.to_string(),
        ..Default::default()
    }
}

fn fault(site: &str, active: bool) -> Fault {
    let started_at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    Fault {
        site: site.to_string(),
        started_at,
        ended_at: (!active).then_some(started_at),
        label: "Power module".to_string(),
        equipment: "PM1".to_string(),
    }
}

struct TestApp {
    router: Router,
    scheduler: RefreshScheduler,
}

async fn test_app() -> TestApp {
    let store = InMemoryStore::new()
        .with_sessions(vec![
            session("1", "Lyon", Outcome::Ok, None, "AA:BB:CC:00:00:01"),
            session("2", "Lyon", Outcome::Ok, None, "AA:BB:CC:00:00:02"),
            session("3", "Annecy", Outcome::Error, Some(1234), "AA:BB:CC:00:00:03"),
        ])
        .with_faults(vec![fault("Lyon", true), fault("Annecy", false)]);
    let cache = Arc::new(AnalyticalCache::new(Arc::new(store) as Arc<dyn RecordStore>));

    let scheduler = RefreshScheduler::start(Arc::clone(&cache), Duration::from_secs(3600)).unwrap();
    scheduler.handle().refresh_now().await.unwrap();

    let state = AppState {
        cache,
        refresh: scheduler.handle(),
        resolver: DateRangeResolver::default(),
        top_sites: 10,
    };

    TestApp {
        router: create_router(state),
        scheduler,
    }
}

async fn send(router: &Router, method: Method, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    router.clone().oneshot(request).await.unwrap()
}

async fn get_json(router: &Router, uri: &str) -> Value {
    let response = send(router, Method::GET, uri).await;
    assert_eq!(response.status(), StatusCode::OK, "GET {}", uri);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_sse_endpoint_exists() {
    let app = test_app().await;
    let response = send(&app.router, Method::GET, "/api/events").await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok());
    assert!(content_type.unwrap().contains("text/event-stream"));
}

#[tokio::test]
async fn test_health_after_refresh() {
    let app = test_app().await;
    let body = get_json(&app.router, "/api/health").await;

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["state"]["state"], "healthy");
    assert_eq!(body["sessions"], 3);
    assert!(body["last_update"].is_string());
}

#[tokio::test]
async fn test_kpis_for_june() {
    let app = test_app().await;
    let body = get_json(&app.router, &format!("/api/kpis?{}", JUNE)).await;

    assert_eq!(body["kpis"]["total"], 3);
    assert_eq!(body["kpis"]["success_rate"], 66.67);
    assert_eq!(body["kpis"]["distinct_sites"], 2);
}

#[tokio::test]
async fn test_kpis_error_type_keeps_ok_sessions() {
    let app = test_app().await;
    let body = get_json(&app.router, &format!("/api/kpis?{}&error_types=Y", JUNE)).await;

    assert_eq!(body["kpis"]["total"], 2);
    assert_eq!(body["kpis"]["ok"], 2);
    assert_eq!(body["kpis"]["nok"], 0);
}

#[tokio::test]
async fn test_kpis_outside_window_are_empty() {
    let app = test_app().await;
    let body = get_json(
        &app.router,
        "/api/kpis?date_mode=full_month&focus_year=2023&focus_month=6",
    )
    .await;

    assert_eq!(body["kpis"]["total"], 0);
    assert_eq!(body["kpis"]["success_rate"], 0.0);
}

#[tokio::test]
async fn test_kpis_at_calendar_limit_fall_back_to_today() {
    let app = test_app().await;

    let body = get_json(&app.router, "/api/kpis?date_mode=focus_day&focus_day=%2B262142-12-31").await;
    assert_eq!(body["kpis"]["total"], 0);

    let body = get_json(
        &app.router,
        "/api/kpis?date_mode=full_month&focus_year=262142&focus_month=12",
    )
    .await;
    assert_eq!(body["kpis"]["total"], 0);
    assert_eq!(body["window"]["start"].as_str().map(|s| s.starts_with("+262142")), Some(false));
}

#[tokio::test]
async fn test_filters_lists_sites_and_total() {
    let app = test_app().await;
    let body = get_json(&app.router, &format!("/api/filters?{}&sites=Lyon", JUNE)).await;

    assert_eq!(body["sites"], serde_json::json!(["Annecy", "Lyon"]));
    assert_eq!(body["total"], 2);
    assert_eq!(body["moments"][0], "Init");
}

#[tokio::test]
async fn test_sites_and_pdcs() {
    let app = test_app().await;

    let body = get_json(&app.router, &format!("/api/sites?{}", JUNE)).await;
    assert_eq!(body["top"][0]["site"], "Lyon");
    assert_eq!(body["top"][0]["total"], 2);
    assert_eq!(body["sites"].as_array().unwrap().len(), 2);

    let body = get_json(&app.router, &format!("/api/sites/Lyon/pdcs?{}", JUNE)).await;
    assert_eq!(body["pdcs"], serde_json::json!(["Lyon-1", "Lyon-2"]));
    assert_eq!(body["stats"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_error_breakdowns() {
    let app = test_app().await;

    let body = get_json(&app.router, &format!("/api/error-moments?{}", JUNE)).await;
    assert_eq!(body["moments"][0]["moment"], "Charge");
    assert_eq!(body["moments"][0]["count"], 1);
    assert_eq!(body["evi_codes"][0]["code"], 1234);
    assert_eq!(body["evi_codes"][0]["percentage"], 100.0);
    assert_eq!(body["downstream_codes"], serde_json::json!([]));

    let body = get_json(&app.router, &format!("/api/error-specific?{}&code=1234", JUNE)).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["sessions"][0]["id"], "3");

    let body = get_json(&app.router, &format!("/api/error-specific?{}&mac=00:00:0", JUNE)).await;
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn test_active_faults() {
    let app = test_app().await;
    let body = get_json(&app.router, "/api/faults/active").await;

    let faults = body["faults"].as_array().unwrap();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0]["site"], "Lyon");
}

#[tokio::test]
async fn test_post_refresh_returns_report() {
    let app = test_app().await;
    let response = send(&app.router, Method::POST, "/api/refresh").await;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["report"]["records_loaded"], 5);
    assert_eq!(body["state"]["state"], "healthy");
}

#[tokio::test]
async fn test_refresh_after_shutdown_is_unavailable() {
    let TestApp { router, scheduler } = test_app().await;
    scheduler.shutdown().await;

    let response = send(&router, Method::POST, "/api/refresh").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
