//! Web router using Axum
//!
//! Every read handler clones the snapshots it needs, resolves the request's
//! filter against the current clock and aggregates on the fly.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use chargeboard_core::analytics::{
    active_faults, code_occurrences, kpi_summary, moment_counts, pdc_stats, site_stats,
    top_sites_by_total, unique_pdcs, unique_sites, Overview, OverviewInput,
};
use chargeboard_core::models::{CodeFamily, Moment};
use chargeboard_core::{
    AnalyticalCache, CoreError, DateMode, DateRangeResolver, Filter, RefreshHandle,
};
use chrono::Utc;
use futures::stream::Stream;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::params::{error_lookup, query_params, RawQuery};
use crate::sse;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<AnalyticalCache>,
    pub refresh: RefreshHandle,
    pub resolver: DateRangeResolver,
    /// Length of top-N site rankings
    pub top_sites: usize,
}

impl AppState {
    fn filter(&self, raw: &RawQuery) -> Filter {
        Filter::from_params(&query_params(raw), &self.resolver, Utc::now())
    }
}

/// Create the web router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/filters", get(filters_handler))
        .route("/api/kpis", get(kpis_handler))
        .route("/api/overview", get(overview_handler))
        .route("/api/sites", get(sites_handler))
        .route("/api/sites/{site}/pdcs", get(pdcs_handler))
        .route("/api/error-moments", get(error_moments_handler))
        .route("/api/error-specific", get(error_specific_handler))
        .route("/api/alerts", get(alerts_handler))
        .route("/api/faults", get(faults_handler))
        .route("/api/faults/active", get(active_faults_handler))
        .route("/api/suspicious", get(suspicious_handler))
        .route("/api/attempts", get(attempts_handler))
        .route("/api/evolution", get(evolution_handler))
        .route("/api/daily", get(daily_handler))
        .route("/api/events", get(sse_handler))
        .route("/api/refresh", post(refresh_handler))
        .layer(cors)
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let degraded = state.cache.degraded_state();
    Json(json!({
        "status": if degraded.is_healthy() { "healthy" } else { "degraded" },
        "state": degraded,
        "last_update": state.cache.last_update(),
        "sessions": state.cache.sessions().len(),
    }))
}

/// Dropdown values plus the number of sessions matching the filter
async fn filters_handler(State(state): State<AppState>, Query(raw): Query<RawQuery>) -> Json<Value> {
    let filter = state.filter(&raw);
    let sessions = state.cache.sessions();

    Json(json!({
        "sites": unique_sites(&sessions),
        "moments": Moment::ALL.iter().map(|m| m.label()).collect::<Vec<_>>(),
        "date_modes": DateMode::SELECTABLE.iter().map(|m| m.as_str()).collect::<Vec<_>>(),
        "total": filter.apply(&sessions).len(),
    }))
}

async fn kpis_handler(State(state): State<AppState>, Query(raw): Query<RawQuery>) -> Json<Value> {
    let filter = state.filter(&raw);
    let sessions = state.cache.sessions();
    let filtered = filter.apply(&sessions);

    Json(json!({
        "window": filter.window,
        "kpis": kpi_summary(&filtered),
    }))
}

async fn overview_handler(State(state): State<AppState>, Query(raw): Query<RawQuery>) -> Json<Overview> {
    let filter = state.filter(&raw);
    let cache = &state.cache;
    let (sessions, faults, suspicious, multi_attempts, alerts) = (
        cache.sessions(),
        cache.faults(),
        cache.suspicious(),
        cache.multi_attempts(),
        cache.alerts(),
    );

    Json(Overview::build(
        OverviewInput {
            sessions: &sessions,
            faults: &faults,
            suspicious: &suspicious,
            multi_attempts: &multi_attempts,
            alerts: &alerts,
        },
        &filter,
        state.top_sites,
    ))
}

/// Per-site comparison and top-N ranking
async fn sites_handler(State(state): State<AppState>, Query(raw): Query<RawQuery>) -> Json<Value> {
    let filter = state.filter(&raw);
    let sessions = state.cache.sessions();
    let filtered = filter.apply(&sessions);

    Json(json!({
        "sites": site_stats(&filtered),
        "top": top_sites_by_total(&filtered, state.top_sites),
    }))
}

async fn pdcs_handler(
    State(state): State<AppState>,
    Path(site): Path<String>,
    Query(raw): Query<RawQuery>,
) -> Json<Value> {
    let filter = state.filter(&raw);
    let sessions = state.cache.sessions();
    let filtered = filter.apply(&sessions);

    Json(json!({
        "site": site,
        "pdcs": unique_pdcs(&sessions, &site),
        "stats": pdc_stats(&filtered, &site),
    }))
}

async fn error_moments_handler(
    State(state): State<AppState>,
    Query(raw): Query<RawQuery>,
) -> Json<Value> {
    let filter = state.filter(&raw);
    let sessions = state.cache.sessions();
    let filtered = filter.apply(&sessions);

    Json(json!({
        "moments": moment_counts(&filtered),
        "evi_codes": code_occurrences(&filtered, CodeFamily::Evi).into_values().collect::<Vec<_>>(),
        "downstream_codes": code_occurrences(&filtered, CodeFamily::Downstream)
            .into_values()
            .collect::<Vec<_>>(),
    }))
}

async fn error_specific_handler(
    State(state): State<AppState>,
    Query(raw): Query<RawQuery>,
) -> Json<Value> {
    let filter = state.filter(&raw);
    let lookup = error_lookup(&raw);
    let sessions = state.cache.sessions();
    let matched = lookup.apply(&filter.apply(&sessions));

    Json(json!({
        "total": matched.len(),
        "sessions": matched,
    }))
}

async fn alerts_handler(State(state): State<AppState>, Query(raw): Query<RawQuery>) -> Json<Value> {
    let filter = state.filter(&raw);
    Json(json!({ "alerts": filter.alerts(&state.cache.alerts()) }))
}

async fn faults_handler(State(state): State<AppState>, Query(raw): Query<RawQuery>) -> Json<Value> {
    let filter = state.filter(&raw);
    Json(json!({ "faults": filter.faults(&state.cache.faults()) }))
}

async fn active_faults_handler(
    State(state): State<AppState>,
    Query(raw): Query<RawQuery>,
) -> Json<Value> {
    let filter = state.filter(&raw);
    Json(json!({ "faults": active_faults(&state.cache.faults(), &filter) }))
}

async fn suspicious_handler(
    State(state): State<AppState>,
    Query(raw): Query<RawQuery>,
) -> Json<Value> {
    let filter = state.filter(&raw);
    Json(json!({ "transactions": filter.suspicious(&state.cache.suspicious()) }))
}

async fn attempts_handler(State(state): State<AppState>, Query(raw): Query<RawQuery>) -> Json<Value> {
    let filter = state.filter(&raw);
    Json(json!({ "groups": filter.multi_attempts(&state.cache.multi_attempts()) }))
}

/// Monthly success rates, independent of any filter
async fn evolution_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "months": state.cache.monthly_success().as_slice() }))
}

async fn daily_handler(State(state): State<AppState>, Query(raw): Query<RawQuery>) -> Json<Value> {
    let filter = state.filter(&raw);
    let cache = &state.cache;

    Json(json!({
        "charges": filter.daily_charges(&cache.daily_charges()),
        "site_durations": filter.site_durations(&cache.site_durations()),
        "pdc_durations": filter.pdc_durations(&cache.pdc_durations()),
    }))
}

/// SSE endpoint for refresh notifications
async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    sse::create_sse_stream(state.cache.event_bus())
}

async fn refresh_handler(State(state): State<AppState>) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.refresh.refresh_now().await {
        Ok(report) => Ok(Json(json!({
            "report": report,
            "state": state.cache.degraded_state(),
            "last_update": state.cache.last_update(),
        }))),
        Err(e) => {
            warn!(error = %e, "Refresh request failed");
            let status = match e {
                CoreError::SchedulerStopped => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err((status, Json(json!({ "error": e.to_string() }))))
        }
    }
}
