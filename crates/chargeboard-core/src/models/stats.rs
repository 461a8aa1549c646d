//! Derived aggregation outputs
//!
//! Built per request from a snapshot and a filter, never persisted.

use serde::Serialize;
use std::collections::BTreeMap;

/// Global KPIs over a filtered session set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total: usize,
    pub ok: usize,
    pub nok: usize,
    pub success_rate: f64,
    pub failure_rate: f64,
    pub distinct_sites: usize,
    pub distinct_pdcs: usize,
}

/// Success/failure counts for one site
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteStats {
    pub site: String,
    pub total: usize,
    pub ok: usize,
    pub nok: usize,
    pub success_rate: f64,
    pub failure_rate: f64,
}

/// Success/failure counts for one charge point of a site
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdcStats {
    pub pdc: String,
    pub total: usize,
    pub ok: usize,
    pub nok: usize,
    pub success_rate: f64,
    pub failure_rate: f64,
}

/// Error count for one charging phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MomentCount {
    pub moment: String,
    pub count: usize,
}

/// Which error code column an occurrence table is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeFamily {
    /// Charger-side EVI error codes
    Evi,
    /// Downstream (PC) codes, with 8192 as an extra "no code" sentinel
    Downstream,
}

/// Occurrences of one error code within its family
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeOccurrence {
    pub code: i64,
    pub total: usize,
    /// Share of all non-excluded occurrences in the same family
    pub percentage: f64,
    pub by_moment: BTreeMap<String, usize>,
}
