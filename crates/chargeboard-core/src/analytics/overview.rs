//! Landing view bundling the headline figures of one filter

use super::kpi::{kpi_summary, top_sites_by_total};
use crate::filters::Filter;
use crate::models::{
    Alert, Fault, KpiSummary, MultiAttemptGroup, Session, SiteStats, SuspiciousTransaction,
};
use serde::Serialize;

/// Faults still open on the selected sites, regardless of the window
pub fn active_faults(faults: &[Fault], filter: &Filter) -> Vec<Fault> {
    faults
        .iter()
        .filter(|f| f.is_active() && filter.site_allowed(&f.site))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub kpis: KpiSummary,
    pub top_sites: Vec<SiteStats>,
    pub active_faults: Vec<Fault>,
    pub suspicious: Vec<SuspiciousTransaction>,
    pub multi_attempts: Vec<MultiAttemptGroup>,
    pub alerts: Vec<Alert>,
}

/// Snapshot slices an [`Overview`] is computed from
pub struct OverviewInput<'a> {
    pub sessions: &'a [Session],
    pub faults: &'a [Fault],
    pub suspicious: &'a [SuspiciousTransaction],
    pub multi_attempts: &'a [MultiAttemptGroup],
    pub alerts: &'a [Alert],
}

impl Overview {
    pub fn build(input: OverviewInput<'_>, filter: &Filter, top_n: usize) -> Self {
        let sessions = filter.apply(input.sessions);

        Self {
            kpis: kpi_summary(&sessions),
            top_sites: top_sites_by_total(&sessions, top_n),
            active_faults: active_faults(input.faults, filter),
            suspicious: filter.suspicious(input.suspicious),
            multi_attempts: filter.multi_attempts(input.multi_attempts),
            alerts: filter.alerts(input.alerts),
        }
    }
}
