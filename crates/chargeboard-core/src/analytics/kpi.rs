//! Success/failure KPIs and per-site / per-PDC breakdowns

use super::{as_session, rate};
use crate::models::{KpiSummary, PdcStats, Session, SiteStats};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Number of sites kept by [`top_sites`]
pub const TOP_SITES: usize = 10;

#[derive(Default)]
struct Counts {
    ok: usize,
    nok: usize,
}

impl Counts {
    fn add(&mut self, session: &Session) {
        if session.is_error() {
            self.nok += 1;
        } else {
            self.ok += 1;
        }
    }

    fn total(&self) -> usize {
        self.ok + self.nok
    }
}

/// Global KPIs over a filtered session set
pub fn kpi_summary<S: Borrow<Session>>(sessions: &[S]) -> KpiSummary {
    let mut counts = Counts::default();
    let mut sites = HashSet::new();
    let mut pdcs = HashSet::new();

    for session in sessions.iter().map(as_session) {
        counts.add(session);
        sites.insert(session.site.as_str());
        pdcs.insert(session.pdc.as_str());
    }

    let total = counts.total();
    KpiSummary {
        total,
        ok: counts.ok,
        nok: counts.nok,
        success_rate: rate(counts.ok, total),
        failure_rate: rate(counts.nok, total),
        distinct_sites: sites.len(),
        distinct_pdcs: pdcs.len(),
    }
}

/// Per-site statistics, ordered by site name
pub fn site_stats<S: Borrow<Session>>(sessions: &[S]) -> Vec<SiteStats> {
    let mut by_site: BTreeMap<&str, Counts> = BTreeMap::new();
    for session in sessions.iter().map(as_session) {
        by_site.entry(session.site.as_str()).or_default().add(session);
    }

    by_site
        .into_iter()
        .map(|(site, c)| SiteStats {
            site: site.to_string(),
            total: c.total(),
            ok: c.ok,
            nok: c.nok,
            success_rate: rate(c.ok, c.total()),
            failure_rate: rate(c.nok, c.total()),
        })
        .collect()
}

/// Per-PDC statistics for the sessions of one site, ordered by PDC
pub fn pdc_stats<S: Borrow<Session>>(sessions: &[S], site: &str) -> Vec<PdcStats> {
    let mut by_pdc: BTreeMap<&str, Counts> = BTreeMap::new();
    for session in sessions.iter().map(as_session).filter(|s| s.site == site) {
        by_pdc.entry(session.pdc.as_str()).or_default().add(session);
    }

    by_pdc
        .into_iter()
        .map(|(pdc, c)| PdcStats {
            pdc: pdc.to_string(),
            total: c.total(),
            ok: c.ok,
            nok: c.nok,
            success_rate: rate(c.ok, c.total()),
            failure_rate: rate(c.nok, c.total()),
        })
        .collect()
}

/// The [`TOP_SITES`] busiest sites
pub fn top_sites<S: Borrow<Session>>(sessions: &[S]) -> Vec<SiteStats> {
    top_sites_by_total(sessions, TOP_SITES)
}

/// Per-site statistics sorted by total descending, truncated to `limit`
///
/// The sort is stable, so ties keep site-name order.
pub fn top_sites_by_total<S: Borrow<Session>>(sessions: &[S], limit: usize) -> Vec<SiteStats> {
    let mut stats = site_stats(sessions);
    stats.sort_by(|a, b| b.total.cmp(&a.total));
    stats.truncate(limit);
    stats
}

/// Distinct non-empty site names, sorted
pub fn unique_sites<S: Borrow<Session>>(sessions: &[S]) -> Vec<String> {
    sessions
        .iter()
        .map(|s| as_session(s).site.as_str())
        .filter(|site| !site.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Distinct non-empty PDCs of one site, sorted
pub fn unique_pdcs<S: Borrow<Session>>(sessions: &[S], site: &str) -> Vec<String> {
    sessions
        .iter()
        .map(as_session)
        .filter(|s| s.site == site && !s.pdc.is_empty())
        .map(|s| s.pdc.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
