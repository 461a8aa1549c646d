//! Session filter pipeline
//!
//! A [`Filter`] is built once per query from raw [`QueryParams`] and then
//! applied to the cached snapshots. Empty selections mean "no restriction".
//!
//! The error-type and moment clauses only ever judge ERROR sessions: OK
//! sessions pass them whatever the selection, matching the legacy dashboard.

use crate::date_range::{DateMode, DateRangeResolver, DateWindow};
use crate::models::{
    Alert, DailyCharges, Fault, MultiAttemptGroup, PdcDailyDuration, Session, SiteDailyDuration,
    SuspiciousTransaction,
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Raw, unvalidated query parameters
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    pub sites: Vec<String>,
    pub date_mode: Option<String>,
    pub focus_year: Option<i32>,
    pub focus_month: Option<u32>,
    pub focus_day: Option<NaiveDate>,
    #[serde(default)]
    pub error_types: Vec<String>,
    #[serde(default)]
    pub moments: Vec<String>,
}

/// Resolved query filter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filter {
    pub sites: BTreeSet<String>,
    pub date_mode: DateMode,
    pub window: DateWindow,
    pub error_types: BTreeSet<String>,
    pub moments: BTreeSet<String>,
}

impl Filter {
    /// Filter with no restriction other than the window
    pub fn unrestricted(window: DateWindow) -> Self {
        Self {
            sites: BTreeSet::new(),
            date_mode: DateMode::AllTime,
            window,
            error_types: BTreeSet::new(),
            moments: BTreeSet::new(),
        }
    }

    /// Validate and default raw parameters
    ///
    /// Defaults: `full_month` mode on the month of `now`. A zero year or
    /// month counts as missing. Blank list entries are dropped.
    pub fn from_params(params: &QueryParams, resolver: &DateRangeResolver, now: DateTime<Utc>) -> Self {
        let date_mode = params
            .date_mode
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .map(DateMode::parse)
            .unwrap_or(DateMode::FullMonth);

        let focus_year = params.focus_year.filter(|y| *y != 0).unwrap_or(now.year());
        let focus_month = params.focus_month.filter(|m| *m != 0).unwrap_or(now.month());

        let window = resolver.resolve(date_mode, focus_year, focus_month, params.focus_day, now);

        Self {
            sites: clean_set(&params.sites),
            date_mode,
            window,
            error_types: clean_set(&params.error_types),
            moments: clean_set(&params.moments),
        }
    }

    pub fn with_sites<I, S>(mut self, sites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sites = sites.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_error_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.error_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_moments<I, S>(mut self, moments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.moments = moments.into_iter().map(Into::into).collect();
        self
    }

    pub fn site_allowed(&self, site: &str) -> bool {
        self.sites.is_empty() || self.sites.contains(site)
    }

    /// Per-session predicate, all clauses AND-ed
    pub fn matches(&self, session: &Session) -> bool {
        if !self.site_allowed(&session.site) {
            return false;
        }

        if let Some(start) = session.start_time {
            if !self.window.contains(start) {
                return false;
            }
        }

        if session.is_error() {
            if !self.error_types.is_empty() && !self.error_types.contains(&session.error_type) {
                return false;
            }
            if !self.moments.is_empty() && !self.moments.contains(&session.moment) {
                return false;
            }
        }

        true
    }

    /// Filtered view over a session snapshot, preserving order
    pub fn apply<'a>(&self, sessions: &'a [Session]) -> Vec<&'a Session> {
        sessions.iter().filter(|s| self.matches(s)).collect()
    }

    // ===================
    // Secondary collections
    // ===================

    /// Alerts of the selected sites detected inside the window
    pub fn alerts(&self, alerts: &[Alert]) -> Vec<Alert> {
        alerts
            .iter()
            .filter(|a| self.site_allowed(&a.site) && self.window.contains(a.detected_at))
            .cloned()
            .collect()
    }

    /// Fault history of the selected sites started inside the window
    pub fn faults(&self, faults: &[Fault]) -> Vec<Fault> {
        faults
            .iter()
            .filter(|f| self.site_allowed(&f.site) && self.window.contains(f.started_at))
            .cloned()
            .collect()
    }

    pub fn suspicious(&self, txs: &[SuspiciousTransaction]) -> Vec<SuspiciousTransaction> {
        txs.iter()
            .filter(|t| self.site_allowed(&t.site) && self.window.contains(t.start_time))
            .cloned()
            .collect()
    }

    /// Multi-attempt groups are bucketed upstream, only the site applies
    pub fn multi_attempts(&self, groups: &[MultiAttemptGroup]) -> Vec<MultiAttemptGroup> {
        groups
            .iter()
            .filter(|g| self.site_allowed(&g.site))
            .cloned()
            .collect()
    }

    pub fn daily_charges(&self, rows: &[DailyCharges]) -> Vec<DailyCharges> {
        rows.iter()
            .filter(|r| self.site_allowed(&r.site) && self.window.contains_day(r.day))
            .cloned()
            .collect()
    }

    pub fn site_durations(&self, rows: &[SiteDailyDuration]) -> Vec<SiteDailyDuration> {
        rows.iter()
            .filter(|r| self.site_allowed(&r.site) && self.window.contains_day(r.day))
            .cloned()
            .collect()
    }

    pub fn pdc_durations(&self, rows: &[PdcDailyDuration]) -> Vec<PdcDailyDuration> {
        rows.iter()
            .filter(|r| self.site_allowed(&r.site) && self.window.contains_day(r.day))
            .cloned()
            .collect()
    }
}

/// Apply `filter` to `sessions`
pub fn apply<'a>(sessions: &'a [Session], filter: &Filter) -> Vec<&'a Session> {
    filter.apply(sessions)
}

/// Narrowing used by the error drill-down view
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorLookup {
    /// Case-insensitive substring of the MAC address
    pub mac: Option<String>,
    /// Exact code, matched against the EVI and the downstream code
    pub code: Option<i64>,
}

impl ErrorLookup {
    pub fn matches(&self, session: &Session) -> bool {
        if let Some(mac) = self.mac.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            if !session
                .mac_address
                .to_lowercase()
                .contains(&mac.to_lowercase())
            {
                return false;
            }
        }

        if let Some(code) = self.code {
            let hit = session.evi_error_code == Some(code) || session.downstream_code == Some(code);
            if !hit {
                return false;
            }
        }

        true
    }

    pub fn apply<'a>(&self, sessions: &[&'a Session]) -> Vec<&'a Session> {
        sessions.iter().copied().filter(|s| self.matches(s)).collect()
    }
}

fn clean_set(values: &[String]) -> BTreeSet<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}
