//! KPI aggregations over filtered session sets
//!
//! Every function here is a pure computation over the slice it receives:
//! no cross-call state, no failure modes. Empty input yields zero-valued
//! results. Functions accept `&[Session]` as well as the `&[&Session]` views
//! produced by [`Filter::apply`](crate::filters::Filter::apply).

pub mod errors;
pub mod kpi;
pub mod mac;
pub mod overview;


pub use errors::{code_occurrences, moment_counts};
pub use kpi::{
    kpi_summary, pdc_stats, site_stats, top_sites, top_sites_by_total, unique_pdcs, unique_sites,
    TOP_SITES,
};
pub use mac::canonicalize_mac;
pub use overview::{active_faults, Overview, OverviewInput};

use crate::models::Session;
use std::borrow::Borrow;

pub(crate) fn as_session<S: Borrow<Session>>(session: &S) -> &Session {
    <S as Borrow<Session>>::borrow(session)
}

/// Round half-up to 2 decimals
///
/// Shared by every percentage so KPI, site and PDC rates agree.
pub fn round_pct(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// `part / total` as a rounded percentage, 0 for an empty total
pub fn rate(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_pct(part as f64 / total as f64 * 100.0)
}
