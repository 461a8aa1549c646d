//! Error breakdowns: counts per charging phase and per error code

use super::{as_session, rate};
use crate::models::{CodeFamily, CodeOccurrence, Moment, MomentCount, Session};
use crate::models::{DOWNSTREAM_NO_CODE, NO_CODE};
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};

/// Errors per charging phase, in canonical phase order
///
/// Only ERROR sessions count. Phases with no error are omitted, and labels
/// outside the vocabulary (including empty ones) are not reported.
pub fn moment_counts<S: Borrow<Session>>(sessions: &[S]) -> Vec<MomentCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for session in sessions.iter().map(as_session).filter(|s| s.is_error()) {
        *counts.entry(session.moment.as_str()).or_default() += 1;
    }

    Moment::ALL
        .iter()
        .filter_map(|moment| {
            counts.get(moment.label()).map(|&count| MomentCount {
                moment: moment.label().to_string(),
                count,
            })
        })
        .collect()
}

/// The code an ERROR session contributes to `family`, if any
fn family_code(session: &Session, family: CodeFamily) -> Option<i64> {
    match family {
        CodeFamily::Evi => session.evi_error_code.filter(|&c| c != NO_CODE),
        CodeFamily::Downstream => session
            .downstream_code
            .filter(|&c| c != NO_CODE && c != DOWNSTREAM_NO_CODE),
    }
}

/// Occurrence table of one code family
///
/// Keys are the codes; each entry carries its count, its share of the
/// family's total (over non-excluded codes only) and a per-moment split.
pub fn code_occurrences<S: Borrow<Session>>(
    sessions: &[S],
    family: CodeFamily,
) -> BTreeMap<i64, CodeOccurrence> {
    let mut table: BTreeMap<i64, CodeOccurrence> = BTreeMap::new();
    let mut family_total = 0usize;

    for session in sessions.iter().map(as_session).filter(|s| s.is_error()) {
        let Some(code) = family_code(session, family) else {
            continue;
        };

        let entry = table.entry(code).or_insert_with(|| CodeOccurrence {
            code,
            total: 0,
            percentage: 0.0,
            by_moment: BTreeMap::new(),
        });
        entry.total += 1;
        *entry.by_moment.entry(session.moment.clone()).or_default() += 1;
        family_total += 1;
    }

    for entry in table.values_mut() {
        entry.percentage = rate(entry.total, family_total);
    }

    table
}
