//! Query-string decoding
//!
//! Lists are comma-separated (`sites=A,B`) and may also be repeated
//! (`sites=A&sites=B`). Unparseable numbers and dates are treated as absent,
//! never as a request error.

use chargeboard_core::filters::ErrorLookup;
use chargeboard_core::QueryParams;
use chrono::NaiveDate;

/// Raw `key=value` pairs as decoded by `axum::extract::Query`
pub type RawQuery = Vec<(String, String)>;

fn values<'a>(raw: &'a RawQuery, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    raw.iter()
        .filter(move |(k, _)| k == key || k.strip_suffix("[]") == Some(key))
        .map(|(_, v)| v.as_str())
}

fn list(raw: &RawQuery, key: &str) -> Vec<String> {
    values(raw, key)
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn single<'a>(raw: &'a RawQuery, key: &'a str) -> Option<&'a str> {
    values(raw, key).map(str::trim).filter(|v| !v.is_empty()).last()
}

/// Filter parameters of a request
pub fn query_params(raw: &RawQuery) -> QueryParams {
    QueryParams {
        sites: list(raw, "sites"),
        date_mode: single(raw, "date_mode").map(str::to_string),
        focus_year: single(raw, "focus_year").and_then(|v| v.parse().ok()),
        focus_month: single(raw, "focus_month").and_then(|v| v.parse().ok()),
        focus_day: single(raw, "focus_day")
            .and_then(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok()),
        error_types: list(raw, "error_types"),
        moments: list(raw, "moments"),
    }
}

/// MAC / code narrowing of the error drill-down
pub fn error_lookup(raw: &RawQuery) -> ErrorLookup {
    ErrorLookup {
        mac: single(raw, "mac").map(str::to_string),
        code: single(raw, "code").and_then(|v| v.parse().ok()),
    }
}
