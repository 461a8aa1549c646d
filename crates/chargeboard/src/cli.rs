//! Terminal output for the one-shot commands

use chargeboard_core::error::ErrorSeverity;
use chargeboard_core::models::{KpiSummary, SiteStats};
use chargeboard_core::{DateWindow, RefreshReport};
use comfy_table::{Cell, Color, ContentArrangement, Table};
use serde_json::json;

fn header(table: &mut Table, titles: &[&str], no_color: bool) {
    if no_color {
        table.set_header(titles.to_vec());
    } else {
        table.set_header(titles.iter().map(|t| Cell::new(t).fg(Color::Cyan)));
    }
}

/// Per-collection outcome of a refresh pass, followed by its errors
pub fn format_report(report: &RefreshReport, json: bool, no_color: bool) -> String {
    if json {
        return serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    header(&mut table, &["Collection", "Status", "Records", "Skipped"], no_color);

    for outcome in &report.outcomes {
        let (status, color) = if outcome.succeeded() {
            ("loaded", Color::Green)
        } else {
            ("stale", Color::Red)
        };
        let status = if no_color {
            Cell::new(status)
        } else {
            Cell::new(status).fg(color)
        };
        table.add_row(vec![
            Cell::new(outcome.collection.name()),
            status,
            Cell::new(outcome.loaded.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string())),
            Cell::new(outcome.skipped),
        ]);
    }

    let mut lines = vec![table.to_string()];
    lines.push(format!(
        "{} records loaded, {} rows skipped",
        report.records_loaded, report.records_skipped
    ));

    if report.has_errors() {
        let (warnings, errors, fatal) = report.error_count();
        lines.push(format!(
            "{} warnings, {} errors, {} fatal",
            warnings, errors, fatal
        ));
    }

    for error in &report.errors {
        let level = match error.severity {
            ErrorSeverity::Warning => "warning",
            ErrorSeverity::Error => "error",
            ErrorSeverity::Fatal => "fatal",
        };
        lines.push(format!("  [{}] {}: {}", level, error.source, error.message));
        if let Some(suggestion) = &error.suggestion {
            lines.push(format!("          {}", suggestion));
        }
    }

    lines.join("\n")
}

/// KPI summary for a window plus its top sites
pub fn format_kpis(
    kpis: &KpiSummary,
    top: &[SiteStats],
    window: &DateWindow,
    json: bool,
    no_color: bool,
) -> String {
    if json {
        let value = json!({ "window": window, "kpis": kpis, "top_sites": top });
        return serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string());
    }

    let mut lines = vec![
        format!(
            "Window:        {} .. {}",
            window.start.format("%Y-%m-%d %H:%M"),
            window.end.format("%Y-%m-%d %H:%M")
        ),
        format!("Sessions:      {} ({} ok, {} nok)", kpis.total, kpis.ok, kpis.nok),
        format!("Success rate:  {:.2}%", kpis.success_rate),
        format!("Sites / PDCs:  {} / {}", kpis.distinct_sites, kpis.distinct_pdcs),
    ];

    if top.is_empty() {
        lines.push("No sessions in window.".to_string());
        return lines.join("\n");
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    header(&mut table, &["Site", "Total", "OK", "NOK", "Success %"], no_color);
    for site in top {
        table.add_row(vec![
            Cell::new(&site.site),
            Cell::new(site.total),
            Cell::new(site.ok),
            Cell::new(site.nok),
            Cell::new(format!("{:.2}", site.success_rate)),
        ]);
    }
    lines.push(table.to_string());

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chargeboard_core::Collection;
    use chrono::{TimeZone, Utc};

    fn window() -> DateWindow {
        DateWindow {
            start: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_report_table_lists_stale_collections() {
        let mut report = RefreshReport::new();
        report.record_loaded(Collection::Sessions, 12, 1);
        report.record_failed(Collection::Alerts);
        report.add_warning("sessions", "1 rows skipped");

        let out = format_report(&report, false, true);

        assert!(out.contains("sessions"));
        assert!(out.contains("stale"));
        assert!(out.contains("12 records loaded, 1 rows skipped"));
        assert!(out.contains("1 warnings, 0 errors, 0 fatal"));
        assert!(out.contains("[warning] sessions: 1 rows skipped"));
    }

    #[test]
    fn test_report_json() {
        let mut report = RefreshReport::new();
        report.record_loaded(Collection::Faults, 3, 0);

        assert!(!format_report(&report, false, true).contains("fatal"));

        let out = format_report(&report, true, true);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["records_loaded"], 3);
        assert_eq!(value["outcomes"][0]["collection"], "faults");
    }

    #[test]
    fn test_kpis_without_sessions() {
        let out = format_kpis(&KpiSummary::default(), &[], &window(), false, true);

        assert!(out.contains("2024-06-01 00:00 .. 2024-07-01 00:00"));
        assert!(out.contains("Sessions:      0 (0 ok, 0 nok)"));
        assert!(out.contains("No sessions in window."));
    }

    #[test]
    fn test_kpis_with_top_sites() {
        let kpis = KpiSummary {
            total: 3,
            ok: 2,
            nok: 1,
            success_rate: 66.67,
            failure_rate: 33.33,
            distinct_sites: 1,
            distinct_pdcs: 2,
        };
        let top = vec![SiteStats {
            site: "Lyon".to_string(),
            total: 3,
            ok: 2,
            nok: 1,
            success_rate: 66.67,
            failure_rate: 33.33,
        }];

        let out = format_kpis(&kpis, &top, &window(), false, true);
        assert!(out.contains("Success rate:  66.67%"));
        assert!(out.contains("Lyon"));

        let json_out = format_kpis(&kpis, &top, &window(), true, true);
        let value: serde_json::Value = serde_json::from_str(&json_out).unwrap();
        assert_eq!(value["top_sites"][0]["site"], "Lyon");
    }
}
