//! Date window resolution for dashboard filters
//!
//! Maps a named date mode plus focus parameters to a half-open UTC window.
//! Resolution is a pure function of its inputs and the `now` it is given, so
//! callers pass the clock explicitly.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open instant interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }

    /// Whether the day (taken at midnight UTC) falls in the window
    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.contains(midnight(day))
    }
}

/// Named date selection modes offered by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateMode {
    /// One focus day
    FocusDay,
    /// One calendar month
    FullMonth,
    /// Yesterday
    DayMinus1,
    /// The seven days before today
    WeekMinus1,
    /// Everything since the configured floor
    AllTime,
    /// Fallback for unrecognised modes
    Today,
}

impl DateMode {
    /// Modes offered to users, `Today` being only a fallback
    pub const SELECTABLE: [DateMode; 5] = [
        DateMode::FocusDay,
        DateMode::FullMonth,
        DateMode::DayMinus1,
        DateMode::WeekMinus1,
        DateMode::AllTime,
    ];

    /// Parse a mode name; unknown names fall back to `Today`
    ///
    /// Accepts the English names and the labels used by the legacy dashboard.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "focus_day" | "focus_jour" => DateMode::FocusDay,
            "full_month" | "mois_complet" => DateMode::FullMonth,
            "day_minus_1" | "j_minus_1" => DateMode::DayMinus1,
            "week_minus_1" | "semaine_minus_1" => DateMode::WeekMinus1,
            "all_time" | "toute_periode" => DateMode::AllTime,
            _ => DateMode::Today,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DateMode::FocusDay => "focus_day",
            DateMode::FullMonth => "full_month",
            DateMode::DayMinus1 => "day_minus_1",
            DateMode::WeekMinus1 => "week_minus_1",
            DateMode::AllTime => "all_time",
            DateMode::Today => "today",
        }
    }
}

impl fmt::Display for DateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default lower bound of the all-time window
pub fn default_all_time_floor() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Resolves date modes to windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRangeResolver {
    all_time_floor: NaiveDate,
}

impl Default for DateRangeResolver {
    fn default() -> Self {
        Self::new(default_all_time_floor())
    }
}

impl DateRangeResolver {
    pub fn new(all_time_floor: NaiveDate) -> Self {
        Self { all_time_floor }
    }

    pub fn all_time_floor(&self) -> NaiveDate {
        self.all_time_floor
    }

    /// Resolve `mode` to a window relative to `now`
    ///
    /// Never fails: a missing focus day means today, the month is clamped to
    /// 1..=12 and an unrepresentable year falls back to the current month.
    /// A window whose end would overflow the calendar falls back to today.
    /// The result always satisfies `end > start`.
    pub fn resolve(
        &self,
        mode: DateMode,
        focus_year: i32,
        focus_month: u32,
        focus_day: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> DateWindow {
        let today = now.date_naive();
        let today_window = day_window(today).unwrap_or(DateWindow {
            start: midnight(today),
            end: DateTime::<Utc>::MAX_UTC,
        });

        match mode {
            DateMode::FocusDay => focus_day.and_then(day_window).unwrap_or(today_window),
            DateMode::FullMonth => {
                let first = NaiveDate::from_ymd_opt(focus_year, focus_month.clamp(1, 12), 1)
                    .unwrap_or_else(|| first_of_month(today));
                first
                    .checked_add_months(Months::new(1))
                    .map(|next| DateWindow {
                        start: midnight(first),
                        end: midnight(next),
                    })
                    .unwrap_or(today_window)
            }
            DateMode::DayMinus1 => today.pred_opt().and_then(day_window).unwrap_or(today_window),
            DateMode::WeekMinus1 => today
                .checked_sub_days(Days::new(7))
                .map(|start| DateWindow {
                    start: midnight(start),
                    end: midnight(today),
                })
                .unwrap_or(today_window),
            DateMode::AllTime => {
                let floor = midnight(self.all_time_floor);
                // A floor configured in the future degrades to today
                let start = if floor < today_window.end {
                    floor
                } else {
                    today_window.start
                };
                DateWindow {
                    start,
                    end: today_window.end,
                }
            }
            DateMode::Today => today_window,
        }
    }
}

/// `[day, day + 1)`, `None` for the last representable day
fn day_window(day: NaiveDate) -> Option<DateWindow> {
    let next = day.succ_opt()?;
    Some(DateWindow {
        start: midnight(day),
        end: midnight(next),
    })
}

fn midnight(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

fn first_of_month(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}
