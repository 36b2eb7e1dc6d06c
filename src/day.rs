use std::fmt;

use chrono::{Days, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::error::DashboardError;

/// Number of forecast days published per run.
pub const FORECAST_DAYS: u8 = 7;

/// One selectable forecast day, e.g. `Day 3 - 06/14/2025`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayOption {
    number: u8,
    date: NaiveDate,
}

impl DayOption {
    #[inline] pub fn number(&self) -> u8 { self.number }

    #[inline] pub fn date(&self) -> NaiveDate { self.date }

    /// Selection label (`Day N`), used as cache key and in the resource name.
    pub fn label(&self) -> String { format!("Day {}", self.number) }
}

impl fmt::Display for DayOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Day {} - {}", self.number, self.date.format("%m/%d/%Y"))
    }
}

/// Calendar date in `tz` right now.
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// The rolling window of forecast days starting at `today`.
pub fn day_options(today: NaiveDate) -> Vec<DayOption> {
    (0..FORECAST_DAYS)
        .filter_map(|offset| {
            let date = today.checked_add_days(Days::new(offset as u64))?;
            Some(DayOption { number: offset + 1, date })
        })
        .collect()
}

/// Accept `Day N` or a full option label `Day N - MM/DD/YYYY`, returning N.
pub fn parse_day_label(label: &str) -> Result<u8, DashboardError> {
    let invalid = || DashboardError::InvalidSelection(format!("unknown day {label:?}, expected 'Day 1'..'Day {FORECAST_DAYS}'"));

    let head = label.trim().split(" - ").next().unwrap_or_default();
    let number = head.strip_prefix("Day ")
        .and_then(|n| n.parse::<u8>().ok())
        .ok_or_else(invalid)?;

    if (1..=FORECAST_DAYS).contains(&number) { Ok(number) } else { Err(invalid()) }
}

/// Canonical `Day N` label for any accepted input.
pub fn normalize_day_label(label: &str) -> Result<String, DashboardError> {
    Ok(format!("Day {}", parse_day_label(label)?))
}

/// Object key of the dataset for `day_label`, published on `today`.
/// The date is the publication date, not the forecast day's date.
pub fn resource_key(day_label: &str, today: NaiveDate) -> Result<String, DashboardError> {
    let label = normalize_day_label(day_label)?;
    Ok(format!("heat_risk_analysis_{}_{}.geoparquet", label.replace(' ', "+"), today.format("%Y%m%d")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn options_roll_over_month_end() {
        let options = day_options(date(2025, 6, 28));
        assert_eq!(options.len(), 7);
        assert_eq!(options[0].to_string(), "Day 1 - 06/28/2025");
        assert_eq!(options[6].to_string(), "Day 7 - 07/04/2025");
        assert_eq!(options[6].label(), "Day 7");
    }

    #[test]
    fn resource_key_uses_today_for_every_day() {
        let today = date(2025, 6, 10);
        for n in 1..=FORECAST_DAYS {
            assert_eq!(
                resource_key(&format!("Day {n}"), today).unwrap(),
                format!("heat_risk_analysis_Day+{n}_20250610.geoparquet"),
            );
        }
        assert_eq!(
            resource_key("Day 2 - 06/11/2025", today).unwrap(),
            "heat_risk_analysis_Day+2_20250610.geoparquet",
        );
    }

    #[test]
    fn bad_labels_are_invalid_selections() {
        for label in ["Day 0", "Day 8", "day 1", "Tomorrow", ""] {
            assert!(matches!(parse_day_label(label), Err(DashboardError::InvalidSelection(_))), "{label}");
        }
    }
}
