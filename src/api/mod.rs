pub mod attendance;
pub mod employee;
pub mod export;
pub mod payment;
pub mod payroll;

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::calc::hours::month_bounds;
use crate::error::ApiError;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct MonthQuery {
    #[schema(example = 2026)]
    pub year: Option<i32>,
    /// 1-based
    #[schema(example = 3)]
    pub month: Option<u32>,
}

/// A validated calendar month and its `[start, end)` dates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthRange {
    pub year: i32,
    pub month: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// First date of the month still inside retention.
    pub fn retained_from(&self, cutoff: NaiveDate) -> NaiveDate {
        self.start.max(cutoff)
    }
}

/// Fills missing parts from `default` and rejects months outside 1..=12.
pub fn month_range(year: Option<i32>, month: Option<u32>, default: (i32, u32)) -> Result<MonthRange, ApiError> {
    let year = year.unwrap_or(default.0);
    let month = month.unwrap_or(default.1);
    let (start, end) =
        month_bounds(year, month).ok_or_else(|| ApiError::validation("Month must be between 1 and 12"))?;
    Ok(MonthRange {
        year,
        month,
        start,
        end,
    })
}

pub fn current_month(today: NaiveDate) -> (i32, u32) {
    (today.year(), today.month())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_parts() {
        let range = month_range(None, Some(2), (2026, 7)).unwrap();
        assert_eq!((range.year, range.month), (2026, 2));
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert!(range.contains(NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()));
        assert!(!range.contains(range.end));
    }

    #[test]
    fn retention_clips_the_month_start() {
        let range = month_range(Some(2026), Some(2), (2026, 1)).unwrap();
        let day = |d| NaiveDate::from_ymd_opt(2026, 2, d).unwrap();
        assert_eq!(range.retained_from(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()), day(1));
        assert_eq!(range.retained_from(day(10)), day(10));
        // a month entirely before the cutoff yields an empty window
        assert!(range.retained_from(NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()) >= range.end);
    }

    #[test]
    fn month_out_of_range_is_rejected() {
        assert!(matches!(
            month_range(Some(2026), Some(13), (2026, 1)),
            Err(ApiError::Validation(_))
        ));
        assert!(month_range(Some(2026), Some(0), (2026, 1)).is_err());
    }
}
