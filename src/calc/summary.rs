use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::calc::hours::{elapsed_hours, fmt_hours, round2};
use crate::model::attendance::AttendanceRecord;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthTotals {
    #[schema(example = 72.5)]
    pub hours: f64,
    #[schema(example = "72h 30m")]
    pub hours_display: String,
    #[schema(example = 12)]
    pub days_worked: usize,
    pub clocked_in: bool,
}

/// Hours of completed records only. Salary is computed from this.
pub fn completed_hours<'a>(records: impl IntoIterator<Item = &'a AttendanceRecord>) -> f64 {
    records
        .into_iter()
        .filter(|r| r.clock_out.is_some())
        .map(|r| elapsed_hours(Some(r.clock_in), r.clock_out))
        .sum()
}

/// Totals for one employee's records within one month.
///
/// When `is_current_month` is set, an open session counts up to `now` and its
/// date counts as a worked day.
pub fn month_totals(records: &[AttendanceRecord], now: DateTime<Utc>, is_current_month: bool) -> MonthTotals {
    let mut hours = completed_hours(records);
    let mut days: BTreeSet<NaiveDate> = records
        .iter()
        .filter(|r| r.clock_out.is_some())
        .map(|r| r.date)
        .collect();

    let open = records.iter().find(|r| r.is_open());
    if is_current_month {
        if let Some(open) = open {
            hours += elapsed_hours(Some(open.clock_in), Some(now)).max(0.0);
            days.insert(open.date);
        }
    }

    let hours = round2(hours);
    MonthTotals {
        hours,
        hours_display: fmt_hours(hours),
        days_worked: days.len(),
        clocked_in: open.is_some(),
    }
}

/// `"Shift n/total"` for every completed record sharing its employee and date
/// with another completed record. Single shifts get no label.
pub fn shift_labels(records: &[AttendanceRecord]) -> HashMap<i64, String> {
    let mut groups: HashMap<(i64, NaiveDate), Vec<&AttendanceRecord>> = HashMap::new();
    for r in records.iter().filter(|r| r.clock_out.is_some()) {
        groups.entry((r.employee_id, r.date)).or_default().push(r);
    }

    let mut labels = HashMap::new();
    for mut group in groups.into_values().filter(|g| g.len() > 1) {
        group.sort_by_key(|r| r.clock_in);
        let total = group.len();
        for (idx, r) in group.into_iter().enumerate() {
            labels.insert(r.id, format!("Shift {}/{}", idx + 1, total));
        }
    }
    labels
}

/// First day of the month `months` before the month containing `today`.
/// Records dated before this are pruned.
pub fn retention_cutoff(today: NaiveDate, months: u32) -> NaiveDate {
    let first = today.with_day(1).unwrap_or(today);
    first.checked_sub_months(Months::new(months)).unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use chrono::TimeZone;

    fn rec(id: i64, day: u32, from: u32, to: Option<u32>) -> AttendanceRecord {
        let clock_in = Utc.with_ymd_and_hms(2026, 4, day, from, 0, 0).unwrap();
        AttendanceRecord {
            id,
            employee_id: 1,
            date: NaiveDate::from_ymd_opt(2026, 4, day).unwrap(),
            clock_in,
            clock_out: to.map(|h| Utc.with_ymd_and_hms(2026, 4, day, h, 0, 0).unwrap()),
            hash: String::new(),
            backdated: false,
            created_by: Role::Staff,
        }
    }

    #[test]
    fn completed_hours_skip_open_sessions() {
        let records = vec![rec(1, 1, 9, Some(17)), rec(2, 2, 9, None)];
        assert_eq!(completed_hours(&records), 8.0);
    }

    #[test]
    fn month_totals_count_distinct_days() {
        let records = vec![
            rec(1, 1, 6, Some(10)),
            rec(2, 1, 14, Some(18)),
            rec(3, 3, 9, Some(12)),
        ];
        let now = Utc.with_ymd_and_hms(2026, 4, 20, 12, 0, 0).unwrap();
        let totals = month_totals(&records, now, true);
        assert_eq!(totals.hours, 11.0);
        assert_eq!(totals.days_worked, 2);
        assert!(!totals.clocked_in);
        assert_eq!(totals.hours_display, "11h 0m");
    }

    #[test]
    fn open_session_counts_only_in_current_month() {
        let records = vec![rec(1, 1, 9, Some(17)), rec(2, 5, 9, None)];
        let now = Utc.with_ymd_and_hms(2026, 4, 5, 11, 30, 0).unwrap();

        let live = month_totals(&records, now, true);
        assert_eq!(live.hours, 10.5);
        assert_eq!(live.days_worked, 2);
        assert!(live.clocked_in);

        let past = month_totals(&records, now, false);
        assert_eq!(past.hours, 8.0);
        assert_eq!(past.days_worked, 1);
    }

    #[test]
    fn double_shifts_are_labelled_in_clock_in_order() {
        let records = vec![
            rec(10, 1, 14, Some(18)),
            rec(11, 1, 6, Some(10)),
            rec(12, 2, 9, Some(17)),
            rec(13, 1, 20, None),
        ];
        let labels = shift_labels(&records);
        assert_eq!(labels.get(&11).map(String::as_str), Some("Shift 1/2"));
        assert_eq!(labels.get(&10).map(String::as_str), Some("Shift 2/2"));
        assert!(!labels.contains_key(&12));
        assert!(!labels.contains_key(&13));
    }

    #[test]
    fn retention_cutoff_is_first_of_month_six_months_back() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 17).unwrap();
        assert_eq!(
            retention_cutoff(today, 6),
            NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()
        );
        let today = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();
        assert_eq!(
            retention_cutoff(today, 6),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
        );
    }
}
