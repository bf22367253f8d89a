use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};

const MS_PER_HOUR: f64 = 3_600_000.0;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Fractional hours between two instants. Zero when either end is missing.
pub fn elapsed_hours(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> f64 {
    match (start, end) {
        (Some(a), Some(b)) => (b - a).num_milliseconds() as f64 / MS_PER_HOUR,
        _ => 0.0,
    }
}

/// Round to two decimals, half-up for non-negative values.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Renders hours as `"7h 30m"`.
pub fn fmt_hours(hours: f64) -> String {
    let hours = hours.max(0.0);
    let mut whole = hours.floor() as i64;
    let mut minutes = ((hours - hours.floor()) * 60.0).round() as i64;
    if minutes == 60 {
        whole += 1;
        minutes = 0;
    }
    format!("{}h {}m", whole, minutes)
}

/// `[first day, first day of next month)` for a 1-based month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = start.checked_add_months(Months::new(1))?;
    Some((start, end))
}

/// Year and 1-based month of the calendar month before `today`.
pub fn previous_month(today: NaiveDate) -> (i32, u32) {
    if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    }
}

pub fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .copied()
        .unwrap_or("Unknown")
}
