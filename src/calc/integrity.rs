//! Checksum over attendance records.
//!
//! This only catches accidental edits made outside the service. Anyone with
//! write access to the table can recompute it.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;

use crate::model::{attendance::AttendanceRecord, role::Role};

/// Every stored field of a record except its id and the hash itself.
#[derive(Debug, Serialize)]
pub struct Fingerprint {
    pub employee_id: i64,
    pub date: String,
    pub clock_in: String,
    pub clock_out: Option<String>,
    pub backdated: bool,
    pub created_by: Role,
}

// Millisecond precision so the value survives a round trip through timestamptz.
fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl Fingerprint {
    pub fn new(
        employee_id: i64,
        date: NaiveDate,
        clock_in: DateTime<Utc>,
        clock_out: Option<DateTime<Utc>>,
        backdated: bool,
        created_by: Role,
    ) -> Self {
        Self {
            employee_id,
            date: date.format("%Y-%m-%d").to_string(),
            clock_in: iso(clock_in),
            clock_out: clock_out.map(iso),
            backdated,
            created_by,
        }
    }
}

impl From<&AttendanceRecord> for Fingerprint {
    fn from(r: &AttendanceRecord) -> Self {
        Fingerprint::new(r.employee_id, r.date, r.clock_in, r.clock_out, r.backdated, r.created_by)
    }
}

/// `h = h * 31 + c` over UTF-16 code units with 32-bit wrap-around,
/// rendered as the absolute value in 8 hex digits.
pub fn rolling_hash(input: &str) -> String {
    let h = input
        .encode_utf16()
        .fold(0i32, |h, c| h.wrapping_shl(5).wrapping_sub(h).wrapping_add(c as i32));
    format!("{:08x}", h.unsigned_abs())
}

pub fn integrity_hash(fingerprint: &Fingerprint) -> String {
    // A struct of strings, bools and integers always serializes.
    let json = serde_json::to_string(fingerprint).unwrap_or_default();
    rolling_hash(&json)
}

pub fn verify(record: &AttendanceRecord) -> bool {
    integrity_hash(&Fingerprint::from(record)) == record.hash
}
