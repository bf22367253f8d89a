use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::role::Role;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttendanceRecord {
    pub id: i64,
    pub employee_id: i64,
    pub date: NaiveDate,
    pub clock_in: DateTime<Utc>,
    /// `None` while the employee is still clocked in.
    pub clock_out: Option<DateTime<Utc>>,
    pub hash: String,
    pub backdated: bool,
    pub created_by: Role,
}

impl AttendanceRecord {
    pub fn is_open(&self) -> bool {
        self.clock_out.is_none()
    }
}
