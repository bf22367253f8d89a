use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cumulative amount paid to one employee for one month.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: i64,
    pub employee_id: i64,
    pub year: i32,
    /// 1-based.
    pub month: i32,
    pub amount: f64,
    pub updated_at: DateTime<Utc>,
}
