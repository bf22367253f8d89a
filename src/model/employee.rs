use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize, sqlx::Type, ToSchema, AsRefStr, EnumString,
)]
#[sqlx(type_name = "pay_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PayType {
    /// First tier through the bank, the rest in cash.
    #[default]
    BankCash,
    CashOnly,
}

impl PayType {
    pub fn label(self) -> &'static str {
        match self {
            PayType::BankCash => "Bank + Cash",
            PayType::CashOnly => "Cash Only",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Jane Doe",
        "department": "Kitchen",
        "pin": "4821",
        "pay_type": "bank_cash",
        "on_hour_rate": 12.21,
        "off_hour_rate": 12.21,
        "created_at": "2026-01-05T09:00:00Z"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: i64,

    #[schema(example = "Jane Doe")]
    pub name: String,

    #[schema(example = "Kitchen")]
    pub department: String,

    #[schema(example = "4821")]
    pub pin: String,

    pub pay_type: PayType,

    #[schema(example = 12.21)]
    pub on_hour_rate: f64,

    #[schema(example = 12.21)]
    pub off_hour_rate: f64,

    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn pay_type_names() {
        assert_eq!(PayType::CashOnly.as_ref(), "cash_only");
        assert_eq!(PayType::from_str("bank_cash").unwrap(), PayType::BankCash);
        assert_eq!(PayType::BankCash.label(), "Bank + Cash");
        assert_eq!(
            serde_json::to_string(&PayType::CashOnly).unwrap(),
            "\"cash_only\""
        );
    }
}
