use serde::Serialize;
use utoipa::ToSchema;

use crate::calc::hours::round2;
use crate::model::employee::PayType;

/// Monthly hours paid at the on-rate before the remainder spills to the off-rate.
pub const BANK_HOUR_CAP: f64 = 67.0;

pub const DEFAULT_HOURLY_RATE: f64 = 12.21;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayPolicy {
    pub bank_hour_cap: f64,
    pub default_rate: f64,
}

impl Default for PayPolicy {
    fn default() -> Self {
        Self {
            bank_hour_cap: BANK_HOUR_CAP,
            default_rate: DEFAULT_HOURLY_RATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SalaryBreakdown {
    #[schema(example = 70.0)]
    pub total_hours: f64,
    #[schema(example = 67.0)]
    pub on_hours: f64,
    #[schema(example = 3.0)]
    pub off_hours: f64,
    #[schema(example = 12.21)]
    pub on_rate: f64,
    #[schema(example = 12.21)]
    pub off_rate: f64,
    #[schema(example = 818.07)]
    pub bank_pay: f64,
    #[schema(example = 36.63)]
    pub cash_pay: f64,
    #[schema(example = 854.7)]
    pub total_pay: f64,
    pub pay_type: PayType,
}

impl PayPolicy {
    /// A missing or non-positive rate falls back to the default rate.
    pub fn effective_rate(&self, rate: f64) -> f64 {
        if rate > 0.0 { rate } else { self.default_rate }
    }

    /// Splits a month's hours into the on-rate (bank) and off-rate (cash) tiers.
    ///
    /// `cash_only` employees have every hour billed at the off-rate. Everyone
    /// else gets the first `bank_hour_cap` hours at the on-rate and the rest at
    /// the off-rate. Hours and money are rounded to two decimals.
    pub fn split_pay(
        &self,
        total_hours: f64,
        on_rate: f64,
        off_rate: f64,
        pay_type: PayType,
    ) -> SalaryBreakdown {
        let total_hours = round2(total_hours.max(0.0));
        let on_rate = self.effective_rate(on_rate);
        let off_rate = self.effective_rate(off_rate);

        let (on_hours, off_hours) = match pay_type {
            PayType::CashOnly => (0.0, total_hours),
            PayType::BankCash => (
                round2(total_hours.min(self.bank_hour_cap)),
                round2((total_hours - self.bank_hour_cap).max(0.0)),
            ),
        };

        let bank_pay = round2(on_hours * on_rate);
        let cash_pay = round2(off_hours * off_rate);

        SalaryBreakdown {
            total_hours,
            on_hours,
            off_hours,
            on_rate,
            off_rate,
            bank_pay,
            cash_pay,
            total_pay: round2(bank_pay + cash_pay),
            pay_type,
        }
    }
}

/// [`PayPolicy::split_pay`] with the standard 67 hour cap.
pub fn split_pay(total_hours: f64, on_rate: f64, off_rate: f64, pay_type: PayType) -> SalaryBreakdown {
    PayPolicy::default().split_pay(total_hours, on_rate, off_rate, pay_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0)]
    #[case(12.34)]
    #[case(66.99)]
    #[case(67.0)]
    #[case(67.01)]
    #[case(150.5)]
    fn tiers_add_up_to_total(#[case] total: f64) {
        for pay_type in [PayType::BankCash, PayType::CashOnly] {
            let s = split_pay(total, 12.21, 10.0, pay_type);
            assert!((s.on_hours + s.off_hours - total).abs() < 0.005, "{s:?}");
        }
    }

    #[test]
    fn exactly_at_cap_is_all_on_hours() {
        let s = split_pay(67.0, 12.21, 10.0, PayType::BankCash);
        assert_eq!(s.on_hours, 67.0);
        assert_eq!(s.off_hours, 0.0);
        assert_eq!(s.bank_pay, 818.07);
        assert_eq!(s.cash_pay, 0.0);
    }

    #[test]
    fn hours_over_cap_spill_to_off_rate() {
        let s = split_pay(70.0, 12.21, 10.0, PayType::BankCash);
        assert_eq!(s.on_hours, 67.0);
        assert_eq!(s.off_hours, 3.0);
        assert_eq!(s.cash_pay, 30.0);
        assert_eq!(s.total_pay, 848.07);
    }

    #[rstest]
    #[case(0.0)]
    #[case(40.0)]
    #[case(90.25)]
    fn cash_only_has_no_on_hours(#[case] total: f64) {
        let s = split_pay(total, 15.0, 11.0, PayType::CashOnly);
        assert_eq!(s.on_hours, 0.0);
        assert_eq!(s.bank_pay, 0.0);
        assert_eq!(s.off_hours, total);
        assert_eq!(s.total_pay, round2(total * 11.0));
    }

    #[test]
    fn zero_hours_pay_nothing() {
        let s = split_pay(0.0, 12.21, 12.21, PayType::BankCash);
        assert_eq!((s.on_hours, s.off_hours, s.total_pay), (0.0, 0.0, 0.0));
    }

    #[test]
    fn missing_rates_use_default() {
        let s = split_pay(10.0, 0.0, -1.0, PayType::BankCash);
        assert_eq!(s.on_rate, DEFAULT_HOURLY_RATE);
        assert_eq!(s.off_rate, DEFAULT_HOURLY_RATE);
        assert_eq!(s.bank_pay, 122.1);
    }

    #[test]
    fn configured_cap_is_respected() {
        let policy = PayPolicy {
            bank_hour_cap: 40.0,
            default_rate: 10.0,
        };
        let s = policy.split_pay(45.0, 10.0, 8.0, PayType::BankCash);
        assert_eq!(s.on_hours, 40.0);
        assert_eq!(s.off_hours, 5.0);
        assert_eq!(s.total_pay, 440.0);
    }
}
