use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::{
    api::{employee::fetch_employee, month_range},
    auth::auth::AuthUser,
    calc::hours::{month_name, round2},
    error::ApiError,
    model::payment::Payment,
};

#[derive(Deserialize, ToSchema)]
pub struct RecordPayment {
    #[schema(example = 1)]
    pub employee_id: i64,
    #[schema(example = 2026)]
    pub year: i32,
    /// 1-based
    #[schema(example = 2)]
    pub month: u32,
    /// Total paid so far for the month, not an increment
    #[schema(example = 650.0)]
    pub amount: f64,
}

#[derive(Serialize, ToSchema)]
pub struct PaymentEntry {
    pub year: i32,
    pub month: i32,
    #[schema(example = "February 2026")]
    pub label: String,
    pub amount: f64,
}

#[derive(Serialize, ToSchema)]
pub struct PaidHistory {
    pub employee_id: i64,
    pub total_paid: f64,
    /// Newest month first
    pub history: Vec<PaymentEntry>,
}

pub fn validate_amount(amount: f64) -> Result<f64, ApiError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(ApiError::validation("Amount must be zero or more"));
    }
    Ok(round2(amount))
}

pub fn paid_history(employee_id: i64, mut payments: Vec<Payment>) -> PaidHistory {
    payments.sort_by(|a, b| (b.year, b.month).cmp(&(a.year, a.month)));
    let total_paid = round2(payments.iter().map(|p| p.amount).sum());
    PaidHistory {
        employee_id,
        total_paid,
        history: payments
            .into_iter()
            .map(|p| PaymentEntry {
                label: format!("{} {}", month_name(p.month as u32), p.year),
                year: p.year,
                month: p.month,
                amount: p.amount,
            })
            .collect(),
    }
}

/// Record the cumulative amount paid for a month (insert or overwrite)
#[utoipa::path(
    put,
    path = "/api/payments",
    request_body = RecordPayment,
    responses(
        (status = 200, description = "Payment recorded", body = Object, example = json!({
            "message": "Payment recorded: £650.00 for Jane Doe"
        })),
        (status = 400, description = "Negative amount or bad month"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payment"
)]
pub async fn record_payment(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    body: web::Json<RecordPayment>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let range = month_range(Some(body.year), Some(body.month), (body.year, body.month))?;
    let amount = validate_amount(body.amount)?;
    let employee = fetch_employee(pool.get_ref(), body.employee_id).await?;

    sqlx::query(
        r#"
        INSERT INTO payments (employee_id, year, month, amount)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (employee_id, year, month)
        DO UPDATE SET amount = EXCLUDED.amount, updated_at = NOW()
        "#,
    )
    .bind(employee.id)
    .bind(range.year)
    .bind(range.month as i32)
    .bind(amount)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id = employee.id, "Failed to record payment");
        ApiError::Backend(e)
    })?;

    info!(employee_id = employee.id, year = range.year, month = range.month, amount, "Payment recorded");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Payment recorded: £{:.2} for {}", amount, employee.name)
    })))
}

#[utoipa::path(
    get,
    path = "/api/payments/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, body = PaidHistory)
    ),
    security(("bearer_auth" = [])),
    tag = "Payment"
)]
pub async fn get_paid_history(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let employee_id = path.into_inner();
    let payments = sqlx::query_as::<_, Payment>(
        "SELECT id, employee_id, year, month, amount, updated_at FROM payments WHERE employee_id = $1",
    )
    .bind(employee_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to fetch payments");
        ApiError::Backend(e)
    })?;

    Ok(HttpResponse::Ok().json(paid_history(employee_id, payments)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn payment(year: i32, month: i32, amount: f64) -> Payment {
        Payment {
            id: 0,
            employee_id: 1,
            year,
            month,
            amount,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn amounts_are_rounded_and_non_negative() {
        assert_eq!(validate_amount(650.456).unwrap(), 650.46);
        assert_eq!(validate_amount(0.0).unwrap(), 0.0);
        assert!(validate_amount(-1.0).is_err());
        assert!(validate_amount(f64::NAN).is_err());
    }

    #[test]
    fn history_is_newest_first_with_total() {
        let history = paid_history(
            1,
            vec![payment(2025, 12, 100.0), payment(2026, 2, 250.5), payment(2026, 1, 99.5)],
        );
        let labels: Vec<_> = history.history.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["February 2026", "January 2026", "December 2025"]);
        assert_eq!(history.total_paid, 450.0);
    }
}
