use std::collections::{BTreeSet, HashMap};

use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;
use tracing::error;
use utoipa::ToSchema;

use crate::{
    api::{MonthQuery, MonthRange, employee::fetch_employee, month_range},
    auth::auth::AuthUser,
    calc::{
        hours::{month_name, previous_month, round2},
        pay::{PayPolicy, SalaryBreakdown},
        summary::{completed_hours, retention_cutoff},
    },
    config::Config,
    error::ApiError,
    model::{attendance::AttendanceRecord, employee::Employee},
    utils::local_time::local_today,
};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SalaryRow {
    pub employee_id: i64,
    pub name: String,
    pub department: String,
    #[serde(flatten)]
    pub salary: SalaryBreakdown,
    pub days_worked: usize,
    /// Cumulative amount recorded as paid for the month
    pub paid: f64,
    /// `max(0, total_pay - paid)`
    pub pending: f64,
}

#[derive(Serialize, ToSchema)]
pub struct SalaryReport {
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 2)]
    pub month: u32,
    #[schema(example = "February 2026")]
    pub label: String,
    pub rows: Vec<SalaryRow>,
    pub total_pay: f64,
    pub total_paid: f64,
    pub total_pending: f64,
}

/// One row per employee from their completed records and recorded payment.
pub fn build_salary_rows(
    employees: &[Employee],
    records: &[AttendanceRecord],
    payments: &HashMap<i64, f64>,
    policy: &PayPolicy,
) -> Vec<SalaryRow> {
    let mut by_employee: HashMap<i64, Vec<&AttendanceRecord>> = HashMap::new();
    for r in records.iter().filter(|r| r.clock_out.is_some()) {
        by_employee.entry(r.employee_id).or_default().push(r);
    }

    employees
        .iter()
        .map(|emp| {
            let recs = by_employee.get(&emp.id).map(Vec::as_slice).unwrap_or_default();
            let hours = completed_hours(recs.iter().copied());
            let salary = policy.split_pay(hours, emp.on_hour_rate, emp.off_hour_rate, emp.pay_type);
            let days: BTreeSet<_> = recs.iter().map(|r| r.date).collect();
            let paid = payments.get(&emp.id).copied().unwrap_or(0.0);
            let pending = round2((salary.total_pay - paid).max(0.0));

            SalaryRow {
                employee_id: emp.id,
                name: emp.name.clone(),
                department: emp.department.clone(),
                salary,
                days_worked: days.len(),
                paid,
                pending,
            }
        })
        .collect()
}

pub fn build_report(range: &MonthRange, rows: Vec<SalaryRow>) -> SalaryReport {
    let total_pay = round2(rows.iter().map(|r| r.salary.total_pay).sum());
    let total_paid = round2(rows.iter().map(|r| r.paid).sum());
    let total_pending = round2(rows.iter().map(|r| r.pending).sum());
    SalaryReport {
        year: range.year,
        month: range.month,
        label: format!("{} {}", month_name(range.month), range.year),
        rows,
        total_pay,
        total_paid,
        total_pending,
    }
}

/// Salary rows for `employees` in `range`, read from the store. Records
/// dated before `from` are past retention and ignored.
pub async fn compute_salaries(
    pool: &PgPool,
    policy: &PayPolicy,
    range: &MonthRange,
    from: NaiveDate,
    employees: &[Employee],
) -> Result<Vec<SalaryRow>, ApiError> {
    let ids: Vec<i64> = employees.iter().map(|e| e.id).collect();

    let records = sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT * FROM attendance_records
        WHERE clock_out IS NOT NULL
          AND date >= $1 AND date < $2
          AND employee_id = ANY($3)
        "#,
    )
    .bind(from)
    .bind(range.end)
    .bind(&ids)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        error!(error = %e, year = range.year, month = range.month, "Failed to fetch month records");
        ApiError::Backend(e)
    })?;

    let payments: HashMap<i64, f64> = sqlx::query_as::<_, (i64, f64)>(
        "SELECT employee_id, amount FROM payments WHERE year = $1 AND month = $2 AND employee_id = ANY($3)",
    )
    .bind(range.year)
    .bind(range.month as i32)
    .bind(&ids)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch payments");
        ApiError::Backend(e)
    })?
    .into_iter()
    .collect();

    Ok(build_salary_rows(employees, &records, &payments, policy))
}

pub async fn all_employees(pool: &PgPool) -> Result<Vec<Employee>, ApiError> {
    sqlx::query_as::<_, Employee>("SELECT * FROM employees ORDER BY created_at ASC, id ASC")
        .fetch_all(pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch employees");
            ApiError::Backend(e)
        })
}

/// The month to price, defaulting to the previous month (the one normally
/// being paid out), and the first date in it still inside retention.
pub async fn salary_month(
    pool: &PgPool,
    config: &Config,
    query: &MonthQuery,
) -> Result<(MonthRange, NaiveDate), ApiError> {
    let today = local_today(pool, &config.timezone).await.map_err(|e| {
        error!(error = %e, "Failed to read local date");
        ApiError::Backend(e)
    })?;
    let range = month_range(query.year, query.month, previous_month(today))?;
    let from = range.retained_from(retention_cutoff(today, config.retention_months));
    Ok((range, from))
}

#[utoipa::path(
    get,
    path = "/api/payroll",
    params(MonthQuery),
    responses(
        (status = 200, body = SalaryReport),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_payroll(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    query: web::Query<MonthQuery>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let (range, from) = salary_month(pool.get_ref(), &config, &query).await?;
    let employees = all_employees(pool.get_ref()).await?;
    let rows = compute_salaries(pool.get_ref(), &config.pay_policy, &range, from, &employees).await?;

    Ok(HttpResponse::Ok().json(build_report(&range, rows)))
}

#[utoipa::path(
    get,
    path = "/api/payroll/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID"),
        MonthQuery
    ),
    responses(
        (status = 200, body = SalaryRow),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_payroll(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    path: web::Path<i64>,
    query: web::Query<MonthQuery>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let employee = fetch_employee(pool.get_ref(), path.into_inner()).await?;
    let (range, from) = salary_month(pool.get_ref(), &config, &query).await?;
    let rows =
        compute_salaries(pool.get_ref(), &config.pay_policy, &range, from, std::slice::from_ref(&employee)).await?;

    match rows.into_iter().next() {
        Some(row) => Ok(HttpResponse::Ok().json(row)),
        None => Err(ApiError::not_found("Employee not found")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{employee::PayType, role::Role};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn employee(id: i64, pay_type: PayType) -> Employee {
        Employee {
            id,
            name: format!("Emp {}", id),
            department: "General".into(),
            pin: format!("{:04}", id),
            pay_type,
            on_hour_rate: 12.0,
            off_hour_rate: 10.0,
            created_at: Utc::now(),
        }
    }

    fn shift(id: i64, employee_id: i64, day: u32, hours: i64, closed: bool) -> AttendanceRecord {
        let clock_in = Utc.with_ymd_and_hms(2026, 2, day, 8, 0, 0).unwrap();
        AttendanceRecord {
            id,
            employee_id,
            date: NaiveDate::from_ymd_opt(2026, 2, day).unwrap(),
            clock_in,
            clock_out: closed.then(|| clock_in + chrono::Duration::hours(hours)),
            hash: String::new(),
            backdated: false,
            created_by: Role::Staff,
        }
    }

    #[test]
    fn rows_split_pay_and_track_payments() {
        let employees = vec![employee(1, PayType::BankCash), employee(2, PayType::CashOnly)];
        // 7 ten-hour days for employee 1 = 70h, one open shift ignored
        let mut records: Vec<_> = (1..=7).map(|d| shift(d as i64, 1, d, 10, true)).collect();
        records.push(shift(100, 1, 8, 10, false));
        records.push(shift(200, 2, 3, 5, true));

        let payments = HashMap::from([(1, 500.0), (2, 80.0)]);
        let rows = build_salary_rows(&employees, &records, &payments, &PayPolicy::default());

        let a = &rows[0];
        assert_eq!(a.salary.total_hours, 70.0);
        assert_eq!(a.salary.on_hours, 67.0);
        assert_eq!(a.salary.off_hours, 3.0);
        assert_eq!(a.salary.total_pay, 834.0);
        assert_eq!(a.days_worked, 7);
        assert_eq!(a.paid, 500.0);
        assert_eq!(a.pending, 334.0);

        let b = &rows[1];
        assert_eq!(b.salary.on_hours, 0.0);
        assert_eq!(b.salary.cash_pay, 50.0);
        // overpaid never shows negative pending
        assert_eq!(b.pending, 0.0);
    }

    #[test]
    fn employees_without_records_get_zero_rows() {
        let rows = build_salary_rows(
            &[employee(3, PayType::BankCash)],
            &[],
            &HashMap::new(),
            &PayPolicy::default(),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].salary.total_pay, 0.0);
        assert_eq!(rows[0].days_worked, 0);
    }

    #[test]
    fn report_totals_and_label() {
        let range = month_range(Some(2026), Some(2), (2026, 1)).unwrap();
        let employees = vec![employee(1, PayType::BankCash), employee(2, PayType::BankCash)];
        let records = vec![shift(1, 1, 2, 8, true), shift(2, 2, 2, 4, true)];
        let payments = HashMap::from([(1, 96.0)]);
        let rows = build_salary_rows(&employees, &records, &payments, &PayPolicy::default());

        let report = build_report(&range, rows);
        assert_eq!(report.label, "February 2026");
        assert_eq!(report.total_pay, 144.0);
        assert_eq!(report.total_paid, 96.0);
        assert_eq!(report.total_pending, 48.0);
    }
}
