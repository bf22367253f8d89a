use actix_web::{
    HttpResponse, Responder,
    http::header::{ContentDisposition, DispositionParam, DispositionType},
    web,
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::{error, info};

use crate::{
    api::{MonthQuery, current_month, month_range, payroll},
    auth::auth::AuthUser,
    calc::{
        hours::{elapsed_hours, month_name},
        summary::retention_cutoff,
    },
    config::Config,
    error::ApiError,
    utils::local_time::local_today,
};

const ATTENDANCE_HEADERS: [&str; 6] = [
    "Employee Name",
    "Department",
    "Date",
    "Clock In",
    "Clock Out",
    "Hours Worked",
];

const SALARY_HEADERS: [&str; 13] = [
    "Employee Name",
    "Department",
    "Pay Type",
    "Total Hours",
    "On Hours",
    "Off Hours",
    "On Rate",
    "Off Rate",
    "Bank Pay",
    "Cash Pay",
    "Net Pay",
    "Paid",
    "Pending",
];

#[derive(sqlx::FromRow)]
struct AttendanceExportRow {
    employee_name: String,
    department: String,
    date: NaiveDate,
    clock_in: DateTime<Utc>,
    clock_out: Option<DateTime<Utc>>,
    clock_in_local: String,
    clock_out_local: Option<String>,
}

/// Every cell quoted, embedded quotes doubled.
pub fn csv_row<S: AsRef<str>>(cells: &[S]) -> String {
    cells
        .iter()
        .map(|c| format!("\"{}\"", c.as_ref().replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn to_csv<S: AsRef<str>>(headers: &[&str], rows: &[Vec<S>]) -> String {
    std::iter::once(csv_row(headers))
        .chain(rows.iter().map(|r| csv_row(r)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn attendance_cells(row: &AttendanceExportRow) -> Vec<String> {
    vec![
        row.employee_name.clone(),
        row.department.clone(),
        row.date.format("%Y-%m-%d").to_string(),
        row.clock_in_local.clone(),
        row.clock_out_local.clone().unwrap_or_default(),
        format!("{:.2}", elapsed_hours(Some(row.clock_in), row.clock_out)),
    ]
}

pub fn salary_cells(row: &payroll::SalaryRow) -> Vec<String> {
    let s = &row.salary;
    vec![
        row.name.clone(),
        row.department.clone(),
        s.pay_type.label().to_string(),
        format!("{:.2}", s.total_hours),
        format!("{:.2}", s.on_hours),
        format!("{:.2}", s.off_hours),
        format!("{:.2}", s.on_rate),
        format!("{:.2}", s.off_rate),
        format!("{:.2}", s.bank_pay),
        format!("{:.2}", s.cash_pay),
        format!("{:.2}", s.total_pay),
        format!("{:.2}", row.paid),
        format!("{:.2}", row.pending),
    ]
}

async fn local_date(pool: &PgPool, config: &Config) -> Result<NaiveDate, ApiError> {
    local_today(pool, &config.timezone).await.map_err(|e| {
        error!(error = %e, "Failed to read local date");
        ApiError::Backend(e)
    })
}

fn csv_response(filename: String, body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(body)
}

/// Completed records dated from `from` up to `end` (open-ended when `None`), oldest first.
async fn completed_records(
    pool: &PgPool,
    tz: &str,
    from: NaiveDate,
    end: Option<NaiveDate>,
) -> Result<Vec<AttendanceExportRow>, ApiError> {
    sqlx::query_as::<_, AttendanceExportRow>(
        r#"
        SELECT e.name AS employee_name, e.department, r.date, r.clock_in, r.clock_out,
               to_char(r.clock_in AT TIME ZONE $3, 'HH12:MI am') AS clock_in_local,
               to_char(r.clock_out AT TIME ZONE $3, 'HH12:MI am') AS clock_out_local
        FROM attendance_records r
        JOIN employees e ON e.id = r.employee_id
        WHERE r.clock_out IS NOT NULL
          AND r.date >= $1
          AND ($2::date IS NULL OR r.date < $2)
        ORDER BY r.clock_in ASC
        "#,
    )
    .bind(from)
    .bind(end)
    .bind(tz)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch records for export");
        ApiError::Backend(e)
    })
}

/// Attendance CSV for one month
#[utoipa::path(
    get,
    path = "/api/export/attendance",
    params(MonthQuery),
    responses((status = 200, description = "CSV file", content_type = "text/csv")),
    security(("bearer_auth" = [])),
    tag = "Export"
)]
pub async fn export_attendance(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    query: web::Query<MonthQuery>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let today = local_date(pool.get_ref(), &config).await?;
    let range = month_range(query.year, query.month, current_month(today))?;
    let from = range.retained_from(retention_cutoff(today, config.retention_months));
    let rows = completed_records(pool.get_ref(), &config.timezone, from, Some(range.end)).await?;

    let cells: Vec<_> = rows.iter().map(attendance_cells).collect();
    info!(year = range.year, month = range.month, rows = cells.len(), "Attendance exported");

    Ok(csv_response(
        format!("Attendance_{}_{}.csv", month_name(range.month), range.year),
        to_csv(&ATTENDANCE_HEADERS, &cells),
    ))
}

/// Every completed record inside retention
#[utoipa::path(
    get,
    path = "/api/export/attendance/all",
    responses((status = 200, description = "CSV file", content_type = "text/csv")),
    security(("bearer_auth" = [])),
    tag = "Export"
)]
pub async fn export_all_attendance(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let today = local_date(pool.get_ref(), &config).await?;
    let cutoff = retention_cutoff(today, config.retention_months);
    let rows = completed_records(pool.get_ref(), &config.timezone, cutoff, None).await?;
    let cells: Vec<_> = rows.iter().map(attendance_cells).collect();
    info!(rows = cells.len(), "All attendance exported");

    Ok(csv_response(
        "Attendance_All.csv".to_string(),
        to_csv(&ATTENDANCE_HEADERS, &cells),
    ))
}

/// Salary CSV for one month, defaulting to the previous month
#[utoipa::path(
    get,
    path = "/api/export/salary",
    params(MonthQuery),
    responses((status = 200, description = "CSV file", content_type = "text/csv")),
    security(("bearer_auth" = [])),
    tag = "Export"
)]
pub async fn export_salary(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    query: web::Query<MonthQuery>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let (range, from) = payroll::salary_month(pool.get_ref(), &config, &query).await?;
    let employees = payroll::all_employees(pool.get_ref()).await?;
    let rows = payroll::compute_salaries(pool.get_ref(), &config.pay_policy, &range, from, &employees).await?;

    let cells: Vec<_> = rows.iter().map(salary_cells).collect();
    info!(year = range.year, month = range.month, rows = cells.len(), "Salary exported");

    Ok(csv_response(
        format!("Salary_{}_{}.csv", month_name(range.month), range.year),
        to_csv(&SALARY_HEADERS, &cells),
    ))
}
