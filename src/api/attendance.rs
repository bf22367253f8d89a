use crate::{
    api::{current_month, employee::{fetch_employee, validate_pin}, month_range},
    auth::auth::AuthUser,
    calc::{
        geofence::{GeofenceCheck, denial_message, valid_coordinates},
        hours::{elapsed_hours, fmt_hours, round2},
        integrity::{Fingerprint, integrity_hash, verify},
        summary::{MonthTotals, month_totals, retention_cutoff, shift_labels},
    },
    config::Config,
    error::{ApiError, is_unique_violation},
    model::{attendance::AttendanceRecord, employee::Employee, role::Role},
    utils::{
        local_time::{local_date_of, local_today, to_utc},
        pin_cache,
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClockAction {
    In,
    Out,
}

impl ClockAction {
    fn as_str(self) -> &'static str {
        match self {
            ClockAction::In => "in",
            ClockAction::Out => "out",
        }
    }
}

/// Device position at the moment of a staff clock action
#[derive(Deserialize, ToSchema)]
pub struct ClockReq {
    #[schema(example = 51.6174)]
    pub lat: f64,
    #[schema(example = -0.3118)]
    pub lng: f64,
}

#[derive(Deserialize, ToSchema)]
pub struct AdminClockReq {
    #[schema(example = "4821")]
    pub pin: String,
    pub action: ClockAction,
}

#[derive(Deserialize, ToSchema)]
pub struct BackdateReq {
    #[schema(example = 1)]
    pub employee_id: i64,
    #[schema(example = "2026-03-02", value_type = String, format = Date)]
    pub date: NaiveDate,
    /// Local wall-clock time, `HH:MM`
    #[schema(example = "09:00")]
    pub clock_in: String,
    #[schema(example = "17:30")]
    pub clock_out: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateRecordReq {
    #[schema(example = "2026-03-02", value_type = String, format = Date)]
    pub date: NaiveDate,
    #[schema(example = "09:00")]
    pub clock_in: String,
    #[schema(example = "17:30")]
    pub clock_out: String,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct RecordQuery {
    /// Required for admins on the summary route; ignored for staff
    pub employee_id: Option<i64>,
    pub year: Option<i32>,
    /// 1-based, defaults to the current month
    pub month: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct ClockResponse {
    #[schema(example = "Jane Doe clocked OUT, 8h 30m worked")]
    pub message: String,
    pub record_id: i64,
    #[schema(example = 8.5)]
    pub hours: Option<f64>,
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    #[sqlx(flatten)]
    record: AttendanceRecord,
    employee_name: String,
    department: String,
}

#[derive(Serialize, ToSchema)]
pub struct RecordView {
    pub id: i64,
    pub employee_id: i64,
    pub employee_name: String,
    pub department: String,
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    #[schema(value_type = String, format = DateTime)]
    pub clock_in: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub clock_out: Option<DateTime<Utc>>,
    pub hours: f64,
    #[schema(example = "8h 30m")]
    pub hours_display: String,
    /// Checksum still matches the stored fields
    pub verified: bool,
    pub backdated: bool,
    pub created_by: Role,
    /// `"Shift n/total"` on double-shift days
    pub shift: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct MonthSummaryResponse {
    pub employee_id: i64,
    pub year: i32,
    pub month: u32,
    #[serde(flatten)]
    pub totals: MonthTotals,
}

/// Parses `HH:MM` wall-clock times and checks the shift ends after it starts.
pub fn parse_shift(clock_in: &str, clock_out: &str) -> Result<(NaiveTime, NaiveTime), ApiError> {
    let parse = |s: &str| {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map_err(|_| ApiError::validation(format!("Invalid time {:?}, expected HH:MM", s)))
    };
    let (start, end) = (parse(clock_in)?, parse(clock_out)?);
    if end <= start {
        return Err(ApiError::validation("Clock out time must be after clock in time"));
    }
    Ok((start, end))
}

fn to_view(row: RecordRow, labels: &std::collections::HashMap<i64, String>) -> RecordView {
    let r = row.record;
    let hours = round2(elapsed_hours(Some(r.clock_in), r.clock_out));
    RecordView {
        verified: verify(&r),
        shift: labels.get(&r.id).cloned(),
        id: r.id,
        employee_id: r.employee_id,
        employee_name: row.employee_name,
        department: row.department,
        date: r.date,
        clock_in: r.clock_in,
        clock_out: r.clock_out,
        hours,
        hours_display: fmt_hours(hours),
        backdated: r.backdated,
        created_by: r.created_by,
    }
}

/// The instant a local `date` + `time` refers to.
async fn local_instant(
    pool: &PgPool,
    config: &Config,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<DateTime<Utc>, ApiError> {
    to_utc(pool, date, time, &config.timezone).await.map_err(|e| {
        error!(error = %e, %date, %time, "Failed to convert local time");
        ApiError::Backend(e)
    })
}

async fn open_record(pool: &PgPool, employee_id: i64) -> Result<Option<AttendanceRecord>, ApiError> {
    sqlx::query_as::<_, AttendanceRecord>(
        "SELECT * FROM attendance_records WHERE employee_id = $1 AND clock_out IS NULL",
    )
    .bind(employee_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to fetch open record");
        ApiError::Backend(e)
    })
}

async fn clock_in_employee(
    pool: &PgPool,
    config: &Config,
    employee: &Employee,
    created_by: Role,
) -> Result<ClockResponse, ApiError> {
    if open_record(pool, employee.id).await?.is_some() {
        return Err(ApiError::validation("Already clocked in!"));
    }

    let now = Utc::now();
    let date = local_date_of(pool, now, &config.timezone).await.map_err(|e| {
        error!(error = %e, employee_id = employee.id, "Failed to resolve local date");
        ApiError::Backend(e)
    })?;
    let hash = integrity_hash(&Fingerprint::new(employee.id, date, now, None, false, created_by));

    let record_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO attendance_records (employee_id, date, clock_in, hash, backdated, created_by)
        VALUES ($1, $2, $3, $4, FALSE, $5)
        RETURNING id
        "#,
    )
    .bind(employee.id)
    .bind(date)
    .bind(now)
    .bind(&hash)
    .bind(created_by)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        // A concurrent clock-in won the open-record index
        if is_unique_violation(&e) {
            return ApiError::validation("Already clocked in!");
        }
        error!(error = %e, employee_id = employee.id, "Clock-in failed");
        ApiError::Backend(e)
    })?;

    info!(employee_id = employee.id, record_id, %created_by, "Clocked in");

    Ok(ClockResponse {
        message: format!("{} clocked IN", employee.name),
        record_id,
        hours: None,
    })
}

async fn clock_out_employee(pool: &PgPool, employee: &Employee) -> Result<ClockResponse, ApiError> {
    let open = open_record(pool, employee.id)
        .await?
        .ok_or_else(|| ApiError::validation("Not clocked in!"))?;

    let now = Utc::now();
    if now <= open.clock_in {
        return Err(ApiError::validation("Clock out time must be after clock in time"));
    }

    let mut closed = open.clone();
    closed.clock_out = Some(now);
    let hash = integrity_hash(&Fingerprint::from(&closed));

    let result = sqlx::query(
        r#"
        UPDATE attendance_records
        SET clock_out = $1, hash = $2
        WHERE id = $3 AND clock_out IS NULL
        "#,
    )
    .bind(now)
    .bind(&hash)
    .bind(open.id)
    .execute(pool)
    .await
    .map_err(|e| {
        error!(error = %e, employee_id = employee.id, "Clock-out failed");
        ApiError::Backend(e)
    })?;

    // Someone else closed it between the read and the write
    if result.rows_affected() == 0 {
        return Err(ApiError::validation("Not clocked in!"));
    }

    let hours = elapsed_hours(Some(open.clock_in), Some(now));
    info!(employee_id = employee.id, record_id = open.id, hours, "Clocked out");

    Ok(ClockResponse {
        message: format!("{} clocked OUT, {} worked", employee.name, fmt_hours(hours)),
        record_id: open.id,
        hours: Some(round2(hours)),
    })
}

/// Staff clock action, gated by the workplace geofence.
async fn staff_clock(
    auth: &AuthUser,
    pool: &PgPool,
    config: &Config,
    position: &ClockReq,
    action: ClockAction,
) -> Result<ClockResponse, ApiError> {
    let employee_id = auth.require_employee()?;

    if !valid_coordinates(position.lat, position.lng) {
        return Err(ApiError::validation("Invalid coordinates"));
    }
    if let GeofenceCheck::Outside { distance_m } = config.geofence.check(position.lat, position.lng) {
        info!(employee_id, distance_m, action = action.as_str(), "Clock action outside geofence");
        return Err(ApiError::forbidden(denial_message(distance_m, action.as_str())));
    }

    let employee = fetch_employee(pool, employee_id).await?;
    match action {
        ClockAction::In => clock_in_employee(pool, config, &employee, Role::Staff).await,
        ClockAction::Out => clock_out_employee(pool, &employee).await,
    }
}

/// Clock-in endpoint (staff, geofenced)
#[utoipa::path(
    post,
    path = "/api/attendance/clock-in",
    request_body = ClockReq,
    responses(
        (status = 200, description = "Clocked in", body = ClockResponse),
        (status = 400, description = "Already clocked in", body = Object, example = json!({
            "message": "Already clocked in!"
        })),
        (status = 403, description = "Outside the geofence or no PIN session", body = Object, example = json!({
            "message": "You are 0.42 miles away from the workplace. Clock in denied."
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn clock_in(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    body: web::Json<ClockReq>,
) -> Result<impl Responder, ApiError> {
    let resp = staff_clock(&auth, pool.get_ref(), &config, &body, ClockAction::In).await?;
    Ok(HttpResponse::Ok().json(resp))
}

/// Clock-out endpoint (staff, geofenced)
#[utoipa::path(
    post,
    path = "/api/attendance/clock-out",
    request_body = ClockReq,
    responses(
        (status = 200, description = "Clocked out", body = ClockResponse),
        (status = 400, description = "Not clocked in", body = Object, example = json!({
            "message": "Not clocked in!"
        })),
        (status = 403, description = "Outside the geofence or no PIN session")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn clock_out(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    body: web::Json<ClockReq>,
) -> Result<impl Responder, ApiError> {
    let resp = staff_clock(&auth, pool.get_ref(), &config, &body, ClockAction::Out).await?;
    Ok(HttpResponse::Ok().json(resp))
}

/// Admin clocks an employee in or out by PIN; no geofence
#[utoipa::path(
    post,
    path = "/api/attendance/admin-clock",
    request_body = AdminClockReq,
    responses(
        (status = 200, description = "Clock action recorded", body = ClockResponse),
        (status = 400, description = "Invalid PIN, already clocked in, or not clocked in")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn admin_clock(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    body: web::Json<AdminClockReq>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;
    validate_pin(&body.pin)?;

    let employee = pin_cache::lookup(pool.get_ref(), &body.pin)
        .await
        .map_err(|e| {
            error!(error = %e, "PIN lookup failed");
            ApiError::Backend(e)
        })?
        .ok_or_else(|| ApiError::validation("Invalid PIN"))?;

    let resp = match body.action {
        ClockAction::In => clock_in_employee(pool.get_ref(), &config, &employee, Role::Admin).await?,
        ClockAction::Out => clock_out_employee(pool.get_ref(), &employee).await?,
    };
    Ok(HttpResponse::Ok().json(resp))
}

/// Backdated entry for a past shift (admin)
#[utoipa::path(
    post,
    path = "/api/attendance/backdate",
    request_body = BackdateReq,
    responses(
        (status = 201, description = "Backdated entry added", body = ClockResponse),
        (status = 400, description = "Missing or inverted times"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn create_backdated(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    body: web::Json<BackdateReq>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let (start, end) = parse_shift(&body.clock_in, &body.clock_out)?;
    let employee = fetch_employee(pool.get_ref(), body.employee_id).await?;

    let clock_in = local_instant(pool.get_ref(), &config, body.date, start).await?;
    let clock_out = local_instant(pool.get_ref(), &config, body.date, end).await?;
    // A DST change inside the shift can still invert it
    if clock_out <= clock_in {
        return Err(ApiError::validation("Clock out time must be after clock in time"));
    }

    let hash = integrity_hash(&Fingerprint::new(
        employee.id,
        body.date,
        clock_in,
        Some(clock_out),
        true,
        Role::Admin,
    ));

    let record_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO attendance_records (employee_id, date, clock_in, clock_out, hash, backdated, created_by)
        VALUES ($1, $2, $3, $4, $5, TRUE, 'admin')
        RETURNING id
        "#,
    )
    .bind(employee.id)
    .bind(body.date)
    .bind(clock_in)
    .bind(clock_out)
    .bind(&hash)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id = employee.id, "Failed to add backdated entry");
        ApiError::Backend(e)
    })?;

    let hours = elapsed_hours(Some(clock_in), Some(clock_out));
    info!(employee_id = employee.id, record_id, date = %body.date, "Backdated entry added");

    Ok(HttpResponse::Created().json(ClockResponse {
        message: format!(
            "Backdated entry added: {}, {} on {}",
            employee.name,
            fmt_hours(hours),
            body.date.format("%a %-d %b %Y")
        ),
        record_id,
        hours: Some(round2(hours)),
    }))
}

/// Edit a record's date and times (admin)
#[utoipa::path(
    put,
    path = "/api/attendance/{record_id}",
    params(("record_id", Path, description = "Attendance record ID")),
    request_body = UpdateRecordReq,
    responses(
        (status = 200, description = "Record updated"),
        (status = 400, description = "Inverted or malformed times"),
        (status = 404, description = "Record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn update_record(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    path: web::Path<i64>,
    body: web::Json<UpdateRecordReq>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let record_id = path.into_inner();
    let (start, end) = parse_shift(&body.clock_in, &body.clock_out)?;

    let mut record = sqlx::query_as::<_, AttendanceRecord>("SELECT * FROM attendance_records WHERE id = $1")
        .bind(record_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, record_id, "Failed to fetch record");
            ApiError::Backend(e)
        })?
        .ok_or_else(|| ApiError::not_found("Record not found"))?;

    let clock_in = local_instant(pool.get_ref(), &config, body.date, start).await?;
    let clock_out = local_instant(pool.get_ref(), &config, body.date, end).await?;
    if clock_out <= clock_in {
        return Err(ApiError::validation("Clock out time must be after clock in time"));
    }

    record.date = body.date;
    record.clock_in = clock_in;
    record.clock_out = Some(clock_out);
    let hash = integrity_hash(&Fingerprint::from(&record));

    let result = sqlx::query(
        r#"
        UPDATE attendance_records
        SET date = $1, clock_in = $2, clock_out = $3, hash = $4
        WHERE id = $5
        "#,
    )
    .bind(record.date)
    .bind(clock_in)
    .bind(clock_out)
    .bind(&hash)
    .bind(record_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, record_id, "Failed to update record");
        ApiError::Backend(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Record not found"));
    }

    info!(record_id, "Record updated");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Record updated successfully"
    })))
}

#[utoipa::path(
    delete,
    path = "/api/attendance/{record_id}",
    params(("record_id", Path, description = "Attendance record ID")),
    responses(
        (status = 200, description = "Record deleted"),
        (status = 404, description = "Record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn delete_record(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let record_id = path.into_inner();
    let result = sqlx::query("DELETE FROM attendance_records WHERE id = $1")
        .bind(record_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, record_id, "Failed to delete record");
            ApiError::Backend(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Record not found"));
    }

    info!(record_id, "Record deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Record deleted"
    })))
}

/// Records for a month, newest first. Staff only see their own.
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(RecordQuery),
    responses(
        (status = 200, body = [RecordView]),
        (status = 403, description = "Staff asking for someone else")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_records(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    query: web::Query<RecordQuery>,
) -> Result<impl Responder, ApiError> {
    let employee_id = auth.scope_employee(query.employee_id)?;

    let today = local_today(pool.get_ref(), &config.timezone).await.map_err(|e| {
        error!(error = %e, "Failed to read local date");
        ApiError::Backend(e)
    })?;
    let range = month_range(query.year, query.month, current_month(today))?;
    let cutoff = retention_cutoff(today, config.retention_months);

    let rows = sqlx::query_as::<_, RecordRow>(
        r#"
        SELECT r.*, e.name AS employee_name, e.department
        FROM attendance_records r
        JOIN employees e ON e.id = r.employee_id
        WHERE ($1::bigint IS NULL OR r.employee_id = $1)
          AND r.date >= $2 AND r.date < $3 AND r.date >= $4
        ORDER BY r.clock_in DESC
        "#,
    )
    .bind(employee_id)
    .bind(range.start)
    .bind(range.end)
    .bind(cutoff)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch attendance records");
        ApiError::Backend(e)
    })?;

    let records: Vec<AttendanceRecord> = rows.iter().map(|r| r.record.clone()).collect();
    let labels = shift_labels(&records);
    let views: Vec<RecordView> = rows.into_iter().map(|row| to_view(row, &labels)).collect();

    Ok(HttpResponse::Ok().json(views))
}

/// Hours, days worked and clocked-in state for one employee and month
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(RecordQuery),
    responses(
        (status = 200, body = MonthSummaryResponse),
        (status = 400, description = "Admin did not name an employee")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn month_summary(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    query: web::Query<RecordQuery>,
) -> Result<impl Responder, ApiError> {
    let employee_id = auth
        .scope_employee(query.employee_id)?
        .ok_or_else(|| ApiError::validation("employee_id is required"))?;

    let today = local_today(pool.get_ref(), &config.timezone).await.map_err(|e| {
        error!(error = %e, "Failed to read local date");
        ApiError::Backend(e)
    })?;
    let range = month_range(query.year, query.month, current_month(today))?;

    // The open session is fetched whatever its date so clocked_in is accurate
    let records = sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT * FROM attendance_records
        WHERE employee_id = $1
          AND ((date >= $2 AND date < $3) OR clock_out IS NULL)
        "#,
    )
    .bind(employee_id)
    .bind(range.start)
    .bind(range.end)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to fetch month records");
        ApiError::Backend(e)
    })?;

    let is_current = range.contains(today);
    let totals = month_totals(&records, Utc::now(), is_current);

    Ok(HttpResponse::Ok().json(MonthSummaryResponse {
        employee_id,
        year: range.year,
        month: range.month,
        totals,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_times_parse() {
        let (a, b) = parse_shift("09:00", " 17:30 ").unwrap();
        assert_eq!(a, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(b, NaiveTime::from_hms_opt(17, 30, 0).unwrap());
    }

    #[test]
    fn clock_out_must_follow_clock_in() {
        for (a, b) in [("17:00", "09:00"), ("09:00", "09:00")] {
            match parse_shift(a, b) {
                Err(ApiError::Validation(msg)) => {
                    assert_eq!(msg, "Clock out time must be after clock in time")
                }
                other => panic!("unexpected {:?}", other.map(|_| ())),
            }
        }
    }

    #[test]
    fn malformed_times_are_rejected() {
        assert!(parse_shift("", "17:00").is_err());
        assert!(parse_shift("9am", "17:00").is_err());
        assert!(parse_shift("09:00", "25:00").is_err());
    }

    #[test]
    fn clock_action_deserializes_lowercase() {
        let req: AdminClockReq = serde_json::from_str(r#"{"pin":"1234","action":"out"}"#).unwrap();
        assert_eq!(req.action, ClockAction::Out);
    }

    mod handlers {
        use super::super::*;
        use crate::auth::jwt::generate_access_token;
        use actix_web::{App, http::StatusCode, test};
        use sqlx::postgres::PgPoolOptions;
        use std::time::Duration;

        // Nothing listens here; any query fails fast.
        fn unreachable_pool() -> PgPool {
            PgPoolOptions::new()
                .acquire_timeout(Duration::from_millis(300))
                .connect_lazy("postgres://staff_clock@127.0.0.1:1/staff_clock_test")
                .unwrap()
        }

        fn token(role: Role, employee_id: Option<i64>) -> String {
            let config = Config::for_tests();
            generate_access_token(role, employee_id, &config.jwt_secret, 60).unwrap()
        }

        async fn send(req: test::TestRequest) -> (StatusCode, serde_json::Value) {
            let app = test::init_service(
                App::new()
                    .app_data(web::Data::new(unreachable_pool()))
                    .app_data(web::Data::new(Config::for_tests()))
                    .route("/api/attendance", web::get().to(list_records))
                    .route("/api/attendance/clock-in", web::post().to(clock_in))
                    .route("/api/attendance/clock-out", web::post().to(clock_out)),
            )
            .await;
            let resp = test::call_service(&app, req.to_request()).await;
            let status = resp.status();
            let body: serde_json::Value = test::read_body_json(resp).await;
            (status, body)
        }

        fn clock(action: &str, token: String, lat: f64, lng: f64) -> test::TestRequest {
            test::TestRequest::post()
                .uri(&format!("/api/attendance/clock-{}", action))
                .insert_header(("Authorization", format!("Bearer {}", token)))
                .set_json(serde_json::json!({ "lat": lat, "lng": lng }))
        }

        #[actix_web::test]
        async fn clock_in_far_from_work_is_denied() {
            // 0.01 degrees north of the workplace, about 1.11 km
            let (status, body) = send(clock("in", token(Role::Staff, Some(1)), 51.627404, -0.311809)).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(body["message"], "You are 0.69 miles away from the workplace. Clock in denied.");
        }

        #[actix_web::test]
        async fn clock_out_far_from_work_is_denied() {
            let (status, body) = send(clock("out", token(Role::Staff, Some(1)), 51.627404, -0.311809)).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(body["message"], "You are 0.69 miles away from the workplace. Clock out denied.");
        }

        #[actix_web::test]
        async fn out_of_range_coordinates_are_rejected() {
            let (status, body) = send(clock("in", token(Role::Staff, Some(1)), 91.0, 0.0)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["message"], "Invalid coordinates");
        }

        #[actix_web::test]
        async fn staff_without_pin_session_cannot_clock() {
            let (status, body) = send(clock("in", token(Role::Staff, None), 51.617404, -0.311809)).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(body["message"], "Enter your PIN first");
        }

        #[actix_web::test]
        async fn admin_cannot_use_staff_clock() {
            let (status, body) = send(clock("in", token(Role::Admin, None), 51.617404, -0.311809)).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(body["message"], "Staff only");
        }

        #[actix_web::test]
        async fn store_failure_is_a_generic_500() {
            let req = test::TestRequest::get()
                .uri("/api/attendance")
                .insert_header(("Authorization", format!("Bearer {}", token(Role::Admin, None))));
            let (status, body) = send(req).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body["message"], "Internal Server Error");
        }
    }

    #[test]
    fn views_flag_tampered_records() {
        use chrono::TimeZone;

        let clock_in = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let mut record = AttendanceRecord {
            id: 4,
            employee_id: 2,
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            clock_in,
            clock_out: Some(clock_in + chrono::Duration::minutes(510)),
            hash: String::new(),
            backdated: false,
            created_by: Role::Staff,
        };
        record.hash = integrity_hash(&Fingerprint::from(&record));

        let row = |record: AttendanceRecord| RecordRow {
            record,
            employee_name: "Jane Doe".into(),
            department: "Kitchen".into(),
        };
        let labels = std::collections::HashMap::new();

        let view = to_view(row(record.clone()), &labels);
        assert!(view.verified);
        assert_eq!(view.hours, 8.5);
        assert_eq!(view.hours_display, "8h 30m");

        record.clock_out = Some(clock_in + chrono::Duration::hours(12));
        assert!(!to_view(row(record), &labels).verified);
    }
}
