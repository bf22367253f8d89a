use crate::{
    auth::auth::AuthUser,
    calc::pay::PayPolicy,
    config::Config,
    error::{ApiError, is_unique_violation},
    model::employee::{Employee, PayType},
    utils::pin_cache,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "Kitchen")]
    pub department: Option<String>,
    #[schema(example = "4821")]
    pub pin: String,
    pub pay_type: Option<PayType>,
    #[schema(example = 12.21)]
    pub on_hour_rate: Option<f64>,
    #[schema(example = 12.21)]
    pub off_hour_rate: Option<f64>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateEmployee {
    pub name: Option<String>,
    pub department: Option<String>,
    pub pin: Option<String>,
    pub pay_type: Option<PayType>,
    pub on_hour_rate: Option<f64>,
    pub off_hour_rate: Option<f64>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Case-insensitive match on name or department
    pub search: Option<String>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct EmployeeListItem {
    pub id: i64,
    pub name: String,
    pub department: String,
    pub pin: String,
    pub pay_type: PayType,
    pub on_hour_rate: f64,
    pub off_hour_rate: f64,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<Utc>,
    /// Has an open attendance record right now
    pub clocked_in: bool,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<EmployeeListItem>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 50)]
    pub per_page: u32,
    #[schema(example = 12)]
    pub total: i64,
}

/// Fields of an employee after defaults are applied, ready to store.
#[derive(Debug, PartialEq)]
struct EmployeeFields {
    name: String,
    department: String,
    pin: String,
    pay_type: PayType,
    on_hour_rate: f64,
    off_hour_rate: f64,
}

pub fn validate_pin(pin: &str) -> Result<(), ApiError> {
    if pin.len() == 4 && pin.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ApiError::validation("PIN must be exactly 4 digits"))
    }
}

fn validate_rate(rate: Option<f64>, policy: &PayPolicy) -> Result<f64, ApiError> {
    match rate {
        Some(r) if !r.is_finite() || r < 0.0 => Err(ApiError::validation("Hourly rates must be positive numbers")),
        Some(r) => Ok(policy.effective_rate(r)),
        None => Ok(policy.default_rate),
    }
}

impl EmployeeFields {
    fn from_create(payload: &CreateEmployee, policy: &PayPolicy) -> Result<Self, ApiError> {
        let name = payload.name.trim();
        if name.is_empty() || payload.pin.is_empty() {
            return Err(ApiError::validation("Enter name and 4-digit PIN"));
        }
        validate_pin(&payload.pin)?;

        let department = payload
            .department
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or("General");

        Ok(Self {
            name: name.to_string(),
            department: department.to_string(),
            pin: payload.pin.clone(),
            pay_type: payload.pay_type.unwrap_or_default(),
            on_hour_rate: validate_rate(payload.on_hour_rate, policy)?,
            off_hour_rate: validate_rate(payload.off_hour_rate, policy)?,
        })
    }

    fn merge(current: Employee, body: &UpdateEmployee, policy: &PayPolicy) -> Result<Self, ApiError> {
        let name = body.name.as_deref().map(str::trim).unwrap_or(&current.name);
        if name.is_empty() {
            return Err(ApiError::validation("Name and 4-digit PIN are required"));
        }
        let pin = body.pin.clone().unwrap_or(current.pin);
        validate_pin(&pin)?;

        Ok(Self {
            name: name.to_string(),
            department: body
                .department
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .unwrap_or(current.department),
            pin,
            pay_type: body.pay_type.unwrap_or(current.pay_type),
            on_hour_rate: validate_rate(body.on_hour_rate.or(Some(current.on_hour_rate)), policy)?,
            off_hour_rate: validate_rate(body.off_hour_rate.or(Some(current.off_hour_rate)), policy)?,
        })
    }
}

/// Clamped page, page size and row offset.
fn page_window(page: Option<u32>, per_page: Option<u32>) -> (u32, u32, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(50).clamp(1, 200);
    let offset = (page as i64 - 1) * per_page as i64;
    (page, per_page, offset)
}

async fn pin_in_use(pool: &PgPool, pin: &str, exclude_id: Option<i64>) -> Result<bool, ApiError> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM employees WHERE pin = $1 AND id IS DISTINCT FROM $2)",
    )
    .bind(pin)
    .bind(exclude_id)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to check PIN");
        ApiError::Backend(e)
    })
}

pub async fn fetch_employee(pool: &PgPool, employee_id: i64) -> Result<Employee, ApiError> {
    sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = $1")
        .bind(employee_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to fetch employee");
            ApiError::Backend(e)
        })?
        .ok_or_else(|| ApiError::not_found("Employee not found"))
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Missing name or malformed PIN"),
        (status = 409, description = "PIN already in use", body = Object, example = json!({
            "message": "PIN already in use"
        }))
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateEmployee>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let fields = EmployeeFields::from_create(&payload, &config.pay_policy)?;

    if pin_in_use(pool.get_ref(), &fields.pin, None).await? {
        return Err(ApiError::conflict("PIN already in use"));
    }

    let employee = sqlx::query_as::<_, Employee>(
        r#"
        INSERT INTO employees (name, department, pin, pay_type, on_hour_rate, off_hour_rate)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&fields.name)
    .bind(&fields.department)
    .bind(&fields.pin)
    .bind(fields.pay_type)
    .bind(fields.on_hour_rate)
    .bind(fields.off_hour_rate)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        // Lost a race with another admin for the same PIN
        if is_unique_violation(&e) {
            return ApiError::conflict("PIN already in use");
        }
        error!(error = %e, "Failed to create employee");
        ApiError::Backend(e)
    })?;

    pin_cache::invalidate();
    info!(employee_id = employee.id, "Employee created");

    Ok(HttpResponse::Created().json(employee))
}

#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<EmployeeQuery>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let (page, per_page, offset) = page_window(query.page, query.per_page);
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s));

    debug!(page, per_page, search = ?search, "Listing employees");

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM employees WHERE $1::text IS NULL OR name ILIKE $1 OR department ILIKE $1",
    )
    .bind(&search)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to count employees");
        ApiError::Backend(e)
    })?;

    let data = sqlx::query_as::<_, EmployeeListItem>(
        r#"
        SELECT e.*,
               EXISTS(
                   SELECT 1 FROM attendance_records r
                   WHERE r.employee_id = e.id AND r.clock_out IS NULL
               ) AS clocked_in
        FROM employees e
        WHERE $1::text IS NULL OR e.name ILIKE $1 OR e.department ILIKE $1
        ORDER BY e.created_at ASC, e.id ASC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(&search)
    .bind(per_page as i64)
    .bind(offset)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch employees");
        ApiError::Backend(e)
    })?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let employee = fetch_employee(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Update Employee
///
/// Rate changes apply to salary calculations from now on, including months
/// already worked.
#[utoipa::path(
    put,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "PIN already in use by another employee")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    path: web::Path<i64>,
    body: web::Json<UpdateEmployee>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let employee_id = path.into_inner();
    let current = fetch_employee(pool.get_ref(), employee_id).await?;
    let fields = EmployeeFields::merge(current, &body, &config.pay_policy)?;

    if pin_in_use(pool.get_ref(), &fields.pin, Some(employee_id)).await? {
        return Err(ApiError::conflict("PIN already in use by another employee"));
    }

    let employee = sqlx::query_as::<_, Employee>(
        r#"
        UPDATE employees
        SET name = $1, department = $2, pin = $3, pay_type = $4,
            on_hour_rate = $5, off_hour_rate = $6
        WHERE id = $7
        RETURNING *
        "#,
    )
    .bind(&fields.name)
    .bind(&fields.department)
    .bind(&fields.pin)
    .bind(fields.pay_type)
    .bind(fields.on_hour_rate)
    .bind(fields.off_hour_rate)
    .bind(employee_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            return ApiError::conflict("PIN already in use by another employee");
        }
        error!(error = %e, employee_id, "Failed to update employee");
        ApiError::Backend(e)
    })?
    .ok_or_else(|| ApiError::not_found("Employee not found"))?;

    pin_cache::invalidate();
    info!(employee_id, "Employee updated");

    Ok(HttpResponse::Ok().json(employee))
}

/// Delete Employee, together with all of their attendance records
#[utoipa::path(
    delete,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Jane Doe removed"
        })),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let employee_id = path.into_inner();

    let name = sqlx::query_scalar::<_, String>("DELETE FROM employees WHERE id = $1 RETURNING name")
        .bind(employee_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to delete employee");
            ApiError::Backend(e)
        })?
        .ok_or_else(|| ApiError::not_found("Employee not found"))?;

    pin_cache::invalidate();
    info!(employee_id, "Employee deleted");

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("{} removed", name)
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(name: &str, pin: &str) -> CreateEmployee {
        CreateEmployee {
            name: name.into(),
            department: None,
            pin: pin.into(),
            pay_type: None,
            on_hour_rate: None,
            off_hour_rate: None,
        }
    }

    fn existing() -> Employee {
        Employee {
            id: 1,
            name: "Jane Doe".into(),
            department: "Kitchen".into(),
            pin: "1234".into(),
            pay_type: PayType::BankCash,
            on_hour_rate: 13.0,
            off_hour_rate: 11.0,
            created_at: Utc::now(),
        }
    }

    fn no_changes() -> UpdateEmployee {
        UpdateEmployee {
            name: None,
            department: None,
            pin: None,
            pay_type: None,
            on_hour_rate: None,
            off_hour_rate: None,
        }
    }

    #[test]
    fn pin_must_be_four_digits() {
        assert!(validate_pin("0042").is_ok());
        for bad in ["", "123", "12345", "12a4", "١٢٣٤"] {
            assert!(validate_pin(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn paging_is_clamped() {
        assert_eq!(page_window(None, None), (1, 50, 0));
        assert_eq!(page_window(Some(0), Some(0)), (1, 1, 0));
        assert_eq!(page_window(Some(3), Some(500)), (3, 200, 400));
    }

    #[test]
    fn huge_page_does_not_overflow() {
        let (page, per_page, offset) = page_window(Some(u32::MAX), Some(200));
        assert_eq!((page, per_page), (u32::MAX, 200));
        assert_eq!(offset, (u32::MAX as i64 - 1) * 200);
    }

    #[test]
    fn create_applies_defaults() {
        let fields = EmployeeFields::from_create(&create(" Sam ", "0001"), &PayPolicy::default()).unwrap();
        assert_eq!(fields.name, "Sam");
        assert_eq!(fields.department, "General");
        assert_eq!(fields.pay_type, PayType::BankCash);
        assert_eq!(fields.on_hour_rate, 12.21);
        assert_eq!(fields.off_hour_rate, 12.21);
    }

    #[test]
    fn create_requires_name_and_pin() {
        let policy = PayPolicy::default();
        assert!(matches!(
            EmployeeFields::from_create(&create("  ", "1234"), &policy),
            Err(ApiError::Validation(_))
        ));
        assert!(EmployeeFields::from_create(&create("Sam", ""), &policy).is_err());
        assert!(EmployeeFields::from_create(&create("Sam", "99"), &policy).is_err());
    }

    #[test]
    fn negative_rates_are_rejected() {
        let mut payload = create("Sam", "1111");
        payload.on_hour_rate = Some(-3.0);
        assert!(EmployeeFields::from_create(&payload, &PayPolicy::default()).is_err());
    }

    #[test]
    fn merge_keeps_unspecified_fields() {
        let mut body = no_changes();
        body.pin = Some("9876".into());
        let fields = EmployeeFields::merge(existing(), &body, &PayPolicy::default()).unwrap();
        assert_eq!(fields.pin, "9876");
        assert_eq!(fields.name, "Jane Doe");
        assert_eq!(fields.department, "Kitchen");
        assert_eq!(fields.on_hour_rate, 13.0);
        assert_eq!(fields.off_hour_rate, 11.0);
    }

    #[test]
    fn merge_rejects_bad_pin() {
        let mut body = no_changes();
        body.pin = Some("98".into());
        assert!(EmployeeFields::merge(existing(), &body, &PayPolicy::default()).is_err());
    }
}
