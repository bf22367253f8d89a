use crate::api::MonthQuery;
use crate::api::attendance::{
    AdminClockReq, BackdateReq, ClockAction, ClockReq, ClockResponse, MonthSummaryResponse, RecordQuery,
    RecordView, UpdateRecordReq,
};
use crate::api::employee::{CreateEmployee, EmployeeListItem, EmployeeListResponse, EmployeeQuery, UpdateEmployee};
use crate::api::payment::{PaidHistory, PaymentEntry, RecordPayment};
use crate::api::payroll::{SalaryReport, SalaryRow};
use crate::auth::handlers::{LoginResponse, PinSessionResponse};
use crate::calc::{pay::SalaryBreakdown, summary::MonthTotals};
use crate::model::employee::{Employee, PayType};
use crate::model::role::Role;
use crate::models::{LoginReqDto, PinReqDto};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Staff Clock API",
        version = "1.0.0",
        description = r#"
## Staff time & attendance

Clock-in/clock-out tracking for a single workplace, with payroll on top.

### Key Features
- **Employees**: name, department, 4-digit PIN, pay type and hourly rates
- **Attendance**: geofenced staff clocking, admin clocking by PIN, backdated entries and edits
- **Payroll**: monthly salary split into bank (first 67 h) and cash pay, with payments tracked per month
- **Export**: CSV downloads for attendance and salary

### Security
Log in with the shared **staff** or **admin** password to get a JWT.
Staff tokens must then be bound to an employee via `POST /auth/pin` before clocking.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::pin_session,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::attendance::clock_in,
        crate::api::attendance::clock_out,
        crate::api::attendance::admin_clock,
        crate::api::attendance::create_backdated,
        crate::api::attendance::update_record,
        crate::api::attendance::delete_record,
        crate::api::attendance::list_records,
        crate::api::attendance::month_summary,

        crate::api::payroll::list_payroll,
        crate::api::payroll::get_payroll,

        crate::api::payment::record_payment,
        crate::api::payment::get_paid_history,

        crate::api::export::export_attendance,
        crate::api::export::export_all_attendance,
        crate::api::export::export_salary
    ),
    components(
        schemas(
            Role,
            LoginReqDto,
            LoginResponse,
            PinReqDto,
            PinSessionResponse,
            PayType,
            Employee,
            CreateEmployee,
            UpdateEmployee,
            EmployeeQuery,
            EmployeeListItem,
            EmployeeListResponse,
            ClockAction,
            ClockReq,
            AdminClockReq,
            BackdateReq,
            UpdateRecordReq,
            RecordQuery,
            ClockResponse,
            RecordView,
            MonthTotals,
            MonthSummaryResponse,
            MonthQuery,
            SalaryBreakdown,
            SalaryRow,
            SalaryReport,
            RecordPayment,
            PaymentEntry,
            PaidHistory
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Role login and PIN sessions"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Attendance", description = "Clocking, backdating and attendance records"),
        (name = "Payroll", description = "Monthly salary calculation"),
        (name = "Payment", description = "Amounts paid per month"),
        (name = "Export", description = "CSV downloads"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/auth/login",
            "/auth/pin",
            "/api/employees",
            "/api/employees/{employee_id}",
            "/api/attendance",
            "/api/attendance/summary",
            "/api/attendance/clock-in",
            "/api/attendance/{record_id}",
            "/api/payroll/{employee_id}",
            "/api/payments",
            "/api/export/salary",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
