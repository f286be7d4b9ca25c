use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

use crate::attendance::aggregate::{
    DayBuckets, EmployeeStats, MonthlySummary, TodaySnapshot, TrendPoint,
};
use crate::attendance::service::TodayStatus;
use crate::attendance::store::AttendanceFilter;
use crate::auth::handlers::{ChangePasswordReq, CreateEmployeeReq, ProfileResponse};
use crate::model::attendance::{
    AttendanceDetail, AttendanceRecord, AttendanceStatus, DepartmentCount, TodayState,
};
use crate::models::{LoginReq, RegisterReq};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Tracker API",
        version = "1.0.0",
        description = r#"
## Employee Attendance Tracker

Employees check in and out once per business day; managers see aggregated
attendance and export reports.

### 🔹 Key Features
- **Check-in / Check-out**
  - One record per employee per day, status derived from the time of day
- **History & Summaries**
  - Per-month history and status rollups for each employee
- **Manager Views**
  - Team summaries, daily headcount, weekly trend, department distribution
- **CSV Export**
  - Filterable attendance report download

### 🔐 Security
All attendance and dashboard endpoints require **JWT Bearer authentication**;
manager views additionally require the manager role.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::me,
        crate::auth::handlers::create_employee,
        crate::auth::handlers::change_password,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::my_history,
        crate::api::attendance::my_summary,
        crate::api::attendance::today,
        crate::api::attendance::list_attendance,
        crate::api::attendance::team_summary,
        crate::api::attendance::team_today,
        crate::api::attendance::export_attendance,

        crate::api::dashboard::employee_stats,
        crate::api::dashboard::manager_stats
    ),
    components(
        schemas(
            RegisterReq,
            LoginReq,
            ProfileResponse,
            CreateEmployeeReq,
            ChangePasswordReq,
            AttendanceRecord,
            AttendanceStatus,
            AttendanceDetail,
            AttendanceFilter,
            TodayState,
            TodayStatus,
            MonthlySummary,
            DayBuckets,
            TrendPoint,
            TodaySnapshot,
            EmployeeStats,
            DepartmentCount
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Accounts and sessions"),
        (name = "Attendance", description = "Check-in/check-out and attendance views"),
        (name = "Dashboard", description = "Employee and manager dashboards"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl utoipa::Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
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
}
