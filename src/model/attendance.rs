use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Closed set of per-day attendance outcomes. Stored in the `status`
/// column in its kebab-case form (`half-day`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum_macros::Display,
    strum_macros::EnumString,
    ToSchema,
)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AttendanceStatus {
    Present,
    Late,
    HalfDay,
    Leave,
    Absent,
}

impl AttendanceStatus {
    /// Statuses that count as "showed up" in the manager's daily headcount.
    pub fn is_present_equivalent(self) -> bool {
        matches!(
            self,
            AttendanceStatus::Present | AttendanceStatus::Late | AttendanceStatus::HalfDay
        )
    }
}

/// One row per (user, business day). `check_out_time` and the final
/// status are filled in by check-out; `total_hours` stays 0 until then.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "user_id": 7,
    "date": "2026-08-03",
    "check_in_time": "2026-08-03T09:45:00",
    "check_out_time": "2026-08-03T17:30:00",
    "status": "present",
    "total_hours": 7.75
}))]
pub struct AttendanceRecord {
    pub id: u64,
    pub user_id: u64,
    pub date: NaiveDate,
    pub check_in_time: Option<NaiveDateTime>,
    pub check_out_time: Option<NaiveDateTime>,
    pub status: AttendanceStatus,
    pub total_hours: f64,
}

/// Insert payload for a fresh check-in row.
#[derive(Debug, Clone)]
pub struct NewAttendanceRecord {
    pub user_id: u64,
    pub date: NaiveDate,
    pub check_in_time: NaiveDateTime,
    pub status: AttendanceStatus,
}

/// Where the current business day stands for one employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum TodayState {
    NotCheckedIn,
    CheckedIn,
    CheckedOut,
}

/// Attendance row joined with the employee's directory fields, for
/// manager listings and the CSV export.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceDetail {
    pub employee_code: String,
    pub name: String,
    pub department: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub check_in_time: Option<NaiveDateTime>,
    pub check_out_time: Option<NaiveDateTime>,
    pub total_hours: f64,
}

/// Group-by-date count of attendance records, any status.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

/// Active-employee headcount for one department.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct DepartmentCount {
    pub department: String,
    pub count: i64,
}
