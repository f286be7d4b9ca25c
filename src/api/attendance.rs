use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::IntoParams;

use crate::attendance::aggregate::AggregationService;
use crate::attendance::clock::Clock;
use crate::attendance::service::AttendanceService;
use crate::attendance::store::{AttendanceFilter, AttendanceStore, MySqlStore};
use crate::auth::auth::AuthUser;

#[derive(Debug, Deserialize, IntoParams)]
pub struct MonthQuery {
    /// Month number, 01-12
    pub month: u32,
    /// Four-digit year
    pub year: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RangeQuery {
    /// Range start, inclusive
    pub from: NaiveDate,
    /// Range end, inclusive
    pub to: NaiveDate,
}

fn service(pool: &web::Data<MySqlPool>) -> AttendanceService<MySqlStore> {
    AttendanceService::new(MySqlStore::new(pool.get_ref().clone()))
}

fn aggregation(pool: &web::Data<MySqlPool>) -> AggregationService<MySqlStore, MySqlStore> {
    let store = MySqlStore::new(pool.get_ref().clone());
    AggregationService::new(store.clone(), store)
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    responses(
        (status = 201, description = "Checked in, record created"),
        (status = 400, description = "Already checked in, or window closed", body = Object, example = json!({
            "message": "Already checked in for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
) -> actix_web::Result<impl Responder> {
    match service(&pool).check_in(auth.user_id, clock.now()).await {
        Ok(record) => Ok(HttpResponse::Created().json(record)),
        Err(err) if err.is_client_error() => {
            Ok(HttpResponse::BadRequest().json(json!({ "message": err.to_string() })))
        }
        Err(err) => {
            error!(error = %err, user_id = auth.user_id, "Check-in failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    responses(
        (status = 200, description = "Checked out, record updated"),
        (status = 400, description = "No check-in, or already checked out", body = Object, example = json!({
            "message": "No check-in record found for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
) -> actix_web::Result<impl Responder> {
    match service(&pool).check_out(auth.user_id, clock.now()).await {
        Ok(record) => Ok(HttpResponse::Ok().json(record)),
        Err(err) if err.is_client_error() => {
            Ok(HttpResponse::BadRequest().json(json!({ "message": err.to_string() })))
        }
        Err(err) => {
            error!(error = %err, user_id = auth.user_id, "Check-out failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// Caller's records for one month, newest first
#[utoipa::path(
    get,
    path = "/api/attendance/my-history",
    params(MonthQuery),
    responses(
        (status = 200, description = "Attendance records"),
        (status = 400, description = "Invalid month"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn my_history(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<MonthQuery>,
) -> actix_web::Result<impl Responder> {
    match service(&pool)
        .history(auth.user_id, query.month, query.year)
        .await
    {
        Ok(records) => Ok(HttpResponse::Ok().json(records)),
        Err(err) if err.is_client_error() => {
            Ok(HttpResponse::BadRequest().json(json!({ "message": err.to_string() })))
        }
        Err(err) => {
            error!(error = %err, user_id = auth.user_id, "History fetch failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// Caller's month rollup
#[utoipa::path(
    get,
    path = "/api/attendance/my-summary",
    params(MonthQuery),
    responses(
        (status = 200, description = "Monthly summary"),
        (status = 400, description = "Invalid month"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn my_summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<MonthQuery>,
) -> actix_web::Result<impl Responder> {
    match aggregation(&pool)
        .monthly_summary(auth.user_id, query.month, query.year)
        .await
    {
        Ok(summary) => Ok(HttpResponse::Ok().json(summary)),
        Err(err) if err.is_client_error() => {
            Ok(HttpResponse::BadRequest().json(json!({ "message": err.to_string() })))
        }
        Err(err) => {
            error!(error = %err, user_id = auth.user_id, "Summary failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// Where the caller's business day stands
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's state plus the record when present"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
) -> actix_web::Result<impl Responder> {
    match service(&pool).today(auth.user_id, clock.now()).await {
        Ok(status) => Ok(HttpResponse::Ok().json(status)),
        Err(err) => {
            error!(error = %err, user_id = auth.user_id, "Today-status fetch failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// Manager listing across employees. Filters AND-combine; an unknown
/// employee code yields an empty list rather than an error.
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceFilter),
    responses(
        (status = 200, description = "Detailed records, newest first"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    let store = MySqlStore::new(pool.get_ref().clone());
    let rows = store.find_detailed(&query).await.map_err(|e| {
        error!(error = %e, "Attendance listing failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Per-date status buckets for the manager's team view
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(RangeQuery),
    responses(
        (status = 200, description = "Status buckets keyed by date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn team_summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<RangeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    match aggregation(&pool).team_summary(query.from, query.to).await {
        Ok(summary) => Ok(HttpResponse::Ok().json(summary)),
        Err(err) => {
            error!(error = %err, "Team summary failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// Detailed records for the current day, manager view
#[utoipa::path(
    get,
    path = "/api/attendance/today-status",
    responses(
        (status = 200, description = "Today's detailed records"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn team_today(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    let filter = AttendanceFilter {
        date: Some(clock.now().date()),
        ..Default::default()
    };
    let store = MySqlStore::new(pool.get_ref().clone());
    let rows = store.find_detailed(&filter).await.map_err(|e| {
        error!(error = %e, "Today-status listing failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(rows))
}

const EXPORT_HEADER: [&str; 8] = [
    "Employee ID",
    "Name",
    "Department",
    "Date",
    "Status",
    "Check In",
    "Check Out",
    "Total Hours",
];

fn fmt_clock_time(t: Option<NaiveDateTime>) -> String {
    match t {
        Some(t) => t.format("%-I:%M:%S %p").to_string(),
        None => "-".to_string(),
    }
}

/// CSV report download
#[utoipa::path(
    get,
    path = "/api/attendance/export",
    params(AttendanceFilter),
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn export_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    let store = MySqlStore::new(pool.get_ref().clone());
    let rows = store.find_detailed(&query).await.map_err(|e| {
        error!(error = %e, "Export query failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(EXPORT_HEADER)
        .map_err(actix_web::error::ErrorInternalServerError)?;
    for row in &rows {
        writer
            .write_record([
                row.employee_code.as_str(),
                row.name.as_str(),
                row.department.as_str(),
                &row.date.to_string(),
                &row.status.to_string(),
                &fmt_clock_time(row.check_in_time),
                &fmt_clock_time(row.check_out_time),
                &row.total_hours.to_string(),
            ])
            .map_err(actix_web::error::ErrorInternalServerError)?;
    }
    let body = writer
        .into_inner()
        .map_err(actix_web::error::ErrorInternalServerError)?;

    let label = |d: Option<NaiveDate>| d.map_or_else(|| "all".to_string(), |d| d.to_string());
    let filename = format!(
        "attendance_report_{}_{}.csv",
        label(query.from),
        label(query.to)
    );

    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(body))
}
