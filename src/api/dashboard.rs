use actix_web::{HttpResponse, Responder, web};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;

use crate::attendance::aggregate::AggregationService;
use crate::attendance::clock::Clock;
use crate::attendance::store::MySqlStore;
use crate::auth::auth::AuthUser;

fn aggregation(pool: &web::Data<MySqlPool>) -> AggregationService<MySqlStore, MySqlStore> {
    let store = MySqlStore::new(pool.get_ref().clone());
    AggregationService::new(store.clone(), store)
}

/// Employee dashboard: today's state, current-month rollup, recent
/// activity
#[utoipa::path(
    get,
    path = "/api/dashboard/employee",
    responses(
        (status = 200, description = "Employee dashboard stats"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn employee_stats(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
) -> actix_web::Result<impl Responder> {
    match aggregation(&pool)
        .employee_stats(auth.user_id, clock.now())
        .await
    {
        Ok(stats) => Ok(HttpResponse::Ok().json(stats)),
        Err(err) => {
            error!(error = %err, user_id = auth.user_id, "Employee dashboard failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// Manager dashboard: today's headcount, department distribution,
/// weekly trend
#[utoipa::path(
    get,
    path = "/api/dashboard/manager",
    responses(
        (status = 200, description = "Manager dashboard stats"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn manager_stats(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    let aggregation = aggregation(&pool);
    let now = clock.now();

    let result = async {
        let snapshot = aggregation.today_snapshot(now).await?;
        let department_stats = aggregation.department_distribution().await?;
        let weekly_trend = aggregation.weekly_trend(now.date()).await?;
        Ok::<_, crate::attendance::service::AttendanceError>((
            snapshot,
            department_stats,
            weekly_trend,
        ))
    }
    .await;

    match result {
        Ok((snapshot, department_stats, weekly_trend)) => Ok(HttpResponse::Ok().json(json!({
            "total_employees": snapshot.total_employees,
            "today": {
                "present": snapshot.present,
                "absent": snapshot.absent,
                "late": snapshot.late,
            },
            "department_stats": department_stats,
            "weekly_trend": weekly_trend,
        }))),
        Err(err) => {
            error!(error = %err, "Manager dashboard failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}
