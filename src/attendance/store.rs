use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::model::attendance::{
    AttendanceDetail, AttendanceRecord, AttendanceStatus, DailyCount, DepartmentCount,
    NewAttendanceRecord,
};
use crate::model::role::Role;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique-key violation on (user_id, date). The service layer turns
    /// this into "already checked in" when a concurrent insert wins.
    #[error("duplicate key")]
    Duplicate,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Manager-side record filter. Every field is AND-combined; unknown query
/// parameters are rejected at deserialization instead of silently ignored.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AttendanceFilter {
    /// Exact business day
    pub date: Option<NaiveDate>,
    /// Employee code, e.g. EMP007
    pub employee_id: Option<String>,
    pub status: Option<AttendanceStatus>,
    pub department: Option<String>,
    /// Range start, inclusive
    pub from: Option<NaiveDate>,
    /// Range end, inclusive
    pub to: Option<NaiveDate>,
}

/// Key-indexed record store for attendance rows. At most one row per
/// (user, date); `create` surfaces the constraint as `Duplicate` and
/// `close_out` only writes while `check_out_time` is still unset.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn find_one(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    async fn create(&self, new: NewAttendanceRecord) -> Result<AttendanceRecord, StoreError>;

    /// Conditional check-out write: update-if-`check_out_time`-is-null.
    /// Returns false when the row was already closed, so a concurrent
    /// double check-out never overwrites the earlier write.
    async fn close_out(
        &self,
        id: u64,
        check_out_time: NaiveDateTime,
        total_hours: f64,
        status: AttendanceStatus,
    ) -> Result<bool, StoreError>;

    /// Records for one user with `from <= date < until`, newest first.
    async fn find_for_user_in_range(
        &self,
        user_id: u64,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Latest `limit` records for one user, newest first.
    async fn recent_for_user(
        &self,
        user_id: u64,
        limit: u32,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// All records with `from <= date < until`.
    async fn find_in_range(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Per-day record counts with `from <= date < until`, ascending.
    async fn daily_counts(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<DailyCount>, StoreError>;

    /// Records joined with directory fields, newest first. An
    /// `employee_id` that matches nobody yields an empty list.
    async fn find_detailed(
        &self,
        filter: &AttendanceFilter,
    ) -> Result<Vec<AttendanceDetail>, StoreError>;
}

/// Identity-side lookups the aggregation layer needs. Independent of
/// attendance rows.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn employee_count(&self) -> Result<i64, StoreError>;
    async fn department_counts(&self) -> Result<Vec<DepartmentCount>, StoreError>;
}

const RECORD_COLUMNS: &str =
    "id, user_id, date, check_in_time, check_out_time, status, total_hours";

/// sqlx-backed store. MySQL reports unique-key violations as SQLSTATE
/// 23000, which maps to `StoreError::Duplicate`.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn map_insert_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some("23000") {
            return StoreError::Duplicate;
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn find_one(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance WHERE user_id = ? AND date = ?"
        );
        let record = sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(user_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn create(&self, new: NewAttendanceRecord) -> Result<AttendanceRecord, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance (user_id, date, check_in_time, status, total_hours)
            VALUES (?, ?, ?, ?, 0)
            "#,
        )
        .bind(new.user_id)
        .bind(new.date)
        .bind(new.check_in_time)
        .bind(new.status)
        .execute(&self.pool)
        .await
        .map_err(map_insert_err)?;

        Ok(AttendanceRecord {
            id: result.last_insert_id(),
            user_id: new.user_id,
            date: new.date,
            check_in_time: Some(new.check_in_time),
            check_out_time: None,
            status: new.status,
            total_hours: 0.0,
        })
    }

    async fn close_out(
        &self,
        id: u64,
        check_out_time: NaiveDateTime,
        total_hours: f64,
        status: AttendanceStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out_time = ?, total_hours = ?, status = ?
            WHERE id = ?
            AND check_out_time IS NULL
            "#,
        )
        .bind(check_out_time)
        .bind(total_hours)
        .bind(status)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_for_user_in_range(
        &self,
        user_id: u64,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance \
             WHERE user_id = ? AND date >= ? AND date < ? ORDER BY date DESC"
        );
        let records = sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(user_id)
            .bind(from)
            .bind(until)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn recent_for_user(
        &self,
        user_id: u64,
        limit: u32,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance \
             WHERE user_id = ? ORDER BY date DESC LIMIT ?"
        );
        let records = sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn find_in_range(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance WHERE date >= ? AND date < ?"
        );
        let records = sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(from)
            .bind(until)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn daily_counts(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<DailyCount>, StoreError> {
        let counts = sqlx::query_as::<_, DailyCount>(
            r#"
            SELECT date, COUNT(*) AS count
            FROM attendance
            WHERE date >= ? AND date < ?
            GROUP BY date
            ORDER BY date
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }

    async fn find_detailed(
        &self,
        filter: &AttendanceFilter,
    ) -> Result<Vec<AttendanceDetail>, StoreError> {
        // -------------------------
        // WHERE clause
        // -------------------------
        enum FilterValue {
            Date(NaiveDate),
            Status(AttendanceStatus),
            Str(String),
        }

        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(date) = filter.date {
            where_sql.push_str(" AND a.date = ?");
            args.push(FilterValue::Date(date));
        }
        if let Some(code) = &filter.employee_id {
            where_sql.push_str(" AND u.employee_code = ?");
            args.push(FilterValue::Str(code.clone()));
        }
        if let Some(status) = filter.status {
            where_sql.push_str(" AND a.status = ?");
            args.push(FilterValue::Status(status));
        }
        if let Some(department) = &filter.department {
            where_sql.push_str(" AND u.department = ?");
            args.push(FilterValue::Str(department.clone()));
        }
        if let Some(from) = filter.from {
            where_sql.push_str(" AND a.date >= ?");
            args.push(FilterValue::Date(from));
        }
        if let Some(to) = filter.to {
            where_sql.push_str(" AND a.date <= ?");
            args.push(FilterValue::Date(to));
        }

        // -------------------------
        // DATA query
        // -------------------------
        let sql = format!(
            r#"
            SELECT u.employee_code, u.name, u.department,
                   a.date, a.status, a.check_in_time, a.check_out_time, a.total_hours
            FROM attendance a
            INNER JOIN users u ON u.id = a.user_id
            {}
            ORDER BY a.date DESC
            "#,
            where_sql
        );

        let mut query = sqlx::query_as::<_, AttendanceDetail>(&sql);
        for arg in args {
            query = match arg {
                FilterValue::Date(d) => query.bind(d),
                FilterValue::Status(s) => query.bind(s),
                FilterValue::Str(s) => query.bind(s),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows)
    }
}

#[async_trait]
impl Directory for MySqlStore {
    async fn employee_count(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE role_id = ? AND is_active = TRUE",
        )
        .bind(Role::Employee.id())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn department_counts(&self) -> Result<Vec<DepartmentCount>, StoreError> {
        let counts = sqlx::query_as::<_, DepartmentCount>(
            r#"
            SELECT department, COUNT(*) AS count
            FROM users
            WHERE role_id = ? AND is_active = TRUE
            GROUP BY department
            "#,
        )
        .bind(Role::Employee.id())
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Mutex-backed store double shared by the service and aggregation
    //! tests.

    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Clone)]
    pub struct MemUser {
        pub id: u64,
        pub employee_code: String,
        pub name: String,
        pub department: String,
    }

    #[derive(Default)]
    struct State {
        next_id: u64,
        records: Vec<AttendanceRecord>,
        users: Vec<MemUser>,
    }

    #[derive(Clone, Default)]
    pub struct MemStore {
        state: Arc<Mutex<State>>,
    }

    impl MemStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_user(&self, id: u64, code: &str, name: &str, department: &str) {
            self.state.lock().unwrap().users.push(MemUser {
                id,
                employee_code: code.to_string(),
                name: name.to_string(),
                department: department.to_string(),
            });
        }

        /// Seed a finished record directly, bypassing the service rules.
        pub fn seed_record(
            &self,
            user_id: u64,
            date: NaiveDate,
            status: AttendanceStatus,
            total_hours: f64,
        ) {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let id = state.next_id;
            state.records.push(AttendanceRecord {
                id,
                user_id,
                date,
                check_in_time: None,
                check_out_time: None,
                status,
                total_hours,
            });
        }

        pub fn record_count(&self) -> usize {
            self.state.lock().unwrap().records.len()
        }
    }

    #[async_trait]
    impl AttendanceStore for MemStore {
        async fn find_one(
            &self,
            user_id: u64,
            date: NaiveDate,
        ) -> Result<Option<AttendanceRecord>, StoreError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .records
                .iter()
                .find(|r| r.user_id == user_id && r.date == date)
                .cloned())
        }

        async fn create(&self, new: NewAttendanceRecord) -> Result<AttendanceRecord, StoreError> {
            let mut state = self.state.lock().unwrap();
            if state
                .records
                .iter()
                .any(|r| r.user_id == new.user_id && r.date == new.date)
            {
                return Err(StoreError::Duplicate);
            }
            state.next_id += 1;
            let record = AttendanceRecord {
                id: state.next_id,
                user_id: new.user_id,
                date: new.date,
                check_in_time: Some(new.check_in_time),
                check_out_time: None,
                status: new.status,
                total_hours: 0.0,
            };
            state.records.push(record.clone());
            Ok(record)
        }

        async fn close_out(
            &self,
            id: u64,
            check_out_time: NaiveDateTime,
            total_hours: f64,
            status: AttendanceStatus,
        ) -> Result<bool, StoreError> {
            let mut state = self.state.lock().unwrap();
            match state
                .records
                .iter_mut()
                .find(|r| r.id == id && r.check_out_time.is_none())
            {
                Some(record) => {
                    record.check_out_time = Some(check_out_time);
                    record.total_hours = total_hours;
                    record.status = status;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn find_for_user_in_range(
            &self,
            user_id: u64,
            from: NaiveDate,
            until: NaiveDate,
        ) -> Result<Vec<AttendanceRecord>, StoreError> {
            let state = self.state.lock().unwrap();
            let mut records: Vec<_> = state
                .records
                .iter()
                .filter(|r| r.user_id == user_id && r.date >= from && r.date < until)
                .cloned()
                .collect();
            records.sort_by(|a, b| b.date.cmp(&a.date));
            Ok(records)
        }

        async fn recent_for_user(
            &self,
            user_id: u64,
            limit: u32,
        ) -> Result<Vec<AttendanceRecord>, StoreError> {
            let state = self.state.lock().unwrap();
            let mut records: Vec<_> = state
                .records
                .iter()
                .filter(|r| r.user_id == user_id)
                .cloned()
                .collect();
            records.sort_by(|a, b| b.date.cmp(&a.date));
            records.truncate(limit as usize);
            Ok(records)
        }

        async fn find_in_range(
            &self,
            from: NaiveDate,
            until: NaiveDate,
        ) -> Result<Vec<AttendanceRecord>, StoreError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .records
                .iter()
                .filter(|r| r.date >= from && r.date < until)
                .cloned()
                .collect())
        }

        async fn daily_counts(
            &self,
            from: NaiveDate,
            until: NaiveDate,
        ) -> Result<Vec<DailyCount>, StoreError> {
            let state = self.state.lock().unwrap();
            let mut by_date: BTreeMap<NaiveDate, i64> = BTreeMap::new();
            for record in &state.records {
                if record.date >= from && record.date < until {
                    *by_date.entry(record.date).or_default() += 1;
                }
            }
            Ok(by_date
                .into_iter()
                .map(|(date, count)| DailyCount { date, count })
                .collect())
        }

        async fn find_detailed(
            &self,
            filter: &AttendanceFilter,
        ) -> Result<Vec<AttendanceDetail>, StoreError> {
            let state = self.state.lock().unwrap();
            let mut rows: Vec<_> = state
                .records
                .iter()
                .filter_map(|r| {
                    let user = state.users.iter().find(|u| u.id == r.user_id)?;
                    Some(AttendanceDetail {
                        employee_code: user.employee_code.clone(),
                        name: user.name.clone(),
                        department: user.department.clone(),
                        date: r.date,
                        status: r.status,
                        check_in_time: r.check_in_time,
                        check_out_time: r.check_out_time,
                        total_hours: r.total_hours,
                    })
                })
                .filter(|d| filter.date.is_none_or(|date| d.date == date))
                .filter(|d| {
                    filter
                        .employee_id
                        .as_ref()
                        .is_none_or(|code| &d.employee_code == code)
                })
                .filter(|d| filter.status.is_none_or(|status| d.status == status))
                .filter(|d| {
                    filter
                        .department
                        .as_ref()
                        .is_none_or(|dept| &d.department == dept)
                })
                .filter(|d| filter.from.is_none_or(|from| d.date >= from))
                .filter(|d| filter.to.is_none_or(|to| d.date <= to))
                .collect();
            rows.sort_by(|a, b| b.date.cmp(&a.date));
            Ok(rows)
        }
    }

    #[async_trait]
    impl Directory for MemStore {
        async fn employee_count(&self) -> Result<i64, StoreError> {
            Ok(self.state.lock().unwrap().users.len() as i64)
        }

        async fn department_counts(&self) -> Result<Vec<DepartmentCount>, StoreError> {
            let state = self.state.lock().unwrap();
            let mut by_department: BTreeMap<String, i64> = BTreeMap::new();
            for user in &state.users {
                *by_department.entry(user.department.clone()).or_default() += 1;
            }
            Ok(by_department
                .into_iter()
                .map(|(department, count)| DepartmentCount { department, count })
                .collect())
        }
    }
}
