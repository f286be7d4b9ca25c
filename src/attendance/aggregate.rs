use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::attendance::service::{AttendanceError, month_range};
use crate::attendance::store::{AttendanceStore, Directory};
use crate::model::attendance::{
    AttendanceRecord, AttendanceStatus, DepartmentCount, TodayState,
};

/// How many trailing records the employee dashboard shows.
const RECENT_ACTIVITY_LIMIT: u32 = 7;
/// Trend window length, calendar days including weekends.
const TREND_DAYS: u64 = 7;

/// Employee-facing month rollup. `absent` folds the `absent` and `leave`
/// statuses into one non-present bucket. Days with no record at all are
/// not counted anywhere: without materialized absence rows this summary
/// deliberately undercounts absenteeism.
#[derive(Debug, Default, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthlySummary {
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub half_day: u32,
    pub total_hours: f64,
}

/// Per-date status counts for the manager's team view.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct DayBuckets {
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub half_day: u32,
    pub leave: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub count: i64,
}

/// Manager's headcount for the current day. `present` counts any record
/// with a present-equivalent status; `absent` is approximated as
/// `total_employees - present`, NOT as a count of absent-status rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct TodaySnapshot {
    pub total_employees: i64,
    pub present: i64,
    pub absent: i64,
    pub late: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EmployeeStats {
    pub today_status: TodayState,
    pub stats: MonthlySummary,
    pub recent_activity: Vec<AttendanceRecord>,
}

/// Read-only rollups over stored attendance records plus the employee
/// directory. Never writes.
pub struct AggregationService<S, D> {
    store: S,
    directory: D,
}

impl<S: AttendanceStore, D: Directory> AggregationService<S, D> {
    pub fn new(store: S, directory: D) -> Self {
        Self { store, directory }
    }

    pub async fn monthly_summary(
        &self,
        user_id: u64,
        month: u32,
        year: i32,
    ) -> Result<MonthlySummary, AttendanceError> {
        let (start, until) = month_range(month, year)?;
        let records = self
            .store
            .find_for_user_in_range(user_id, start, until)
            .await?;
        Ok(summarize(&records))
    }

    /// Status buckets per date over an inclusive range.
    pub async fn team_summary(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, DayBuckets>, AttendanceError> {
        let until = to.succ_opt().unwrap_or(to);
        let records = self.store.find_in_range(from, until).await?;

        let mut by_date: BTreeMap<NaiveDate, DayBuckets> = BTreeMap::new();
        for record in &records {
            let buckets = by_date.entry(record.date).or_default();
            match record.status {
                AttendanceStatus::Present => buckets.present += 1,
                AttendanceStatus::Absent => buckets.absent += 1,
                AttendanceStatus::Late => buckets.late += 1,
                AttendanceStatus::HalfDay => buckets.half_day += 1,
                AttendanceStatus::Leave => buckets.leave += 1,
            }
        }
        Ok(by_date)
    }

    pub async fn department_distribution(
        &self,
    ) -> Result<Vec<DepartmentCount>, AttendanceError> {
        Ok(self.directory.department_counts().await?)
    }

    /// Record count for each of the last 7 calendar days ending today,
    /// weekends included, zero-filled for days with no records.
    pub async fn weekly_trend(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<TrendPoint>, AttendanceError> {
        let from = today - Days::new(TREND_DAYS - 1);
        let until = today + Days::new(1);
        let counts = self.store.daily_counts(from, until).await?;

        let by_date: BTreeMap<NaiveDate, i64> =
            counts.into_iter().map(|c| (c.date, c.count)).collect();

        Ok((0..TREND_DAYS)
            .map(|offset| {
                let date = from + Days::new(offset);
                TrendPoint {
                    date,
                    count: by_date.get(&date).copied().unwrap_or(0),
                }
            })
            .collect())
    }

    pub async fn today_snapshot(
        &self,
        now: NaiveDateTime,
    ) -> Result<TodaySnapshot, AttendanceError> {
        let today = now.date();
        let total_employees = self.directory.employee_count().await?;
        let records = self
            .store
            .find_in_range(today, today + Days::new(1))
            .await?;

        let present = records
            .iter()
            .filter(|r| r.status.is_present_equivalent())
            .count() as i64;
        let late = records
            .iter()
            .filter(|r| r.status == AttendanceStatus::Late)
            .count() as i64;

        Ok(TodaySnapshot {
            total_employees,
            present,
            // Rough estimate: anyone without a present-equivalent record
            // today, not a count of absent-status rows.
            absent: total_employees - present,
            late,
        })
    }

    pub async fn employee_stats(
        &self,
        user_id: u64,
        now: NaiveDateTime,
    ) -> Result<EmployeeStats, AttendanceError> {
        let today = now.date();

        let today_status = match self.store.find_one(user_id, today).await? {
            None => TodayState::NotCheckedIn,
            Some(r) if r.check_out_time.is_some() => TodayState::CheckedOut,
            Some(_) => TodayState::CheckedIn,
        };

        let stats = self
            .monthly_summary(user_id, today.month(), today.year())
            .await?;

        let recent_activity = self
            .store
            .recent_for_user(user_id, RECENT_ACTIVITY_LIMIT)
            .await?;

        Ok(EmployeeStats {
            today_status,
            stats,
            recent_activity,
        })
    }
}

fn summarize(records: &[AttendanceRecord]) -> MonthlySummary {
    let mut summary = MonthlySummary::default();
    for record in records {
        match record.status {
            AttendanceStatus::Present => summary.present += 1,
            AttendanceStatus::Late => summary.late += 1,
            AttendanceStatus::HalfDay => summary.half_day += 1,
            AttendanceStatus::Absent | AttendanceStatus::Leave => summary.absent += 1,
        }
        summary.total_hours += record.total_hours;
    }
    summary.total_hours = (summary.total_hours * 100.0).round() / 100.0;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::store::testing::MemStore;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, d).unwrap()
    }

    fn aggregation(store: MemStore) -> AggregationService<MemStore, MemStore> {
        AggregationService::new(store.clone(), store)
    }

    #[actix_web::test]
    async fn monthly_summary_buckets_and_hours() {
        let store = MemStore::new();
        store.seed_record(1, day(3), AttendanceStatus::Present, 8.0);
        store.seed_record(1, day(4), AttendanceStatus::Late, 7.25);
        store.seed_record(1, day(5), AttendanceStatus::HalfDay, 4.5);
        store.seed_record(1, day(6), AttendanceStatus::Leave, 2.0);
        store.seed_record(1, day(7), AttendanceStatus::Absent, 0.0);
        // Another employee's record must not bleed in.
        store.seed_record(2, day(3), AttendanceStatus::Present, 8.0);
        // Out-of-month record must not bleed in either.
        store.seed_record(1, NaiveDate::from_ymd_opt(2026, 7, 31).unwrap(),
            AttendanceStatus::Present, 8.0);

        let summary = aggregation(store).monthly_summary(1, 8, 2026).await.unwrap();
        assert_eq!(
            summary,
            MonthlySummary {
                present: 1,
                absent: 2, // leave + absent fold together
                late: 1,
                half_day: 1,
                total_hours: 21.75,
            }
        );
    }

    #[actix_web::test]
    async fn days_without_records_are_not_counted_absent() {
        let store = MemStore::new();
        store.seed_record(1, day(3), AttendanceStatus::Present, 8.0);

        let summary = aggregation(store).monthly_summary(1, 8, 2026).await.unwrap();
        assert_eq!(summary.absent, 0);
    }

    #[actix_web::test]
    async fn team_summary_groups_by_date_inclusive_range() {
        let store = MemStore::new();
        store.seed_record(1, day(3), AttendanceStatus::Present, 8.0);
        store.seed_record(2, day(3), AttendanceStatus::Late, 7.0);
        store.seed_record(3, day(4), AttendanceStatus::HalfDay, 4.5);
        store.seed_record(1, day(5), AttendanceStatus::Present, 8.0);
        // Outside the queried range.
        store.seed_record(1, day(6), AttendanceStatus::Present, 8.0);

        let summary = aggregation(store).team_summary(day(3), day(5)).await.unwrap();
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[&day(3)].present, 1);
        assert_eq!(summary[&day(3)].late, 1);
        assert_eq!(summary[&day(4)].half_day, 1);
        assert_eq!(summary[&day(5)].present, 1);
        assert!(!summary.contains_key(&day(6)));
    }

    #[actix_web::test]
    async fn weekly_trend_is_zero_filled_over_seven_days() {
        let store = MemStore::new();
        store.seed_record(1, day(9), AttendanceStatus::Present, 8.0);
        store.seed_record(2, day(9), AttendanceStatus::Late, 7.0);
        store.seed_record(1, day(7), AttendanceStatus::Present, 8.0);
        // Older than the window.
        store.seed_record(1, day(2), AttendanceStatus::Present, 8.0);

        let trend = aggregation(store).weekly_trend(day(9)).await.unwrap();
        assert_eq!(trend.len(), 7);
        assert_eq!(trend.first().unwrap().date, day(3));
        assert_eq!(trend.last().unwrap().date, day(9));

        let counts: Vec<i64> = trend.iter().map(|p| p.count).collect();
        assert_eq!(counts, vec![0, 0, 0, 0, 1, 0, 2]);
    }

    #[actix_web::test]
    async fn today_snapshot_approximates_absent_from_headcount() {
        let store = MemStore::new();
        for (id, code) in [(1, "EMP001"), (2, "EMP002"), (3, "EMP003"), (4, "EMP004"), (5, "EMP005")]
        {
            store.add_user(id, code, code, "Engineering");
        }
        store.seed_record(1, day(3), AttendanceStatus::Present, 0.0);
        store.seed_record(2, day(3), AttendanceStatus::Late, 0.0);
        store.seed_record(3, day(3), AttendanceStatus::Leave, 0.0);

        let now = day(3).and_hms_opt(11, 0, 0).unwrap();
        let snapshot = aggregation(store).today_snapshot(now).await.unwrap();
        assert_eq!(
            snapshot,
            TodaySnapshot {
                total_employees: 5,
                present: 2, // present + late; leave is not present-equivalent
                absent: 3,  // 5 - 2, not the count of absent-status rows
                late: 1,
            }
        );
    }

    #[actix_web::test]
    async fn department_distribution_counts_employees() {
        let store = MemStore::new();
        store.add_user(1, "EMP001", "A", "Engineering");
        store.add_user(2, "EMP002", "B", "Engineering");
        store.add_user(3, "EMP003", "C", "Sales");

        let distribution = aggregation(store).department_distribution().await.unwrap();
        assert_eq!(distribution.len(), 2);
        assert_eq!(distribution[0].department, "Engineering");
        assert_eq!(distribution[0].count, 2);
        assert_eq!(distribution[1].department, "Sales");
        assert_eq!(distribution[1].count, 1);
    }

    #[actix_web::test]
    async fn employee_stats_reports_state_month_and_recent() {
        let store = MemStore::new();
        for d in 1..=9 {
            store.seed_record(1, day(d), AttendanceStatus::Present, 8.0);
        }

        let now = day(9).and_hms_opt(10, 0, 0).unwrap();
        let stats = aggregation(store).employee_stats(1, now).await.unwrap();
        assert_eq!(stats.today_status, TodayState::CheckedIn);
        assert_eq!(stats.stats.present, 9);
        assert_eq!(stats.recent_activity.len(), 7);
        assert_eq!(stats.recent_activity.first().unwrap().date, day(9));
    }
}
