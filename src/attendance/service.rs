use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::attendance::classify;
use crate::attendance::store::{AttendanceStore, StoreError};
use crate::model::attendance::{AttendanceRecord, NewAttendanceRecord, TodayState};

#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error("Already checked in for today")]
    AlreadyCheckedIn,
    #[error("Check-in not allowed after 1:00 PM. You will be marked as absent/on leave for today.")]
    CheckInWindowClosed,
    #[error("No check-in record found for today")]
    NoCheckInRecord,
    #[error("Already checked out for today")]
    AlreadyCheckedOut,
    #[error("Invalid month: {0}")]
    InvalidMonth(u32),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AttendanceError {
    /// True for the terminal business-rule rejections a client caused;
    /// false for store failures the client cannot do anything about.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AttendanceError::Store(_))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TodayStatus {
    pub status: TodayState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<AttendanceRecord>,
}

/// First day of the month and first day of the following month, the
/// half-open window every month-scoped query uses.
pub fn month_range(month: u32, year: i32) -> Result<(NaiveDate, NaiveDate), AttendanceError> {
    let start =
        NaiveDate::from_ymd_opt(year, month, 1).ok_or(AttendanceError::InvalidMonth(month))?;
    let until = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or(AttendanceError::InvalidMonth(month))?;
    Ok((start, until))
}

/// Orchestrates the once-daily check-in/check-out cycle against the
/// record store. "Today" is always `now.date()` with `now` supplied by
/// the caller's clock, so the store key can never disagree with the
/// timestamps inside the record.
pub struct AttendanceService<S> {
    store: S,
}

impl<S: AttendanceStore> AttendanceService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn check_in(
        &self,
        user_id: u64,
        now: NaiveDateTime,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let today = now.date();

        if self.store.find_one(user_id, today).await?.is_some() {
            return Err(AttendanceError::AlreadyCheckedIn);
        }

        let status = classify::check_in_status(now).ok_or(AttendanceError::CheckInWindowClosed)?;

        if classify::is_weekend(today) {
            tracing::warn!(user_id, date = %today, "Weekend check-in accepted");
        }

        let created = self
            .store
            .create(NewAttendanceRecord {
                user_id,
                date: today,
                check_in_time: now,
                status,
            })
            .await
            .map_err(|e| match e {
                // Lost the insert race against a concurrent check-in.
                StoreError::Duplicate => AttendanceError::AlreadyCheckedIn,
                other => AttendanceError::Store(other),
            })?;

        Ok(created)
    }

    pub async fn check_out(
        &self,
        user_id: u64,
        now: NaiveDateTime,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let today = now.date();

        let record = self
            .store
            .find_one(user_id, today)
            .await?
            .ok_or(AttendanceError::NoCheckInRecord)?;

        if record.check_out_time.is_some() {
            return Err(AttendanceError::AlreadyCheckedOut);
        }
        let check_in_time = record.check_in_time.ok_or(AttendanceError::NoCheckInRecord)?;

        let total_hours = classify::worked_hours(check_in_time, now);
        let status = classify::check_out_status(record.status, now, total_hours);

        let closed = self
            .store
            .close_out(record.id, now, total_hours, status)
            .await?;
        if !closed {
            // A concurrent check-out won the conditional write.
            return Err(AttendanceError::AlreadyCheckedOut);
        }

        Ok(AttendanceRecord {
            check_out_time: Some(now),
            total_hours,
            status,
            ..record
        })
    }

    /// All of the user's records for the given month, newest first.
    pub async fn history(
        &self,
        user_id: u64,
        month: u32,
        year: i32,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        let (start, until) = month_range(month, year)?;
        let records = self
            .store
            .find_for_user_in_range(user_id, start, until)
            .await?;
        Ok(records)
    }

    pub async fn today(
        &self,
        user_id: u64,
        now: NaiveDateTime,
    ) -> Result<TodayStatus, AttendanceError> {
        let record = self.store.find_one(user_id, now.date()).await?;
        let status = match &record {
            None => TodayState::NotCheckedIn,
            Some(r) if r.check_out_time.is_some() => TodayState::CheckedOut,
            Some(_) => TodayState::CheckedIn,
        };
        Ok(TodayStatus {
            status,
            data: record,
        })
    }
}
