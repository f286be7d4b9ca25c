use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};

use crate::model::attendance::AttendanceStatus;

/// Check-ins at or after this hour are rejected outright.
pub const CHECK_IN_CUTOFF_HOUR: u32 = 13;
/// Check-ins at or after this hour (but before the cutoff) count as late.
pub const LATE_HOUR: u32 = 10;
/// Days shorter than this many worked hours collapse to leave.
pub const MIN_WORKED_HOURS: f64 = 4.0;
/// Check-outs before this hour downgrade a long-enough day to half-day.
pub const EARLY_OUT_HOUR: u32 = 17;

/// Status earned by checking in at `at`, or `None` when the check-in
/// window has already closed for the day. The caller must not create a
/// record for a `None` ruling.
///
/// Boundaries are exact: 09:59:59 is present, 10:00:00 is late,
/// 12:59:59 is still accepted, 13:00:00 is rejected.
pub fn check_in_status(at: NaiveDateTime) -> Option<AttendanceStatus> {
    let hour = at.hour();
    if hour >= CHECK_IN_CUTOFF_HOUR {
        None
    } else if hour >= LATE_HOUR {
        Some(AttendanceStatus::Late)
    } else {
        Some(AttendanceStatus::Present)
    }
}

/// Elapsed hours between check-in and check-out, rounded to 2 decimals.
pub fn worked_hours(check_in: NaiveDateTime, check_out: NaiveDateTime) -> f64 {
    let secs = (check_out - check_in).num_milliseconds() as f64 / 1000.0;
    round2(secs / 3600.0)
}

/// Final status for the day. Too few hours invalidates the day as leave
/// regardless of punctuality; leaving before 17:00 on a long-enough day is
/// a half-day; otherwise the check-in status stands.
///
/// Exactly 4.00 hours is NOT leave (`< 4`), and exactly 17:00 is NOT a
/// half-day (`< 17`).
pub fn check_out_status(
    entry_status: AttendanceStatus,
    check_out: NaiveDateTime,
    total_hours: f64,
) -> AttendanceStatus {
    if total_hours < MIN_WORKED_HOURS {
        AttendanceStatus::Leave
    } else if check_out.hour() < EARLY_OUT_HOUR {
        AttendanceStatus::HalfDay
    } else {
        entry_status
    }
}

/// Advisory only: the check-in path does not reject weekends, it just
/// flags them for the caller to log or surface.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn round2(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 3)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn check_in_before_ten_is_present() {
        assert_eq!(check_in_status(at(7, 0, 0)), Some(AttendanceStatus::Present));
        assert_eq!(
            check_in_status(at(9, 59, 59)),
            Some(AttendanceStatus::Present)
        );
    }

    #[test]
    fn check_in_at_ten_sharp_is_late() {
        assert_eq!(check_in_status(at(10, 0, 0)), Some(AttendanceStatus::Late));
        assert_eq!(check_in_status(at(12, 30, 0)), Some(AttendanceStatus::Late));
    }

    #[test]
    fn check_in_window_closes_at_thirteen() {
        assert_eq!(check_in_status(at(12, 59, 59)), Some(AttendanceStatus::Late));
        assert_eq!(check_in_status(at(13, 0, 0)), None);
        assert_eq!(check_in_status(at(13, 5, 0)), None);
        assert_eq!(check_in_status(at(23, 59, 59)), None);
    }

    #[test]
    fn worked_hours_rounds_to_two_decimals() {
        assert_eq!(worked_hours(at(9, 45, 0), at(17, 30, 0)), 7.75);
        assert_eq!(worked_hours(at(10, 15, 0), at(13, 0, 0)), 2.75);
        // 7h 33m 20s = 7.5555... -> 7.56
        assert_eq!(worked_hours(at(9, 0, 0), at(16, 33, 20)), 7.56);
    }

    #[test]
    fn short_day_is_leave_regardless_of_entry_status() {
        assert_eq!(
            check_out_status(AttendanceStatus::Present, at(12, 0, 0), 3.0),
            AttendanceStatus::Leave
        );
        assert_eq!(
            check_out_status(AttendanceStatus::Late, at(13, 0, 0), 2.75),
            AttendanceStatus::Leave
        );
        assert_eq!(
            check_out_status(AttendanceStatus::Present, at(18, 0, 0), 3.99),
            AttendanceStatus::Leave
        );
    }

    #[test]
    fn exactly_four_hours_is_not_leave() {
        assert_eq!(
            check_out_status(AttendanceStatus::Present, at(13, 30, 0), 4.0),
            AttendanceStatus::HalfDay
        );
    }

    #[test]
    fn early_check_out_is_half_day() {
        assert_eq!(
            check_out_status(AttendanceStatus::Present, at(16, 59, 59), 7.0),
            AttendanceStatus::HalfDay
        );
        assert_eq!(
            check_out_status(AttendanceStatus::Late, at(14, 30, 0), 4.25),
            AttendanceStatus::HalfDay
        );
    }

    #[test]
    fn full_day_keeps_entry_status() {
        assert_eq!(
            check_out_status(AttendanceStatus::Present, at(17, 0, 0), 8.0),
            AttendanceStatus::Present
        );
        assert_eq!(
            check_out_status(AttendanceStatus::Late, at(18, 15, 0), 7.5),
            AttendanceStatus::Late
        );
    }

    #[test]
    fn weekend_detection() {
        // 2026-08-01 is a Saturday, 2026-08-02 a Sunday, 2026-08-03 a Monday
        assert!(is_weekend(NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()));
        assert!(is_weekend(NaiveDate::from_ymd_opt(2026, 8, 2).unwrap()));
        assert!(!is_weekend(NaiveDate::from_ymd_opt(2026, 8, 3).unwrap()));
    }
}
