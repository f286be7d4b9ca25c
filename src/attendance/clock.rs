use chrono::NaiveDateTime;

/// Source of "now" for the attendance paths. Injected so the services can
/// be driven with fixed timestamps in tests; "today" is always derived from
/// this clock, never passed in pre-formatted by callers.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time. The business day is timezone-naive.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

#[cfg(test)]
pub struct FixedClock(pub NaiveDateTime);

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
