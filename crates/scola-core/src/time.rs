use chrono::{DateTime, Local, NaiveDateTime};

use scola_domain::ReportingPeriod;

/// Clock abstracts access to the current timestamp so services remain deterministic in tests.
pub trait Clock: Send + Sync {
    /// Returns the current local timestamp.
    fn now(&self) -> DateTime<Local>;

    /// Local wall-clock time without offset, as stored on ledger records.
    fn now_naive(&self) -> NaiveDateTime {
        self.now().naive_local()
    }

    /// Calendar month containing `now`.
    fn current_month(&self) -> ReportingPeriod {
        ReportingPeriod::month_containing(self.now_naive())
    }
}

/// Reads the server's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
            .and_local_timezone(Local)
            .earliest()
            .unwrap_or_else(Local::now)
    }

    fn now_naive(&self) -> NaiveDateTime {
        self.0
    }
}
