//! Time source for timestamps and day-boundary detection.

use arc_swap::ArcSwap;
use chrono::{DateTime, Duration, Local, NaiveDate};
use std::sync::Arc;

/// Source of the current local time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Local>;

    /// Calendar date used to name backups and decide rotation.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock that only moves when told to. Lets day boundaries be crossed on demand.
pub struct ManualClock {
    now: ArcSwap<DateTime<Local>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Local>) -> Arc<Self> {
        Arc::new(Self {
            now: ArcSwap::from_pointee(start),
        })
    }

    pub fn set(&self, now: DateTime<Local>) {
        self.now.store(Arc::new(now));
    }

    pub fn advance(&self, by: Duration) {
        self.now.rcu(|cur| Arc::new(**cur + by));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        **self.now.load()
    }
}
