use anyhow::Context;
use chrono::{DateTime, Days, Months, Utc};

use crate::domain::{errors::SubscriptionError, value_objects::enums::intervals::Interval};

/// A billing or reset window: `start` plus `interval_count` units of `interval`.
///
/// Month and year arithmetic clamps to the last valid day of the target month,
/// so Jan 31 + 1 month is Feb 28 (or Feb 29 in a leap year).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    interval: Interval,
    interval_count: u32,
}

impl Period {
    /// Parses `interval` and builds the period. A non-positive `count` means 1.
    pub fn new(
        interval: &str,
        count: i32,
        start: DateTime<Utc>,
    ) -> Result<Self, SubscriptionError> {
        let interval = Interval::from_str(interval)?;
        Self::from_interval(interval, count, start)
    }

    pub fn from_interval(
        interval: Interval,
        count: i32,
        start: DateTime<Utc>,
    ) -> Result<Self, SubscriptionError> {
        let interval_count = u32::try_from(count).ok().filter(|c| *c > 0).unwrap_or(1);
        let end = Self::advance(start, interval, interval_count)
            .context("failed to compute period end date")?;

        Ok(Self {
            start,
            end,
            interval,
            interval_count,
        })
    }

    fn advance(start: DateTime<Utc>, interval: Interval, count: u32) -> Option<DateTime<Utc>> {
        match interval {
            Interval::Day => start.checked_add_days(Days::new(u64::from(count))),
            Interval::Week => start.checked_add_days(Days::new(u64::from(count) * 7)),
            Interval::Month => start.checked_add_months(Months::new(count)),
            Interval::Year => start.checked_add_months(Months::new(count.checked_mul(12)?)),
        }
    }

    pub fn start_date(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end_date(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn interval_count(&self) -> u32 {
        self.interval_count
    }
}
