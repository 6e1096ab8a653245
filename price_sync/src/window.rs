//! Fetch-window math.

use chrono::{Days, NaiveDate};
use serde::Serialize;

/// Inclusive date range queried from the provider on one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FetchWindow {
    /// `start` is the day after the high-water mark, or `epoch` without one;
    /// `end` is `today`. Returns `None` when there is nothing left to fetch.
    pub fn plan(
        high_water_mark: Option<NaiveDate>,
        epoch: NaiveDate,
        today: NaiveDate,
    ) -> Option<FetchWindow> {
        let start = match high_water_mark {
            Some(hwm) => hwm.checked_add_days(Days::new(1))?,
            None => epoch,
        };
        (start <= today).then_some(FetchWindow { start, end: today })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl std::fmt::Display for FetchWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}
