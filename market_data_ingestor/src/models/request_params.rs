use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Parameters for a daily bar request against any market data provider.
///
/// Both ends of the range are **inclusive**. Providers whose upstream API treats
/// the end as exclusive must translate internally; callers never see that quirk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarsRequestParams {
    /// Symbols to request in one batch (e.g., `["AAPL", "MSFT"]`).
    pub symbols: Vec<String>,

    /// First calendar day of the range (inclusive).
    pub start: NaiveDate,

    /// Last calendar day of the range (inclusive).
    pub end: NaiveDate,
}

impl BarsRequestParams {
    pub fn new(symbols: Vec<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbols,
            start,
            end,
        }
    }

    /// Number of calendar days covered, or 0 for an inverted range.
    pub fn days(&self) -> i64 {
        ((self.end - self.start).num_days() + 1).max(0)
    }
}
