//! Diesel model mapping to [`crate::schema::stock_prices`].

use chrono::NaiveDate;
use diesel::prelude::*;
use serde::Serialize;

use crate::schema::stock_prices;

/// One normalized row of daily OHLCV data for one instrument on one date.
///
/// Prices and volume are nullable: a provider may omit a field for a given
/// day/instrument pair and the gap is kept rather than the row dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = stock_prices, check_for_backend(diesel::sqlite::Sqlite))]
// `None` binds as NULL; SQLite cannot batch rows that would need DEFAULT.
#[diesel(treat_none_as_default_value = false)]
pub struct PriceBar {
    /// Calendar date, no timezone.
    pub date: NaiveDate,
    /// Instrument identifier (e.g., "AAPL").
    pub ticker: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    /// Split/dividend adjusted close as reported by the provider.
    pub adj_close: Option<f64>,
    /// Shares traded; never negative.
    pub volume: Option<i64>,
}

impl PriceBar {
    /// Row for `(date, ticker)` with every value missing.
    pub fn empty(date: NaiveDate, ticker: impl Into<String>) -> Self {
        Self {
            date,
            ticker: ticker.into(),
            open: None,
            high: None,
            low: None,
            close: None,
            adj_close: None,
            volume: None,
        }
    }
}
