//! Read-side helpers for the dashboard.
//!
//! Pure functions over [`PriceRepo::read_all`](crate::store::PriceRepo::read_all)
//! output. Rendering lives elsewhere; these only shape the data.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::PriceBar;

/// Allowed hypothetical price change, in percent.
pub const ADJUSTMENT_PCT_RANGE: RangeInclusive<i64> = -20..=20;
/// Allowed moving-average window, in trading days.
pub const MA_WINDOW_RANGE: RangeInclusive<i64> = 5..=50;
pub const DEFAULT_MA_WINDOW: usize = 10;

/// A stored bar next to its simulated close.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustedBar {
    #[serde(flatten)]
    pub bar: PriceBar,
    pub adjusted_close: Option<f64>,
}

/// Distinct tickers, sorted.
pub fn tickers(rows: &[PriceBar]) -> Vec<String> {
    rows.iter()
        .map(|r| r.ticker.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Rows whose ticker is in `selected`, original order kept.
pub fn filter_tickers(rows: &[PriceBar], selected: &[String]) -> Vec<PriceBar> {
    rows.iter()
        .filter(|r| selected.iter().any(|s| s == &r.ticker))
        .cloned()
        .collect()
}

/// `close × (1 + pct/100)` per row; a missing close stays missing.
pub fn simulate_adjustment(rows: &[PriceBar], pct: f64) -> Vec<AdjustedBar> {
    let factor = 1.0 + pct / 100.0;
    rows.iter()
        .map(|bar| AdjustedBar {
            adjusted_close: bar.close.map(|c| c * factor),
            bar: bar.clone(),
        })
        .collect()
}

/// Rolling mean of `close` for one ticker, in ascending date order.
///
/// The value is `None` until `window` rows have been seen, and for any window
/// that contains a missing close.
pub fn moving_average(
    rows: &[PriceBar],
    ticker: &str,
    window: usize,
) -> Vec<(NaiveDate, Option<f64>)> {
    let mut series: Vec<(NaiveDate, Option<f64>)> = rows
        .iter()
        .filter(|r| r.ticker == ticker)
        .map(|r| (r.date, r.close))
        .collect();
    series.sort_by_key(|(date, _)| *date);

    let closes: Vec<Option<f64>> = series.iter().map(|(_, c)| *c).collect();
    series
        .iter()
        .enumerate()
        .map(|(i, (date, _))| {
            let mean = if window == 0 || i + 1 < window {
                None
            } else {
                closes[i + 1 - window..=i]
                    .iter()
                    .copied()
                    .sum::<Option<f64>>()
                    .map(|total| total / window as f64)
            };
            (*date, mean)
        })
        .collect()
}
