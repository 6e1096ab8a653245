//! Canonicalization of provider frames into [`PriceBar`] rows.
//!
//! This is the only place field names, date labels and batch layout are
//! interpreted. Everything downstream (store, dashboard helpers) sees
//! canonical rows only.
//!
//! Rules:
//! - field names go through [`canonical_field_name`] once; unknown fields are ignored;
//! - date labels go through [`coerce_date`]; the calendar date is taken as written
//!   and must fall inside the requested [`FetchWindow`];
//! - every symbol with at least one value gets a row for every index date,
//!   missing fields stay `None`;
//! - NaN and infinite values are missing values, not errors.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use market_data_ingestor::models::frame::BarFrame;

use crate::models::PriceBar;
use crate::window::FetchWindow;

/// Reasons a provider frame cannot be turned into rows.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("unparseable date label `{label}`")]
    BadDate { label: String },
    #[error("date {date} is outside the requested window {window}")]
    OutOfWindow { date: NaiveDate, window: FetchWindow },
    #[error("date {date} appears more than once in the index")]
    DuplicateDate { date: NaiveDate },
    #[error("column `{field}` for {symbol} has {got} values, index has {expected}")]
    ColumnLength {
        field: String,
        symbol: String,
        expected: usize,
        got: usize,
    },
    #[error("column `{field}` for {symbol} appears more than once")]
    DuplicateColumn { field: String, symbol: String },
    #[error("frame has no symbol level but {requested} symbols were requested")]
    AmbiguousFlatFrame { requested: usize },
    #[error("negative {field} {value} for {symbol} on {date}")]
    NegativePrice {
        field: &'static str,
        symbol: String,
        date: NaiveDate,
        value: f64,
    },
    #[error("volume {value} for {symbol} on {date} is not a non-negative integer")]
    BadVolume {
        symbol: String,
        date: NaiveDate,
        value: f64,
    },
}

/// PriceBar attributes a provider column can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    AdjClose,
    Volume,
}

impl PriceField {
    pub const ALL: [PriceField; 6] = [
        PriceField::Open,
        PriceField::High,
        PriceField::Low,
        PriceField::Close,
        PriceField::AdjClose,
        PriceField::Volume,
    ];

    /// Map an already canonical name; `None` for fields the table does not keep.
    pub fn from_canonical(name: &str) -> Option<Self> {
        match name {
            "open" => Some(PriceField::Open),
            "high" => Some(PriceField::High),
            "low" => Some(PriceField::Low),
            "close" => Some(PriceField::Close),
            "adj_close" | "adjusted_close" => Some(PriceField::AdjClose),
            "volume" => Some(PriceField::Volume),
            _ => None,
        }
    }

    /// Persisted column name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
            PriceField::AdjClose => "adj_close",
            PriceField::Volume => "volume",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Lower-case, underscore-separated field name.
///
/// `"Adj Close"` -> `adj_close`, `"Stock-Splits"` -> `stock_splits`.
pub fn canonical_field_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        let ch = match ch {
            ' ' | '-' | '.' | '_' | '\t' => '_',
            c => c.to_ascii_lowercase(),
        };
        if ch == '_' && (out.is_empty() || out.ends_with('_')) {
            continue;
        }
        out.push(ch);
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Calendar date of a provider date label, as written.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS[.f]`, `YYYY-MM-DDTHH:MM:SS[.f]`
/// and RFC 3339. Offsets are not applied: `2024-06-11T23:30:00-04:00` is 2024-06-11.
pub fn coerce_date(label: &str) -> Result<NaiveDate, NormalizeError> {
    let s = label.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local().date());
    }
    Err(NormalizeError::BadDate {
        label: label.to_string(),
    })
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

type SymbolColumns = [Option<Vec<Option<f64>>>; 6];

/// Flatten a provider frame into one row per `(date, symbol)`, sorted by date then ticker.
///
/// `requested` names the symbols of the request; it is only consulted for flat
/// frames, which must then name exactly one symbol. Every index date must lie
/// in `window`.
pub fn normalize_frame(
    frame: &BarFrame,
    requested: &[String],
    window: &FetchWindow,
) -> Result<Vec<PriceBar>, NormalizeError> {
    let mut dates = Vec::with_capacity(frame.index.len());
    let mut seen = HashSet::with_capacity(frame.index.len());
    for label in &frame.index {
        let date = coerce_date(label)?;
        if !window.contains(date) {
            return Err(NormalizeError::OutOfWindow {
                date,
                window: *window,
            });
        }
        if !seen.insert(date) {
            return Err(NormalizeError::DuplicateDate { date });
        }
        dates.push(date);
    }

    let mut by_symbol: BTreeMap<String, SymbolColumns> = BTreeMap::new();
    for column in &frame.columns {
        let symbol = match column.symbol.as_deref() {
            Some(s) => s.trim().to_ascii_uppercase(),
            None => match requested {
                [only] => only.clone(),
                _ => {
                    return Err(NormalizeError::AmbiguousFlatFrame {
                        requested: requested.len(),
                    });
                }
            },
        };
        if column.values.len() != dates.len() {
            return Err(NormalizeError::ColumnLength {
                field: column.field.clone(),
                symbol,
                expected: dates.len(),
                got: column.values.len(),
            });
        }
        let canonical = canonical_field_name(&column.field);
        let Some(field) = PriceField::from_canonical(&canonical) else {
            tracing::trace!(field = %column.field, "ignoring column");
            continue;
        };

        let values: Vec<Option<f64>> = column.values.iter().copied().map(finite).collect();
        for (date, value) in dates.iter().zip(&values) {
            let Some(v) = *value else { continue };
            if field == PriceField::Volume {
                if v < 0.0 || v.fract() != 0.0 || v >= i64::MAX as f64 {
                    return Err(NormalizeError::BadVolume {
                        symbol,
                        date: *date,
                        value: v,
                    });
                }
            } else if v < 0.0 {
                return Err(NormalizeError::NegativePrice {
                    field: field.as_str(),
                    symbol,
                    date: *date,
                    value: v,
                });
            }
        }

        let slot = &mut by_symbol.entry(symbol.clone()).or_default()[field.index()];
        if slot.is_some() {
            return Err(NormalizeError::DuplicateColumn {
                field: field.as_str().to_string(),
                symbol,
            });
        }
        *slot = Some(values);
    }

    let mut rows = Vec::new();
    for (symbol, columns) in &by_symbol {
        let has_data = columns
            .iter()
            .flatten()
            .any(|values| values.iter().any(Option::is_some));
        if !has_data {
            continue;
        }
        let get = |field: PriceField, i: usize| -> Option<f64> {
            columns[field.index()].as_ref().and_then(|v| v[i])
        };
        for (i, date) in dates.iter().enumerate() {
            rows.push(PriceBar {
                date: *date,
                ticker: symbol.clone(),
                open: get(PriceField::Open, i),
                high: get(PriceField::High, i),
                low: get(PriceField::Low, i),
                close: get(PriceField::Close, i),
                adj_close: get(PriceField::AdjClose, i),
                volume: get(PriceField::Volume, i).map(|v| v as i64),
            });
        }
    }
    rows.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.ticker.cmp(&b.ticker)));
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn june() -> FetchWindow {
        FetchWindow {
            start: d("2024-06-01"),
            end: d("2024-06-30"),
        }
    }

    #[test]
    fn field_names_are_canonicalized() {
        assert_eq!(canonical_field_name("Adj Close"), "adj_close");
        assert_eq!(canonical_field_name("  Stock  Splits "), "stock_splits");
        assert_eq!(canonical_field_name("adj-close"), "adj_close");
        assert_eq!(canonical_field_name("VOLUME"), "volume");
        assert_eq!(
            PriceField::from_canonical(&canonical_field_name("Adjusted Close")),
            Some(PriceField::AdjClose)
        );
        assert_eq!(PriceField::from_canonical("dividends"), None);
    }

    #[test]
    fn date_labels_keep_the_written_day() {
        assert_eq!(coerce_date("2024-06-11").unwrap(), d("2024-06-11"));
        assert_eq!(coerce_date("2024-06-11 00:00:00").unwrap(), d("2024-06-11"));
        assert_eq!(
            coerce_date("2024-06-11T13:30:00.250").unwrap(),
            d("2024-06-11")
        );
        assert_eq!(
            coerce_date("2024-06-11T23:30:00-04:00").unwrap(),
            d("2024-06-11")
        );
        assert!(matches!(
            coerce_date("11/06/2024"),
            Err(NormalizeError::BadDate { .. })
        ));
    }

    #[test]
    fn batch_frame_flattens_to_dates_times_symbols() {
        let mut frame = BarFrame::new(vec!["2024-06-12".into(), "2024-06-11".into()]);
        for sym in ["MSFT", "AAPL"] {
            frame.push_column("Open", Some(sym), vec![Some(2.0), Some(1.0)]);
            frame.push_column("Close", Some(sym), vec![Some(2.5), None]);
            frame.push_column("Volume", Some(sym), vec![Some(10.0), Some(f64::NAN)]);
            frame.push_column("Dividends", Some(sym), vec![Some(0.0), Some(0.0)]);
        }
        let rows = normalize_frame(&frame, &["AAPL".into(), "MSFT".into()], &june()).unwrap();

        assert_eq!(rows.len(), 4);
        let keys: Vec<(String, &str)> = rows
            .iter()
            .map(|r| (r.date.to_string(), r.ticker.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("2024-06-11".to_string(), "AAPL"),
                ("2024-06-11".to_string(), "MSFT"),
                ("2024-06-12".to_string(), "AAPL"),
                ("2024-06-12".to_string(), "MSFT"),
            ]
        );
        assert_eq!(rows[0].close, None);
        assert_eq!(rows[0].volume, None);
        assert_eq!(rows[0].high, None);
        assert_eq!(rows[2].volume, Some(10));
    }

    #[test]
    fn symbol_without_any_value_is_dropped() {
        let mut frame = BarFrame::new(vec!["2024-06-11".into()]);
        frame.push_column("Close", Some("AAPL"), vec![Some(1.0)]);
        frame.push_column("Close", Some("ZZZZ"), vec![None]);
        frame.push_column("Dividends", Some("ZZZZ"), vec![Some(1.0)]);
        let rows = normalize_frame(&frame, &["AAPL".into(), "ZZZZ".into()], &june()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ticker, "AAPL");
    }

    #[test]
    fn flat_frame_uses_the_single_requested_symbol() {
        let mut frame = BarFrame::new(vec!["2024-06-11 00:00:00".into()]);
        frame.push_column("Close", None, vec![Some(3.0)]);
        let rows = normalize_frame(&frame, &["META".into()], &june()).unwrap();
        assert_eq!(rows[0].ticker, "META");

        let err = normalize_frame(&frame, &["META".into(), "AAPL".into()], &june()).unwrap_err();
        assert_eq!(err, NormalizeError::AmbiguousFlatFrame { requested: 2 });
    }

    #[test]
    fn malformed_frames_are_rejected() {
        let mut dup = BarFrame::new(vec!["2024-06-11".into(), "2024-06-11 00:00:00".into()]);
        dup.push_column("Close", Some("AAPL"), vec![Some(1.0), Some(1.0)]);
        assert!(matches!(
            normalize_frame(&dup, &[], &june()),
            Err(NormalizeError::DuplicateDate { .. })
        ));

        let mut short = BarFrame::new(vec!["2024-06-11".into(), "2024-06-12".into()]);
        short.push_column("Close", Some("AAPL"), vec![Some(1.0)]);
        assert!(matches!(
            normalize_frame(&short, &[], &june()),
            Err(NormalizeError::ColumnLength { expected: 2, got: 1, .. })
        ));

        let mut twice = BarFrame::new(vec!["2024-06-11".into()]);
        twice.push_column("Adj Close", Some("AAPL"), vec![Some(1.0)]);
        twice.push_column("adjusted_close", Some("AAPL"), vec![Some(1.0)]);
        assert!(matches!(
            normalize_frame(&twice, &[], &june()),
            Err(NormalizeError::DuplicateColumn { .. })
        ));

        let mut negative = BarFrame::new(vec!["2024-06-11".into()]);
        negative.push_column("Low", Some("AAPL"), vec![Some(-0.5)]);
        assert!(matches!(
            normalize_frame(&negative, &[], &june()),
            Err(NormalizeError::NegativePrice { field: "low", .. })
        ));

        let mut fractional = BarFrame::new(vec!["2024-06-11".into()]);
        fractional.push_column("Volume", Some("AAPL"), vec![Some(10.5)]);
        assert!(matches!(
            normalize_frame(&fractional, &[], &june()),
            Err(NormalizeError::BadVolume { .. })
        ));

        // i64::MAX rounds up to 2^63 as f64; casting that back would saturate.
        let mut huge = BarFrame::new(vec!["2024-06-11".into()]);
        huge.push_column("Volume", Some("AAPL"), vec![Some(9_223_372_036_854_775_808.0)]);
        assert!(matches!(
            normalize_frame(&huge, &[], &june()),
            Err(NormalizeError::BadVolume { .. })
        ));
    }

    #[test]
    fn dates_outside_the_window_are_rejected() {
        let mut frame = BarFrame::new(vec!["2024-06-11".into(), "2024-07-01".into()]);
        frame.push_column("Close", Some("AAPL"), vec![Some(1.0), Some(2.0)]);
        assert_eq!(
            normalize_frame(&frame, &[], &june()),
            Err(NormalizeError::OutOfWindow {
                date: d("2024-07-01"),
                window: june(),
            })
        );

        let early = FetchWindow {
            start: d("2024-06-12"),
            end: d("2024-06-30"),
        };
        assert!(matches!(
            normalize_frame(&frame, &[], &early),
            Err(NormalizeError::OutOfWindow { date, .. }) if date == d("2024-06-11")
        ));
    }

    proptest! {
        #[test]
        fn canonical_name_is_idempotent(raw in "[ A-Za-z_.-]{0,16}") {
            let once = canonical_field_name(&raw);
            prop_assert_eq!(canonical_field_name(&once), once.clone());
            prop_assert!(!once.contains("__"));
            prop_assert!(!once.chars().any(|c| c.is_ascii_uppercase() || c == ' '));
        }
    }
}
