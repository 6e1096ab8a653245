//! Provider-shaped tabular result of a batch bar request.
//!
//! A [`BarFrame`] is deliberately *not* normalized: it keeps whatever field
//! names, casing and date labels the upstream vendor uses, laid out the way a
//! multi-instrument batch download arrives (one column per `(field, symbol)`
//! pair over a shared date index). Turning it into one row per
//! `(date, symbol)` is the consumer's job.
//!
//! ```
//! use market_data_ingestor::models::frame::BarFrame;
//!
//! let mut frame = BarFrame::new(vec!["2024-06-11".into(), "2024-06-12".into()]);
//! frame.push_column("Close", Some("AAPL"), vec![Some(207.15), Some(213.07)]);
//! frame.push_column("Adj Close", Some("AAPL"), vec![Some(206.40), None]);
//! assert_eq!(frame.symbols(), vec!["AAPL"]);
//! assert!(!frame.is_empty());
//! ```

use serde::{Deserialize, Serialize};

/// One column of a [`BarFrame`]: a single provider field for a single symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Field name exactly as the provider spells it (e.g. `"Adj Close"`).
    pub field: String,
    /// Symbol the column belongs to; `None` for flat single-instrument frames.
    #[serde(default)]
    pub symbol: Option<String>,
    /// One entry per index row; `None` where the provider had no value.
    pub values: Vec<Option<f64>>,
}

/// Column-oriented batch result over a shared date index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BarFrame {
    /// Raw date labels (e.g. `2024-06-11`, `2024-06-11 00:00:00`, RFC 3339).
    pub index: Vec<String>,
    /// Columns in provider order.
    pub columns: Vec<Column>,
}

impl BarFrame {
    /// Create an empty frame over the given index.
    pub fn new(index: Vec<String>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    /// Append a column. Length is not checked here; consumers validate shape.
    pub fn push_column(
        &mut self,
        field: impl Into<String>,
        symbol: Option<&str>,
        values: Vec<Option<f64>>,
    ) {
        self.columns.push(Column {
            field: field.into(),
            symbol: symbol.map(str::to_string),
            values,
        });
    }

    /// `true` when the frame carries no usable observation at all.
    ///
    /// NaN counts as missing, the same way a dataframe would treat it.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
            || self
                .columns
                .iter()
                .all(|c| c.values.iter().all(|v| !matches!(v, Some(x) if !x.is_nan())))
    }

    /// Distinct symbols, in first-seen column order.
    pub fn symbols(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for sym in self.columns.iter().filter_map(|c| c.symbol.as_deref()) {
            if !out.contains(&sym) {
                out.push(sym);
            }
        }
        out
    }
}
