use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, NaiveTime};
use indexmap::IndexMap;
use reqwest::Client;
use snafu::ResultExt;

use crate::{
    models::{frame::BarFrame, request_params::BarsRequestParams},
    providers::{
        ApiSnafu, ClientBuildSnafu, DataProvider, MalformedResponseSnafu, ProviderError,
        ProviderInitError, ReqwestSnafu, ValidationSnafu,
        validate_params,
        yahoo::response::{ChartResponse, QuoteData},
    },
};

const BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Column labels in the order they are emitted, Yahoo-style casing.
const FIELDS: [&str; 6] = ["Open", "High", "Low", "Close", "Adj Close", "Volume"];

/// One day of values in [`FIELDS`] order.
pub(crate) type DayValues = [Option<f64>; 6];

/// Per-symbol daily values keyed by calendar date.
pub(crate) type SymbolBars = BTreeMap<NaiveDate, DayValues>;

pub struct YahooProvider {
    client: Client,
    base_url: String,
}

impl YahooProvider {
    /// Creates a new Yahoo provider. No credentials are needed.
    pub fn new() -> Result<Self, ProviderInitError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Fetch one symbol. `Ok(None)` means Yahoo does not know the symbol.
    async fn fetch_symbol(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<SymbolBars>, ProviderError> {
        let (period1, period2) = period_bounds(start, end)?;
        let url = format!("{}/{}", self.base_url, urlencoding::encode(symbol));

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("includeAdjustedClose", "true".to_string()),
            ])
            .send()
            .await
            .context(ReqwestSnafu)?;

        let status = response.status();
        let body = response.text().await.context(ReqwestSnafu)?;

        match serde_json::from_str::<ChartResponse>(&body) {
            Ok(chart) => {
                let parsed = parse_chart(symbol, chart, start, end)?;
                if parsed.is_some() && !status.is_success() {
                    return ApiSnafu {
                        message: format!("HTTP {status} for {symbol}"),
                    }
                    .fail();
                }
                Ok(parsed)
            }
            Err(_) if !status.is_success() => ApiSnafu {
                message: format!("HTTP {status} for {symbol}"),
            }
            .fail(),
            Err(e) => MalformedResponseSnafu {
                message: format!("failed to parse chart response for {symbol}: {e}"),
            }
            .fail(),
        }
    }
}

#[async_trait]
impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<BarFrame, ProviderError> {
        validate_params(&params)?;

        let mut all_bars: IndexMap<String, SymbolBars> = IndexMap::new();
        for symbol in &params.symbols {
            match self.fetch_symbol(symbol, params.start, params.end).await? {
                Some(bars) => {
                    tracing::debug!(symbol = %symbol, bars = bars.len(), "yahoo chart fetched");
                    all_bars.insert(symbol.clone(), bars);
                }
                None => tracing::warn!(symbol = %symbol, "yahoo does not know symbol, skipping"),
            }
        }

        Ok(assemble_frame(all_bars))
    }
}

/// Translate the inclusive `[start, end]` day range into Yahoo's
/// `[period1, period2)` unix-second range.
pub(crate) fn period_bounds(start: NaiveDate, end: NaiveDate) -> Result<(i64, i64), ProviderError> {
    let after_end = end.checked_add_days(Days::new(1)).ok_or_else(|| {
        ValidationSnafu {
            message: format!("end date {end} is out of range"),
        }
        .build()
    })?;
    let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
    let period2 = after_end.and_time(NaiveTime::MIN).and_utc().timestamp();
    Ok((period1, period2))
}

/// Turn one chart payload into daily values inside `[start, end]`.
pub(crate) fn parse_chart(
    symbol: &str,
    chart: ChartResponse,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Option<SymbolBars>, ProviderError> {
    if let Some(err) = chart.chart.error {
        if err.code == "Not Found" {
            return Ok(None);
        }
        return ApiSnafu {
            message: format!("{symbol}: {}: {}", err.code, err.description),
        }
        .fail();
    }

    let data = chart
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| {
            MalformedResponseSnafu {
                message: format!("{symbol}: empty result with no error"),
            }
            .build()
        })?;

    // No timestamps at all: the range had no trading days.
    let Some(timestamps) = data.timestamp else {
        return Ok(Some(SymbolBars::new()));
    };

    let gmtoffset = data.meta.map(|m| m.gmtoffset).unwrap_or(0);
    let quote: QuoteData = match data.indicators.quote.into_iter().next() {
        Some(q) => q,
        None if timestamps.is_empty() => return Ok(Some(SymbolBars::new())),
        None => {
            return MalformedResponseSnafu {
                message: format!("{symbol}: timestamps without quote data"),
            }
            .fail();
        }
    };
    let adj_closes = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose);

    let mut bars = SymbolBars::new();
    for (i, &ts) in timestamps.iter().enumerate() {
        let date = ts
            .checked_add(gmtoffset)
            .and_then(|local| DateTime::from_timestamp(local, 0))
            .map(|dt| dt.date_naive())
            .ok_or_else(|| {
                MalformedResponseSnafu {
                    message: format!("{symbol}: invalid timestamp {ts}"),
                }
                .build()
            })?;

        // Yahoo sometimes appends the live bar past period2.
        if date < start || date > end {
            continue;
        }

        let at = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
        let values: DayValues = [
            at(&quote.open),
            at(&quote.high),
            at(&quote.low),
            at(&quote.close),
            adj_closes.as_ref().and_then(at),
            at(&quote.volume),
        ];

        if values.iter().all(Option::is_none) {
            continue;
        }
        bars.insert(date, values);
    }

    Ok(Some(bars))
}

/// Stitch per-symbol answers into one multi-instrument frame.
///
/// Symbols without any bar get no columns at all.
pub(crate) fn assemble_frame(all_bars: IndexMap<String, SymbolBars>) -> BarFrame {
    let dates: BTreeSet<NaiveDate> = all_bars.values().flat_map(|b| b.keys().copied()).collect();
    let index = dates.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect();
    let mut frame = BarFrame::new(index);

    for (symbol, bars) in all_bars.iter().filter(|(_, b)| !b.is_empty()) {
        for (slot, field) in FIELDS.iter().enumerate() {
            let values = dates
                .iter()
                .map(|d| bars.get(d).and_then(|v| v[slot]))
                .collect();
            frame.push_column(*field, Some(symbol.as_str()), values);
        }
    }
    frame
}
