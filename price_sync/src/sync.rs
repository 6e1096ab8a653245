//! Incremental synchronization of the price table.
//!
//! One run is one sequential pipeline:
//! read high-water mark -> plan window -> fetch -> normalize -> write.
//!
//! The only failure recovered locally is an absent or unreadable store, which
//! switches the run to full-rebuild mode. Everything else comes back as a
//! [`SyncResult`] variant; nothing is retried and nothing is partially written.

use std::fmt;

use chrono::NaiveDate;
use diesel::SqliteConnection;
use market_data_ingestor::models::request_params::BarsRequestParams;
use market_data_ingestor::providers::{DataProvider, ProviderError};
use serde::Serialize;

use crate::normalize::{NormalizeError, normalize_frame};
use crate::store::{PriceRepo, StoreError};
use crate::window::FetchWindow;

/// Raised when no usable symbol remains after cleanup.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("at least one non-blank symbol is required")]
pub struct EmptySymbolSet;

/// Non-empty, trimmed, upper-cased, de-duplicated instrument identifiers.
///
/// Insertion order is kept; it is the order symbols are sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolSet(Vec<String>);

impl SymbolSet {
    pub fn new<I, S>(symbols: I) -> Result<Self, EmptySymbolSet>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for raw in symbols {
            let s = raw.as_ref().trim().to_ascii_uppercase();
            if !s.is_empty() && !out.contains(&s) {
                out.push(s);
            }
        }
        if out.is_empty() {
            return Err(EmptySymbolSet);
        }
        Ok(Self(out))
    }

    /// Comma-separated list, e.g. `"aapl, MSFT"`.
    pub fn parse_list(list: &str) -> Result<Self, EmptySymbolSet> {
        Self::new(list.split(','))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SymbolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

/// Inputs of one run. `today` is the caller's clock.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub symbols: SymbolSet,
    /// Start date used only when the store has no data.
    pub epoch: NaiveDate,
    pub today: NaiveDate,
}

/// Which write path a run took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WriteMode {
    /// No high-water mark: the table was rebuilt.
    Replace,
    /// High-water mark present: rows were added after it.
    Append,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WriteMode::Replace => "replace",
            WriteMode::Append => "append",
        })
    }
}

/// Why the fetch stage of a run failed.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// The provider answered, but not in a shape that can become rows.
    #[error("malformed provider response: {0}")]
    Malformed(#[from] NormalizeError),
}

/// Coarse outcome, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncStatus {
    UpToDate,
    NoData,
    Updated,
    FetchFailed,
    WriteFailed,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncStatus::UpToDate => "up-to-date",
            SyncStatus::NoData => "no-data",
            SyncStatus::Updated => "updated",
            SyncStatus::FetchFailed => "fetch-failed",
            SyncStatus::WriteFailed => "write-failed",
        })
    }
}

/// Outcome of one run. Only [`SyncResult::Updated`] changes persisted state.
#[derive(Debug)]
pub enum SyncResult {
    /// Window was empty; the provider was not called.
    UpToDate { high_water_mark: Option<NaiveDate> },
    /// Provider had nothing for the window (weekend, holiday).
    NoData { window: FetchWindow },
    Updated {
        rows_written: usize,
        through: NaiveDate,
        mode: WriteMode,
    },
    FetchFailed {
        window: FetchWindow,
        error: FetchError,
    },
    WriteFailed { mode: WriteMode, error: StoreError },
}

impl SyncResult {
    pub fn status(&self) -> SyncStatus {
        match self {
            SyncResult::UpToDate { .. } => SyncStatus::UpToDate,
            SyncResult::NoData { .. } => SyncStatus::NoData,
            SyncResult::Updated { .. } => SyncStatus::Updated,
            SyncResult::FetchFailed { .. } => SyncStatus::FetchFailed,
            SyncResult::WriteFailed { .. } => SyncStatus::WriteFailed,
        }
    }

    pub fn rows_written(&self) -> usize {
        match self {
            SyncResult::Updated { rows_written, .. } => *rows_written,
            _ => 0,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SyncResult::FetchFailed { .. } | SyncResult::WriteFailed { .. }
        )
    }
}

impl fmt::Display for SyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncResult::UpToDate {
                high_water_mark: Some(hwm),
            } => write!(f, "up to date (latest stored date {hwm})"),
            SyncResult::UpToDate {
                high_water_mark: None,
            } => write!(f, "up to date (epoch is in the future)"),
            SyncResult::NoData { window } => write!(f, "no data for {window}"),
            SyncResult::Updated {
                rows_written,
                through,
                mode,
            } => write!(f, "updated: {rows_written} rows through {through} ({mode})"),
            SyncResult::FetchFailed { window, error } => {
                write!(f, "fetch failed for {window}: {error}")
            }
            SyncResult::WriteFailed { mode, error } => write!(f, "write failed ({mode}): {error}"),
        }
    }
}

/// Bring the stored table up to `request.today`.
///
/// At most one provider call and one write call are made. The fetch window
/// starts strictly after the stored high-water mark, so an append never
/// re-inserts a stored `(date, ticker)`.
#[tracing::instrument(skip_all, fields(symbols = %request.symbols, today = %request.today))]
pub async fn sync<R, P>(
    conn: &mut SqliteConnection,
    repo: &R,
    provider: &P,
    request: &SyncRequest,
) -> SyncResult
where
    R: PriceRepo + ?Sized,
    P: DataProvider + ?Sized,
{
    let hwm = repo.read_high_water_mark(conn);
    tracing::debug!(high_water_mark = ?hwm.as_date(), "read high-water mark");

    let Some(window) = FetchWindow::plan(hwm.as_date(), request.epoch, request.today) else {
        tracing::info!(high_water_mark = ?hwm.as_date(), "already up to date");
        return SyncResult::UpToDate {
            high_water_mark: hwm.as_date(),
        };
    };
    let mode = if hwm.is_present() {
        WriteMode::Append
    } else {
        WriteMode::Replace
    };
    tracing::debug!(%window, days = window.days(), %mode, "planned fetch window");

    let params = BarsRequestParams::new(request.symbols.as_slice().to_vec(), window.start, window.end);
    let frame = match provider.fetch_bars(params).await {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(provider = provider.name(), error = %e, %window, "fetch failed");
            return SyncResult::FetchFailed {
                window,
                error: e.into(),
            };
        }
    };
    if frame.is_empty() {
        tracing::info!(%window, "provider returned no data");
        return SyncResult::NoData { window };
    }

    let rows = match normalize_frame(&frame, request.symbols.as_slice(), &window) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(error = %e, %window, "provider response rejected");
            return SyncResult::FetchFailed {
                window,
                error: e.into(),
            };
        }
    };
    if rows.is_empty() {
        tracing::info!(%window, "provider returned no usable fields");
        return SyncResult::NoData { window };
    }

    let written = match mode {
        WriteMode::Replace => repo.replace_all(conn, &rows),
        WriteMode::Append => repo.append(conn, &rows),
    };
    match written {
        Ok(rows_written) => {
            tracing::info!(rows_written, through = %window.end, %mode, "price table updated");
            SyncResult::Updated {
                rows_written,
                through: window.end,
                mode,
            }
        }
        Err(error) => {
            tracing::warn!(%error, %mode, rows = rows.len(), "write failed");
            SyncResult::WriteFailed { mode, error }
        }
    }
}
