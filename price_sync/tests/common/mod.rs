#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use diesel::QueryableByName;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Text};
use market_data_ingestor::models::{frame::BarFrame, request_params::BarsRequestParams};
use market_data_ingestor::providers::{ApiSnafu, DataProvider, ProviderError};
use price_sync::db::connection;
use price_sync::models::PriceBar;
use price_sync::store::{HighWaterMark, PriceRepo, SqliteRepo, StoreError, StoreResult};
use tempfile::TempDir;

#[derive(QueryableByName)]
struct JournalMode {
    #[diesel(sql_type = Text)]
    journal_mode: String,
}
#[derive(QueryableByName)]
struct BusyTimeout {
    #[diesel(sql_type = Integer, column_name = "timeout")]
    busy_timeout: i32,
}

pub struct TestDb {
    _dir: TempDir,    // keep alive for the life of the test
    pub path: String, // <tmpdir>/test.db
}

/// Fresh database file with no price table.
pub fn setup_db() -> (TestDb, SqliteConnection) {
    let dir = TempDir::new().expect("tempdir");
    let mut p = PathBuf::from(dir.path());
    p.push("test.db");
    let path = p.to_string_lossy().to_string();

    let conn = connection::connect_sqlite(&path).expect("connect");
    (TestDb { _dir: dir, path }, conn)
}

pub fn assert_sqlite_pragmas(conn: &mut SqliteConnection) {
    use diesel::sql_query;

    let jm: JournalMode = sql_query("PRAGMA journal_mode;").get_result(conn).unwrap();
    assert_eq!(jm.journal_mode.to_lowercase(), "wal"); // WAL is persistent per DB file

    let bt: BusyTimeout = sql_query("PRAGMA busy_timeout;").get_result(conn).unwrap();
    assert_eq!(bt.busy_timeout, 5000);
}

pub fn d(s: &str) -> NaiveDate {
    s.parse().expect("date literal")
}

pub fn bar(date: &str, ticker: &str, close: f64) -> PriceBar {
    PriceBar {
        open: Some(close - 1.0),
        high: Some(close + 1.0),
        low: Some(close - 2.0),
        close: Some(close),
        adj_close: Some(close),
        volume: Some(1_000),
        ..PriceBar::empty(d(date), ticker)
    }
}

/// Monday to Friday in `[start, end]`.
pub fn weekdays(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}

/// Deterministic close for a symbol on a day.
pub fn close_for(symbol: &str, day: NaiveDate) -> f64 {
    let base: u32 = symbol.bytes().map(u32::from).sum();
    f64::from(base % 500) + f64::from(day.ordinal()) / 4.0
}

/// Yahoo-shaped batch frame: one column per (field, symbol) over trading days.
pub fn weekday_frame(symbols: &[String], start: NaiveDate, end: NaiveDate) -> BarFrame {
    let days = weekdays(start, end);
    let mut frame = BarFrame::new(days.iter().map(|day| format!("{day} 00:00:00")).collect());
    if days.is_empty() {
        return frame;
    }
    for symbol in symbols {
        let closes: Vec<Option<f64>> = days.iter().map(|day| Some(close_for(symbol, *day))).collect();
        let shifted = |delta: f64| -> Vec<Option<f64>> {
            closes.iter().map(|c| c.map(|v| v + delta)).collect()
        };
        frame.push_column("Open", Some(symbol.as_str()), shifted(-0.5));
        frame.push_column("High", Some(symbol.as_str()), shifted(1.0));
        frame.push_column("Low", Some(symbol.as_str()), shifted(-1.0));
        frame.push_column("Close", Some(symbol.as_str()), closes.clone());
        frame.push_column("Adj Close", Some(symbol.as_str()), shifted(-0.25));
        frame.push_column("Volume", Some(symbol.as_str()), vec![Some(1_000_000.0); days.len()]);
    }
    frame
}

/// Provider backed by a synthetic market that trades on weekdays only.
#[derive(Default)]
pub struct MarketProvider {
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<BarsRequestParams>>,
}

impl MarketProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<BarsRequestParams> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl DataProvider for MarketProvider {
    fn name(&self) -> &str {
        "market"
    }

    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<BarFrame, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(params.clone());
        Ok(weekday_frame(&params.symbols, params.start, params.end))
    }
}

/// Hands out one prepared answer per call.
pub struct ScriptedProvider {
    answers: Mutex<Vec<Result<BarFrame, ProviderError>>>,
    pub calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(mut answers: Vec<Result<BarFrame, ProviderError>>) -> Self {
        answers.reverse();
        Self {
            answers: Mutex::new(answers),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn frame(frame: BarFrame) -> Self {
        Self::new(vec![Ok(frame)])
    }

    pub fn api_error(message: &str) -> Self {
        Self::new(vec![
            ApiSnafu {
                message: message.to_string(),
            }
            .fail(),
        ])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataProvider for ScriptedProvider {
    async fn fetch_bars(&self, _params: BarsRequestParams) -> Result<BarFrame, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .lock()
            .unwrap()
            .pop()
            .expect("scripted provider called more often than scripted")
    }
}

/// Answers after `delay`; used with a paused tokio clock.
pub struct SlowProvider(pub Duration);

#[async_trait]
impl DataProvider for SlowProvider {
    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<BarFrame, ProviderError> {
        tokio::time::sleep(self.0).await;
        Ok(weekday_frame(&params.symbols, params.start, params.end))
    }
}

/// Reads like [`SqliteRepo`], refuses every write.
pub struct ReadOnlyRepo;

impl PriceRepo for ReadOnlyRepo {
    fn read_high_water_mark(&self, conn: &mut SqliteConnection) -> HighWaterMark {
        SqliteRepo::new().read_high_water_mark(conn)
    }

    fn replace_all(&self, _conn: &mut SqliteConnection, _rows: &[PriceBar]) -> StoreResult<usize> {
        Err(StoreError::Database(diesel::result::Error::RollbackTransaction))
    }

    fn append(&self, _conn: &mut SqliteConnection, _rows: &[PriceBar]) -> StoreResult<usize> {
        Err(StoreError::Database(diesel::result::Error::RollbackTransaction))
    }

    fn read_all(&self, conn: &mut SqliteConnection) -> StoreResult<Vec<PriceBar>> {
        SqliteRepo::new().read_all(conn)
    }

    fn row_count(&self, conn: &mut SqliteConnection) -> StoreResult<i64> {
        SqliteRepo::new().row_count(conn)
    }

    fn verify_dashboard_columns(&self, conn: &mut SqliteConnection) -> StoreResult<()> {
        SqliteRepo::new().verify_dashboard_columns(conn)
    }
}
