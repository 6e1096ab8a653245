//! Store adapter over the single `stock_prices` table (SQLite).
//!
//! State of the table as a whole: `Absent -> replace_all -> Populated`,
//! `Populated -> append -> Populated`, `Populated -> replace_all -> Populated`.
//! Individual rows are never removed.
use chrono::NaiveDate;

use crate::models::PriceBar;

pub mod repo;

pub use repo::SqliteRepo;

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while interacting with the price store.
pub enum StoreError {
    /// The engine rejected a statement (constraint violation, missing table, I/O).
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    /// The database could not be opened.
    #[error("cannot open database: {0}")]
    Connection(#[from] diesel::ConnectionError),
    /// The table is missing a column the dashboard needs.
    #[error("table `stock_prices` has no `{column}` column")]
    MissingColumn {
        /// First required column that was not found.
        column: String,
    },
}

/// Result type used throughout the store for fallible operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Latest stored date, derived fresh on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighWaterMark {
    Present(NaiveDate),
    /// Table missing, empty, unreadable or not in the canonical shape.
    Absent,
}

impl HighWaterMark {
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            HighWaterMark::Present(d) => Some(*d),
            HighWaterMark::Absent => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, HighWaterMark::Present(_))
    }
}

impl From<Option<NaiveDate>> for HighWaterMark {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map_or(HighWaterMark::Absent, HighWaterMark::Present)
    }
}

/// Portable surface, SQLite implementation lives in `repo.rs`.
///
/// Each write is one call covering the whole batch; implementations must make
/// it atomic.
pub trait PriceRepo {
    /// Maximum stored `date`, or [`HighWaterMark::Absent`]. Never fails: a store
    /// that cannot answer is treated as having no data.
    fn read_high_water_mark(&self, conn: &mut diesel::SqliteConnection) -> HighWaterMark;

    /// Atomically discards prior contents (and schema) and stores `rows`.
    fn replace_all(
        &self,
        conn: &mut diesel::SqliteConnection,
        rows: &[PriceBar],
    ) -> StoreResult<usize>;

    /// Atomically adds `rows` without touching existing ones.
    fn append(&self, conn: &mut diesel::SqliteConnection, rows: &[PriceBar])
    -> StoreResult<usize>;

    /// Full scan, newest date first, then ticker.
    fn read_all(&self, conn: &mut diesel::SqliteConnection) -> StoreResult<Vec<PriceBar>>;

    /// Number of stored rows; zero when the table does not exist.
    fn row_count(&self, conn: &mut diesel::SqliteConnection) -> StoreResult<i64>;

    /// Checks the columns the dashboard requires are present.
    fn verify_dashboard_columns(&self, conn: &mut diesel::SqliteConnection) -> StoreResult<()>;
}
