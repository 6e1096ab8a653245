//! Table definition for the persisted price table.
//!
//! `date` is stored as ISO `YYYY-MM-DD` text, which keeps `MAX(date)` a plain
//! lexicographic comparison.

diesel::table! {
    stock_prices (date, ticker) {
        date -> Date,
        ticker -> Text,
        open -> Nullable<Double>,
        high -> Nullable<Double>,
        low -> Nullable<Double>,
        close -> Nullable<Double>,
        adj_close -> Nullable<Double>,
        volume -> Nullable<BigInt>,
    }
}

/// Logical table name; one table holds all symbols.
pub const TABLE_NAME: &str = "stock_prices";

/// DDL used by a full rebuild. Must stay in sync with [`stock_prices`].
pub const CREATE_STOCK_PRICES: &str = "
CREATE TABLE stock_prices (
    date      TEXT   NOT NULL,
    ticker    TEXT   NOT NULL,
    open      REAL,
    high      REAL,
    low       REAL,
    close     REAL,
    adj_close REAL,
    volume    BIGINT,
    PRIMARY KEY (date, ticker)
);
CREATE INDEX idx_stock_prices_ticker ON stock_prices (ticker);
";

/// Columns the dashboard cannot render without.
pub const DASHBOARD_COLUMNS: [&str; 4] = ["date", "ticker", "close", "volume"];
