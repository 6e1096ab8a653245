//! Incremental synchronization of daily equity prices into a local SQLite table.
//!
//! - [`sync::sync`] brings the table up to date from a
//!   [`DataProvider`](market_data_ingestor::providers::DataProvider).
//! - [`store`] owns the `stock_prices` table ([`store::PriceRepo`], [`store::SqliteRepo`]).
//! - [`normalize`] turns provider frames into [`models::PriceBar`] rows.
//! - [`view`] shapes stored rows for the dashboard.

pub mod config;
pub mod db;
pub mod models;
pub mod normalize;
pub mod schema;
pub mod store;
pub mod sync;
pub mod tz;
pub mod view;
pub mod window;
