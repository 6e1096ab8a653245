//! Database utilities.
//!
//! - [`connection::connect_sqlite`] opens the price store with WAL and a 5000ms busy_timeout.
//!
//! The store owns its schema: there are no migrations to run. The `stock_prices`
//! table is (re)created by a full rebuild, see
//! [`PriceRepo::replace_all`](crate::store::PriceRepo::replace_all).

pub mod connection;
