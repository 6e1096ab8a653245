//! SQLite connection helpers.
//!
//! Provides [`connect_sqlite`] that opens a connection and applies the PRAGMAs the
//! store relies on: WAL journaling (readers such as the dashboard never block the
//! writer) and a 5000ms busy_timeout.
//!
//! Example:
//! ```no_run
//! use price_sync::db::connection::connect_sqlite;
//!
//! let path = std::env::temp_dir().join("price_sync_example.db");
//! let _conn = connect_sqlite(path.to_str().unwrap()).expect("open sqlite");
//! ```

use diesel::{Connection, RunQueryDsl, SqliteConnection, sql_query};

use crate::store::StoreError;

/// Open a SQLite connection and apply connection-wide PRAGMAs.
///
/// A missing database file is created empty; the table itself only appears on
/// the first full rebuild.
pub fn connect_sqlite(database_url: &str) -> Result<SqliteConnection, StoreError> {
    let mut conn = SqliteConnection::establish(database_url)?;

    sql_query("PRAGMA journal_mode=WAL;").execute(&mut conn)?;
    sql_query("PRAGMA busy_timeout=5000;").execute(&mut conn)?;
    Ok(conn)
}
