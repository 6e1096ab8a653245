use chrono::NaiveDate;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_types::{Nullable, Text};

use crate::{
    models::PriceBar,
    schema::{self, CREATE_STOCK_PRICES, DASHBOARD_COLUMNS, stock_prices},
    store::{HighWaterMark, PriceRepo, StoreError, StoreResult},
};

/// Rows per multi-row INSERT. 8 bound parameters per row keeps each statement
/// under SQLite's historical 999-variable limit.
const INSERT_CHUNK_ROWS: usize = 120;

/// Columns a table must carry, spelled exactly, to count as canonical.
const CANONICAL_COLUMNS: [&str; 8] = [
    "date",
    "ticker",
    "open",
    "high",
    "low",
    "close",
    "adj_close",
    "volume",
];

#[derive(QueryableByName)]
struct ColumnName {
    #[diesel(sql_type = Text)]
    name: String,
}

#[derive(QueryableByName)]
struct MaxDate {
    #[diesel(sql_type = Nullable<Text>)]
    max_date: Option<String>,
}

/// Repository for the price table in a SQLite database.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteRepo;

impl SqliteRepo {
    pub fn new() -> Self {
        Self
    }
}

fn table_columns(conn: &mut SqliteConnection) -> QueryResult<Vec<String>> {
    let rows: Vec<ColumnName> = diesel::sql_query(format!(
        "SELECT name FROM pragma_table_info('{}')",
        schema::TABLE_NAME
    ))
    .load(conn)?;
    Ok(rows.into_iter().map(|c| c.name).collect())
}

/// Strict `YYYY-MM-DD`; anything longer (timestamps) is a drifted layout.
fn parse_canonical_date(raw: &str) -> Option<NaiveDate> {
    if raw.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn insert_chunked(conn: &mut SqliteConnection, rows: &[PriceBar]) -> QueryResult<usize> {
    let mut written = 0;
    for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
        written += diesel::insert_into(stock_prices::table)
            .values(chunk)
            .execute(conn)?;
    }
    Ok(written)
}

impl PriceRepo for SqliteRepo {
    fn read_high_water_mark(&self, conn: &mut SqliteConnection) -> HighWaterMark {
        let columns = match table_columns(conn) {
            Ok(cols) => cols,
            Err(e) => {
                tracing::warn!(error = %e, "cannot inspect price table; treating store as absent");
                return HighWaterMark::Absent;
            }
        };
        if columns.is_empty() {
            tracing::debug!("price table does not exist");
            return HighWaterMark::Absent;
        }
        if let Some(missing) = CANONICAL_COLUMNS
            .iter()
            .find(|c| !columns.iter().any(|have| have == *c))
        {
            tracing::warn!(
                column = *missing,
                "price table is not in canonical layout; a full rebuild will follow"
            );
            return HighWaterMark::Absent;
        }

        let max: MaxDate = match diesel::sql_query("SELECT MAX(date) AS max_date FROM stock_prices")
            .get_result(conn)
        {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(error = %e, "high-water mark query failed; treating store as absent");
                return HighWaterMark::Absent;
            }
        };
        match max.max_date {
            None => {
                tracing::debug!("price table is empty");
                HighWaterMark::Absent
            }
            Some(raw) => match parse_canonical_date(&raw) {
                Some(date) => HighWaterMark::Present(date),
                None => {
                    tracing::warn!(
                        value = %raw,
                        "stored dates are not YYYY-MM-DD; a full rebuild will follow"
                    );
                    HighWaterMark::Absent
                }
            },
        }
    }

    fn replace_all(&self, conn: &mut SqliteConnection, rows: &[PriceBar]) -> StoreResult<usize> {
        let written = conn.immediate_transaction::<_, StoreError, _>(|conn| {
            conn.batch_execute("DROP TABLE IF EXISTS stock_prices;")?;
            conn.batch_execute(CREATE_STOCK_PRICES)?;
            Ok(insert_chunked(conn, rows)?)
        })?;
        tracing::debug!(rows = written, "price table rebuilt");
        Ok(written)
    }

    fn append(&self, conn: &mut SqliteConnection, rows: &[PriceBar]) -> StoreResult<usize> {
        let written = conn.immediate_transaction::<_, StoreError, _>(|conn| {
            Ok(insert_chunked(conn, rows)?)
        })?;
        tracing::debug!(rows = written, "rows appended to price table");
        Ok(written)
    }

    fn read_all(&self, conn: &mut SqliteConnection) -> StoreResult<Vec<PriceBar>> {
        use crate::schema::stock_prices::dsl::*;

        Ok(stock_prices
            .select(PriceBar::as_select())
            .order((date.desc(), ticker.asc()))
            .load(conn)?)
    }

    fn row_count(&self, conn: &mut SqliteConnection) -> StoreResult<i64> {
        if table_columns(conn)?.is_empty() {
            return Ok(0);
        }
        Ok(stock_prices::table.count().get_result(conn)?)
    }

    fn verify_dashboard_columns(&self, conn: &mut SqliteConnection) -> StoreResult<()> {
        let columns = table_columns(conn)?;
        match DASHBOARD_COLUMNS
            .iter()
            .find(|c| !columns.iter().any(|have| have.eq_ignore_ascii_case(c)))
        {
            Some(missing) => Err(StoreError::MissingColumn {
                column: (*missing).to_string(),
            }),
            None => Ok(()),
        }
    }
}
