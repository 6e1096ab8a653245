use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use diesel::SqliteConnection;
use market_data_ingestor::providers::{DataProvider, deadline::Deadline, yahoo::YahooProvider};
use price_sync::{
    config::{Config, apply_env_overrides, load_config_path},
    db::connection::connect_sqlite,
    store::{HighWaterMark, PriceRepo, SqliteRepo},
    sync::{SymbolSet, SyncRequest, SyncResult, sync},
    tz, view,
};

#[derive(Parser)]
#[command(version, about = "Keep a local table of daily stock prices up to date")]
struct Cli {
    /// TOML config file; built-in defaults otherwise.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// SQLite database path; overrides config and PRICE_SYNC_DATABASE.
    #[arg(long, global = true, value_name = "PATH")]
    database: Option<String>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Fetch everything after the latest stored date.
    Sync {
        /// Comma-separated symbols, e.g. AAPL,MSFT.
        #[arg(long, value_name = "A,B")]
        symbols: Option<String>,
        /// Start date when the store is empty.
        #[arg(long, value_name = "YYYY-MM-DD")]
        epoch: Option<NaiveDate>,
        /// Last date to fetch (inclusive); today in the configured zone otherwise.
        #[arg(long, value_name = "YYYY-MM-DD")]
        today: Option<NaiveDate>,
    },
    /// Print the latest stored date and the row count.
    Status,
    /// Print stored rows the way the dashboard shows them.
    Show {
        #[arg(long, value_name = "A,B")]
        tickers: Option<String>,
        /// Hypothetical price change in percent.
        #[arg(
            long,
            default_value_t = 0,
            allow_hyphen_values = true,
            value_parser = clap::value_parser!(i64).range(view::ADJUSTMENT_PCT_RANGE)
        )]
        adjust: i64,
        /// Moving-average window in days.
        #[arg(
            long,
            default_value_t = view::DEFAULT_MA_WINDOW as i64,
            value_parser = clap::value_parser!(i64).range(view::MA_WINDOW_RANGE)
        )]
        ma: i64,
        /// Print at most this many rows.
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => load_config_path(path)?.0,
        None => {
            let mut cfg = Config::default();
            apply_env_overrides(&mut cfg);
            cfg
        }
    };
    if let Some(db) = &cli.database {
        cfg.database = db.clone();
    }
    Ok(cfg)
}

fn provider(cfg: &Config) -> Result<Box<dyn DataProvider + Send + Sync>> {
    let yahoo = YahooProvider::new().context("create Yahoo provider")?;
    Ok(match cfg.fetch_timeout() {
        Some(limit) => Box::new(Deadline::new(yahoo, limit)),
        None => Box::new(yahoo),
    })
}

async fn run_sync(
    conn: &mut SqliteConnection,
    cfg: &Config,
    request: &SyncRequest,
) -> Result<SyncResult> {
    let provider = provider(cfg)?;
    Ok(sync(conn, &SqliteRepo::new(), provider.as_ref(), request).await)
}

fn default_request(cfg: &Config) -> Result<SyncRequest> {
    Ok(SyncRequest {
        symbols: cfg.symbol_set()?,
        epoch: cfg.epoch,
        today: tz::today(cfg.tz()?),
    })
}

fn cell(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |x| format!("{x:.2}"))
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let cfg = load_config(&cli)?;
    let mut conn = connect_sqlite(&cfg.database)
        .with_context(|| format!("open database {}", cfg.database))?;
    let repo = SqliteRepo::new();

    match cli.cmd {
        Cmd::Sync {
            symbols,
            epoch,
            today,
        } => {
            let mut request = default_request(&cfg)?;
            if let Some(list) = symbols {
                request.symbols = SymbolSet::parse_list(&list).context("--symbols")?;
            }
            if let Some(epoch) = epoch {
                request.epoch = epoch;
            }
            if let Some(today) = today {
                request.today = today;
            }
            let result = run_sync(&mut conn, &cfg, &request).await?;
            println!("{result}");
            if result.is_failure() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Cmd::Status => {
            let hwm = repo.read_high_water_mark(&mut conn);
            let rows = repo
                .row_count(&mut conn)
                .context("cannot count stored rows; rerun `price-sync sync`")?;
            match hwm {
                HighWaterMark::Present(date) => println!("latest date: {date}"),
                HighWaterMark::Absent => println!("latest date: none"),
            }
            println!("rows: {rows}");
        }
        Cmd::Show {
            tickers,
            adjust,
            ma,
            limit,
        } => {
            let stored = repo
                .row_count(&mut conn)
                .context("cannot count stored rows; rerun `price-sync sync`")?;
            if stored == 0 {
                tracing::warn!("no stored data; pulling latest prices first");
                let result = run_sync(&mut conn, &cfg, &default_request(&cfg)?).await?;
                println!("{result}");
                if result.is_failure() {
                    return Ok(ExitCode::FAILURE);
                }
            }
            repo.verify_dashboard_columns(&mut conn)
                .context("stored table is unusable; rerun `price-sync sync`")?;

            let rows = repo
                .read_all(&mut conn)
                .context("cannot read stored prices; rerun `price-sync sync`")?;
            let selected = match tickers {
                Some(list) => SymbolSet::parse_list(&list)
                    .context("--tickers")?
                    .as_slice()
                    .to_vec(),
                None => view::tickers(&rows),
            };
            let filtered = view::filter_tickers(&rows, &selected);
            let adjusted = view::simulate_adjustment(&filtered, adjust as f64);

            println!("{adjust}% hypothetical adjustment");
            println!(
                "{:<10}  {:<6}  {:>10}  {:>10}  {:>12}",
                "date", "ticker", "close", "adjusted", "volume"
            );
            for row in adjusted.iter().take(limit.unwrap_or(usize::MAX)) {
                println!(
                    "{:<10}  {:<6}  {:>10}  {:>10}  {:>12}",
                    row.bar.date,
                    row.bar.ticker,
                    cell(row.bar.close),
                    cell(row.adjusted_close),
                    row.bar.volume.map_or_else(|| "-".to_string(), |v| v.to_string()),
                );
            }

            println!();
            println!("{ma}-day moving average of close");
            for ticker in &selected {
                let series = view::moving_average(&filtered, ticker, ma as usize);
                match series.last() {
                    Some((date, value)) => println!("{ticker:<6}  {date}  {:>10}", cell(*value)),
                    None => println!("{ticker:<6}  no data"),
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?
        .block_on(run(cli))
}
