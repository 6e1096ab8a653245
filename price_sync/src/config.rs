//! Runtime configuration: parsing, normalization, and loading.
//!
//! A small TOML file describes what to synchronize and where to store it:
//!
//! ```toml
//! database = "stock_data.db"
//! symbols = ["AAPL", "MSFT", "GOOGL", "AMZN", "META"]
//! epoch = 2024-01-01
//! timezone = "America/New_York"   # optional, local clock otherwise
//! fetch_timeout_secs = 30         # optional, no deadline otherwise
//! ```
//!
//! Every key is optional; an empty file yields [`Config::default`].
//!
//! Key behaviors:
//! - Symbols are trimmed, upper-cased and de-duplicated while preserving order;
//!   blank entries are dropped and an empty list is rejected.
//! - `epoch` accepts a TOML date or a `"YYYY-MM-DD"` string.
//! - `timezone` must be a valid IANA name.
//! - `PRICE_SYNC_DATABASE`, when set and non-blank, replaces `database`
//!   (see [`apply_env_overrides`]). Command-line flags override both.
//!
//! Entrypoints:
//! - Parse + normalize from a TOML string: [`load_config_str`]
//! - Parse + normalize from a file path: [`load_config_path`]

use std::time::Duration;

use anyhow::{Context, bail};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer};
use toml::from_str;

use crate::sync::SymbolSet;

/// Environment variable that overrides [`Config::database`].
pub const DATABASE_ENV: &str = "PRICE_SYNC_DATABASE";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// SQLite database path.
    pub database: String,
    /// Instruments to keep in sync.
    pub symbols: Vec<String>,
    /// First date fetched when the store is empty.
    #[serde(deserialize_with = "de_date")]
    pub epoch: NaiveDate,
    /// IANA time zone used to decide "today".
    pub timezone: Option<String>,
    /// Deadline for the provider call, in seconds.
    pub fetch_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: "stock_data.db".to_string(),
            symbols: ["AAPL", "MSFT", "GOOGL", "AMZN", "META"]
                .into_iter()
                .map(String::from)
                .collect(),
            epoch: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN),
            timezone: None,
            fetch_timeout_secs: None,
        }
    }
}

impl Config {
    /// Configured symbols as a validated set.
    pub fn symbol_set(&self) -> anyhow::Result<SymbolSet> {
        SymbolSet::new(&self.symbols).context("config has no symbols")
    }

    /// Parsed `timezone`, if any.
    pub fn tz(&self) -> anyhow::Result<Option<Tz>> {
        self.timezone.as_deref().map(crate::tz::parse_tz).transpose()
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }
}

fn de_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match toml::Value::deserialize(deserializer)? {
        toml::Value::String(s) => s
            .trim()
            .parse::<NaiveDate>()
            .map_err(|e| D::Error::custom(format!("bad date `{s}`: {e}"))),
        toml::Value::Datetime(dt) => match (dt.date, dt.time) {
            (Some(d), None) => {
                NaiveDate::from_ymd_opt(i32::from(d.year), u32::from(d.month), u32::from(d.day))
                    .ok_or_else(|| D::Error::custom(format!("bad date `{dt}`")))
            }
            _ => Err(D::Error::custom(format!(
                "expected a date without time, got `{dt}`"
            ))),
        },
        other => Err(D::Error::custom(format!(
            "expected a date, got {}",
            other.type_str()
        ))),
    }
}

/// Summary of normalization actions performed on a [`Config`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NormalizationReport {
    /// Symbols whose spelling changed when trimming/upper-casing.
    pub symbols_rewritten: usize,
    /// Blank symbol entries removed.
    pub symbols_blank_dropped: usize,
    /// Duplicate symbols removed after normalization.
    pub symbols_deduped: usize,
    /// Whether `database` came from [`DATABASE_ENV`].
    pub database_from_env: bool,
}

impl NormalizationReport {
    pub fn is_noop(&self) -> bool {
        *self == NormalizationReport::default()
    }
}

/// Normalize a config in-place.
///
/// Errors:
/// - no symbols left after dropping blanks
/// - blank `database`
/// - unknown `timezone`
/// - `fetch_timeout_secs = 0`
pub fn normalize_config(cfg: &mut Config) -> anyhow::Result<NormalizationReport> {
    let mut report = NormalizationReport::default();

    let set = SymbolSet::new(&cfg.symbols).context("symbols cannot be empty after trimming")?;
    let mut kept = 0;
    for raw in &cfg.symbols {
        let s = raw.trim().to_ascii_uppercase();
        if s.is_empty() {
            report.symbols_blank_dropped += 1;
            continue;
        }
        kept += 1;
        if s != *raw {
            report.symbols_rewritten += 1;
        }
    }
    report.symbols_deduped = kept - set.len();
    cfg.symbols = set.as_slice().to_vec();

    let db = cfg.database.trim();
    if db.is_empty() {
        bail!("database path cannot be empty");
    }
    cfg.database = db.to_string();

    if let Some(name) = cfg.timezone.take() {
        let name = name.trim().to_string();
        crate::tz::parse_tz(&name)?;
        cfg.timezone = Some(name);
    }

    if cfg.fetch_timeout_secs == Some(0) {
        bail!("fetch_timeout_secs must be at least 1");
    }

    Ok(report)
}

/// Replace values with their environment overrides. Returns `true` when
/// something was overridden.
pub fn apply_env_overrides(cfg: &mut Config) -> bool {
    match shared_utils::env::env_override(DATABASE_ENV) {
        Some(db) => {
            tracing::debug!(database = %db, "database path taken from {DATABASE_ENV}");
            cfg.database = db;
            true
        }
        None => false,
    }
}

/// Parse and normalize a TOML string. Environment overrides are not applied.
pub fn load_config_str(toml_str: &str) -> anyhow::Result<(Config, NormalizationReport)> {
    let mut cfg: Config = from_str(toml_str).context("failed to parse config TOML")?;
    let report = normalize_config(&mut cfg).context("normalize_config failed")?;
    Ok((cfg, report))
}

/// Read, parse and normalize a config file, then apply environment overrides.
pub fn load_config_path(
    path: impl AsRef<std::path::Path>,
) -> anyhow::Result<(Config, NormalizationReport)> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read config file {}", path.as_ref().display()))?;
    let (mut cfg, mut report) = load_config_str(&text)?;
    report.database_from_env = apply_env_overrides(&mut cfg);
    if !report.is_noop() {
        tracing::info!(?report, "config normalized");
    }
    Ok((cfg, report))
}
