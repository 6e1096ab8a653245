//! Time zone helpers for computing the caller's "today".
//!
//! What this module provides:
//! - [`parse_tz`]: Parse an IANA time zone name (e.g., "America/New_York").
//! - [`date_in`]: Calendar date of a UTC instant in a given time zone.
//! - [`today`]: Today's date in the configured market time zone, or on the local
//!   clock when none is configured.
//!
//! Notes:
//! - The fetch window ends on this date, inclusive. Near midnight UTC the market
//!   zone and the local clock disagree; configuring the exchange's zone keeps the
//!   window aligned with trading days.
//!
//! Examples
//! - 2024-06-12T02:00:00Z in America/New_York -> 2024-06-11
//! - 2024-06-12T02:00:00Z in Asia/Tokyo -> 2024-06-12

use anyhow::Context;
use chrono::{DateTime, Local, NaiveDate, Utc};
use chrono_tz::Tz;

/// Parse an IANA time zone name.
pub fn parse_tz(name: &str) -> anyhow::Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .with_context(|| format!("bad tz: {name}"))
}

/// Calendar date of `instant` as seen in `tz`.
pub fn date_in(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Today's date in `tz`, or on the local clock when `tz` is `None`.
pub fn today(tz: Option<Tz>) -> NaiveDate {
    match tz {
        Some(tz) => date_in(Utc::now(), tz),
        None => Local::now().date_naive(),
    }
}
