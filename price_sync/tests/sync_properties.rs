use std::collections::HashSet;

use chrono::Days;
use price_sync::store::{HighWaterMark, PriceRepo, SqliteRepo};
use price_sync::sync::{SymbolSet, SyncRequest, SyncResult, sync};
use proptest::prelude::*;

mod common;

use common::{MarketProvider, d, weekdays};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    // Any schedule of runs, including repeated days and weekend-only windows,
    // stores each (date, ticker) exactly once and ends on the last trading day.
    #[test]
    fn no_duplicates_across_sync_schedules(
        offsets in proptest::collection::vec(0u64..40, 1..8),
        symbol_mask in 1u8..8,
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let (_db, mut conn) = common::setup_db();
        let repo = SqliteRepo::new();
        let provider = MarketProvider::default();

        let all = ["AAPL", "MSFT", "META"];
        let chosen: Vec<&str> = all
            .iter()
            .enumerate()
            .filter(|(i, _)| symbol_mask & (1 << i) != 0)
            .map(|(_, s)| *s)
            .collect();
        let symbols = SymbolSet::new(&chosen).unwrap();
        let epoch = d("2024-03-01");

        let mut days = offsets.clone();
        days.sort_unstable();
        for offset in &days {
            let today = epoch + Days::new(*offset);
            let req = SyncRequest { symbols: symbols.clone(), epoch, today };
            let result = rt.block_on(sync(&mut conn, &repo, &provider, &req));
            prop_assert!(!result.is_failure(), "run failed: {result}");
            if let SyncResult::Updated { through, .. } = result {
                prop_assert_eq!(through, today);
            }
        }

        let rows = repo.read_all(&mut conn).unwrap();
        let mut keys = HashSet::new();
        for row in &rows {
            prop_assert!(keys.insert((row.date, row.ticker.clone())), "duplicate {:?}", row);
        }

        let last = epoch + Days::new(*days.last().unwrap());
        let trading = weekdays(epoch, last);
        prop_assert_eq!(rows.len(), trading.len() * chosen.len());
        let expected_hwm = match trading.last() {
            Some(day) => HighWaterMark::Present(*day),
            None => HighWaterMark::Absent,
        };
        prop_assert_eq!(repo.read_high_water_mark(&mut conn), expected_hwm);
    }
}
