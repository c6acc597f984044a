use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::{error, info};

use crate::board::Board;
use crate::client::ApiClient;

/// Uptrend probability at or above which a pair qualifies for an alert.
/// Closed boundary: exactly 51 qualifies, 50 does not.
const UPTREND_THRESHOLD: i64 = 51;

const NOTIFIED_KEY: &str = "notified_pairs";

/// Persisted set of pairs an uptrend alert has already been sent for. Loaded
/// once at startup, appended in memory as pairs qualify, and written back
/// after a successful dispatch. Entries are never pruned: a pair notified once
/// is never notified again, even if its trend later drops and recovers.
pub struct NotifiedStore {
    db: sled::Db,
    pairs: HashSet<String>,
}

impl NotifiedStore {
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path)
            .with_context(|| format!("failed to open state store at {}", path.display()))?;
        let pairs = match db.get(NOTIFIED_KEY)? {
            Some(raw) => serde_json::from_slice(&raw)
                .context("corrupt notified-pairs entry in state store")?,
            None => HashSet::new(),
        };
        Ok(Self { db, pairs })
    }

    /// In-memory store for tests.
    #[cfg(test)]
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self {
            db,
            pairs: HashSet::new(),
        })
    }

    pub fn contains(&self, pair: &str) -> bool {
        self.pairs.contains(pair)
    }

    pub fn add(&mut self, pair: &str) {
        self.pairs.insert(pair.to_string());
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Writes the current set back to disk as a JSON array under one key.
    pub fn save(&self) -> Result<()> {
        let mut sorted: Vec<&String> = self.pairs.iter().collect();
        sorted.sort();
        self.db.insert(NOTIFIED_KEY, serde_json::to_vec(&sorted)?)?;
        self.db.flush()?;
        Ok(())
    }
}

/// Evaluates the notification condition on every price tick and dispatches
/// one batched POST for newly-qualifying pairs. The store is injected rather
/// than global so the dedup policy is testable in isolation.
pub struct NotificationGate {
    store: NotifiedStore,
    chat_id: String,
}

impl NotificationGate {
    pub fn new(store: NotifiedStore, chat_id: String) -> Self {
        Self { store, chat_id }
    }

    /// Collects pairs whose uptrend probability is at or above the threshold
    /// and which have not been notified before, in row order. Qualifying pairs
    /// enter the in-memory set immediately, before any dispatch: a later
    /// dispatch failure still suppresses future retries (at-most-once).
    pub fn collect(&mut self, board: &Board) -> Vec<String> {
        let mut batch = Vec::new();
        for row in board.rows() {
            let qualifies = matches!(row.uptrend, Some(p) if p >= UPTREND_THRESHOLD);
            if qualifies && !self.store.contains(&row.pair) {
                self.store.add(&row.pair);
                batch.push(row.pair.clone());
            }
        }
        batch
    }

    /// Sends the batch and persists the set on success. Failures are logged
    /// and otherwise ignored; the in-memory set already holds the batch.
    pub async fn dispatch(&self, client: &ApiClient, batch: &[String]) {
        if batch.is_empty() {
            return;
        }
        match client.send_notifications(&self.chat_id, batch).await {
            Ok(()) => {
                if let Err(e) = self.store.save() {
                    error!("Failed to persist notified pairs: {e:#}");
                }
                info!("Notification sent for {:?}", batch);
            }
            Err(e) => error!("Notification dispatch failed: {e:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DisplayValue, IndicatorBundle};
    use std::collections::HashMap;

    fn board_with_uptrends(entries: &[(&str, i64)]) -> Board {
        let pairs: Vec<String> = entries.iter().map(|(p, _)| p.to_string()).collect();
        let mut board = Board::new(&pairs);
        let data: HashMap<String, IndicatorBundle> = entries
            .iter()
            .map(|(pair, uptrend)| {
                let bundle = IndicatorBundle {
                    uptrend: DisplayValue::Number(*uptrend as f64),
                    ..IndicatorBundle::default()
                };
                (pair.to_string(), bundle)
            })
            .collect();
        board.apply_indicators(&data);
        board
    }

    fn gate() -> NotificationGate {
        NotificationGate::new(NotifiedStore::temporary().unwrap(), "1001423950701".into())
    }

    #[test]
    fn threshold_boundary_is_closed_at_51() {
        let board = board_with_uptrends(&[("A", 50), ("B", 51), ("C", 100), ("D", 0)]);
        let mut gate = gate();
        assert_eq!(gate.collect(&board), vec!["B", "C"]);
    }

    #[test]
    fn qualifying_pair_is_collected_only_once() {
        let mut gate = gate();

        let board = board_with_uptrends(&[("BTCUSDT", 51)]);
        assert_eq!(gate.collect(&board), vec!["BTCUSDT"]);

        // Still above threshold on the next tick; no repeat.
        let board = board_with_uptrends(&[("BTCUSDT", 80)]);
        assert!(gate.collect(&board).is_empty());

        // Even after dropping below and re-exceeding the threshold.
        let board = board_with_uptrends(&[("BTCUSDT", 10)]);
        assert!(gate.collect(&board).is_empty());
        let board = board_with_uptrends(&[("BTCUSDT", 90)]);
        assert!(gate.collect(&board).is_empty());
    }

    #[test]
    fn batch_preserves_row_order() {
        let board = board_with_uptrends(&[("ZEC", 60), ("ADA", 70), ("BTC", 55)]);
        let mut gate = gate();
        assert_eq!(gate.collect(&board), vec!["ZEC", "ADA", "BTC"]);
    }

    #[test]
    fn rows_without_attributes_never_qualify() {
        let board = Board::new(&["BTCUSDT".to_string()]);
        let mut gate = gate();
        assert!(gate.collect(&board).is_empty());
    }

    #[test]
    fn store_round_trips_through_save() {
        let mut store = NotifiedStore::temporary().unwrap();
        assert!(store.is_empty());
        store.add("BTCUSDT");
        store.add("ETHUSDT");
        store.save().unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.contains("BTCUSDT"));

        // The persisted entry is a sorted JSON array under one key.
        let raw = store.db.get(NOTIFIED_KEY).unwrap().unwrap();
        let decoded: Vec<String> = serde_json::from_slice(&raw).unwrap();
        assert_eq!(decoded, vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn open_restores_persisted_pairs() {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "trendwatch-store-test-{}-{}",
            std::process::id(),
            nanos
        ));
        {
            let mut store = NotifiedStore::open(&dir).unwrap();
            store.add("BTCUSDT");
            store.save().unwrap();
        }
        {
            let store = NotifiedStore::open(&dir).unwrap();
            assert!(store.contains("BTCUSDT"));
            assert!(!store.contains("ETHUSDT"));
        }
        let _ = std::fs::remove_dir_all(&dir);
    }
}
