//! Versioned local snapshot of the investment collection.
//!
//! The collection is the only thing persisted locally. The payload carries
//! a schema version so a future shape change can migrate or refuse cleanly.

use crate::core::investment::Investment;
use anyhow::{Context, Result, bail};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const SNAPSHOT_VERSION: u32 = 1;

const PARTITION: &str = "portfolio";
const SNAPSHOT_KEY: &str = "investments";

#[derive(Serialize, Deserialize)]
struct SnapshotPayload {
    version: u32,
    investments: Vec<Investment>,
}

pub struct SnapshotStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl SnapshotStore {
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;
        let keyspace = fjall::Config::new(dir)
            .open()
            .with_context(|| format!("Failed to open data store at {}", dir.display()))?;
        let partition = keyspace
            .open_partition(PARTITION, PartitionCreateOptions::default())
            .context("Failed to open portfolio partition")?;
        Ok(SnapshotStore {
            keyspace,
            partition,
        })
    }

    /// Load the persisted collection, `None` when nothing was saved yet.
    pub fn load(&self) -> Result<Option<Vec<Investment>>> {
        let Some(raw) = self.partition.get(SNAPSHOT_KEY)? else {
            debug!("No snapshot found");
            return Ok(None);
        };
        let payload: SnapshotPayload =
            serde_json::from_slice(&raw).context("Failed to parse investment snapshot")?;
        if payload.version > SNAPSHOT_VERSION {
            bail!(
                "Snapshot version {} is newer than supported version {}",
                payload.version,
                SNAPSHOT_VERSION
            );
        }
        debug!(
            count = payload.investments.len(),
            version = payload.version,
            "Loaded snapshot"
        );
        Ok(Some(payload.investments))
    }

    pub fn save(&self, investments: &[Investment]) -> Result<()> {
        let payload = SnapshotPayload {
            version: SNAPSHOT_VERSION,
            investments: investments.to_vec(),
        };
        self.partition
            .insert(SNAPSHOT_KEY, serde_json::to_vec(&payload)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!(count = investments.len(), "Saved snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::investment::{Asset, MarketHolding};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn record(symbol: &str) -> Investment {
        Investment::new(
            Asset::Crypto(MarketHolding {
                symbol: symbol.to_string(),
                name: symbol.to_string(),
                buy_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                buy_price: 950_000_000.0,
                quantity: 0.01,
                current_price: None,
            }),
            None,
        )
    }

    #[test]
    fn test_empty_store_loads_nothing() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();

        let records = vec![record("BTC"), record("ETH")];
        store.save(&records).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();

        store.save(&[record("BTC")]).unwrap();
        let replacement = vec![record("SOL")];
        store.save(&replacement).unwrap();

        assert_eq!(store.load().unwrap().unwrap(), replacement);
    }

    #[test]
    fn test_newer_snapshot_version_is_rejected() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();

        let payload = format!(
            r#"{{"version": {}, "investments": []}}"#,
            SNAPSHOT_VERSION + 1
        );
        store
            .partition
            .insert(SNAPSHOT_KEY, payload.as_bytes())
            .unwrap();

        let err = store.load().unwrap_err().to_string();
        assert!(err.contains("newer than supported"));
    }
}
