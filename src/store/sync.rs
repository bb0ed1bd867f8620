//! Best-effort reconciliation of the local collection with a remote store.
//!
//! Pushes never block or roll back a local mutation; a failure leaves the
//! record unsynced and is surfaced through the per-record outcome list.

use crate::store::InvestmentStore;
use anyhow::{Result, bail};
use chrono::Utc;
use tracing::{debug, info, warn};

/// Result of pushing one record to the remote.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub id: String,
    pub ok: bool,
    pub error: Option<String>,
}

impl InvestmentStore {
    /// Fire-and-forget push after a create, edit or price settle.
    pub(crate) fn spawn_sync_push(&self, id: String) {
        if self.inner.remote.is_none() {
            debug!(%id, "Remote sync disabled, skipping push");
            return;
        }
        let store = self.clone();
        tokio::spawn(async move {
            store.push_one(id).await;
        });
    }

    /// Fire-and-forget delete after a local remove.
    pub(crate) fn spawn_sync_delete(&self, id: String) {
        let Some(remote) = self.inner.remote.clone() else {
            debug!(%id, "Remote sync disabled, skipping delete");
            return;
        };
        tokio::spawn(async move {
            if let Err(e) = remote.delete_investment(&id).await {
                warn!(%id, error = %e, "Remote delete failed");
            }
        });
    }

    /// Push a single record and merge the result back under the lock.
    async fn push_one(&self, id: String) -> SyncOutcome {
        let Some(remote) = self.inner.remote.clone() else {
            return SyncOutcome {
                id,
                ok: false,
                error: Some("remote sync is not configured".to_string()),
            };
        };
        let record = self.get(&id).await;
        let Some(record) = record else {
            // Removed before the push ran; nothing to reconcile.
            return SyncOutcome {
                id,
                ok: false,
                error: Some("record no longer exists".to_string()),
            };
        };

        match remote.save_investment(&record).await {
            Ok(()) => {
                let mut state = self.inner.state.lock().await;
                if let Some(record) = state.investments.iter_mut().find(|record| record.id == id)
                {
                    record.synced = true;
                    record.synced_at = Some(Utc::now());
                }
                debug!(%id, "Synced investment to remote");
                SyncOutcome {
                    id,
                    ok: true,
                    error: None,
                }
            }
            Err(e) => {
                warn!(%id, error = %e, "Sync push failed");
                SyncOutcome {
                    id,
                    ok: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Push every unsynced record sequentially, collecting outcomes.
    /// Partial failures are reported, never rolled back.
    pub async fn sync_all(&self) -> Vec<SyncOutcome> {
        let unsynced: Vec<String> = {
            let state = self.inner.state.lock().await;
            state
                .investments
                .iter()
                .filter(|record| !record.synced)
                .map(|record| record.id.clone())
                .collect()
        };
        if unsynced.is_empty() {
            debug!("Nothing to sync");
            return Vec::new();
        }

        let mut outcomes = Vec::with_capacity(unsynced.len());
        for id in unsynced {
            outcomes.push(self.push_one(id).await);
        }
        let failures = outcomes.iter().filter(|outcome| !outcome.ok).count();
        if failures > 0 {
            warn!(failures, "Some records failed to sync");
        }
        outcomes
    }

    /// Second pass over whatever is still unsynced.
    pub async fn retry_failed_syncs(&self) -> Vec<SyncOutcome> {
        self.sync_all().await
    }

    /// Replace the local collection with the remote one, unless the remote
    /// is empty: an empty pull keeps local state and reports a no-op.
    /// Returns how many records were loaded.
    pub async fn load_from_cloud(&self) -> Result<usize> {
        let Some(remote) = self.inner.remote.clone() else {
            bail!("remote sync is not configured");
        };
        let fetched = remote.get_investments().await?;
        if fetched.is_empty() {
            info!("Remote returned no investments, keeping local state");
            return Ok(0);
        }

        let now = Utc::now();
        let count = fetched.len();
        let mut state = self.inner.state.lock().await;
        state.investments = fetched
            .into_iter()
            .map(|mut record| {
                record.synced = true;
                record.synced_at = Some(now);
                record
            })
            .collect();
        info!(count, "Replaced local collection from remote");
        Ok(count)
    }
}
