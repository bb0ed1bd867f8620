//! The investment store: single owner and sole mutator of the collection.

pub mod snapshot;
pub mod sync;

use crate::core::investment::{Asset, AssetKind, Investment, PriceStatus};
use crate::core::price::PriceProvider;
use crate::core::remote::RemoteStore;
use crate::core::valuation;
use chrono::Utc;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Debounce before the batch refresh triggered by a create.
const CREATE_REFRESH_DELAY: Duration = Duration::from_millis(1000);
/// Debounce before the batch refresh triggered by an edit or retry.
const UPDATE_REFRESH_DELAY: Duration = Duration::from_millis(500);
/// Settle window between marking records pending and the forced batch.
const FORCE_REFRESH_DELAY: Duration = Duration::from_millis(100);

/// Record counts per price status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub updated: usize,
    pub failed: usize,
    pub static_: usize,
}

/// Aggregate view over the whole collection.
#[derive(Debug, Clone)]
pub struct PortfolioSummary {
    pub total_value: f64,
    pub total_invested: f64,
    pub profit_loss: f64,
    pub profit_loss_pct: f64,
    pub status: StatusCounts,
    pub total_count: usize,
    pub synced_count: usize,
    pub synced_pct: f64,
}

struct StoreState {
    investments: Vec<Investment>,
    last_update_error: Option<String>,
}

struct StoreInner {
    state: Mutex<StoreState>,
    refreshing: AtomicBool,
    // Single slot for the debounced refresh timer; scheduling replaces it.
    // Cancellation flips the flag, so a batch that already started is
    // never interrupted mid-flight.
    pending_refresh: StdMutex<Option<Arc<AtomicBool>>>,
    crypto_prices: Arc<dyn PriceProvider>,
    stock_prices: Arc<dyn PriceProvider>,
    remote: Option<Arc<dyn RemoteStore>>,
}

/// Cheap handle over the shared store; clones observe the same state.
#[derive(Clone)]
pub struct InvestmentStore {
    inner: Arc<StoreInner>,
}

// Clears the in-flight flag on every exit path of a batch refresh.
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl InvestmentStore {
    pub fn new(
        crypto_prices: Arc<dyn PriceProvider>,
        stock_prices: Arc<dyn PriceProvider>,
        remote: Option<Arc<dyn RemoteStore>>,
    ) -> Self {
        InvestmentStore {
            inner: Arc::new(StoreInner {
                state: Mutex::new(StoreState {
                    investments: Vec::new(),
                    last_update_error: None,
                }),
                refreshing: AtomicBool::new(false),
                pending_refresh: StdMutex::new(None),
                crypto_prices,
                stock_prices,
                remote,
            }),
        }
    }

    /// Install a previously persisted collection, replacing current state.
    pub async fn seed(&self, investments: Vec<Investment>) {
        let mut state = self.inner.state.lock().await;
        debug!("Seeding store with {} investments", investments.len());
        state.investments = investments;
    }

    /// Cloned snapshot of the collection in insertion order.
    pub async fn list(&self) -> Vec<Investment> {
        self.inner.state.lock().await.investments.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Investment> {
        self.inner
            .state
            .lock()
            .await
            .investments
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    /// Message from the most recent quote failure, for display.
    pub async fn last_update_error(&self) -> Option<String> {
        self.inner.state.lock().await.last_update_error.clone()
    }

    /// Add a new investment. Market assets start `pending` and get a
    /// debounced batch refresh; static types are valued on the spot.
    pub async fn create(&self, asset: Asset, notes: Option<String>) -> Investment {
        let record = Investment::new(asset, notes);
        debug!(id = %record.id, kind = %record.kind(), "Creating investment");
        {
            let mut state = self.inner.state.lock().await;
            state.investments.push(record.clone());
        }
        if record.asset.is_market() {
            self.schedule_refresh(CREATE_REFRESH_DELAY);
        }
        self.spawn_sync_push(record.id.clone());
        record
    }

    /// Replace an existing record's asset fields. Returns `None` without
    /// mutating anything when the id is unknown.
    pub async fn update(&self, id: &str, asset: Asset, notes: Option<String>) -> Option<Investment> {
        let updated = {
            let mut state = self.inner.state.lock().await;
            let record = state.investments.iter_mut().find(|record| record.id == id)?;
            record.replace(asset, notes);
            record.clone()
        };
        debug!(id = %updated.id, kind = %updated.kind(), "Updated investment");
        if updated.asset.is_market() {
            self.schedule_refresh(UPDATE_REFRESH_DELAY);
        }
        self.spawn_sync_push(updated.id.clone());
        Some(updated)
    }

    /// Delete a record. Cancels the pending scheduled refresh and fires an
    /// async delete against the remote. No-op when the id is unknown.
    pub async fn remove(&self, id: &str) -> bool {
        let removed = {
            let mut state = self.inner.state.lock().await;
            match state.investments.iter().position(|record| record.id == id) {
                Some(index) => {
                    state.investments.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            debug!(id, "Removed investment");
            self.cancel_scheduled_refresh();
            self.spawn_sync_delete(id.to_string());
        }
        removed
    }

    /// Refresh quotes for every market record in one batch.
    ///
    /// Guarded against re-entry: a call while another batch is in flight
    /// returns the current collection unchanged. Always returns the
    /// post-settle snapshot otherwise.
    pub async fn refresh_all(&self) -> Vec<Investment> {
        if self
            .inner
            .refreshing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Price refresh already in flight, returning current state");
            return self.list().await;
        }
        let _guard = RefreshGuard(&self.inner.refreshing);

        let targets: Vec<(String, AssetKind, String)> = {
            let state = self.inner.state.lock().await;
            state
                .investments
                .iter()
                .filter(|record| record.price_status != PriceStatus::Static)
                .filter_map(|record| {
                    record
                        .asset
                        .market_symbol()
                        .map(|symbol| (record.id.clone(), record.kind(), symbol.to_string()))
                })
                .collect()
        };
        if targets.is_empty() {
            debug!("No market investments to refresh");
            return self.list().await;
        }

        let fetches = targets.into_iter().map(|(id, kind, symbol)| {
            let provider = self.provider_for(kind);
            async move {
                let outcome = provider.fetch_price(&symbol).await;
                (id, symbol, outcome)
            }
        });
        let results = join_all(fetches).await;

        let now = Utc::now();
        let mut settled = Vec::new();
        {
            let mut state = self.inner.state.lock().await;
            for (id, symbol, outcome) in results {
                // The record may have been removed while the fetch ran.
                let Some(record) = state.investments.iter_mut().find(|record| record.id == id)
                else {
                    continue;
                };
                match outcome {
                    Ok(Some(price)) => {
                        record.apply_price(price, now);
                    }
                    Ok(None) => {
                        warn!(%symbol, "No quote available");
                        record.mark_price_failed(now);
                        state.last_update_error = Some(format!("No quote available for {symbol}"));
                    }
                    Err(e) => {
                        warn!(%symbol, error = %e, "Price fetch failed");
                        record.mark_price_failed(now);
                        state.last_update_error = Some(e.to_string());
                    }
                }
                settled.push(id);
            }
        }
        for id in settled {
            self.spawn_sync_push(id);
        }
        self.list().await
    }

    /// Refresh a single market record, settling it immediately.
    ///
    /// Static types are not quoted; the call logs a warning and leaves the
    /// record untouched.
    pub async fn refresh_one(&self, id: &str) -> Option<Investment> {
        let target = {
            let mut state = self.inner.state.lock().await;
            let record = state.investments.iter_mut().find(|record| record.id == id)?;
            match record.asset.market_symbol() {
                Some(symbol) => {
                    let symbol = symbol.to_string();
                    record.price_status = PriceStatus::Pending;
                    Some((record.kind(), symbol))
                }
                None => {
                    warn!(id, kind = %record.kind(), "Price refresh only applies to crypto and stock");
                    None
                }
            }
        };
        let (kind, symbol) = target?;

        let outcome = self.provider_for(kind).fetch_price(&symbol).await;

        let now = Utc::now();
        let settled = {
            let mut state = self.inner.state.lock().await;
            let record = state.investments.iter_mut().find(|record| record.id == id)?;
            match outcome {
                Ok(Some(price)) => record.apply_price(price, now),
                Ok(None) => {
                    record.mark_price_failed(now);
                    state.last_update_error = Some(format!("No quote available for {symbol}"));
                }
                Err(e) => {
                    warn!(%symbol, error = %e, "Price fetch failed");
                    record.mark_price_failed(now);
                    state.last_update_error = Some(e.to_string());
                }
            }
            state
                .investments
                .iter()
                .find(|record| record.id == id)
                .cloned()
        };
        self.spawn_sync_push(id.to_string());
        settled
    }

    /// Mark every market record `pending`, drop provider caches, then run
    /// a batch refresh after a short settle window.
    pub async fn force_refresh_all(&self) -> Vec<Investment> {
        {
            let mut state = self.inner.state.lock().await;
            for record in &mut state.investments {
                if record.asset.is_market() {
                    record.price_status = PriceStatus::Pending;
                }
            }
        }
        self.inner.crypto_prices.invalidate().await;
        self.inner.stock_prices.invalidate().await;
        tokio::time::sleep(FORCE_REFRESH_DELAY).await;
        self.refresh_all().await
    }

    /// Move failed market records back to `pending` and schedule a
    /// debounced refresh. Returns how many records were queued.
    pub async fn retry_failed_updates(&self) -> usize {
        let queued = {
            let mut state = self.inner.state.lock().await;
            let mut queued = 0;
            for record in &mut state.investments {
                if record.asset.is_market() && record.price_status == PriceStatus::Failed {
                    record.price_status = PriceStatus::Pending;
                    queued += 1;
                }
            }
            queued
        };
        if queued > 0 {
            debug!(queued, "Retrying failed price updates");
            self.schedule_refresh(UPDATE_REFRESH_DELAY);
        }
        queued
    }

    /// Records of one investment type, in insertion order.
    pub async fn by_category(&self, kind: AssetKind) -> Vec<Investment> {
        self.inner
            .state
            .lock()
            .await
            .investments
            .iter()
            .filter(|record| record.kind() == kind)
            .cloned()
            .collect()
    }

    /// Market records that still need a quote (pending or failed).
    pub async fn needing_update(&self) -> Vec<Investment> {
        self.inner
            .state
            .lock()
            .await
            .investments
            .iter()
            .filter(|record| {
                matches!(
                    record.price_status,
                    PriceStatus::Pending | PriceStatus::Failed
                )
            })
            .cloned()
            .collect()
    }

    pub async fn summary(&self) -> PortfolioSummary {
        let state = self.inner.state.lock().await;
        let mut status = StatusCounts::default();
        let mut total_value = 0.0;
        let mut total_invested = 0.0;
        let mut synced_count = 0;

        for record in &state.investments {
            total_value += record.current_value;
            total_invested += record.asset.invested_value();
            if record.synced {
                synced_count += 1;
            }
            match record.price_status {
                PriceStatus::Pending => status.pending += 1,
                PriceStatus::Updated => status.updated += 1,
                PriceStatus::Failed => status.failed += 1,
                PriceStatus::Static => status.static_ += 1,
            }
        }

        let total_count = state.investments.len();
        let profit_loss = valuation::profit_loss(total_value, total_invested);
        PortfolioSummary {
            total_value,
            total_invested,
            profit_loss,
            profit_loss_pct: valuation::profit_loss_pct(profit_loss, total_invested),
            status,
            total_count,
            synced_count,
            synced_pct: if total_count == 0 {
                0.0
            } else {
                (synced_count as f64 / total_count as f64) * 100.0
            },
        }
    }

    fn provider_for(&self, kind: AssetKind) -> Arc<dyn PriceProvider> {
        match kind {
            AssetKind::Crypto => Arc::clone(&self.inner.crypto_prices),
            _ => Arc::clone(&self.inner.stock_prices),
        }
    }

    // Cancel-then-schedule: at most one pending refresh timer exists.
    fn schedule_refresh(&self, delay: Duration) {
        self.cancel_scheduled_refresh();
        let cancelled = Arc::new(AtomicBool::new(false));
        {
            let mut slot = self.inner.pending_refresh.lock().unwrap();
            *slot = Some(Arc::clone(&cancelled));
        }
        let store = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if cancelled.load(Ordering::SeqCst) {
                return;
            }
            store.refresh_all().await;
        });
    }

    fn cancel_scheduled_refresh(&self) {
        let mut slot = self.inner.pending_refresh.lock().unwrap();
        if let Some(cancelled) = slot.take() {
            debug!("Cancelling scheduled price refresh");
            cancelled.store(true, Ordering::SeqCst);
        }
    }
}
