//! Price lookup contract consumed by the investment store

use anyhow::Result;
use async_trait::async_trait;

/// Spot price source for one market (crypto exchange, stock exchange).
///
/// `Ok(None)` means the venue answered but has no quote for the symbol;
/// `Err` is a transport or parse failure. Both settle a record as failed.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn fetch_price(&self, symbol: &str) -> Result<Option<f64>>;

    /// Drop any cached freshness so the next fetch hits the venue again.
    async fn invalidate(&self) {}
}
