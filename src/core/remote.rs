//! Remote persistence contract used by the sync reconciler

use crate::core::investment::Investment;
use anyhow::Result;
use async_trait::async_trait;

/// Best-effort mirror of the local collection. Implementations must be
/// idempotent per record id: `save_investment` upserts.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get_investments(&self) -> Result<Vec<Investment>>;

    async fn save_investment(&self, investment: &Investment) -> Result<()>;

    async fn delete_investment(&self, id: &str) -> Result<()>;
}
