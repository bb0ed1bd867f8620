use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::core::cache::Cache;
use crate::core::price::PriceProvider;
use crate::providers::util::with_retry;

// Quotes stay fresh for a few minutes; force refresh clears the cache.
const QUOTE_TTL: Duration = Duration::from_secs(300);

/// Crypto spot prices from the Indodax public ticker API, quoted in IDR.
pub struct IndodaxProvider {
    base_url: String,
    cache: Arc<Cache<String, f64>>,
}

impl IndodaxProvider {
    pub fn new(base_url: &str, cache: Arc<Cache<String, f64>>) -> Self {
        IndodaxProvider {
            base_url: base_url.to_string(),
            cache,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TickerResponse {
    ticker: Option<Ticker>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Ticker {
    // Indodax serializes prices as strings.
    last: String,
}

#[async_trait]
impl PriceProvider for IndodaxProvider {
    #[instrument(
        name = "IndodaxPriceFetch",
        skip(self),
        fields(symbol = %symbol)
    )]
    async fn fetch_price(&self, symbol: &str) -> Result<Option<f64>> {
        let pair = format!("{}idr", symbol.to_lowercase());
        if let Some(cached) = self.cache.get(&pair).await {
            return Ok(Some(cached));
        }

        let url = format!("{}/api/ticker/{}", self.base_url, pair);
        debug!("Requesting ticker from {}", url);

        let client = reqwest::Client::builder().user_agent("pundi/1.0").build()?;
        let response = with_retry(|| async { client.get(&url).send().await }, 3, Duration::from_millis(500))
            .await
            .map_err(|e| anyhow!("Request error: {} for pair: {}", e, pair))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for pair: {}",
                response.status(),
                pair
            ));
        }

        let data: TickerResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse ticker response for pair: {pair}"))?;

        if let Some(error) = data.error {
            warn!(%pair, %error, "Ticker lookup rejected");
            return Ok(None);
        }
        let Some(ticker) = data.ticker else {
            return Ok(None);
        };

        let price: f64 = ticker
            .last
            .parse()
            .with_context(|| format!("Invalid price '{}' for pair: {}", ticker.last, pair))?;

        self.cache.put(pair, price, Some(QUOTE_TTL)).await;
        Ok(Some(price))
    }

    async fn invalidate(&self) {
        self.cache.clear().await;
    }
}
