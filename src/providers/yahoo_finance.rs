use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::cache::Cache;
use crate::core::price::PriceProvider;
use crate::providers::util::with_retry;

const QUOTE_TTL: Duration = Duration::from_secs(300);

/// Stock prices via the Yahoo Finance chart API. Bare IDX tickers get the
/// `.JK` exchange suffix appended; symbols carrying a suffix pass through.
pub struct YahooFinanceProvider {
    base_url: String,
    cache: Arc<Cache<String, f64>>,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str, cache: Arc<Cache<String, f64>>) -> Self {
        YahooFinanceProvider {
            base_url: base_url.to_string(),
            cache,
        }
    }

    fn ticker_for(symbol: &str) -> String {
        if symbol.contains('.') {
            symbol.to_uppercase()
        } else {
            format!("{}.JK", symbol.to_uppercase())
        }
    }
}

#[derive(Deserialize, Debug)]
struct YahooPriceResponse {
    chart: PriceChartResult,
}

#[derive(Deserialize, Debug)]
struct PriceChartResult {
    result: Option<Vec<PriceChartItem>>,
}

#[derive(Deserialize, Debug)]
struct PriceChartItem {
    meta: PriceChartMeta,
}

#[derive(Deserialize, Debug)]
struct PriceChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: Option<f64>,
}

#[async_trait]
impl PriceProvider for YahooFinanceProvider {
    #[instrument(
        name = "YahooPriceFetch",
        skip(self),
        fields(symbol = %symbol)
    )]
    async fn fetch_price(&self, symbol: &str) -> Result<Option<f64>> {
        let ticker = Self::ticker_for(symbol);
        if let Some(cached) = self.cache.get(&ticker).await {
            return Ok(Some(cached));
        }

        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range=1d",
            self.base_url, ticker
        );
        debug!("Requesting price data from {}", url);

        let client = reqwest::Client::builder().user_agent("pundi/1.0").build()?;
        let response = with_retry(|| async { client.get(&url).send().await }, 3, Duration::from_millis(500))
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {} URL: {}", e, ticker, url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                ticker
            ));
        }

        let data = response.json::<YahooPriceResponse>().await?;
        let price = data
            .chart
            .result
            .unwrap_or_default()
            .first()
            .and_then(|item| item.meta.regular_market_price);

        let Some(price) = price else {
            debug!(%ticker, "No market price in chart response");
            return Ok(None);
        };

        self.cache.put(ticker, price, Some(QUOTE_TTL)).await;
        Ok(Some(price))
    }

    async fn invalidate(&self) {
        self.cache.clear().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_mock_server(ticker: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/v8/finance/chart/{ticker}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_successful_price_fetch_appends_jk_suffix() {
        let mock_response = r#"{
            "chart": {
                "result": [{
                    "meta": {
                        "regularMarketPrice": 9500.0,
                        "currency": "IDR"
                    }
                }]
            }
        }"#;

        let mock_server = create_mock_server("BBCA.JK", mock_response).await;
        let cache = Arc::new(Cache::new());

        let provider = YahooFinanceProvider::new(&mock_server.uri(), cache);
        let price = provider.fetch_price("BBCA").await.unwrap();
        assert_eq!(price, Some(9500.0));
    }

    #[tokio::test]
    async fn test_explicit_suffix_passes_through() {
        let mock_response = r#"{
            "chart": {
                "result": [{
                    "meta": {
                        "regularMarketPrice": 150.65,
                        "currency": "USD"
                    }
                }]
            }
        }"#;

        let mock_server = create_mock_server("AAPL.US", mock_response).await;
        let cache = Arc::new(Cache::new());

        let provider = YahooFinanceProvider::new(&mock_server.uri(), cache);
        let price = provider.fetch_price("aapl.us").await.unwrap();
        assert_eq!(price, Some(150.65));
    }

    #[tokio::test]
    async fn test_empty_chart_result_returns_no_quote() {
        let mock_response = r#"{"chart": {"result": []}}"#;
        let mock_server = create_mock_server("XXXX.JK", mock_response).await;
        let cache = Arc::new(Cache::new());

        let provider = YahooFinanceProvider::new(&mock_server.uri(), cache);
        let price = provider.fetch_price("XXXX").await.unwrap();
        assert_eq!(price, None);
    }

    #[tokio::test]
    async fn test_missing_market_price_returns_no_quote() {
        let mock_response = r#"{"chart": {"result": [{"meta": {"currency": "IDR"}}]}}"#;
        let mock_server = create_mock_server("BBCA.JK", mock_response).await;
        let cache = Arc::new(Cache::new());

        let provider = YahooFinanceProvider::new(&mock_server.uri(), cache);
        let price = provider.fetch_price("BBCA").await.unwrap();
        assert_eq!(price, None);
    }

    #[tokio::test]
    async fn test_http_error_surfaces_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/BBCA.JK"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;
        let cache = Arc::new(Cache::new());

        let provider = YahooFinanceProvider::new(&mock_server.uri(), cache);
        let result = provider.fetch_price("BBCA").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().starts_with("HTTP error: 429"));
    }

    #[tokio::test]
    async fn test_quotes_are_cached() {
        let mock_response = r#"{
            "chart": {
                "result": [{"meta": {"regularMarketPrice": 9500.0}}]
            }
        }"#;
        let mock_server = create_mock_server("BBCA.JK", mock_response).await;
        let cache = Arc::new(Cache::new());
        let provider = YahooFinanceProvider::new(&mock_server.uri(), cache);

        provider.fetch_price("BBCA").await.unwrap();
        provider.fetch_price("BBCA").await.unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
    }
}
