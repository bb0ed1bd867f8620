use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use tracing::{debug, instrument};

use crate::core::investment::Investment;
use crate::core::remote::RemoteStore;
use crate::providers::util::with_retry;

/// JSON REST client for the remote persistence endpoint.
///
/// `GET  /investments`        returns the full collection
/// `PUT  /investments/{id}`   upserts one record
/// `DELETE /investments/{id}` removes one record
pub struct HttpRemoteStore {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpRemoteStore {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("pundi/1.0")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HttpRemoteStore {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.header(AUTHORIZATION, format!("Bearer {key}"));
        }
        builder
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    #[instrument(name = "RemoteFetchAll", skip(self))]
    async fn get_investments(&self) -> Result<Vec<Investment>> {
        let response = with_retry(
            || async { self.request(reqwest::Method::GET, "/investments").send().await },
            3,
            std::time::Duration::from_millis(500),
        )
        .await
        .map_err(|e| anyhow!("Request error: {} while fetching investments", e))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} while fetching investments",
                response.status()
            ));
        }

        let investments: Vec<Investment> = response
            .json()
            .await
            .context("Failed to parse remote investments")?;
        debug!(count = investments.len(), "Fetched remote investments");
        Ok(investments)
    }

    #[instrument(name = "RemoteSave", skip(self, investment), fields(id = %investment.id))]
    async fn save_investment(&self, investment: &Investment) -> Result<()> {
        let path = format!("/investments/{}", investment.id);
        let response = self
            .request(reqwest::Method::PUT, &path)
            .json(investment)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} while saving {}", e, investment.id))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} while saving {}",
                response.status(),
                investment.id
            ));
        }
        Ok(())
    }

    #[instrument(name = "RemoteDelete", skip(self))]
    async fn delete_investment(&self, id: &str) -> Result<()> {
        let path = format!("/investments/{id}");
        let response = self
            .request(reqwest::Method::DELETE, &path)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} while deleting {}", e, id))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} while deleting {}",
                response.status(),
                id
            ));
        }
        Ok(())
    }
}
