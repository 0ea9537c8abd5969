use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::models::{CoinResponse, MarketChartResponse};
use crate::api::{FetchError, MarketDataApi};
use crate::models::{Asset, MarketSnapshot, PriceSeries, RangeBucket};

/// CoinGecko v3 public API client
pub struct CoinGeckoClient {
    http_client: HttpClient,
    base_url: String,
}

impl CoinGeckoClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.coingecko.com/api/v3";

    /// Create a client against `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http_client = HttpClient::builder()
            .default_headers(headers)
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn snapshot_url(&self, asset: Asset) -> String {
        format!("{}/coins/{}", self.base_url, asset.id())
    }

    fn series_url(&self, asset: Asset) -> String {
        format!("{}/coins/{}/market_chart", self.base_url, asset.id())
    }

    /// GET `url` and decode the body, classifying each failure where it happens
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        debug!("GET {} {:?}", url, query);

        let response = self
            .http_client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 429 {
                warn!("Market data API is rate limiting us ({})", url);
            }
            return Err(FetchError::HttpStatus { status: status.as_u16() });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(format!("Failed to read response: {}", e)))?;

        serde_json::from_str::<T>(&body)
            .map_err(|e| FetchError::InvalidResponseShape(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl MarketDataApi for CoinGeckoClient {
    /// GET /coins/{id}
    async fn fetch_snapshot(&self, asset: Asset) -> Result<MarketSnapshot, FetchError> {
        let query = [
            ("localization", "false".to_string()),
            ("tickers", "false".to_string()),
            ("community_data", "false".to_string()),
            ("developer_data", "false".to_string()),
        ];
        let response: CoinResponse = self.get_json(&self.snapshot_url(asset), &query).await?;
        response.into_snapshot()
    }

    /// GET /coins/{id}/market_chart
    async fn fetch_series(&self, asset: Asset, range: RangeBucket) -> Result<PriceSeries, FetchError> {
        let query = [
            ("vs_currency", "usd".to_string()),
            ("days", range.days().to_string()),
        ];
        let response: MarketChartResponse = self.get_json(&self.series_url(asset), &query).await?;
        response.into_series()
    }
}
