use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::api::FetchError;
use crate::models::{MarketSnapshot, PricePoint, PriceSeries};

/// Per-currency value map; only USD is consumed
#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyValues {
    pub usd: Option<f64>,
}

/// `market_data` block of GET /coins/{id}
#[derive(Debug, Clone, Deserialize)]
pub struct MarketData {
    pub market_cap: Option<CurrencyValues>,
    pub current_price: Option<CurrencyValues>,
    pub price_change_percentage_24h: Option<f64>,
    pub total_volume: Option<CurrencyValues>,
}

/// Response from GET /coins/{id}
#[derive(Debug, Clone, Deserialize)]
pub struct CoinResponse {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub market_data: Option<MarketData>,
}

/// Response from GET /coins/{id}/market_chart
#[derive(Debug, Clone, Deserialize)]
pub struct MarketChartResponse {
    pub prices: Option<Vec<Vec<f64>>>,
}

fn usd(values: &Option<CurrencyValues>, field: &str) -> Result<f64, FetchError> {
    values
        .as_ref()
        .and_then(|v| v.usd)
        .ok_or_else(|| FetchError::InvalidResponseShape(format!("missing market_data.{}.usd", field)))
}

impl CoinResponse {
    /// Check that every displayed field is present
    pub fn into_snapshot(self) -> Result<MarketSnapshot, FetchError> {
        let data = self
            .market_data
            .ok_or_else(|| FetchError::InvalidResponseShape("missing market_data".to_string()))?;

        let market_cap = usd(&data.market_cap, "market_cap")?;
        let current_price = usd(&data.current_price, "current_price")?;
        let volume_24h = usd(&data.total_volume, "total_volume")?;
        let change_24h = data.price_change_percentage_24h.ok_or_else(|| {
            FetchError::InvalidResponseShape("missing market_data.price_change_percentage_24h".to_string())
        })?;
        let symbol = self
            .symbol
            .ok_or_else(|| FetchError::InvalidResponseShape("missing symbol".to_string()))?;

        Ok(MarketSnapshot {
            name: self.name.unwrap_or_else(|| symbol.to_uppercase()),
            symbol,
            market_cap,
            current_price,
            change_24h,
            volume_24h,
        })
    }
}

impl MarketChartResponse {
    /// Convert `[[ms, price], ...]` into a sorted series
    pub fn into_series(self) -> Result<PriceSeries, FetchError> {
        let samples = self
            .prices
            .ok_or_else(|| FetchError::InvalidResponseShape("missing prices".to_string()))?;

        let mut points = Vec::with_capacity(samples.len());
        for (i, sample) in samples.iter().enumerate() {
            let [millis, price] = sample.as_slice() else {
                return Err(FetchError::InvalidResponseShape(format!(
                    "sample {} has {} elements, expected 2",
                    i,
                    sample.len()
                )));
            };
            let timestamp = DateTime::<Utc>::from_timestamp_millis(*millis as i64).ok_or_else(|| {
                FetchError::InvalidResponseShape(format!("sample {} has invalid timestamp {}", i, millis))
            })?;
            points.push(PricePoint { timestamp, price: *price });
        }

        Ok(PriceSeries::new(points))
    }
}
