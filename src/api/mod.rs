pub mod coingecko;
pub mod error;

use async_trait::async_trait;

use crate::models::{Asset, MarketSnapshot, PriceSeries, RangeBucket};

pub use coingecko::CoinGeckoClient;
pub use error::FetchError;

/// Source of live market data for the poller
#[async_trait]
pub trait MarketDataApi: Send + Sync {
    /// Current USD summary for `asset`
    async fn fetch_snapshot(&self, asset: Asset) -> Result<MarketSnapshot, FetchError>;

    /// Historical USD prices for `asset` over `range`
    async fn fetch_series(&self, asset: Asset, range: RangeBucket) -> Result<PriceSeries, FetchError>;
}
