//! Data models shared by the API client, the poller and the chart.

pub mod chart;
pub mod market;

pub use chart::{PricePoint, PriceSeries};
pub use market::{Asset, AssetSelection, AxisLabelFormat, MarketSnapshot, RangeBucket};
