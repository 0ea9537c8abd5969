//! Market selection and snapshot models

use std::fmt;
use std::str::FromStr;

/// Assets the dashboard knows how to display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Asset {
    Bitcoin,
    Ethereum,
    BinanceCoin,
    Solana,
    Ripple,
}

impl Asset {
    pub const ALL: [Asset; 5] = [
        Asset::Bitcoin,
        Asset::Ethereum,
        Asset::BinanceCoin,
        Asset::Solana,
        Asset::Ripple,
    ];

    /// API identifier, e.g. `bitcoin`
    pub fn id(self) -> &'static str {
        match self {
            Asset::Bitcoin => "bitcoin",
            Asset::Ethereum => "ethereum",
            Asset::BinanceCoin => "binancecoin",
            Asset::Solana => "solana",
            Asset::Ripple => "ripple",
        }
    }

    /// Human readable name used as the chart title
    pub fn display_name(self) -> &'static str {
        match self {
            Asset::Bitcoin => "Bitcoin",
            Asset::Ethereum => "Ethereum",
            Asset::BinanceCoin => "Binance Coin",
            Asset::Solana => "Solana",
            Asset::Ripple => "Ripple",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Asset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Asset::ALL
            .into_iter()
            .find(|asset| asset.id() == wanted)
            .ok_or_else(|| {
                let ids: Vec<&str> = Asset::ALL.iter().map(|a| a.id()).collect();
                format!("❌ Unknown asset: '{}'. Supported: {}", s.trim(), ids.join(", "))
            })
    }
}

/// Time-axis label granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisLabelFormat {
    /// `19 Oct`
    DayMonth,
    /// `Oct 2026`
    MonthYear,
}

impl AxisLabelFormat {
    /// chrono format string for the label
    pub fn pattern(self) -> &'static str {
        match self {
            AxisLabelFormat::DayMonth => "%d %b",
            AxisLabelFormat::MonthYear => "%b %Y",
        }
    }
}

/// Selectable historical window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBucket {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl RangeBucket {
    pub const ALL: [RangeBucket; 5] = [
        RangeBucket::Day,
        RangeBucket::Week,
        RangeBucket::Month,
        RangeBucket::Quarter,
        RangeBucket::Year,
    ];

    pub fn days(self) -> u32 {
        match self {
            RangeBucket::Day => 1,
            RangeBucket::Week => 7,
            RangeBucket::Month => 30,
            RangeBucket::Quarter => 90,
            RangeBucket::Year => 365,
        }
    }

    /// Up to a month the axis shows days, beyond that months
    pub fn label_format(self) -> AxisLabelFormat {
        if self.days() <= 30 {
            AxisLabelFormat::DayMonth
        } else {
            AxisLabelFormat::MonthYear
        }
    }

    pub fn from_days(days: u32) -> Result<Self, String> {
        RangeBucket::ALL
            .into_iter()
            .find(|range| range.days() == days)
            .ok_or_else(|| {
                let allowed: Vec<String> = RangeBucket::ALL.iter().map(|r| r.days().to_string()).collect();
                format!("❌ Unsupported range: {} days. Supported: {}", days, allowed.join(", "))
            })
    }
}

impl fmt::Display for RangeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.days())
    }
}

/// The asset/range pair currently on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetSelection {
    pub asset: Asset,
    pub range: RangeBucket,
}

impl Default for AssetSelection {
    fn default() -> Self {
        Self {
            asset: Asset::Bitcoin,
            range: RangeBucket::Month,
        }
    }
}

/// Point-in-time market summary, USD denominated
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub name: String,
    pub market_cap: f64,
    pub current_price: f64,
    pub change_24h: f64,
    pub volume_24h: f64,
}
