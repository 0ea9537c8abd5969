use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::api::CoinGeckoClient;
use crate::models::{Asset, AssetSelection, RangeBucket};
use crate::services::chart_service::ChartSettings;
use crate::services::market_service::DEFAULT_POLL_INTERVAL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime settings, read from the environment (and `.env`)
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_base_url: String,
    pub http_timeout: Duration,
    pub poll_interval: Duration,
    pub selection: AssetSelection,
    pub chart: ChartSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; unset variables take their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let asset = match lookup("MARKET_ASSET") {
            Some(value) => value.parse::<Asset>().map_err(|reason| ConfigError::Invalid {
                name: "MARKET_ASSET",
                value,
                reason,
            })?,
            None => Asset::Bitcoin,
        };

        let days: u32 = parse_var(&lookup, "MARKET_RANGE_DAYS", 30)?;
        let range = RangeBucket::from_days(days).map_err(|reason| ConfigError::Invalid {
            name: "MARKET_RANGE_DAYS",
            value: days.to_string(),
            reason,
        })?;

        let poll_secs: u64 =
            parse_var(&lookup, "POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL.as_secs())?;
        if poll_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "POLL_INTERVAL_SECS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            api_base_url: lookup("MARKET_API_BASE_URL")
                .unwrap_or_else(|| CoinGeckoClient::DEFAULT_BASE_URL.to_string()),
            http_timeout: Duration::from_secs(parse_var(&lookup, "HTTP_TIMEOUT_SECS", 10)?),
            poll_interval: Duration::from_secs(poll_secs),
            selection: AssetSelection { asset, range },
            chart: ChartSettings {
                output_path: PathBuf::from(
                    lookup("CHART_OUTPUT").unwrap_or_else(|| "market_chart.png".to_string()),
                ),
                width: parse_var(&lookup, "CHART_WIDTH", 1024)?,
                height: parse_var(&lookup, "CHART_HEIGHT", 480)?,
            },
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) => value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
        None => Ok(default),
    }
}
