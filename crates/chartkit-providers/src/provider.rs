use async_trait::async_trait;
use chartkit_core::Candle;
use chrono::NaiveDate;

use crate::error::ProviderError;

/// Candle granularity a provider can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    OneMinute,
    FiveMinutes,
}

impl Interval {
    /// Wire label used by the price API.
    pub fn label(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::FiveMinutes => "5m",
        }
    }

    /// Bucket width in minutes.
    pub fn minutes(&self) -> u32 {
        match self {
            Interval::OneMinute => 1,
            Interval::FiveMinutes => 5,
        }
    }
}

/// Trait for fetching candle data from an external source.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Provider name (for logging/display).
    fn name(&self) -> &str;

    /// Fetch candles for a ticker over an inclusive date range.
    /// Returns well-formed candles sorted by timestamp; an empty vec when
    /// the range holds no trading days.
    async fn fetch_candles(
        &self,
        ticker: &str,
        interval: Interval,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Candle>, ProviderError>;
}
