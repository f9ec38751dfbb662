use async_trait::async_trait;
use chartkit_core::Candle;
use chartkit_core::candle::filter_well_formed;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Asia::Tokyo;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::provider::{Interval, PriceProvider};

/// Client for the dashboard's own price API.
///
/// `GET {base}/prices?ticker=&interval=&start=&end=` returns a JSON array
/// of rows `{ date, Open, High, Low, Close, Volume }`, where `date` is
/// either venue-local `"YYYY-MM-DD HH:MM"` or an RFC3339 timestamp.
pub struct DashboardProvider {
    client: Client,
    base_url: String,
}

impl DashboardProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Create from the `CHARTKIT_API_BASE` environment variable.
    pub fn from_env() -> Result<Self, ProviderError> {
        let base_url = std::env::var("CHARTKIT_API_BASE")
            .map_err(|_| ProviderError::Config("CHARTKIT_API_BASE not set".into()))?;
        Ok(Self::new(base_url))
    }

    /// Fetch intraday candles at the finest granularity available:
    /// 1-minute data first, falling back to 5-minute when the venue serves
    /// none. Returns the candles together with the granularity served.
    pub async fn fetch_intraday(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(Vec<Candle>, Interval), ProviderError> {
        match self
            .fetch_candles(ticker, Interval::OneMinute, start, end)
            .await
        {
            Ok(candles) if !candles.is_empty() => return Ok((candles, Interval::OneMinute)),
            Ok(_) => debug!("{ticker}: no 1m data, falling back to 5m"),
            Err(e) => warn!("{ticker}: 1m fetch failed, falling back to 5m: {e}"),
        }

        let candles = self
            .fetch_candles(ticker, Interval::FiveMinutes, start, end)
            .await?;
        if candles.is_empty() {
            return Err(ProviderError::NoData {
                ticker: ticker.to_string(),
                start,
                end,
            });
        }
        Ok((candles, Interval::FiveMinutes))
    }
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    date: String,
    #[serde(rename = "Open")]
    open: Option<f64>,
    #[serde(rename = "High")]
    high: Option<f64>,
    #[serde(rename = "Low")]
    low: Option<f64>,
    #[serde(rename = "Close")]
    close: Option<f64>,
    #[serde(rename = "Volume")]
    volume: Option<i64>,
}

fn f64_to_decimal(val: f64) -> Result<Decimal, ProviderError> {
    Decimal::try_from(val).map_err(|e| ProviderError::Parse(format!("invalid decimal value: {e}")))
}

/// Parse a row timestamp: RFC3339 when an offset is present, otherwise
/// venue-local wall-clock time.
fn parse_row_timestamp(raw: &str) -> Result<DateTime<Utc>, ProviderError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    let naive = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .ok_or_else(|| ProviderError::Parse(format!("invalid timestamp '{raw}'")))?;

    Tokyo
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| ProviderError::Parse(format!("ambiguous venue-local timestamp '{raw}'")))
}

fn parse_rows(rows: Vec<PriceRow>) -> Result<Vec<Candle>, ProviderError> {
    let total = rows.len();
    let mut candles = Vec::with_capacity(total);

    for row in rows {
        let (Some(open), Some(high), Some(low), Some(close)) =
            (row.open, row.high, row.low, row.close)
        else {
            continue; // skip rows with missing prices
        };

        candles.push(Candle {
            timestamp: parse_row_timestamp(&row.date)?,
            open: f64_to_decimal(open)?,
            high: f64_to_decimal(high)?,
            low: f64_to_decimal(low)?,
            close: f64_to_decimal(close)?,
            volume: row.volume,
        });
    }

    let mut candles = filter_well_formed(candles);
    if candles.len() < total {
        debug!("dropped {} invalid row(s)", total - candles.len());
    }
    candles.sort_by_key(|c| c.timestamp);
    Ok(candles)
}

#[async_trait]
impl PriceProvider for DashboardProvider {
    fn name(&self) -> &str {
        "dashboard"
    }

    async fn fetch_candles(
        &self,
        ticker: &str,
        interval: Interval,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Candle>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/prices", self.base_url))
            .query(&[
                ("ticker", ticker),
                ("interval", interval.label()),
                ("start", &start.format("%Y-%m-%d").to_string()),
                ("end", &end.format("%Y-%m-%d").to_string()),
            ])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 60,
            });
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status,
                message: body,
            });
        }

        let rows: Vec<PriceRow> = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("failed to parse response: {e}")))?;

        parse_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parse_price_rows_json() {
        let json = r#"[
            {"date": "2025-01-15 09:01", "Open": 1500.0, "High": 1505.0, "Low": 1498.0, "Close": 1503.0, "Volume": 12000},
            {"date": "2025-01-15 09:02", "Open": 1503.0, "High": 1508.0, "Low": 1501.0, "Close": 1507.0, "Volume": 8000}
        ]"#;

        let rows: Vec<PriceRow> = serde_json::from_str(json).unwrap();
        let candles = parse_rows(rows).unwrap();

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open, dec!(1500.0));
        assert_eq!(candles[0].volume, Some(12000));
        assert!(candles[0].timestamp < candles[1].timestamp);
    }

    #[test]
    fn venue_local_timestamps_convert_to_utc() {
        // 09:01 JST is 00:01 UTC
        let ts = parse_row_timestamp("2025-01-15 09:01").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 1, 15, 0, 1, 0).unwrap());
    }

    #[test]
    fn rfc3339_timestamps_pass_through() {
        let ts = parse_row_timestamp("2025-01-15T09:01:00+09:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 1, 15, 0, 1, 0).unwrap());
    }

    #[test]
    fn unparseable_timestamp_is_an_error() {
        assert!(parse_row_timestamp("last tuesday").is_err());
    }

    #[test]
    fn rows_with_null_prices_are_skipped() {
        let json = r#"[
            {"date": "2025-01-15 09:01", "Open": 1500.0, "High": 1505.0, "Low": 1498.0, "Close": 1503.0, "Volume": 12000},
            {"date": "2025-01-15 09:02", "Open": null, "High": null, "Low": null, "Close": null, "Volume": null}
        ]"#;

        let rows: Vec<PriceRow> = serde_json::from_str(json).unwrap();
        let candles = parse_rows(rows).unwrap();
        assert_eq!(candles.len(), 1);
    }

    #[test]
    fn malformed_rows_are_filtered() {
        // Zero prices and inverted high/low both fail the well-formedness check.
        let json = r#"[
            {"date": "2025-01-15 09:01", "Open": 0.0, "High": 0.0, "Low": 0.0, "Close": 0.0, "Volume": 100},
            {"date": "2025-01-15 09:02", "Open": 1500.0, "High": 1490.0, "Low": 1495.0, "Close": 1500.0, "Volume": 100},
            {"date": "2025-01-15 09:03", "Open": 1500.0, "High": 1505.0, "Low": 1498.0, "Close": 1503.0, "Volume": 100}
        ]"#;

        let rows: Vec<PriceRow> = serde_json::from_str(json).unwrap();
        let candles = parse_rows(rows).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].close, dec!(1503.0));
    }

    #[test]
    fn rows_sort_by_timestamp() {
        let json = r#"[
            {"date": "2025-01-15 09:05", "Open": 1500.0, "High": 1505.0, "Low": 1498.0, "Close": 1503.0, "Volume": 1},
            {"date": "2025-01-15 09:01", "Open": 1500.0, "High": 1505.0, "Low": 1498.0, "Close": 1503.0, "Volume": 2}
        ]"#;

        let rows: Vec<PriceRow> = serde_json::from_str(json).unwrap();
        let candles = parse_rows(rows).unwrap();
        assert_eq!(candles[0].volume, Some(2));
        assert_eq!(candles[1].volume, Some(1));
    }

    #[test]
    fn missing_volume_is_kept_as_none() {
        let json = r#"[
            {"date": "2025-01-15 09:01", "Open": 1500.0, "High": 1505.0, "Low": 1498.0, "Close": 1503.0}
        ]"#;

        let rows: Vec<PriceRow> = serde_json::from_str(json).unwrap();
        let candles = parse_rows(rows).unwrap();
        assert_eq!(candles[0].volume, None);
    }
}
