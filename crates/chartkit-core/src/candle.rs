use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// A single OHLCV candle for one time bucket.
///
/// Volume is optional: some venues omit it for thin intervals, and a
/// resampled bucket whose inputs all lacked volume keeps `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Option<i64>,
}

impl Candle {
    /// Whether the candle satisfies the OHLC invariant with positive prices:
    /// `0 < low <= min(open, close) <= max(open, close) <= high`.
    pub fn is_well_formed(&self) -> bool {
        let body_low = self.open.min(self.close);
        let body_high = self.open.max(self.close);
        self.low > Decimal::ZERO && self.low <= body_low && body_high <= self.high
    }

    /// Close price as `f64` for indicator and preview math.
    pub fn close_f64(&self) -> f64 {
        self.close.to_f64().unwrap_or(0.0)
    }

    /// True when the candle closed at or above its open.
    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }
}

/// Drop malformed candles before handing a series to the resampler or
/// oscillator. The hot aggregation loops do not re-validate per item, so
/// this filter is the caller's responsibility at the data boundary.
pub fn filter_well_formed(candles: Vec<Candle>) -> Vec<Candle> {
    candles.into_iter().filter(Candle::is_well_formed).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn candle(open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2025, 1, 15, 0, 30, 0).unwrap(),
            open,
            high,
            low,
            close,
            volume: Some(1000),
        }
    }

    #[test]
    fn well_formed_candle_passes() {
        let c = candle(dec!(150.00), dec!(151.00), dec!(149.00), dec!(150.50));
        assert!(c.is_well_formed());
    }

    #[test]
    fn low_above_body_fails() {
        let c = candle(dec!(150.00), dec!(151.00), dec!(150.25), dec!(150.50));
        assert!(!c.is_well_formed());
    }

    #[test]
    fn high_below_body_fails() {
        let c = candle(dec!(150.00), dec!(150.25), dec!(149.00), dec!(150.50));
        assert!(!c.is_well_formed());
    }

    #[test]
    fn zero_price_fails() {
        let c = candle(dec!(0), dec!(151.00), dec!(0), dec!(150.50));
        assert!(!c.is_well_formed());
    }

    #[test]
    fn filter_drops_only_malformed() {
        let good = candle(dec!(150.00), dec!(151.00), dec!(149.00), dec!(150.50));
        let bad = candle(dec!(150.00), dec!(149.00), dec!(149.50), dec!(150.50));
        let kept = filter_well_formed(vec![good.clone(), bad]);
        assert_eq!(kept, vec![good]);
    }

    #[test]
    fn up_down_classification() {
        let up = candle(dec!(150.00), dec!(151.00), dec!(149.00), dec!(150.50));
        let down = candle(dec!(150.50), dec!(151.00), dec!(149.00), dec!(150.00));
        assert!(up.is_up());
        assert!(!down.is_up());
    }
}
