use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::candle::Candle;

/// Smoothing window the dashboard's terminal convention uses.
pub const DEFAULT_PERIOD: usize = 9;

/// One oscillator sample, 1:1 with a candle by index. `None` marks the
/// warm-up region before the smoothing window is filled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

/// Relative-strength oscillator over a closing-price series.
///
/// Gains and losses are smoothed with the Wilder recurrence
/// `avg = avg * (period - 1) / period + current / period`, seeded by a
/// simple mean over the first `period` deltas. This matches the smoothing
/// convention of widely deployed charting terminals; a simple moving
/// average gives materially different signal timing.
///
/// Index 0 is always `None` (no prior delta); indices `1..period` stay
/// `None` until the bootstrap window fills; from `period` onward every
/// value is finite in `[0, 100]`. A zero average loss clamps to 100.
pub fn relative_strength(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let delta = closes[i] - closes[i - 1];
        if delta > 0.0 {
            avg_gain += delta;
        } else {
            avg_loss += -delta;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = Some(ratio(avg_gain, avg_loss));

    let retain = (period - 1) as f64 / period as f64;
    for i in period + 1..closes.len() {
        let delta = closes[i] - closes[i - 1];
        let (gain, loss) = if delta > 0.0 {
            (delta, 0.0)
        } else {
            (0.0, -delta)
        };
        avg_gain = avg_gain * retain + gain / period as f64;
        avg_loss = avg_loss * retain + loss / period as f64;
        out[i] = Some(ratio(avg_gain, avg_loss));
    }

    out
}

fn ratio(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    100.0 * avg_gain / (avg_gain + avg_loss)
}

/// Oscillator over candle closes, paired with the candle timestamps.
pub fn oscillator_points(candles: &[Candle], period: usize) -> Vec<IndicatorPoint> {
    let closes: Vec<f64> = candles.iter().map(Candle::close_f64).collect();
    relative_strength(&closes, period)
        .into_iter()
        .zip(candles)
        .map(|(value, candle)| IndicatorPoint {
            timestamp: candle.timestamp,
            value,
        })
        .collect()
}
