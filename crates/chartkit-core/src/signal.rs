use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::candle::Candle;

/// What a signal event recommends. Modeled as a sum type so rendering and
/// downstream consumers must handle both variants exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Entry,
    Exit,
}

/// A discrete entry/exit event emitted by the scanner. Generated, never
/// mutated; the sequence is append-only and time-ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: SignalKind,
    pub price: Decimal,
    pub oscillator: f64,
}

/// Threshold and cutoff configuration for the scanner.
#[derive(Debug, Clone)]
pub struct SignalConfig {
    /// Overbought threshold an entry must turn down from.
    pub upper: f64,
    /// Oversold threshold an exit must cross below.
    pub lower: f64,
    /// Extreme guide level drawn on the oscillator pane.
    pub upper_extreme: f64,
    /// Latest venue-local hour at which entries may fire.
    pub max_entry_hour: u32,
    /// Venue timezone used for the entry-hour cutoff.
    pub venue_tz: Tz,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            upper: 70.0,
            lower: 30.0,
            upper_extreme: 80.0,
            max_entry_hour: 14,
            venue_tz: chrono_tz::Asia::Tokyo,
        }
    }
}

/// Scan an oscillator series in lockstep with its candles and emit
/// entry/exit events.
///
/// One step of lookback per index:
/// - entry when the previous value was above `upper`, the current value
///   turned down from it, and the candle's venue-local hour is at most
///   `max_entry_hour`;
/// - exit when the series crosses downward through `lower`.
///
/// The scanner is a pattern detector, not a position tracker: entries and
/// exits are emitted independently and pairing them into trades is left to
/// downstream consumers. `candles` and `oscillator` correspond 1:1 by
/// index; the scan walks their common prefix.
pub fn scan(
    candles: &[Candle],
    oscillator: &[Option<f64>],
    config: &SignalConfig,
) -> Vec<SignalEvent> {
    let mut events = Vec::new();

    for i in 1..candles.len().min(oscillator.len()) {
        let (Some(prev), Some(curr)) = (oscillator[i - 1], oscillator[i]) else {
            continue;
        };
        let candle = &candles[i];

        if prev > config.upper && curr < prev && entry_hour_ok(candle, config) {
            events.push(SignalEvent {
                timestamp: candle.timestamp,
                kind: SignalKind::Entry,
                price: candle.close,
                oscillator: curr,
            });
        }

        if prev >= config.lower && curr < config.lower {
            events.push(SignalEvent {
                timestamp: candle.timestamp,
                kind: SignalKind::Exit,
                price: candle.close,
                oscillator: curr,
            });
        }
    }

    events
}

fn entry_hour_ok(candle: &Candle, config: &SignalConfig) -> bool {
    candle.timestamp.with_timezone(&config.venue_tz).hour() <= config.max_entry_hour
}
