use std::collections::BTreeMap;

use chrono::{DateTime, Timelike, Utc};

use crate::candle::Candle;

/// Bucket width the dashboard charts at.
pub const DEFAULT_BUCKET_MINUTES: u32 = 5;

/// Aggregate fine-grained candles into wall-clock-aligned buckets of
/// `target_minutes`.
///
/// Candles are grouped by truncating their minute-of-hour down to the
/// nearest multiple of `target_minutes`, not by counting consecutive rows,
/// so 09:03 and 09:04 share the 09:00 bucket even when the stream has gaps.
/// Each bucket reduces to one candle: open of the first, close of the last,
/// extrema of high/low, summed volume. The output candle keeps the first
/// input candle's timestamp.
///
/// Input must already be sorted ascending by timestamp and filtered of
/// malformed rows; neither is re-checked here.
pub fn resample(candles: &[Candle], target_minutes: u32) -> Vec<Candle> {
    if candles.is_empty() || target_minutes == 0 {
        return candles.to_vec();
    }

    let mut buckets: BTreeMap<DateTime<Utc>, Vec<&Candle>> = BTreeMap::new();
    for candle in candles {
        buckets
            .entry(bucket_start(candle.timestamp, target_minutes))
            .or_default()
            .push(candle);
    }

    let mut out: Vec<Candle> = buckets.into_values().map(aggregate).collect();
    // Grouping is a mapping, so re-establish chronological order explicitly.
    out.sort_by_key(|c| c.timestamp);
    out
}

fn bucket_start(timestamp: DateTime<Utc>, target_minutes: u32) -> DateTime<Utc> {
    let slot_minute = timestamp.minute() - timestamp.minute() % target_minutes;
    timestamp
        .with_minute(slot_minute)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(timestamp)
}

fn aggregate(bucket: Vec<&Candle>) -> Candle {
    let first = bucket[0];
    let last = bucket[bucket.len() - 1];
    let mut high = first.high;
    let mut low = first.low;
    let mut volume: Option<i64> = None;
    for candle in &bucket {
        high = high.max(candle.high);
        low = low.min(candle.low);
        if let Some(v) = candle.volume {
            volume = Some(volume.unwrap_or(0) + v);
        }
    }
    Candle {
        timestamp: first.timestamp,
        open: first.open,
        high,
        low,
        close: last.close,
        volume,
    }
}
