//! Compact preview series for sparkline rendering.
//!
//! Dense close-price series are reduced to a small point set that keeps the
//! visual shape of the input: values are first expressed as percent change
//! from the window start and rescaled to use the full `[0, 100]` band of a
//! fixed-height preview area, then downsampled with largest-triangle-
//! three-buckets selection, which is biased toward local extrema where a
//! uniform stride would flatten peaks and troughs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Most input points considered per preview window; older points are
/// trimmed from the front.
pub const MAX_INPUT_POINTS: usize = 300;

/// Default downsample target for a preview pane.
pub const DEFAULT_TARGET_POINTS: usize = 240;

/// One point of a preview series. After `normalize`, values lie in
/// `[0, 100]` relative to the window being previewed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Deduplicate by timestamp (last write wins) and sort ascending.
pub fn dedup_sort_by_time(points: Vec<PreviewPoint>) -> Vec<PreviewPoint> {
    let mut by_time: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
    for point in points {
        by_time.insert(point.timestamp, point.value);
    }
    by_time
        .into_iter()
        .map(|(timestamp, value)| PreviewPoint { timestamp, value })
        .collect()
}

/// Largest-triangle-three-buckets selection down to at most `target_count`
/// points.
///
/// The first and last points are always kept. Interior points are split
/// into `target_count - 2` roughly equal-width buckets; within each bucket
/// the point forming the largest triangle with the previously selected
/// point and the next bucket's centroid is chosen and becomes the anchor
/// for the following bucket. Area is evaluated with the cross-product
/// (shoelace) form, one multiply-subtract per candidate.
///
/// Input must already be deduplicated and sorted ascending by time; use
/// `dedup_sort_by_time` first. `target_count >= len` or `target_count < 3`
/// returns the input unchanged.
pub fn downsample(points: &[PreviewPoint], target_count: usize) -> Vec<PreviewPoint> {
    let n = points.len();
    if target_count >= n || target_count < 3 {
        return points.to_vec();
    }

    let x = |p: &PreviewPoint| p.timestamp.timestamp() as f64;
    let every = (n - 2) as f64 / (target_count - 2) as f64;

    let mut sampled = Vec::with_capacity(target_count);
    let mut anchor = 0usize;
    sampled.push(points[0]);

    for i in 0..target_count - 2 {
        // Centroid of the *next* bucket, the fixed third vertex.
        let avg_start = ((i + 1) as f64 * every) as usize + 1;
        let avg_end = (((i + 2) as f64 * every) as usize + 1).min(n);
        let avg_len = avg_end.saturating_sub(avg_start).max(1) as f64;
        let (mut avg_x, mut avg_y) = (0.0, 0.0);
        for point in &points[avg_start..avg_end] {
            avg_x += x(point);
            avg_y += point.value;
        }
        avg_x /= avg_len;
        avg_y /= avg_len;

        let range_start = (i as f64 * every) as usize + 1;
        let range_end = ((i + 1) as f64 * every) as usize + 1;

        let ax = x(&points[anchor]);
        let ay = points[anchor].value;
        let mut max_area = -1.0;
        let mut max_index = range_start;
        for j in range_start..range_end.min(n) {
            let area =
                ((ax - avg_x) * (points[j].value - ay) - (ax - x(&points[j])) * (avg_y - ay)).abs()
                    * 0.5;
            if area > max_area {
                max_area = area;
                max_index = j;
            }
        }

        sampled.push(points[max_index]);
        anchor = max_index;
    }

    sampled.push(points[n - 1]);
    sampled
}

/// Convert a window to percent change from its first point, then rescale
/// linearly so the window minimum maps to 0 and the maximum to 100. A
/// constant window maps to a flat 0 rather than dividing by a zero span.
pub fn normalize(points: &[PreviewPoint]) -> Vec<PreviewPoint> {
    let Some(first) = points.first() else {
        return Vec::new();
    };

    let base = if first.value == 0.0 { 1.0 } else { first.value };
    let pct: Vec<f64> = points.iter().map(|p| (p.value / base - 1.0) * 100.0).collect();

    let min = pct.iter().copied().fold(f64::INFINITY, f64::min);
    let max = pct.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = if max - min == 0.0 { 1.0 } else { max - min };

    points
        .iter()
        .zip(&pct)
        .map(|(point, value)| PreviewPoint {
            timestamp: point.timestamp,
            value: (value - min) / span * 100.0,
        })
        .collect()
}

/// Full preview pipeline: dedup/sort, trim to the most recent
/// `MAX_INPUT_POINTS`, normalize to `[0, 100]`, downsample to
/// `target_count`.
pub fn preview(points: Vec<PreviewPoint>, target_count: usize) -> Vec<PreviewPoint> {
    let sorted = dedup_sort_by_time(points);
    let tail_start = sorted.len().saturating_sub(MAX_INPUT_POINTS);
    let window = &sorted[tail_start..];
    let normalized = normalize(window);
    downsample(&normalized, target_count.min(normalized.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(min: i64, value: f64) -> PreviewPoint {
        PreviewPoint {
            timestamp: Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap()
                + chrono::Duration::minutes(min),
            value,
        }
    }

    fn ramp(len: i64) -> Vec<PreviewPoint> {
        (0..len).map(|i| point(i, 100.0 + i as f64)).collect()
    }

    #[test]
    fn dedup_keeps_last_write_and_sorts() {
        let out = dedup_sort_by_time(vec![point(2, 1.0), point(0, 2.0), point(2, 3.0)]);
        assert_eq!(out, vec![point(0, 2.0), point(2, 3.0)]);
    }

    #[test]
    fn downsample_is_noop_below_three_or_above_len() {
        let input = ramp(10);
        assert_eq!(downsample(&input, 2), input);
        assert_eq!(downsample(&input, 10), input);
        assert_eq!(downsample(&input, 50), input);
    }

    #[test]
    fn downsample_keeps_endpoints_and_bounds_length() {
        let input = ramp(100);
        for k in [3, 7, 24, 99] {
            let out = downsample(&input, k);
            assert!(out.len() <= k, "len {} > target {k}", out.len());
            assert_eq!(out.first(), input.first());
            assert_eq!(out.last(), input.last());
        }
    }

    #[test]
    fn downsample_output_stays_chronological() {
        let input = ramp(200);
        let out = downsample(&input, 30);
        for pair in out.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
    }

    #[test]
    fn downsample_retains_spike_uniform_stride_would_miss() {
        let mut input: Vec<PreviewPoint> = (0..100).map(|i| point(i, 10.0)).collect();
        input[37].value = 90.0;

        let out = downsample(&input, 10);
        assert!(
            out.iter().any(|p| p.value == 90.0),
            "spike dropped: {out:?}"
        );
    }

    #[test]
    fn normalize_maps_min_to_zero_and_max_to_hundred() {
        let input = vec![point(0, 100.0), point(1, 97.0), point(2, 106.0), point(3, 101.0)];
        let out = normalize(&input);

        let min = out.iter().map(|p| p.value).fold(f64::INFINITY, f64::min);
        let max = out.iter().map(|p| p.value).fold(f64::NEG_INFINITY, f64::max);
        assert!(min.abs() < 1e-9);
        assert!((max - 100.0).abs() < 1e-9);
        // The originally lowest and highest points land on the rails.
        assert!(out[1].value.abs() < 1e-9);
        assert!((out[2].value - 100.0).abs() < 1e-9);
    }

    #[test]
    fn normalize_constant_window_is_flat_zero() {
        let out = normalize(&[point(0, 50.0), point(1, 50.0), point(2, 50.0)]);
        assert!(out.iter().all(|p| p.value == 0.0));
    }

    #[test]
    fn normalize_empty_is_empty() {
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn preview_trims_to_most_recent_window() {
        let input: Vec<PreviewPoint> = (0..400).map(|i| point(i, 100.0 + i as f64)).collect();
        let out = preview(input.clone(), DEFAULT_TARGET_POINTS);

        assert!(out.len() <= DEFAULT_TARGET_POINTS);
        // Window starts at input index 100 (400 - MAX_INPUT_POINTS).
        assert_eq!(out.first().unwrap().timestamp, input[100].timestamp);
        assert_eq!(out.last().unwrap().timestamp, input[399].timestamp);
    }

    #[test]
    fn preview_output_is_normalized() {
        let input: Vec<PreviewPoint> =
            (0..50).map(|i| point(i, 100.0 + (i as f64 * 0.9).sin() * 5.0)).collect();
        let out = preview(input, 20);
        assert!(out.iter().all(|p| (0.0..=100.0).contains(&p.value)));
    }
}
