//! The derived-series pipeline and the preview cache.
//!
//! Everything a chart shows is a pure function of the raw candle series and
//! a configuration: resample, oscillate, scan. `derive` recomputes the
//! whole set per input change, so a render never observes a stale
//! intermediate next to a fresh one.

use serde::{Deserialize, Serialize};

use crate::candle::Candle;
use crate::oscillator::{self, IndicatorPoint, oscillator_points};
use crate::preview::{self, PreviewPoint};
use crate::resample::{self, resample};
use crate::signal::{self, SignalConfig, SignalEvent};
use crate::sync::TimeRange;

/// Configuration surface of the charting subsystem.
#[derive(Debug, Clone)]
pub struct ChartConfig {
    /// Resampling bucket width in wall-clock minutes.
    pub bucket_minutes: u32,
    /// Oscillator smoothing period.
    pub period: usize,
    /// Signal scanner thresholds and entry cutoff.
    pub signals: SignalConfig,
    /// Downsample target for preview series.
    pub preview_points: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            bucket_minutes: resample::DEFAULT_BUCKET_MINUTES,
            period: oscillator::DEFAULT_PERIOD,
            signals: SignalConfig::default(),
            preview_points: preview::DEFAULT_TARGET_POINTS,
        }
    }
}

/// Everything derived from one raw candle series, produced atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedSeries {
    /// Resampled candles, one logical timeline for every pane.
    pub candles: Vec<Candle>,
    /// Oscillator samples, 1:1 with `candles` by index.
    pub oscillator: Vec<IndicatorPoint>,
    /// Entry/exit events found in the oscillator series.
    pub signals: Vec<SignalEvent>,
}

/// Run the full pipeline over a raw series. The input must already be
/// sorted and filtered of malformed candles (see `candle::filter_well_formed`).
pub fn derive(raw: &[Candle], config: &ChartConfig) -> DerivedSeries {
    let candles = resample(raw, config.bucket_minutes);
    let oscillator = oscillator_points(&candles, config.period);
    let values: Vec<Option<f64>> = oscillator.iter().map(|p| p.value).collect();
    let signals = signal::scan(&candles, &values, &config.signals);
    DerivedSeries {
        candles,
        oscillator,
        signals,
    }
}

/// Preview points for a raw series under this configuration: close prices
/// through the dedup/normalize/downsample chain.
pub fn preview_series(raw: &[Candle], config: &ChartConfig) -> Vec<PreviewPoint> {
    let closes = raw
        .iter()
        .map(|candle| PreviewPoint {
            timestamp: candle.timestamp,
            value: candle.close_f64(),
        })
        .collect();
    preview::preview(closes, config.preview_points)
}

/// Cache key for one preview window of one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreviewKey {
    pub ticker: String,
    pub window: TimeRange,
}

/// Bounded least-recently-used cache of preview series.
///
/// Preview data is derived and cheap to rebuild, so the cache is an
/// explicit object handed to whoever renders sparklines, with a capacity
/// fixed at construction; the least recently used window is evicted when
/// the cache overflows.
pub struct PreviewCache {
    capacity: usize,
    entries: Vec<(PreviewKey, Vec<PreviewPoint>)>,
}

impl PreviewCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a window, refreshing its recency on a hit.
    pub fn get(&mut self, key: &PreviewKey) -> Option<&[PreviewPoint]> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        let entry = self.entries.remove(index);
        self.entries.push(entry);
        self.entries.last().map(|(_, points)| points.as_slice())
    }

    /// Look up a window or build it with `build`, evicting the least
    /// recently used entry if the cache is full.
    pub fn get_or_insert_with(
        &mut self,
        key: PreviewKey,
        build: impl FnOnce() -> Vec<PreviewPoint>,
    ) -> &[PreviewPoint] {
        if let Some(index) = self.entries.iter().position(|(k, _)| *k == key) {
            let entry = self.entries.remove(index);
            self.entries.push(entry);
        } else {
            if self.entries.len() == self.capacity {
                self.entries.remove(0);
            }
            self.entries.push((key, build()));
        }
        self.entries
            .last()
            .map(|(_, points)| points.as_slice())
            .expect("entry pushed above")
    }
}
