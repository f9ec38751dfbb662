//! Thin adapter between derived series and an external rendering
//! capability.
//!
//! The renderer is abstracted as `ChartSurface`; this module converts
//! signals to markers, candles to volume rows, wires each pane into the
//! `PaneSynchronizer`, and nothing more. Output stays plain data, with no
//! dependency on any particular rendering library's types.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::candle::Candle;
use crate::error::ChartError;
use crate::oscillator::IndicatorPoint;
use crate::pipeline::DerivedSeries;
use crate::signal::{SignalConfig, SignalEvent, SignalKind};
use crate::sync::{PaneRegistration, PaneSynchronizer, TimeRange};

/// Where a marker is drawn relative to its bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerPlacement {
    AboveBar,
    BelowBar,
}

/// A marker on the price pane, built from a signal event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMarker {
    pub timestamp: DateTime<Utc>,
    pub placement: MarkerPlacement,
    pub text: String,
}

impl SeriesMarker {
    pub fn from_signal(event: &SignalEvent) -> Self {
        match event.kind {
            SignalKind::Entry => Self {
                timestamp: event.timestamp,
                placement: MarkerPlacement::AboveBar,
                text: format!("E {}", event.price.round_dp(0)),
            },
            SignalKind::Exit => Self {
                timestamp: event.timestamp,
                placement: MarkerPlacement::BelowBar,
                text: format!("X {}", event.price.round_dp(0)),
            },
        }
    }
}

/// One bar of the volume histogram. `up` selects the up/down color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramRow {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub up: bool,
}

/// Volume rows for the histogram pane; candles without positive volume are
/// skipped rather than drawn as empty bars.
pub fn volume_rows(candles: &[Candle]) -> Vec<HistogramRow> {
    candles
        .iter()
        .filter_map(|candle| {
            let volume = candle.volume.filter(|v| *v > 0)?;
            Some(HistogramRow {
                timestamp: candle.timestamp,
                value: volume as f64,
                up: candle.is_up(),
            })
        })
        .collect()
}

/// Guide levels drawn on the oscillator pane, top to bottom.
pub fn oscillator_guides(config: &SignalConfig) -> [f64; 3] {
    [config.upper_extreme, config.upper, config.lower]
}

/// The external rendering capability, one instance per pane.
pub trait ChartSurface {
    fn set_candles(&mut self, candles: &[Candle]) -> Result<(), ChartError>;
    fn set_line(&mut self, points: &[IndicatorPoint], guides: &[f64]) -> Result<(), ChartError>;
    fn set_histogram(&mut self, rows: &[HistogramRow]) -> Result<(), ChartError>;
    fn set_markers(&mut self, markers: &[SeriesMarker]) -> Result<(), ChartError>;
    fn apply_range(&mut self, range: TimeRange) -> Result<(), ChartError>;
}

/// One pane's surface together with its synchronizer registration. The
/// registration drops with the binding, releasing pane and callback as a
/// unit.
pub struct PaneBinding<S: ChartSurface> {
    pub surface: Rc<RefCell<S>>,
    registration: PaneRegistration,
}

impl<S: ChartSurface> PaneBinding<S> {
    /// Forward a user-driven range change on this pane to its siblings.
    pub fn range_changed(&self, range: TimeRange) {
        self.registration.broadcast(range);
    }
}

fn bind_pane<S: ChartSurface + 'static>(
    sync: &PaneSynchronizer,
    label: &str,
    surface: Rc<RefCell<S>>,
) -> PaneBinding<S> {
    let sink = Rc::clone(&surface);
    let registration = sync.register(label, move |range| {
        // A surface refusing a range is recoverable: the pane shows a stale
        // window while the rest of the chart stays interactive.
        let _ = sink.borrow_mut().apply_range(range);
    });
    PaneBinding {
        surface,
        registration,
    }
}

/// The three panes of one mounted chart.
pub struct ChartBinding<P, O, V>
where
    P: ChartSurface,
    O: ChartSurface,
    V: ChartSurface,
{
    pub price: PaneBinding<P>,
    pub oscillator: PaneBinding<O>,
    pub volume: PaneBinding<V>,
}

/// Push a derived series to three pane surfaces and register them for
/// range synchronization.
///
/// All series data is applied before any pane is registered: an error
/// while populating a surface returns early with nothing registered, so
/// there is no partially wired chart to tear down.
pub fn bind_chart<P, O, V>(
    sync: &PaneSynchronizer,
    derived: &DerivedSeries,
    config: &SignalConfig,
    price: Rc<RefCell<P>>,
    oscillator: Rc<RefCell<O>>,
    volume: Rc<RefCell<V>>,
) -> Result<ChartBinding<P, O, V>, ChartError>
where
    P: ChartSurface + 'static,
    O: ChartSurface + 'static,
    V: ChartSurface + 'static,
{
    let markers: Vec<SeriesMarker> = derived.signals.iter().map(SeriesMarker::from_signal).collect();
    // The warm-up region is not drawn; the line starts at its first sample.
    let line: Vec<IndicatorPoint> = derived
        .oscillator
        .iter()
        .filter(|point| point.value.is_some())
        .copied()
        .collect();

    price.borrow_mut().set_candles(&derived.candles)?;
    price.borrow_mut().set_markers(&markers)?;
    oscillator
        .borrow_mut()
        .set_line(&line, &oscillator_guides(config))?;
    volume
        .borrow_mut()
        .set_histogram(&volume_rows(&derived.candles))?;

    Ok(ChartBinding {
        price: bind_pane(sync, "price", price),
        oscillator: bind_pane(sync, "oscillator", oscillator),
        volume: bind_pane(sync, "volume", volume),
    })
}
